//! graphport - export a property graph into an importer bundle.
//!
//! Writes one CSV file per label and per relationship pattern, plus the
//! mapping model the importer reads to rebuild the graph.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod output;

use commands::Cli;

/// Split a log path into its directory, created if missing, and file name.
fn log_target(path: &Path) -> std::io::Result<(PathBuf, OsString)> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "graphport.log".into());
    Ok((dir.to_path_buf(), file_name))
}

/// Initialize tracing with optional file logging.
///
/// The returned guard flushes the file writer and must live until exit.
fn init_tracing(log_file: Option<&Path>) -> Option<WorkerGuard> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "graphport=info,graphport_core=info,graphport_graph=info".into());

    // Logs go to stderr so stdout stays clean for the summary
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let target = log_file.and_then(|path| match log_target(path) {
        Ok(target) => Some(target),
        Err(e) => {
            eprintln!(
                "warning: cannot create log directory for {}: {}; logging to stderr only",
                path.display(),
                e
            );
            None
        }
    });

    let Some((dir, file_name)) = target else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
        return None;
    };

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false),
        )
        .init();
    Some(guard)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_file.as_deref());
    cli.execute().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_target_creates_directory() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join("logs/nested/graphport.log");

        let (dir, file_name) = log_target(&path).unwrap();

        assert!(dir.is_dir());
        assert_eq!(dir, root.path().join("logs/nested"));
        assert_eq!(file_name, "graphport.log");
    }

    #[test]
    fn test_log_target_reports_unusable_directory() {
        let root = tempfile::tempdir().unwrap();
        let blocker = root.path().join("not-a-dir");
        std::fs::write(&blocker, "x").unwrap();

        assert!(log_target(&blocker.join("graphport.log")).is_err());
    }

    #[test]
    fn test_bare_file_name_logs_to_current_dir() {
        let (dir, file_name) = log_target(Path::new("run.log")).unwrap();
        assert_eq!(dir, PathBuf::from("."));
        assert_eq!(file_name, "run.log");
    }
}
