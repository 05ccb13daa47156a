//! Layered settings: flags, then environment, then a TOML file, then defaults.
//!
//! clap resolves flags against their environment variables, so by the time
//! [`Settings::resolve`] runs each option is either set or falls through to
//! the file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::Deserialize;

use graphport_core::FormatVersion;
use graphport_graph::GraphConfig;

const DEFAULT_OUTPUT_DIR: &str = "export";

/// Connection and output options shared by all commands.
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Bolt URI of the source database
    #[arg(long, env = "NEO4J_URI", global = true)]
    pub uri: Option<String>,

    /// Database user
    #[arg(long, env = "NEO4J_USER", global = true)]
    pub user: Option<String>,

    /// Database password
    #[arg(long, env = "NEO4J_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,

    /// Database name (server default when omitted)
    #[arg(long, env = "NEO4J_DATABASE", global = true)]
    pub database: Option<String>,

    /// Directory the CSV files and model are written to
    #[arg(short, long, env = "OUTPUT_DIR", global = true)]
    pub output_dir: Option<PathBuf>,

    /// Model format version (3.0, 2.4.0 or 0.1.0)
    #[arg(short = 'f', long = "format", env = "FORMAT_VERSION", global = true)]
    pub format_version: Option<String>,

    /// Entities scanned when collecting property keys (all when omitted)
    #[arg(long, env = "SAMPLE_SIZE", global = true)]
    pub sample_size: Option<usize>,

    /// TOML file with defaults for any of the above
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// `[neo4j]` table of the config file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileNeo4j {
    pub uri: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    pub fetch_size: Option<usize>,
}

/// Config file contents; every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub neo4j: FileNeo4j,
    pub output_dir: Option<PathBuf>,
    pub format_version: Option<String>,
    pub sample_size: Option<usize>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub graph: GraphConfig,
    pub output_dir: PathBuf,
    pub format: FormatVersion,
    pub sample_size: Option<usize>,
}

impl Settings {
    /// Load the config file named by `args`, if any, and merge.
    pub fn load(args: &ConnectionArgs) -> Result<Self> {
        let file = match &args.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::resolve(args, file)
    }

    /// Merge flags over file values over defaults.
    ///
    /// Fails on an unknown format version, before anything connects.
    pub fn resolve(args: &ConnectionArgs, file: FileConfig) -> Result<Self> {
        let defaults = GraphConfig::default();
        let tag = args
            .format_version
            .clone()
            .or(file.format_version)
            .unwrap_or_else(|| FormatVersion::default().tag().to_string());
        let format: FormatVersion = tag.parse()?;

        let sample_size = args.sample_size.or(file.sample_size).filter(|n| *n > 0);

        Ok(Self {
            graph: GraphConfig {
                uri: args.uri.clone().or(file.neo4j.uri).unwrap_or(defaults.uri),
                user: args.user.clone().or(file.neo4j.user).unwrap_or(defaults.user),
                password: args
                    .password
                    .clone()
                    .or(file.neo4j.password)
                    .unwrap_or(defaults.password),
                database: args
                    .database
                    .clone()
                    .or(file.neo4j.database)
                    .filter(|db| !db.is_empty()),
                fetch_size: file.neo4j.fetch_size.unwrap_or(defaults.fetch_size),
            },
            output_dir: args
                .output_dir
                .clone()
                .or(file.output_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            format,
            sample_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::resolve(&ConnectionArgs::default(), FileConfig::default()).unwrap();
        assert_eq!(settings.graph.uri, "bolt://localhost:7687");
        assert_eq!(settings.graph.user, "neo4j");
        assert_eq!(settings.graph.password, "password");
        assert_eq!(settings.graph.database, None);
        assert_eq!(settings.output_dir, PathBuf::from("export"));
        assert_eq!(settings.format, FormatVersion::Latest);
        assert_eq!(settings.sample_size, None);
    }

    #[test]
    fn test_flags_override_file() {
        let file: FileConfig = toml::from_str(
            r#"
            output_dir = "from-file"
            format_version = "0.1.0"

            [neo4j]
            uri = "bolt://file:7687"
            database = "movies"
            "#,
        )
        .unwrap();
        let args = ConnectionArgs {
            uri: Some("bolt://flag:7687".into()),
            format_version: Some("2.4.0".into()),
            ..Default::default()
        };

        let settings = Settings::resolve(&args, file).unwrap();
        assert_eq!(settings.graph.uri, "bolt://flag:7687");
        assert_eq!(settings.graph.database.as_deref(), Some("movies"));
        assert_eq!(settings.output_dir, PathBuf::from("from-file"));
        assert_eq!(settings.format, FormatVersion::Indexed);
    }

    #[test]
    fn test_unknown_format_rejected() {
        let args = ConnectionArgs {
            format_version: Some("9.9".into()),
            ..Default::default()
        };
        let err = Settings::resolve(&args, FileConfig::default()).unwrap_err();
        assert!(err.to_string().contains("9.9"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graphport.toml");
        std::fs::write(&path, "sample_size = 1000\n[neo4j]\nuser = \"reader\"\n").unwrap();

        let args = ConnectionArgs {
            config: Some(path),
            ..Default::default()
        };
        let settings = Settings::load(&args).unwrap();
        assert_eq!(settings.graph.user, "reader");
        assert_eq!(settings.sample_size, Some(1000));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let args = ConnectionArgs {
            config: Some(PathBuf::from("/nonexistent/graphport.toml")),
            ..Default::default()
        };
        assert!(Settings::load(&args).is_err());
    }
}
