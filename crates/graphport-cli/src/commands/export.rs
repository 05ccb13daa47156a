//! `graphport export`: run the full pipeline into the output directory.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use graphport_core::{run_export, CsvPackager};
use graphport_graph::{GraphClient, Neo4jSource};

use crate::config::Settings;
use crate::output;

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Do not print the per-file table
    #[arg(short, long)]
    pub quiet: bool,
}

pub async fn execute(args: ExportArgs, settings: &Settings) -> Result<()> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]")?);
    spinner.enable_steady_tick(Duration::from_millis(100));

    spinner.set_message(format!("Connecting to {}", settings.graph.uri));
    let client = GraphClient::connect(&settings.graph).await?;
    let source = Neo4jSource::new(client, settings.sample_size);

    let mut packager = CsvPackager::create(&settings.output_dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            settings.output_dir.display()
        )
    })?;

    spinner.set_message(format!(
        "Exporting to {} (format {})",
        settings.output_dir.display(),
        settings.format
    ));
    let result = run_export(&source, &mut packager, settings.format.tag()).await;
    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e).context("Export failed");
        }
    };
    let model_path = packager.write_model(&outcome.model)?;
    spinner.finish_and_clear();

    println!("{}", "Export complete".green().bold());
    output::print_export_summary(&outcome, &model_path, !args.quiet);
    Ok(())
}
