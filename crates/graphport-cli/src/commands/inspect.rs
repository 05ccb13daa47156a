//! `graphport inspect`: plan an export without reading rows.

use anyhow::Result;
use colored::Colorize;

use graphport_core::plan_export;
use graphport_graph::{GraphClient, Neo4jSource};

use crate::config::Settings;
use crate::output;

pub async fn execute(settings: &Settings) -> Result<()> {
    println!(
        "{} {}",
        "Inspecting".bold(),
        settings.graph.uri.cyan()
    );

    let client = GraphClient::connect(&settings.graph).await?;
    let source = Neo4jSource::new(client, settings.sample_size);
    let plan = plan_export(&source).await?;

    output::print_plan(&plan);
    Ok(())
}
