//! CLI command definitions and handlers.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{ConnectionArgs, Settings};

pub mod export;
pub mod inspect;

/// Export a Neo4j graph as CSV files plus an importer mapping model
#[derive(Parser)]
#[command(name = "graphport")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Export every label and relationship pattern and write the model
    Export(export::ExportArgs),

    /// Show the inferred identifiers and relationship patterns without writing files
    Inspect,
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let settings = Settings::load(&self.connection)?;

        match self.command {
            Commands::Export(args) => export::execute(args, &settings).await,
            Commands::Inspect => inspect::execute(&settings).await,
        }
    }
}
