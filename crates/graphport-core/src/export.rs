//! Export pipeline.
//!
//! Runs a single export sequentially: introspection, identifier resolution,
//! pattern discovery, row extraction, then model construction. Any failure
//! aborts the run; nothing is resumed.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::discover::discover_patterns;
use crate::error::ExportResult;
use crate::extract::{extract_nodes, extract_relationships, FileStats, RowSink};
use crate::introspect::introspect;
use crate::model::{ExportFacts, FormatVersion, ImportModel};
use crate::resolve::resolve_labels;
use crate::schema::{GraphSchema, LabelSchema, RelationshipPattern};
use crate::source::GraphSource;

/// Schema decisions made before any rows are read.
#[derive(Debug, Clone)]
pub struct ExportPlan {
    pub schema: GraphSchema,
    pub labels: Vec<LabelSchema>,
    pub patterns: Vec<RelationshipPattern>,
}

/// Result of a completed export.
#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub model: ImportModel,
    pub plan: ExportPlan,
    pub files: Vec<FileStats>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ExportOutcome {
    pub fn rows_written(&self) -> u64 {
        self.files.iter().map(|f| f.written).sum()
    }

    pub fn rows_skipped(&self) -> u64 {
        self.files.iter().map(|f| f.skipped).sum()
    }
}

/// Introspect, resolve identifiers and discover patterns.
pub async fn plan_export<S: GraphSource + ?Sized>(source: &S) -> ExportResult<ExportPlan> {
    let schema = introspect(source).await?;
    let labels = resolve_labels(source, &schema).await?;
    let patterns = discover_patterns(source, &schema).await?;
    Ok(ExportPlan {
        schema,
        labels,
        patterns,
    })
}

/// Run a full export into `sink` and build the model for `format`.
///
/// The format tag is validated before the database is touched.
pub async fn run_export<S, K>(source: &S, sink: &mut K, format: &str) -> ExportResult<ExportOutcome>
where
    S: GraphSource + ?Sized,
    K: RowSink + ?Sized,
{
    let version: FormatVersion = format.parse()?;
    let started_at = Utc::now();
    info!(version = %version, "Starting export");

    let plan = plan_export(source).await?;

    let mut facts = ExportFacts {
        constraints: plan.schema.constraints.clone(),
        indexes: plan.schema.indexes.clone(),
        ..Default::default()
    };
    let mut files = Vec::new();

    for label in &plan.labels {
        let (node_file, stats) = extract_nodes(source, label, sink).await?;
        facts.nodes.push(node_file);
        files.push(stats);
    }

    let by_label: HashMap<&str, &LabelSchema> =
        plan.labels.iter().map(|l| (l.label.as_str(), l)).collect();

    for pattern in &plan.patterns {
        let (Some(source_schema), Some(target_schema)) = (
            by_label.get(pattern.source_label.as_str()),
            by_label.get(pattern.target_label.as_str()),
        ) else {
            warn!(
                rel_type = %pattern.rel_type,
                source = %pattern.source_label,
                target = %pattern.target_label,
                "Endpoint label not exported, skipping pattern"
            );
            continue;
        };
        let (rel_file, stats) =
            extract_relationships(source, pattern, source_schema, target_schema, sink).await?;
        facts.relationships.push(rel_file);
        files.push(stats);
    }

    let model = ImportModel::build(&facts, version);
    let finished_at = Utc::now();

    let outcome = ExportOutcome {
        model,
        plan,
        files,
        started_at,
        finished_at,
    };
    info!(
        labels = outcome.plan.labels.len(),
        patterns = outcome.plan.patterns.len(),
        rows = outcome.rows_written(),
        skipped = outcome.rows_skipped(),
        "Export complete"
    );
    Ok(outcome)
}
