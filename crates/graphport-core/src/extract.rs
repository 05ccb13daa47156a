//! Row extraction.
//!
//! Streams node rows per label and relationship rows per pattern into a
//! [`RowSink`]. Rows whose resolved identifier (or either endpoint
//! identifier) is null are skipped and counted, never written.

use futures::StreamExt;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::ExportResult;
use crate::model::{NodeFile, RelationshipFile, Sample};
use crate::schema::{EndpointFields, LabelSchema, RelationshipPattern};
use crate::source::{is_null_value, value_to_text, GraphSource, Properties};

/// Destination for tabular rows, one file at a time.
pub trait RowSink {
    fn begin_file(&mut self, name: &str, header: &[String]) -> ExportResult<()>;
    fn write_row(&mut self, row: &[String]) -> ExportResult<()>;
    fn finish_file(&mut self) -> ExportResult<()>;
}

/// Rows written and skipped for one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileStats {
    pub file_name: String,
    pub written: u64,
    pub skipped: u64,
}

/// Export all nodes of a label.
pub async fn extract_nodes<S, K>(
    source: &S,
    schema: &LabelSchema,
    sink: &mut K,
) -> ExportResult<(NodeFile, FileStats)>
where
    S: GraphSource + ?Sized,
    K: RowSink + ?Sized,
{
    let fields = schema.fields();
    let id_field = schema.identifier.field();
    let mut stats = FileStats {
        file_name: schema.file_name(),
        ..Default::default()
    };
    let mut sample = Sample::new();

    sink.begin_file(&stats.file_name, &fields)?;

    let mut rows = source.node_rows(&schema.label, &schema.identifier);
    while let Some(record) = rows.next().await {
        let record = record?;
        if is_null_value(&record.identifier) {
            stats.skipped += 1;
            continue;
        }

        let values: Vec<Value> = fields
            .iter()
            .map(|field| {
                if field == id_field {
                    record.identifier.clone()
                } else {
                    cell(&record.properties, field)
                }
            })
            .collect();

        write(sink, &fields, values, &mut sample, stats.written == 0)?;
        stats.written += 1;
    }

    sink.finish_file()?;
    report(&stats);

    Ok((
        NodeFile {
            schema: schema.clone(),
            fields,
            sample,
        },
        stats,
    ))
}

/// Export all relationships of a pattern.
pub async fn extract_relationships<S, K>(
    source: &S,
    pattern: &RelationshipPattern,
    source_schema: &LabelSchema,
    target_schema: &LabelSchema,
    sink: &mut K,
) -> ExportResult<(RelationshipFile, FileStats)>
where
    S: GraphSource + ?Sized,
    K: RowSink + ?Sized,
{
    let endpoints = EndpointFields::new(pattern, source_schema, target_schema);
    let properties: Vec<String> = pattern
        .property_keys
        .iter()
        .filter(|k| **k != endpoints.source && **k != endpoints.target)
        .cloned()
        .collect();

    let mut fields = vec![endpoints.source.clone(), endpoints.target.clone()];
    fields.extend(properties.iter().cloned());

    let mut stats = FileStats {
        file_name: pattern.file_name(),
        ..Default::default()
    };
    let mut sample = Sample::new();

    sink.begin_file(&stats.file_name, &fields)?;

    let mut rows = source.relationship_rows(
        pattern,
        &source_schema.identifier,
        &target_schema.identifier,
    );
    while let Some(record) = rows.next().await {
        let record = record?;
        if is_null_value(&record.source) || is_null_value(&record.target) {
            stats.skipped += 1;
            continue;
        }

        let mut values = vec![record.source, record.target];
        values.extend(properties.iter().map(|k| cell(&record.properties, k)));

        write(sink, &fields, values, &mut sample, stats.written == 0)?;
        stats.written += 1;
    }

    sink.finish_file()?;
    report(&stats);

    Ok((
        RelationshipFile {
            pattern: pattern.clone(),
            source_key: source_schema.identifier.field().to_string(),
            target_key: target_schema.identifier.field().to_string(),
            endpoints,
            fields,
            sample,
        },
        stats,
    ))
}

fn cell(properties: &Properties, key: &str) -> Value {
    properties.get(key).cloned().unwrap_or(Value::Null)
}

fn write<K: RowSink + ?Sized>(
    sink: &mut K,
    fields: &[String],
    values: Vec<Value>,
    sample: &mut Sample,
    first: bool,
) -> ExportResult<()> {
    let row: Vec<String> = values.iter().map(value_to_text).collect();
    sink.write_row(&row)?;
    if first {
        sample.extend(fields.iter().cloned().zip(values));
    }
    Ok(())
}

fn report(stats: &FileStats) {
    if stats.skipped > 0 {
        warn!(
            file = %stats.file_name,
            skipped = stats.skipped,
            "Skipped rows with NULL identifiers"
        );
    }
    if stats.written == 0 {
        debug!(file = %stats.file_name, "No rows exported");
    }
    info!(file = %stats.file_name, rows = stats.written, "File exported");
}
