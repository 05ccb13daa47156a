//! Relationship pattern discovery.
//!
//! A relationship type may connect several label pairs; the declared schema
//! does not say which ones. Patterns are therefore read from live data. The
//! source and target label of a relationship is the *first* label of each
//! endpoint node. Changing that policy would change which files are produced.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::error::ExportResult;
use crate::schema::{GraphSchema, RelationshipPattern};
use crate::source::GraphSource;

/// Discover every instantiated (type, source label, target label) triple.
///
/// Types with no live instances produce no pattern. Order follows the
/// schema's type order, then first-seen pair order within each type.
pub async fn discover_patterns<S: GraphSource + ?Sized>(
    source: &S,
    schema: &GraphSchema,
) -> ExportResult<Vec<RelationshipPattern>> {
    info!("Discovering relationship patterns");

    let mut patterns = Vec::new();
    for rel_type in &schema.relationship_types {
        let pairs = dedup_pairs(source.endpoint_label_pairs(&rel_type.name).await?);
        if pairs.is_empty() {
            debug!(rel_type = %rel_type.name, "No live instances, skipping");
            continue;
        }

        for (source_label, target_label) in pairs {
            let property_keys = source
                .pattern_property_keys(&rel_type.name, &source_label, &target_label)
                .await?;
            debug!(
                rel_type = %rel_type.name,
                source = %source_label,
                target = %target_label,
                "Pattern found"
            );
            patterns.push(RelationshipPattern {
                rel_type: rel_type.name.clone(),
                source_label,
                target_label,
                property_keys,
            });
        }
    }

    info!(patterns = patterns.len(), "Relationship patterns discovered");
    Ok(patterns)
}

/// Keep the first occurrence of each pair.
fn dedup_pairs(pairs: Vec<(String, String)>) -> Vec<(String, String)> {
    let mut seen = HashSet::new();
    pairs
        .into_iter()
        .filter(|pair| seen.insert(pair.clone()))
        .collect()
}
