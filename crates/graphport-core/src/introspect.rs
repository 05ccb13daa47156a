//! Schema introspection.
//!
//! Reads labels, relationship types, observed property keys, constraints
//! and indexes. Any query failure aborts the export; there is no
//! partial-schema fallback.

use tracing::{debug, info};

use crate::error::ExportResult;
use crate::schema::{GraphSchema, RelationshipTypeInfo};
use crate::source::GraphSource;

/// Take a schema snapshot of the source graph.
pub async fn introspect<S: GraphSource + ?Sized>(source: &S) -> ExportResult<GraphSchema> {
    info!("Introspecting graph schema");

    let mut labels = Vec::new();
    for label in source.labels().await? {
        let keys = source.node_property_keys(&label).await?;
        debug!(label = %label, keys = keys.len(), "Label properties");
        labels.push((label, keys));
    }

    let mut relationship_types = Vec::new();
    for rel_type in source.relationship_types().await? {
        let property_keys = source.relationship_property_keys(&rel_type).await?;
        debug!(rel_type = %rel_type, keys = property_keys.len(), "Relationship type properties");
        relationship_types.push(RelationshipTypeInfo {
            name: rel_type,
            property_keys,
        });
    }

    let constraints = source.constraints().await?;
    let indexes = source.indexes().await?;

    info!(
        labels = labels.len(),
        relationship_types = relationship_types.len(),
        constraints = constraints.len(),
        indexes = indexes.len(),
        "Schema introspected"
    );

    Ok(GraphSchema {
        labels,
        relationship_types,
        constraints,
        indexes,
    })
}
