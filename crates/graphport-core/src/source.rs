//! Database boundary consumed by the export pipeline.

use std::collections::BTreeMap;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;

use crate::error::ExportResult;
use crate::schema::{ConstraintInfo, IdentifierChoice, IndexInfo, RelationshipPattern};

/// Property map of a node or relationship.
pub type Properties = BTreeMap<String, Value>;

/// Presence and cardinality of one property across a label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropertyStats {
    /// Nodes of the label that have the property set.
    pub present: u64,
    /// Distinct non-null values of the property.
    pub distinct: u64,
}

impl PropertyStats {
    /// The property is incidentally unique in this dataset.
    pub fn is_unique(&self) -> bool {
        self.present > 0 && self.present == self.distinct
    }
}

/// One node row as read from the database.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRecord {
    pub identifier: Value,
    pub properties: Properties,
}

/// One relationship row with its resolved endpoint identifiers.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipRecord {
    pub source: Value,
    pub target: Value,
    pub properties: Properties,
}

/// Read-only query interface to the source graph.
///
/// Row methods return forward-only streams so large label sets are never
/// buffered in memory.
#[async_trait]
pub trait GraphSource: Send + Sync {
    /// All node labels, lexically ordered.
    async fn labels(&self) -> ExportResult<Vec<String>>;

    /// All relationship types, lexically ordered.
    async fn relationship_types(&self) -> ExportResult<Vec<String>>;

    /// Property keys observed on nodes of `label`, sorted.
    async fn node_property_keys(&self, label: &str) -> ExportResult<Vec<String>>;

    /// Property keys observed on relationships of `rel_type`, sorted.
    async fn relationship_property_keys(&self, rel_type: &str) -> ExportResult<Vec<String>>;

    /// Property keys observed on `rel_type` between the two first-labels, sorted.
    async fn pattern_property_keys(
        &self,
        rel_type: &str,
        source_label: &str,
        target_label: &str,
    ) -> ExportResult<Vec<String>>;

    async fn constraints(&self) -> ExportResult<Vec<ConstraintInfo>>;

    async fn indexes(&self) -> ExportResult<Vec<IndexInfo>>;

    async fn count_nodes(&self, label: &str) -> ExportResult<u64>;

    async fn property_stats(&self, label: &str, key: &str) -> ExportResult<PropertyStats>;

    /// Distinct (source first-label, target first-label) pairs for `rel_type`,
    /// in first-seen order.
    async fn endpoint_label_pairs(&self, rel_type: &str) -> ExportResult<Vec<(String, String)>>;

    fn node_rows<'a>(
        &'a self,
        label: &'a str,
        identifier: &'a IdentifierChoice,
    ) -> BoxStream<'a, ExportResult<NodeRecord>>;

    fn relationship_rows<'a>(
        &'a self,
        pattern: &'a RelationshipPattern,
        source: &'a IdentifierChoice,
        target: &'a IdentifierChoice,
    ) -> BoxStream<'a, ExportResult<RelationshipRecord>>;
}

/// Absent, JSON null, empty and literal `NULL` values all count as null.
pub fn is_null_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty() || s == "NULL",
        _ => false,
    }
}

/// Text form of a value as written into a CSV cell.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
