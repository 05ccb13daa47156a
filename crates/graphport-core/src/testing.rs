//! In-memory graph used by the unit tests.

use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::{json, Value};

use crate::error::{ExportError, ExportResult};
use crate::schema::{
    ConstraintInfo, EntityType, IdentifierChoice, IndexInfo, RelationshipPattern,
};
use crate::source::{GraphSource, NodeRecord, Properties, PropertyStats, RelationshipRecord};

pub struct MemNode {
    pub id: i64,
    pub labels: Vec<String>,
    pub properties: Properties,
}

pub struct MemRel {
    pub rel_type: String,
    pub start: i64,
    pub end: i64,
    pub properties: Properties,
}

#[derive(Default)]
pub struct MemoryGraph {
    pub nodes: Vec<MemNode>,
    pub rels: Vec<MemRel>,
    pub constraints: Vec<ConstraintInfo>,
    pub indexes: Vec<IndexInfo>,
    /// Operation that fails when called; row streams fail after their first row.
    pub fail_on: Option<&'static str>,
    queries: AtomicUsize,
}

fn props(value: Value) -> Properties {
    match value {
        Value::Object(map) => map.into_iter().collect(),
        _ => Properties::new(),
    }
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node and return its internal id.
    pub fn node(&mut self, labels: &[&str], properties: Value) -> i64 {
        let id = self.nodes.len() as i64;
        self.nodes.push(MemNode {
            id,
            labels: labels.iter().map(|l| l.to_string()).collect(),
            properties: props(properties),
        });
        id
    }

    pub fn rel(&mut self, start: i64, rel_type: &str, end: i64, properties: Value) {
        self.rels.push(MemRel {
            rel_type: rel_type.to_string(),
            start,
            end,
            properties: props(properties),
        });
    }

    pub fn unique(&mut self, label: &str, properties: &[&str]) {
        self.constraints.push(ConstraintInfo {
            name: format!("{}_{}_unique", label, properties.join("_")),
            kind: "UNIQUENESS".to_string(),
            entity_type: EntityType::Node,
            entity: label.to_string(),
            properties: properties.iter().map(|p| p.to_string()).collect(),
        });
    }

    pub fn index(&mut self, label: &str, properties: &[&str]) {
        self.indexes.push(IndexInfo {
            name: format!("{}_{}_index", label, properties.join("_")),
            kind: "RANGE".to_string(),
            entity_type: EntityType::Node,
            entity: label.to_string(),
            properties: properties.iter().map(|p| p.to_string()).collect(),
        });
    }

    /// Number of queries issued so far.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Count a query; fails when `op` is the operation set in `fail_on`.
    fn hit(&self, op: &'static str) -> ExportResult<()> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_on == Some(op) {
            return Err(ExportError::query(op, "connection reset by peer"));
        }
        Ok(())
    }

    fn find(&self, id: i64) -> Option<&MemNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    fn first_label(&self, id: i64) -> Option<&str> {
        self.find(id).and_then(|n| n.labels.first()).map(String::as_str)
    }

    fn with_label<'a>(&'a self, label: &'a str) -> impl Iterator<Item = &'a MemNode> + 'a {
        self.nodes
            .iter()
            .filter(move |n| n.labels.iter().any(|l| l == label))
    }

    fn identifier(&self, id: i64, choice: &IdentifierChoice) -> Value {
        match (self.find(id), choice) {
            (Some(node), IdentifierChoice::Property(key)) => {
                node.properties.get(key).cloned().unwrap_or(Value::Null)
            }
            (Some(node), IdentifierChoice::Surrogate) => json!(node.id),
            (None, _) => Value::Null,
        }
    }

    fn pattern_rels<'a>(
        &'a self,
        rel_type: &'a str,
        source: &'a str,
        target: &'a str,
    ) -> impl Iterator<Item = &'a MemRel> + 'a {
        self.rels.iter().filter(move |r| {
            r.rel_type == rel_type
                && self.first_label(r.start) == Some(source)
                && self.first_label(r.end) == Some(target)
        })
    }
}

fn sorted_keys<'a>(maps: impl Iterator<Item = &'a Properties>) -> Vec<String> {
    let keys: BTreeSet<String> = maps.flat_map(|m| m.keys().cloned()).collect();
    keys.into_iter().collect()
}

#[async_trait]
impl GraphSource for MemoryGraph {
    async fn labels(&self) -> ExportResult<Vec<String>> {
        self.hit("labels")?;
        let labels: BTreeSet<String> = self.nodes.iter().flat_map(|n| n.labels.clone()).collect();
        Ok(labels.into_iter().collect())
    }

    async fn relationship_types(&self) -> ExportResult<Vec<String>> {
        self.hit("relationship_types")?;
        let types: BTreeSet<String> = self.rels.iter().map(|r| r.rel_type.clone()).collect();
        Ok(types.into_iter().collect())
    }

    async fn node_property_keys(&self, label: &str) -> ExportResult<Vec<String>> {
        self.hit("node_property_keys")?;
        Ok(sorted_keys(self.with_label(label).map(|n| &n.properties)))
    }

    async fn relationship_property_keys(&self, rel_type: &str) -> ExportResult<Vec<String>> {
        self.hit("relationship_property_keys")?;
        Ok(sorted_keys(
            self.rels
                .iter()
                .filter(|r| r.rel_type == rel_type)
                .map(|r| &r.properties),
        ))
    }

    async fn pattern_property_keys(
        &self,
        rel_type: &str,
        source_label: &str,
        target_label: &str,
    ) -> ExportResult<Vec<String>> {
        self.hit("pattern_property_keys")?;
        Ok(sorted_keys(
            self.pattern_rels(rel_type, source_label, target_label)
                .map(|r| &r.properties),
        ))
    }

    async fn constraints(&self) -> ExportResult<Vec<ConstraintInfo>> {
        self.hit("constraints")?;
        Ok(self.constraints.clone())
    }

    async fn indexes(&self) -> ExportResult<Vec<IndexInfo>> {
        self.hit("indexes")?;
        Ok(self.indexes.clone())
    }

    async fn count_nodes(&self, label: &str) -> ExportResult<u64> {
        self.hit("count_nodes")?;
        Ok(self.with_label(label).count() as u64)
    }

    async fn property_stats(&self, label: &str, key: &str) -> ExportResult<PropertyStats> {
        self.hit("property_stats")?;
        let values: Vec<&Value> = self
            .with_label(label)
            .filter_map(|n| n.properties.get(key))
            .filter(|v| !v.is_null())
            .collect();
        let distinct: HashSet<String> = values.iter().map(|v| v.to_string()).collect();
        Ok(PropertyStats {
            present: values.len() as u64,
            distinct: distinct.len() as u64,
        })
    }

    async fn endpoint_label_pairs(&self, rel_type: &str) -> ExportResult<Vec<(String, String)>> {
        self.hit("endpoint_label_pairs")?;
        let mut pairs: Vec<(String, String)> = Vec::new();
        for rel in self.rels.iter().filter(|r| r.rel_type == rel_type) {
            if let (Some(s), Some(t)) = (self.first_label(rel.start), self.first_label(rel.end)) {
                // Repeated on purpose: callers deduplicate.
                pairs.push((s.to_string(), t.to_string()));
            }
        }
        Ok(pairs)
    }

    fn node_rows<'a>(
        &'a self,
        label: &'a str,
        identifier: &'a IdentifierChoice,
    ) -> BoxStream<'a, ExportResult<NodeRecord>> {
        let failure = self.hit("node_rows").err();
        let mut rows: Vec<ExportResult<NodeRecord>> = self
            .with_label(label)
            .map(|n| {
                Ok(NodeRecord {
                    identifier: self.identifier(n.id, identifier),
                    properties: n.properties.clone(),
                })
            })
            .collect();
        if let Some(err) = failure {
            rows.insert(rows.len().min(1), Err(err));
        }
        stream::iter(rows).boxed()
    }

    fn relationship_rows<'a>(
        &'a self,
        pattern: &'a RelationshipPattern,
        source: &'a IdentifierChoice,
        target: &'a IdentifierChoice,
    ) -> BoxStream<'a, ExportResult<RelationshipRecord>> {
        let failure = self.hit("relationship_rows").err();
        let mut rows: Vec<ExportResult<RelationshipRecord>> = self
            .pattern_rels(&pattern.rel_type, &pattern.source_label, &pattern.target_label)
            .map(|r| {
                Ok(RelationshipRecord {
                    source: self.identifier(r.start, source),
                    target: self.identifier(r.end, target),
                    properties: r.properties.clone(),
                })
            })
            .collect();
        if let Some(err) = failure {
            rows.insert(rows.len().min(1), Err(err));
        }
        stream::iter(rows).boxed()
    }
}

