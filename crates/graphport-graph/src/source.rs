//! [`GraphSource`] backed by a live Neo4j server.

use std::collections::BTreeMap;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use neo4rs::{DetachedRowStream, Query, Row};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use graphport_core::{
    ConstraintInfo, EntityType, ExportError, ExportResult, GraphSource, IdentifierChoice,
    IndexInfo, NodeRecord, PropertyStats, RelationshipPattern, RelationshipRecord,
};

use crate::client::GraphClient;
use crate::cypher;

/// Reads schema and rows from Neo4j.
pub struct Neo4jSource {
    client: GraphClient,
    /// Entities scanned per key query; all when unset.
    sample_size: Option<usize>,
}

impl Neo4jSource {
    pub fn new(client: GraphClient, sample_size: Option<usize>) -> Self {
        Self {
            client,
            sample_size,
        }
    }

    async fn rows(&self, context: &str, query: Query) -> ExportResult<Vec<Row>> {
        debug!(context, "Running query");
        self.client
            .query(query)
            .await
            .map_err(|e| ExportError::query(context, format!("{:#}", e)))
    }

    async fn strings(&self, context: &str, query: Query, field: &str) -> ExportResult<Vec<String>> {
        self.rows(context, query)
            .await?
            .iter()
            .map(|row| get(row, field, context))
            .collect()
    }

    async fn show_constraints(&self) -> ExportResult<Vec<ConstraintInfo>> {
        let context = "SHOW CONSTRAINTS";
        let rows = self.rows(context, Query::new(cypher::SHOW_CONSTRAINTS.to_string())).await?;
        let mut constraints = Vec::new();
        for row in rows {
            let Some((entity, properties)) = target(&row) else {
                continue;
            };
            constraints.push(ConstraintInfo {
                name: get(&row, "name", context)?,
                kind: get(&row, "type", context)?,
                entity_type: EntityType::from_str(&get::<String>(&row, "entityType", context)?),
                entity,
                properties,
            });
        }
        Ok(constraints)
    }

    async fn legacy_constraints(&self) -> ExportResult<Vec<ConstraintInfo>> {
        let context = "db.constraints()";
        let rows = self.rows(context, Query::new(cypher::LEGACY_CONSTRAINTS.to_string())).await?;
        let mut constraints = Vec::new();
        for row in rows {
            let description: String = get(&row, "description", context)?;
            let Some(parsed) = cypher::parse_legacy_constraint(&description) else {
                warn!(description = %description, "Unrecognized constraint description");
                continue;
            };
            let name = row
                .get::<Option<String>>("name")
                .ok()
                .flatten()
                .unwrap_or_else(|| format!("{}_{}", parsed.entity, parsed.properties.join("_")));
            constraints.push(ConstraintInfo {
                name,
                kind: parsed.kind,
                entity_type: if parsed.relationship {
                    EntityType::Relationship
                } else {
                    EntityType::Node
                },
                entity: parsed.entity,
                properties: parsed.properties,
            });
        }
        Ok(constraints)
    }

    async fn show_indexes(&self) -> ExportResult<Vec<IndexInfo>> {
        let context = "SHOW INDEXES";
        let rows = self.rows(context, Query::new(cypher::SHOW_INDEXES.to_string())).await?;
        let mut indexes = Vec::new();
        for row in rows {
            // Backing indexes of constraints are declared through the constraint.
            if optional::<String>(&row, "owningConstraint").is_some() {
                continue;
            }
            let Some((entity, properties)) = target(&row) else {
                continue;
            };
            indexes.push(IndexInfo {
                name: get(&row, "name", context)?,
                kind: optional(&row, "type").unwrap_or_else(|| "RANGE".to_string()),
                entity_type: EntityType::from_str(
                    &optional::<String>(&row, "entityType").unwrap_or_default(),
                ),
                entity,
                properties,
            });
        }
        Ok(indexes)
    }

    async fn legacy_indexes(&self) -> ExportResult<Vec<IndexInfo>> {
        let context = "db.indexes()";
        let rows = self.rows(context, Query::new(cypher::LEGACY_INDEXES.to_string())).await?;
        let mut indexes = Vec::new();
        for row in rows {
            let entity = optional::<Vec<String>>(&row, "tokenNames")
                .or_else(|| optional(&row, "labelsOrTypes"))
                .and_then(|names| names.into_iter().next());
            let properties: Vec<String> = optional(&row, "properties").unwrap_or_default();
            let Some(entity) = entity else {
                continue;
            };
            if properties.is_empty() {
                continue;
            }
            indexes.push(IndexInfo {
                name: optional(&row, "indexName")
                    .or_else(|| optional(&row, "name"))
                    .unwrap_or_default(),
                kind: "default".to_string(),
                entity_type: EntityType::Node,
                entity,
                properties,
            });
        }
        Ok(indexes)
    }
}

fn get<T: DeserializeOwned>(row: &Row, field: &str, context: &str) -> ExportResult<T> {
    row.get::<T>(field)
        .map_err(|e| ExportError::query(context, format!("field '{}': {:?}", field, e)))
}

fn optional<T: DeserializeOwned>(row: &Row, field: &str) -> Option<T> {
    row.get::<Option<T>>(field).ok().flatten()
}

/// First label/type and property list of a constraint or index row.
/// Lookup indexes have neither and are skipped.
fn target(row: &Row) -> Option<(String, Vec<String>)> {
    let entity = optional::<Vec<String>>(row, "labelsOrTypes")?.into_iter().next()?;
    let properties: Vec<String> = optional(row, "properties")?;
    if properties.is_empty() {
        return None;
    }
    Some((entity, properties))
}

fn props(row: &Row, context: &str) -> ExportResult<BTreeMap<String, Value>> {
    Ok(get::<Option<BTreeMap<String, Value>>>(row, "props", context)?.unwrap_or_default())
}

/// Row cursor state: the query until it is sent, then its open result.
enum Cursor {
    Pending(Query),
    Open(DetachedRowStream),
}

async fn advance(
    client: &GraphClient,
    context: String,
    cursor: Cursor,
) -> ExportResult<Option<((Row, String), Cursor)>> {
    let mut rows = match cursor {
        Cursor::Pending(query) => client
            .stream(query)
            .await
            .map_err(|e| ExportError::query(&context, format!("{:#}", e)))?,
        Cursor::Open(rows) => rows,
    };
    let next = rows
        .next()
        .await
        .map_err(|e| ExportError::query(&context, e))?;
    Ok(next.map(|row| ((row, context), Cursor::Open(rows))))
}

/// Forward-only stream over a query's rows; the result is released when the
/// stream ends or is dropped.
fn row_stream<'a>(
    client: &'a GraphClient,
    query: Query,
    context: String,
) -> BoxStream<'a, ExportResult<(Row, String)>> {
    stream::try_unfold(Cursor::Pending(query), move |cursor| {
        advance(client, context.clone(), cursor)
    })
    .boxed()
}

#[async_trait]
impl GraphSource for Neo4jSource {
    async fn labels(&self) -> ExportResult<Vec<String>> {
        self.strings("labels", Query::new(cypher::LABELS.to_string()), "label")
            .await
    }

    async fn relationship_types(&self) -> ExportResult<Vec<String>> {
        self.strings(
            "relationship types",
            Query::new(cypher::RELATIONSHIP_TYPES.to_string()),
            "relationshipType",
        )
        .await
    }

    async fn node_property_keys(&self, label: &str) -> ExportResult<Vec<String>> {
        let query = Query::new(cypher::node_keys(label, self.sample_size));
        self.strings(&format!("property keys of :{}", label), query, "key")
            .await
    }

    async fn relationship_property_keys(&self, rel_type: &str) -> ExportResult<Vec<String>> {
        let query = Query::new(cypher::relationship_keys(rel_type, self.sample_size));
        self.strings(&format!("property keys of [:{}]", rel_type), query, "key")
            .await
    }

    async fn pattern_property_keys(
        &self,
        rel_type: &str,
        source_label: &str,
        target_label: &str,
    ) -> ExportResult<Vec<String>> {
        let query = Query::new(cypher::pattern_keys(rel_type, self.sample_size))
            .param("source", source_label)
            .param("target", target_label);
        let context = format!(
            "property keys of (:{})-[:{}]->(:{})",
            source_label, rel_type, target_label
        );
        self.strings(&context, query, "key").await
    }

    async fn constraints(&self) -> ExportResult<Vec<ConstraintInfo>> {
        match self.show_constraints().await {
            Ok(constraints) => Ok(constraints),
            Err(e) => {
                warn!(error = %e, "SHOW CONSTRAINTS failed, trying db.constraints()");
                self.legacy_constraints().await
            }
        }
    }

    async fn indexes(&self) -> ExportResult<Vec<IndexInfo>> {
        match self.show_indexes().await {
            Ok(indexes) => Ok(indexes),
            Err(e) => {
                warn!(error = %e, "SHOW INDEXES failed, trying db.indexes()");
                self.legacy_indexes().await
            }
        }
    }

    async fn count_nodes(&self, label: &str) -> ExportResult<u64> {
        let context = format!("count of :{}", label);
        let rows = self
            .rows(&context, Query::new(cypher::count_nodes(label)))
            .await?;
        match rows.first() {
            Some(row) => Ok(get::<i64>(row, "total", &context)?.max(0) as u64),
            None => Ok(0),
        }
    }

    async fn property_stats(&self, label: &str, key: &str) -> ExportResult<PropertyStats> {
        let context = format!("uniqueness of :{}.{}", label, key);
        let query = Query::new(cypher::property_stats(label)).param("key", key);
        let rows = self.rows(&context, query).await?;
        let Some(row) = rows.first() else {
            return Ok(PropertyStats::default());
        };
        Ok(PropertyStats {
            present: get::<i64>(row, "present", &context)?.max(0) as u64,
            distinct: get::<i64>(row, "unique_values", &context)?.max(0) as u64,
        })
    }

    async fn endpoint_label_pairs(&self, rel_type: &str) -> ExportResult<Vec<(String, String)>> {
        let context = format!("label pairs of [:{}]", rel_type);
        let rows = self
            .rows(&context, Query::new(cypher::endpoint_pairs(rel_type)))
            .await?;
        rows.iter()
            .map(|row| Ok((get(row, "source", &context)?, get(row, "target", &context)?)))
            .collect()
    }

    fn node_rows<'a>(
        &'a self,
        label: &'a str,
        identifier: &'a IdentifierChoice,
    ) -> BoxStream<'a, ExportResult<NodeRecord>> {
        let mut query = Query::new(cypher::node_rows(label, identifier));
        if let IdentifierChoice::Property(key) = identifier {
            query = query.param("key", key.as_str());
        }
        row_stream(&self.client, query, format!("rows of :{}", label))
            .map(|item| {
                let (row, context) = item?;
                Ok(NodeRecord {
                    identifier: get(&row, "identifier", &context)?,
                    properties: props(&row, &context)?,
                })
            })
            .boxed()
    }

    fn relationship_rows<'a>(
        &'a self,
        pattern: &'a RelationshipPattern,
        source: &'a IdentifierChoice,
        target: &'a IdentifierChoice,
    ) -> BoxStream<'a, ExportResult<RelationshipRecord>> {
        let mut query = Query::new(cypher::relationship_rows(&pattern.rel_type, source, target))
            .param("source", pattern.source_label.as_str())
            .param("target", pattern.target_label.as_str());
        if let IdentifierChoice::Property(key) = source {
            query = query.param("source_key", key.as_str());
        }
        if let IdentifierChoice::Property(key) = target {
            query = query.param("target_key", key.as_str());
        }
        let context = format!(
            "rows of (:{})-[:{}]->(:{})",
            pattern.source_label, pattern.rel_type, pattern.target_label
        );
        row_stream(&self.client, query, context)
            .map(|item| {
                let (row, context) = item?;
                Ok(RelationshipRecord {
                    source: get(&row, "source_id", &context)?,
                    target: get(&row, "target_id", &context)?,
                    properties: props(&row, &context)?,
                })
            })
            .boxed()
    }
}
