//! Identifier resolution.
//!
//! Picks, per label, the property that names each exported row. Precedence
//! (first match wins):
//!
//! 1. a single-property uniqueness constraint on the label
//! 2. a property literally named `id`
//! 3. the first property, in lexical order, whose distinct non-null value
//!    count equals the number of nodes carrying it
//! 4. the internal node id (surrogate)
//!
//! Rule 3 is a heuristic over the current data, not a guarantee; the
//! database does not enforce it.

use tracing::{info, warn};

use crate::error::ExportResult;
use crate::schema::{
    ConstraintInfo, EntityType, GraphSchema, IdentifierChoice, LabelSchema, ResolutionMethod,
};
use crate::source::GraphSource;

/// Resolve identifiers for every label in the schema, in schema order.
pub async fn resolve_labels<S: GraphSource + ?Sized>(
    source: &S,
    schema: &GraphSchema,
) -> ExportResult<Vec<LabelSchema>> {
    let mut resolved = Vec::with_capacity(schema.labels.len());
    for (label, keys) in &schema.labels {
        resolved.push(resolve_identifier(source, label, keys, &schema.constraints).await?);
    }
    Ok(resolved)
}

/// Resolve the identifier of a single label.
pub async fn resolve_identifier<S: GraphSource + ?Sized>(
    source: &S,
    label: &str,
    property_keys: &[String],
    constraints: &[ConstraintInfo],
) -> ExportResult<LabelSchema> {
    let mut keys = property_keys.to_vec();
    keys.sort();
    keys.dedup();

    let (identifier, method) = choose(source, label, &keys, constraints).await?;

    match method {
        ResolutionMethod::UniqueValue => warn!(
            label,
            property = identifier.field(),
            "Identifier chosen from incidentally unique values; not enforced by a constraint"
        ),
        _ => info!(label, property = identifier.field(), method = method.as_str(), "Identifier resolved"),
    }

    Ok(LabelSchema {
        label: label.to_string(),
        property_keys: keys,
        identifier,
        method,
    })
}

async fn choose<S: GraphSource + ?Sized>(
    source: &S,
    label: &str,
    keys: &[String],
    constraints: &[ConstraintInfo],
) -> ExportResult<(IdentifierChoice, ResolutionMethod)> {
    if let Some(property) = constrained_property(label, constraints) {
        return Ok((IdentifierChoice::Property(property), ResolutionMethod::Constraint));
    }

    if keys.iter().any(|k| k == "id") {
        return Ok((IdentifierChoice::Property("id".to_string()), ResolutionMethod::IdProperty));
    }

    // Nothing to probe; the rules above need no data and still apply.
    if source.count_nodes(label).await? == 0 {
        return Ok((IdentifierChoice::Surrogate, ResolutionMethod::Surrogate));
    }

    for key in keys {
        let stats = source.property_stats(label, key).await?;
        if stats.is_unique() {
            return Ok((IdentifierChoice::Property(key.clone()), ResolutionMethod::UniqueValue));
        }
    }

    Ok((IdentifierChoice::Surrogate, ResolutionMethod::Surrogate))
}

/// Lexically smallest property among the label's single-property uniqueness constraints.
fn constrained_property(label: &str, constraints: &[ConstraintInfo]) -> Option<String> {
    constraints
        .iter()
        .filter(|c| {
            c.entity_type == EntityType::Node
                && c.entity == label
                && c.is_uniqueness()
                && c.properties.len() == 1
        })
        .map(|c| c.properties[0].clone())
        .min()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryGraph;
    use serde_json::json;

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|k| k.to_string()).collect()
    }

    #[tokio::test]
    async fn test_constraint_beats_id_property() {
        let mut graph = MemoryGraph::new();
        graph.node(&["Customer"], json!({"id": 1, "email": "a@x.com"}));
        graph.node(&["Customer"], json!({"id": 2, "email": "b@x.com"}));
        graph.unique("Customer", &["email"]);

        let schema = resolve_identifier(&graph, "Customer", &keys(&["email", "id"]), &graph.constraints)
            .await
            .unwrap();

        assert_eq!(schema.identifier, IdentifierChoice::Property("email".into()));
        assert_eq!(schema.method, ResolutionMethod::Constraint);
    }

    #[tokio::test]
    async fn test_composite_constraint_is_ignored() {
        let mut graph = MemoryGraph::new();
        graph.node(&["Order"], json!({"id": 1, "a": 1, "b": 2}));
        graph.unique("Order", &["a", "b"]);

        let schema = resolve_identifier(&graph, "Order", &keys(&["a", "b", "id"]), &graph.constraints)
            .await
            .unwrap();

        assert_eq!(schema.identifier, IdentifierChoice::Property("id".into()));
        assert_eq!(schema.method, ResolutionMethod::IdProperty);
    }

    #[tokio::test]
    async fn test_id_property_beats_unique_values() {
        let mut graph = MemoryGraph::new();
        graph.node(&["Account"], json!({"id": 7, "iban": "A"}));
        graph.node(&["Account"], json!({"id": 7, "iban": "B"}));

        let schema = resolve_identifier(&graph, "Account", &keys(&["iban", "id"]), &[])
            .await
            .unwrap();

        assert_eq!(schema.identifier, IdentifierChoice::Property("id".into()));
    }

    #[tokio::test]
    async fn test_unique_value_probe_picks_first_lexically() {
        let mut graph = MemoryGraph::new();
        graph.node(&["Merchant"], json!({"name": "m1", "code": "c1", "city": "X"}));
        graph.node(&["Merchant"], json!({"name": "m2", "code": "c2", "city": "X"}));

        for _ in 0..3 {
            let schema = resolve_identifier(&graph, "Merchant", &keys(&["name", "city", "code"]), &[])
                .await
                .unwrap();
            assert_eq!(schema.identifier, IdentifierChoice::Property("code".into()));
            assert_eq!(schema.method, ResolutionMethod::UniqueValue);
        }
    }

    #[tokio::test]
    async fn test_unique_probe_ignores_missing_values() {
        let mut graph = MemoryGraph::new();
        graph.node(&["Device"], json!({"serial": "s1", "kind": "a"}));
        graph.node(&["Device"], json!({"kind": "a"}));

        let schema = resolve_identifier(&graph, "Device", &keys(&["kind", "serial"]), &[])
            .await
            .unwrap();

        assert_eq!(schema.identifier, IdentifierChoice::Property("serial".into()));
    }

    #[tokio::test]
    async fn test_surrogate_when_nothing_qualifies() {
        let mut graph = MemoryGraph::new();
        graph.node(&["Tag"], json!({"color": "red"}));
        graph.node(&["Tag"], json!({"color": "red"}));

        let schema = resolve_identifier(&graph, "Tag", &keys(&["color"]), &[]).await.unwrap();

        assert_eq!(schema.identifier, IdentifierChoice::Surrogate);
        assert_eq!(schema.method, ResolutionMethod::Surrogate);
    }

    #[tokio::test]
    async fn test_empty_label_is_surrogate_without_probing() {
        let graph = MemoryGraph::new();
        let schema = resolve_identifier(&graph, "Ghost", &keys(&["a", "b"]), &[]).await.unwrap();

        assert_eq!(schema.identifier, IdentifierChoice::Surrogate);
        // Only the node count was queried.
        assert_eq!(graph.query_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_label_keeps_constrained_key() {
        let mut graph = MemoryGraph::new();
        graph.unique("Ghost", &["key"]);

        let schema = resolve_identifier(&graph, "Ghost", &keys(&["key"]), &graph.constraints)
            .await
            .unwrap();

        assert_eq!(schema.identifier, IdentifierChoice::Property("key".into()));
        assert_eq!(schema.method, ResolutionMethod::Constraint);
        // Decided from the declared schema alone.
        assert_eq!(graph.query_count(), 0);
    }

    #[tokio::test]
    async fn test_relationship_constraint_does_not_apply_to_label() {
        let mut graph = MemoryGraph::new();
        graph.node(&["Person"], json!({"id": 1}));
        graph.constraints.push(ConstraintInfo {
            name: "r".into(),
            kind: "RELATIONSHIP_UNIQUENESS".into(),
            entity_type: EntityType::Relationship,
            entity: "Person".into(),
            properties: vec!["since".into()],
        });

        let schema = resolve_identifier(&graph, "Person", &keys(&["id"]), &graph.constraints)
            .await
            .unwrap();

        assert_eq!(schema.method, ResolutionMethod::IdProperty);
    }
}
