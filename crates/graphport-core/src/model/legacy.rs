//! `0.1.0` document: file, graph and mapping models without constraints.

use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::{infer_type, position, sample_text, ExportFacts, FormatVersion};

/// Stable property identifier so repeated renders are byte-identical.
fn property_identifier(owner: &str, property: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("{}/{}", owner, property).as_bytes()).to_string()
}

pub(super) fn render(facts: &ExportFacts) -> Value {
    let mut graph_nodes = Vec::new();
    let mut graph_rels = Vec::new();
    let mut file_schemas = Map::new();
    let mut node_schemas = Map::new();
    let mut rel_schemas = Map::new();
    let mut node_mappings = Map::new();
    let mut rel_mappings = Map::new();

    for (i, node) in facts.nodes.iter().enumerate() {
        let node_id = format!("n{}", i);
        let label = &node.schema.label;
        let file_name = node.schema.file_name();

        graph_nodes.push(json!({
            "id": node_id,
            "position": position(i),
            "caption": label,
        }));

        file_schemas.insert(
            file_name.clone(),
            json!({
                "expanded": false,
                "fields": node.fields.iter().map(|f| json!({
                    "name": f,
                    "type": infer_type(node.sample.get(f)),
                    "sample": sample_text(node.sample.get(f)),
                    "include": true,
                })).collect::<Vec<_>>(),
            }),
        );

        let properties: Vec<Value> = node
            .fields
            .iter()
            .map(|f| {
                json!({
                    "property": f,
                    "type": infer_type(node.sample.get(f)),
                    "identifier": property_identifier(label, f),
                })
            })
            .collect();

        node_schemas.insert(
            node_id.clone(),
            json!({
                "label": label,
                "additionLabels": [],
                "labelProperties": [],
                "properties": properties,
                "key": {
                    "properties": [property_identifier(label, node.key_field())],
                    "name": "",
                },
            }),
        );

        node_mappings.insert(
            node_id.clone(),
            json!({
                "nodeSchema": node_id,
                "fileSchema": file_name,
                "mappings": node.fields.iter().map(|f| json!({ "field": f })).collect::<Vec<_>>(),
            }),
        );
    }

    for (k, rel) in facts.relationships.iter().enumerate() {
        let pattern = &rel.pattern;
        let (Some(source), Some(target)) = (
            facts.node_index(&pattern.source_label),
            facts.node_index(&pattern.target_label),
        ) else {
            continue;
        };
        let rel_id = format!("n{}", k);
        let source_id = format!("n{}", source);
        let target_id = format!("n{}", target);
        let file_name = pattern.file_name();
        let owner = format!("{}/{}", file_name, pattern.rel_type);

        graph_rels.push(json!({
            "id": rel_id,
            "type": pattern.rel_type,
            "fromId": source_id,
            "toId": target_id,
        }));

        file_schemas.insert(
            file_name.clone(),
            json!({
                "expanded": false,
                "fields": rel.fields.iter().map(|f| json!({
                    "name": f,
                    "type": infer_type(rel.sample.get(f)),
                    "sample": sample_text(rel.sample.get(f)),
                    "include": true,
                })).collect::<Vec<_>>(),
            }),
        );

        rel_schemas.insert(
            rel_id.clone(),
            json!({
                "type": pattern.rel_type,
                "sourceNodeSchema": source_id,
                "targetNodeSchema": target_id,
                "properties": rel.property_fields().iter().map(|f| json!({
                    "property": f,
                    "type": infer_type(rel.sample.get(f)),
                    "identifier": property_identifier(&owner, f),
                })).collect::<Vec<_>>(),
            }),
        );

        rel_mappings.insert(
            rel_id.clone(),
            json!({
                "relationshipSchema": rel_id,
                "mappings": rel.property_fields().iter().map(|f| json!({ "field": f })).collect::<Vec<_>>(),
                "sourceMappings": [{ "field": rel.endpoints.source }],
                "targetMappings": [{ "field": rel.endpoints.target }],
                "fileSchema": file_name,
            }),
        );
    }

    json!({
        "version": FormatVersion::Legacy.document_version(),
        "graph": {
            "nodes": graph_nodes,
            "relationships": graph_rels,
        },
        "dataModel": {
            "fileModel": { "fileSchemas": file_schemas },
            "graphModel": {
                "nodeSchemas": node_schemas,
                "relationshipSchemas": rel_schemas,
            },
            "mappingModel": {
                "nodeMappings": node_mappings,
                "relationshipMappings": rel_mappings,
            },
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::fixture;

    #[test]
    fn test_legacy_has_no_constraint_section() {
        let doc = render(&fixture());
        let text = doc.to_string();
        assert!(!text.contains("constraints"));
        assert!(!text.contains("indexes"));
    }

    #[test]
    fn test_legacy_relationship_mapping_uses_endpoint_columns() {
        let doc = render(&fixture());
        let mapping = &doc["dataModel"]["mappingModel"]["relationshipMappings"]["n2"];
        assert_eq!(mapping["fileSchema"], "Person_KNOWS_Person.csv");
        assert_eq!(mapping["sourceMappings"][0]["field"], "Person_email_source");
        assert_eq!(mapping["targetMappings"][0]["field"], "Person_email_target");
        assert_eq!(mapping["mappings"][0]["field"], "since");
    }

    #[test]
    fn test_property_identifiers_are_stable() {
        assert_eq!(property_identifier("Bank", "id"), property_identifier("Bank", "id"));
        assert_ne!(property_identifier("Bank", "id"), property_identifier("Bank", "name"));
    }

    #[test]
    fn test_sample_values_flow_into_file_schema() {
        let doc = render(&fixture());
        let fields = &doc["dataModel"]["fileModel"]["fileSchemas"]["Transaction.csv"]["fields"];
        assert_eq!(fields[0]["name"], "txId");
        assert_eq!(fields[0]["sample"], "t1");
        assert_eq!(fields[1]["type"], "float");
    }
}
