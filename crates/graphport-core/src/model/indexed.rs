//! `2.4.0` document: graph schema with one relationship type per pattern,
//! plus constraint and index declarations.

use std::collections::HashMap;

use serde_json::{json, Map, Value};

use super::{infer_type, is_nullable, position, reference, sample_text, ExportFacts, FormatVersion};
use crate::schema::EntityType;

/// Where a constraint or index attaches: entity ref plus its property ids.
struct Target<'a> {
    entity_type: EntityType,
    entity_id: String,
    properties: &'a HashMap<String, String>,
}

pub(super) fn render(facts: &ExportFacts) -> Value {
    let mut viz_nodes = Vec::new();
    let mut node_labels = Vec::new();
    let mut rel_types = Vec::new();
    let mut key_properties = Vec::new();
    let mut tables = Vec::new();
    let mut node_mappings = Vec::new();
    let mut rel_mappings = Vec::new();

    let mut counter = 1usize;
    let mut next_property_id = || {
        let id = format!("p:{}", counter);
        counter += 1;
        id
    };

    // Per node: field name -> property id.
    let mut node_props: Vec<HashMap<String, String>> = Vec::new();

    for (i, node) in facts.nodes.iter().enumerate() {
        let node_id = format!("n:n{}", i);
        let label_id = format!("nl:n{}", i);
        let file_name = node.schema.file_name();

        viz_nodes.push(json!({ "id": node_id, "position": position(i) }));

        let mut ids = HashMap::new();
        let mut properties = Vec::new();
        for field in &node.fields {
            let prop_id = next_property_id();
            properties.push(json!({
                "$id": prop_id,
                "token": field,
                "type": { "type": infer_type(node.sample.get(field)) },
                "nullable": is_nullable(node.sample.get(field)),
            }));
            ids.insert(field.clone(), prop_id);
        }

        node_labels.push(json!({
            "$id": label_id,
            "token": node.schema.label,
            "properties": properties,
        }));

        key_properties.push(json!({
            "node": reference(&node_id),
            "keyProperties": [reference(&ids[node.key_field()])],
        }));

        tables.push(table(&file_name, &node.fields, &node.sample));

        node_mappings.push(json!({
            "node": reference(&node_id),
            "propertyMappings": node.fields.iter().map(|f| json!({
                "property": reference(&ids[f]),
                "fieldName": f,
            })).collect::<Vec<_>>(),
            "tableName": file_name,
        }));

        node_props.push(ids);
    }

    // Per relationship type token: first pattern id and its property ids.
    let mut first_pattern: HashMap<String, (String, HashMap<String, String>)> = HashMap::new();

    for (k, rel) in facts.relationships.iter().enumerate() {
        let pattern = &rel.pattern;
        let (Some(source), Some(target)) = (
            facts.node_index(&pattern.source_label),
            facts.node_index(&pattern.target_label),
        ) else {
            continue;
        };
        let rel_id = format!("r:n{}", k);
        let file_name = pattern.file_name();

        let mut ids = HashMap::new();
        let mut properties = Vec::new();
        for field in rel.property_fields() {
            let prop_id = next_property_id();
            properties.push(json!({
                "$id": prop_id,
                "token": field,
                "type": { "type": infer_type(rel.sample.get(field)) },
                "nullable": is_nullable(rel.sample.get(field)),
            }));
            ids.insert(field.clone(), prop_id);
        }

        rel_types.push(json!({
            "$id": rel_id,
            "token": pattern.rel_type,
            "from": reference(&format!("nl:n{}", source)),
            "to": reference(&format!("nl:n{}", target)),
            "properties": properties,
        }));

        let mut from_mappings = Map::new();
        if let Some(id) = node_props[source].get(&rel.source_key) {
            from_mappings.insert(id.clone(), json!(rel.endpoints.source));
        }
        let mut to_mappings = Map::new();
        if let Some(id) = node_props[target].get(&rel.target_key) {
            to_mappings.insert(id.clone(), json!(rel.endpoints.target));
        }

        rel_mappings.push(json!({
            "relationship": reference(&rel_id),
            "propertyMappings": rel.property_fields().iter().map(|f| json!({
                "property": reference(&ids[f]),
                "fieldName": f,
            })).collect::<Vec<_>>(),
            "tableName": file_name,
            "fromMappings": from_mappings,
            "toMappings": to_mappings,
        }));

        tables.push(table(&file_name, &rel.fields, &rel.sample));

        first_pattern
            .entry(pattern.rel_type.clone())
            .or_insert((rel_id, ids));
    }

    let mut indexes = Vec::new();
    for index in &facts.indexes {
        let Some(target) = target_of(facts, &node_props, &first_pattern, index.entity_type, &index.entity) else {
            continue;
        };
        let properties = refs(&index.properties, target.properties);
        if properties.is_empty() {
            continue;
        }
        let mut obj = json!({
            "$id": format!("i:{}", indexes.len() + 1),
            "name": index.name,
            "indexType": index.importer_kind(),
            "entityType": target.entity_type.as_str(),
            "properties": properties,
        });
        attach(&mut obj, &target);
        indexes.push(obj);
    }

    let mut constraints = Vec::new();
    for constraint in &facts.constraints {
        let Some(target) = target_of(facts, &node_props, &first_pattern, constraint.entity_type, &constraint.entity) else {
            continue;
        };
        let properties = refs(&constraint.properties, target.properties);
        if properties.is_empty() {
            continue;
        }
        let mut obj = json!({
            "$id": format!("c:{}", constraints.len()),
            "name": constraint.name,
            "constraintType": constraint.importer_kind(),
            "entityType": target.entity_type.as_str(),
            "properties": properties,
        });
        attach(&mut obj, &target);
        constraints.push(obj);
    }

    let version = FormatVersion::Indexed.document_version();
    json!({
        "version": version,
        "visualisation": { "nodes": viz_nodes },
        "dataModel": {
            "version": version,
            "graphSchemaRepresentation": {
                "version": "1.0.0",
                "graphSchema": {
                    "nodeLabels": node_labels,
                    "relationshipTypes": rel_types,
                    "indexes": indexes,
                    "constraints": constraints,
                },
            },
            "graphSchemaExtensionsRepresentation": {
                "nodeKeyProperties": key_properties,
            },
            "graphMappingRepresentation": {
                "dataSourceSchema": {
                    "type": "local",
                    "tableSchemas": tables,
                },
                "nodeMappings": node_mappings,
                "relationshipMappings": rel_mappings,
            },
            "configurations": { "idsToIgnore": [] },
        },
    })
}

fn target_of<'a>(
    facts: &ExportFacts,
    node_props: &'a [HashMap<String, String>],
    first_pattern: &'a HashMap<String, (String, HashMap<String, String>)>,
    entity_type: EntityType,
    entity: &str,
) -> Option<Target<'a>> {
    match entity_type {
        EntityType::Node => facts.node_index(entity).map(|i| Target {
            entity_type,
            entity_id: format!("nl:n{}", i),
            properties: &node_props[i],
        }),
        EntityType::Relationship => first_pattern.get(entity).map(|(id, props)| Target {
            entity_type,
            entity_id: id.clone(),
            properties: props,
        }),
    }
}

fn table(name: &str, fields: &[String], sample: &super::Sample) -> Value {
    json!({
        "name": name,
        "expanded": false,
        "fields": fields.iter().map(|f| json!({
            "name": f,
            "sample": sample_text(sample.get(f)),
            "recommendedType": { "type": infer_type(sample.get(f)) },
        })).collect::<Vec<_>>(),
        "primaryKeys": [],
        "foreignKeys": [],
    })
}

fn refs(properties: &[String], ids: &HashMap<String, String>) -> Vec<Value> {
    properties
        .iter()
        .filter_map(|p| ids.get(p))
        .map(|id| reference(id))
        .collect()
}

fn attach(obj: &mut Value, target: &Target<'_>) {
    let key = match target.entity_type {
        EntityType::Node => "nodeLabel",
        EntityType::Relationship => "relationshipType",
    };
    obj[key] = reference(&target.entity_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::fixture;

    fn graph_schema(doc: &Value) -> &Value {
        &doc["dataModel"]["graphSchemaRepresentation"]["graphSchema"]
    }

    #[test]
    fn test_one_relationship_type_per_pattern() {
        let doc = render(&fixture());
        let types = graph_schema(&doc)["relationshipTypes"].as_array().unwrap();
        assert_eq!(types.len(), 3);
        assert_eq!(types[0]["from"]["$ref"], "#nl:n0");
        assert_eq!(types[0]["to"]["$ref"], "#nl:n1");
        assert_eq!(types[1]["to"]["$ref"], "#nl:n2");
    }

    #[test]
    fn test_constraints_and_indexes_rendered() {
        let doc = render(&fixture());
        let schema = graph_schema(&doc);

        let constraints = schema["constraints"].as_array().unwrap();
        assert_eq!(constraints.len(), 3);
        assert_eq!(constraints[0]["constraintType"], "uniqueness");
        assert_eq!(constraints[0]["nodeLabel"]["$ref"], "#nl:n0");
        assert_eq!(constraints[1]["constraintType"], "existence");
        assert_eq!(constraints[2]["entityType"], "relationship");
        assert_eq!(constraints[2]["relationshipType"]["$ref"], "#r:n0");

        let indexes = schema["indexes"].as_array().unwrap();
        assert_eq!(indexes.len(), 1);
        assert_eq!(indexes[0]["$id"], "i:1");
        assert_eq!(indexes[0]["indexType"], "default");
        assert_eq!(indexes[0]["nodeLabel"]["$ref"], "#nl:n1");
    }

    #[test]
    fn test_from_and_to_mappings_point_at_key_properties() {
        let doc = render(&fixture());
        let mapping = &doc["dataModel"]["graphMappingRepresentation"]["relationshipMappings"][0];
        // Transaction fields: txId (p:1), amount (p:2)
        assert_eq!(mapping["fromMappings"]["p:1"], "Transaction_txId");
        // Bank fields: id (p:3), name (p:4)
        assert_eq!(mapping["toMappings"]["p:3"], "Bank_id");
    }
}
