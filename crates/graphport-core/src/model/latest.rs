//! `3.0.0` document: labels and relationship types are declared once and
//! referenced from node/relationship object types.

use std::collections::{BTreeSet, HashMap};

use serde_json::{json, Map, Value};

use super::{infer_type, is_nullable, position, reference, ExportFacts, FormatVersion, Sample};
use crate::schema::EntityType;

/// A relationship type token and the patterns that use it.
struct TypeEntry<'a> {
    token: &'a str,
    /// Union of property keys across its patterns.
    properties: Vec<String>,
    /// Property key -> sample value from the first pattern that has one.
    samples: Sample,
}

fn collect_types(facts: &ExportFacts) -> Vec<TypeEntry<'_>> {
    let mut entries: Vec<TypeEntry<'_>> = Vec::new();
    for rel in &facts.relationships {
        let token = rel.pattern.rel_type.as_str();
        let idx = match entries.iter().position(|e| e.token == token) {
            Some(idx) => idx,
            None => {
                entries.push(TypeEntry {
                    token,
                    properties: Vec::new(),
                    samples: Sample::new(),
                });
                entries.len() - 1
            }
        };
        let entry = &mut entries[idx];
        let mut keys: BTreeSet<String> = entry.properties.drain(..).collect();
        for field in rel.property_fields() {
            keys.insert(field.clone());
            if let Some(value) = rel.sample.get(field) {
                entry.samples.entry(field.clone()).or_insert_with(|| value.clone());
            }
        }
        entry.properties = keys.into_iter().collect();
    }
    entries
}

pub(super) fn render(facts: &ExportFacts) -> Value {
    let mut viz_nodes = Vec::new();
    let mut node_labels = Vec::new();
    let mut node_objects = Vec::new();
    let mut rel_types = Vec::new();
    let mut rel_objects = Vec::new();
    let mut key_properties = Vec::new();
    let mut tables = Vec::new();
    let mut node_mappings = Vec::new();
    let mut rel_mappings = Vec::new();
    let mut constraints = Vec::new();
    let mut indexes = Vec::new();

    // Per node: field name -> property id.
    let mut node_props: Vec<HashMap<String, String>> = Vec::new();

    for (i, node) in facts.nodes.iter().enumerate() {
        let node_id = format!("n:{}", i);
        let label_id = format!("nl:{}", i);
        let label = &node.schema.label;
        let file_name = node.schema.file_name();

        viz_nodes.push(json!({ "id": node_id, "position": position(i) }));

        let mut ids = HashMap::new();
        let mut properties = Vec::new();
        for (j, field) in node.fields.iter().enumerate() {
            let prop_id = format!("p:{}_{}", i, j);
            properties.push(property(&prop_id, field, &node.sample));
            ids.insert(field.clone(), prop_id);
        }

        node_labels.push(json!({
            "$id": label_id,
            "token": label,
            "properties": properties,
        }));
        node_objects.push(json!({
            "$id": node_id,
            "labels": [reference(&label_id)],
        }));

        let key_id = &ids[node.key_field()];
        key_properties.push(json!({
            "node": reference(&node_id),
            "keyProperties": [reference(key_id)],
        }));
        constraints.push(json!({
            "$id": format!("c:{}", constraints.len()),
            "name": format!("{}_{}_uniq", label, node.key_field()),
            "constraintType": "uniqueness",
            "entityType": "node",
            "nodeLabel": reference(&label_id),
            "relationshipType": null,
            "properties": [reference(key_id)],
        }));

        tables.push(table(&file_name, &node.fields, &node.sample, false));

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

    let types = collect_types(facts);
    let mut type_props: Vec<HashMap<String, String>> = Vec::new();
    for (k, entry) in types.iter().enumerate() {
        let mut ids = HashMap::new();
        let mut properties = Vec::new();
        for (j, field) in entry.properties.iter().enumerate() {
            let prop_id = format!("p:r{}_{}", k, j);
            properties.push(property(&prop_id, field, &entry.samples));
            ids.insert(field.clone(), prop_id);
        }
        rel_types.push(json!({
            "$id": format!("rt:{}", k),
            "token": entry.token,
            "properties": properties,
        }));
        type_props.push(ids);
    }

    for rel in &facts.relationships {
        let pattern = &rel.pattern;
        let (Some(source), Some(target), Some(k)) = (
            facts.node_index(&pattern.source_label),
            facts.node_index(&pattern.target_label),
            types.iter().position(|t| t.token == pattern.rel_type),
        ) else {
            continue;
        };
        let rel_id = format!("r:{}", rel_objects.len());
        let file_name = pattern.file_name();

        rel_objects.push(json!({
            "$id": rel_id,
            "type": reference(&format!("rt:{}", k)),
            "from": reference(&format!("n:{}", source)),
            "to": reference(&format!("n:{}", target)),
        }));

        let mut from_mappings = Map::new();
        if let Some(id) = node_props[source].get(&rel.source_key) {
            from_mappings.insert(format!("#{}", id), json!(rel.endpoints.source));
        }
        let mut to_mappings = Map::new();
        if let Some(id) = node_props[target].get(&rel.target_key) {
            to_mappings.insert(format!("#{}", id), json!(rel.endpoints.target));
        }

        rel_mappings.push(json!({
            "relationship": reference(&rel_id),
            "tableName": file_name,
            "fromMappings": from_mappings,
            "toMappings": to_mappings,
            "propertyMappings": rel.property_fields().iter().filter_map(|f| {
                type_props[k].get(f).map(|id| json!({
                    "property": reference(id),
                    "fieldName": f,
                }))
            }).collect::<Vec<_>>(),
        }));

        tables.push(table(&file_name, &rel.fields, &rel.sample, true));
    }

    for constraint in &facts.constraints {
        let Some((label_ref, type_ref, properties)) = resolve_target(
            facts,
            &types,
            &node_props,
            &type_props,
            constraint.entity_type,
            &constraint.entity,
            &constraint.properties,
        ) else {
            continue;
        };
        // Identifier keys are already declared above.
        if constraint.entity_type == EntityType::Node
            && constraint.is_uniqueness()
            && constraint.properties.len() == 1
            && facts
                .node_index(&constraint.entity)
                .map(|i| facts.nodes[i].key_field() == constraint.properties[0])
                .unwrap_or(false)
        {
            continue;
        }
        constraints.push(json!({
            "$id": format!("c:{}", constraints.len()),
            "name": constraint.name,
            "constraintType": constraint.importer_kind(),
            "entityType": constraint.entity_type.as_str(),
            "nodeLabel": label_ref,
            "relationshipType": type_ref,
            "properties": properties,
        }));
    }

    for index in &facts.indexes {
        let Some((label_ref, type_ref, properties)) = resolve_target(
            facts,
            &types,
            &node_props,
            &type_props,
            index.entity_type,
            &index.entity,
            &index.properties,
        ) else {
            continue;
        };
        indexes.push(json!({
            "$id": format!("i:{}", indexes.len()),
            "name": index.name,
            "indexType": index.importer_kind(),
            "entityType": index.entity_type.as_str(),
            "nodeLabel": label_ref,
            "relationshipType": type_ref,
            "properties": properties,
        }));
    }

    let version = FormatVersion::Latest.document_version();
    json!({
        "version": version,
        "visualisation": { "nodes": viz_nodes },
        "dataModel": {
            "version": "3.0",
            "graphSchemaRepresentation": {
                "version": "1.0.0",
                "graphSchema": {
                    "nodeLabels": node_labels,
                    "relationshipTypes": rel_types,
                    "nodeObjectTypes": node_objects,
                    "relationshipObjectTypes": rel_objects,
                    "constraints": constraints,
                    "indexes": indexes,
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

/// Label ref, type ref and property refs for a constraint or index.
/// `None` when the entity was not exported or none of its properties were.
fn resolve_target(
    facts: &ExportFacts,
    types: &[TypeEntry<'_>],
    node_props: &[HashMap<String, String>],
    type_props: &[HashMap<String, String>],
    entity_type: EntityType,
    entity: &str,
    properties: &[String],
) -> Option<(Value, Value, Vec<Value>)> {
    let (label_ref, type_ref, ids) = match entity_type {
        EntityType::Node => {
            let i = facts.node_index(entity)?;
            (reference(&format!("nl:{}", i)), Value::Null, &node_props[i])
        }
        EntityType::Relationship => {
            let k = types.iter().position(|t| t.token == entity)?;
            (Value::Null, reference(&format!("rt:{}", k)), &type_props[k])
        }
    };
    let refs: Vec<Value> = properties
        .iter()
        .filter_map(|p| ids.get(p))
        .map(|id| reference(id))
        .collect();
    if refs.is_empty() {
        return None;
    }
    Some((label_ref, type_ref, refs))
}

fn property(id: &str, token: &str, sample: &Sample) -> Value {
    json!({
        "$id": id,
        "token": token,
        "type": { "type": infer_type(sample.get(token)) },
        "nullable": is_nullable(sample.get(token)),
    })
}

fn table(name: &str, fields: &[String], sample: &Sample, expanded: bool) -> Value {
    json!({
        "name": name,
        "expanded": expanded,
        "fields": fields.iter().map(|f| json!({
            "name": f,
            "sample": super::sample_text(sample.get(f)),
            "recommendedType": { "type": infer_type(sample.get(f)) },
        })).collect::<Vec<_>>(),
    })
}
