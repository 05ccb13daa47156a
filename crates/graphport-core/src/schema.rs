//! Schema snapshot types produced by introspection, resolution and discovery.
//!
//! All of these are built once per export run and never mutated afterwards.

use serde::Serialize;

/// Column name used when a label falls back to the internal node id.
pub const SURROGATE_FIELD: &str = "_surrogate_id";

/// Whether a constraint or index applies to nodes or relationships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Node,
    Relationship,
}

impl EntityType {
    /// Parse the `entityType` column returned by `SHOW CONSTRAINTS` / `SHOW INDEXES`.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "relationship" => Self::Relationship,
            _ => Self::Node,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Relationship => "relationship",
        }
    }
}

/// A declared constraint, passed through from the source database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstraintInfo {
    pub name: String,
    /// Raw constraint type as reported by the database.
    pub kind: String,
    pub entity_type: EntityType,
    /// Label (for nodes) or relationship type.
    pub entity: String,
    pub properties: Vec<String>,
}

impl ConstraintInfo {
    pub fn is_uniqueness(&self) -> bool {
        let kind = self.kind.to_uppercase();
        kind.contains("UNIQUE")
    }

    /// Constraint kind in the importer's vocabulary.
    pub fn importer_kind(&self) -> &'static str {
        let kind = self.kind.to_uppercase();
        if kind.contains("UNIQUE") {
            "uniqueness"
        } else if kind.contains("EXIST") {
            "existence"
        } else if kind.contains("KEY") {
            "key"
        } else {
            "uniqueness"
        }
    }
}

/// A declared index, passed through from the source database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexInfo {
    pub name: String,
    /// Raw index type (`RANGE`, `TEXT`, `FULLTEXT`, ...).
    pub kind: String,
    pub entity_type: EntityType,
    pub entity: String,
    pub properties: Vec<String>,
}

impl IndexInfo {
    /// Index type in the importer's vocabulary; range indexes are the default kind.
    pub fn importer_kind(&self) -> String {
        match self.kind.to_uppercase().as_str() {
            "RANGE" | "BTREE" | "DEFAULT" | "" => "default".to_string(),
            other => other.to_lowercase(),
        }
    }
}

/// A relationship type and the property keys observed on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationshipTypeInfo {
    pub name: String,
    pub property_keys: Vec<String>,
}

/// Everything the introspector learned about the database.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GraphSchema {
    /// Label name and its observed property keys (sorted).
    pub labels: Vec<(String, Vec<String>)>,
    pub relationship_types: Vec<RelationshipTypeInfo>,
    pub constraints: Vec<ConstraintInfo>,
    pub indexes: Vec<IndexInfo>,
}

/// How an identifier was chosen for a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
    Constraint,
    IdProperty,
    UniqueValue,
    Surrogate,
}

impl ResolutionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Constraint => "constraint",
            Self::IdProperty => "id-property",
            Self::UniqueValue => "unique-value",
            Self::Surrogate => "surrogate",
        }
    }
}

/// The external row identifier for a label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum IdentifierChoice {
    Property(String),
    Surrogate,
}

impl IdentifierChoice {
    /// Name of the column carrying the identifier in the label's file.
    pub fn field(&self) -> &str {
        match self {
            Self::Property(name) => name,
            Self::Surrogate => SURROGATE_FIELD,
        }
    }
}

/// A label with its observed keys and resolved identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelSchema {
    pub label: String,
    pub property_keys: Vec<String>,
    pub identifier: IdentifierChoice,
    pub method: ResolutionMethod,
}

impl LabelSchema {
    /// File columns: identifier first, remaining keys in lexical order.
    pub fn fields(&self) -> Vec<String> {
        let id_field = self.identifier.field();
        let mut fields = vec![id_field.to_string()];
        let mut rest: Vec<&String> = self
            .property_keys
            .iter()
            .filter(|k| k.as_str() != id_field)
            .collect();
        rest.sort();
        fields.extend(rest.into_iter().cloned());
        fields
    }

    pub fn file_name(&self) -> String {
        format!("{}.csv", file_safe(&self.label))
    }
}

/// A (type, source label, target label) triple observed in live data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationshipPattern {
    pub rel_type: String,
    pub source_label: String,
    pub target_label: String,
    pub property_keys: Vec<String>,
}

impl RelationshipPattern {
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}_{}.csv",
            file_safe(&self.source_label),
            file_safe(&self.rel_type),
            file_safe(&self.target_label)
        )
    }

    pub fn triple(&self) -> (&str, &str, &str) {
        (&self.rel_type, &self.source_label, &self.target_label)
    }
}

/// Map a label or type name to something usable inside a file name.
///
/// Names come from the database and may hold any character, so path
/// separators, characters Windows rejects and `..` are replaced with `_`.
fn file_safe(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    cleaned.replace("..", "__")
}

/// Column layout of a relationship file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointFields {
    pub source: String,
    pub target: String,
}

impl EndpointFields {
    /// Endpoint column names; self-relationships get `_source` / `_target` suffixes.
    pub fn new(pattern: &RelationshipPattern, source: &LabelSchema, target: &LabelSchema) -> Self {
        let source_key = source.identifier.field();
        let target_key = target.identifier.field();
        if pattern.source_label == pattern.target_label && source_key == target_key {
            Self {
                source: format!("{}_{}_source", pattern.source_label, source_key),
                target: format!("{}_{}_target", pattern.target_label, target_key),
            }
        } else {
            Self {
                source: format!("{}_{}", pattern.source_label, source_key),
                target: format!("{}_{}", pattern.target_label, target_key),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(name: &str, keys: &[&str], identifier: IdentifierChoice) -> LabelSchema {
        LabelSchema {
            label: name.to_string(),
            property_keys: keys.iter().map(|k| k.to_string()).collect(),
            identifier,
            method: ResolutionMethod::Constraint,
        }
    }

    #[test]
    fn test_fields_put_identifier_first() {
        let schema = label("Customer", &["name", "email", "age"], IdentifierChoice::Property("email".into()));
        assert_eq!(schema.fields(), vec!["email", "age", "name"]);
    }

    #[test]
    fn test_surrogate_field_is_prepended() {
        let schema = label("Thing", &["b", "a"], IdentifierChoice::Surrogate);
        assert_eq!(schema.fields(), vec![SURROGATE_FIELD, "a", "b"]);
    }

    #[test]
    fn test_self_relationship_fields_are_suffixed() {
        let person = label("Person", &["id"], IdentifierChoice::Property("id".into()));
        let pattern = RelationshipPattern {
            rel_type: "KNOWS".into(),
            source_label: "Person".into(),
            target_label: "Person".into(),
            property_keys: vec![],
        };
        let fields = EndpointFields::new(&pattern, &person, &person);
        assert_eq!(fields.source, "Person_id_source");
        assert_eq!(fields.target, "Person_id_target");
        assert_eq!(pattern.file_name(), "Person_KNOWS_Person.csv");
    }

    #[test]
    fn test_file_names_stay_in_one_component() {
        let nested = label("a/b", &["id"], IdentifierChoice::Property("id".into()));
        assert_eq!(nested.file_name(), "a_b.csv");

        let parent = label("../escaped", &["id"], IdentifierChoice::Property("id".into()));
        assert_eq!(parent.file_name(), "___escaped.csv");

        let pattern = RelationshipPattern {
            rel_type: "IS\\IN".into(),
            source_label: "..".into(),
            target_label: "C:x".into(),
            property_keys: vec![],
        };
        assert_eq!(pattern.file_name(), "___IS_IN_C_x.csv");
    }

    #[test]
    fn test_plain_names_unchanged() {
        let schema = label("Customer_2", &["id"], IdentifierChoice::Property("id".into()));
        assert_eq!(schema.file_name(), "Customer_2.csv");
    }

    #[test]
    fn test_constraint_kind_mapping() {
        let mut c = ConstraintInfo {
            name: "c".into(),
            kind: "NODE_PROPERTY_UNIQUENESS".into(),
            entity_type: EntityType::Node,
            entity: "A".into(),
            properties: vec!["x".into()],
        };
        assert!(c.is_uniqueness());
        assert_eq!(c.importer_kind(), "uniqueness");
        c.kind = "NODE_PROPERTY_EXISTENCE".into();
        assert!(!c.is_uniqueness());
        assert_eq!(c.importer_kind(), "existence");
        c.kind = "NODE_KEY".into();
        assert_eq!(c.importer_kind(), "key");
    }

    #[test]
    fn test_range_index_is_default() {
        let idx = IndexInfo {
            name: "i".into(),
            kind: "RANGE".into(),
            entity_type: EntityType::Node,
            entity: "A".into(),
            properties: vec!["x".into()],
        };
        assert_eq!(idx.importer_kind(), "default");
    }
}
