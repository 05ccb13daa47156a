//! Import model construction.
//!
//! The facts of an export (identifiers, patterns, constraints, indexes and
//! file layouts) live in one [`ExportFacts`] value. Each supported document
//! version is an independent renderer over those facts, so every version
//! encodes the same content and only the shape differs.

mod indexed;
mod latest;
mod legacy;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::{json, Value};

use crate::error::{ExportError, ExportResult};
use crate::schema::{ConstraintInfo, EndpointFields, IndexInfo, LabelSchema, RelationshipPattern};
use crate::source::{is_null_value, value_to_text};

/// File name of the serialized model inside the export directory.
pub const MODEL_FILE_NAME: &str = "neo4j_importer_model.json";

/// Maximum characters kept for a field sample.
const SAMPLE_LEN: usize = 50;

/// First surviving row of a file, keyed by field name.
pub type Sample = BTreeMap<String, Value>;

/// A label's exported file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeFile {
    pub schema: LabelSchema,
    /// Columns; the identifier is always first.
    pub fields: Vec<String>,
    pub sample: Sample,
}

impl NodeFile {
    pub fn key_field(&self) -> &str {
        self.schema.identifier.field()
    }
}

/// A relationship pattern's exported file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationshipFile {
    pub pattern: RelationshipPattern,
    pub endpoints: EndpointFields,
    /// Identifier property of the source label.
    pub source_key: String,
    /// Identifier property of the target label.
    pub target_key: String,
    /// Columns: source, target, then relationship properties.
    pub fields: Vec<String>,
    pub sample: Sample,
}

impl RelationshipFile {
    /// Relationship property columns (everything after the two endpoints).
    pub fn property_fields(&self) -> &[String] {
        &self.fields[2..]
    }
}

/// Everything an import model describes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExportFacts {
    pub nodes: Vec<NodeFile>,
    pub relationships: Vec<RelationshipFile>,
    pub constraints: Vec<ConstraintInfo>,
    pub indexes: Vec<IndexInfo>,
}

impl ExportFacts {
    pub(crate) fn node_index(&self, label: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.schema.label == label)
    }
}

/// Supported importer document versions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FormatVersion {
    /// `0.1.0`: file/graph/mapping model only.
    Legacy,
    /// `2.4.0`: adds constraints and indexes.
    Indexed,
    /// `3.0`: node/relationship object types.
    #[default]
    Latest,
}

impl FormatVersion {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Legacy => "0.1.0",
            Self::Indexed => "2.4.0",
            Self::Latest => "3.0",
        }
    }

    /// Version string written into the document.
    pub fn document_version(&self) -> &'static str {
        match self {
            Self::Legacy => "0.1.0-beta.0",
            Self::Indexed => "2.4.0-beta.0",
            Self::Latest => "3.0.0",
        }
    }

    pub fn all() -> [FormatVersion; 3] {
        [Self::Legacy, Self::Indexed, Self::Latest]
    }
}

impl FromStr for FormatVersion {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "0.1.0" | "legacy" => Ok(Self::Legacy),
            "2.4.0" | "indexed" => Ok(Self::Indexed),
            "3.0" | "3.0.0" | "latest" => Ok(Self::Latest),
            _ => Err(ExportError::UnsupportedVersion(s.to_string())),
        }
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A rendered import model document.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportModel {
    pub version: FormatVersion,
    pub document: Value,
}

impl ImportModel {
    /// Render the facts in the requested document version.
    pub fn build(facts: &ExportFacts, version: FormatVersion) -> Self {
        let document = match version {
            FormatVersion::Legacy => legacy::render(facts),
            FormatVersion::Indexed => indexed::render(facts),
            FormatVersion::Latest => latest::render(facts),
        };
        Self { version, document }
    }

    /// Parse a version tag and render; unknown tags are a configuration error.
    pub fn build_tagged(facts: &ExportFacts, tag: &str) -> ExportResult<Self> {
        Ok(Self::build(facts, tag.parse()?))
    }

    pub fn to_json_pretty(&self) -> ExportResult<String> {
        Ok(serde_json::to_string_pretty(&self.document)?)
    }
}

/// Importer type name inferred from a sample value.
pub(crate) fn infer_type(value: Option<&Value>) -> &'static str {
    match value {
        Some(Value::Number(n)) if n.is_i64() || n.is_u64() => "integer",
        Some(Value::Number(_)) => "float",
        Some(Value::Bool(_)) => "boolean",
        _ => "string",
    }
}

pub(crate) fn sample_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(v) => value_to_text(v).chars().take(SAMPLE_LEN).collect(),
    }
}

pub(crate) fn is_nullable(value: Option<&Value>) -> bool {
    value.map(is_null_value).unwrap_or(true)
}

/// Canvas position of the i-th node, three per row.
pub(crate) fn position(i: usize) -> Value {
    let i = i as i64;
    json!({ "x": 300 * (i % 3) - 300, "y": 300 * (i / 3) })
}

pub(crate) fn reference(id: &str) -> Value {
    json!({ "$ref": format!("#{}", id) })
}
