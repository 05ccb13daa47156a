//! Cypher text for the export queries.
//!
//! Labels and relationship types cannot be parameterized, so they are
//! backtick-quoted here. Property keys always travel as parameters.

use graphport_core::IdentifierChoice;

pub const LABELS: &str = "CALL db.labels() YIELD label RETURN label ORDER BY label";

pub const RELATIONSHIP_TYPES: &str =
    "CALL db.relationshipTypes() YIELD relationshipType RETURN relationshipType ORDER BY relationshipType";

pub const SHOW_CONSTRAINTS: &str = "SHOW CONSTRAINTS";
pub const LEGACY_CONSTRAINTS: &str = "CALL db.constraints()";
pub const SHOW_INDEXES: &str = "SHOW INDEXES";
pub const LEGACY_INDEXES: &str = "CALL db.indexes()";

/// Quote a label or relationship type as a Cypher identifier.
pub fn quote(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

fn limit(var: &str, sample: Option<usize>) -> String {
    match sample {
        Some(n) => format!(" WITH {} LIMIT {}", var, n),
        None => String::new(),
    }
}

/// Restrict a relationship match to the first labels of its endpoints.
const PATTERN_FILTER: &str = "labels(s)[0] = $source AND labels(t)[0] = $target";

pub fn node_keys(label: &str, sample: Option<usize>) -> String {
    format!(
        "MATCH (n:{}){} UNWIND keys(n) AS key RETURN DISTINCT key ORDER BY key",
        quote(label),
        limit("n", sample)
    )
}

pub fn relationship_keys(rel_type: &str, sample: Option<usize>) -> String {
    format!(
        "MATCH ()-[r:{}]->(){} UNWIND keys(r) AS key RETURN DISTINCT key ORDER BY key",
        quote(rel_type),
        limit("r", sample)
    )
}

pub fn pattern_keys(rel_type: &str, sample: Option<usize>) -> String {
    format!(
        "MATCH (s)-[r:{}]->(t) WHERE {}{} UNWIND keys(r) AS key RETURN DISTINCT key ORDER BY key",
        quote(rel_type),
        PATTERN_FILTER,
        limit("r", sample)
    )
}

pub fn count_nodes(label: &str) -> String {
    format!("MATCH (n:{}) RETURN count(n) AS total", quote(label))
}

pub fn property_stats(label: &str) -> String {
    format!(
        "MATCH (n:{}) WHERE n[$key] IS NOT NULL \
         RETURN count(n) AS present, count(DISTINCT n[$key]) AS unique_values",
        quote(label)
    )
}

pub fn endpoint_pairs(rel_type: &str) -> String {
    format!(
        "MATCH (s)-[r:{}]->(t) \
         WITH labels(s)[0] AS source, labels(t)[0] AS target \
         WHERE source IS NOT NULL AND target IS NOT NULL \
         RETURN DISTINCT source, target",
        quote(rel_type)
    )
}

/// Expression yielding a node's identifier; `param` names the key parameter.
fn identifier_expr(var: &str, choice: &IdentifierChoice, param: &str) -> String {
    match choice {
        IdentifierChoice::Property(_) => format!("{}[${}]", var, param),
        IdentifierChoice::Surrogate => format!("id({})", var),
    }
}

pub fn node_rows(label: &str, identifier: &IdentifierChoice) -> String {
    format!(
        "MATCH (n:{}) RETURN {} AS identifier, properties(n) AS props",
        quote(label),
        identifier_expr("n", identifier, "key")
    )
}

pub fn relationship_rows(
    rel_type: &str,
    source: &IdentifierChoice,
    target: &IdentifierChoice,
) -> String {
    format!(
        "MATCH (s)-[r:{}]->(t) WHERE {} \
         RETURN {} AS source_id, {} AS target_id, properties(r) AS props",
        quote(rel_type),
        PATTERN_FILTER,
        identifier_expr("s", source, "source_key"),
        identifier_expr("t", target, "target_key")
    )
}

/// A constraint recovered from a `db.constraints()` description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyConstraint {
    pub kind: String,
    pub relationship: bool,
    pub entity: String,
    pub properties: Vec<String>,
}

/// Parse descriptions such as
/// `CONSTRAINT ON ( customer:Customer ) ASSERT (customer.email) IS UNIQUE`.
pub fn parse_legacy_constraint(description: &str) -> Option<LegacyConstraint> {
    let upper = description.to_ascii_uppercase();
    let on = upper.find(" ON ")? + 4;
    let assert = upper.find(" ASSERT ")?;
    if assert < on {
        return None;
    }
    let head = &description[on..assert];
    let tail = &description[assert + 8..];

    let relationship = head.contains('[');
    let open = if relationship { head.find('[')? } else { head.find('(')? };
    let colon = open + head[open..].find(':')?;
    let var = head[open + 1..colon].trim();
    let entity: String = head[colon + 1..]
        .trim_start()
        .chars()
        .take_while(|c| !matches!(c, ')' | ']' | ' '))
        .collect();
    let entity = entity.trim_matches('`').to_string();
    if var.is_empty() || entity.is_empty() {
        return None;
    }

    let prefix = format!("{}.", var);
    let properties: Vec<String> = tail
        .match_indices(&prefix)
        .map(|(i, _)| {
            let rest = &tail[i + prefix.len()..];
            if let Some(quoted) = rest.strip_prefix('`') {
                quoted.chars().take_while(|c| *c != '`').collect()
            } else {
                rest.chars()
                    .take_while(|c| c.is_alphanumeric() || *c == '_')
                    .collect()
            }
        })
        .filter(|p: &String| !p.is_empty())
        .collect();
    if properties.is_empty() {
        return None;
    }

    let tail_upper = tail.to_ascii_uppercase();
    let kind = if tail_upper.contains("IS UNIQUE") {
        "UNIQUENESS"
    } else if tail_upper.contains("NODE KEY") {
        "NODE_KEY"
    } else if relationship {
        "RELATIONSHIP_PROPERTY_EXISTENCE"
    } else {
        "NODE_PROPERTY_EXISTENCE"
    };

    Some(LegacyConstraint {
        kind: kind.to_string(),
        relationship,
        entity,
        properties,
    })
}
