//!
//! Tool schema audit for Google-family backends.
//!
//! Google's function declarations accept only a subset of JSON Schema. Tools whose
//! parameter schemas use anything else are rejected at request time, so schemas are
//! audited up front and every offending keyword is reported by its path.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use serde::{Deserialize, Serialize};
use serde_json::Value;

/* --- constants ------------------------------------------------------------------------------ */

/// JSON Schema keywords Google function declarations reject
pub const GOOGLE_SCHEMA_UNSUPPORTED_KEYWORDS: [&str; 20] = [
    "patternProperties",
    "additionalProperties",
    "$schema",
    "$id",
    "$ref",
    "$defs",
    "definitions",
    "examples",
    "minLength",
    "maxLength",
    "minimum",
    "maximum",
    "multipleOf",
    "pattern",
    "format",
    "minItems",
    "maxItems",
    "uniqueItems",
    "minProperties",
    "maxProperties",
];

/// Providers whose tool schemas are audited
pub const SCHEMA_AUDITED_PROVIDERS: [&str; 2] = ["google-antigravity", "google-gemini-cli"];

/// Violation paths included in one warning
const MAX_REPORTED_VIOLATIONS: usize = 12;

/* --- types ----------------------------------------------------------------------------------- */

///
/// A tool offered to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /** JSON Schema of the tool arguments */
    #[serde(default)]
    pub parameters: Value,
}

/// Unsupported keywords found in one tool's parameter schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSchemaAudit {
    /// position of the tool in the offered list
    pub index: usize,
    pub tool: String,
    /// every violation path, in schema order
    pub violations: Vec<String>,
}

/* --- start of code -------------------------------------------------------------------------- */

///
/// Collect the paths of unsupported keywords in a schema.
///
/// Paths are `<path>.<key>` for object members and `<path>[<index>]` for array
/// items. The walk is purely structural: a property that happens to be named like
/// a keyword is reported too.
pub fn find_unsupported_schema_keywords(schema: &Value, path: &str) -> Vec<String> {
    let mut violations = Vec::new();
    collect_violations(schema, path, &mut violations);
    violations
}

fn collect_violations(schema: &Value, path: &str, out: &mut Vec<String>) {
    match schema {
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                collect_violations(item, &format!("{}[{}]", path, index), out);
            }
        }
        Value::Object(record) => {
            for (key, value) in record {
                let child = format!("{}.{}", path, key);
                if GOOGLE_SCHEMA_UNSUPPORTED_KEYWORDS.contains(&key.as_str()) {
                    out.push(child.clone());
                }
                if value.is_object() || value.is_array() {
                    collect_violations(value, &child, out);
                }
            }
        }
        _ => {}
    }
}

/// Audit every tool; tools without violations are left out.
pub fn audit_tool_schemas(tools: &[ToolDefinition]) -> Vec<ToolSchemaAudit> {
    tools
        .iter()
        .enumerate()
        .filter_map(|(index, tool)| {
            let violations =
                find_unsupported_schema_keywords(&tool.parameters, &format!("{}.parameters", tool.name));
            (!violations.is_empty()).then(|| ToolSchemaAudit { index, tool: tool.name.clone(), violations })
        })
        .collect()
}

///
/// Log a schema snapshot and the violations of every tool, for audited providers.
///
/// Other providers are ignored. Returns the audits that were logged.
pub fn log_tool_schemas_for_google(tools: &[ToolDefinition], provider: &str) -> Vec<ToolSchemaAudit> {
    if !SCHEMA_AUDITED_PROVIDERS.contains(&provider) {
        return Vec::new();
    }

    let tool_names: Vec<String> =
        tools.iter().enumerate().map(|(index, tool)| format!("{}:{}", index, tool.name)).collect();
    tracing::info!(provider, tool_count = tools.len(), tools = ?tool_names, "google tool schema snapshot");

    let audits = audit_tool_schemas(tools);
    for audit in &audits {
        let shown = &audit.violations[..audit.violations.len().min(MAX_REPORTED_VIOLATIONS)];
        tracing::warn!(
            index = audit.index,
            tool = %audit.tool,
            violations = ?shown,
            violation_count = audit.violations.len(),
            "google tool schema has unsupported keywords"
        );
    }
    audits
}

/* --- tests ----------------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tool(name: &str, parameters: Value) -> ToolDefinition {
        ToolDefinition { name: name.to_string(), description: None, parameters }
    }

    #[test]
    fn test_finds_nested_keywords_with_paths() {
        let schema = json!({
            "type": "object",
            "additionalProperties": false,
            "properties": {
                "path": { "type": "string", "minLength": 1 },
                "tags": { "type": "array", "items": [{ "type": "string", "format": "uuid" }] }
            }
        });

        assert_eq!(
            find_unsupported_schema_keywords(&schema, "read.parameters"),
            vec![
                "read.parameters.additionalProperties",
                "read.parameters.properties.path.minLength",
                "read.parameters.properties.tags.items[0].format",
            ]
        );
    }

    #[test]
    fn test_clean_and_scalar_schemas() {
        let clean = json!({ "type": "object", "properties": { "q": { "type": "string" } } });
        assert!(find_unsupported_schema_keywords(&clean, "t").is_empty());
        assert!(find_unsupported_schema_keywords(&Value::Null, "t").is_empty());
        assert!(find_unsupported_schema_keywords(&json!("pattern"), "t").is_empty());
    }

    #[test]
    fn test_property_named_like_keyword_is_reported() {
        let schema = json!({ "properties": { "pattern": { "type": "string" } } });
        assert_eq!(find_unsupported_schema_keywords(&schema, "grep.parameters"), vec![
            "grep.parameters.properties.pattern"
        ]);
    }

    #[test]
    fn test_audit_skips_clean_tools() {
        let tools = vec![
            tool("clean", json!({ "type": "object" })),
            tool("dirty", json!({ "$schema": "http://json-schema.org/draft-07/schema#" })),
        ];

        let audits = audit_tool_schemas(&tools);
        assert_eq!(audits, vec![ToolSchemaAudit {
            index: 1,
            tool: "dirty".to_string(),
            violations: vec!["dirty.parameters.$schema".to_string()],
        }]);
    }

    #[test]
    fn test_logging_only_for_audited_providers() {
        let tools = vec![tool("dirty", json!({ "$ref": "#/x" }))];
        assert!(log_tool_schemas_for_google(&tools, "google-generative-ai").is_empty());
        assert!(log_tool_schemas_for_google(&tools, "anthropic-messages").is_empty());
        assert_eq!(log_tool_schemas_for_google(&tools, "google-gemini-cli").len(), 1);
    }

    #[test]
    fn test_tool_definition_parses_without_parameters() {
        let parsed: ToolDefinition = serde_json::from_value(json!({ "name": "noop" })).unwrap();
        assert_eq!(parsed.parameters, Value::Null);
    }
}
