//! Parse phase: JSON/YAML text → raw value → Rust types + per-scope graphs.
//!
//! Text is first read into a `serde_json::Value` so the validator can report
//! every violation at once; only validated values are converted into
//! `PlaybookDocument`.

pub mod graph;
pub mod types;

pub use graph::ScopeGraph;
pub use types::*;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{CompilerError, ValidationError};

/// Read playbook JSON text into a raw value.
pub fn parse_json(json: &str) -> Result<Value, CompilerError> {
    serde_json::from_str::<Value>(json)
        .map_err(|e| CompilerError::Parse(format!("Failed to parse playbook JSON: {}", e)))
}

/// Read playbook YAML text into a raw value.
pub fn parse_yaml(yaml: &str) -> Result<Value, CompilerError> {
    serde_yaml::from_str::<Value>(yaml)
        .map_err(|e| CompilerError::Parse(format!("Failed to parse playbook YAML: {}", e)))
}

/// Convert a raw value into a typed document.
///
/// Callers are expected to have validated `value` first; a conversion
/// failure here is reported as a schema violation of the whole document.
pub fn to_document(value: &Value) -> Result<PlaybookDocument, ValidationError> {
    PlaybookDocument::deserialize(value).map_err(|e| {
        ValidationError::schema(format!("Playbook does not match its schema: {}", e), None)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_and_yaml_read_to_same_value() {
        let json = parse_json(r#"{"Playbook":"P","StartAt":"A","States":{"A":{"Type":"Succeed"}}}"#)
            .unwrap();
        let yaml = parse_yaml("Playbook: P\nStartAt: A\nStates:\n  A:\n    Type: Succeed\n").unwrap();
        assert_eq!(json, yaml);
    }

    #[test]
    fn malformed_text_is_parse_error() {
        assert!(matches!(parse_json("not json"), Err(CompilerError::Parse(_))));
        assert!(matches!(parse_yaml("a: [unclosed"), Err(CompilerError::Parse(_))));
    }
}
