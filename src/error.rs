//! Unified compiler error type used across all phases.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Parse,
    Validate,
    Lower,
    Codegen,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Parse => write!(f, "Parse"),
            Phase::Validate => write!(f, "Validate"),
            Phase::Lower => write!(f, "Lower"),
            Phase::Codegen => write!(f, "Codegen"),
        }
    }
}

/// Category of a validation failure, as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The document or a state does not match its required shape.
    SchemaValidationError,
    /// Shape is fine but a cross-state rule is broken (duplicate names, dangling references).
    RuleValidationError,
    /// Input was not even an object.
    TypeError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::SchemaValidationError => "SCHEMA_VALIDATION_ERROR",
            ErrorCode::RuleValidationError => "RULE_VALIDATION_ERROR",
            ErrorCode::TypeError => "TYPE_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    #[serde(rename = "errorCode")]
    pub code: ErrorCode,
    pub message: String,
    /// JSON pointer of the offending value, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl ValidationError {
    pub fn schema(message: impl Into<String>, path: Option<String>) -> Self {
        ValidationError {
            code: ErrorCode::SchemaValidationError,
            message: message.into(),
            path,
        }
    }

    pub fn rule(message: impl Into<String>, path: Option<String>) -> Self {
        ValidationError {
            code: ErrorCode::RuleValidationError,
            message: message.into(),
            path,
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        ValidationError {
            code: ErrorCode::TypeError,
            message: message.into(),
            path: None,
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.path {
            Some(path) if !path.is_empty() => {
                write!(f, "[{}] {} (at '{}')", self.code, self.message, path)
            }
            _ => write!(f, "[{}] {}", self.code, self.message),
        }
    }
}

/// Outcome of validating a document or a single state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        ValidationResult {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    pub fn from_errors(errors: Vec<ValidationError>) -> Self {
        ValidationResult {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CompilerError {
    #[error("failed to parse playbook: {0}")]
    Parse(String),

    #[error("playbook failed validation with {} error(s):\n{}", .0.len(), render_list(.0))]
    Validation(Vec<ValidationError>),

    #[error(
        "Decorators.TaskFailureHandler configured incorrectly. Must be a Task or Parallel state, found '{0}'"
    )]
    TaskFailureHandlerKind(String),

    #[error("failed to serialize compiled playbook: {0}")]
    Serialize(String),

    #[error("playbook schema could not be built: {0}")]
    Schema(String),
}

impl CompilerError {
    pub fn phase(&self) -> Phase {
        match self {
            CompilerError::Parse(_) => Phase::Parse,
            CompilerError::Validation(_) | CompilerError::Schema(_) => Phase::Validate,
            CompilerError::TaskFailureHandlerKind(_) => Phase::Lower,
            CompilerError::Serialize(_) => Phase::Codegen,
        }
    }

    /// Short machine-readable code, stable across releases.
    pub fn code(&self) -> &'static str {
        match self {
            CompilerError::Parse(_) => "PARSE_ERROR",
            CompilerError::Validation(_) => "VALIDATION_ERROR",
            CompilerError::TaskFailureHandlerKind(_) => "CONFIGURATION_ERROR",
            CompilerError::Serialize(_) => "SERIALIZATION_ERROR",
            CompilerError::Schema(_) => "SCHEMA_BUILD_ERROR",
        }
    }

    /// Every individual violation carried by this error.
    pub fn validation_errors(&self) -> &[ValidationError] {
        match self {
            CompilerError::Validation(errors) => errors,
            _ => &[],
        }
    }
}

impl From<serde_json::Error> for CompilerError {
    fn from(e: serde_json::Error) -> Self {
        CompilerError::Serialize(e.to_string())
    }
}

fn render_list(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_serializes_screaming_snake() {
        let e = ValidationError::rule("dup", None);
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["errorCode"], "RULE_VALIDATION_ERROR");
        assert!(json.get("path").is_none());
    }

    #[test]
    fn validation_display_lists_every_error() {
        let err = CompilerError::Validation(vec![
            ValidationError::schema("first", Some("/States/A".into())),
            ValidationError::schema("second", None),
        ]);
        let text = err.to_string();
        assert!(text.contains("2 error(s)"));
        assert!(text.contains("first (at '/States/A')"));
        assert!(text.contains("second"));
        assert_eq!(err.phase(), Phase::Validate);
    }

    #[test]
    fn result_validity_follows_errors() {
        assert!(ValidationResult::from_errors(vec![]).is_valid);
        assert!(!ValidationResult::from_errors(vec![ValidationError::type_error("x")]).is_valid);
    }
}
