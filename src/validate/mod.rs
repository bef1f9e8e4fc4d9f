//! Validation phase: schema shape first, then cross-state rules.
//!
//! Schema violations are all collected before anything else runs. Rules only
//! run against documents whose shape is already known to be sound.

pub mod rules;
pub mod schema;

use std::sync::OnceLock;

use serde_json::Value;
use tracing::debug;

use crate::defaults::CompilerDefaults;
use crate::error::{CompilerError, ValidationError, ValidationResult};
use crate::parse::{self, PlaybookDocument};

pub use schema::PlaybookSchema;

static DEFAULT_SCHEMA: OnceLock<Result<PlaybookSchema, String>> = OnceLock::new();

/// The rule-set built from production defaults, compiled once per process.
pub fn default_schema() -> Result<&'static PlaybookSchema, CompilerError> {
    DEFAULT_SCHEMA
        .get_or_init(|| {
            PlaybookSchema::new(&CompilerDefaults::default().literal_marker)
                .map_err(|e| e.to_string())
        })
        .as_ref()
        .map_err(|e| CompilerError::Schema(e.clone()))
}

/// Validate a playbook value and convert it into a typed document.
///
/// On failure returns every violation found: schema errors when the shape is
/// wrong, otherwise every rule error.
pub fn check_playbook(
    schema: &PlaybookSchema,
    defaults: &CompilerDefaults,
    value: &Value,
) -> Result<PlaybookDocument, Vec<ValidationError>> {
    if !value.is_object() {
        return Err(vec![ValidationError::type_error(
            "Provided playbook is of incorrect type. Expected 'object'",
        )]);
    }

    let schema_errors = schema.validate_playbook(value);
    if !schema_errors.is_empty() {
        debug!(errors = schema_errors.len(), "playbook failed schema validation");
        return Err(schema_errors);
    }

    let doc = parse::to_document(value).map_err(|e| vec![e])?;

    let rule_errors = rules::validate_rules(&doc, defaults);
    if !rule_errors.is_empty() {
        debug!(
            playbook = %doc.name,
            errors = rule_errors.len(),
            "playbook failed rule validation"
        );
        return Err(rule_errors);
    }

    Ok(doc)
}

/// Validate a whole playbook against production defaults.
pub fn validate_playbook(value: &Value) -> ValidationResult {
    let schema = match default_schema() {
        Ok(schema) => schema,
        Err(e) => return ValidationResult::from_errors(vec![ValidationError::schema(e.to_string(), None)]),
    };
    match check_playbook(schema, &CompilerDefaults::default(), value) {
        Ok(_) => ValidationResult::valid(),
        Err(errors) => ValidationResult::from_errors(errors),
    }
}

/// Validate one state against the shape of its declared kind.
pub fn validate_state(value: &Value) -> ValidationResult {
    match default_schema() {
        Ok(schema) => schema.validate_state(value),
        Err(e) => ValidationResult::from_errors(vec![ValidationError::schema(e.to_string(), None)]),
    }
}

/// State names must be unique across the whole document, nested scopes included.
pub fn validate_has_unique_state_names(doc: &PlaybookDocument) -> ValidationResult {
    let mut errors = Vec::new();
    rules::unique_state_names(doc, &mut errors);
    ValidationResult::from_errors(errors)
}
