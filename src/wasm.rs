//! WASM entry points for browser and Node callers.

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::codegen::DeploymentManifest;
use crate::config::CompileOptions;
use crate::error::{CompilerError, ValidationError, ValidationResult};

/// Validate a playbook JSON document: shape, then cross-state rules.
/// Returns `{ isValid, errors: [{ errorCode, message, path? }] }`.
#[wasm_bindgen]
pub fn validate_playbook(json: &str) -> JsValue {
    to_js(&validate_playbook_inner(json))
}

fn validate_playbook_inner(json: &str) -> ValidationResult {
    match crate::parse::parse_json(json) {
        Ok(value) => crate::validate::validate_playbook(&value),
        Err(e) => ValidationResult::from_errors(vec![ValidationError::type_error(e.to_string())]),
    }
}

/// Validate a single state JSON against the shape of its `Type`.
#[wasm_bindgen]
pub fn validate_state(json: &str) -> JsValue {
    to_js(&validate_state_inner(json))
}

fn validate_state_inner(json: &str) -> ValidationResult {
    match crate::parse::parse_json(json) {
        Ok(value) => crate::validate::validate_state(&value),
        Err(e) => ValidationResult::from_errors(vec![ValidationError::type_error(e.to_string())]),
    }
}

/// Full pipeline: parse → validate → expand → transform → assemble.
/// Returns `{ status: "success", manifest, definition }` or
/// `{ status: "errors", errors }`.
#[wasm_bindgen]
pub fn compile_playbook(json: &str, options_json: &str) -> JsValue {
    to_js(&compile_playbook_inner(json, options_json))
}

fn compile_playbook_inner(json: &str, options_json: &str) -> CompileResult {
    let compiled = CompileOptions::from_json(options_json)
        .and_then(|options| crate::compile::compile_json(json, &options));

    match compiled {
        Ok(output) => CompileResult::Success {
            manifest: output.manifest,
            definition: output.definition,
        },
        Err(e) => CompileResult::Errors {
            errors: ErrorDto::from_compiler_error(&e),
        },
    }
}

/// Plain JS objects rather than `Map`s for the ordered maps in the output.
fn to_js<T: Serialize>(value: &T) -> JsValue {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .unwrap_or(JsValue::NULL)
}

// ---------------------------------------------------------------------------
// DTOs for serialization to JS
// ---------------------------------------------------------------------------

#[derive(Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorDto {
    code: String,
    phase: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
}

impl ErrorDto {
    /// Validation failures expand to one entry per violation.
    fn from_compiler_error(e: &CompilerError) -> Vec<ErrorDto> {
        let phase = e.phase().to_string();
        match e.validation_errors() {
            [] => vec![ErrorDto {
                code: e.code().into(),
                phase,
                message: e.to_string(),
                path: None,
            }],
            errors => errors
                .iter()
                .map(|v| ErrorDto {
                    code: v.code.as_str().into(),
                    phase: phase.clone(),
                    message: v.message.clone(),
                    path: v.path.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, serde::Serialize)]
#[serde(tag = "status")]
enum CompileResult {
    #[serde(rename = "success")]
    Success {
        manifest: DeploymentManifest,
        definition: String,
    },
    #[serde(rename = "errors")]
    Errors { errors: Vec<ErrorDto> },
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "Playbook": "Minimal",
        "Comment": "minimal playbook",
        "StartAt": "Done",
        "States": { "Done": { "Type": "Succeed" } }
    }"#;

    #[test]
    fn compile_reports_success_with_manifest() {
        let result = serde_json::to_value(compile_playbook_inner(MINIMAL, "")).unwrap();
        assert_eq!(result["status"], "success");
        assert!(result["manifest"]["Resources"]["Minimal"].is_object());
    }

    #[test]
    fn compile_flattens_validation_errors() {
        let result = compile_playbook_inner(r#"{"Playbook": "P"}"#, "{}");
        let CompileResult::Errors { errors } = result else {
            panic!("expected errors");
        };
        assert!(!errors.is_empty());
        assert!(errors.iter().all(|e| e.code == "SCHEMA_VALIDATION_ERROR"));
        assert!(errors.iter().all(|e| e.phase == "Validate"));
    }

    #[test]
    fn bad_options_are_reported() {
        let result = serde_json::to_value(compile_playbook_inner(MINIMAL, "{")).unwrap();
        assert_eq!(result["status"], "errors");
        assert_eq!(result["errors"][0]["code"], "PARSE_ERROR");
    }

    #[test]
    fn unparseable_state_is_type_error() {
        let result = validate_state_inner("not json");
        assert!(!result.is_valid);
        assert_eq!(result.errors[0].code, crate::error::ErrorCode::TypeError);
    }
}
