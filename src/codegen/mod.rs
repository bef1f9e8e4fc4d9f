//! Codegen pass: lowered states → compiled document → deployment manifest.
//!
//! Public API: `assemble(doc, states, options, defaults) -> CodegenOutput`

pub mod bootstrap;
pub mod literal;
pub mod manifest;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::CompileOptions;
use crate::defaults::CompilerDefaults;
use crate::error::CompilerError;
use crate::lower::Identity;
use crate::parse::types::{PlaybookDocument, StateMap};

pub use literal::LiteralEscape;
pub use manifest::DeploymentManifest;

/// The executable state-machine document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledDocument {
    /// Pass-through top-level fields of the playbook (`Version`, `TimeoutSeconds`).
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
    #[serde(rename = "Comment")]
    pub comment: String,
    #[serde(rename = "StartAt")]
    pub start_at: String,
    #[serde(rename = "States")]
    pub states: StateMap,
}

/// The complete output of the codegen pass.
#[derive(Debug, Clone)]
pub struct CodegenOutput {
    pub document: CompiledDocument,
    /// Serialized document after the literal-escape pass; embedded in the manifest.
    pub definition: String,
    pub manifest: DeploymentManifest,
}

/// Prepend bootstrap states, serialize, and wrap in the deployment manifest.
pub fn assemble(
    doc: &PlaybookDocument,
    lowered: StateMap,
    options: &CompileOptions,
    defaults: &CompilerDefaults,
) -> Result<CodegenOutput, CompilerError> {
    let mut states = bootstrap::bootstrap_states(&doc.start_at, &Identity, defaults);
    states.extend(lowered);

    let document = CompiledDocument {
        extra: doc.extra.clone(),
        comment: doc.comment.clone(),
        start_at: defaults.bootstrap.direct_invocation_check.clone(),
        states,
    };

    let escape = LiteralEscape::new(&defaults.literal_marker)?;
    let definition = escape.strip(&to_pretty_json(&document)?);

    let manifest = DeploymentManifest::new(
        &doc.name,
        &doc.comment,
        definition.clone(),
        options,
        defaults,
    );

    debug!(
        playbook = %doc.name,
        states = document.states.len(),
        logging = options.logging,
        "assembled deployment manifest"
    );

    Ok(CodegenOutput {
        document,
        definition,
        manifest,
    })
}

/// Pretty JSON with four-space indentation.
pub fn to_pretty_json<T: Serialize>(value: &T) -> Result<String, CompilerError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    String::from_utf8(buf).map_err(|e| CompilerError::Serialize(e.to_string()))
}
