//! Compile-time options.

use serde::{Deserialize, Serialize};

use crate::error::CompilerError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompileOptions {
    /// Attach a `LoggingConfiguration` block to the deployed state machine.
    pub logging: bool,
}

impl CompileOptions {
    /// Parse options from JSON. Empty input means defaults.
    pub fn from_json(json: &str) -> Result<Self, CompilerError> {
        if json.trim().is_empty() {
            return Ok(CompileOptions::default());
        }
        serde_json::from_str(json)
            .map_err(|e| CompilerError::Parse(format!("invalid compile options: {}", e)))
    }
}
