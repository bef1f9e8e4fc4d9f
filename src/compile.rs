//! Full pipeline: parse → validate → expand decorators → transform → assemble.

use serde_json::Value;
use tracing::debug;

use crate::codegen::{self, CodegenOutput};
use crate::config::CompileOptions;
use crate::defaults::CompilerDefaults;
use crate::error::{CompilerError, ValidationResult};
use crate::lower;
use crate::parse;
use crate::validate::{self, PlaybookSchema};

/// A configured compiler. Holds its policy defaults and the rule-set built
/// from them; compiling never mutates it, so one instance can serve many calls.
pub struct Compiler {
    options: CompileOptions,
    defaults: CompilerDefaults,
    schema: PlaybookSchema,
}

impl Compiler {
    pub fn new(options: CompileOptions) -> Result<Self, CompilerError> {
        Self::with_defaults(options, CompilerDefaults::default())
    }

    pub fn with_defaults(
        options: CompileOptions,
        defaults: CompilerDefaults,
    ) -> Result<Self, CompilerError> {
        let schema = PlaybookSchema::new(&defaults.literal_marker)?;
        Ok(Compiler {
            options,
            defaults,
            schema,
        })
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    pub fn defaults(&self) -> &CompilerDefaults {
        &self.defaults
    }

    /// Schema and rule validation only.
    pub fn validate(&self, value: &Value) -> ValidationResult {
        match validate::check_playbook(&self.schema, &self.defaults, value) {
            Ok(_) => ValidationResult::valid(),
            Err(errors) => ValidationResult::from_errors(errors),
        }
    }

    pub fn compile_json(&self, json: &str) -> Result<CodegenOutput, CompilerError> {
        self.compile_value(&parse::parse_json(json)?)
    }

    pub fn compile_yaml(&self, yaml: &str) -> Result<CodegenOutput, CompilerError> {
        self.compile_value(&parse::parse_yaml(yaml)?)
    }

    /// Compile a playbook value. All-or-nothing: any violation aborts with
    /// every error found.
    pub fn compile_value(&self, value: &Value) -> Result<CodegenOutput, CompilerError> {
        let doc = validate::check_playbook(&self.schema, &self.defaults, value)
            .map_err(CompilerError::Validation)?;
        debug!(playbook = %doc.name, states = doc.states.len(), "validated playbook");

        let lowered = lower::lower(&doc, &self.defaults)?;
        codegen::assemble(&doc, lowered, &self.options, &self.defaults)
    }
}

/// Compile playbook JSON with production defaults.
pub fn compile_json(json: &str, options: &CompileOptions) -> Result<CodegenOutput, CompilerError> {
    Compiler::new(options.clone())?.compile_json(json)
}

/// Compile playbook YAML with production defaults.
pub fn compile_yaml(yaml: &str, options: &CompileOptions) -> Result<CodegenOutput, CompilerError> {
    Compiler::new(options.clone())?.compile_yaml(yaml)
}
