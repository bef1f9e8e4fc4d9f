pub mod codegen;
pub mod compile;
pub mod config;
pub mod defaults;
pub mod error;
pub mod lower;
pub mod parse;
pub mod validate;
pub mod wasm;

pub use codegen::{CodegenOutput, CompiledDocument, DeploymentManifest};
pub use compile::{Compiler, compile_json, compile_yaml};
pub use config::CompileOptions;
pub use defaults::CompilerDefaults;
pub use error::{CompilerError, ErrorCode, ValidationError, ValidationResult};
pub use validate::{validate_has_unique_state_names, validate_playbook, validate_state};
