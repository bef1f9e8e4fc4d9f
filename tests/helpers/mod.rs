use playbook_compiler::parse::types::*;
use playbook_compiler::{CodegenOutput, CompileOptions, Compiler};
use serde_json::Value;

// =============================================================================
// Compilation helpers
// =============================================================================

/// Compile playbook JSON with default options, panicking on failure.
pub fn compile(json: &str) -> CodegenOutput {
    compile_with(json, CompileOptions::default())
}

pub fn compile_with(json: &str, options: CompileOptions) -> CodegenOutput {
    Compiler::new(options)
        .expect("compiler should build")
        .compile_json(json)
        .expect("playbook should compile")
}

/// The compiled definition text parsed back into JSON.
pub fn definition_value(output: &CodegenOutput) -> Value {
    serde_json::from_str(&output.definition).expect("definition should be valid JSON")
}

pub fn parse_value(json: &str) -> Value {
    serde_json::from_str(json).expect("fixture should be valid JSON")
}

// =============================================================================
// State accessors
// =============================================================================

pub fn task<'a>(states: &'a StateMap, name: &str) -> &'a TaskState {
    match states.get(name) {
        Some(StateNode::Task(task)) => task,
        other => panic!("expected Task state '{}', found {:?}", name, other),
    }
}

pub fn parallel<'a>(states: &'a StateMap, name: &str) -> &'a ParallelState {
    match states.get(name) {
        Some(StateNode::Parallel(parallel)) => parallel,
        other => panic!("expected Parallel state '{}', found {:?}", name, other),
    }
}

pub fn state_names(states: &StateMap) -> Vec<&str> {
    states.keys().map(String::as_str).collect()
}

/// Every catcher target of a state, in order.
pub fn catch_targets(catch: &Option<Vec<Catcher>>) -> Vec<&str> {
    catch
        .iter()
        .flatten()
        .map(|c| c.next.as_str())
        .collect()
}
