//! Cross-state rules checked after the document matches its schema.

use indexmap::{IndexMap, IndexSet};

use crate::defaults::CompilerDefaults;
use crate::error::ValidationError;
use crate::lower::policy;
use crate::parse::graph::ScopeGraph;
use crate::parse::types::{PlaybookDocument, StateMachine, StateMap, StateNode};

/// Run every rule. Returns all errors found.
pub fn validate_rules(
    doc: &PlaybookDocument,
    defaults: &CompilerDefaults,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    unique_state_names(doc, &mut errors);
    references_resolve_in_scope(doc, &mut errors);
    handler_catchers_resolve(doc, defaults, &mut errors);
    reserved_names_unused(doc, defaults, &mut errors);
    merge_helpers_unclaimed(doc, defaults, &mut errors);

    errors
}

/// One state-machine scope: the top level, a Parallel branch, a Map
/// iterator, or a branch of a Parallel failure handler.
struct Scope<'a> {
    path: String,
    start_at: &'a str,
    states: &'a StateMap,
}

/// Every scope of the document in depth-first order, top level first.
fn scopes(doc: &PlaybookDocument) -> Vec<Scope<'_>> {
    let mut out = vec![Scope {
        path: "/States".into(),
        start_at: &doc.start_at,
        states: &doc.states,
    }];
    collect_nested(&doc.states, "/States", &mut out);

    if let Some(StateNode::Parallel(handler)) = doc
        .decorators
        .as_ref()
        .and_then(|d| d.task_failure_handler.as_deref())
    {
        for (i, branch) in handler.branches.iter().enumerate() {
            push_scope(
                format!("/Decorators/TaskFailureHandler/Branches/{}/States", i),
                branch,
                &mut out,
            );
        }
    }
    out
}

fn collect_nested<'a>(states: &'a StateMap, scope_path: &str, out: &mut Vec<Scope<'a>>) {
    for (name, node) in states {
        match node {
            StateNode::Parallel(parallel) => {
                for (i, branch) in parallel.branches.iter().enumerate() {
                    push_scope(
                        format!("{}/{}/Branches/{}/States", scope_path, name, i),
                        branch,
                        out,
                    );
                }
            }
            StateNode::Map(map) => push_scope(
                format!("{}/{}/Iterator/States", scope_path, name),
                &map.iterator,
                out,
            ),
            _ => {}
        }
    }
}

fn push_scope<'a>(path: String, machine: &'a StateMachine, out: &mut Vec<Scope<'a>>) {
    out.push(Scope {
        path: path.clone(),
        start_at: &machine.start_at,
        states: &machine.states,
    });
    collect_nested(&machine.states, &path, out);
}

/// Every state name in the document, nested scopes and failure-handler
/// branches included. Names repeat when they are declared more than once.
pub fn all_state_names(doc: &PlaybookDocument) -> Vec<&str> {
    let mut names = Vec::new();
    for scope in scopes(doc) {
        names.extend(scope.states.keys().map(String::as_str));
    }
    names
}

/// State names must be unique across the whole document. All duplicates are
/// reported together in one error.
pub fn unique_state_names(doc: &PlaybookDocument, errors: &mut Vec<ValidationError>) {
    let mut seen = IndexSet::new();
    let mut duplicated = IndexSet::new();
    for name in all_state_names(doc) {
        if !seen.insert(name) {
            duplicated.insert(name);
        }
    }

    if !duplicated.is_empty() {
        errors.push(ValidationError::rule(
            format!(
                "The following states in the playbook are duplicated: {}",
                duplicated.into_iter().collect::<Vec<_>>().join(", ")
            ),
            Some("/States".into()),
        ));
    }
}

/// `StartAt` and every `Next`/`Default`/catcher target must name a state in
/// the same scope. Nested scopes are checked independently.
fn references_resolve_in_scope(doc: &PlaybookDocument, errors: &mut Vec<ValidationError>) {
    for scope in scopes(doc) {
        if let Err(scope_errors) = ScopeGraph::build(scope.start_at, scope.states, &scope.path) {
            errors.extend(scope_errors);
        }
    }
}

/// Each Parallel gets a generated merge helper inserted into its scope. A
/// state already using that name, or a second Parallel mapping to the same
/// helper, would be overwritten.
fn merge_helpers_unclaimed(
    doc: &PlaybookDocument,
    defaults: &CompilerDefaults,
    errors: &mut Vec<ValidationError>,
) {
    for scope in scopes(doc) {
        let mut helpers: IndexMap<String, &str> = IndexMap::new();
        for (name, node) in scope.states {
            if !matches!(node, StateNode::Parallel(_)) {
                continue;
            }
            let helper = policy::merge_helper_name(name, defaults);
            if scope.states.contains_key(&helper) {
                errors.push(ValidationError::rule(
                    format!(
                        "State name '{}' is taken by the merge helper generated for Parallel '{}'",
                        helper, name
                    ),
                    Some(format!("{}/{}", scope.path, helper)),
                ));
            }
            if let Some(first) = helpers.insert(helper.clone(), name) {
                errors.push(ValidationError::rule(
                    format!(
                        "Parallel states '{}' and '{}' both generate the merge helper '{}'",
                        first, name, helper
                    ),
                    Some(format!("{}/{}", scope.path, name)),
                ));
            }
        }
    }

    let handler = doc
        .decorators
        .as_ref()
        .and_then(|d| d.task_failure_handler.as_deref());
    if let Some(StateNode::Parallel(_)) = handler {
        let helper = policy::merge_helper_name(&defaults.failure_handler.handler, defaults);
        if doc.states.contains_key(&helper) {
            errors.push(ValidationError::rule(
                format!(
                    "State name '{}' is taken by the merge helper generated for Decorators.TaskFailureHandler",
                    helper
                ),
                Some(format!("/States/{}", helper)),
            ));
        }
    }
}

/// The failure handler is spliced into the top-level scope, so its catchers
/// must point at top-level states or at the synthesized failure states.
fn handler_catchers_resolve(
    doc: &PlaybookDocument,
    defaults: &CompilerDefaults,
    errors: &mut Vec<ValidationError>,
) {
    let Some(handler) = doc
        .decorators
        .as_ref()
        .and_then(|d| d.task_failure_handler.as_deref())
    else {
        return;
    };

    let labels = &defaults.failure_handler;
    for (i, catcher) in handler.catchers().iter().enumerate() {
        let target = catcher.next.as_str();
        let known = doc.states.contains_key(target)
            || target == labels.handler
            || target == labels.entry
            || target == labels.end;
        if !known {
            errors.push(ValidationError::rule(
                format!(
                    "Decorators.TaskFailureHandler Catch[].Next references unknown state '{}'",
                    target
                ),
                Some(format!("/Decorators/TaskFailureHandler/Catch/{}", i)),
            ));
        }
    }
}

/// Synthesized top-level states would silently overwrite user states of the
/// same name.
fn reserved_names_unused(
    doc: &PlaybookDocument,
    defaults: &CompilerDefaults,
    errors: &mut Vec<ValidationError>,
) {
    for reserved in defaults.reserved_names() {
        if doc.states.contains_key(reserved) {
            errors.push(ValidationError::rule(
                format!(
                    "State name '{}' is reserved for states the compiler generates",
                    reserved
                ),
                Some(format!("/States/{}", reserved)),
            ));
        }
    }
}
