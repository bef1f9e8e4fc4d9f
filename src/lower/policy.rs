//! Pure policy synthesizers: retry merge, failure catchers, the failure
//! subgraph, Parallel merge helpers and task parameter envelopes.

use std::collections::HashSet;

use serde_json::{Map, Value, json};

use crate::defaults::CompilerDefaults;
use crate::error::CompilerError;
use crate::parse::types::{
    Catcher, FailState, PassState, Retrier, StateMap, StateNode, TaskState,
};

/// The user's retriers unchanged, followed by the default retrier minus the
/// error classes the user already covers.
///
/// The default is only appended when it still matches something and is not
/// disabled for this state. `None` means the state carries no `Retry` key.
pub fn merge_retry(
    user: Option<&[Retrier]>,
    default_disabled: bool,
    default: &Retrier,
) -> Option<Vec<Retrier>> {
    let mut merged: Vec<Retrier> = user.map(<[Retrier]>::to_vec).unwrap_or_default();

    if !default_disabled {
        let remaining: Vec<String> = {
            let covered: HashSet<&str> = merged
                .iter()
                .flat_map(|r| r.error_equals.iter().map(String::as_str))
                .collect();
            default
                .error_equals
                .iter()
                .filter(|e| !covered.contains(e.as_str()))
                .cloned()
                .collect()
        };
        if !remaining.is_empty() {
            merged.push(Retrier {
                error_equals: remaining,
                ..default.clone()
            });
        }
    }

    if merged.is_empty() && user.is_none() {
        None
    } else {
        Some(merged)
    }
}

/// Catcher routing a failed state into the failure subgraph, recording the
/// error under `$.errors.<state>`.
pub fn failure_catch(state_name: &str, defaults: &CompilerDefaults) -> Catcher {
    Catcher {
        error_equals: vec![defaults.task_failed_error.clone()],
        result_path: Some(format!("$.errors.{}", state_name)),
        next: defaults.failure_handler.entry.clone(),
    }
}

/// Append `catcher` after the state's own catchers.
pub fn append_catch(catch: Option<Vec<Catcher>>, catcher: Catcher) -> Option<Vec<Catcher>> {
    let mut catch = catch.unwrap_or_default();
    catch.push(catcher);
    Some(catch)
}

/// The three states spliced into the top-level scope when a failure handler
/// is configured: entry Pass → handler → terminal Fail.
///
/// The handler's own terminal marker is replaced by a transition to the
/// terminal Fail state. Only Task and Parallel handlers are supported.
pub fn failure_subgraph(
    handler: &StateNode,
    defaults: &CompilerDefaults,
) -> Result<StateMap, CompilerError> {
    let labels = &defaults.failure_handler;

    let rewired = match handler {
        StateNode::Task(task) => StateNode::Task(TaskState {
            next: Some(labels.end.clone()),
            end: None,
            ..task.clone()
        }),
        StateNode::Parallel(parallel) => {
            let mut parallel = parallel.clone();
            parallel.next = Some(labels.end.clone());
            parallel.end = None;
            StateNode::Parallel(parallel)
        }
        other => return Err(CompilerError::TaskFailureHandlerKind(other.kind().to_string())),
    };

    let mut states = StateMap::new();
    states.insert(
        labels.entry.clone(),
        StateNode::Pass(PassState {
            next: Some(labels.handler.clone()),
            ..PassState::default()
        }),
    );
    states.insert(labels.handler.clone(), rewired);
    states.insert(labels.end.clone(), StateNode::Fail(FailState::default()));
    Ok(states)
}

/// Deterministic merge-helper name: prefix + lower-cased state name, cut to
/// the maximum state-name length.
pub fn merge_helper_name(parallel_name: &str, defaults: &CompilerDefaults) -> String {
    format!(
        "{}{}",
        defaults.merge_helper_prefix,
        parallel_name.to_lowercase()
    )
    .chars()
    .take(defaults.max_state_name_len)
    .collect()
}

/// Companion Task that merges a Parallel's branch outputs. It takes over the
/// Parallel's continuation: `next`, or `End: true` when there is none.
pub fn merge_helper(
    helper_name: &str,
    next: Option<String>,
    default_retry_disabled: bool,
    failure_handler: bool,
    defaults: &CompilerDefaults,
) -> TaskState {
    let end = next.is_none().then_some(true);
    TaskState {
        resource: defaults.merge_helper_resource.clone(),
        retry: (!default_retry_disabled).then(|| vec![defaults.default_retry.clone()]),
        catch: failure_handler.then(|| vec![failure_catch(helper_name, defaults)]),
        next,
        end,
        ..TaskState::default()
    }
}

/// Standard task envelope: execution-scoped context references plus a
/// `State_Config` naming the state and carrying its original parameters.
pub fn task_envelope(state_name: &str, parameters: Option<Value>) -> Value {
    let mut state_config = Map::new();
    state_config.insert("Name".into(), Value::String(state_name.to_string()));
    if let Some(parameters) = parameters {
        state_config.insert("Parameters".into(), parameters);
    }

    json!({
        "execution_id.$": "$.execution_id",
        "artifacts.$": "$.artifacts",
        "errors.$": "$.errors",
        "results.$": "$.results",
        "State_Config": state_config,
    })
}

/// Asynchronous dispatch envelope for Interaction states: the original
/// resource becomes the invoked function and the task envelope travels as the
/// payload alongside the continuation token.
pub fn interaction_envelope(
    state_name: &str,
    parameters: Option<Value>,
    function_name: &str,
) -> Value {
    json!({
        "FunctionName": function_name,
        "Payload": {
            "sfn_context": task_envelope(state_name, parameters),
            "task_token.$": "$$.Task.Token",
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn retrier(errors: &[&str]) -> Retrier {
        Retrier {
            error_equals: errors.iter().map(|e| e.to_string()).collect(),
            interval_seconds: Some(1),
            max_attempts: Some(3),
            backoff_rate: None,
        }
    }

    #[test]
    fn missing_retry_gets_default() {
        let defaults = CompilerDefaults::default();
        let merged = merge_retry(None, false, &defaults.default_retry).unwrap();
        assert_eq!(merged, vec![defaults.default_retry.clone()]);
    }

    #[test]
    fn user_retry_comes_first_and_narrows_default() {
        let defaults = CompilerDefaults::default();
        let user = vec![retrier(&["ConnectionError", "Lambda.ServiceException"])];
        let merged = merge_retry(Some(&user), false, &defaults.default_retry).unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0], user[0]);
        assert_eq!(
            merged[1].error_equals,
            vec!["Lambda.AWSLambdaException", "Lambda.SdkClientException"]
        );
        assert_eq!(merged[1].max_attempts, Some(6));
    }

    #[test]
    fn fully_covered_default_is_dropped() {
        let defaults = CompilerDefaults::default();
        let user = vec![retrier(&[
            "Lambda.ServiceException",
            "Lambda.AWSLambdaException",
            "Lambda.SdkClientException",
        ])];
        let merged = merge_retry(Some(&user), false, &defaults.default_retry).unwrap();
        assert_eq!(merged, user);
    }

    #[test]
    fn disabled_default_is_never_appended() {
        let defaults = CompilerDefaults::default();
        assert_eq!(merge_retry(None, true, &defaults.default_retry), None);
        let user = vec![retrier(&["ConnectionError"])];
        assert_eq!(
            merge_retry(Some(&user), true, &defaults.default_retry),
            Some(user)
        );
    }

    #[test]
    fn helper_name_is_lowercased_and_bounded() {
        let defaults = CompilerDefaults::default();
        assert_eq!(merge_helper_name("Fan_Out", &defaults), "merge_fan_out");
        let long = "X".repeat(300);
        assert_eq!(merge_helper_name(&long, &defaults).len(), 128);
    }

    #[test]
    fn helper_without_next_ends() {
        let defaults = CompilerDefaults::default();
        let helper = merge_helper("merge_x", None, false, true, &defaults);
        assert_eq!(helper.end, Some(true));
        assert_eq!(helper.next, None);
        assert_eq!(helper.catch.unwrap()[0].result_path.as_deref(), Some("$.errors.merge_x"));

        let helper = merge_helper("merge_x", Some("After".into()), true, false, &defaults);
        assert_eq!(helper.end, None);
        assert_eq!(helper.retry, None);
        assert_eq!(helper.catch, None);
    }

    #[test]
    fn failure_subgraph_rejects_other_kinds() {
        let defaults = CompilerDefaults::default();
        let err = failure_subgraph(&StateNode::Pass(PassState::default()), &defaults).unwrap_err();
        assert!(matches!(err, CompilerError::TaskFailureHandlerKind(kind) if kind == "Pass"));

        let interaction = StateNode::Interaction(TaskState {
            resource: "arn:x".into(),
            ..TaskState::default()
        });
        assert!(failure_subgraph(&interaction, &defaults).is_err());
    }

    #[test]
    fn envelope_omits_missing_parameters() {
        let envelope = task_envelope("Step", None);
        assert_eq!(envelope["State_Config"], json!({ "Name": "Step" }));
    }
}
