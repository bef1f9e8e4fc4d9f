//! The three states every compiled playbook starts with.
//!
//! They let one compiled document run either as a step of a larger execution
//! (context already present) or as a direct execution (context bootstrapped).

use indexmap::IndexMap;
use serde_json::{Value, json};

use crate::defaults::CompilerDefaults;
use crate::lower::NameResolver;
use crate::parse::types::{ChoiceRule, ChoiceState, PassState, StateMap, StateNode, TaskState};

/// Bootstrap states in output order: direct-invocation check, global-state
/// setup, input formatter. `start_at` is the playbook's own first state.
pub fn bootstrap_states(
    start_at: &str,
    resolver: &impl NameResolver,
    defaults: &CompilerDefaults,
) -> StateMap {
    let labels = &defaults.bootstrap;
    let start_at = resolver.resolve(start_at);

    let mut states = StateMap::new();
    states.insert(
        labels.direct_invocation_check.clone(),
        StateNode::Choice(ChoiceState {
            choices: vec![
                context_check(false, &labels.input_formatter),
                context_check(true, &start_at),
            ],
            default: Some(labels.global_state_setup.clone()),
            ..ChoiceState::default()
        }),
    );
    states.insert(
        labels.global_state_setup.clone(),
        StateNode::Task(TaskState {
            resource: defaults.global_state_setup_resource.clone(),
            parameters: Some(json!({
                "execution_id.$": "$$.Execution.Name",
                "playbook_name.$": "$$.StateMachine.Name",
                "playbook_event_details.$": "$$.Execution.Input",
            })),
            next: Some(labels.input_formatter.clone()),
            ..TaskState::default()
        }),
    );
    states.insert(
        labels.input_formatter.clone(),
        StateNode::Pass(PassState {
            parameters: Some(json!({
                "execution_id.$": "$.execution_id",
                "artifacts.$": "$.artifacts",
                "results": {},
                "errors": {},
            })),
            next: Some(start_at),
            ..PassState::default()
        }),
    );
    states
}

/// `artifacts` and `execution_id` present, with `errors`/`results` present
/// or absent per `bags_present`.
fn context_check(bags_present: bool, next: &str) -> ChoiceRule {
    let is_present = |variable: &str, present: bool| -> Value {
        json!({ "Variable": variable, "IsPresent": present })
    };

    let mut condition = IndexMap::new();
    condition.insert(
        "And".to_string(),
        Value::Array(vec![
            is_present("$.artifacts", true),
            is_present("$.execution_id", true),
            is_present("$.errors", bags_present),
            is_present("$.results", bags_present),
        ]),
    );
    ChoiceRule {
        condition,
        next: next.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lower::Identity;

    #[test]
    fn routes_match_invocation_style() {
        let defaults = CompilerDefaults::default();
        let states = bootstrap_states("First", &Identity, &defaults);

        let names: Vec<&str> = states.keys().map(String::as_str).collect();
        assert_eq!(
            names,
            vec!["Was_Playbook_Direct_Executed", "Setup_Socless_Global_State", "PLAYBOOK_FORMATTER"]
        );

        let StateNode::Choice(check) = &states["Was_Playbook_Direct_Executed"] else {
            panic!("expected Choice");
        };
        assert_eq!(check.choices[0].next, "PLAYBOOK_FORMATTER");
        assert_eq!(check.choices[1].next, "First");
        assert_eq!(check.default.as_deref(), Some("Setup_Socless_Global_State"));

        assert_eq!(states["Setup_Socless_Global_State"].next(), Some("PLAYBOOK_FORMATTER"));
        assert_eq!(states["PLAYBOOK_FORMATTER"].next(), Some("First"));
    }
}
