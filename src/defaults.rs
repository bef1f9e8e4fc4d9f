//! Policy constants consumed by the lowering and codegen passes.
//!
//! Everything here is a plain value object handed to the compiler, so tests
//! and embedders can swap labels or the default retrier without touching
//! global state.

use serde_json::Number;

use crate::parse::types::Retrier;

/// Labels of the synthesized failure-handler subgraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureHandlerLabels {
    /// Name under which the user's handler state is spliced in.
    pub handler: String,
    /// Pass state every injected catcher targets.
    pub entry: String,
    /// Fail state the handler continues to.
    pub end: String,
}

/// Labels of the three bootstrap states prepended to every compiled document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapLabels {
    pub direct_invocation_check: String,
    pub global_state_setup: String,
    pub input_formatter: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompilerDefaults {
    /// Appended to every Task/Interaction unless disabled.
    pub default_retry: Retrier,
    /// Error class matched by the injected failure-handler catcher.
    pub task_failed_error: String,
    pub failure_handler: FailureHandlerLabels,
    pub bootstrap: BootstrapLabels,
    pub merge_helper_prefix: String,
    pub merge_helper_resource: String,
    pub max_state_name_len: usize,
    /// Resource every Interaction is rewritten to.
    pub token_wait_resource: String,
    pub global_state_setup_resource: String,
    pub states_execution_role_arn: String,
    pub playbooks_log_group_arn: String,
    /// Marker wrapping values that must be emitted unquoted.
    pub literal_marker: String,
}

impl Default for CompilerDefaults {
    fn default() -> Self {
        CompilerDefaults {
            default_retry: Retrier {
                error_equals: vec![
                    "Lambda.ServiceException".into(),
                    "Lambda.AWSLambdaException".into(),
                    "Lambda.SdkClientException".into(),
                ],
                interval_seconds: Some(2),
                max_attempts: Some(6),
                backoff_rate: Some(Number::from(2)),
            },
            task_failed_error: "States.TaskFailed".into(),
            failure_handler: FailureHandlerLabels {
                handler: "_Handle_Task_Failure".into(),
                entry: "_Task_Failed".into(),
                end: "_End_With_Failure".into(),
            },
            bootstrap: BootstrapLabels {
                direct_invocation_check: "Was_Playbook_Direct_Executed".into(),
                global_state_setup: "Setup_Socless_Global_State".into(),
                input_formatter: "PLAYBOOK_FORMATTER".into(),
            },
            merge_helper_prefix: "merge_".into(),
            merge_helper_resource: "${{self:custom.core.MergeParallelOutput}}".into(),
            max_state_name_len: 128,
            token_wait_resource: "arn:aws:states:::lambda:invoke.waitForTaskToken".into(),
            global_state_setup_resource:
                "arn:aws:lambda:${AWS::Region}:${AWS::AccountId}:function:_socless_setup_global_state_for_direct_invoked_playbook"
                    .into(),
            states_execution_role_arn:
                "${{cf:socless-${{self:provider.stage}}.StatesExecutionRoleArn}}".into(),
            playbooks_log_group_arn: "${{cf:socless-${{self:provider.stage}}.PlaybooksLogGroup}}"
                .into(),
            literal_marker: "apb_render_nonstring_value".into(),
        }
    }
}

impl CompilerDefaults {
    /// Names the compiler synthesizes at the top level; user states may not take them.
    pub fn reserved_names(&self) -> [&str; 6] {
        [
            &self.bootstrap.direct_invocation_check,
            &self.bootstrap.global_state_setup,
            &self.bootstrap.input_formatter,
            &self.failure_handler.handler,
            &self.failure_handler.entry,
            &self.failure_handler.end,
        ]
    }
}
