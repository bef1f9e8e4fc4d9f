//! Rust types for playbook documents and the state nodes they contain.
//!
//! These are the serde target for validated playbook JSON/YAML. Field names
//! follow the state-machine language (PascalCase on the wire). The same state
//! types describe compiled output: lowering rewrites values, never shapes,
//! except that `Interaction` never survives into compiled output.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, de};
use serde_json::{Number, Value};

/// Ordered `name → state` mapping. Order is declaration order and drives
/// the order of compiled output.
pub type StateMap = IndexMap<String, StateNode>;

// =============================================================================
// TOP-LEVEL DOCUMENT
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybookDocument {
    #[serde(rename = "Playbook")]
    pub name: String,
    #[serde(rename = "Comment")]
    pub comment: String,
    #[serde(rename = "StartAt")]
    pub start_at: String,
    #[serde(rename = "States")]
    pub states: StateMap,
    #[serde(rename = "Decorators", default, skip_serializing_if = "Option::is_none")]
    pub decorators: Option<Decorators>,
    /// Any other top-level keys (`Version`, `TimeoutSeconds`), carried verbatim.
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

/// A nested sub-graph: a Parallel branch or a Map iterator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StateMachine {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub start_at: String,
    pub states: StateMap,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

// =============================================================================
// DECORATORS
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Decorators {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_failure_handler: Option<Box<StateNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_default_retry: Option<DisableDefaultRetry>,
}

/// `{ "all": true }` or `{ "tasks": [...] }`; the schema forbids both at once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisableDefaultRetry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<String>>,
}

impl DisableDefaultRetry {
    pub fn disables(&self, state_name: &str) -> bool {
        if self.all == Some(true) {
            return true;
        }
        self.tasks
            .as_ref()
            .is_some_and(|tasks| tasks.iter().any(|t| t == state_name))
    }
}

// =============================================================================
// STATE NODE — tagged union over the nine state kinds
// =============================================================================

/// Every kind a source state may declare, in `Type` spelling.
pub const STATE_KINDS: [&str; 9] = [
    "Pass",
    "Succeed",
    "Fail",
    "Wait",
    "Task",
    "Interaction",
    "Choice",
    "Parallel",
    "Map",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "Type")]
pub enum StateNode {
    Pass(PassState),
    Succeed(SucceedState),
    Fail(FailState),
    Wait(WaitState),
    Task(TaskState),
    /// Source-only: an asynchronous human/external checkpoint. Lowered to a
    /// token-waiting `Task`.
    Interaction(TaskState),
    Choice(ChoiceState),
    Parallel(ParallelState),
    Map(MapState),
}

impl StateNode {
    pub fn kind(&self) -> &'static str {
        match self {
            StateNode::Pass(_) => "Pass",
            StateNode::Succeed(_) => "Succeed",
            StateNode::Fail(_) => "Fail",
            StateNode::Wait(_) => "Wait",
            StateNode::Task(_) => "Task",
            StateNode::Interaction(_) => "Interaction",
            StateNode::Choice(_) => "Choice",
            StateNode::Parallel(_) => "Parallel",
            StateNode::Map(_) => "Map",
        }
    }

    /// The unconditional `Next` of this state, if it has one.
    pub fn next(&self) -> Option<&str> {
        match self {
            StateNode::Pass(s) => s.next.as_deref(),
            StateNode::Wait(s) => s.next.as_deref(),
            StateNode::Task(s) | StateNode::Interaction(s) => s.next.as_deref(),
            StateNode::Parallel(s) => s.next.as_deref(),
            StateNode::Map(s) => s.next.as_deref(),
            StateNode::Succeed(_) | StateNode::Fail(_) | StateNode::Choice(_) => None,
        }
    }

    /// Catchers declared on this state (empty for kinds that cannot catch).
    pub fn catchers(&self) -> &[Catcher] {
        let catch = match self {
            StateNode::Task(s) | StateNode::Interaction(s) => &s.catch,
            StateNode::Parallel(s) => &s.catch,
            StateNode::Map(s) => &s.catch,
            _ => return &[],
        };
        catch.as_deref().unwrap_or(&[])
    }

    /// Nested sub-graphs: Parallel branches or the Map iterator.
    pub fn nested_machines(&self) -> Vec<&StateMachine> {
        match self {
            StateNode::Parallel(s) => s.branches.iter().collect(),
            StateNode::Map(s) => vec![&s.iterator],
            _ => vec![],
        }
    }
}

// =============================================================================
// RETRY / CATCH
// =============================================================================

/// Counts and second bounds. `2.0` is accepted as `2`, the same as the schema's
/// `integer` type does.
fn whole_number<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(number) = Option::<Number>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if let Some(n) = number.as_u64() {
        return Ok(Some(n));
    }
    match number.as_f64() {
        Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => Ok(Some(f as u64)),
        _ => Err(de::Error::custom(format!(
            "expected a non-negative whole number, found {}",
            number
        ))),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Retrier {
    pub error_equals: Vec<String>,
    #[serde(
        default,
        deserialize_with = "whole_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub interval_seconds: Option<u64>,
    #[serde(
        default,
        deserialize_with = "whole_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_attempts: Option<u64>,
    /// Kept as a JSON number so `2` round-trips as `2`, not `2.0`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff_rate: Option<Number>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Catcher {
    pub error_equals: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_path: Option<String>,
    pub next: String,
}

// =============================================================================
// STATE SHAPES
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PassState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SucceedState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FailState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WaitState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    /// A number, or a literal-marker string resolved at deploy time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seconds: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seconds_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<bool>,
}

/// Shape shared by `Task` and `Interaction`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaskState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    pub resource: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_selector: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_path: Option<String>,
    #[serde(
        default,
        deserialize_with = "whole_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub timeout_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds_path: Option<String>,
    #[serde(
        default,
        deserialize_with = "whole_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub heartbeat_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heartbeat_seconds_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<Vec<Retrier>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catch: Option<Vec<Catcher>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChoiceState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    pub choices: Vec<ChoiceRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// One top-level choice rule. The boolean expression (`And`/`Or`/`Not` or a
/// single comparator plus `Variable`) is kept as opaque JSON; only `Next`
/// participates in lowering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceRule {
    #[serde(flatten)]
    pub condition: IndexMap<String, Value>,
    #[serde(rename = "Next")]
    pub next: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ParallelState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_selector: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<Vec<Retrier>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catch: Option<Vec<Catcher>>,
    pub branches: Vec<StateMachine>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MapState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items_path: Option<String>,
    #[serde(
        default,
        deserialize_with = "whole_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_concurrency: Option<u64>,
    pub iterator: StateMachine,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_selector: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<Vec<Retrier>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catch: Option<Vec<Catcher>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn interaction_deserializes_as_task_shape() {
        let node: StateNode = serde_json::from_value(json!({
            "Type": "Interaction",
            "Resource": "arn:prompt",
            "Next": "B"
        }))
        .unwrap();
        assert_eq!(node.kind(), "Interaction");
        assert_eq!(node.next(), Some("B"));
    }

    #[test]
    fn choice_rule_keeps_condition_order() {
        let rule: ChoiceRule = serde_json::from_value(json!({
            "Variable": "$.x",
            "NumericEquals": 1,
            "Next": "Done"
        }))
        .unwrap();
        assert_eq!(rule.next, "Done");
        let keys: Vec<&str> = rule.condition.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["Variable", "NumericEquals"]);
    }

    #[test]
    fn disable_default_retry_modes() {
        let all = DisableDefaultRetry { all: Some(true), tasks: None };
        assert!(all.disables("Anything"));

        let some = DisableDefaultRetry {
            all: None,
            tasks: Some(vec!["A".into()]),
        };
        assert!(some.disables("A"));
        assert!(!some.disables("B"));

        let off = DisableDefaultRetry { all: Some(false), tasks: None };
        assert!(!off.disables("A"));
    }

    #[test]
    fn playbook_keeps_unknown_top_level_fields() {
        let doc: PlaybookDocument = serde_json::from_value(json!({
            "Playbook": "P",
            "Comment": "c",
            "StartAt": "A",
            "Version": "1.0",
            "States": { "A": { "Type": "Succeed" } }
        }))
        .unwrap();
        assert_eq!(doc.extra.get("Version"), Some(&json!("1.0")));
        assert!(doc.decorators.is_none());
    }

    #[test]
    fn whole_number_floats_are_integers() {
        let retrier: Retrier = serde_json::from_value(json!({
            "ErrorEquals": ["E"],
            "IntervalSeconds": 2.0,
            "MaxAttempts": 3
        }))
        .unwrap();
        assert_eq!(retrier.interval_seconds, Some(2));
        assert_eq!(retrier.max_attempts, Some(3));
        assert_eq!(
            serde_json::to_value(&retrier).unwrap()["IntervalSeconds"],
            json!(2)
        );

        let err = serde_json::from_value::<Retrier>(json!({
            "ErrorEquals": ["E"],
            "IntervalSeconds": 2.5
        }))
        .unwrap_err();
        assert!(err.to_string().contains("whole number"));
    }
}
