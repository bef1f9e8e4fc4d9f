//! Declarative shape rules for playbooks and every state kind.
//!
//! The rule-set is a draft-07 JSON Schema assembled in code so the comparator
//! table and numeric bounds live in one place. All violations are collected;
//! nothing short-circuits.

use std::collections::HashMap;

use jsonschema::Validator;
use serde_json::{Map, Value, json};

use crate::error::{CompilerError, ValidationError, ValidationResult};
use crate::parse::types::STATE_KINDS;

const STATE_NAME_PATTERN: &str = "^[a-zA-Z0-9_]{1,}";
const PATH_PATTERN: &str = "^\\$.*$";
const PLAYBOOK_NAME_PATTERN: &str = "^[a-zA-Z0-9]+$";
const MAX_SECONDS: u64 = 99_999_999;

#[derive(Clone, Copy)]
enum Operand {
    String,
    Number,
    Boolean,
    Timestamp,
    Path,
}

/// Choice-rule comparators; a data-test expression carries exactly one.
const COMPARATORS: [(&str, Operand); 39] = [
    ("StringEquals", Operand::String),
    ("StringEqualsPath", Operand::Path),
    ("StringLessThan", Operand::String),
    ("StringLessThanPath", Operand::Path),
    ("StringGreaterThan", Operand::String),
    ("StringGreaterThanPath", Operand::Path),
    ("StringLessThanEquals", Operand::String),
    ("StringLessThanEqualsPath", Operand::Path),
    ("StringGreaterThanEquals", Operand::String),
    ("StringGreaterThanEqualsPath", Operand::Path),
    ("StringMatches", Operand::String),
    ("NumericEquals", Operand::Number),
    ("NumericEqualsPath", Operand::Path),
    ("NumericLessThan", Operand::Number),
    ("NumericLessThanPath", Operand::Path),
    ("NumericGreaterThan", Operand::Number),
    ("NumericGreaterThanPath", Operand::Path),
    ("NumericLessThanEquals", Operand::Number),
    ("NumericLessThanEqualsPath", Operand::Path),
    ("NumericGreaterThanEquals", Operand::Number),
    ("NumericGreaterThanEqualsPath", Operand::Path),
    ("BooleanEquals", Operand::Boolean),
    ("BooleanEqualsPath", Operand::Path),
    ("TimestampEquals", Operand::Timestamp),
    ("TimestampEqualsPath", Operand::Path),
    ("TimestampLessThan", Operand::Timestamp),
    ("TimestampLessThanPath", Operand::Path),
    ("TimestampGreaterThan", Operand::Timestamp),
    ("TimestampGreaterThanPath", Operand::Path),
    ("TimestampLessThanEquals", Operand::Timestamp),
    ("TimestampLessThanEqualsPath", Operand::Path),
    ("TimestampGreaterThanEquals", Operand::Timestamp),
    ("TimestampGreaterThanEqualsPath", Operand::Path),
    ("IsBoolean", Operand::Boolean),
    ("IsNull", Operand::Boolean),
    ("IsPresent", Operand::Boolean),
    ("IsNumeric", Operand::Boolean),
    ("IsString", Operand::Boolean),
    ("IsTimestamp", Operand::Boolean),
];

/// Whether a state shape must carry exactly one of `Next`/`End`, or may
/// carry neither (the failure-handler decorator, which gets rewired).
#[derive(Clone, Copy, PartialEq, Eq)]
enum Terminal {
    Required,
    Optional,
}

/// Compiled validators for a whole playbook and for each state kind.
pub struct PlaybookSchema {
    playbook: Validator,
    states: HashMap<&'static str, Validator>,
}

impl PlaybookSchema {
    /// Build the rule-set. `literal_marker` is the name of the unquoted-literal
    /// wrapper accepted where a number is otherwise required.
    pub fn new(literal_marker: &str) -> Result<Self, CompilerError> {
        let defs = definitions(literal_marker);

        let playbook = build(playbook_schema(&defs))?;

        let mut states = HashMap::new();
        for kind in STATE_KINDS {
            let schema = json!({
                "$schema": "http://json-schema.org/draft-07/schema#",
                "$ref": format!("#/definitions/{}", definition_name(kind)),
                "definitions": defs.clone(),
            });
            states.insert(kind, build(schema)?);
        }

        Ok(PlaybookSchema { playbook, states })
    }

    /// Every shape violation in a playbook document.
    pub fn validate_playbook(&self, value: &Value) -> Vec<ValidationError> {
        collect(&self.playbook, value)
    }

    /// Validate a single state against the shape its `Type` declares.
    pub fn validate_state(&self, value: &Value) -> ValidationResult {
        let Some(object) = value.as_object() else {
            return ValidationResult::from_errors(vec![ValidationError::type_error(format!(
                "Provided input is of incorrect type. Expected 'object', received {}",
                json_type_name(value)
            ))]);
        };

        let kind = object.get("Type").and_then(Value::as_str).unwrap_or_default();
        match self.states.get(kind) {
            Some(validator) => ValidationResult::from_errors(collect(validator, value)),
            None => ValidationResult::from_errors(vec![ValidationError::schema(
                format!(
                    "State.Type of {} is not supported. Please ensure the provided input has a Type key that is a supported Playbook Type",
                    if kind.is_empty() { "<missing>" } else { kind }
                ),
                Some("/Type".into()),
            )]),
        }
    }
}

fn build(schema: Value) -> Result<Validator, CompilerError> {
    jsonschema::draft7::new(&schema).map_err(|e| CompilerError::Schema(e.to_string()))
}

fn collect(validator: &Validator, value: &Value) -> Vec<ValidationError> {
    validator
        .iter_errors(value)
        .map(|e| ValidationError::schema(e.to_string(), Some(e.instance_path.to_string())))
        .collect()
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn definition_name(kind: &str) -> &'static str {
    match kind {
        "Pass" => "pass",
        "Succeed" => "succeed",
        "Fail" => "fail",
        "Wait" => "wait",
        "Choice" => "choice",
        "Parallel" => "parallel",
        "Map" => "map",
        // Interaction shares the Task shape.
        _ => "task",
    }
}

// =============================================================================
// DOCUMENT SCHEMAS
// =============================================================================

fn playbook_schema(defs: &Map<String, Value>) -> Value {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "required": ["Playbook", "Comment", "StartAt", "States"],
        "additionalProperties": false,
        "properties": {
            "Playbook": { "type": "string", "pattern": PLAYBOOK_NAME_PATTERN },
            "Comment": { "type": "string", "minLength": 1 },
            "StartAt": { "$ref": "#/definitions/stateName" },
            "States": { "$ref": "#/definitions/states" },
            "Version": { "type": "string" },
            "TimeoutSeconds": { "type": "integer", "minimum": 0 },
            "Decorators": { "$ref": "#/definitions/decorators" }
        },
        "definitions": defs,
    })
}

fn definitions(literal_marker: &str) -> Map<String, Value> {
    let mut defs = Map::new();

    defs.insert("stateName".into(), json!({ "type": "string", "pattern": STATE_NAME_PATTERN }));
    defs.insert("path".into(), json!({ "type": "string", "pattern": PATH_PATTERN }));
    defs.insert("timestamp".into(), json!({ "type": "string", "format": "date-time" }));
    defs.insert(
        "literalMarker".into(),
        json!({
            "type": "string",
            "pattern": format!("^{}\\(.+\\)$", regex::escape(literal_marker)),
        }),
    );
    defs.insert("seconds".into(), seconds_bound(1));
    defs.insert(
        "errorEquals".into(),
        json!({ "type": "array", "minItems": 1, "items": { "type": "string" } }),
    );
    defs.insert(
        "retrier".into(),
        json!({
            "type": "object",
            "required": ["ErrorEquals"],
            "additionalProperties": false,
            "properties": {
                "ErrorEquals": { "$ref": "#/definitions/errorEquals" },
                "IntervalSeconds": seconds_bound(1),
                "MaxAttempts": seconds_bound(0),
                "BackoffRate": { "type": "number", "minimum": 0 }
            }
        }),
    );
    defs.insert(
        "catcher".into(),
        json!({
            "type": "object",
            "required": ["ErrorEquals", "Next"],
            "additionalProperties": false,
            "properties": {
                "ErrorEquals": { "$ref": "#/definitions/errorEquals" },
                "Next": { "$ref": "#/definitions/stateName" },
                "ResultPath": { "$ref": "#/definitions/path" }
            }
        }),
    );
    defs.insert(
        "stateMachine".into(),
        json!({
            "type": "object",
            "required": ["StartAt", "States"],
            "additionalProperties": false,
            "properties": {
                "Comment": { "type": "string" },
                "StartAt": { "$ref": "#/definitions/stateName" },
                "States": { "$ref": "#/definitions/states" },
                "Version": { "type": "string" },
                "TimeoutSeconds": { "type": "integer", "minimum": 0 }
            }
        }),
    );
    defs.insert(
        "states".into(),
        json!({
            "type": "object",
            "propertyNames": { "$ref": "#/definitions/stateName" },
            "additionalProperties": { "$ref": "#/definitions/state" }
        }),
    );
    defs.insert("state".into(), dispatch_on_type(&STATE_KINDS, false));
    defs.insert("handlerState".into(), dispatch_on_type(&STATE_KINDS, true));

    defs.insert("pass".into(), pass_schema(Terminal::Required));
    defs.insert("succeed".into(), succeed_schema());
    defs.insert("fail".into(), fail_schema());
    defs.insert("wait".into(), wait_schema(Terminal::Required));
    defs.insert("task".into(), task_schema(Terminal::Required));
    defs.insert("choice".into(), choice_schema());
    defs.insert("parallel".into(), parallel_schema(Terminal::Required));
    defs.insert("map".into(), map_schema(Terminal::Required));
    defs.insert("taskHandler".into(), task_schema(Terminal::Optional));
    defs.insert("parallelHandler".into(), parallel_schema(Terminal::Optional));

    defs.insert("dataTest".into(), data_test_schema(false));
    defs.insert("topLevelDataTest".into(), data_test_schema(true));
    defs.insert(
        "nestedNot".into(),
        json!({
            "type": "object",
            "required": ["Not"],
            "additionalProperties": false,
            "properties": { "Not": { "$ref": "#/definitions/dataTest" } }
        }),
    );
    defs.insert("booleanExpression".into(), boolean_expression_schema());

    defs.insert(
        "decorators".into(),
        json!({
            "type": "object",
            "additionalProperties": false,
            "properties": {
                "TaskFailureHandler": { "$ref": "#/definitions/handlerState" },
                "DisableDefaultRetry": {
                    "type": "object",
                    "additionalProperties": false,
                    "properties": {
                        "all": { "type": "boolean" },
                        "tasks": {
                            "type": "array",
                            "items": { "$ref": "#/definitions/stateName" }
                        }
                    },
                    "oneOf": [{ "required": ["all"] }, { "required": ["tasks"] }]
                }
            }
        }),
    );

    defs
}

/// `{ Type: enum, allOf: [if Type == X then <X shape>] }`.
///
/// For the failure-handler decorator, Task and Parallel shapes are checked
/// with an optional terminal marker; other kinds only need a known `Type`,
/// since rejecting them is the decorator expander's job.
fn dispatch_on_type(kinds: &[&str], handler: bool) -> Value {
    let branches: Vec<Value> = kinds
        .iter()
        .filter_map(|kind| {
            let target = match (handler, *kind) {
                (false, kind) => definition_name(kind),
                (true, "Task") | (true, "Interaction") => "taskHandler",
                (true, "Parallel") => "parallelHandler",
                (true, _) => return None,
            };
            Some(json!({
                "if": {
                    "required": ["Type"],
                    "properties": { "Type": { "const": kind } }
                },
                "then": { "$ref": format!("#/definitions/{}", target) }
            }))
        })
        .collect();

    json!({
        "type": "object",
        "required": ["Type"],
        "properties": { "Type": { "enum": kinds } },
        "allOf": branches,
    })
}

// =============================================================================
// STATE SHAPES
// =============================================================================

fn seconds_bound(minimum: u64) -> Value {
    json!({ "type": "integer", "minimum": minimum, "maximum": MAX_SECONDS })
}

fn kind_schema(
    kind: Value,
    required: &[&str],
    mut properties: Map<String, Value>,
    terminal: Option<Terminal>,
    extra_rules: Vec<Value>,
) -> Value {
    properties.insert("Type".into(), kind);
    properties.insert("Comment".into(), json!({ "type": "string" }));

    let mut rules = extra_rules;
    if let Some(terminal) = terminal {
        properties.insert("Next".into(), json!({ "$ref": "#/definitions/stateName" }));
        properties.insert("End".into(), json!({ "const": true }));
        rules.push(match terminal {
            Terminal::Required => json!({
                "oneOf": [{ "required": ["Next"] }, { "required": ["End"] }]
            }),
            Terminal::Optional => json!({ "not": { "required": ["Next", "End"] } }),
        });
    }

    let mut required_keys = vec!["Type"];
    required_keys.extend_from_slice(required);

    let mut schema = json!({
        "type": "object",
        "required": required_keys,
        "additionalProperties": false,
        "properties": properties,
    });
    if !rules.is_empty() {
        schema["allOf"] = Value::Array(rules);
    }
    schema
}

fn props(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn io_props() -> Map<String, Value> {
    props(json!({
        "InputPath": { "$ref": "#/definitions/path" },
        "OutputPath": { "$ref": "#/definitions/path" }
    }))
}

fn pass_schema(terminal: Terminal) -> Value {
    let mut p = io_props();
    p.extend(props(json!({
        "ResultPath": { "$ref": "#/definitions/path" },
        "Result": { "type": "object" },
        "Parameters": { "type": "object" }
    })));
    kind_schema(json!({ "const": "Pass" }), &[], p, Some(terminal), vec![])
}

fn succeed_schema() -> Value {
    kind_schema(json!({ "const": "Succeed" }), &[], io_props(), None, vec![])
}

fn fail_schema() -> Value {
    let p = props(json!({
        "Cause": { "type": "string" },
        "Error": { "type": "string" }
    }));
    kind_schema(json!({ "const": "Fail" }), &[], p, None, vec![])
}

fn wait_schema(terminal: Terminal) -> Value {
    let mut p = io_props();
    p.extend(props(json!({
        "Seconds": {
            "anyOf": [
                { "type": "number", "minimum": 0 },
                { "$ref": "#/definitions/literalMarker" }
            ]
        },
        "Timestamp": { "$ref": "#/definitions/timestamp" },
        "SecondsPath": { "$ref": "#/definitions/path" },
        "TimestampPath": { "$ref": "#/definitions/path" }
    })));
    let exactly_one_duration = json!({
        "oneOf": [
            { "required": ["Seconds"] },
            { "required": ["Timestamp"] },
            { "required": ["SecondsPath"] },
            { "required": ["TimestampPath"] }
        ]
    });
    kind_schema(
        json!({ "const": "Wait" }),
        &[],
        p,
        Some(terminal),
        vec![exactly_one_duration],
    )
}

fn action_props() -> Map<String, Value> {
    let mut p = io_props();
    p.extend(props(json!({
        "Parameters": { "type": "object" },
        "ResultSelector": { "type": "object" },
        "ResultPath": { "$ref": "#/definitions/path" },
        "Retry": { "type": "array", "items": { "$ref": "#/definitions/retrier" } },
        "Catch": { "type": "array", "items": { "$ref": "#/definitions/catcher" } }
    })));
    p
}

fn task_schema(terminal: Terminal) -> Value {
    let mut p = action_props();
    p.extend(props(json!({
        "Resource": { "type": "string" },
        "TimeoutSeconds": { "$ref": "#/definitions/seconds" },
        "TimeoutSecondsPath": { "$ref": "#/definitions/path" },
        "HeartbeatSeconds": { "$ref": "#/definitions/seconds" },
        "HeartbeatSecondsPath": { "$ref": "#/definitions/path" }
    })));
    kind_schema(
        json!({ "enum": ["Task", "Interaction"] }),
        &["Resource"],
        p,
        Some(terminal),
        vec![],
    )
}

fn parallel_schema(terminal: Terminal) -> Value {
    let mut p = action_props();
    // Parallel accepts any string as ResultPath.
    p.insert("ResultPath".into(), json!({ "type": "string" }));
    p.insert(
        "Branches".into(),
        json!({
            "type": "array",
            "minItems": 1,
            "items": { "$ref": "#/definitions/stateMachine" }
        }),
    );
    kind_schema(
        json!({ "const": "Parallel" }),
        &["Branches"],
        p,
        Some(terminal),
        vec![],
    )
}

fn map_schema(terminal: Terminal) -> Value {
    let mut p = action_props();
    p.extend(props(json!({
        "Iterator": { "$ref": "#/definitions/stateMachine" },
        "ItemsPath": { "$ref": "#/definitions/path" },
        "MaxConcurrency": { "type": "integer", "minimum": 0 }
    })));
    kind_schema(
        json!({ "const": "Map" }),
        &["Iterator"],
        p,
        Some(terminal),
        vec![],
    )
}

fn choice_schema() -> Value {
    let mut p = io_props();
    p.extend(props(json!({
        "Default": { "$ref": "#/definitions/stateName" },
        "Choices": {
            "type": "array",
            "minItems": 1,
            "items": {
                "anyOf": [
                    { "$ref": "#/definitions/booleanExpression" },
                    { "$ref": "#/definitions/topLevelDataTest" }
                ]
            }
        }
    })));
    kind_schema(json!({ "const": "Choice" }), &["Choices"], p, None, vec![])
}

// =============================================================================
// CHOICE RULES
// =============================================================================

fn operand_schema(operand: Operand) -> Value {
    match operand {
        Operand::String => json!({ "type": "string" }),
        Operand::Number => json!({ "type": "number" }),
        Operand::Boolean => json!({ "type": "boolean" }),
        Operand::Timestamp => json!({ "$ref": "#/definitions/timestamp" }),
        Operand::Path => json!({ "$ref": "#/definitions/path" }),
    }
}

/// `Variable` plus exactly one comparator; the top-level form also needs `Next`.
fn data_test_schema(top_level: bool) -> Value {
    let mut properties = Map::new();
    properties.insert("Variable".into(), json!({ "type": "string" }));
    for (name, operand) in COMPARATORS {
        properties.insert(name.into(), operand_schema(operand));
    }

    let mut required = vec!["Variable"];
    if top_level {
        properties.insert("Next".into(), json!({ "$ref": "#/definitions/stateName" }));
        required.push("Next");
    }

    let exactly_one: Vec<Value> = COMPARATORS
        .iter()
        .map(|(name, _)| json!({ "required": [name] }))
        .collect();

    json!({
        "type": "object",
        "required": required,
        "additionalProperties": false,
        "properties": properties,
        "oneOf": exactly_one,
    })
}

fn boolean_expression_schema() -> Value {
    let nested = json!({
        "type": "array",
        "minItems": 1,
        "items": {
            "anyOf": [
                { "$ref": "#/definitions/dataTest" },
                { "$ref": "#/definitions/nestedNot" }
            ]
        }
    });
    json!({
        "type": "object",
        "required": ["Next"],
        "additionalProperties": false,
        "properties": {
            "Next": { "$ref": "#/definitions/stateName" },
            "Not": { "$ref": "#/definitions/dataTest" },
            "And": nested.clone(),
            "Or": nested
        },
        "oneOf": [
            { "required": ["And"] },
            { "required": ["Or"] },
            { "required": ["Not"] }
        ]
    })
}
