//! End-to-end tests: playbook text in, deployment manifest out.

#[allow(dead_code)]
mod helpers;

use helpers::*;
use playbook_compiler::parse::types::StateNode;
use playbook_compiler::{CompileOptions, Compiler, CompilerDefaults, compile_json, compile_yaml};

#[test]
fn minimal_two_state_playbook() {
    let output = compile(include_str!("fixtures/hello_world.json"));
    let states = &output.document.states;

    assert_eq!(states.len(), 5);
    let StateNode::Pass(a) = &states["A"] else {
        panic!("expected Pass");
    };
    assert_eq!(a.next.as_deref(), Some("B"));
    assert_eq!(a.result, Some(serde_json::json!({ "x": 1 })));
    assert!(matches!(states["B"], StateNode::Succeed(_)));

    let keys: Vec<&String> = output.manifest.resources.keys().collect();
    assert_eq!(keys, vec!["P"]);
    assert!(output.manifest.outputs.contains_key("P"));
}

#[test]
fn yaml_input_compiles_like_json() {
    let yaml = r#"
Playbook: P
Comment: c
StartAt: A
States:
  A:
    Type: Pass
    Result:
      x: 1
    Next: B
  B:
    Type: Succeed
"#;
    let from_yaml = compile_yaml(yaml, &CompileOptions::default()).unwrap();
    let from_json = compile_json(include_str!("fixtures/hello_world.json"), &CompileOptions::default()).unwrap();
    assert_eq!(from_yaml.definition, from_json.definition);
    assert_eq!(from_yaml.manifest, from_json.manifest);
}

#[test]
fn invalid_playbook_yields_no_output() {
    let err = compile_json(
        include_str!("fixtures/missing_top_level_keys.json"),
        &CompileOptions::default(),
    )
    .unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");
    assert!(err.validation_errors().len() >= 4);
    assert!(err.to_string().contains("error(s)"));
}

#[test]
fn duplicate_names_abort_compilation() {
    let err = compile_json(include_str!("fixtures/duplicate_states.json"), &CompileOptions::default())
        .unwrap_err();
    let errors = err.validation_errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("Work, Check"));
}

#[test]
fn compilation_is_deterministic() {
    let json = include_str!("fixtures/task_failure_handler.json");
    let first = compile(json);
    let second = compile(json);
    assert_eq!(first.definition, second.definition);
    assert_eq!(first.manifest.to_json().unwrap(), second.manifest.to_json().unwrap());
}

#[test]
fn custom_defaults_flow_through() {
    let defaults = CompilerDefaults {
        merge_helper_prefix: "join_".into(),
        token_wait_resource: "arn:custom:wait".into(),
        ..CompilerDefaults::default()
    };
    let compiler = Compiler::with_defaults(CompileOptions::default(), defaults).unwrap();
    let output = compiler
        .compile_json(include_str!("fixtures/investigate_login.json"))
        .unwrap();
    let states = &output.document.states;

    assert!(states.contains_key("join_gather_context"));
    assert_eq!(task(states, "Ask_User").resource, "arn:custom:wait");
}

#[test]
fn compiler_validate_matches_free_function() {
    let compiler = Compiler::new(CompileOptions::default()).unwrap();
    for fixture in [
        include_str!("fixtures/hello_world.json"),
        include_str!("fixtures/duplicate_states.json"),
        include_str!("fixtures/missing_top_level_keys.json"),
    ] {
        let value = parse_value(fixture);
        assert_eq!(
            compiler.validate(&value),
            playbook_compiler::validate_playbook(&value)
        );
    }
}

#[test]
fn every_interaction_and_task_is_a_task() {
    let output = compile(include_str!("fixtures/investigate_login.json"));
    let definition = definition_value(&output);
    for (name, state) in definition["States"].as_object().unwrap() {
        assert_ne!(state["Type"], "Interaction", "{} kept the Interaction kind", name);
    }
}

#[test]
fn whole_number_floats_compile_as_integers() {
    let value = serde_json::json!({
        "Playbook": "Floats",
        "Comment": "c",
        "StartAt": "Call",
        "States": {
            "Call": {
                "Type": "Task",
                "Resource": "arn:call",
                "TimeoutSeconds": 60.0,
                "Retry": [{ "ErrorEquals": ["E"], "IntervalSeconds": 2.0, "MaxAttempts": 3.0 }],
                "Next": "Each"
            },
            "Each": {
                "Type": "Map",
                "MaxConcurrency": 4.0,
                "Iterator": {
                    "StartAt": "Leaf",
                    "States": { "Leaf": { "Type": "Succeed" } }
                },
                "End": true
            }
        }
    });
    assert!(playbook_compiler::validate_playbook(&value).is_valid);

    let output = compile(&value.to_string());
    let call = task(&output.document.states, "Call");
    assert_eq!(call.timeout_seconds, Some(60));
    let retry = call.retry.as_ref().unwrap();
    assert_eq!(retry[0].interval_seconds, Some(2));
    assert_eq!(retry[0].max_attempts, Some(3));

    let definition = definition_value(&output);
    assert_eq!(definition["States"]["Call"]["TimeoutSeconds"], serde_json::json!(60));
    assert_eq!(definition["States"]["Each"]["MaxConcurrency"], serde_json::json!(4));
}

#[test]
fn fractional_counts_are_schema_errors_with_a_path() {
    let value = serde_json::json!({
        "Playbook": "Fractions",
        "Comment": "c",
        "StartAt": "Call",
        "States": {
            "Call": {
                "Type": "Task",
                "Resource": "arn:call",
                "Retry": [{ "ErrorEquals": ["E"], "IntervalSeconds": 2.5 }],
                "End": true
            }
        }
    });
    let result = playbook_compiler::validate_playbook(&value);
    assert!(!result.is_valid);
    assert!(result.errors.iter().all(|e| e.path.is_some()), "{:#?}", result.errors);
}
