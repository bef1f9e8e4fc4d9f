//! Integration tests for the Parse phase: JSON/YAML reading, typed documents, scope graphs.

#[allow(dead_code)]
mod helpers;

use playbook_compiler::parse::{self, ScopeGraph, StateNode};

#[test]
fn parse_fixture_to_document() {
    let value = parse::parse_json(include_str!("fixtures/investigate_login.json")).expect("Should parse");
    let doc = parse::to_document(&value).expect("Should convert");
    assert_eq!(doc.name, "InvestigateLogin");
    assert_eq!(doc.start_at, "Enrich_Ip");
    assert_eq!(doc.states.len(), 6);
    assert_eq!(doc.extra.get("Version").and_then(|v| v.as_str()), Some("1.0"));
    assert!(doc.decorators.is_none());
}

#[test]
fn state_order_follows_declaration() {
    let value = parse::parse_json(include_str!("fixtures/investigate_login.json")).unwrap();
    let doc = parse::to_document(&value).unwrap();
    assert_eq!(
        helpers::state_names(&doc.states),
        vec![
            "Enrich_Ip",
            "Is_Known_Location",
            "Ask_User",
            "Gather_Context",
            "Lookup_Failed",
            "Done"
        ]
    );
}

#[test]
fn interaction_keeps_its_kind_until_lowering() {
    let value = parse::parse_json(include_str!("fixtures/investigate_login.json")).unwrap();
    let doc = parse::to_document(&value).unwrap();
    let ask = &doc.states["Ask_User"];
    assert_eq!(ask.kind(), "Interaction");
    assert!(matches!(ask, StateNode::Interaction(t) if t.timeout_seconds == Some(3600)));
}

#[test]
fn yaml_and_json_give_same_document() {
    let json = parse::parse_json(include_str!("fixtures/hello_world.json")).unwrap();
    let yaml = parse::parse_yaml(
        r#"
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
"#,
    )
    .unwrap();
    assert_eq!(json, yaml);
    assert_eq!(parse::to_document(&json).unwrap(), parse::to_document(&yaml).unwrap());
}

#[test]
fn parse_invalid_json_returns_error() {
    let err = parse::parse_json("not valid json").unwrap_err();
    assert_eq!(err.code(), "PARSE_ERROR");
}

#[test]
fn scope_graph_from_fixture() {
    let value = parse::parse_json(include_str!("fixtures/investigate_login.json")).unwrap();
    let doc = parse::to_document(&value).unwrap();
    let graph = ScopeGraph::build(&doc.start_at, &doc.states, "/States").expect("Should build graph");
    assert_eq!(graph.node_indices.len(), 6);
    assert_eq!(graph.start_name(), "Enrich_Ip");
    // Next + one catcher
    assert_eq!(graph.successors("Enrich_Ip").len(), 2);
    // two rules + Default
    assert_eq!(graph.successors("Is_Known_Location").len(), 3);
    assert!(graph.successors("Done").is_empty());
}

#[test]
fn nested_machines_are_exposed() {
    let value = parse::parse_json(include_str!("fixtures/investigate_login.json")).unwrap();
    let doc = parse::to_document(&value).unwrap();
    let branches = doc.states["Gather_Context"].nested_machines();
    assert_eq!(branches.len(), 2);
    assert_eq!(branches[1].start_at, "Pause");
    assert!(doc.states["Done"].nested_machines().is_empty());
}
