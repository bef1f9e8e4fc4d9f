//! petgraph-based directed graph of state references within one scope.
//!
//! A scope is the top-level state map, a Parallel branch, or a Map iterator.
//! References never cross scopes, so each scope gets its own graph.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use super::types::{StateMap, StateNode};
use crate::error::ValidationError;

/// How one state refers to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Next,
    Choice,
    Default,
    Catch,
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transition::Next => write!(f, "Next"),
            Transition::Choice => write!(f, "Choices[].Next"),
            Transition::Default => write!(f, "Default"),
            Transition::Catch => write!(f, "Catch[].Next"),
        }
    }
}

pub struct ScopeGraph {
    pub graph: DiGraph<String, Transition>,
    pub node_indices: HashMap<String, NodeIndex>,
    pub start: NodeIndex,
}

impl ScopeGraph {
    /// Build the graph for one scope. `scope_path` is the JSON pointer of the
    /// scope's `States` object and is used to locate errors.
    pub fn build(
        start_at: &str,
        states: &StateMap,
        scope_path: &str,
    ) -> Result<Self, Vec<ValidationError>> {
        let mut graph = DiGraph::new();
        let mut node_indices = HashMap::new();
        let mut errors = Vec::new();

        for name in states.keys() {
            let idx = graph.add_node(name.clone());
            node_indices.insert(name.clone(), idx);
        }

        let start = node_indices.get(start_at).copied();
        if start.is_none() {
            errors.push(ValidationError::rule(
                format!("StartAt references unknown state '{}'", start_at),
                Some(parent_path(scope_path)),
            ));
        }

        for (name, node) in states {
            let Some(&from) = node_indices.get(name) else {
                continue;
            };
            for (target, transition) in references(node) {
                match node_indices.get(target) {
                    Some(&to) => {
                        graph.add_edge(from, to, transition);
                    }
                    None => errors.push(ValidationError::rule(
                        format!(
                            "State '{}' {} references unknown state '{}'",
                            name, transition, target
                        ),
                        Some(format!("{}/{}", scope_path, name)),
                    )),
                }
            }
        }

        match start {
            Some(start) if errors.is_empty() => Ok(ScopeGraph {
                graph,
                node_indices,
                start,
            }),
            _ => Err(errors),
        }
    }

    pub fn successors(&self, name: &str) -> Vec<(&str, Transition)> {
        let Some(&idx) = self.node_indices.get(name) else {
            return vec![];
        };
        self.graph
            .edges_directed(idx, petgraph::Direction::Outgoing)
            .map(|edge| (self.graph[edge.target()].as_str(), *edge.weight()))
            .collect()
    }

    pub fn start_name(&self) -> &str {
        &self.graph[self.start]
    }
}

/// Every same-scope reference a state makes, in declaration order.
pub fn references(node: &StateNode) -> Vec<(&str, Transition)> {
    let mut refs = Vec::new();

    if let Some(next) = node.next() {
        refs.push((next, Transition::Next));
    }

    if let StateNode::Choice(choice) = node {
        for rule in &choice.choices {
            refs.push((rule.next.as_str(), Transition::Choice));
        }
        if let Some(default) = &choice.default {
            refs.push((default.as_str(), Transition::Default));
        }
    }

    for catcher in node.catchers() {
        refs.push((catcher.next.as_str(), Transition::Catch));
    }

    refs
}

fn parent_path(scope_path: &str) -> String {
    scope_path
        .strip_suffix("/States")
        .unwrap_or(scope_path)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn states(value: serde_json::Value) -> StateMap {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn builds_edges_for_every_reference_kind() {
        let map = states(json!({
            "Pick": {
                "Type": "Choice",
                "Choices": [{ "Variable": "$.x", "BooleanEquals": true, "Next": "Work" }],
                "Default": "Done"
            },
            "Work": {
                "Type": "Task",
                "Resource": "arn:work",
                "Catch": [{ "ErrorEquals": ["States.ALL"], "Next": "Done" }],
                "Next": "Done"
            },
            "Done": { "Type": "Succeed" }
        }));
        let graph = ScopeGraph::build("Pick", &map, "/States").unwrap();
        assert_eq!(graph.start_name(), "Pick");
        assert_eq!(graph.successors("Pick").len(), 2);

        let work = graph.successors("Work");
        assert!(work.contains(&("Done", Transition::Next)));
        assert!(work.contains(&("Done", Transition::Catch)));
        assert!(graph.successors("Done").is_empty());
    }

    #[test]
    fn reports_every_dangling_reference() {
        let map = states(json!({
            "A": { "Type": "Pass", "Next": "Missing" },
            "B": {
                "Type": "Choice",
                "Choices": [{ "Variable": "$.x", "IsPresent": true, "Next": "Gone" }]
            }
        }));
        let errors = ScopeGraph::build("Nowhere", &map, "/States").err().unwrap();
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[0].path.as_deref(), Some(""));
        assert!(errors[1].message.contains("'Missing'"));
        assert_eq!(errors[2].path.as_deref(), Some("/States/B"));
    }
}
