//! Lowering phase: PlaybookDocument → compiled state map.
//!
//! Decorators are expanded first; the transformer then walks the top-level
//! states with the resulting context and recurses into Parallel branches and
//! Map iterators with an empty one.

pub mod decorators;
pub mod policy;
pub mod resolve;

use tracing::{debug, warn};

use crate::defaults::CompilerDefaults;
use crate::error::CompilerError;
use crate::parse::types::*;

pub use decorators::{DecoratorContext, ExpandedStates, expand_decorators};
pub use resolve::{Identity, NameResolver};

/// Lower a validated document into the compiled top-level state map
/// (without bootstrap states).
pub fn lower(doc: &PlaybookDocument, defaults: &CompilerDefaults) -> Result<StateMap, CompilerError> {
    let expanded = expand_decorators(doc, defaults)?;
    let transformer = Transformer::new(defaults, Identity);
    let states = transformer.transform_states(&expanded.states, &expanded.context);
    debug!(playbook = %doc.name, states = states.len(), "lowered states");
    Ok(states)
}

/// Kind-directed rewriting of source states into compiled states.
pub struct Transformer<'a, R: NameResolver> {
    defaults: &'a CompilerDefaults,
    resolver: R,
}

impl<'a, R: NameResolver> Transformer<'a, R> {
    pub fn new(defaults: &'a CompilerDefaults, resolver: R) -> Self {
        Transformer { defaults, resolver }
    }

    /// Transform every state of one scope, in declaration order. Synthesized
    /// merge helpers follow their Parallel state.
    pub fn transform_states(&self, states: &StateMap, ctx: &DecoratorContext<'_>) -> StateMap {
        let mut out = StateMap::with_capacity(states.len());
        for (name, node) in states {
            debug!(state = %name, kind = node.kind(), "lowering state");
            self.transform_state(name, node, ctx, &mut out);
        }
        out
    }

    /// A nested scope: decorators never carry over.
    pub fn transform_machine(&self, machine: &StateMachine) -> StateMachine {
        StateMachine {
            comment: machine.comment.clone(),
            start_at: self.resolver.resolve(&machine.start_at),
            states: self.transform_states(&machine.states, &DecoratorContext::default()),
            extra: machine.extra.clone(),
        }
    }

    fn transform_state(
        &self,
        name: &str,
        node: &StateNode,
        ctx: &DecoratorContext<'_>,
        out: &mut StateMap,
    ) {
        let lowered = match node {
            StateNode::Pass(s) => StateNode::Pass(PassState {
                next: self.resolve_opt(&s.next),
                ..s.clone()
            }),
            StateNode::Wait(s) => StateNode::Wait(WaitState {
                next: self.resolve_opt(&s.next),
                ..s.clone()
            }),
            StateNode::Succeed(_) | StateNode::Fail(_) => node.clone(),
            StateNode::Choice(s) => StateNode::Choice(self.lower_choice(s)),
            StateNode::Task(s) => {
                let mut task = self.lower_task_common(name, s, ctx);
                if let Some(parameters) = task.parameters.take() {
                    task.parameters = Some(policy::task_envelope(name, Some(parameters)));
                }
                StateNode::Task(task)
            }
            StateNode::Interaction(s) => {
                let mut task = self.lower_task_common(name, s, ctx);
                task.parameters = Some(policy::interaction_envelope(
                    name,
                    task.parameters.take(),
                    &task.resource,
                ));
                task.resource = self.defaults.token_wait_resource.clone();
                StateNode::Task(task)
            }
            StateNode::Parallel(s) => {
                self.lower_parallel(name, s, ctx, out);
                return;
            }
            StateNode::Map(s) => StateNode::Map(MapState {
                iterator: self.transform_machine(&s.iterator),
                catch: self.resolve_catch(&s.catch),
                next: self.resolve_opt(&s.next),
                ..s.clone()
            }),
        };
        out.insert(name.to_string(), lowered);
    }

    fn lower_choice(&self, choice: &ChoiceState) -> ChoiceState {
        ChoiceState {
            choices: choice
                .choices
                .iter()
                .map(|rule| ChoiceRule {
                    condition: rule.condition.clone(),
                    next: self.resolver.resolve(&rule.next),
                })
                .collect(),
            default: self.resolve_opt(&choice.default),
            ..choice.clone()
        }
    }

    /// Everything Task and Interaction share: resolved references, merged
    /// retriers and the injected failure catcher.
    fn lower_task_common(&self, name: &str, task: &TaskState, ctx: &DecoratorContext<'_>) -> TaskState {
        let mut catch = self.resolve_catch(&task.catch);
        if self.injects_failure_catch(name, ctx) {
            catch = policy::append_catch(catch, policy::failure_catch(name, self.defaults));
        }

        TaskState {
            next: self.resolve_opt(&task.next),
            retry: policy::merge_retry(
                task.retry.as_deref(),
                ctx.default_retry_disabled(name),
                &self.defaults.default_retry,
            ),
            catch,
            ..task.clone()
        }
    }

    fn lower_parallel(
        &self,
        name: &str,
        parallel: &ParallelState,
        ctx: &DecoratorContext<'_>,
        out: &mut StateMap,
    ) {
        let helper_name = policy::merge_helper_name(name, self.defaults);
        let inject = self.injects_failure_catch(name, ctx);

        let helper_next = match parallel.end {
            Some(true) => None,
            _ => self.resolve_opt(&parallel.next),
        };
        let helper = policy::merge_helper(
            &helper_name,
            helper_next,
            ctx.default_retry_disabled(name),
            inject,
            self.defaults,
        );

        let mut catch = self.resolve_catch(&parallel.catch);
        if inject {
            catch = policy::append_catch(catch, policy::failure_catch(name, self.defaults));
        }

        let lowered = ParallelState {
            branches: parallel
                .branches
                .iter()
                .map(|branch| self.transform_machine(branch))
                .collect(),
            catch,
            next: Some(helper_name.clone()),
            end: None,
            ..parallel.clone()
        };

        out.insert(name.to_string(), StateNode::Parallel(lowered));
        if out.contains_key(&helper_name) {
            warn!(
                state = %name,
                helper = %helper_name,
                "merge helper replaces a state with the same name"
            );
        }
        out.insert(helper_name, StateNode::Task(helper));
    }

    fn injects_failure_catch(&self, name: &str, ctx: &DecoratorContext<'_>) -> bool {
        ctx.failure_handler && name != self.defaults.failure_handler.handler
    }

    fn resolve_opt(&self, name: &Option<String>) -> Option<String> {
        name.as_deref().map(|n| self.resolver.resolve(n))
    }

    fn resolve_catch(&self, catch: &Option<Vec<Catcher>>) -> Option<Vec<Catcher>> {
        catch.as_ref().map(|catchers| {
            catchers
                .iter()
                .map(|c| Catcher {
                    next: self.resolver.resolve(&c.next),
                    ..c.clone()
                })
                .collect()
        })
    }
}
