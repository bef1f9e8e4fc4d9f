//! Decorator expansion: splices the failure subgraph into a working copy of
//! the top-level state map and derives the context the transformer runs with.

use std::borrow::Cow;

use tracing::{debug, warn};

use super::policy;
use crate::defaults::CompilerDefaults;
use crate::error::CompilerError;
use crate::parse::types::{DisableDefaultRetry, PlaybookDocument, StateMap};

/// Decorator flags for one scope. Nested scopes always start from
/// `DecoratorContext::default()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecoratorContext<'a> {
    /// Inject the failure catcher into Task, Interaction and Parallel states.
    pub failure_handler: bool,
    pub disable_default_retry: Option<&'a DisableDefaultRetry>,
}

impl DecoratorContext<'_> {
    pub fn default_retry_disabled(&self, state_name: &str) -> bool {
        self.disable_default_retry
            .is_some_and(|disable| disable.disables(state_name))
    }
}

/// Top-level states with decorators applied. The caller's document is never
/// modified; the state map is only copied when a decorator adds states.
pub struct ExpandedStates<'a> {
    pub states: Cow<'a, StateMap>,
    pub context: DecoratorContext<'a>,
}

pub fn expand_decorators<'a>(
    doc: &'a PlaybookDocument,
    defaults: &CompilerDefaults,
) -> Result<ExpandedStates<'a>, CompilerError> {
    let Some(decorators) = &doc.decorators else {
        return Ok(ExpandedStates {
            states: Cow::Borrowed(&doc.states),
            context: DecoratorContext::default(),
        });
    };

    if let Some(tasks) = decorators
        .disable_default_retry
        .as_ref()
        .and_then(|d| d.tasks.as_ref())
    {
        for name in tasks.iter().filter(|name| !doc.states.contains_key(*name)) {
            warn!(
                playbook = %doc.name,
                state = %name,
                "DisableDefaultRetry names a state that is not in the top-level scope"
            );
        }
    }

    let mut context = DecoratorContext {
        failure_handler: false,
        disable_default_retry: decorators.disable_default_retry.as_ref(),
    };

    let states = match &decorators.task_failure_handler {
        Some(handler) => {
            let subgraph = policy::failure_subgraph(handler, defaults)?;
            debug!(
                playbook = %doc.name,
                kind = handler.kind(),
                "splicing failure handler into top-level states"
            );
            let mut states = doc.states.clone();
            states.extend(subgraph);
            context.failure_handler = true;
            Cow::Owned(states)
        }
        None => Cow::Borrowed(&doc.states),
    };

    Ok(ExpandedStates { states, context })
}
