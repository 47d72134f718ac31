//! Decides who receives the next user message.
//!
//! `Fresh` submits inbound text unaddressed; `Addressed(t)` wraps it as a
//! handoff from the user to `t`. After each completed exchange the router
//! addresses whoever produced the last non-terminal message of that exchange.

use hearth_core::engine::ExchangeInput;
use hearth_core::events::TaskResult;
use hearth_core::messages::USER;
use tracing::debug;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum RoutingState {
    #[default]
    Fresh,
    Addressed(String),
}

#[derive(Clone, Debug, Default)]
pub struct SessionRouter {
    state: RoutingState,
}

impl SessionRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore from a persisted routing target.
    pub fn from_target(target: Option<String>) -> Self {
        let state = match target {
            Some(t) if !t.is_empty() => RoutingState::Addressed(t),
            _ => RoutingState::Fresh,
        };
        Self { state }
    }

    pub fn state(&self) -> &RoutingState {
        &self.state
    }

    pub fn target(&self) -> Option<&str> {
        match &self.state {
            RoutingState::Addressed(t) => Some(t),
            RoutingState::Fresh => None,
        }
    }

    pub fn wrap(&self, content: impl Into<String>) -> ExchangeInput {
        let content = content.into();
        match &self.state {
            RoutingState::Addressed(target) => ExchangeInput::Addressed {
                target: target.clone(),
                content,
            },
            RoutingState::Fresh => ExchangeInput::Unaddressed { content },
        }
    }

    /// Apply the outcome of a completed exchange.
    pub fn complete(&mut self, result: &TaskResult) {
        let speaker = result
            .messages
            .iter()
            .rev()
            // Entries from the user are skipped too, so an exchange that
            // produced nothing else leaves the session fresh instead of
            // addressing the user to themselves.
            .find(|m| !m.is_terminal() && m.source() != USER)
            .map(|m| m.source().to_string());

        self.state = match speaker {
            Some(s) => RoutingState::Addressed(s),
            None => RoutingState::Fresh,
        };
        debug!(state = ?self.state, "routing updated");
    }
}
