//! Offline orchestration engine.
//!
//! Understands `<tool_name> <json arguments>` commands: the agent owning the
//! tool's plugin takes over, runs the tool and hands control back to the
//! user. Anything else gets a help reply from the current speaker. Used by
//! the binary when no model-backed engine is wired in.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream;
use hearth_core::engine::{
    EngineFactory, EventStream, ExchangeContext, ExchangeInput, OrchestrationEngine,
    TerminationLatch,
};
use hearth_core::errors::EngineError;
use hearth_core::events::{ExchangeEvent, TaskResult};
use hearth_core::ids::{SessionId, ToolCallId};
use hearth_core::messages::{ChatMessage, ToolCallBlock, ToolCallOutcome, USER};
use hearth_core::tools::ToolContext;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::agents::{AgentProfile, AgentRoster};
use crate::registry::{ToolRegistry, ToolSource};

#[derive(Debug, Default, Serialize, Deserialize)]
struct CommandEngineState {
    #[serde(default)]
    current_speaker: Option<String>,
}

pub struct CommandEngine {
    registry: Arc<ToolRegistry>,
    roster: AgentRoster,
    agent_tools: HashMap<String, ToolRegistry>,
    current_speaker: Mutex<Option<String>>,
    latch: TerminationLatch,
}

impl CommandEngine {
    pub fn new(registry: Arc<ToolRegistry>, roster: AgentRoster) -> Self {
        let agent_tools = roster
            .names()
            .into_iter()
            .filter_map(|name| roster.get(name))
            .map(|profile| (profile.name.clone(), profile.tools(&registry)))
            .collect();
        Self {
            registry,
            roster,
            agent_tools,
            current_speaker: Mutex::new(None),
            latch: TerminationLatch::new(),
        }
    }

    fn resolve_speaker(&self, input: &ExchangeInput) -> Result<&AgentProfile, EngineError> {
        let wanted = match input.target() {
            Some(target) => Some(target.to_string()),
            None => self.current_speaker.lock().clone(),
        };
        if let Some(name) = wanted {
            if let Some(profile) = self.roster.get(&name) {
                return Ok(profile);
            }
            warn!(agent = %name, "unknown participant, falling back to first agent");
        }
        self.roster
            .first()
            .ok_or_else(|| EngineError::InvalidState("agent roster is empty".into()))
    }

    /// Agents `from` has to transfer through to reach `to`, ending with `to`.
    /// Either a direct handoff or one relay through an agent both may use.
    fn handoff_path<'a>(
        &'a self,
        from: &AgentProfile,
        to: &'a AgentProfile,
    ) -> Option<Vec<&'a AgentProfile>> {
        if from.can_hand_off_to(&to.name) {
            return Some(vec![to]);
        }
        self.roster
            .profiles()
            .iter()
            .find(|relay| from.can_hand_off_to(&relay.name) && relay.can_hand_off_to(&to.name))
            .map(|relay| vec![relay, to])
    }

    fn owner_of(&self, tool: &str) -> Option<&AgentProfile> {
        match self.registry.source(tool)? {
            ToolSource::Plugin(plugin) => self.roster.owner_of_plugin(plugin),
            ToolSource::Custom => None,
        }
    }

    fn help_text(&self, speaker: &AgentProfile) -> String {
        let commands: Vec<String> = self
            .registry
            .definitions()
            .iter()
            .map(|def| format!("{}({})", def.name, def.argument_names().join(", ")))
            .collect();
        format!(
            "{} Commands: {}. Send '<command> <json arguments>', for example \
             'change_state {{\"id\": 1, \"is_on\": true}}'.",
            speaker.description,
            commands.join(", ")
        )
    }
}

fn parse_command(content: &str) -> (&str, &str) {
    let trimmed = content.trim();
    match trimmed.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (trimmed, ""),
    }
}

fn transfer(source: &str, target: &str) -> ChatMessage {
    ChatMessage::handoff(
        source,
        target,
        format!("Transferred to {target}, adopting the role of {target} immediately."),
    )
}

#[async_trait]
impl OrchestrationEngine for CommandEngine {
    async fn prepare_exchange(&self) {
        self.latch.arm();
    }

    async fn run_exchange(
        &self,
        input: ExchangeInput,
        ctx: ExchangeContext,
    ) -> Result<EventStream, EngineError> {
        self.latch.check()?;

        let mut speaker = self.resolve_speaker(&input)?;
        let mut produced: Vec<ChatMessage> = Vec::new();
        let (name, raw_args) = parse_command(input.content());

        if self.registry.contains(name) {
            let args = if raw_args.is_empty() {
                Ok(serde_json::json!({}))
            } else {
                serde_json::from_str::<serde_json::Value>(raw_args)
            };

            match args {
                Ok(args) => 'call: {
                    if let Some(owner) = self.owner_of(name) {
                        if owner.name != speaker.name {
                            let Some(path) = self.handoff_path(speaker, owner) else {
                                warn!(
                                    from = %speaker.name,
                                    to = %owner.name,
                                    tool = name,
                                    "no handoff route"
                                );
                                produced.push(ChatMessage::text(
                                    &speaker.name,
                                    format!("I cannot pass {name} on to {}.", owner.name),
                                ));
                                break 'call;
                            };
                            for next in path {
                                produced.push(transfer(&speaker.name, &next.name));
                                speaker = next;
                            }
                        }
                    }

                    let call_id = ToolCallId::new();
                    produced.push(ChatMessage::ToolCallRequestEvent {
                        source: speaker.name.clone(),
                        content: vec![ToolCallBlock {
                            id: call_id.clone(),
                            name: name.to_string(),
                            arguments: args.clone(),
                        }],
                    });

                    if ctx.cancel.is_cancelled() {
                        debug!(session_id = %ctx.session_id, "exchange cancelled before tool call");
                        let events: Vec<ExchangeEvent> =
                            produced.into_iter().map(ExchangeEvent::Message).collect();
                        return Ok(Box::pin(stream::iter(events)));
                    }

                    let tool_ctx = ToolContext {
                        session_id: ctx.session_id.clone(),
                        agent: speaker.name.clone(),
                        state: Arc::clone(&ctx.state),
                        abort_signal: ctx.cancel.clone(),
                    };
                    let outcome = match self.agent_tools.get(&speaker.name) {
                        Some(tools) => tools.execute(name, args, &tool_ctx).await,
                        None => self.registry.execute(name, args, &tool_ctx).await,
                    };
                    let (content, is_error) = match outcome {
                        Ok(result) => (result.content, result.is_error),
                        Err(e) => (e.to_string(), true),
                    };

                    produced.push(ChatMessage::ToolCallExecutionEvent {
                        source: speaker.name.clone(),
                        content: vec![ToolCallOutcome {
                            call_id,
                            content: content.clone(),
                            is_error,
                        }],
                    });
                    produced.push(ChatMessage::text(&speaker.name, content));
                }
                Err(e) => {
                    produced.push(ChatMessage::text(
                        &speaker.name,
                        format!("Arguments for {name} must be JSON: {e}."),
                    ));
                }
            }
        } else {
            produced.push(ChatMessage::text(&speaker.name, self.help_text(speaker)));
        }

        produced.push(transfer(&speaker.name, USER));
        let stop_reason = format!("Handoff to user from {} detected.", speaker.name);
        *self.current_speaker.lock() = Some(speaker.name.clone());
        self.latch.trip();

        let mut messages = Vec::with_capacity(produced.len() + 1);
        messages.push(input.to_message());
        messages.extend(produced.iter().cloned());

        let mut events: Vec<ExchangeEvent> =
            produced.into_iter().map(ExchangeEvent::Message).collect();
        events.push(ExchangeEvent::Completed(TaskResult {
            messages,
            stop_reason: Some(stop_reason),
        }));
        Ok(Box::pin(stream::iter(events)))
    }

    async fn save_state(&self) -> Result<serde_json::Value, EngineError> {
        let state = CommandEngineState {
            current_speaker: self.current_speaker.lock().clone(),
        };
        serde_json::to_value(state).map_err(|e| EngineError::Internal(e.to_string()))
    }

    async fn load_state(&self, state: serde_json::Value) -> Result<(), EngineError> {
        let state: CommandEngineState = if state.is_null() {
            CommandEngineState::default()
        } else {
            serde_json::from_value(state).map_err(|e| EngineError::InvalidState(e.to_string()))?
        };
        *self.current_speaker.lock() = state.current_speaker;
        Ok(())
    }
}

/// Builds a [`CommandEngine`] per session over a shared tool registry.
pub struct CommandEngineFactory {
    registry: Arc<ToolRegistry>,
    roster: AgentRoster,
}

impl CommandEngineFactory {
    pub fn new(registry: Arc<ToolRegistry>, roster: AgentRoster) -> Self {
        Self { registry, roster }
    }
}

impl EngineFactory for CommandEngineFactory {
    fn create(&self, session_id: &SessionId) -> Arc<dyn OrchestrationEngine> {
        debug!(%session_id, "creating command engine");
        Arc::new(CommandEngine::new(
            Arc::clone(&self.registry),
            self.roster.clone(),
        ))
    }
}
