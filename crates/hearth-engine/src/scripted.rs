//! Deterministic engine driven by pre-programmed exchanges.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream;
use futures::StreamExt;
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

use crate::registry::ToolRegistry;

/// One step of a scripted exchange.
#[derive(Clone, Debug)]
pub enum ScriptStep {
    Say { source: String, content: String },
    Handoff { source: String, target: String, content: String },
    /// Runs a real tool through the registry and emits request + execution events.
    CallTool {
        source: String,
        name: String,
        arguments: serde_json::Value,
    },
    Stop { source: String, content: String },
    /// Waits before the next step; lets tests observe an exchange in flight.
    Pause(Duration),
    /// End the stream here without a completion marker.
    Abandon,
}

impl ScriptStep {
    pub fn say(source: &str, content: &str) -> Self {
        Self::Say {
            source: source.into(),
            content: content.into(),
        }
    }

    pub fn handoff(source: &str, target: &str) -> Self {
        Self::Handoff {
            source: source.into(),
            target: target.into(),
            content: format!("Transferred to {target}."),
        }
    }

    pub fn call(source: &str, name: &str, arguments: serde_json::Value) -> Self {
        Self::CallTool {
            source: source.into(),
            name: name.into(),
            arguments,
        }
    }

    pub fn stop(source: &str, content: &str) -> Self {
        Self::Stop {
            source: source.into(),
            content: content.into(),
        }
    }
}

/// Replays one `Vec<ScriptStep>` per exchange, in order.
pub struct ScriptedEngine {
    exchanges: Mutex<VecDeque<Vec<ScriptStep>>>,
    registry: Arc<ToolRegistry>,
    inputs: Mutex<Vec<ExchangeInput>>,
    completed: AtomicUsize,
    latch: TerminationLatch,
}

impl ScriptedEngine {
    pub fn new(exchanges: Vec<Vec<ScriptStep>>) -> Self {
        Self::with_registry(exchanges, Arc::new(ToolRegistry::new()))
    }

    pub fn with_registry(exchanges: Vec<Vec<ScriptStep>>, registry: Arc<ToolRegistry>) -> Self {
        Self {
            exchanges: Mutex::new(exchanges.into()),
            registry,
            inputs: Mutex::new(Vec::new()),
            completed: AtomicUsize::new(0),
            latch: TerminationLatch::new(),
        }
    }

    /// Every input the engine has been asked to run, in order.
    pub fn inputs(&self) -> Vec<ExchangeInput> {
        self.inputs.lock().clone()
    }

    pub fn completed_exchanges(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    async fn run_step(
        &self,
        step: ScriptStep,
        ctx: &ExchangeContext,
        out: &mut Vec<ChatMessage>,
    ) -> Result<(), EngineError> {
        match step {
            ScriptStep::Say { source, content } => out.push(ChatMessage::text(source, content)),
            ScriptStep::Handoff {
                source,
                target,
                content,
            } => out.push(ChatMessage::handoff(source, target, content)),
            ScriptStep::Stop { source, content } => out.push(ChatMessage::stop(source, content)),
            ScriptStep::CallTool {
                source,
                name,
                arguments,
            } => {
                let call_id = ToolCallId::new();
                out.push(ChatMessage::ToolCallRequestEvent {
                    source: source.clone(),
                    content: vec![ToolCallBlock {
                        id: call_id.clone(),
                        name: name.clone(),
                        arguments: arguments.clone(),
                    }],
                });
                let tool_ctx = ToolContext {
                    session_id: ctx.session_id.clone(),
                    agent: source.clone(),
                    state: Arc::clone(&ctx.state),
                    abort_signal: ctx.cancel.clone(),
                };
                let result = self.registry.execute(&name, arguments, &tool_ctx).await?;
                out.push(ChatMessage::ToolCallExecutionEvent {
                    source,
                    content: vec![ToolCallOutcome {
                        call_id,
                        content: result.content,
                        is_error: result.is_error,
                    }],
                });
            }
            ScriptStep::Pause(delay) => tokio::time::sleep(delay).await,
            ScriptStep::Abandon => {}
        }
        Ok(())
    }
}

fn stop_reason(produced: &[ChatMessage]) -> Option<String> {
    match produced.last()? {
        ChatMessage::StopMessage { content, .. } => Some(content.clone()),
        msg if msg.handoff_target() == Some(USER) => {
            Some(format!("Handoff to user from {} detected.", msg.source()))
        }
        _ => None,
    }
}

#[async_trait]
impl OrchestrationEngine for ScriptedEngine {
    async fn prepare_exchange(&self) {
        self.latch.arm();
    }

    async fn run_exchange(
        &self,
        input: ExchangeInput,
        ctx: ExchangeContext,
    ) -> Result<EventStream, EngineError> {
        self.latch.check()?;
        self.inputs.lock().push(input.clone());

        let steps = self
            .exchanges
            .lock()
            .pop_front()
            .ok_or_else(|| EngineError::Internal("no scripted exchange left".into()))?;

        let mut produced = Vec::new();
        let mut abandoned = false;
        for step in steps {
            if ctx.cancel.is_cancelled() {
                abandoned = true;
                break;
            }
            if matches!(step, ScriptStep::Abandon) {
                abandoned = true;
                break;
            }
            self.run_step(step, &ctx, &mut produced).await?;
        }

        let messages: Vec<ExchangeEvent> = produced
            .iter()
            .cloned()
            .map(ExchangeEvent::Message)
            .collect();
        if abandoned {
            return Ok(stream::iter(messages).boxed());
        }

        self.latch.trip();
        self.completed.fetch_add(1, Ordering::SeqCst);
        let reason = stop_reason(&produced);
        let mut transcript = vec![input.to_message()];
        transcript.extend(produced);
        let completed = ExchangeEvent::Completed(TaskResult {
            messages: transcript,
            stop_reason: reason,
        });
        Ok(stream::iter(messages).chain(stream::once(async move { completed })).boxed())
    }

    async fn save_state(&self) -> Result<serde_json::Value, EngineError> {
        Ok(serde_json::json!({ "completed_exchanges": self.completed_exchanges() }))
    }

    /// Restoring `n` completed exchanges also skips the first `n` scripted
    /// ones, so a reloaded session picks the script up where it left off.
    async fn load_state(&self, state: serde_json::Value) -> Result<(), EngineError> {
        let n = state["completed_exchanges"].as_u64().unwrap_or(0) as usize;
        let mut exchanges = self.exchanges.lock();
        let skip = n.min(exchanges.len());
        exchanges.drain(..skip);
        self.completed.store(n, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out a fresh [`ScriptedEngine`] with the same script on every call
/// and keeps a handle on each one for later inspection.
pub struct ScriptedEngineFactory {
    exchanges: Vec<Vec<ScriptStep>>,
    registry: Arc<ToolRegistry>,
    created: Mutex<Vec<Arc<ScriptedEngine>>>,
}

impl ScriptedEngineFactory {
    pub fn new(exchanges: Vec<Vec<ScriptStep>>, registry: Arc<ToolRegistry>) -> Self {
        Self {
            exchanges,
            registry,
            created: Mutex::new(Vec::new()),
        }
    }

    /// Engines created so far, oldest first.
    pub fn engines(&self) -> Vec<Arc<ScriptedEngine>> {
        self.created.lock().clone()
    }
}

impl EngineFactory for ScriptedEngineFactory {
    fn create(&self, _session_id: &SessionId) -> Arc<dyn OrchestrationEngine> {
        let engine = Arc::new(ScriptedEngine::with_registry(
            self.exchanges.clone(),
            Arc::clone(&self.registry),
        ));
        self.created.lock().push(Arc::clone(&engine));
        engine
    }
}
