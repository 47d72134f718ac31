use std::sync::Arc;

use futures::StreamExt;
use hearth_core::engine::{ExchangeContext, OrchestrationEngine};
use hearth_core::events::{ExchangeEvent, TaskResult};
use hearth_core::ids::SessionId;
use hearth_core::messages::ChatMessage;
use hearth_core::state::{DomainState, SharedDomainState};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::error::SessionError;
use crate::router::SessionRouter;
use crate::snapshot::SessionSnapshot;

/// One conversation: routing state, transcript, plugin state and the engine
/// that runs its exchanges.
pub struct AgentSession {
    id: SessionId,
    engine: Arc<dyn OrchestrationEngine>,
    router: SessionRouter,
    transcript: Vec<ChatMessage>,
    state: SharedDomainState,
}

impl AgentSession {
    pub fn new(id: SessionId, engine: Arc<dyn OrchestrationEngine>) -> Self {
        Self {
            id,
            engine,
            router: SessionRouter::new(),
            transcript: Vec::new(),
            state: DomainState::default().into_shared(),
        }
    }

    /// Rebuild a session from its snapshot, handing the engine its own blob.
    pub async fn restore(
        id: SessionId,
        engine: Arc<dyn OrchestrationEngine>,
        snapshot: SessionSnapshot,
    ) -> Result<Self, SessionError> {
        let state = snapshot.domain_state().into_shared();
        engine.load_state(snapshot.team).await?;
        Ok(Self {
            id,
            engine,
            router: SessionRouter::from_target(snapshot.routing_target),
            transcript: snapshot.messages,
            state,
        })
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let team = self.engine.save_state().await?;
        let state = self.state.lock().await.clone();
        Ok(SessionSnapshot {
            team,
            messages: self.transcript.clone(),
            lights: state.lights,
            meals: state.meals,
            routing_target: self.router.target().map(str::to_string),
            ready_time: state.ready_time,
        })
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn router(&self) -> &SessionRouter {
        &self.router
    }

    pub fn state(&self) -> &SharedDomainState {
        &self.state
    }

    /// Run one exchange for `content`.
    ///
    /// `on_event` sees the inbound message first, then every produced message
    /// and finally the completion. Transcript and routing are only updated
    /// once the completion arrives; a stream that ends early leaves both
    /// untouched.
    #[instrument(skip_all, fields(session_id = %self.id))]
    pub async fn run<F>(
        &mut self,
        content: &str,
        cancel: CancellationToken,
        mut on_event: F,
    ) -> Result<TaskResult, SessionError>
    where
        F: FnMut(&ExchangeEvent),
    {
        let input = self.router.wrap(content);
        let inbound = input.to_message();
        on_event(&ExchangeEvent::Message(inbound.clone()));

        self.engine.prepare_exchange().await;
        let ctx = ExchangeContext {
            session_id: self.id.clone(),
            state: Arc::clone(&self.state),
            cancel: cancel.clone(),
        };
        let mut stream = self.engine.run_exchange(input, ctx).await?;

        let mut produced = vec![inbound];
        while let Some(event) = stream.next().await {
            match event {
                ExchangeEvent::Message(msg) => {
                    on_event(&ExchangeEvent::Message(msg.clone()));
                    produced.push(msg);
                }
                ExchangeEvent::Completed(result) => {
                    self.router.complete(&result);
                    self.transcript.extend(produced);
                    info!(
                        messages = self.transcript.len(),
                        routing_target = ?self.router.target(),
                        "exchange completed"
                    );
                    on_event(&ExchangeEvent::Completed(result.clone()));
                    return Ok(result);
                }
            }
        }

        if cancel.is_cancelled() {
            warn!("exchange cancelled");
            Err(SessionError::Cancelled)
        } else {
            warn!("engine stream ended without completion");
            Err(SessionError::IncompleteExchange)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_core::engine::ExchangeInput;
    use hearth_core::meals::DishCatalog;
    use hearth_core::messages::USER;
    use hearth_engine::{create_default_registry, ScriptStep, ScriptedEngine};

    fn registry() -> Arc<hearth_engine::ToolRegistry> {
        Arc::new(create_default_registry(Arc::new(DishCatalog::builtin())))
    }

    #[tokio::test]
    async fn exchange_updates_transcript_and_routing() {
        let engine = Arc::new(ScriptedEngine::with_registry(
            vec![vec![
                ScriptStep::handoff("triage_agent", "lights_agent"),
                ScriptStep::call("lights_agent", "change_state", serde_json::json!({"id": 2, "is_on": true})),
                ScriptStep::say("lights_agent", "The porch light is on."),
                ScriptStep::handoff("lights_agent", USER),
            ]],
            registry(),
        ));
        let mut session = AgentSession::new(SessionId::new(), engine.clone());

        let mut seen = Vec::new();
        let result = session
            .run("turn on the porch light", CancellationToken::new(), |e| {
                seen.push(e.clone())
            })
            .await
            .unwrap();

        assert_eq!(seen.len(), 7);
        assert!(matches!(&seen[0], ExchangeEvent::Message(m) if m.source() == USER));
        assert!(seen.last().unwrap().is_terminal());
        assert_eq!(result.messages.len(), 6);
        assert_eq!(session.transcript().len(), 6);
        assert_eq!(session.router().target(), Some("lights_agent"));
        assert!(session.state().lock().await.lights.get(2).unwrap().is_on);
    }

    #[tokio::test]
    async fn next_message_is_addressed_to_last_speaker() {
        let engine = Arc::new(ScriptedEngine::new(vec![
            vec![
                ScriptStep::say("meals_agent", "Fresh or frozen?"),
                ScriptStep::handoff("meals_agent", USER),
            ],
            vec![ScriptStep::handoff("meals_agent", USER)],
        ]));
        let mut session = AgentSession::new(SessionId::new(), engine.clone());
        session.run("add lasagne", CancellationToken::new(), |_| {}).await.unwrap();
        session.run("frozen", CancellationToken::new(), |_| {}).await.unwrap();

        assert_eq!(
            engine.inputs(),
            vec![
                ExchangeInput::Unaddressed {
                    content: "add lasagne".into()
                },
                ExchangeInput::Addressed {
                    target: "meals_agent".into(),
                    content: "frozen".into()
                },
            ]
        );
        assert_eq!(
            session.transcript()[3],
            ChatMessage::handoff(USER, "meals_agent", "frozen")
        );
    }

    #[tokio::test]
    async fn every_exchange_is_rearmed() {
        let engine = Arc::new(ScriptedEngine::new(vec![
            vec![ScriptStep::stop("MaxMessageTermination", "limit")],
            vec![ScriptStep::stop("MaxMessageTermination", "limit")],
            vec![ScriptStep::stop("MaxMessageTermination", "limit")],
        ]));
        let mut session = AgentSession::new(SessionId::new(), engine.clone());
        for text in ["one", "two", "three"] {
            session.run(text, CancellationToken::new(), |_| {}).await.unwrap();
        }
        assert_eq!(engine.completed_exchanges(), 3);
    }

    #[tokio::test]
    async fn incomplete_exchange_commits_nothing() {
        let engine = Arc::new(ScriptedEngine::new(vec![vec![
            ScriptStep::say("triage_agent", "partial"),
            ScriptStep::Abandon,
        ]]));
        let mut session = AgentSession::new(SessionId::new(), engine);
        let err = session
            .run("hi", CancellationToken::new(), |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::IncompleteExchange));
        assert!(session.transcript().is_empty());
        assert_eq!(session.router().target(), None);
    }

    #[tokio::test]
    async fn cancelled_exchange_is_reported() {
        let engine = Arc::new(ScriptedEngine::new(vec![vec![ScriptStep::say("a", "b")]]));
        let mut session = AgentSession::new(SessionId::new(), engine);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = session.run("hi", cancel, |_| {}).await.unwrap_err();
        assert!(matches!(err, SessionError::Cancelled));
    }

    #[tokio::test]
    async fn snapshot_restore_round_trip() {
        let engine = Arc::new(ScriptedEngine::with_registry(
            vec![vec![
                ScriptStep::call("meals_agent", "add_dish", serde_json::json!({"name": "Soup"})),
                ScriptStep::call("meals_agent", "set_time_to_be_ready", serde_json::json!({"time": "2024-06-01T18:00"})),
                ScriptStep::handoff("meals_agent", USER),
            ]],
            registry(),
        ));
        let id = SessionId::new();
        let mut session = AgentSession::new(id.clone(), engine);
        session.run("add soup for six", CancellationToken::new(), |_| {}).await.unwrap();
        let snapshot = session.snapshot().await.unwrap();
        assert_eq!(snapshot.team, serde_json::json!({"completed_exchanges": 1}));

        let fresh_engine = Arc::new(ScriptedEngine::new(vec![]));
        let restored = AgentSession::restore(id, fresh_engine.clone(), snapshot.clone())
            .await
            .unwrap();
        assert_eq!(fresh_engine.completed_exchanges(), 1);
        assert_eq!(restored.transcript(), snapshot.messages.as_slice());
        assert_eq!(restored.router().target(), Some("meals_agent"));
        let state = restored.state().lock().await;
        assert_eq!(state.meals.len(), 1);
        assert!(state.ready_time.is_some());
    }
}
