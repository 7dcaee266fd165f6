//! Orchestrates the Room Engine, Question Provider, Timer Supervisor, Event
//! Dispatcher, Session Registry and Persistence Adapter into the operations the
//! HTTP and WebSocket edges call. Neither edge talks to the engine directly.

use std::sync::Arc;

use crate::dispatch::EventDispatcher;
use crate::engine::registry::DraftQuestion;
use crate::engine::{EngineError, ParticipantId, PendingBroadcast, Pin, RoomRegistry, RoomSnapshot, SocketId};
use crate::metrics::Metrics;
use crate::persistence::PersistenceAdapter;
use crate::question_provider::{GenerationSource, QuestionProvider};
use crate::session::SessionRegistry;
use crate::engine::Role;
use crate::engine::timer::TimerSupervisor;

pub struct GameService {
    pub registry: Arc<RoomRegistry>,
    pub dispatcher: Arc<EventDispatcher>,
    pub timers: Arc<TimerSupervisor>,
    pub sessions: Arc<SessionRegistry>,
    pub persistence: Arc<PersistenceAdapter>,
    pub questions: Arc<QuestionProvider>,
    pub metrics: Arc<Metrics>,
}

impl GameService {
    async fn persist(&self) {
        self.persistence.save_rooms(&self.registry).await;
        self.persistence.save_sessions(&self.sessions).await;
    }

    pub async fn create_room(
        &self,
        host_name: String,
        topic: String,
        questions_per_team: u8,
        max_participants: u8,
        timer_seconds: u32,
    ) -> Result<(RoomSnapshot, String, String), EngineError> {
        let (room, host_id) = self
            .registry
            .create_room(host_name.clone(), topic, questions_per_team, max_participants, timer_seconds)
            .await?;
        self.metrics.rooms_created.increment();

        let pin = Pin::normalize(&room.pin);
        let participant_id = ParticipantId::from_raw(host_id.clone());
        let session_id = self
            .sessions
            .create(&pin, &participant_id, host_name, crate::engine::Role::Host);
        self.persist().await;
        Ok((room, host_id, session_id))
    }

    pub async fn join_room(
        &self,
        pin: &Pin,
        name: String,
    ) -> Result<(RoomSnapshot, String, String), EngineError> {
        let (room, participant_id, broadcasts) = self.registry.join_room(pin, name.clone()).await?;
        self.dispatcher.dispatch(broadcasts).await;

        let pid = ParticipantId::from_raw(participant_id.clone());
        let session_id = self.sessions.create(pin, &pid, name, Role::Participant);
        self.persist().await;
        Ok((room, participant_id, session_id))
    }

    pub async fn get_room(&self, pin: &Pin) -> Result<RoomSnapshot, EngineError> {
        self.registry.get_room(pin).await
    }

    pub async fn check_pin(&self, pin: &Pin) -> bool {
        self.registry.check_pin(pin).await
    }

    /// Orchestrates `startGame`: announces `game_preparing{true}`, calls the question
    /// provider with no room lock held, then applies the transition and announces
    /// `game_preparing{false}` plus the resulting broadcasts.
    pub async fn start_game(
        &self,
        pin: &Pin,
        requested_by: &ParticipantId,
    ) -> Result<(RoomSnapshot, String, Option<String>), EngineError> {
        let (topic, per_team) = self.registry.precheck_start(pin, requested_by).await?;

        self.dispatcher
            .dispatch(vec![crate::engine::registry::GamePreparingAnnouncement::preparing(
                pin.clone(),
                &topic,
                per_team,
            )])
            .await;

        let generation = self.questions.generate(&topic, per_team).await;
        match generation.source {
            GenerationSource::Ai => self.metrics.provider_successes.increment(),
            GenerationSource::Fallback => self.metrics.provider_fallbacks.increment(),
        }

        let drafts: Vec<DraftQuestion> = generation.questions;
        let result = self.registry.apply_start_game(pin, requested_by, drafts).await;

        let source = generation.source.as_str().to_owned();
        let announcement = match &result {
            Ok(_) => crate::engine::registry::GamePreparingAnnouncement::ready(
                pin.clone(),
                &source,
                generation.reason.clone(),
            ),
            Err(err) => crate::engine::registry::GamePreparingAnnouncement::failed(pin.clone(), err.to_string()),
        };
        self.dispatcher.dispatch(vec![announcement]).await;

        let (snapshot, broadcasts) = result?;
        self.dispatcher.dispatch(broadcasts).await;
        self.metrics.rooms_active.increment();
        self.timers.restart(pin.clone()).await;
        self.persist().await;
        Ok((snapshot, source, generation.reason))
    }

    pub async fn submit_answer(
        &self,
        pin: &Pin,
        participant_id: &ParticipantId,
        option_index: u8,
    ) -> Result<RoomSnapshot, EngineError> {
        let (snapshot, broadcasts, finished) = self
            .registry
            .submit_answer(pin, participant_id, option_index)
            .await?;
        self.metrics.answers_submitted.increment();
        self.dispatcher.dispatch(broadcasts).await;

        if finished {
            self.timers.cancel(pin).await;
        } else {
            self.timers.restart(pin.clone()).await;
        }
        self.persist().await;
        Ok(snapshot)
    }

    pub async fn add_message(
        &self,
        pin: &Pin,
        participant_id: &ParticipantId,
        text: String,
    ) -> Result<RoomSnapshot, EngineError> {
        let (snapshot, broadcasts) = self.registry.add_message(pin, participant_id, text).await?;
        self.dispatcher.dispatch(broadcasts).await;
        self.persist().await;
        Ok(snapshot)
    }

    /// Leaves a room, equivalent whether driven by an explicit `leave_room` call or
    /// a transport disconnect. Tears down the room's timer when it empties.
    pub async fn leave_room(
        &self,
        pin: &Pin,
        participant_id: &ParticipantId,
    ) -> Result<Option<RoomSnapshot>, EngineError> {
        let (snapshot, broadcasts) = self.registry.leave_room(pin, participant_id).await?;
        self.dispatcher.dispatch(broadcasts).await;

        if snapshot.is_none() {
            self.timers.cancel(pin).await;
        }
        self.persist().await;
        Ok(snapshot)
    }

    /// Binds a freshly-upgraded socket to `(pin, participant_id)` and returns the
    /// receiving half of its outbound channel for the caller to forward.
    pub async fn bind_socket(
        &self,
        pin: &Pin,
        participant_id: &ParticipantId,
        sid: SocketId,
    ) -> tokio::sync::mpsc::Receiver<Arc<crate::engine::ServerEvent>> {
        self.registry.bind_socket(pin, participant_id, sid).await;
        self.dispatcher.register(sid, pin.clone()).await
    }

    /// Transport disconnect: equivalent to `leaveRoom`, per the socket binder's spec.
    pub async fn unbind_socket(&self, sid: SocketId) -> Option<(Pin, ParticipantId, Option<RoomSnapshot>)> {
        let (pin, participant_id) = self.registry.get_bound(&sid).await?;
        self.dispatcher.unregister(sid, Some(pin.clone())).await;
        let snapshot = self.leave_room(&pin, &participant_id).await.ok()?;
        Some((pin, participant_id, snapshot))
    }

    pub async fn dispatch_direct(&self, broadcasts: Vec<PendingBroadcast>) {
        self.dispatcher.dispatch(broadcasts).await;
    }
}
