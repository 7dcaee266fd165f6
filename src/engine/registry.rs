//! The Room Registry (C1), Room State Machine (C2) and Socket Binder (C3).
//!
//! A single `tokio::sync::Mutex<RegistryInner>` guards the PIN map and every Room it
//! contains. Every public method acquires the lock exactly once, mutates, builds a
//! deep-copy snapshot, and returns it together with the broadcasts the caller must
//! send after releasing the lock. No method here performs I/O.

use std::collections::HashMap;

use chrono::Utc;
use rand::seq::SliceRandom;
use rand::Rng;
use tokio::sync::Mutex;

use super::errors::EngineError;
use super::events::{GamePreparingPayload, PendingBroadcast, ServerEvent};
use super::model::{ChatMessage, GameInfo, Participant, Question, Room};
use super::room_codes;
use super::snapshot::{ParticipantSnapshot, RoomSnapshot};
use super::types::{ParticipantId, Pin, Role, RoomStatus, SocketId, Team};

/// A validated, provider-agnostic question ready to be tagged with a team and inserted.
#[derive(Debug, Clone)]
pub struct DraftQuestion {
    pub text: String,
    pub options: [String; 4],
    pub correct_option: u8,
}

struct RegistryInner {
    rooms: HashMap<Pin, Room>,
    sid_index: HashMap<SocketId, (Pin, ParticipantId)>,
}

pub struct RoomRegistry {
    inner: Mutex<RegistryInner>,
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RegistryInner {
                rooms: HashMap::new(),
                sid_index: HashMap::new(),
            }),
        }
    }

    /// Rebuilds the registry from persisted rooms (see `persistence.rs`). Socket
    /// bindings are never persisted, so the sid index starts empty and every
    /// participant's `socket_id` must already be `None` in `rooms`.
    pub async fn restore(&self, rooms: Vec<Room>) {
        let mut guard = self.inner.lock().await;
        guard.rooms = rooms.into_iter().map(|r| (r.pin.clone(), r)).collect();
        guard.sid_index.clear();
    }

    pub async fn snapshot_all(&self) -> Vec<Room> {
        let guard = self.inner.lock().await;
        guard.rooms.values().cloned().collect()
    }

    pub async fn create_room(
        &self,
        host_name: String,
        topic: String,
        questions_per_team: u8,
        max_participants: u8,
        timer_seconds: u32,
    ) -> Result<(RoomSnapshot, String), EngineError> {
        let mut guard = self.inner.lock().await;
        let pin = room_codes::allocate(|candidate| guard.rooms.contains_key(candidate))
            .ok_or(EngineError::PinExhausted)?;

        let host_id = ParticipantId::new();
        let host = Participant {
            participant_id: host_id.clone(),
            name: host_name,
            role: Role::Host,
            team: None,
            joined_at: Utc::now(),
            socket_id: None,
        };

        let room = Room {
            pin: pin.clone(),
            topic,
            questions_per_team,
            max_participants,
            timer_seconds,
            status: RoomStatus::Waiting,
            created_at: Utc::now(),
            participants: vec![host],
            messages: Vec::new(),
            game_info: None,
        };

        let snapshot = RoomSnapshot::from(&room);
        guard.rooms.insert(pin, room);
        Ok((snapshot, host_id.as_str().to_owned()))
    }

    pub async fn get_room(&self, pin: &Pin) -> Result<RoomSnapshot, EngineError> {
        let guard = self.inner.lock().await;
        guard
            .rooms
            .get(pin)
            .map(RoomSnapshot::from)
            .ok_or(EngineError::RoomNotFound)
    }

    pub async fn check_pin(&self, pin: &Pin) -> bool {
        let guard = self.inner.lock().await;
        guard.rooms.contains_key(pin)
    }

    pub async fn list_rooms(&self) -> Vec<RoomSnapshot> {
        let guard = self.inner.lock().await;
        guard.rooms.values().map(RoomSnapshot::from).collect()
    }

    /// Removes a room outright along with every socket binding into it, regardless of
    /// its current status. Used by maintenance sweeps rather than the ordinary
    /// participant-driven `leave_room` path.
    pub async fn delete_room(&self, pin: &Pin) -> Result<RoomSnapshot, EngineError> {
        let mut guard = self.inner.lock().await;
        let room = guard.rooms.remove(pin).ok_or(EngineError::RoomNotFound)?;
        let snapshot = RoomSnapshot::from(&room);
        guard.sid_index.retain(|_, (room_pin, _)| room_pin != pin);
        Ok(snapshot)
    }

    pub async fn join_room(
        &self,
        pin: &Pin,
        name: String,
    ) -> Result<(RoomSnapshot, String, Vec<PendingBroadcast>), EngineError> {
        let mut guard = self.inner.lock().await;
        let room = guard.rooms.get_mut(pin).ok_or(EngineError::RoomNotFound)?;

        if room.status != RoomStatus::Waiting {
            return Err(EngineError::StateClosed);
        }
        if room.participants.len() >= room.max_participants as usize {
            return Err(EngineError::CapacityExceeded);
        }
        if room.name_taken(&name) {
            return Err(EngineError::NameTaken);
        }

        let participant_id = ParticipantId::new();
        let participant = Participant {
            participant_id: participant_id.clone(),
            name,
            role: Role::Participant,
            team: None,
            joined_at: Utc::now(),
            socket_id: None,
        };
        room.participants.push(participant);

        let joined = ParticipantSnapshot::from(room.participants.last().unwrap());
        let snapshot = RoomSnapshot::from(&*room);
        let broadcasts = vec![PendingBroadcast::to_room(
            pin.clone(),
            ServerEvent::PlayerJoined(joined),
        )];
        Ok((snapshot, participant_id.as_str().to_owned(), broadcasts))
    }

    /// Removes a participant. Equivalent semantics are used both for an explicit
    /// `leave_room` call and for `unbind_socket` on transport disconnect.
    pub async fn leave_room(
        &self,
        pin: &Pin,
        participant_id: &ParticipantId,
    ) -> Result<(Option<RoomSnapshot>, Vec<PendingBroadcast>), EngineError> {
        let mut guard = self.inner.lock().await;
        let room = guard.rooms.get_mut(pin).ok_or(EngineError::RoomNotFound)?;

        let idx = room
            .participants
            .iter()
            .position(|p| &p.participant_id == participant_id)
            .ok_or(EngineError::RoomNotFound)?;
        let removed = room.participants.remove(idx);
        if let Some(sid) = removed.socket_id {
            guard.sid_index.remove(&sid);
        }

        let mut broadcasts = vec![PendingBroadcast::to_room(
            pin.clone(),
            ServerEvent::UserLeft(ParticipantSnapshot::from(&removed)),
        )];

        let room = guard.rooms.get_mut(pin).ok_or(EngineError::RoomNotFound)?;
        if removed.role == Role::Host {
            if let Some(new_host) = room.participants.first_mut() {
                new_host.role = Role::Host;
                broadcasts.push(PendingBroadcast::to_room(
                    pin.clone(),
                    ServerEvent::HostChanged(ParticipantSnapshot::from(&*new_host)),
                ));
            }
        }

        if room.participants.is_empty() {
            guard.rooms.remove(pin);
            return Ok((None, broadcasts));
        }

        let snapshot = RoomSnapshot::from(guard.rooms.get(pin).unwrap());
        Ok((Some(snapshot), broadcasts))
    }

    pub async fn bind_socket(&self, pin: &Pin, participant_id: &ParticipantId, sid: SocketId) {
        let mut guard = self.inner.lock().await;
        if let Some(room) = guard.rooms.get_mut(pin) {
            if let Some(participant) = room.find_participant_mut(participant_id) {
                if let Some(old_sid) = participant.socket_id.replace(sid) {
                    guard.sid_index.remove(&old_sid);
                }
            }
        }
        guard
            .sid_index
            .insert(sid, (pin.clone(), participant_id.clone()));
    }

    pub async fn get_bound(&self, sid: &SocketId) -> Option<(Pin, ParticipantId)> {
        let guard = self.inner.lock().await;
        guard.sid_index.get(sid).cloned()
    }

    /// Reads just enough to let the caller decide whether to invoke the question
    /// provider at all, without holding the lock across that external call.
    pub async fn precheck_start(
        &self,
        pin: &Pin,
        requested_by: &ParticipantId,
    ) -> Result<(String, u8), EngineError> {
        let guard = self.inner.lock().await;
        let room = guard.rooms.get(pin).ok_or(EngineError::RoomNotFound)?;
        let requester = room
            .find_participant(requested_by)
            .ok_or(EngineError::AccessDenied)?;
        if requester.role != Role::Host {
            return Err(EngineError::AccessDenied);
        }
        if room.status != RoomStatus::Waiting {
            return Err(EngineError::StateClosed);
        }
        if room.participants.len() < 2 {
            return Err(EngineError::StateClosed);
        }
        Ok((room.topic.clone(), room.questions_per_team))
    }

    /// Re-validates preconditions after the (possibly slow) provider call and, if
    /// still valid, applies the WAITING → ACTIVE transition.
    pub async fn apply_start_game(
        &self,
        pin: &Pin,
        requested_by: &ParticipantId,
        questions: Vec<DraftQuestion>,
    ) -> Result<(RoomSnapshot, Vec<PendingBroadcast>), EngineError> {
        let mut guard = self.inner.lock().await;
        let room = guard.rooms.get_mut(pin).ok_or(EngineError::RoomNotFound)?;

        let requester = room
            .find_participant(requested_by)
            .ok_or(EngineError::AccessDenied)?;
        if requester.role != Role::Host {
            return Err(EngineError::AccessDenied);
        }
        if room.status != RoomStatus::Waiting {
            return Err(EngineError::StateClosed);
        }
        if room.participants.len() < 2 {
            return Err(EngineError::StateClosed);
        }
        let needed = 2 * room.questions_per_team as usize;
        if questions.len() < needed {
            return Err(EngineError::StateClosed);
        }

        let mut rng = rand::rng();
        let starting_team = if rng.random_bool(0.5) {
            Team::Red
        } else {
            Team::Blue
        };
        room.participants.shuffle(&mut rng);
        for (i, participant) in room.participants.iter_mut().enumerate() {
            participant.team = Some(if i % 2 == 0 {
                starting_team
            } else {
                starting_team.opposite()
            });
        }

        let built_questions: Vec<Question> = questions
            .into_iter()
            .take(needed)
            .enumerate()
            .map(|(i, draft)| Question {
                question_id: uuid::Uuid::new_v4().to_string(),
                text: draft.text,
                options: draft.options,
                correct_option: draft.correct_option,
                team: if i % 2 == 0 { Team::Red } else { Team::Blue },
                answered: false,
                selected_option: None,
                answer_status: None,
            })
            .collect();

        let active_team = built_questions[0].team;
        room.status = RoomStatus::Active;
        room.game_info = Some(GameInfo {
            status: RoomStatus::Active,
            active_team,
            active_question_index: 0,
            counter: room.timer_seconds,
            scores_red: 0,
            scores_blue: 0,
            questions: built_questions,
        });

        let snapshot = RoomSnapshot::from(&*room);
        let game_info = room.game_info.as_ref().unwrap();
        let broadcasts = vec![
            PendingBroadcast::to_room(
                pin.clone(),
                ServerEvent::GameStarted((game_info).into()),
            ),
            PendingBroadcast::to_room(
                pin.clone(),
                ServerEvent::NewQuestion(game_info.current_question().into()),
            ),
            PendingBroadcast::to_room(
                pin.clone(),
                ServerEvent::NextQuestion(game_info.current_question().into()),
            ),
        ];
        Ok((snapshot, broadcasts))
    }

    pub async fn submit_answer(
        &self,
        pin: &Pin,
        participant_id: &ParticipantId,
        option_index: u8,
    ) -> Result<(RoomSnapshot, Vec<PendingBroadcast>, bool), EngineError> {
        let mut guard = self.inner.lock().await;
        let room = guard.rooms.get_mut(pin).ok_or(EngineError::RoomNotFound)?;

        if room.status != RoomStatus::Active {
            return Err(EngineError::GameNotActive);
        }
        let team = room
            .find_participant(participant_id)
            .ok_or(EngineError::RoomNotFound)?
            .team;
        let game_info = room.game_info.as_mut().ok_or(EngineError::GameNotActive)?;
        if team != Some(game_info.active_team) {
            return Err(EngineError::WrongTurn);
        }
        if game_info.current_question().answered {
            return Err(EngineError::AlreadyAnswered);
        }

        let correct = option_index == game_info.current_question().correct_option;
        let active_team = game_info.active_team;
        {
            let question = game_info.current_question_mut();
            question.answered = true;
            question.selected_option = Some(option_index);
            question.answer_status = Some(if correct {
                super::types::AnswerStatus::Correct
            } else {
                super::types::AnswerStatus::Incorrect
            });
        }
        if correct {
            *game_info.score_mut(active_team) += 1;
        }

        let mut broadcasts = vec![PendingBroadcast::to_room(
            pin.clone(),
            ServerEvent::CheckAnswer(if correct {
                super::types::AnswerStatus::Correct
            } else {
                super::types::AnswerStatus::Incorrect
            }),
        )];
        let finished = advance_locked(room, pin, &mut broadcasts);
        let snapshot = RoomSnapshot::from(&*room);
        Ok((snapshot, broadcasts, finished))
    }

    pub async fn handle_timer_end(
        &self,
        pin: &Pin,
    ) -> Result<(RoomSnapshot, Vec<PendingBroadcast>, bool), EngineError> {
        let mut guard = self.inner.lock().await;
        let room = guard.rooms.get_mut(pin).ok_or(EngineError::RoomNotFound)?;

        if room.status != RoomStatus::Active {
            return Err(EngineError::GameNotActive);
        }
        {
            let game_info = room.game_info.as_mut().ok_or(EngineError::GameNotActive)?;
            if !game_info.current_question().answered {
                let question = game_info.current_question_mut();
                question.answered = true;
                question.answer_status = Some(super::types::AnswerStatus::Incorrect);
            }
        }

        let mut broadcasts = Vec::new();
        let finished = advance_locked(room, pin, &mut broadcasts);
        let snapshot = RoomSnapshot::from(&*room);
        Ok((snapshot, broadcasts, finished))
    }

    /// Decrements the active room's timer counter by one, floored at zero.
    pub async fn tick_timer(&self, pin: &Pin) -> Result<(RoomSnapshot, u32), EngineError> {
        let mut guard = self.inner.lock().await;
        let room = guard.rooms.get_mut(pin).ok_or(EngineError::RoomNotFound)?;
        if room.status != RoomStatus::Active {
            return Err(EngineError::GameNotActive);
        }
        let game_info = room.game_info.as_mut().ok_or(EngineError::GameNotActive)?;
        game_info.counter = game_info.counter.saturating_sub(1);
        let counter = game_info.counter;
        let snapshot = RoomSnapshot::from(&*room);
        Ok((snapshot, counter))
    }

    pub async fn add_message(
        &self,
        pin: &Pin,
        participant_id: &ParticipantId,
        text: String,
    ) -> Result<(RoomSnapshot, Vec<PendingBroadcast>), EngineError> {
        let mut guard = self.inner.lock().await;
        let room = guard.rooms.get_mut(pin).ok_or(EngineError::RoomNotFound)?;
        let participant = room
            .find_participant(participant_id)
            .ok_or(EngineError::RoomNotFound)?;

        let message = ChatMessage {
            message_id: uuid::Uuid::new_v4().to_string(),
            text,
            created_at: Utc::now(),
            author_name: participant.name.clone(),
            command: participant.team,
        };
        room.messages.push(message);

        let snapshot_msg = super::snapshot::ChatMessageSnapshot::from(room.messages.last().unwrap());
        let snapshot = RoomSnapshot::from(&*room);
        let broadcasts = vec![PendingBroadcast::to_room(
            pin.clone(),
            ServerEvent::Message(snapshot_msg),
        )];
        Ok((snapshot, broadcasts))
    }
}

/// Shared tail of `submitAnswer`/`handleTimerEnd`: advances to the next question or
/// finishes the game. Must be called while still holding the room lock.
fn advance_locked(room: &mut Room, pin: &Pin, broadcasts: &mut Vec<PendingBroadcast>) -> bool {
    let game_info = room.game_info.as_mut().expect("active room has game_info");
    if game_info.active_question_index + 1 == game_info.questions.len() {
        game_info.status = RoomStatus::Finished;
        room.status = RoomStatus::Finished;
        broadcasts.push(PendingBroadcast::to_room(pin.clone(), ServerEvent::GameFinished));
        true
    } else {
        game_info.active_question_index += 1;
        game_info.active_team = game_info.current_question().team;
        game_info.counter = room.timer_seconds;
        let question = game_info.current_question();
        broadcasts.push(PendingBroadcast::to_room(
            pin.clone(),
            ServerEvent::NewQuestion(question.into()),
        ));
        broadcasts.push(PendingBroadcast::to_room(
            pin.clone(),
            ServerEvent::NextQuestion(question.into()),
        ));
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[tokio::test]
    async fn join_beyond_capacity_is_rejected() {
        let registry = RoomRegistry::new();
        let (room, _host_id) = registry
            .create_room("Alice".into(), "geography".into(), 5, 2, 30)
            .await
            .unwrap();
        let pin = Pin::normalize(&room.pin);
        registry.join_room(&pin, "Bob".into()).await.unwrap();

        let err = registry.join_room(&pin, "Carol".into()).await.unwrap_err();
        assert_eq!(err, EngineError::CapacityExceeded);
    }

    #[tokio::test]
    async fn duplicate_name_is_rejected() {
        let registry = RoomRegistry::new();
        let (room, _host_id) = registry
            .create_room("Alice".into(), "geography".into(), 5, 10, 30)
            .await
            .unwrap();
        let pin = Pin::normalize(&room.pin);

        let err = registry.join_room(&pin, "Alice".into()).await.unwrap_err();
        assert_eq!(err, EngineError::NameTaken);
    }

    #[tokio::test]
    async fn snapshot_mutation_never_touches_registry_state() {
        let registry = RoomRegistry::new();
        let (room, _host_id) = registry
            .create_room("Alice".into(), "geography".into(), 5, 10, 30)
            .await
            .unwrap();
        let pin = Pin::normalize(&room.pin);

        let mut snapshot = registry.get_room(&pin).await.unwrap();
        snapshot.topic.push_str(" (edited)");
        snapshot.participants.clear();

        let fresh = registry.get_room(&pin).await.unwrap();
        assert_eq!(fresh.topic, "geography");
        assert_eq!(fresh.participants.len(), 1);
    }

    #[tokio::test]
    async fn delete_room_removes_it_and_its_socket_bindings() {
        let registry = RoomRegistry::new();
        let (room, host_id) = registry
            .create_room("Alice".into(), "geography".into(), 5, 10, 30)
            .await
            .unwrap();
        let pin = Pin::normalize(&room.pin);
        let sid = uuid::Uuid::new_v4();
        registry
            .bind_socket(&pin, &ParticipantId::from_raw(host_id), sid)
            .await;

        let deleted = registry.delete_room(&pin).await.unwrap();
        assert_eq!(deleted.pin, pin.as_str());
        assert!(registry.get_room(&pin).await.is_err());
        assert!(registry.get_bound(&sid).await.is_none());
    }

    #[tokio::test]
    async fn deleting_an_unknown_room_is_not_found() {
        let registry = RoomRegistry::new();
        let err = registry.delete_room(&Pin::normalize("ZZZZZZ")).await.unwrap_err();
        assert_eq!(err, EngineError::RoomNotFound);
    }

    #[tokio::test]
    async fn concurrent_room_creation_never_collides_pins() {
        let registry = Arc::new(RoomRegistry::new());
        let attempts = 32;
        let mut handles = Vec::with_capacity(attempts);
        for i in 0..attempts {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                registry
                    .create_room(format!("Host{i}"), "science".into(), 5, 10, 30)
                    .await
                    .unwrap()
                    .0
                    .pin
            }));
        }

        let mut pins = HashSet::new();
        for handle in handles {
            pins.insert(handle.await.unwrap());
        }
        assert_eq!(pins.len(), attempts, "every concurrently created room must get a unique pin");
    }
}

/// Wraps `precheck_start`/`apply_start_game` with the `game_preparing` broadcast pair,
/// matching the original gateway's preparing→started sequence. The question generation
/// closure runs with no room lock held.
pub struct GamePreparingAnnouncement;

impl GamePreparingAnnouncement {
    pub fn preparing(pin: Pin, topic: &str, questions_per_team: u8) -> PendingBroadcast {
        PendingBroadcast::to_room(
            pin,
            ServerEvent::GamePreparing(GamePreparingPayload {
                preparing: true,
                topic: Some(topic.to_owned()),
                questions_per_team: Some(questions_per_team),
                source: None,
                message: None,
                error: None,
            }),
        )
    }

    pub fn ready(pin: Pin, source: &str, message: Option<String>) -> PendingBroadcast {
        PendingBroadcast::to_room(
            pin,
            ServerEvent::GamePreparing(GamePreparingPayload {
                preparing: false,
                topic: None,
                questions_per_team: None,
                source: Some(source.to_owned()),
                message,
                error: None,
            }),
        )
    }

    /// Announces that the prepared questions could not be applied (the room was
    /// re-validated after generation and was no longer eligible to start).
    pub fn failed(pin: Pin, error: String) -> PendingBroadcast {
        PendingBroadcast::to_room(
            pin,
            ServerEvent::GamePreparing(GamePreparingPayload {
                preparing: false,
                topic: None,
                questions_per_team: None,
                source: None,
                message: None,
                error: Some(error),
            }),
        )
    }
}
