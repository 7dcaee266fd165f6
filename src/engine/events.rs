//! Outbound event vocabulary emitted by the engine, and the broadcast-target
//! envelope used to carry them out of a locked operation for later delivery.
//!
//! Every public registry/room operation returns its snapshot plus a `Vec<PendingBroadcast>`.
//! Broadcasts are sent only after the caller has released the room lock (see `registry.rs`).

use serde::Serialize;

use super::snapshot::{ChatMessageSnapshot, GameInfoSnapshot, ParticipantSnapshot, QuestionSnapshot, RoomSnapshot};
use super::types::{AnswerStatus, Pin, SocketId};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GamePreparingPayload {
    pub preparing: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub questions_per_team: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub enum ServerEvent {
    RoomCreated(RoomSnapshot),
    RoomJoined(RoomSnapshot),
    PlayerJoined(ParticipantSnapshot),
    UserLeft(ParticipantSnapshot),
    HostChanged(ParticipantSnapshot),
    Message(ChatMessageSnapshot),
    GamePreparing(GamePreparingPayload),
    GameStarted(GameInfoSnapshot),
    NewQuestion(QuestionSnapshot),
    NextQuestion(QuestionSnapshot),
    CheckAnswer(AnswerStatus),
    TimerTick { counter: u32 },
    TimerEnd { counter: u32 },
    GameFinished,
    Error { detail: String },
}

impl ServerEvent {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::RoomCreated(_) => "room_created",
            Self::RoomJoined(_) => "room_joined",
            Self::PlayerJoined(_) => "player_joined",
            Self::UserLeft(_) => "user_left",
            Self::HostChanged(_) => "host_changed",
            Self::Message(_) => "message",
            Self::GamePreparing(_) => "game_preparing",
            Self::GameStarted(_) => "game_started",
            Self::NewQuestion(_) => "new_question",
            Self::NextQuestion(_) => "next_question",
            Self::CheckAnswer(_) => "check_answer",
            Self::TimerTick { .. } => "timer_tick",
            Self::TimerEnd { .. } => "timer_end",
            Self::GameFinished => "game_finished",
            Self::Error { .. } => "error",
        }
    }
}

/// Envelope matching the wire shape `{"type": ..., "data": ...}` used for both
/// socket broadcasts and the outbound half of the WebSocket protocol.
impl Serialize for ServerEvent {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut out = serializer.serialize_struct("ServerEvent", 2)?;
        out.serialize_field("type", self.type_name())?;
        match self {
            Self::RoomCreated(s) | Self::RoomJoined(s) => out.serialize_field("data", s)?,
            Self::PlayerJoined(s) | Self::UserLeft(s) | Self::HostChanged(s) => {
                out.serialize_field("data", s)?
            }
            Self::Message(s) => out.serialize_field("data", s)?,
            Self::GamePreparing(s) => out.serialize_field("data", s)?,
            Self::GameStarted(s) => out.serialize_field("data", s)?,
            Self::NewQuestion(s) | Self::NextQuestion(s) => out.serialize_field("data", s)?,
            Self::CheckAnswer(status) => {
                let word = match status {
                    AnswerStatus::Correct => "correct",
                    AnswerStatus::Incorrect => "incorrect",
                };
                out.serialize_field("data", word)?
            }
            Self::TimerTick { counter } | Self::TimerEnd { counter } => {
                out.serialize_field("data", &serde_json::json!({ "counter": counter }))?
            }
            Self::GameFinished => out.serialize_field("data", "finished")?,
            Self::Error { detail } => {
                out.serialize_field("data", &serde_json::json!({ "detail": detail }))?
            }
        }
        out.end()
    }
}

#[derive(Debug, Clone)]
pub enum BroadcastTarget {
    /// Every socket currently bound to `pin`, optionally excluding one (the actor's own socket).
    Room { pin: Pin, skip: Option<SocketId> },
    /// A single socket, used for `room_created`/`room_joined`/`error`.
    Socket(SocketId),
}

#[derive(Debug, Clone)]
pub struct PendingBroadcast {
    pub target: BroadcastTarget,
    pub event: ServerEvent,
}

impl PendingBroadcast {
    pub fn to_room(pin: Pin, event: ServerEvent) -> Self {
        Self {
            target: BroadcastTarget::Room { pin, skip: None },
            event,
        }
    }

    pub fn to_room_except(pin: Pin, skip: SocketId, event: ServerEvent) -> Self {
        Self {
            target: BroadcastTarget::Room {
                pin,
                skip: Some(skip),
            },
            event,
        }
    }

    pub fn to_socket(sid: SocketId, event: ServerEvent) -> Self {
        Self {
            target: BroadcastTarget::Socket(sid),
            event,
        }
    }
}
