//! Deep-copy DTOs returned by every public engine operation. Constructed inside the
//! registry's lock scope and detached from live state before the lock is released.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::model::{ChatMessage, GameInfo, Participant, Question, Room};
use super::types::{AnswerStatus, Role, RoomStatus, Team};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantSnapshot {
    pub participant_id: String,
    pub name: String,
    pub role: Role,
    pub team: Option<Team>,
    pub joined_at: DateTime<Utc>,
}

impl From<&Participant> for ParticipantSnapshot {
    fn from(p: &Participant) -> Self {
        Self {
            participant_id: p.participant_id.as_str().to_owned(),
            name: p.name.clone(),
            role: p.role,
            team: p.team,
            joined_at: p.joined_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSnapshot {
    pub question_id: String,
    pub text: String,
    pub options: [String; 4],
    pub correct_option: u8,
    pub team: Team,
    pub answered: bool,
    pub selected_option: Option<u8>,
    pub answer_status: Option<AnswerStatus>,
}

impl From<&Question> for QuestionSnapshot {
    fn from(q: &Question) -> Self {
        Self {
            question_id: q.question_id.clone(),
            text: q.text.clone(),
            options: q.options.clone(),
            correct_option: q.correct_option,
            team: q.team,
            answered: q.answered,
            selected_option: q.selected_option,
            answer_status: q.answer_status,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameInfoSnapshot {
    pub status: RoomStatus,
    pub active_team: Team,
    pub active_question_index: usize,
    pub counter: u32,
    pub scores_red: u32,
    pub scores_blue: u32,
    pub questions: Vec<QuestionSnapshot>,
}

impl From<&GameInfo> for GameInfoSnapshot {
    fn from(g: &GameInfo) -> Self {
        Self {
            status: g.status,
            active_team: g.active_team,
            active_question_index: g.active_question_index,
            counter: g.counter,
            scores_red: g.scores_red,
            scores_blue: g.scores_blue,
            questions: g.questions.iter().map(QuestionSnapshot::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageSnapshot {
    pub message_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub author_name: String,
    pub command: Option<Team>,
}

impl From<&ChatMessage> for ChatMessageSnapshot {
    fn from(m: &ChatMessage) -> Self {
        Self {
            message_id: m.message_id.clone(),
            text: m.text.clone(),
            created_at: m.created_at,
            author_name: m.author_name.clone(),
            command: m.command,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub pin: String,
    pub topic: String,
    pub questions_per_team: u8,
    pub max_participants: u8,
    pub timer_seconds: u32,
    pub status: RoomStatus,
    pub created_at: DateTime<Utc>,
    pub participants: Vec<ParticipantSnapshot>,
    pub messages: Vec<ChatMessageSnapshot>,
    pub game_info: Option<GameInfoSnapshot>,
}

impl From<&Room> for RoomSnapshot {
    fn from(r: &Room) -> Self {
        Self {
            pin: r.pin.as_str().to_owned(),
            topic: r.topic.clone(),
            questions_per_team: r.questions_per_team,
            max_participants: r.max_participants,
            timer_seconds: r.timer_seconds,
            status: r.status,
            created_at: r.created_at,
            participants: r.participants.iter().map(ParticipantSnapshot::from).collect(),
            messages: r.messages.iter().map(ChatMessageSnapshot::from).collect(),
            game_info: r.game_info.as_ref().map(GameInfoSnapshot::from),
        }
    }
}
