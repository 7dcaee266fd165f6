//! Live, registry-owned room state. Never exposed outside this module by reference —
//! callers only ever see [`crate::engine::snapshot`] DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::{AnswerStatus, ParticipantId, Pin, Role, RoomStatus, SocketId, Team};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub participant_id: ParticipantId,
    pub name: String,
    pub role: Role,
    pub team: Option<Team>,
    pub joined_at: DateTime<Utc>,
    pub socket_id: Option<SocketId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub question_id: String,
    pub text: String,
    pub options: [String; 4],
    pub correct_option: u8,
    pub team: Team,
    pub answered: bool,
    pub selected_option: Option<u8>,
    pub answer_status: Option<AnswerStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameInfo {
    pub status: RoomStatus,
    pub active_team: Team,
    pub active_question_index: usize,
    pub counter: u32,
    pub scores_red: u32,
    pub scores_blue: u32,
    pub questions: Vec<Question>,
}

impl GameInfo {
    pub fn score(&self, team: Team) -> u32 {
        match team {
            Team::Red => self.scores_red,
            Team::Blue => self.scores_blue,
        }
    }

    pub fn score_mut(&mut self, team: Team) -> &mut u32 {
        match team {
            Team::Red => &mut self.scores_red,
            Team::Blue => &mut self.scores_blue,
        }
    }

    pub fn current_question(&self) -> &Question {
        &self.questions[self.active_question_index]
    }

    pub fn current_question_mut(&mut self) -> &mut Question {
        &mut self.questions[self.active_question_index]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub message_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub author_name: String,
    pub command: Option<Team>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub pin: Pin,
    pub topic: String,
    pub questions_per_team: u8,
    pub max_participants: u8,
    pub timer_seconds: u32,
    pub status: RoomStatus,
    pub created_at: DateTime<Utc>,
    pub participants: Vec<Participant>,
    pub messages: Vec<ChatMessage>,
    pub game_info: Option<GameInfo>,
}

impl Room {
    pub fn find_participant(&self, participant_id: &ParticipantId) -> Option<&Participant> {
        self.participants
            .iter()
            .find(|p| &p.participant_id == participant_id)
    }

    pub fn find_participant_mut(
        &mut self,
        participant_id: &ParticipantId,
    ) -> Option<&mut Participant> {
        self.participants
            .iter_mut()
            .find(|p| &p.participant_id == participant_id)
    }

    pub fn host(&self) -> Option<&Participant> {
        self.participants.iter().find(|p| p.role == Role::Host)
    }

    pub fn name_taken(&self, name: &str) -> bool {
        self.participants
            .iter()
            .any(|p| p.name.eq_ignore_ascii_case(name))
    }
}
