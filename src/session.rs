//! Session Registry (C8, ambient): cookie-bound mapping to `(pin, participantId)`,
//! independent of any live socket connection.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::engine::{ParticipantId, Pin, Role};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub session_id: String,
    pub room_pin: String,
    pub participant_id: String,
    pub name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

fn generate_session_id() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// In-memory session store: `DashMap<SessionId, SessionData>` plus the reverse index
/// needed to update a session's role when its participant is promoted to host.
pub struct SessionRegistry {
    sessions: DashMap<String, SessionData>,
    by_participant: DashMap<(String, String), String>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            by_participant: DashMap::new(),
        }
    }

    pub fn restore(&self, sessions: Vec<SessionData>) {
        self.sessions.clear();
        self.by_participant.clear();
        for session in sessions {
            let key = (session.room_pin.clone(), session.participant_id.clone());
            self.by_participant.insert(key, session.session_id.clone());
            self.sessions.insert(session.session_id.clone(), session);
        }
    }

    pub fn snapshot_all(&self) -> Vec<SessionData> {
        self.sessions.iter().map(|e| e.value().clone()).collect()
    }

    pub fn create(&self, pin: &Pin, participant_id: &ParticipantId, name: String, role: Role) -> String {
        let session_id = generate_session_id();
        let data = SessionData {
            session_id: session_id.clone(),
            room_pin: pin.as_str().to_owned(),
            participant_id: participant_id.as_str().to_owned(),
            name,
            role,
            created_at: Utc::now(),
        };
        let key = (data.room_pin.clone(), data.participant_id.clone());
        self.by_participant.insert(key, session_id.clone());
        self.sessions.insert(session_id.clone(), data);
        session_id
    }

    pub fn get(&self, session_id: &str) -> Option<SessionData> {
        self.sessions.get(session_id).map(|e| e.value().clone())
    }

    pub fn update_role(&self, pin: &Pin, participant_id: &ParticipantId, role: Role) {
        let key = (pin.as_str().to_owned(), participant_id.as_str().to_owned());
        if let Some(session_id) = self.by_participant.get(&key) {
            if let Some(mut session) = self.sessions.get_mut(session_id.value()) {
                session.role = role;
            }
        }
    }

    pub fn delete(&self, session_id: &str) -> Option<SessionData> {
        let (_, data) = self.sessions.remove(session_id)?;
        let key = (data.room_pin.clone(), data.participant_id.clone());
        self.by_participant.remove(&key);
        Some(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_create_get_update_delete() {
        let registry = SessionRegistry::new();
        let pin = Pin::normalize("ABC123");
        let participant_id = ParticipantId::new();

        let session_id = registry.create(&pin, &participant_id, "Alice".into(), Role::Host);
        assert_eq!(session_id.len(), 32);
        assert!(session_id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));

        let fetched = registry.get(&session_id).expect("session exists");
        assert_eq!(fetched.name, "Alice");
        assert_eq!(fetched.role, Role::Host);

        registry.update_role(&pin, &participant_id, Role::Participant);
        let updated = registry.get(&session_id).unwrap();
        assert_eq!(updated.role, Role::Participant);

        let deleted = registry.delete(&session_id);
        assert!(deleted.is_some());
        assert!(registry.get(&session_id).is_none());
    }
}
