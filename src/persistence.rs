//! Persistence Adapter (C6): best-effort atomic snapshot/restore of room and session
//! state to disk, via `tmp + rename`. Sockets are never persisted.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::engine::model::Room;
use crate::engine::registry::RoomRegistry;
use crate::session::{SessionData, SessionRegistry};

#[derive(Debug, Serialize, Deserialize)]
struct RoomsDocument {
    rooms: Vec<Room>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionsDocument {
    sessions: Vec<SessionData>,
}

/// Writes `rooms.json`/`sessions.json` style snapshots on every mutating registry
/// operation. Failures are logged at `warn` and swallowed: durability here is
/// best-effort, never a reason to fail the caller's request.
pub struct PersistenceAdapter {
    room_state_path: PathBuf,
    session_state_path: PathBuf,
}

impl PersistenceAdapter {
    pub fn new(state_dir: impl AsRef<Path>, room_state_file: &str, session_state_file: &str) -> Self {
        let state_dir = state_dir.as_ref();
        Self {
            room_state_path: state_dir.join(room_state_file),
            session_state_path: state_dir.join(session_state_file),
        }
    }

    pub async fn restore_rooms(&self, registry: &RoomRegistry) {
        match tokio::fs::read(&self.room_state_path).await {
            Ok(bytes) => match serde_json::from_slice::<RoomsDocument>(&bytes) {
                Ok(doc) => {
                    let mut rooms = doc.rooms;
                    for room in &mut rooms {
                        for participant in &mut room.participants {
                            participant.socket_id = None;
                        }
                    }
                    let count = rooms.len();
                    registry.restore(rooms).await;
                    tracing::info!(rooms = count, "restored room state from disk");
                }
                Err(err) => {
                    warn!(error = %err, path = %self.room_state_path.display(), "dropping unreadable room state file");
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                warn!(error = %err, path = %self.room_state_path.display(), "could not read room state file");
            }
        }
    }

    pub async fn restore_sessions(&self, sessions: &SessionRegistry) {
        match tokio::fs::read(&self.session_state_path).await {
            Ok(bytes) => match serde_json::from_slice::<SessionsDocument>(&bytes) {
                Ok(doc) => {
                    let count = doc.sessions.len();
                    sessions.restore(doc.sessions);
                    tracing::info!(sessions = count, "restored session state from disk");
                }
                Err(err) => {
                    warn!(error = %err, path = %self.session_state_path.display(), "dropping unreadable session state file");
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                warn!(error = %err, path = %self.session_state_path.display(), "could not read session state file");
            }
        }
    }

    pub async fn save_rooms(&self, registry: &RoomRegistry) {
        let rooms = registry.snapshot_all().await;
        let path = self.room_state_path.clone();
        write_atomic(path, RoomsDocument { rooms }).await;
    }

    pub async fn save_sessions(&self, sessions: &SessionRegistry) {
        let sessions = sessions.snapshot_all();
        let path = self.session_state_path.clone();
        write_atomic(path, SessionsDocument { sessions }).await;
    }
}

async fn write_atomic<T>(path: PathBuf, document: T)
where
    T: Serialize + Send + 'static,
{
    let result = tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let body = serde_json::to_vec_pretty(&document)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp_path = path.with_extension("tmp");
        std::fs::write(&tmp_path, body)?;
        std::fs::rename(&tmp_path, &path)?;
        Ok(())
    })
    .await;

    match result {
        Ok(Ok(())) => {}
        Ok(Err(err)) => warn!(error = %err, "failed to persist state to disk"),
        Err(err) => warn!(error = %err, "persistence write task panicked"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_and_restores_room_state() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = PersistenceAdapter::new(dir.path(), "rooms.json", "sessions.json");

        let registry = RoomRegistry::new();
        registry
            .create_room("Alice".into(), "history".into(), 5, 10, 30)
            .await
            .unwrap();
        adapter.save_rooms(&registry).await;

        let restored = RoomRegistry::new();
        adapter.restore_rooms(&restored).await;
        let rooms = restored.list_rooms().await;
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].participants.len(), 1);
    }

    #[tokio::test]
    async fn missing_file_restores_empty_without_error() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = PersistenceAdapter::new(dir.path(), "rooms.json", "sessions.json");
        let registry = RoomRegistry::new();
        adapter.restore_rooms(&registry).await;
        assert!(registry.list_rooms().await.is_empty());
    }
}
