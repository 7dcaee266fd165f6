//! The Room Engine: registry, state machine, socket binder and timer supervisor
//! (components C1-C4). Everything outside `engine` interacts only through
//! [`registry::RoomRegistry`], [`timer::TimerSupervisor`] and the snapshot/event
//! types re-exported here.

pub mod errors;
pub mod events;
pub mod model;
pub mod registry;
pub mod room_codes;
pub mod snapshot;
pub mod timer;
pub mod types;

pub use errors::EngineError;
pub use events::{BroadcastTarget, PendingBroadcast, ServerEvent};
pub use registry::{DraftQuestion, RoomRegistry};
pub use snapshot::{
    ChatMessageSnapshot, GameInfoSnapshot, ParticipantSnapshot, QuestionSnapshot, RoomSnapshot,
};
pub use timer::TimerSupervisor;
pub use types::{AnswerStatus, ParticipantId, Pin, Role, RoomStatus, SocketId, Team};

#[cfg(test)]
mod tests {
    use super::registry::{DraftQuestion, RoomRegistry};
    use super::types::{ParticipantId, Pin, RoomStatus};

    fn draft_questions(n: usize) -> Vec<DraftQuestion> {
        (0..n)
            .map(|i| DraftQuestion {
                text: format!("question {i}"),
                options: [
                    "a".to_owned(),
                    "b".to_owned(),
                    "c".to_owned(),
                    "d".to_owned(),
                ],
                correct_option: 0,
            })
            .collect()
    }

    async fn start_two_player_game(registry: &RoomRegistry) -> (Pin, ParticipantId, ParticipantId) {
        let (room, host_id) = registry
            .create_room("Alice".into(), "geography".into(), 5, 10, 30)
            .await
            .unwrap();
        let pin = Pin::normalize(&room.pin);
        let host_id = ParticipantId::from_raw(host_id);
        let (_, bob_id, _) = registry.join_room(&pin, "Bob".into()).await.unwrap();
        let bob_id = ParticipantId::from_raw(bob_id);
        registry
            .apply_start_game(&pin, &host_id, draft_questions(10))
            .await
            .unwrap();
        (pin, host_id, bob_id)
    }

    #[tokio::test]
    async fn happy_start_assigns_two_teams_and_resets_counters() {
        let registry = RoomRegistry::new();
        let (pin, _host, _bob) = start_two_player_game(&registry).await;
        let room = registry.get_room(&pin).await.unwrap();
        assert_eq!(room.status, RoomStatus::Active);
        let info = room.game_info.unwrap();
        assert_eq!(info.active_question_index, 0);
        assert_eq!(info.counter, 30);
        assert_eq!(info.scores_red, 0);
        assert_eq!(info.scores_blue, 0);
        let teams: std::collections::HashSet<_> =
            room.participants.iter().map(|p| p.team.unwrap()).collect();
        assert_eq!(teams.len(), 2);
    }

    #[tokio::test]
    async fn wrong_team_answer_is_rejected() {
        let registry = RoomRegistry::new();
        let (pin, host, bob) = start_two_player_game(&registry).await;
        let room = registry.get_room(&pin).await.unwrap();
        let active_team = room.game_info.as_ref().unwrap().active_team;
        let off_turn_actor = room
            .participants
            .iter()
            .find(|p| p.team != Some(active_team))
            .map(|p| {
                if p.participant_id == host.as_str() {
                    host.clone()
                } else {
                    bob.clone()
                }
            })
            .expect("one participant is always off the active team");

        let err = registry
            .submit_answer(&pin, &off_turn_actor, 0)
            .await
            .unwrap_err();
        assert_eq!(err, super::errors::EngineError::WrongTurn);
    }

    #[tokio::test]
    async fn correct_answer_advances_and_scores() {
        let registry = RoomRegistry::new();
        let (pin, host, bob) = start_two_player_game(&registry).await;
        let room = registry.get_room(&pin).await.unwrap();
        let info = room.game_info.clone().unwrap();
        let active_team = info.active_team;
        let correct_option = info.questions[0].correct_option;
        let actor_id = room
            .participants
            .iter()
            .find(|p| p.team == Some(active_team))
            .map(|p| {
                if p.participant_id == host.as_str() {
                    host.clone()
                } else {
                    bob.clone()
                }
            })
            .unwrap();

        let (snapshot, _broadcasts, finished) = registry
            .submit_answer(&pin, &actor_id, correct_option)
            .await
            .unwrap();
        assert!(!finished);
        let info = snapshot.game_info.unwrap();
        assert_eq!(info.active_question_index, 1);
        assert_eq!(info.counter, 30);
        assert_eq!(info.scores_red + info.scores_blue, 1);
    }

    #[tokio::test]
    async fn last_question_finishes_the_game() {
        let registry = RoomRegistry::new();
        let (pin, host, bob) = start_two_player_game(&registry).await;
        let mut finished = false;
        for _ in 0..10 {
            let room = registry.get_room(&pin).await.unwrap();
            let info = room.game_info.clone().expect("game still active");
            let active_team = info.active_team;
            let option = info.questions[info.active_question_index].correct_option;
            let actor_id = room
                .participants
                .iter()
                .find(|p| p.team == Some(active_team))
                .map(|p| {
                    if p.participant_id == host.as_str() {
                        host.clone()
                    } else {
                        bob.clone()
                    }
                })
                .unwrap();
            let (_, _, is_finished) = registry
                .submit_answer(&pin, &actor_id, option)
                .await
                .unwrap();
            finished = is_finished;
        }
        assert!(finished);
        let room = registry.get_room(&pin).await.unwrap();
        assert_eq!(room.status, RoomStatus::Finished);
    }

    #[tokio::test]
    async fn host_disconnect_promotes_next_participant() {
        let registry = RoomRegistry::new();
        let (room, host_id) = registry
            .create_room("Alice".into(), "science".into(), 5, 10, 30)
            .await
            .unwrap();
        let pin = Pin::normalize(&room.pin);
        let host_id = ParticipantId::from_raw(host_id);
        let (_, bob_id, _) = registry.join_room(&pin, "Bob".into()).await.unwrap();
        let bob_id = ParticipantId::from_raw(bob_id);
        let (_, _carol_id, _) = registry.join_room(&pin, "Carol".into()).await.unwrap();

        let (snapshot, _broadcasts) = registry.leave_room(&pin, &host_id).await.unwrap();
        let snapshot = snapshot.unwrap();
        let bob = snapshot
            .participants
            .iter()
            .find(|p| p.participant_id == bob_id.as_str())
            .unwrap();
        assert_eq!(bob.role, super::types::Role::Host);
    }
}
