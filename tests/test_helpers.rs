//! Shared harness for the integration and concurrency test suites: builds a fully
//! wired `AppState` backed by a temp-dir persistence adapter and the static
//! fallback question provider, so tests never touch the network or a real disk
//! path outside their own `tempfile::tempdir()`.

use std::sync::Arc;

use tempfile::TempDir;
use trivia_room_server::dispatch::EventDispatcher;
use trivia_room_server::engine::timer::TimerSupervisor;
use trivia_room_server::engine::RoomRegistry;
use trivia_room_server::http::{routes, AppState};
use trivia_room_server::metrics::Metrics;
use trivia_room_server::persistence::PersistenceAdapter;
use trivia_room_server::question_provider::QuestionProvider;
use trivia_room_server::session::SessionRegistry;

/// Holds the `TempDir` alive for the test's duration; dropping it removes the
/// backing directory, so callers must keep this bound rather than discard it.
#[allow(dead_code)]
pub struct TestHarness {
    pub state: AppState,
    state_dir: TempDir,
}

#[allow(dead_code)]
pub fn build_state() -> TestHarness {
    let state_dir = tempfile::tempdir().expect("tempdir");
    let metrics = Arc::new(Metrics::new());
    let registry = Arc::new(RoomRegistry::new());
    let dispatcher = Arc::new(EventDispatcher::new(Arc::clone(&metrics)));
    let sessions = Arc::new(SessionRegistry::new());
    let persistence = Arc::new(PersistenceAdapter::new(state_dir.path(), "rooms.json", "sessions.json"));
    let timers = Arc::new(TimerSupervisor::new(
        Arc::clone(&registry),
        Arc::clone(&dispatcher),
        Arc::clone(&metrics),
    ));
    let questions = Arc::new(QuestionProvider::static_bank());

    let state = AppState::new(registry, dispatcher, timers, sessions, persistence, questions, metrics);
    TestHarness { state, state_dir }
}

#[allow(dead_code)]
pub fn build_router() -> (axum::Router, TestHarness) {
    let harness = build_state();
    let app = routes::create_router(harness.state.clone(), "*");
    (app, harness)
}
