//! HTTP REST and WebSocket edge (C9). Handlers are thin: validation and wire
//! shaping only, all state transitions go through [`crate::service::GameService`].

pub mod cookies;
pub mod rooms;
pub mod routes;
pub mod session;
pub mod ws;

use std::sync::Arc;

use crate::dispatch::EventDispatcher;
use crate::engine::timer::TimerSupervisor;
use crate::engine::RoomRegistry;
use crate::metrics::Metrics;
use crate::persistence::PersistenceAdapter;
use crate::question_provider::QuestionProvider;
use crate::service::GameService;
use crate::session::SessionRegistry;

/// Shared application state handed to every axum handler.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<GameService>,
}

impl AppState {
    pub fn new(
        registry: Arc<RoomRegistry>,
        dispatcher: Arc<EventDispatcher>,
        timers: Arc<TimerSupervisor>,
        sessions: Arc<SessionRegistry>,
        persistence: Arc<PersistenceAdapter>,
        questions: Arc<QuestionProvider>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            service: Arc::new(GameService {
                registry,
                dispatcher,
                timers,
                sessions,
                persistence,
                questions,
                metrics,
            }),
        }
    }
}
