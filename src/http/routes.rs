//! Router assembly: CORS, tracing, and the full route table under `/api/v1`.

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::{rooms, session, ws, AppState};

pub fn create_router(state: AppState, cors_allow_origins: &str) -> Router {
    let api = Router::new()
        .route("/rooms", post(rooms::create_room))
        .route("/rooms/check-pin", get(rooms::check_pin_get).post(rooms::check_pin_post))
        .route("/rooms/{pin}", get(rooms::get_room))
        .route("/rooms/{pin}/join", post(rooms::join_room))
        .route("/rooms/{pin}/start", post(rooms::start_game))
        .route("/rooms/{pin}/answer", post(rooms::submit_answer))
        .route("/rooms/{pin}/messages", post(rooms::add_message))
        .route("/rooms/{pin}/leave", post(rooms::leave_room))
        .route("/session", get(session::get_session))
        .route("/session/logout", post(session::logout));

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_json))
        .route("/metrics/prom", get(metrics_prometheus))
        .route("/ws", get(ws::ws_upgrade))
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(build_cors(cors_allow_origins))
        .with_state(state)
}

fn build_cors(allow_origins: &str) -> CorsLayer {
    if allow_origins.trim() == "*" {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = allow_origins
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();
    if origins.is_empty() {
        tracing::warn!("no valid CORS origins configured, falling back to permissive CORS");
        return CorsLayer::permissive();
    }
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
        .allow_credentials(false)
}

async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

async fn metrics_json(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> axum::Json<crate::metrics::MetricsSnapshot> {
    axum::Json(state.service.metrics.snapshot())
}

async fn metrics_prometheus(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> String {
    state.service.metrics.render_prometheus()
}
