//! Room REST handlers: `/api/v1/rooms*`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use crate::engine::{EngineError, ParticipantId, Pin, RoomSnapshot};

use super::cookies::{clear_session_cookie, session_cookie, SESSION_COOKIE_NAME};
use super::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    pub host_name: String,
    pub topic: String,
    pub questions_per_team: u8,
    pub max_participants: u8,
    pub timer_seconds: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomRequest {
    pub player_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRequest {
    pub option_index: u8,
}

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckPinRequest {
    pub pin: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartGameResponse {
    #[serde(flatten)]
    pub room: RoomSnapshot,
    pub generation_source: String,
    pub generation_message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckPinResponse {
    pub exists: bool,
}

/// A `422`: request-body validation failure, distinct from engine-level conflicts.
pub struct ValidationError(pub String);

impl IntoResponse for ValidationError {
    fn into_response(self) -> Response {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({ "error": "ValidationFailed", "detail": self.0 })),
        )
            .into_response()
    }
}

pub enum ApiError {
    Validation(ValidationError),
    Engine(EngineError),
    Forbidden,
    Conflict(&'static str),
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        Self::Engine(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation(e) => e.into_response(),
            Self::Engine(e) => e.into_response(),
            Self::Forbidden => (
                StatusCode::FORBIDDEN,
                Json(serde_json::json!({ "error": "AccessDenied", "detail": "no session bound to this room" })),
            )
                .into_response(),
            Self::Conflict(detail) => (
                StatusCode::CONFLICT,
                Json(serde_json::json!({ "error": "SessionAlreadyActive", "detail": detail })),
            )
                .into_response(),
        }
    }
}

/// Rejects the request with `409` if the caller's session cookie is still bound to a
/// room that exists and still holds that participant. A cookie pointing at a room the
/// participant already left (or that no longer exists) is stale and is cleared instead.
async fn ensure_no_active_session(state: &AppState, jar: &CookieJar) -> Result<(), ApiError> {
    let Some(session_id) = jar.get(SESSION_COOKIE_NAME).map(|c| c.value().to_owned()) else {
        return Ok(());
    };
    let Some(session) = state.service.sessions.get(&session_id) else {
        return Ok(());
    };

    let pin = Pin::normalize(&session.room_pin);
    let still_active = state
        .service
        .get_room(&pin)
        .await
        .is_ok_and(|room| room.participants.iter().any(|p| p.participant_id == session.participant_id));

    if still_active {
        return Err(ApiError::Conflict(
            "current browser session is already inside a room; leave it first",
        ));
    }

    state.service.sessions.delete(&session_id);
    Ok(())
}

fn validate_create(req: &CreateRoomRequest) -> Result<(), ValidationError> {
    if req.host_name.trim().is_empty() {
        return Err(ValidationError("hostName must not be empty".into()));
    }
    if !(5..=7).contains(&req.questions_per_team) {
        return Err(ValidationError("questionsPerTeam must be in 5..=7".into()));
    }
    if !(2..=100).contains(&req.max_participants) {
        return Err(ValidationError("maxParticipants must be in 2..=100".into()));
    }
    if !(10..=120).contains(&req.timer_seconds) {
        return Err(ValidationError("timerSeconds must be in 10..=120".into()));
    }
    Ok(())
}

pub async fn create_room(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<CreateRoomRequest>,
) -> Result<Response, ApiError> {
    validate_create(&req)?;
    ensure_no_active_session(&state, &jar).await?;
    let (room, _host_id, session_id) = state
        .service
        .create_room(
            req.host_name,
            req.topic,
            req.questions_per_team,
            req.max_participants,
            req.timer_seconds,
        )
        .await?;
    let jar = jar.add(session_cookie(session_id));
    let mut response = (jar, Json(room)).into_response();
    *response.status_mut() = StatusCode::CREATED;
    Ok(response)
}

pub async fn join_room(
    State(state): State<AppState>,
    Path(pin): Path<String>,
    jar: CookieJar,
    Json(req): Json<JoinRoomRequest>,
) -> Result<(CookieJar, Json<RoomSnapshot>), ApiError> {
    if req.player_name.trim().is_empty() {
        return Err(ValidationError("playerName must not be empty".into()).into());
    }
    ensure_no_active_session(&state, &jar).await?;
    let pin = Pin::normalize(&pin);
    let (room, _participant_id, session_id) = state.service.join_room(&pin, req.player_name).await?;
    let jar = jar.add(session_cookie(session_id));
    Ok((jar, Json(room)))
}

/// Resolves the caller's session cookie to a `(participantId, role)` bound to `pin`.
async fn require_session(
    state: &AppState,
    jar: &CookieJar,
    pin: &Pin,
) -> Result<crate::session::SessionData, ApiError> {
    let session_id = jar
        .get(SESSION_COOKIE_NAME)
        .map(|c| c.value().to_owned())
        .ok_or(ApiError::Forbidden)?;
    let session = state.service.sessions.get(&session_id).ok_or(ApiError::Forbidden)?;
    if session.room_pin != pin.as_str() {
        return Err(ApiError::Forbidden);
    }
    Ok(session)
}

pub async fn get_room(
    State(state): State<AppState>,
    Path(pin): Path<String>,
    jar: CookieJar,
) -> Result<Json<RoomSnapshot>, ApiError> {
    let pin = Pin::normalize(&pin);
    require_session(&state, &jar, &pin).await?;
    let room = state.service.get_room(&pin).await?;
    Ok(Json(room))
}

pub async fn start_game(
    State(state): State<AppState>,
    Path(pin): Path<String>,
    jar: CookieJar,
) -> Result<Json<StartGameResponse>, ApiError> {
    let pin = Pin::normalize(&pin);
    let session = require_session(&state, &jar, &pin).await?;
    let requester = ParticipantId::from_raw(session.participant_id);
    let (room, source, message) = state.service.start_game(&pin, &requester).await?;
    Ok(Json(StartGameResponse {
        room,
        generation_source: source,
        generation_message: message,
    }))
}

pub async fn submit_answer(
    State(state): State<AppState>,
    Path(pin): Path<String>,
    jar: CookieJar,
    Json(req): Json<AnswerRequest>,
) -> Result<Json<RoomSnapshot>, ApiError> {
    if req.option_index > 3 {
        return Err(ValidationError("optionIndex must be in 0..=3".into()).into());
    }
    let pin = Pin::normalize(&pin);
    let session = require_session(&state, &jar, &pin).await?;
    let participant_id = ParticipantId::from_raw(session.participant_id);
    let room = state
        .service
        .submit_answer(&pin, &participant_id, req.option_index)
        .await?;
    Ok(Json(room))
}

pub async fn add_message(
    State(state): State<AppState>,
    Path(pin): Path<String>,
    jar: CookieJar,
    Json(req): Json<MessageRequest>,
) -> Result<Json<RoomSnapshot>, ApiError> {
    if req.text.is_empty() || req.text.chars().count() > 400 {
        return Err(ValidationError("text must be 1..=400 characters".into()).into());
    }
    let pin = Pin::normalize(&pin);
    let session = require_session(&state, &jar, &pin).await?;
    let participant_id = ParticipantId::from_raw(session.participant_id);
    let room = state.service.add_message(&pin, &participant_id, req.text).await?;
    Ok(Json(room))
}

pub async fn leave_room(
    State(state): State<AppState>,
    Path(pin): Path<String>,
    jar: CookieJar,
) -> Result<(CookieJar, StatusCode), ApiError> {
    let pin = Pin::normalize(&pin);
    let session = require_session(&state, &jar, &pin).await?;
    let participant_id = ParticipantId::from_raw(session.participant_id.clone());
    state.service.leave_room(&pin, &participant_id).await?;
    state.service.sessions.delete(&session.session_id);
    Ok((jar.add(clear_session_cookie()), StatusCode::NO_CONTENT))
}

pub async fn check_pin_post(
    State(state): State<AppState>,
    Json(req): Json<CheckPinRequest>,
) -> Json<CheckPinResponse> {
    let pin = Pin::normalize(&req.pin);
    Json(CheckPinResponse {
        exists: state.service.check_pin(&pin).await,
    })
}

#[derive(Debug, Deserialize)]
pub struct CheckPinQuery {
    pub pin: String,
}

pub async fn check_pin_get(
    State(state): State<AppState>,
    axum::extract::Query(query): axum::extract::Query<CheckPinQuery>,
) -> Json<CheckPinResponse> {
    let pin = Pin::normalize(&query.pin);
    Json(CheckPinResponse {
        exists: state.service.check_pin(&pin).await,
    })
}
