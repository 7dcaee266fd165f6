//! Session status handlers: `/api/v1/session*`.

use axum::extract::State;
use axum::http::StatusCode;
use axum_extra::extract::cookie::CookieJar;
use axum::Json;
use serde::Serialize;

use crate::engine::{ParticipantId, Pin};

use super::cookies::{clear_session_cookie, SESSION_COOKIE_NAME};
use super::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub authenticated: bool,
    pub room_pin: Option<String>,
    pub participant_id: Option<String>,
    pub name: Option<String>,
    pub role: Option<crate::engine::Role>,
}

impl SessionStatus {
    fn anonymous() -> Self {
        Self {
            authenticated: false,
            room_pin: None,
            participant_id: None,
            name: None,
            role: None,
        }
    }
}

pub async fn get_session(State(state): State<AppState>, jar: CookieJar) -> Json<SessionStatus> {
    let Some(session_id) = jar.get(SESSION_COOKIE_NAME).map(|c| c.value().to_owned()) else {
        return Json(SessionStatus::anonymous());
    };
    let Some(session) = state.service.sessions.get(&session_id) else {
        return Json(SessionStatus::anonymous());
    };

    // A session can outlive its room (e.g. the room emptied and was deleted); treat
    // that as anonymous and drop the stale session rather than surface a ghost.
    let pin = Pin::normalize(&session.room_pin);
    if state.service.get_room(&pin).await.is_err() {
        state.service.sessions.delete(&session_id);
        return Json(SessionStatus::anonymous());
    }

    Json(SessionStatus {
        authenticated: true,
        room_pin: Some(session.room_pin),
        participant_id: Some(session.participant_id),
        name: Some(session.name),
        role: Some(session.role),
    })
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, StatusCode) {
    if let Some(session_id) = jar.get(SESSION_COOKIE_NAME).map(|c| c.value().to_owned()) {
        if let Some(session) = state.service.sessions.delete(&session_id) {
            let pin = Pin::normalize(&session.room_pin);
            let participant_id = ParticipantId::from_raw(session.participant_id);
            let _ = state.service.leave_room(&pin, &participant_id).await;
        }
    }
    (jar.add(clear_session_cookie()), StatusCode::NO_CONTENT)
}
