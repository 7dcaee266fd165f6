//! Engine-internal error enum and its HTTP status mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("room not found")]
    RoomNotFound,
    #[error("room is at capacity")]
    CapacityExceeded,
    #[error("room is not accepting this operation in its current state")]
    StateClosed,
    #[error("name is already taken in this room")]
    NameTaken,
    #[error("access denied")]
    AccessDenied,
    #[error("it is not your team's turn")]
    WrongTurn,
    #[error("question already answered")]
    AlreadyAnswered,
    #[error("game is not active")]
    GameNotActive,
    #[error("could not allocate a unique room pin")]
    PinExhausted,
}

impl EngineError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::RoomNotFound => StatusCode::NOT_FOUND,
            Self::AccessDenied => StatusCode::FORBIDDEN,
            Self::StateClosed
            | Self::NameTaken
            | Self::CapacityExceeded
            | Self::AlreadyAnswered
            | Self::WrongTurn
            | Self::GameNotActive => StatusCode::CONFLICT,
            Self::PinExhausted => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    detail: String,
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            error: format!("{self:?}"),
            detail: self.to_string(),
        };
        (status, axum::Json(body)).into_response()
    }
}
