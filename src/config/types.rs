//! Root configuration type.

use super::defaults::{
    default_cors_allow_origins, default_gemini_model, default_gemini_timeout_seconds,
    default_port, default_room_state_file, default_session_state_file,
    default_socket_disconnect_grace_seconds, default_state_dir,
};
use super::logging::LoggingConfig;
use serde::{Deserialize, Serialize};

/// Root configuration struct, loaded by [`super::loader::load`].
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory persisted room/session snapshots are written under.
    #[serde(default = "default_state_dir")]
    pub state_dir: String,
    /// File name (relative to `state_dir`) for the room registry snapshot.
    #[serde(default = "default_room_state_file")]
    pub room_state_file: String,
    /// File name (relative to `state_dir`) for the session registry snapshot.
    #[serde(default = "default_session_state_file")]
    pub session_state_file: String,

    /// Comma-separated list of allowed CORS origins, or `*`.
    #[serde(default = "default_cors_allow_origins")]
    pub cors_allow_origins: String,

    /// Reserved: parsed but unused, no grace-period reconnection is implemented.
    #[serde(default = "default_socket_disconnect_grace_seconds")]
    pub socket_disconnect_grace_seconds: u64,

    /// API key for the external question generator. Absent disables the upstream
    /// call entirely and the question provider always falls back to the static bank.
    #[serde(default)]
    pub gemini_api_key: Option<String>,
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,
    #[serde(default = "default_gemini_timeout_seconds")]
    pub gemini_timeout_seconds: u64,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            state_dir: default_state_dir(),
            room_state_file: default_room_state_file(),
            session_state_file: default_session_state_file(),
            cors_allow_origins: default_cors_allow_origins(),
            socket_disconnect_grace_seconds: default_socket_disconnect_grace_seconds(),
            gemini_api_key: None,
            gemini_model: default_gemini_model(),
            gemini_timeout_seconds: default_gemini_timeout_seconds(),
            logging: LoggingConfig::default(),
        }
    }
}
