//! Default value functions used by `#[serde(default = ...)]` throughout `config::types`.

use super::logging::LogFormat;

pub const fn default_port() -> u16 {
    8080
}

pub fn default_state_dir() -> String {
    "/data".to_string()
}

pub fn default_room_state_file() -> String {
    "rooms.json".to_string()
}

pub fn default_session_state_file() -> String {
    "sessions.json".to_string()
}

pub fn default_cors_allow_origins() -> String {
    "*".to_string()
}

pub const fn default_socket_disconnect_grace_seconds() -> u64 {
    0
}

pub fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}

pub const fn default_gemini_timeout_seconds() -> u64 {
    35
}

pub fn default_log_dir() -> String {
    "logs".to_string()
}

pub fn default_log_filename() -> String {
    "server.log".to_string()
}

pub fn default_rotation() -> String {
    "daily".to_string()
}

pub const fn default_enable_file_logging() -> bool {
    false
}

pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}
