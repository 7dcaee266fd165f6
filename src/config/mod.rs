//! Configuration module (C10, ambient).
//!
//! Supports layered loading: compiled defaults, `config.json` next to the executable
//! or in the current working directory, an explicit `--config <path>`, and finally
//! flat environment variable overrides.
//!
//! # Module Structure
//!
//! - [`types`]: root [`AppConfig`] struct
//! - [`defaults`]: default value functions
//! - [`logging`]: logging configuration
//! - [`loader`]: configuration loading functions

pub mod defaults;
pub mod loader;
pub mod logging;
pub mod types;

pub use loader::load;
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use types::AppConfig;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = AppConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.state_dir, "/data");
        assert_eq!(config.room_state_file, "rooms.json");
        assert_eq!(config.session_state_file, "sessions.json");
        assert_eq!(config.cors_allow_origins, "*");
        assert_eq!(config.gemini_model, "gemini-1.5-flash");
        assert_eq!(config.gemini_timeout_seconds, 35);
        assert!(config.gemini_api_key.is_none());
    }

    #[test]
    fn round_trips_through_json() {
        let config = AppConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let deserialized: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config.port, deserialized.port);
        assert_eq!(config.state_dir, deserialized.state_dir);
    }
}
