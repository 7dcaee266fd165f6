#![cfg_attr(not(test), deny(clippy::panic))]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::struct_excessive_bools,
    clippy::too_many_arguments,
    clippy::too_many_lines,
    clippy::similar_names
)]

//! # Trivia Room Server
//!
//! A realtime multiplayer trivia room server: hosts create PIN-addressed rooms,
//! participants join over a cookie-bound session and a WebSocket connection, and
//! the room engine drives a turn-based, two-team question-and-answer game with a
//! per-room countdown timer.

/// Server configuration and environment variables
pub mod config;

/// Socket fan-out: delivers outbound events to the sockets bound to a room
pub mod dispatch;

/// The Room Engine: registry, state machine, socket binder, timer supervisor
pub mod engine;

/// HTTP REST and WebSocket edge
pub mod http;

/// Structured logging configuration
pub mod logging;

/// Atomic-counter server metrics
pub mod metrics;

/// Best-effort atomic persistence of room/session state to disk
pub mod persistence;

/// External question generator facade with static fallback bank
pub mod question_provider;

/// Cookie-bound session registry, independent of live socket connections
pub mod session;

/// Orchestrates the engine, question provider, timers, dispatcher and sessions
pub mod service;
