#![cfg_attr(not(test), deny(clippy::panic))]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use trivia_room_server::config;
use trivia_room_server::dispatch::EventDispatcher;
use trivia_room_server::engine::timer::TimerSupervisor;
use trivia_room_server::engine::RoomRegistry;
use trivia_room_server::http::{routes, AppState};
use trivia_room_server::logging;
use trivia_room_server::metrics::Metrics;
use trivia_room_server::persistence::PersistenceAdapter;
use trivia_room_server::question_provider::{QuestionProvider, QuestionProviderConfig};
use trivia_room_server::session::SessionRegistry;

/// Trivia Room Server -- realtime multiplayer trivia rooms over HTTP + WebSocket.
#[derive(Parser, Debug)]
#[command(name = "trivia-room-server")]
#[command(about = "A realtime multiplayer trivia room server")]
#[command(version)]
struct Cli {
    /// Load configuration from this path, on top of the usual precedence.
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Print the loaded configuration to stdout (as JSON) and exit.
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref());

    if cli.print_config {
        let json = serde_json::to_string_pretty(&cfg)
            .map_err(|e| anyhow::anyhow!("failed to serialize config: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    logging::init_with_config(&cfg.logging);

    let metrics = Arc::new(Metrics::new());
    let registry = Arc::new(RoomRegistry::new());
    let dispatcher = Arc::new(EventDispatcher::new(Arc::clone(&metrics)));
    let sessions = Arc::new(SessionRegistry::new());
    let persistence = Arc::new(PersistenceAdapter::new(
        &cfg.state_dir,
        &cfg.room_state_file,
        &cfg.session_state_file,
    ));
    let timers = Arc::new(TimerSupervisor::new(
        Arc::clone(&registry),
        Arc::clone(&dispatcher),
        Arc::clone(&metrics),
    ));
    let questions = Arc::new(QuestionProvider::gemini(QuestionProviderConfig {
        api_key: cfg.gemini_api_key.clone(),
        model: cfg.gemini_model.clone(),
        timeout: Duration::from_secs(cfg.gemini_timeout_seconds),
    }));

    persistence.restore_rooms(&registry).await;
    persistence.restore_sessions(&sessions).await;

    let state = AppState::new(
        Arc::clone(&registry),
        Arc::clone(&dispatcher),
        Arc::clone(&timers),
        Arc::clone(&sessions),
        Arc::clone(&persistence),
        questions,
        Arc::clone(&metrics),
    );

    let app = routes::create_router(state, &cfg.cors_allow_origins);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "trivia room server listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shutting down: cancelling timers and flushing state");
    timers.cancel_all().await;
    persistence.save_rooms(&registry).await;
    persistence.save_sessions(&sessions).await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

#[cfg(test)]
mod cli_tests {
    use super::Cli;
    use clap::Parser;

    #[test]
    fn default_has_no_explicit_config_path() {
        let cli = Cli::try_parse_from(["trivia-room-server"]).unwrap();
        assert!(cli.config.is_none());
        assert!(!cli.print_config);
    }

    #[test]
    fn accepts_config_flag() {
        let cli = Cli::try_parse_from(["trivia-room-server", "--config", "/tmp/c.json"]).unwrap();
        assert_eq!(cli.config.unwrap().to_str().unwrap(), "/tmp/c.json");
    }

    #[test]
    fn accepts_print_config_flag() {
        let cli = Cli::try_parse_from(["trivia-room-server", "--print-config"]).unwrap();
        assert!(cli.print_config);
    }
}
