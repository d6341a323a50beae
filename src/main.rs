//! Course Tutor - course-grounded AI tutoring chat service
//!
//! Hosts per-user tutoring sessions over HTTP. Each answer is grounded in
//! the selected course's content, and every finished exchange is logged.

mod api;
mod context;
mod db;
mod history;
mod llm;
mod promote;
mod runtime;
mod session;
mod turn;

use api::{create_router, AppState};
use db::Database;
use llm::{CompletionClient, LlmConfig, LoggingClient, OpenAiClient, UnconfiguredClient};
use runtime::{DatabaseStorage, SessionManager};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "course_tutor=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let db_path = std::env::var("TUTOR_DB_PATH").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        format!("{home}/.course-tutor/tutor.db")
    });

    let port: u16 = std::env::var("TUTOR_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);

    let session_idle = std::env::var("TUTOR_SESSION_IDLE_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .map_or(Duration::from_secs(30 * 60), Duration::from_secs);

    // Ensure database directory exists
    if let Some(parent) = PathBuf::from(&db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %db_path, "Opening database");
    let db = Database::open(&db_path)?;

    // Completion client, constructed once and handed to the session manager
    let llm_config = LlmConfig::from_env();
    let client: Arc<dyn CompletionClient> = if llm_config.has_credential() {
        let client = OpenAiClient::new(&llm_config)?;
        tracing::info!(
            endpoint = %llm_config.endpoint,
            model = %llm_config.model,
            "Completion client initialized"
        );
        Arc::new(client)
    } else {
        tracing::warn!(
            "No completion API key configured. Set TUTOR_LLM_API_KEY or OPENAI_API_KEY; every message will get an error reply."
        );
        Arc::new(UnconfiguredClient::new(llm_config.model.clone()))
    };
    let client: Arc<dyn CompletionClient> = Arc::new(LoggingClient::new(client));

    let storage = Arc::new(DatabaseStorage::new(db.clone()));
    let state = AppState::new(db, SessionManager::new(storage, client));
    state.sessions.clone().spawn_idle_sweeper(session_idle);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Course Tutor server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
