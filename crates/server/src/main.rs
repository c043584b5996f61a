//! Cadastro server - multi-tenant record management API.
//!
//! # Modes
//!
//! - Database mode (`CADASTRO_DATABASE_URL` set): `PostgreSQL` stores and
//!   `PostgreSQL`-backed sessions. Run `cadastro migrate` first.
//! - Development mode (no database URL): in-memory stores and sessions.
//!   Nothing survives a restart.
//!
//! Product images go to the local uploads root or to remote object storage,
//! depending on `STORAGE_MODE`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use cadastro_server::config::ServerConfig;
use cadastro_server::state::AppState;
use cadastro_server::storage::BlobGateway;
use cadastro_server::{app, db};
use sentry::integrations::tracing as sentry_tracing;
use tower_sessions::MemoryStore;
use tower_sessions_sqlx_store::PostgresStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ServerConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = ServerConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "cadastro_server=info,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let blobs =
        BlobGateway::from_config(&config.storage).expect("Failed to initialize image storage");

    let addr = config.socket_addr();

    // NOTE: Migrations are NOT run automatically on startup.
    // Run them explicitly via: cargo run -p cadastro-cli -- migrate
    let router = match config.database_url.clone() {
        Some(database_url) => {
            let pool = db::create_pool(&database_url)
                .await
                .expect("Failed to create database pool");
            tracing::info!("Database pool created");

            let session_store = PostgresStore::new(pool.clone());
            app(AppState::postgres(config, pool, blobs), session_store)
        }
        None => {
            tracing::warn!("No database configured, using in-memory stores");
            app(AppState::in_memory(config, blobs), MemoryStore::default())
        }
    };

    tracing::info!("cadastro-server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
