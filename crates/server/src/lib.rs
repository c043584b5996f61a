//! Cadastro server library.
//!
//! Multi-tenant record management: accounts own clients, suppliers and
//! products; products may carry an image kept in local or remote blob
//! storage. The binary in `main.rs` wires configuration into [`app`]; tests
//! call [`app`] directly with in-memory stores.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod storage;
pub mod validation;

use axum::{Router, body::Body, extract::DefaultBodyLimit, http::Request};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tower_sessions::SessionStore;

use crate::config::StorageMode;
use crate::state::AppState;

/// Slack on top of the image size for the other form fields.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the application router.
///
/// `session_store` backs the session layer; pass `PostgresStore` in database
/// mode and `MemoryStore` otherwise.
pub fn app<S>(state: AppState, session_store: S) -> Router
where
    S: SessionStore + Clone,
{
    let config = state.config();
    let body_limit = config.storage.max_upload_bytes + FORM_OVERHEAD_BYTES;
    let session_layer = middleware::create_session_layer(session_store, config);

    let mut router = routes::routes(config.debug_routes);
    if config.storage.mode == StorageMode::Local {
        router = router.nest_service("/uploads", ServeDir::new(&config.storage.uploads_dir));
    }

    router
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::bearer_claims_middleware,
        ))
        .layer(session_layer)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}
