//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                    - Liveness check
//! GET  /health/ready              - Readiness check (database, when configured)
//!
//! # Accounts
//! POST   /api/usuarios/login      - Login (binds the session)
//! POST   /api/usuarios/logout     - Logout
//! GET    /api/usuarios/me         - Caller's account (auth)
//! GET    /api/usuarios            - Account list
//! POST   /api/usuarios            - Register
//! GET    /api/usuarios/{id}       - Account detail
//! PUT    /api/usuarios/{id}       - Update own account (auth)
//! PUT    /api/usuarios/{id}/senha - Change own password (auth)
//! DELETE /api/usuarios/{id}       - Delete own account (auth)
//! GET    /api/usuarios/debug/todos - Raw credentials (debug routes only)
//!
//! # Owned records (auth)
//! GET|POST        /api/clientes, /api/fornecedores, /api/produtos
//! GET|PUT|DELETE  /api/clientes/{id}, /api/fornecedores/{id}, /api/produtos/{id}
//! ```
//!
//! Product writes are multipart; everything else is JSON.

pub mod accounts;
pub mod products;
pub mod records;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
};

use crate::models::{Client, Supplier};
use crate::state::AppState;

/// Create the account routes router.
pub fn account_routes(debug: bool) -> Router<AppState> {
    let router = Router::new()
        .route("/", get(accounts::index).post(accounts::register))
        .route("/login", post(accounts::login))
        .route("/logout", post(accounts::logout))
        .route("/me", get(accounts::me))
        .route(
            "/{id}",
            get(accounts::show)
                .put(accounts::update)
                .delete(accounts::destroy),
        )
        .route("/{id}/senha", put(accounts::change_password));

    if debug {
        tracing::warn!("Debug routes enabled: raw credentials exposed at /api/usuarios/debug/todos");
        router.route("/debug/todos", get(accounts::debug_credentials))
    } else {
        router
    }
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route(
            "/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::destroy),
        )
}

/// Create all API routes.
pub fn routes(debug: bool) -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api/usuarios", account_routes(debug))
        .nest("/api/clientes", records::routes::<Client>())
        .nest("/api/fornecedores", records::routes::<Supplier>())
        .nest("/api/produtos", product_routes())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies database connectivity when a database is configured. In-memory
/// mode is always ready.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    let Some(pool) = state.pool() else {
        return StatusCode::OK;
    };

    match sqlx::query("SELECT 1").fetch_one(pool).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
