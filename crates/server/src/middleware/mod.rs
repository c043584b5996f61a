//! HTTP middleware stack.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, HTTP context)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions, Postgres or memory store)
//! 5. Bearer claims (signed token to `IdentityClaims`)

pub mod auth;
pub mod claims;
pub mod request_id;
pub mod session;

pub use auth::{RequireOwner, clear_current_account, set_current_account};
pub use claims::bearer_claims_middleware;
pub use request_id::request_id_middleware;
pub use session::create_session_layer;
