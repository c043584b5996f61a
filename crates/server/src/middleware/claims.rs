//! Bearer token middleware.
//!
//! Turns a valid `Authorization: Bearer v1.<id>.<sig>` header into
//! [`IdentityClaims`] in the request extensions. Anything else, including a
//! bad signature, leaves the request without claims; whether that matters
//! is decided later by the resolver.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::services::credentials::IdentityClaims;
use crate::state::AppState;

/// Claim type carrying the account id.
pub const SUBJECT_CLAIM: &str = "sub";

/// Verify a bearer token, if present, and attach its claims.
pub async fn bearer_claims_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim);

    if let Some(token) = token {
        match state.tokens().verify(token) {
            Some(account) => {
                let claims = IdentityClaims::new().with(SUBJECT_CLAIM, account.to_string());
                request.extensions_mut().insert(claims);
            }
            None => tracing::debug!("Ignoring invalid bearer token"),
        }
    }

    next.run(request).await
}
