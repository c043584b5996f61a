//! Caller identity resolution.
//!
//! A [`CredentialResolver`] asks an ordered list of [`CredentialSource`]s
//! for the caller's account id and stops at the first answer. The standard
//! order is the server-side session first, then bearer identity claims.
//!
//! Resolution never fails: a caller nobody vouches for is simply
//! [`Resolution::Unauthenticated`], and the HTTP layer turns that into 401.

use async_trait::async_trait;
use tower_sessions::Session;

use cadastro_core::AccountId;

use crate::models::session::IDENTITY_CLAIM_TYPES;
use crate::models::session_keys;

/// Identity claims attached to a request by an upstream authenticator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityClaims {
    claims: Vec<(String, String)>,
}

impl IdentityClaims {
    /// Create an empty claim set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a claim.
    #[must_use]
    pub fn with(mut self, claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        self.claims.push((claim_type.into(), value.into()));
        self
    }

    /// Values of every claim of `claim_type`, in insertion order.
    pub fn values<'a>(&'a self, claim_type: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.claims
            .iter()
            .filter(move |(ty, _)| ty == claim_type)
            .map(|(_, value)| value.as_str())
    }
}

/// What a resolver knows about one request.
#[derive(Clone, Copy, Default)]
pub struct RequestContext<'a> {
    pub session: Option<&'a Session>,
    pub claims: Option<&'a IdentityClaims>,
}

/// Outcome of identity resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Found(AccountId),
    Unauthenticated,
}

/// One place a caller identity can come from.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// The account id this source vouches for, if any.
    async fn owner(&self, ctx: &RequestContext<'_>) -> Option<AccountId>;
}

/// Reads an integer account id stored in the session under a fixed key.
#[derive(Debug, Clone)]
pub struct SessionSource {
    key: &'static str,
}

impl SessionSource {
    #[must_use]
    pub const fn new(key: &'static str) -> Self {
        Self { key }
    }
}

impl Default for SessionSource {
    fn default() -> Self {
        Self::new(session_keys::ACCOUNT_ID)
    }
}

#[async_trait]
impl CredentialSource for SessionSource {
    async fn owner(&self, ctx: &RequestContext<'_>) -> Option<AccountId> {
        let session = ctx.session?;
        match session.get::<i32>(self.key).await {
            Ok(id) => id.map(AccountId::new),
            Err(e) => {
                tracing::debug!(error = %e, "Session lookup failed");
                None
            }
        }
    }
}

/// Reads the first claim, among the given types, whose value is an integer.
#[derive(Debug, Clone)]
pub struct ClaimsSource {
    claim_types: Vec<&'static str>,
}

impl ClaimsSource {
    #[must_use]
    pub fn new(claim_types: &[&'static str]) -> Self {
        Self {
            claim_types: claim_types.to_vec(),
        }
    }
}

impl Default for ClaimsSource {
    fn default() -> Self {
        Self::new(IDENTITY_CLAIM_TYPES)
    }
}

#[async_trait]
impl CredentialSource for ClaimsSource {
    async fn owner(&self, ctx: &RequestContext<'_>) -> Option<AccountId> {
        let claims = ctx.claims?;
        self.claim_types
            .iter()
            .flat_map(|ty| claims.values(*ty))
            .find_map(|value| value.parse::<AccountId>().ok())
    }
}

/// Ordered, first-match-wins identity resolver.
pub struct CredentialResolver {
    sources: Vec<Box<dyn CredentialSource>>,
}

impl CredentialResolver {
    /// Build a resolver that consults `sources` in order.
    #[must_use]
    pub fn new(sources: Vec<Box<dyn CredentialSource>>) -> Self {
        Self { sources }
    }

    /// Session first, then `sub` / `account_id` claims.
    #[must_use]
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(SessionSource::default()),
            Box::new(ClaimsSource::default()),
        ])
    }

    /// Resolve the caller of one request.
    pub async fn resolve(&self, ctx: &RequestContext<'_>) -> Resolution {
        for source in &self.sources {
            if let Some(id) = source.owner(ctx).await {
                return Resolution::Found(id);
            }
        }
        Resolution::Unauthenticated
    }
}

impl Default for CredentialResolver {
    fn default() -> Self {
        Self::standard()
    }
}
