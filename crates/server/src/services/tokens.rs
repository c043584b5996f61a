//! Signed bearer tokens carrying an account id.
//!
//! Format: `v1.<account id>.<hex HMAC-SHA256 of "v1.<account id>">`, keyed
//! with the session secret. Tokens have no expiry; rotating the secret
//! revokes all of them.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use thiserror::Error;

use cadastro_core::AccountId;

const VERSION: &str = "v1";

/// The signing key was rejected by the MAC.
#[derive(Debug, Error)]
#[error("invalid token signing key")]
pub struct SigningKeyError;

/// Issues and verifies bearer tokens.
#[derive(Clone)]
pub struct TokenSigner {
    secret: SecretString,
}

impl TokenSigner {
    /// Create a signer keyed with `secret`.
    #[must_use]
    pub const fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Mint a token for `account`.
    ///
    /// # Errors
    ///
    /// Returns `SigningKeyError` if the secret cannot key the MAC.
    pub fn issue(&self, account: AccountId) -> Result<String, SigningKeyError> {
        let payload = format!("{VERSION}.{account}");
        let signature = self.sign(&payload)?;
        Ok(format!("{payload}.{signature}"))
    }

    /// Verify a token and return the account id it carries.
    ///
    /// Returns `None` for malformed tokens, unknown versions and bad signatures.
    #[must_use]
    pub fn verify(&self, token: &str) -> Option<AccountId> {
        let (payload, signature) = token.rsplit_once('.')?;
        let (version, id) = payload.split_once('.')?;
        if version != VERSION {
            return None;
        }

        let expected = self.sign(payload).ok()?;
        if !constant_time_compare(&expected, signature) {
            return None;
        }

        id.parse().ok()
    }

    fn sign(&self, payload: &str) -> Result<String, SigningKeyError> {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| SigningKeyError)?;
        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner").field("secret", &"[REDACTED]").finish()
    }
}

/// Constant-time string comparison to prevent timing attacks.
pub(crate) fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}
