//! Session and claim keys.

/// Session keys for authentication data.
pub mod keys {
    /// Key holding the logged-in account id (an integer).
    pub const ACCOUNT_ID: &str = "account_id";
}

/// Claim types that may carry the caller's account id, in lookup order.
pub const IDENTITY_CLAIM_TYPES: &[&str] = &["sub", "account_id"];
