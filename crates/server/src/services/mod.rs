//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Account registration, login and password hashing
//! - `credentials` - Caller identity resolution (session, then bearer claims)
//! - `records` - Owner-scoped validation and not-found policy for records
//! - `products` - Product writes with image upload and cleanup
//! - `tokens` - Bearer token signing

pub mod auth;
pub mod credentials;
pub mod products;
pub mod records;
pub mod tokens;
