//! Domain models.
//!
//! Rust field names are English; the serde names are the Portuguese wire
//! names the API has always used (`nome`, `cpfCnpj`, `dataCadastro`, ...).

pub mod account;
pub mod client;
pub mod product;
pub mod session;
pub mod supplier;

pub use account::{
    Account, AccountCredential, ChangePasswordRequest, DebugAccount, LoginRequest, LoginResponse,
    RegisterRequest, UpdateAccountRequest,
};
pub use client::{Client, ClientDraft};
pub use product::{Product, ProductDraft, ProductFields};
pub use session::keys as session_keys;
pub use supplier::{Supplier, SupplierDraft};
