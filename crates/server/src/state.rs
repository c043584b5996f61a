//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ServerConfig;
use crate::db::{
    AccountStore, MemoryAccountStore, MemoryRecordStore, PgAccountStore, PgRecordStore,
    RecordStore,
};
use crate::models::{Client, Product, Supplier};
use crate::services::auth::AuthService;
use crate::services::credentials::CredentialResolver;
use crate::services::products::ProductService;
use crate::services::records::OwnedRecords;
use crate::services::tokens::TokenSigner;
use crate::storage::BlobGateway;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the stores, the blob gateway and the identity resolver.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: Option<PgPool>,
    accounts: Box<dyn AccountStore>,
    clients: Box<dyn RecordStore<Client>>,
    suppliers: Box<dyn RecordStore<Supplier>>,
    products: Box<dyn RecordStore<Product>>,
    blobs: BlobGateway,
    resolver: CredentialResolver,
    tokens: TokenSigner,
}

impl AppState {
    /// State backed by `PostgreSQL`.
    #[must_use]
    pub fn postgres(config: ServerConfig, pool: PgPool, blobs: BlobGateway) -> Self {
        let stores = Stores {
            accounts: Box::new(PgAccountStore::new(pool.clone())),
            clients: Box::new(PgRecordStore::new(pool.clone())),
            suppliers: Box::new(PgRecordStore::new(pool.clone())),
            products: Box::new(PgRecordStore::new(pool.clone())),
        };
        Self::build(config, Some(pool), stores, blobs)
    }

    /// State backed by in-memory stores. Nothing survives a restart.
    #[must_use]
    pub fn in_memory(config: ServerConfig, blobs: BlobGateway) -> Self {
        let stores = Stores {
            accounts: Box::new(MemoryAccountStore::new()),
            clients: Box::new(MemoryRecordStore::new()),
            suppliers: Box::new(MemoryRecordStore::new()),
            products: Box::new(MemoryRecordStore::new()),
        };
        Self::build(config, None, stores, blobs)
    }

    fn build(
        config: ServerConfig,
        pool: Option<PgPool>,
        stores: Stores,
        blobs: BlobGateway,
    ) -> Self {
        let tokens = TokenSigner::new(config.session_secret.clone());
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                accounts: stores.accounts,
                clients: stores.clients,
                suppliers: stores.suppliers,
                products: stores.products,
                blobs,
                resolver: CredentialResolver::standard(),
                tokens,
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Database pool, absent in in-memory mode.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }

    #[must_use]
    pub fn blobs(&self) -> &BlobGateway {
        &self.inner.blobs
    }

    #[must_use]
    pub fn resolver(&self) -> &CredentialResolver {
        &self.inner.resolver
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenSigner {
        &self.inner.tokens
    }

    /// Raw account store, for tooling that bypasses validation.
    #[must_use]
    pub fn account_store(&self) -> &dyn AccountStore {
        self.inner.accounts.as_ref()
    }

    /// Account operations.
    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(self.inner.accounts.as_ref())
    }

    #[must_use]
    pub fn clients(&self) -> OwnedRecords<'_, Client> {
        OwnedRecords::new(self.inner.clients.as_ref())
    }

    #[must_use]
    pub fn suppliers(&self) -> OwnedRecords<'_, Supplier> {
        OwnedRecords::new(self.inner.suppliers.as_ref())
    }

    /// Product operations with image handling.
    #[must_use]
    pub fn products(&self) -> ProductService<'_> {
        ProductService::new(self.inner.products.as_ref(), &self.inner.blobs)
    }
}

struct Stores {
    accounts: Box<dyn AccountStore>,
    clients: Box<dyn RecordStore<Client>>,
    suppliers: Box<dyn RecordStore<Supplier>>,
    products: Box<dyn RecordStore<Product>>,
}
