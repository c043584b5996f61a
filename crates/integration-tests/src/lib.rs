//! Integration test harness for Cadastro.
//!
//! Builds the full router with in-memory stores, a `MemoryStore` session
//! store and local image storage in a temporary directory, then drives it
//! in-process with `tower::ServiceExt::oneshot`. No database or network is
//! needed.
//!
//! Each [`TestClient`] keeps its own session cookie, so two clients act as
//! two independent callers.
//!
//! ```rust,ignore
//! let app = TestApp::new();
//! let mut ana = app.client();
//! ana.signup("Ana", "ana@exemplo.com").await;
//! let response = ana.get("/api/clientes").await;
//! assert_eq!(response.status, StatusCode::OK);
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::{Path, PathBuf};

use axum::Router;
use axum::body::{Body, Bytes, to_bytes};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use secrecy::SecretString;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;
use tower_sessions::MemoryStore;

use cadastro_core::AccountId;
use cadastro_server::app;
use cadastro_server::config::{ServerConfig, StorageConfig, StorageMode};
use cadastro_server::middleware::session::SESSION_COOKIE_NAME;
use cadastro_server::state::AppState;
use cadastro_server::storage::BlobGateway;

/// Session secret used by every test app.
pub const SESSION_SECRET: &str = "Xq7#mP2$vL9@kR4!wN8^tB3&hJ6*cF1%";

/// Password used by [`TestClient::signup`].
pub const DEFAULT_PASSWORD: &str = "123456";

/// Image size limit used by every test app.
pub const MAX_UPLOAD_BYTES: usize = 64 * 1024;

/// A fully wired application over in-memory stores.
pub struct TestApp {
    router: Router,
    state: AppState,
    uploads: TempDir,
}

impl TestApp {
    /// App without debug routes.
    #[must_use]
    pub fn new() -> Self {
        Self::build(false)
    }

    /// App with the raw-credential debug route mounted.
    #[must_use]
    pub fn with_debug_routes() -> Self {
        Self::build(true)
    }

    fn build(debug_routes: bool) -> Self {
        let uploads = TempDir::new().expect("Failed to create uploads dir");

        let config = ServerConfig {
            database_url: None,
            host: [127, 0, 0, 1].into(),
            port: 0,
            base_url: "http://localhost:8080".to_string(),
            session_secret: SecretString::from(SESSION_SECRET),
            debug_routes,
            storage: StorageConfig {
                mode: StorageMode::Local,
                uploads_dir: uploads.path().to_path_buf(),
                max_upload_bytes: MAX_UPLOAD_BYTES,
                remote: None,
            },
            sentry_dsn: None,
            sentry_environment: None,
        };

        let blobs = BlobGateway::from_config(&config.storage).expect("Failed to build gateway");
        let state = AppState::in_memory(config, blobs);
        let router = app(state.clone(), MemoryStore::default());

        Self {
            router,
            state,
            uploads,
        }
    }

    /// A new caller with an empty cookie jar.
    #[must_use]
    pub fn client(&self) -> TestClient {
        TestClient {
            router: self.router.clone(),
            cookie: None,
            bearer: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> &AppState {
        &self.state
    }

    /// Uploads root of this app.
    #[must_use]
    pub fn uploads_dir(&self) -> &Path {
        self.uploads.path()
    }

    /// Filesystem path behind a local `uploads/<name>` reference.
    #[must_use]
    pub fn upload_path(&self, reference: &str) -> PathBuf {
        let name = reference.strip_prefix("uploads/").unwrap_or(reference);
        self.uploads.path().join(name)
    }

    /// Bearer token for `account`, as `cadastro accounts issue-token` prints it.
    #[must_use]
    pub fn token_for(&self, account: i32) -> String {
        self.state
            .tokens()
            .issue(AccountId::new(account))
            .expect("Failed to sign token")
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// A response with its body read.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    /// Body parsed as JSON.
    #[must_use]
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or_else(|e| {
            panic!(
                "Response body is not JSON ({e}): {}",
                String::from_utf8_lossy(&self.body)
            )
        })
    }
}

/// A multipart form body.
#[derive(Debug, Default, Clone)]
pub struct Form {
    texts: Vec<(String, String)>,
    files: Vec<(String, String, String, Vec<u8>)>,
}

impl Form {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Product form with the four text fields.
    #[must_use]
    pub fn product(description: &str, quantity: &str, price: &str, supplier: &str) -> Self {
        Self::new()
            .text("descricao", description)
            .text("quantidade", quantity)
            .text("valor", price)
            .text("fornecedor", supplier)
    }

    #[must_use]
    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.texts.push((name.to_string(), value.to_string()));
        self
    }

    #[must_use]
    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.files.push((
            name.to_string(),
            file_name.to_string(),
            content_type.to_string(),
            bytes.to_vec(),
        ));
        self
    }

    fn encode(&self) -> (String, Vec<u8>) {
        let boundary = format!("----cadastro{}", uuid::Uuid::new_v4().simple());
        let mut body = Vec::new();

        for (name, value) in &self.texts {
            body.extend_from_slice(
                format!(
                    "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        for (name, file_name, content_type, bytes) in &self.files {
            body.extend_from_slice(
                format!(
                    "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

        (format!("multipart/form-data; boundary={boundary}"), body)
    }
}

/// One caller: a session cookie jar plus an optional bearer token.
#[derive(Clone)]
pub struct TestClient {
    router: Router,
    cookie: Option<String>,
    bearer: Option<String>,
}

impl TestClient {
    /// Send every following request with `Authorization: Bearer <token>`.
    #[must_use]
    pub fn with_bearer(mut self, token: &str) -> Self {
        self.bearer = Some(token.to_string());
        self
    }

    /// Whether the client currently holds a session cookie.
    #[must_use]
    pub const fn has_session(&self) -> bool {
        self.cookie.is_some()
    }

    /// Send a request, attaching and updating the session cookie.
    pub async fn send(
        &mut self,
        method: Method,
        uri: &str,
        content_type: Option<&str>,
        body: Body,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(content_type) = content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        if let Some(cookie) = &self.cookie {
            builder = builder.header(COOKIE, cookie);
        }
        if let Some(token) = &self.bearer {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = builder.body(body).expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .unwrap_or_else(|never| match never {});

        self.store_cookie(response.headers());

        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");

        TestResponse {
            status,
            headers,
            body,
        }
    }

    fn store_cookie(&mut self, headers: &HeaderMap) {
        for value in headers.get_all(SET_COOKIE) {
            let Ok(value) = value.to_str() else {
                continue;
            };
            let pair = value.split(';').next().unwrap_or_default().trim();
            let Some((name, cookie_value)) = pair.split_once('=') else {
                continue;
            };
            if name != SESSION_COOKIE_NAME {
                continue;
            }

            let expired = value.to_ascii_lowercase().contains("max-age=0");
            self.cookie = if cookie_value.is_empty() || expired {
                None
            } else {
                Some(pair.to_string())
            };
        }
    }

    pub async fn get(&mut self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None, Body::empty()).await
    }

    pub async fn delete(&mut self, uri: &str) -> TestResponse {
        self.send(Method::DELETE, uri, None, Body::empty()).await
    }

    pub async fn post_json(&mut self, uri: &str, body: &Value) -> TestResponse {
        self.send(
            Method::POST,
            uri,
            Some("application/json"),
            Body::from(body.to_string()),
        )
        .await
    }

    pub async fn put_json(&mut self, uri: &str, body: &Value) -> TestResponse {
        self.send(
            Method::PUT,
            uri,
            Some("application/json"),
            Body::from(body.to_string()),
        )
        .await
    }

    pub async fn post_form(&mut self, uri: &str, form: &Form) -> TestResponse {
        let (content_type, body) = form.encode();
        self.send(Method::POST, uri, Some(&content_type), Body::from(body))
            .await
    }

    pub async fn put_form(&mut self, uri: &str, form: &Form) -> TestResponse {
        let (content_type, body) = form.encode();
        self.send(Method::PUT, uri, Some(&content_type), Body::from(body))
            .await
    }

    /// Register an account and return its id.
    ///
    /// # Panics
    ///
    /// Panics if registration does not return 201.
    pub async fn register(&mut self, name: &str, email: &str, password: &str) -> i32 {
        let response = self
            .post_json(
                "/api/usuarios",
                &json!({ "nome": name, "email": email, "senha": password }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        let id = response.json()["id"].as_i64().expect("id in response");
        i32::try_from(id).expect("id fits i32")
    }

    pub async fn login(&mut self, email: &str, password: &str) -> TestResponse {
        self.post_json(
            "/api/usuarios/login",
            &json!({ "email": email, "senha": password }),
        )
        .await
    }

    /// Register with [`DEFAULT_PASSWORD`] and log in. Returns the account id.
    ///
    /// # Panics
    ///
    /// Panics if either step fails.
    pub async fn signup(&mut self, name: &str, email: &str) -> i32 {
        let id = self.register(name, email, DEFAULT_PASSWORD).await;
        let response = self.login(email, DEFAULT_PASSWORD).await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
        id
    }
}
