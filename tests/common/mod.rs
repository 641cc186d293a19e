//! Common test utilities for E2E tests
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::async_trait;
use pocketledger::auth::{AuthBackend, Identity, SessionSnapshot};
use pocketledger::error::AppError;
use pocketledger::{AppState, config};
use tokio::net::TcpListener;

/// Scriptable auth backend standing in for the external auth service.
///
/// Every knob is interior-mutable so tests can flip behavior mid-flow
/// while the server holds the same `Arc<StubAuth>`.
pub struct StubAuth {
    /// Identity returned by session lookups (when set)
    identity: Mutex<Option<Identity>>,
    /// When true, recognize the cookies issued by `exchange_code`
    authenticate_by_cookie: Mutex<bool>,
    /// Set-Cookie values attached to session lookups (token refresh)
    lookup_set_cookies: Mutex<Vec<String>>,
    /// When true, session lookups fail at the transport level
    fail_lookup: Mutex<bool>,
    /// When true, code exchanges fail (e.g. consumed code)
    fail_exchange: Mutex<bool>,
    /// When true, building the authorize URL fails
    fail_authorize: Mutex<bool>,
    /// Codes the server forwarded for exchange, in order
    exchanged_codes: Mutex<Vec<String>>,
}

/// Cookie the stub issues on a successful exchange and recognizes when
/// `authenticate_by_cookie` is on.
pub const STUB_SESSION_COOKIE: &str = "sb-access-token=stub-token";

impl Default for StubAuth {
    fn default() -> Self {
        Self {
            identity: Mutex::new(None),
            authenticate_by_cookie: Mutex::new(false),
            lookup_set_cookies: Mutex::new(Vec::new()),
            fail_lookup: Mutex::new(false),
            fail_exchange: Mutex::new(false),
            fail_authorize: Mutex::new(false),
            exchanged_codes: Mutex::new(Vec::new()),
        }
    }
}

impl StubAuth {
    pub fn set_identity(&self, user: serde_json::Value) {
        *self.identity.lock().unwrap() = Some(Identity::from(user));
    }

    pub fn clear_identity(&self) {
        *self.identity.lock().unwrap() = None;
    }

    pub fn authenticate_by_cookie(&self, enabled: bool) {
        *self.authenticate_by_cookie.lock().unwrap() = enabled;
    }

    pub fn set_lookup_cookies(&self, cookies: Vec<String>) {
        *self.lookup_set_cookies.lock().unwrap() = cookies;
    }

    pub fn fail_lookup(&self, enabled: bool) {
        *self.fail_lookup.lock().unwrap() = enabled;
    }

    pub fn fail_exchange(&self, enabled: bool) {
        *self.fail_exchange.lock().unwrap() = enabled;
    }

    pub fn fail_authorize(&self, enabled: bool) {
        *self.fail_authorize.lock().unwrap() = enabled;
    }

    pub fn exchanged_codes(&self) -> Vec<String> {
        self.exchanged_codes.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuthBackend for StubAuth {
    async fn current_identity(&self, cookie_header: &str) -> Result<SessionSnapshot, AppError> {
        if *self.fail_lookup.lock().unwrap() {
            return Err(AppError::AuthService(
                "auth service unavailable".to_string(),
            ));
        }

        let mut identity = self.identity.lock().unwrap().clone();
        if identity.is_none()
            && *self.authenticate_by_cookie.lock().unwrap()
            && cookie_header.contains(STUB_SESSION_COOKIE)
        {
            identity = Some(Identity::from(serde_json::json!({ "id": "stub-user" })));
        }

        Ok(SessionSnapshot {
            identity,
            set_cookies: self.lookup_set_cookies.lock().unwrap().clone(),
        })
    }

    async fn exchange_code(
        &self,
        code: &str,
        _cookie_header: &str,
    ) -> Result<Vec<String>, AppError> {
        self.exchanged_codes.lock().unwrap().push(code.to_string());

        if *self.fail_exchange.lock().unwrap() {
            return Err(AppError::AuthService(
                "code exchange returned 400 Bad Request".to_string(),
            ));
        }

        Ok(vec![format!("{}; Path=/; HttpOnly", STUB_SESSION_COOKIE)])
    }

    fn authorize_url(&self, redirect_target: &str) -> Result<String, AppError> {
        if *self.fail_authorize.lock().unwrap() {
            return Err(AppError::AuthService(
                "provider rejected the sign-in request".to_string(),
            ));
        }

        Ok(format!(
            "https://auth.test.example.com/auth/v1/authorize?provider=google&redirect_to={}",
            urlencoding::encode(&format!(
                "http://test.example.com/auth/callback?redirect_to={}",
                urlencoding::encode(redirect_target)
            ))
        ))
    }
}

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub auth: Arc<StubAuth>,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance with a default stub backend
    pub async fn new() -> Self {
        Self::with_auth(StubAuth::default()).await
    }

    /// Create a new test server instance around the given stub backend
    pub async fn with_auth(auth: StubAuth) -> Self {
        pocketledger::metrics::init_metrics();

        let auth = Arc::new(auth);

        // Create test configuration
        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
                domain: "test.example.com".to_string(),
                protocol: "http".to_string(),
            },
            auth: config::AuthConfig {
                service_url: "https://auth.test.example.com".to_string(),
                anon_key: "test-anon-key".to_string(),
                provider: "google".to_string(),
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        // Initialize app state with the stub backend
        let state = AppState::with_backend(config, auth.clone());

        // Create HTTP client
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        // Build router
        let app = pocketledger::build_router(state);

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            auth,
            client,
        }
    }

    /// Get base URL for requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }
}

/// Client that surfaces redirects instead of following them
pub fn no_redirect_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(std::time::Duration::from_secs(10))
        .build()
        .expect("failed to build no-redirect client")
}

/// Extract the Location header from a redirect response
pub fn location_of(response: &reqwest::Response) -> String {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("location header")
        .to_string()
}
