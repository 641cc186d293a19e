//! Pocketledger - A minimal self-hosted expense tracker with single-sign-on
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - Login / sign-in / callback routes                        │
//! │  - Guarded application shell pages                          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Route Guard                             │
//! │  - Per-request session read                                 │
//! │  - Redirect-to-login decision                               │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 External Auth Service                        │
//! │  - Identity, session cookies, OAuth mechanics               │
//! │  - GoTrue-compatible HTTP API (reqwest)                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers for the application shell
//! - `auth`: Login flow, callback exchange, route guard
//! - `config`: Configuration management
//! - `error`: Error types
//! - `metrics`: Prometheus instruments

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// This struct is cloned for each request. The auth backend is held as a
/// trait object so tests can substitute a fake for the real HTTP client.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// External auth service client
    pub auth: Arc<dyn auth::AuthBackend>,
}

impl AppState {
    /// Initialize application state
    ///
    /// Constructs the auth service client from configuration. Fails when
    /// the auth service endpoint or key is missing or malformed.
    pub fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        let backend = auth::GoTrueClient::new(&config.auth, &config.server.base_url())?;
        Ok(Self::with_backend(config, Arc::new(backend)))
    }

    /// Initialize application state with an explicit auth backend
    ///
    /// Used by tests to inject a scripted backend.
    pub fn with_backend(config: config::AppConfig, auth: Arc<dyn auth::AuthBackend>) -> Self {
        Self {
            config: Arc::new(config),
            auth,
        }
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
///
/// The guard wraps the auth routes, the shell pages, and the 404
/// fallback; `/health` and `/metrics` sit outside it.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::{compression::CompressionLayer, trace::TraceLayer};

    let cors_layer = build_cors_layer(&state.config.server);

    Router::new()
        .merge(auth::auth_router())
        .merge(api::pages_router())
        .fallback(not_found)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth::require_session,
        ))
        .route("/health", axum::routing::get(health_check))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
        .merge(api::metrics_router())
}

fn build_cors_layer(server: &config::ServerConfig) -> tower_http::cors::CorsLayer {
    use axum::http::HeaderValue;
    use tower_http::cors::{Any, CorsLayer};

    if !server.protocol.eq_ignore_ascii_case("https") {
        return CorsLayer::permissive();
    }

    let allowed_origin = server.base_url();
    match HeaderValue::from_str(&allowed_origin) {
        Ok(origin) => CorsLayer::new()
            .allow_origin([origin])
            .allow_methods(Any)
            .allow_headers(Any),
        Err(error) => {
            tracing::error!(
                %error,
                origin = %allowed_origin,
                "Failed to parse CORS origin from server base URL; denying cross-origin requests"
            );
            CorsLayer::new().allow_methods(Any).allow_headers(Any)
        }
    }
}

async fn health_check() -> &'static str {
    "OK"
}

async fn not_found() -> error::AppError {
    error::AppError::NotFound
}
