//! Auth service client
//!
//! HTTP client for a GoTrue-compatible auth service (the kind Supabase
//! hosts). The service owns token issuance, session cookies, and the OAuth
//! dance with the upstream provider; this client plumbs a cookie-header
//! string in and `Set-Cookie` values back out, never interpreting either.

use axum::async_trait;
use reqwest::header;
use url::Url;

use super::session::{Identity, SessionSnapshot};
use crate::config::AuthConfig;
use crate::error::AppError;

/// Abstraction over the external auth service.
///
/// The guard and the callback route take this as an explicit dependency
/// (`Arc<dyn AuthBackend>`) so tests can substitute a fake.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Fetch the identity for the session carried by `cookie_header`.
    ///
    /// A missing or invalid session is `Ok` with no identity, never an
    /// error; errors mean the service itself could not be consulted.
    async fn current_identity(&self, cookie_header: &str) -> Result<SessionSnapshot, AppError>;

    /// Trade a one-time authorization code for an established session.
    ///
    /// Returns the `Set-Cookie` values the service issued; applying them
    /// to the response is what establishes the session in the browser.
    async fn exchange_code(
        &self,
        code: &str,
        cookie_header: &str,
    ) -> Result<Vec<String>, AppError>;

    /// Provider sign-in URL for the browser, with the callback URL
    /// (carrying the preserved redirect target) embedded.
    fn authorize_url(&self, redirect_target: &str) -> Result<String, AppError>;
}

/// Production `AuthBackend` over HTTP.
#[derive(Debug)]
pub struct GoTrueClient {
    service_url: Url,
    anon_key: String,
    provider: String,
    /// Absolute URL of this application's callback route,
    /// e.g. "https://spend.example.com/auth/callback"
    callback_url: String,
    http: reqwest::Client,
}

impl GoTrueClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    /// Refuses to construct when the service URL is missing/unparseable
    /// or the anon key is empty. Both are fatal startup conditions.
    pub fn new(auth: &AuthConfig, site_base_url: &str) -> Result<Self, AppError> {
        let service_url = Url::parse(auth.service_url.trim()).map_err(|e| {
            AppError::Config(format!(
                "auth.service_url is not a valid URL: {e}"
            ))
        })?;

        if auth.anon_key.trim().is_empty() {
            return Err(AppError::Config("auth.anon_key is required".to_string()));
        }

        let http = reqwest::Client::builder()
            .user_agent("Pocketledger/0.1.0")
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Internal(e.into()))?;

        Ok(Self {
            service_url,
            anon_key: auth.anon_key.trim().to_string(),
            provider: auth.provider.clone(),
            callback_url: format!("{}/auth/callback", site_base_url.trim_end_matches('/')),
            http,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, AppError> {
        self.service_url
            .join(path)
            .map_err(|e| AppError::Config(format!("invalid auth service endpoint {path}: {e}")))
    }
}

/// Collect `Set-Cookie` values from an auth service response.
fn collect_set_cookies(response: &reqwest::Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .map(ToOwned::to_owned)
        .collect()
}

#[async_trait]
impl AuthBackend for GoTrueClient {
    async fn current_identity(&self, cookie_header: &str) -> Result<SessionSnapshot, AppError> {
        let url = self.endpoint("/auth/v1/user")?;

        let mut request = self.http.get(url).header("apikey", &self.anon_key);
        if !cookie_header.is_empty() {
            request = request.header(header::COOKIE, cookie_header);
        }

        let response = request.send().await?;
        let set_cookies = collect_set_cookies(&response);
        let status = response.status();

        if status.is_success() {
            let user: serde_json::Value = response.json().await?;
            let identity = if user.is_null() {
                None
            } else {
                Some(Identity::from(user))
            };
            return Ok(SessionSnapshot {
                identity,
                set_cookies,
            });
        }

        // 4xx from the user endpoint means "no valid session", which is a
        // normal result for this call, not a failure.
        if status.is_client_error() {
            return Ok(SessionSnapshot {
                identity: None,
                set_cookies,
            });
        }

        Err(AppError::AuthService(format!(
            "identity lookup returned {status}"
        )))
    }

    async fn exchange_code(
        &self,
        code: &str,
        cookie_header: &str,
    ) -> Result<Vec<String>, AppError> {
        let mut url = self.endpoint("/auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", "pkce");

        let mut request = self
            .http
            .post(url)
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "auth_code": code }));
        if !cookie_header.is_empty() {
            request = request.header(header::COOKIE, cookie_header);
        }

        let response = request.send().await?;
        let set_cookies = collect_set_cookies(&response);
        let status = response.status();

        if status.is_success() {
            Ok(set_cookies)
        } else {
            Err(AppError::AuthService(format!(
                "code exchange returned {status}"
            )))
        }
    }

    fn authorize_url(&self, redirect_target: &str) -> Result<String, AppError> {
        let mut url = self.endpoint("/auth/v1/authorize")?;

        // The callback URL carries the visitor's original destination so
        // the round trip through the provider lands them back where they
        // started.
        let callback = format!(
            "{}?redirect_to={}",
            self.callback_url,
            urlencoding::encode(redirect_target)
        );
        url.query_pairs_mut()
            .append_pair("provider", &self.provider)
            .append_pair("redirect_to", &callback);

        Ok(url.to_string())
    }
}
