//! Session reading
//!
//! The auth service owns session persistence entirely; sessions travel as
//! cookies whose names and values this code never interprets. Reading a
//! session means forwarding the raw cookie header to the service and asking
//! who, if anyone, it belongs to.

use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::Response;
use serde::{Deserialize, Serialize};

use super::backend::AuthBackend;
use crate::metrics::SESSION_LOOKUPS_TOTAL;

/// The signed-in visitor's record as returned by the auth service.
///
/// Opaque to this codebase: only presence or absence is ever inspected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity(serde_json::Value);

impl From<serde_json::Value> for Identity {
    fn from(value: serde_json::Value) -> Self {
        Identity(value)
    }
}

/// Result of one session lookup against the auth service.
///
/// Besides the identity (or none), carries any `Set-Cookie` values the
/// service issued during the lookup (e.g. a token refresh) so the caller
/// can relay them to the browser unmodified.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    pub identity: Option<Identity>,
    pub set_cookies: Vec<String>,
}

/// Per-request authentication context
///
/// Created by the route guard on every request and threaded to handlers
/// via request extensions. Never mutated after creation.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub identity: Option<Identity>,
}

impl AuthContext {
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }
}

/// Read the session carried by the incoming request's cookies.
///
/// A missing or invalid session is a normal, expected result, not an
/// error. Lookup failures (transport, auth service outage) are downgraded
/// to "no identity" with a warning; the guard then treats the request as
/// unauthenticated.
pub async fn read_session(headers: &HeaderMap, backend: &dyn AuthBackend) -> SessionSnapshot {
    let cookie_header = headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    match backend.current_identity(cookie_header).await {
        Ok(snapshot) => {
            let result = if snapshot.identity.is_some() {
                "present"
            } else {
                "absent"
            };
            SESSION_LOOKUPS_TOTAL.with_label_values(&[result]).inc();
            snapshot
        }
        Err(error) => {
            SESSION_LOOKUPS_TOTAL.with_label_values(&["error"]).inc();
            tracing::warn!(%error, "Session lookup failed; treating request as unauthenticated");
            SessionSnapshot::default()
        }
    }
}

/// Relay `Set-Cookie` values from the auth service onto a response.
///
/// Values that are not valid header values are dropped with a warning
/// rather than failing the whole response.
pub(crate) fn append_set_cookies(response: &mut Response, set_cookies: &[String]) {
    for value in set_cookies {
        match HeaderValue::from_str(value) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(error) => {
                tracing::warn!(%error, "Dropping malformed Set-Cookie value from auth service");
            }
        }
    }
}
