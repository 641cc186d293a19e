//! Route guard middleware
//!
//! Evaluated before every application route. Redirects unauthenticated
//! visitors to the login page, preserving their original destination, and
//! threads the per-request [`AuthContext`] to handlers via extensions.

use axum::{
    async_trait,
    extract::{Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use super::session::{AuthContext, Identity, append_set_cookies, read_session};
use crate::AppState;
use crate::error::AppError;
use crate::metrics::GUARD_DECISIONS_TOTAL;

const LOGIN_PATH: &str = "/login";
const CALLBACK_PATH: &str = "/auth/callback";
const SIGN_IN_PATH: &str = "/auth/sign-in";

/// Paths reachable without a session.
///
/// The login page and the callback route per the guard's contract, plus
/// the sign-in trigger: it is only ever reached from the login page, and
/// guarding it would bounce the visitor straight back there.
fn is_public_path(path: &str) -> bool {
    path.starts_with(LOGIN_PATH) || path.starts_with(CALLBACK_PATH) || path.starts_with(SIGN_IN_PATH)
}

/// Login URL carrying the originally requested path as a return target.
fn login_redirect_target(original: &str) -> String {
    format!("{}?redirect={}", LOGIN_PATH, urlencoding::encode(original))
}

/// Middleware guarding the route tree.
///
/// Runs from scratch on every request; nothing is cached across requests.
/// The session is read exactly once per request, then:
/// - no identity on a non-public path: redirect to the login page,
/// - otherwise: insert [`AuthContext`] into request extensions and proceed.
///
/// `Set-Cookie` values issued during the session lookup (token refresh)
/// are relayed onto whichever response goes out.
///
/// # Usage
/// ```ignore
/// let app = Router::new()
///     .route("/", get(index))
///     .layer(middleware::from_fn_with_state(state, require_session));
/// ```
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let snapshot = read_session(request.headers(), state.auth.as_ref()).await;

    let original = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());

    if snapshot.identity.is_none() && !is_public_path(request.uri().path()) {
        GUARD_DECISIONS_TOTAL
            .with_label_values(&["redirect"])
            .inc();
        tracing::debug!(path = %original, "Unauthenticated request; redirecting to login");

        let mut response = Redirect::to(&login_redirect_target(&original)).into_response();
        append_set_cookies(&mut response, &snapshot.set_cookies);
        return response;
    }

    GUARD_DECISIONS_TOTAL.with_label_values(&["allow"]).inc();
    request.extensions_mut().insert(AuthContext {
        identity: snapshot.identity,
    });

    let mut response = next.run(request).await;
    append_set_cookies(&mut response, &snapshot.set_cookies);
    response
}

/// Extractor for the current authenticated identity
///
/// Rejects with 401 when the guard found no session. Handlers behind the
/// guard can rely on it succeeding.
///
/// # Usage
/// ```ignore
/// async fn handler(CurrentIdentity(identity): CurrentIdentity) -> impl IntoResponse {
///     // ...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentIdentity(pub Identity);

#[async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .and_then(|context| context.identity.clone())
            .map(CurrentIdentity)
            .ok_or(AppError::Unauthorized)
    }
}

/// Optional identity extractor
///
/// Returns None if not authenticated, instead of error. Useful on public
/// routes that render differently for signed-in visitors.
#[derive(Debug, Clone)]
pub struct MaybeIdentity(pub Option<Identity>);

#[async_trait]
impl<S> axum::extract::FromRequestParts<S> for MaybeIdentity
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let identity = parts
            .extensions
            .get::<AuthContext>()
            .and_then(|context| context.identity.clone());
        Ok(MaybeIdentity(identity))
    }
}
