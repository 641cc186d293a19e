//! Login and callback routes
//!
//! Routes:
//! - GET /login - Login page with a single provider button
//! - GET /auth/sign-in - Redirect to the provider sign-in URL
//! - GET /auth/callback - Trade the authorization code for a session

use axum::{
    Router,
    extract::{Query, State},
    http::{HeaderMap, header},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use serde::Deserialize;

use super::session::append_set_cookies;
use crate::AppState;
use crate::metrics::CODE_EXCHANGES_TOTAL;

/// Create authentication router
///
/// Routes:
/// - GET /login - Login page
/// - GET /auth/sign-in - Redirect to provider
/// - GET /auth/callback - Authorization code exchange
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_page))
        .route("/auth/sign-in", get(sign_in))
        .route("/auth/callback", get(auth_callback))
}

/// Constrain a redirect target to a site-relative path.
///
/// Anything that is not a single-slash-rooted path falls back to `/`, so
/// the login and callback round trip can never bounce the browser
/// off-site. Protocol-relative `//host` forms are rejected, as is `/\`:
/// browsers normalize backslashes in Location URLs to slashes.
fn sanitize_redirect(target: Option<&str>) -> String {
    match target {
        Some(path)
            if path.starts_with('/')
                && !matches!(path.as_bytes().get(1), Some(b'/' | b'\\')) =>
        {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}

// =============================================================================
// Login Page
// =============================================================================

#[derive(Debug, Deserialize)]
struct LoginQuery {
    /// Path to return to after sign-in
    redirect: Option<String>,
    /// Inline error message from a failed sign-in attempt
    error: Option<String>,
}

/// GET /login
///
/// Renders a single-action login page. The button links to the sign-in
/// trigger with the preserved redirect target; a failed attempt comes
/// back here with `error` set and is rendered inline.
async fn login_page(Query(query): Query<LoginQuery>) -> impl IntoResponse {
    let redirect = sanitize_redirect(query.redirect.as_deref());
    let sign_in_href = format!("/auth/sign-in?redirect={}", urlencoding::encode(&redirect));

    let error_block = match query.error.as_deref() {
        Some(message) => format!(
            r#"<p class="error">{}</p>"#,
            html_escape::encode_text(message)
        ),
        None => String::new(),
    };

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>Login - Pocketledger</title>
</head>
<body>
    <main class="login-card">
        <h1>Pocketledger</h1>
        <p>Sign in to manage your expenses.</p>
        {error_block}
        <a class="button" href="{sign_in_href}">Continue with Google</a>
    </main>
</body>
</html>
"#
    ))
}

// =============================================================================
// Sign-in Trigger
// =============================================================================

#[derive(Debug, Deserialize)]
struct SignInQuery {
    redirect: Option<String>,
}

/// GET /auth/sign-in
///
/// Sends the browser to the provider sign-in URL. An immediate failure is
/// surfaced as an inline message back on the login page; no retry.
async fn sign_in(State(state): State<AppState>, Query(query): Query<SignInQuery>) -> Response {
    let redirect = sanitize_redirect(query.redirect.as_deref());

    match state.auth.authorize_url(&redirect) {
        Ok(url) => Redirect::to(&url).into_response(),
        Err(error) => {
            tracing::warn!(%error, "Failed to build provider sign-in URL");
            let back = format!(
                "/login?redirect={}&error={}",
                urlencoding::encode(&redirect),
                urlencoding::encode(&error.to_string())
            );
            Redirect::to(&back).into_response()
        }
    }
}

// =============================================================================
// Callback Exchange
// =============================================================================

/// Query parameters appended by the auth service's redirect
#[derive(Debug, Deserialize)]
struct CallbackQuery {
    /// One-time authorization code
    code: Option<String>,
    /// Path to return to after the exchange
    redirect_to: Option<String>,
}

/// GET /auth/callback
///
/// If a code is present, trades it for an established session exactly
/// once; the `Set-Cookie` values returned by the auth service are what
/// establish the session in the browser.
///
/// Always redirects to `redirect_to` (default `/`) afterward, clearing
/// the one-time code from the visible URL. A failed exchange is logged
/// and counted, then the redirect still fires: the visitor lands back in
/// the guard flow unauthenticated and is bounced to the login page,
/// rather than stranded on an error page holding a dead code. This also
/// keeps a replayed, already-consumed code harmless.
async fn auth_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let redirect_to = sanitize_redirect(query.redirect_to.as_deref());
    let mut response = Redirect::to(&redirect_to).into_response();

    if let Some(code) = query.code.as_deref() {
        let cookie_header = headers
            .get(header::COOKIE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("");

        match state.auth.exchange_code(code, cookie_header).await {
            Ok(set_cookies) => {
                CODE_EXCHANGES_TOTAL.with_label_values(&["ok"]).inc();
                append_set_cookies(&mut response, &set_cookies);
            }
            Err(error) => {
                CODE_EXCHANGES_TOTAL.with_label_values(&["failed"]).inc();
                tracing::warn!(%error, "Authorization code exchange failed");
            }
        }
    }

    response
}
