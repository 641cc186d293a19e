//! Guarded application shell pages
//!
//! The real expense UI is out of scope here; these pages are the minimal
//! shell the route guard protects. Handlers extract [`CurrentIdentity`]
//! so a request that somehow bypassed the guard still gets a 401 instead
//! of a rendered page.

use axum::{
    Router,
    response::{Html, IntoResponse},
    routing::get,
};

use crate::AppState;
use crate::auth::CurrentIdentity;

/// Create application page router
///
/// Routes:
/// - GET / - Home
/// - GET /expenses - Expense overview
pub fn pages_router() -> Router<AppState> {
    Router::new()
        .route("/", get(index_page))
        .route("/expenses", get(expenses_page))
}

fn page_shell(title: &str, body: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{title} - Pocketledger</title>
</head>
<body>
    <header>
        <nav>
            <a href="/">Home</a>
            <a href="/expenses">Expenses</a>
        </nav>
    </header>
    <main>
        {body}
    </main>
</body>
</html>
"#
    ))
}

/// GET /
async fn index_page(CurrentIdentity(_identity): CurrentIdentity) -> impl IntoResponse {
    page_shell(
        "Home",
        "<h1>Pocketledger</h1>\n        <p>You are signed in.</p>",
    )
}

/// GET /expenses
async fn expenses_page(CurrentIdentity(_identity): CurrentIdentity) -> impl IntoResponse {
    page_shell(
        "Expenses",
        "<h1>Expenses</h1>\n        <p>No expenses recorded yet.</p>",
    )
}
