//! Single-sign-on authentication shell
//!
//! Handles:
//! - Login page and provider sign-in trigger
//! - Authorization code exchange (callback route)
//! - Route guard middleware and identity extractors
//!
//! All identity, session-cookie, and OAuth mechanics are owned by the
//! external auth service; this module orchestrates.

mod backend;
mod guard;
mod routes;
pub mod session;

pub use backend::{AuthBackend, GoTrueClient};
pub use guard::{CurrentIdentity, MaybeIdentity, require_session};
pub use routes::auth_router;
pub use session::{AuthContext, Identity, SessionSnapshot};

#[cfg(test)]
pub use backend::MockAuthBackend;
