//! HTTP middleware.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request tracing)
//! 3. Session layer (tower-sessions, in-memory store)
//! 4. Maintenance gate (public pages only)
//! 5. `RequireAdmin` extractor on admin handlers

pub mod auth;
pub mod maintenance;
pub mod session;

pub use auth::{LOGIN_PATH, RequireAdmin};
pub use maintenance::maintenance_gate;
pub use session::{SESSION_COOKIE_NAME, create_session_layer};
