//! HTTP middleware stack for admin.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, transaction per route)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (recorded on the span)
//! 4. Security headers (stricter than the storefront)
//! 5. Session layer (tower-sessions, `admin_session` table, SameSite=Strict)
//! 6. Login throttling (governor) and the body limit on the upload route
//! 7. [`RequireAdmin`] extractor on every handler except login and health

pub mod auth;
pub mod headers;
pub mod rate_limit;
pub mod session;

pub use auth::{RequireAdmin, clear_current_admin, set_current_admin};
pub use headers::{request_id_middleware, security_headers_middleware};
pub use rate_limit::login_rate_limiter;
pub use session::create_session_layer;
