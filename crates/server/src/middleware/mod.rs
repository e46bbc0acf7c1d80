//! HTTP middleware and extractors.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (capture errors, added in `main`)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Timeout body (renders an expired deadline as the standard error body)
//! 5. `TimeoutLayer` (per-request deadline; expiry drops the handler and any open unit of work)

pub mod auth;
pub mod request_id;

pub use auth::RequireAuth;
pub use request_id::request_id_middleware;
