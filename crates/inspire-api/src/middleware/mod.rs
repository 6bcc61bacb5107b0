//! HTTP middleware shared by all routes
//!
//! Request authentication lives in `crate::auth::middleware`.

pub mod security_headers;

pub use security_headers::security_headers_middleware;
