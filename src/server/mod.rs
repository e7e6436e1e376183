//! Server module
//!
//! HTTP surface of the gateway: route resolution, middleware, handlers,
//! TLS and the listener lifecycle.

pub mod handlers;
pub mod http;
pub mod middleware;
pub mod routes;
pub mod tls;

pub use http::{ApiConfig, ApiError, ApiServer, RunningApi};
