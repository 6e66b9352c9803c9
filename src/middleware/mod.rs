//! # Middleware Module
//!
//! Hooks run by the router around dispatch.
//!
//! - [`ValidationMiddleware`] is installed by [`crate::registry::ApiRouter::add`]
//!   on every endpoint route, ahead of the endpoint callbacks.
//! - [`TracingMiddleware`] wraps the whole router and logs each request with
//!   its latency and API code.

mod core;
mod tracing;
mod validation;

pub use core::Middleware;
pub use tracing::TracingMiddleware;
pub use validation::ValidationMiddleware;
