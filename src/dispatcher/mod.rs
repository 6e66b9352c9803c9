//! # Dispatcher Module
//!
//! Request and response types shared by the router, the middleware chain and
//! endpoint callbacks, plus the callback adapters.
//!
//! ## Callbacks
//!
//! A [`Handler`] receives the (already validated) request and either answers
//! or passes control to the next callback bound on the same route:
//!
//! ```rust
//! use apirouter::dispatcher::{api_handler, handler, HandlerOutcome};
//! use serde_json::json;
//!
//! // Low-level: decide between answering and falling through
//! let audit = handler(|req| {
//!     req.body.insert("audited".into(), json!(true));
//!     HandlerOutcome::Next
//! });
//!
//! // Envelope-producing: `Ok` becomes `{ error: SUCCESS, result }`
//! let show = api_handler(|req| Ok(json!({ "name": req.query.get("name") })));
//! # let _ = (audit, show);
//! ```
//!
//! ## Error Handling
//!
//! [`api_handler`] separates deliberate API errors (sent to the client as-is)
//! from faults and panics (logged, answered with a generic `INTERNAL_ERROR`).

mod core;

pub use core::{
    api_handler, handler, FileField, Handler, HandlerOutcome, HandlerRequest, HandlerResponse,
    HeaderVec, ParamVec, UploadedFile, MAX_INLINE_HEADERS, MAX_INLINE_PARAMS,
};
