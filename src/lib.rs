//! # apirouter
//!
//! Declarative API endpoints with JSON-schema request validation, mirrored into
//! Postman collections.
//!
//! ## Overview
//!
//! An [`registry::ApiRouter`] holds endpoint declarations: named body
//! parameters, query parameters and uploaded files, each described with JSON
//! schema. Every request is validated against those declarations before the
//! endpoint callbacks run; failures are answered with a structured error body
//! and never reach the callbacks. The same declarations are exported as
//! Postman collection items by the [`postman`] synchronizer.
//!
//! ## Architecture
//!
//! - **[`endpoint`]** - Declarations and their normalized, immutable form
//! - **[`registry`]** - `ApiRouter` (endpoint registry) and `RouterRegistry`
//! - **[`validator`]** / **[`validator_cache`]** - Validation pipeline, schema registry and compiled-validator cache
//! - **[`router`]** - Path matching and the middleware/handler chain
//! - **[`middleware`]** - Validation and request logging stages
//! - **[`dispatcher`]** - Request/response types and handler adapters
//! - **[`server`]** - Boundary types for the host HTTP server
//! - **[`postman`]** - Collection rendering, merge and sync
//! - **[`manifest`]** / **[`cli`]** - Declarative router manifests and the `apirouter` binary
//!
//! ### Request Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Host as Host server
//!     participant Api as ApiRouter
//!     participant Router as router::Router
//!     participant Val as ValidationMiddleware
//!     participant Cb as Callbacks
//!
//!     Host->>Api: handle(ParsedRequest)
//!     Api->>Router: dispatch (path relative to mountpath)
//!     Router->>Val: before(req) on route + method match
//!     alt invalid
//!         Val-->>Host: { error: { code: 400, msg, data } }
//!     else valid
//!         Val->>Cb: decoded values written back
//!         Cb-->>Host: { error: { code: 200 }, result }
//!     end
//! ```
//!
//! ### Sync Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Sync as postman::update_postman
//!     participant API as Postman API
//!
//!     Sync->>API: GET /collections/{uid}
//!     API-->>Sync: collection document
//!     Sync->>Sync: merge items by name
//!     alt changed
//!         Sync->>API: PUT /collections/{uid}
//!     end
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use apirouter::dispatcher::api_handler;
//! use apirouter::endpoint::{EndpointDescriptor, FileDecl};
//! use apirouter::registry::{ApiRouter, ApiRouterOptions};
//! use apirouter::server::ParsedRequest;
//! use apirouter::dispatcher::UploadedFile;
//! use http::Method;
//! use serde_json::json;
//!
//! let router = ApiRouter::new(ApiRouterOptions::default());
//! router
//!     .add(
//!         EndpointDescriptor::new("/users/:id/avatar")
//!             .method(Method::POST)
//!             .param("crop", json!({ "type": "boolean" }))
//!             .file("avatar", FileDecl::required().mimetypes(["image/png"]))
//!             .callback(api_handler(|req| Ok(json!({ "crop": req.body.get("crop") })))),
//!     )
//!     .unwrap();
//!
//! let res = router.handle(
//!     ParsedRequest::new(Method::POST, "/users/1/avatar")
//!         .form_body("crop=true")
//!         .file("avatar", UploadedFile::new("me.gif", "image/gif")),
//! );
//! assert_eq!(res.body["error"]["msg"], json!("invalid mimetypes: `avatar`"));
//! ```
//!
//! ## Configuration
//!
//! - Display settings and the Postman API location: [`runtime_config::RuntimeConfig`]
//! - Logging: [`logging::init_logging`] (`RUST_LOG`, `APIROUTER_LOG_*`)

pub mod cli;
pub mod dispatcher;
pub mod endpoint;
pub mod error;
pub mod ids;
pub mod logging;
pub mod manifest;
pub mod middleware;
pub mod postman;
pub mod registry;
pub mod router;
pub mod runtime_config;
pub mod server;
pub mod validator;
pub mod validator_cache;

pub use error::{ApiError, ErrorCode, HandlerError, RegistrationError};
pub use registry::{ApiRouter, ApiRouterOptions, RouterRegistry};
