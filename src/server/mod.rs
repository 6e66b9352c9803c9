//! # Server Module
//!
//! Boundary between the host HTTP server and an [`crate::registry::ApiRouter`]:
//! the host builds a [`ParsedRequest`] (method, URI, headers, body, uploaded
//! files) and hands it to `ApiRouter::handle`.

pub mod request;

pub use request::{parse_body, parse_form_body, parse_query_params, ParsedRequest};
