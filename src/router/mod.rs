//! # Router Module
//!
//! The in-process framework router every [`crate::registry::ApiRouter`] sits
//! on: express-style path patterns, method filters and an ordered chain of
//! middleware and handler stages.
//!
//! ## Matching
//!
//! Patterns are compiled once at registration into anchored regexes:
//!
//! | Pattern          | Matches                     | Path params        |
//! |------------------|-----------------------------|--------------------|
//! | `/users`         | `/users`, `/users/`         |                    |
//! | `/users/:id`     | `/users/42`                 | `id = "42"`        |
//! | `/files/:name?`  | `/files`, `/files/a.txt`    | `name` when given  |
//! | `/static/*`      | `/static/css/site.css`      | `0 = "css/site.css"` |
//!
//! ## Dispatch
//!
//! Layers are tried in registration order. A route-level middleware either
//! answers or lets the request continue; a handler either answers or returns
//! [`crate::dispatcher::HandlerOutcome::Next`]. When nothing answers the
//! router responds `FOUND` with HTTP 404.

mod core;
#[cfg(test)]
mod tests;

pub use core::{RoutePattern, Router, Stage};
