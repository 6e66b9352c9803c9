//! # CLI Module
//!
//! Operational commands over the routers declared in a manifest
//! (see [`crate::manifest`]).
//!
//! ## Commands
//!
//! ```bash
//! apirouter --manifest config/routers.yaml routers        # list router names
//! apirouter --manifest config/routers.yaml collections    # uid -> routers
//! apirouter --manifest config/routers.yaml routes auth    # dump endpoints
//! apirouter --manifest config/routers.yaml sync auth      # sync one router
//! apirouter --manifest config/routers.yaml sync '*'       # sync everything
//! ```
//!
//! The manifest path can also come from `APIROUTER_MANIFEST`. Postman settings
//! (`POSTMAN_API_URL`, `POSTMAN_TIMEOUT_SECS`) and display settings
//! (`API_URL`, `API_PORT`, `API_PROTOCOL`) are read from the environment.
//!
//! ## Usage from Code
//!
//! A host application that builds its routers in code can expose the same
//! commands:
//!
//! ```rust
//! use apirouter::cli::{run_command, Commands};
//! use apirouter::registry::{ApiRouter, ApiRouterOptions, RouterRegistry};
//!
//! let registry = RouterRegistry::new();
//! registry.register(ApiRouter::new(ApiRouterOptions::default().name("auth")));
//!
//! let mut out = Vec::new();
//! run_command(&registry, &Commands::Routers, &mut out).unwrap();
//! assert_eq!(String::from_utf8(out).unwrap(), "auth\n");
//! ```

mod commands;


pub use commands::{run_cli, run_command, run_command_with, Cli, Commands};
