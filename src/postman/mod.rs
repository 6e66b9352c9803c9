//! # Postman Module
//!
//! Mirrors a router's declared endpoints into a Postman collection.
//!
//! ## Flow
//!
//! 1. `GET {POSTMAN_API_URL}/collections/{uid}` with the `X-Api-Key` header
//! 2. [`update_postman_collection`] replaces items whose `name` matches an
//!    endpoint (keeping position, ids and saved responses) and appends the rest
//! 3. `PUT` the whole document back, unless the merge changed nothing
//!
//! [`update_all_collections`] groups routers by collection uid so each
//! collection is fetched and written once per run.
//!
//! ## Item Shape
//!
//! ```json
//! {
//!   "name": "login",
//!   "protocolProfileBehavior": { "disableBodyPruning": true },
//!   "request": {
//!     "method": "POST",
//!     "header": [],
//!     "body": { "mode": "formdata", "formdata": [
//!       { "key": "email", "value": "", "type": "text", "description": "(string, required) Account email" }
//!     ] },
//!     "url": { "raw": "https://localhost/auth/login", "protocol": "https",
//!              "host": ["localhost"], "path": ["auth", "login"], "query": [] },
//!     "description": "Log in"
//!   },
//!   "response": []
//! }
//! ```

mod client;
mod error;
mod merge;
pub mod render;
mod sync;

pub use client::PostmanClient;
pub use error::SyncError;
pub use merge::{update_postman_collection, MergeStats};
pub use sync::{
    sync_collection, sync_named, update_all_collections, update_postman, SyncOutcome, SyncReport,
};

use serde::Deserialize;
use std::fmt;

/// Postman credentials of one router.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct PostmanConfig {
    #[serde(alias = "apikey")]
    pub api_key: String,
    pub collection_uid: String,
}

impl PostmanConfig {
    pub fn new(api_key: impl Into<String>, collection_uid: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            collection_uid: collection_uid.into(),
        }
    }
}

impl fmt::Debug for PostmanConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostmanConfig")
            .field("api_key", &"<redacted>")
            .field("collection_uid", &self.collection_uid)
            .finish()
    }
}
