use std::fmt;

/// Failure of a collection synchronization.
///
/// Nothing is retried; the caller decides whether to run the sync again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// The router has no Postman credentials
    NotConfigured { router: String },
    /// No router is registered under this name
    UnknownRouter { name: String },
    /// The HTTP call did not complete (DNS, TLS, timeout, ..)
    Transport { uid: String, reason: String },
    /// The Postman API answered with a non-2xx status
    Status { uid: String, status: u16, body: String },
    /// The fetched body is not JSON
    Decode { uid: String, reason: String },
    /// The document is JSON but lacks `collection` / `collection.item`
    Malformed { reason: String },
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::NotConfigured { router } => {
                write!(f, "router '{router}' has no postman configuration")
            }
            SyncError::UnknownRouter { name } => write!(f, "no router named '{name}'"),
            SyncError::Transport { uid, reason } => {
                write!(f, "collection {uid}: request failed: {reason}")
            }
            SyncError::Status { uid, status, body } => {
                write!(f, "collection {uid}: postman answered {status}: {body}")
            }
            SyncError::Decode { uid, reason } => {
                write!(f, "collection {uid}: response is not JSON: {reason}")
            }
            SyncError::Malformed { reason } => write!(f, "malformed collection document: {reason}"),
        }
    }
}

impl std::error::Error for SyncError {}
