use std::time::Duration;

use crate::dispatcher::{HandlerRequest, HandlerResponse};

/// Hook run around request dispatch.
///
/// `before` may rewrite the request or short-circuit with a response; when it
/// returns `Some`, later stages are skipped. `after` sees every response,
/// including short-circuited ones.
pub trait Middleware: Send + Sync {
    fn before(&self, _req: &mut HandlerRequest) -> Option<HandlerResponse> {
        None
    }
    fn after(&self, _req: &HandlerRequest, _res: &mut HandlerResponse, _latency: Duration) {}
}
