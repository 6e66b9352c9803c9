use std::time::Duration;

use tracing::{debug, info};

use super::Middleware;
use crate::dispatcher::{HandlerRequest, HandlerResponse};

/// Logs each request on arrival and its outcome with latency, and echoes the
/// request id in `x-request-id`.
pub struct TracingMiddleware;

impl Middleware for TracingMiddleware {
    fn before(&self, req: &mut HandlerRequest) -> Option<HandlerResponse> {
        debug!(
            request_id = %req.request_id,
            method = %req.method,
            path = %req.path,
            "Request received"
        );
        None
    }

    fn after(&self, req: &HandlerRequest, res: &mut HandlerResponse, latency: Duration) {
        info!(
            request_id = %req.request_id,
            method = %req.method,
            path = %req.path,
            endpoint = req.endpoint.as_deref().unwrap_or("-"),
            status = res.status,
            api_code = ?res.api_code(),
            latency_ms = latency.as_millis() as u64,
            "Request completed"
        );
        res.set_header("x-request-id", req.request_id.to_string());
    }
}
