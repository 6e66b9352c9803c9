use std::sync::Arc;

use http::Method;
use tracing::warn;

use super::Middleware;
use crate::dispatcher::{HandlerRequest, HandlerResponse};
use crate::endpoint::Endpoint;
use crate::validator::validate_request;
use crate::validator_cache::ValidatorCache;

/// Route-level stage validating requests for one endpoint.
///
/// Requests with another method pass through untouched so several endpoints
/// can share a route. Failures answer with the API error body (HTTP 200).
pub struct ValidationMiddleware {
    endpoint: Arc<Endpoint>,
    schemas: Arc<ValidatorCache>,
}

impl ValidationMiddleware {
    pub fn new(endpoint: Arc<Endpoint>, schemas: Arc<ValidatorCache>) -> Self {
        Self { endpoint, schemas }
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.endpoint.method
    }
}

impl Middleware for ValidationMiddleware {
    fn before(&self, req: &mut HandlerRequest) -> Option<HandlerResponse> {
        if req.method != self.endpoint.method {
            return None;
        }
        req.endpoint = Some(self.endpoint.name.clone());
        match validate_request(&self.endpoint, req, &self.schemas) {
            Ok(()) => None,
            Err(err) => {
                warn!(
                    request_id = %req.request_id,
                    endpoint = %self.endpoint.name,
                    code = %err.code,
                    msg = %err.msg,
                    "Request rejected"
                );
                Some(HandlerResponse::api_error(&err))
            }
        }
    }
}
