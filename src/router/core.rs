//! Router core: route table and the dispatch loop.
//!
//! A route table is an ordered list of layers. Each layer pairs a compiled
//! path pattern (optionally restricted to one method) with a stage: a
//! route-level [`Middleware`] or an endpoint [`Handler`]. Dispatch walks the
//! layers in registration order until one stage answers.

use crate::dispatcher::{Handler, HandlerOutcome, HandlerRequest, HandlerResponse, ParamVec};
use crate::error::{ApiError, RegistrationError};
use crate::middleware::Middleware;
use http::Method;
use regex::Regex;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// What a layer does once its pattern matches.
#[derive(Clone)]
pub enum Stage {
    Middleware(Arc<dyn Middleware>),
    Handler(Handler),
}

/// Compiled route pattern.
///
/// Patterns use the `/users/:id` syntax: `:name` captures one segment,
/// `:name?` an optional trailing segment, `*` the rest of the path. A trailing
/// slash in the request path is tolerated.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    pub pattern: String,
    regex: Regex,
    param_names: Vec<Arc<str>>,
}

impl RoutePattern {
    pub fn parse(pattern: &str) -> Result<Self, RegistrationError> {
        let (regex, param_names) = path_to_regex(pattern)?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
            param_names: param_names.into_iter().map(Arc::from).collect(),
        })
    }

    /// Path parameters when `path` matches, in pattern order.
    #[must_use]
    pub fn matches(&self, path: &str) -> Option<ParamVec> {
        let caps = self.regex.captures(path)?;
        let mut params = ParamVec::new();
        for (i, name) in self.param_names.iter().enumerate() {
            if let Some(value) = caps.get(i + 1) {
                params.push((Arc::clone(name), value.as_str().to_string()));
            }
        }
        Some(params)
    }

    #[must_use]
    pub fn param_names(&self) -> &[Arc<str>] {
        &self.param_names
    }
}

/// Convert an express-style path pattern into an anchored regex and the
/// ordered list of parameter names.
///
/// `/users/:id/posts/:post?` becomes `^/users/([^/]+)/posts(?:/([^/]+))?/?$`.
pub(crate) fn path_to_regex(path: &str) -> Result<(Regex, Vec<String>), RegistrationError> {
    let invalid = || RegistrationError::InvalidRoute {
        route: path.to_string(),
    };
    if !path.starts_with('/') {
        return Err(invalid());
    }

    let mut pattern = String::with_capacity(path.len() + 8);
    pattern.push('^');
    let mut param_names = Vec::with_capacity(path.matches(':').count());

    for segment in path.split('/').filter(|s| !s.is_empty()) {
        if let Some(name) = segment.strip_prefix(':') {
            let (name, optional) = match name.strip_suffix('?') {
                Some(n) => (n, true),
                None => (name, false),
            };
            if name.is_empty() {
                return Err(invalid());
            }
            pattern.push_str(if optional { "(?:/([^/]+))?" } else { "/([^/]+)" });
            param_names.push(name.to_string());
        } else if segment == "*" {
            pattern.push_str("(?:/(.*))?");
            param_names.push("0".to_string());
        } else {
            pattern.push('/');
            pattern.push_str(&regex::escape(segment));
        }
    }

    if pattern == "^" {
        pattern.push('/');
    } else {
        pattern.push_str("/?");
    }
    pattern.push('$');
    let regex = Regex::new(&pattern).map_err(|_| invalid())?;
    Ok((regex, param_names))
}

struct Layer {
    /// Endpoint that installed the layer; used to replace its layers in place
    owner: Option<String>,
    route: RoutePattern,
    /// `None` matches every method
    method: Option<Method>,
    stage: Stage,
}

impl Layer {
    fn applies(&self, method: &Method) -> bool {
        self.method.as_ref().is_none_or(|m| m == method)
    }
}

/// In-process framework router.
#[derive(Default)]
pub struct Router {
    layers: Vec<Layer>,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Router-wide middleware: `before` runs ahead of every route, `after`
    /// on every response (in reverse registration order).
    pub fn use_middleware(&mut self, middleware: Arc<dyn Middleware>) {
        self.middleware.push(middleware);
    }

    /// Append a route-level middleware.
    pub fn route_middleware(
        &mut self,
        pattern: &str,
        method: Option<Method>,
        middleware: Arc<dyn Middleware>,
    ) -> Result<(), RegistrationError> {
        self.push(None, pattern, method, Stage::Middleware(middleware))
    }

    /// Append a handler for `method` on `pattern`.
    pub fn bind(
        &mut self,
        method: Method,
        pattern: &str,
        handler: Handler,
    ) -> Result<(), RegistrationError> {
        self.push(None, pattern, Some(method), Stage::Handler(handler))
    }

    fn push(
        &mut self,
        owner: Option<String>,
        pattern: &str,
        method: Option<Method>,
        stage: Stage,
    ) -> Result<(), RegistrationError> {
        let route = RoutePattern::parse(pattern)?;
        self.layers.push(Layer {
            owner,
            route,
            method,
            stage,
        });
        Ok(())
    }

    /// Install the stages of one endpoint. Stages previously installed by the
    /// same owner are removed and the new ones take the position of the first
    /// removed layer; otherwise they are appended.
    pub fn mount(
        &mut self,
        owner: &str,
        pattern: &str,
        method: Option<Method>,
        stages: Vec<Stage>,
    ) -> Result<(), RegistrationError> {
        let route = RoutePattern::parse(pattern)?;
        let position = self
            .layers
            .iter()
            .position(|l| l.owner.as_deref() == Some(owner));
        self.layers.retain(|l| l.owner.as_deref() != Some(owner));

        let new_layers = stages.into_iter().map(|stage| Layer {
            owner: Some(owner.to_string()),
            route: route.clone(),
            method: method.clone(),
            stage,
        });
        match position {
            Some(at) => {
                let tail = self.layers.split_off(at);
                self.layers.extend(new_layers);
                self.layers.extend(tail);
            }
            None => self.layers.extend(new_layers),
        }
        Ok(())
    }

    /// `(method, pattern)` of every handler layer, in dispatch order.
    #[must_use]
    pub fn routes(&self) -> Vec<(Option<Method>, String)> {
        let mut out: Vec<(Option<Method>, String)> = Vec::new();
        for layer in &self.layers {
            if matches!(layer.stage, Stage::Handler(_)) {
                let entry = (layer.method.clone(), layer.route.pattern.clone());
                if !out.contains(&entry) {
                    out.push(entry);
                }
            }
        }
        out
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Run the request through the middleware and route stages.
    ///
    /// When no stage answers, the response is `FOUND` with HTTP 404.
    pub fn dispatch(&self, req: &mut HandlerRequest) -> HandlerResponse {
        let start = Instant::now();
        let mut response = None;

        for mw in &self.middleware {
            if let Some(res) = mw.before(req) {
                response = Some(res);
                break;
            }
        }
        if response.is_none() {
            response = self.run_layers(req);
        }
        let mut response = response.unwrap_or_else(|| {
            info!(
                request_id = %req.request_id,
                method = %req.method,
                path = %req.path,
                "No route matched"
            );
            let err = ApiError::not_found(format!("not found: {} {}", req.method, req.path));
            HandlerResponse::json(404, err.to_body())
        });

        let latency = start.elapsed();
        for mw in self.middleware.iter().rev() {
            mw.after(req, &mut response, latency);
        }
        response
    }

    fn run_layers(&self, req: &mut HandlerRequest) -> Option<HandlerResponse> {
        for layer in &self.layers {
            if !layer.applies(&req.method) {
                continue;
            }
            let Some(params) = layer.route.matches(&req.path) else {
                continue;
            };
            debug!(
                request_id = %req.request_id,
                route_pattern = %layer.route.pattern,
                path_params = ?params,
                "Route matched"
            );
            req.path_params = params;
            match &layer.stage {
                Stage::Middleware(mw) => {
                    if let Some(res) = mw.before(req) {
                        return Some(res);
                    }
                }
                Stage::Handler(handler) => {
                    if let HandlerOutcome::Respond(res) = handler(req) {
                        return Some(res);
                    }
                }
            }
        }
        None
    }
}
