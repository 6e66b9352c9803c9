//! # Registry Module
//!
//! [`ApiRouter`] is the endpoint registry: it normalizes endpoint declarations,
//! installs a validation stage ahead of each endpoint's callbacks and keeps the
//! normalized [`Endpoint`] list used to document the API.
//!
//! [`RouterRegistry`] tracks every router of a process under a unique name so
//! the synchronizer and the CLI can address them. It is an ordinary value owned
//! by the host application and passed where needed.
//!
//! ## Example
//!
//! ```rust
//! use apirouter::dispatcher::api_handler;
//! use apirouter::endpoint::EndpointDescriptor;
//! use apirouter::registry::{ApiRouter, ApiRouterOptions, RouterRegistry};
//! use apirouter::server::ParsedRequest;
//! use http::Method;
//! use serde_json::json;
//!
//! let router = ApiRouter::new(ApiRouterOptions::default().name("users"));
//! router
//!     .add(
//!         EndpointDescriptor::new("/users/:id")
//!             .query("verbose", json!({ "type": "boolean" }))
//!             .callback(api_handler(|req| {
//!                 Ok(json!({ "id": req.get_path_param("id"), "verbose": req.query.get("verbose") }))
//!             })),
//!     )
//!     .unwrap();
//!
//! let registry = RouterRegistry::new();
//! let router = registry.register(router);
//!
//! let res = router.handle(ParsedRequest::new(Method::GET, "/users/7?verbose=true"));
//! assert_eq!(res.body["result"]["verbose"], json!(true));
//! ```

use crate::dispatcher::{HandlerRequest, HandlerResponse};
use crate::endpoint::{normalize, Endpoint, EndpointDescriptor, Enctype};
use crate::error::{ApiError, RegistrationError};
use crate::middleware::{Middleware, TracingMiddleware, ValidationMiddleware};
use crate::postman::PostmanConfig;
use crate::router::{Router, Stage};
use crate::runtime_config::RuntimeConfig;
use crate::server::ParsedRequest;
use crate::validator_cache::ValidatorCache;
use http::Method;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, info_span};

pub const DEFAULT_ROUTER_NAME: &str = "api";

/// Settings of one [`ApiRouter`].
#[derive(Debug, Clone)]
pub struct ApiRouterOptions {
    /// Base name; the registry may suffix it to keep names unique
    pub name: String,
    /// Path prefix the host mounts the router under
    pub mountpath: String,
    /// Protocol shown in synchronized request URLs
    pub protocol: String,
    pub host: String,
    pub port: Option<u16>,
    /// Method for endpoints declared without one
    pub default_method: Method,
    /// Body encoding for endpoints declared without one
    pub enctype: Enctype,
    pub postman: Option<PostmanConfig>,
    /// Schemas registered at construction
    pub schemas: Vec<Value>,
}

impl Default for ApiRouterOptions {
    fn default() -> Self {
        Self::from_config(&RuntimeConfig::default())
    }
}

impl ApiRouterOptions {
    /// Defaults with display settings taken from `config`.
    #[must_use]
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self {
            name: DEFAULT_ROUTER_NAME.to_string(),
            mountpath: "/".to_string(),
            protocol: config.protocol.clone(),
            host: config.host.clone(),
            port: config.port,
            default_method: Method::GET,
            enctype: Enctype::default(),
            postman: None,
            schemas: Vec::new(),
        }
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn mountpath(mut self, mountpath: impl Into<String>) -> Self {
        self.mountpath = mountpath.into();
        self
    }

    #[must_use]
    pub fn host(mut self, host: impl Into<String>, port: Option<u16>) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    #[must_use]
    pub fn protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    #[must_use]
    pub fn default_method(mut self, method: Method) -> Self {
        self.default_method = method;
        self
    }

    #[must_use]
    pub fn enctype(mut self, enctype: Enctype) -> Self {
        self.enctype = enctype;
        self
    }

    #[must_use]
    pub fn postman(mut self, postman: PostmanConfig) -> Self {
        self.postman = Some(postman);
        self
    }

    #[must_use]
    pub fn schema(mut self, schema: Value) -> Self {
        self.schemas.push(schema);
        self
    }
}

/// Endpoint registry on top of a framework [`Router`].
pub struct ApiRouter {
    options: ApiRouterOptions,
    schemas: Arc<ValidatorCache>,
    fragments: RwLock<HashMap<String, Value>>,
    endpoints: RwLock<Vec<Arc<Endpoint>>>,
    router: RwLock<Router>,
}

impl std::fmt::Debug for ApiRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiRouter")
            .field("options", &self.options)
            .field("endpoints", &self.endpoint_names())
            .finish()
    }
}

impl ApiRouter {
    pub fn new(mut options: ApiRouterOptions) -> Self {
        let schemas = Arc::new(ValidatorCache::default());
        for schema in std::mem::take(&mut options.schemas) {
            schemas.add_schema(schema, None);
        }
        let mut router = Router::new();
        router.use_middleware(Arc::new(TracingMiddleware));
        Self {
            options,
            schemas,
            fragments: RwLock::new(HashMap::new()),
            endpoints: RwLock::new(Vec::new()),
            router: RwLock::new(router),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.options.name
    }

    #[must_use]
    pub fn options(&self) -> &ApiRouterOptions {
        &self.options
    }

    #[must_use]
    pub fn postman(&self) -> Option<&PostmanConfig> {
        self.options.postman.as_ref()
    }

    #[must_use]
    pub fn schemas(&self) -> &ValidatorCache {
        &self.schemas
    }

    /// `protocol://host[:port]` as shown in synchronized request URLs.
    #[must_use]
    pub fn base_url(&self) -> String {
        match self.options.port {
            Some(port) => format!("{}://{}:{}", self.options.protocol, self.options.host, port),
            None => format!("{}://{}", self.options.protocol, self.options.host),
        }
    }

    /// Register a schema that parameter schemas can reference with `$ref`.
    pub fn add_schema(&self, schema: Value, id: Option<&str>) {
        self.schemas.add_schema(schema, id);
    }

    /// Register a named fragment for `"extends": "<name>"`.
    pub fn add_fragment(
        &self,
        name: impl Into<String>,
        fragment: Value,
    ) -> Result<(), RegistrationError> {
        let name = name.into();
        if !fragment.is_object() {
            return Err(RegistrationError::InvalidDeclaration {
                param: name,
                reason: "fragments must be JSON objects".to_string(),
            });
        }
        debug!(router = %self.options.name, fragment = %name, "Fragment registered");
        self.fragments
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, fragment);
        Ok(())
    }

    /// Normalize `desc`, install its validation stage and callbacks, and record
    /// the endpoint. An endpoint with the same name is replaced in place.
    pub fn add(&self, desc: EndpointDescriptor) -> Result<Arc<Endpoint>, RegistrationError> {
        let (endpoint, callbacks) = {
            let fragments = self.fragments.read().unwrap_or_else(PoisonError::into_inner);
            normalize(
                desc,
                &self.options.default_method,
                self.options.enctype,
                &fragments,
            )?
        };
        let endpoint = Arc::new(endpoint);

        let validation: Arc<dyn Middleware> = Arc::new(ValidationMiddleware::new(
            Arc::clone(&endpoint),
            Arc::clone(&self.schemas),
        ));
        let mut stages = Vec::with_capacity(callbacks.len() + 1);
        stages.push(Stage::Middleware(validation));
        stages.extend(callbacks.into_iter().map(Stage::Handler));

        self.router
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .mount(
                &endpoint.name,
                &endpoint.route,
                Some(endpoint.method.clone()),
                stages,
            )?;

        let mut endpoints = self.endpoints.write().unwrap_or_else(PoisonError::into_inner);
        match endpoints.iter_mut().find(|e| e.name == endpoint.name) {
            Some(slot) => *slot = Arc::clone(&endpoint),
            None => endpoints.push(Arc::clone(&endpoint)),
        }

        info!(
            router = %self.options.name,
            endpoint = %endpoint.name,
            method = %endpoint.method,
            route = %endpoint.route,
            params = endpoint.params.len(),
            query = endpoint.query.len(),
            files = endpoint.files.len(),
            hidden = endpoint.hidden,
            "Endpoint registered"
        );
        Ok(endpoint)
    }

    /// Snapshot of the endpoint list in registration order.
    #[must_use]
    pub fn endpoints(&self) -> Vec<Arc<Endpoint>> {
        self.endpoints
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn endpoint(&self, name: &str) -> Option<Arc<Endpoint>> {
        self.endpoints
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|e| e.name == name)
            .map(Arc::clone)
    }

    #[must_use]
    pub fn endpoint_names(&self) -> Vec<String> {
        self.endpoints
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|e| e.name.clone())
            .collect()
    }

    /// Path relative to the mount path, or `None` when `path` lies outside it.
    #[must_use]
    pub fn strip_mountpath(&self, path: &str) -> Option<String> {
        let mount = self.options.mountpath.trim_end_matches('/');
        if mount.is_empty() {
            return Some(path.to_string());
        }
        let rest = path.strip_prefix(mount)?;
        if rest.is_empty() {
            Some("/".to_string())
        } else if rest.starts_with('/') {
            Some(rest.to_string())
        } else {
            None
        }
    }

    /// Entry point for the host server.
    pub fn handle(&self, req: ParsedRequest) -> HandlerResponse {
        let Some(path) = self.strip_mountpath(&req.path) else {
            let err = ApiError::not_found(format!("not found: {} {}", req.method, req.path));
            return HandlerResponse::json(404, err.to_body());
        };
        let mut req = req.into_handler_request(path);
        self.dispatch(&mut req)
    }

    /// Dispatch an already-built request (path relative to the mount path).
    pub fn dispatch(&self, req: &mut HandlerRequest) -> HandlerResponse {
        let _span = info_span!("api_router", router = %self.options.name).entered();
        self.router
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .dispatch(req)
    }

    /// `(method, pattern)` of every bound route.
    #[must_use]
    pub fn routes(&self) -> Vec<(Option<Method>, String)> {
        self.router
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .routes()
    }
}

/// `base` when free, else `base_N` with the smallest free `N >= 1`.
#[must_use]
pub fn unique_name<'a, I>(base: &str, existing: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let taken: HashSet<&str> = existing.into_iter().collect();
    if !taken.contains(base) {
        return base.to_string();
    }
    (1..)
        .map(|n| format!("{base}_{n}"))
        .find(|candidate| !taken.contains(candidate.as_str()))
        .unwrap_or_else(|| base.to_string())
}

/// Named set of routers of one process.
#[derive(Debug, Default)]
pub struct RouterRegistry {
    routers: RwLock<BTreeMap<String, Arc<ApiRouter>>>,
}

impl RouterRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `router` under a unique name derived from its base name.
    pub fn register(&self, mut router: ApiRouter) -> Arc<ApiRouter> {
        let mut routers = self.routers.write().unwrap_or_else(PoisonError::into_inner);
        let name = unique_name(&router.options.name, routers.keys().map(String::as_str));
        if name != router.options.name {
            debug!(base = %router.options.name, assigned = %name, "Router name taken; suffixed");
        }
        router.options.name = name.clone();
        let router = Arc::new(router);
        routers.insert(name.clone(), Arc::clone(&router));
        info!(router = %name, "Router registered");
        router
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<ApiRouter>> {
        self.routers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map(Arc::clone)
    }

    /// Names in ascending order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.routers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn routers(&self) -> Vec<Arc<ApiRouter>> {
        self.routers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(Arc::clone)
            .collect()
    }

    /// Collection uid → names of the routers synchronized into it.
    #[must_use]
    pub fn collections(&self) -> BTreeMap<String, Vec<String>> {
        let mut out: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for router in self.routers() {
            if let Some(postman) = router.postman() {
                out.entry(postman.collection_uid.clone())
                    .or_default()
                    .push(router.name().to_string());
            }
        }
        out
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
