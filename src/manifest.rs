//! # Manifest Module
//!
//! Declarative router definitions for the `apirouter` binary, in YAML or JSON.
//!
//! ```yaml
//! routers:
//!   - name: auth
//!     mountpath: /auth
//!     default_method: POST
//!     postman:
//!       api_key: ${POSTMAN_API_KEY}
//!       collection_uid: 1234-abcd
//!     schemas:
//!       - $id: /Credentials
//!         type: object
//!         required: [email]
//!     fragments:
//!       email: { type: string, format: email, required: true }
//!     endpoints:
//!       - route: /login
//!         description: Log in
//!         params:
//!           email: { extends: email, description: Account email }
//!           password: { type: string, required: true }
//!       - route: /avatar
//!         files:
//!           image: { required: true, mimetypes: [image/png] }
//! ```
//!
//! `${VAR}` references in Postman credentials are expanded from the
//! environment; an unset variable is an error. Manifest endpoints carry no
//! callbacks: the manifest describes routers for documentation and sync.

use crate::endpoint::{EndpointDescriptor, Enctype, FileDecl, ParamDecl};
use crate::error::RegistrationError;
use crate::postman::PostmanConfig;
use crate::registry::{ApiRouter, ApiRouterOptions, RouterRegistry};
use crate::runtime_config::RuntimeConfig;
use http::Method;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

static ENV_REF: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").ok());

/// Failure to load or apply a manifest.
#[derive(Debug)]
pub enum ManifestError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, reason: String },
    /// A `${VAR}` reference names an unset variable
    MissingEnv { router: String, var: String },
    InvalidMethod { router: String, method: String },
    InvalidFile { router: String, file: String, reason: String },
    Registration { router: String, source: RegistrationError },
}

impl fmt::Display for ManifestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestError::Io { path, source } => {
                write!(f, "cannot read manifest {}: {source}", path.display())
            }
            ManifestError::Parse { path, reason } => {
                write!(f, "cannot parse manifest {}: {reason}", path.display())
            }
            ManifestError::MissingEnv { router, var } => {
                write!(f, "router '{router}': environment variable {var} is not set")
            }
            ManifestError::InvalidMethod { router, method } => {
                write!(f, "router '{router}': invalid method '{method}'")
            }
            ManifestError::InvalidFile {
                router,
                file,
                reason,
            } => write!(f, "router '{router}': invalid file declaration '{file}': {reason}"),
            ManifestError::Registration { router, source } => {
                write!(f, "router '{router}': {source}")
            }
        }
    }
}

impl std::error::Error for ManifestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ManifestError::Io { source, .. } => Some(source),
            ManifestError::Registration { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub routers: Vec<RouterManifest>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouterManifest {
    pub name: Option<String>,
    pub mountpath: Option<String>,
    pub protocol: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub default_method: Option<String>,
    pub enctype: Option<Enctype>,
    pub postman: Option<PostmanConfig>,
    #[serde(default)]
    pub schemas: Vec<Value>,
    #[serde(default)]
    pub fragments: Map<String, Value>,
    #[serde(default)]
    pub endpoints: Vec<EndpointManifest>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointManifest {
    pub route: String,
    pub method: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default)]
    pub query: Map<String, Value>,
    #[serde(default)]
    pub files: Map<String, Value>,
    #[serde(default)]
    pub hidden: bool,
    pub enctype: Option<Enctype>,
}

/// Replace `${VAR}` references using `lookup`.
pub fn expand_env<F>(raw: &str, router: &str, lookup: &F) -> Result<String, ManifestError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(re) = ENV_REF.as_ref() else {
        return Ok(raw.to_string());
    };
    let mut out = String::with_capacity(raw.len());
    let mut last = 0;
    for caps in re.captures_iter(raw) {
        let (Some(whole), Some(var)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let value = lookup(var.as_str()).ok_or_else(|| ManifestError::MissingEnv {
            router: router.to_string(),
            var: var.as_str().to_string(),
        })?;
        out.push_str(&raw[last..whole.start()]);
        out.push_str(&value);
        last = whole.end();
    }
    out.push_str(&raw[last..]);
    Ok(out)
}

fn parse_method(router: &str, method: &str) -> Result<Method, ManifestError> {
    Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes()).map_err(|_| {
        ManifestError::InvalidMethod {
            router: router.to_string(),
            method: method.to_string(),
        }
    })
}

impl Manifest {
    /// Load a manifest; `.json` files are read as JSON, anything else as YAML.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let parsed = if is_json {
            serde_json::from_str(&text).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str(&text).map_err(|e| e.to_string())
        };
        parsed.map_err(|reason| ManifestError::Parse {
            path: path.to_path_buf(),
            reason,
        })
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ManifestError> {
        serde_yaml::from_str(text).map_err(|e| ManifestError::Parse {
            path: PathBuf::from("<inline>"),
            reason: e.to_string(),
        })
    }

    /// Build and register every router, expanding `${VAR}` from the process
    /// environment.
    pub fn build_registry(self, config: &RuntimeConfig) -> Result<RouterRegistry, ManifestError> {
        self.build_registry_with(config, |key| std::env::var(key).ok())
    }

    pub fn build_registry_with<F>(
        self,
        config: &RuntimeConfig,
        lookup: F,
    ) -> Result<RouterRegistry, ManifestError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let registry = RouterRegistry::new();
        for router in self.routers {
            let router = router.build(config, &lookup)?;
            registry.register(router);
        }
        info!(routers = registry.len(), "Manifest loaded");
        Ok(registry)
    }
}

impl RouterManifest {
    /// Build one router with its schemas, fragments and endpoints.
    pub fn build<F>(self, config: &RuntimeConfig, lookup: &F) -> Result<ApiRouter, ManifestError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = ApiRouterOptions::from_config(config);
        if let Some(name) = self.name {
            options.name = name;
        }
        let label = options.name.clone();
        let registration = |source| ManifestError::Registration {
            router: label.clone(),
            source,
        };

        if let Some(mountpath) = self.mountpath {
            options.mountpath = mountpath;
        }
        if let Some(protocol) = self.protocol {
            options.protocol = protocol;
        }
        if let Some(host) = self.host {
            options.host = host;
        }
        if self.port.is_some() {
            options.port = self.port;
        }
        if let Some(method) = &self.default_method {
            options.default_method = parse_method(&label, method)?;
        }
        if let Some(enctype) = self.enctype {
            options.enctype = enctype;
        }
        if let Some(postman) = self.postman {
            options.postman = Some(PostmanConfig::new(
                expand_env(&postman.api_key, &label, lookup)?,
                expand_env(&postman.collection_uid, &label, lookup)?,
            ));
        }
        options.schemas = self.schemas;

        let router = ApiRouter::new(options);
        for (name, fragment) in self.fragments {
            router.add_fragment(name, fragment).map_err(registration)?;
        }
        for endpoint in self.endpoints {
            let desc = endpoint.into_descriptor(&label)?;
            router.add(desc).map_err(registration)?;
        }
        Ok(router)
    }
}

impl EndpointManifest {
    pub fn into_descriptor(self, router: &str) -> Result<EndpointDescriptor, ManifestError> {
        let mut desc = EndpointDescriptor::new(self.route).hidden(self.hidden);
        if let Some(method) = &self.method {
            desc = desc.method(parse_method(router, method)?);
        }
        if let Some(name) = self.name {
            desc = desc.name(name);
        }
        if let Some(description) = self.description {
            desc = desc.description(description);
        }
        if let Some(enctype) = self.enctype {
            desc = desc.enctype(enctype);
        }
        for (name, decl) in self.params {
            desc = desc.param(name, ParamDecl::new(decl));
        }
        for (name, decl) in self.query {
            desc = desc.query(name, ParamDecl::new(decl));
        }
        for (name, decl) in self.files {
            let decl: FileDecl =
                serde_json::from_value(decl).map_err(|e| ManifestError::InvalidFile {
                    router: router.to_string(),
                    file: name.clone(),
                    reason: e.to_string(),
                })?;
            desc = desc.file(name, decl);
        }
        Ok(desc)
    }
}

/// Load `path` and build its routers.
pub fn load_registry(
    path: impl AsRef<Path>,
    config: &RuntimeConfig,
) -> Result<RouterRegistry, ManifestError> {
    Manifest::from_path(path)?.build_registry(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(key: &str) -> Option<String> {
        match key {
            "POSTMAN_API_KEY" => Some("secret".to_string()),
            _ => None,
        }
    }

    #[test]
    fn test_expand_env() {
        assert_eq!(expand_env("${POSTMAN_API_KEY}", "r", &env).unwrap(), "secret");
        assert_eq!(expand_env("k-${POSTMAN_API_KEY}-x", "r", &env).unwrap(), "k-secret-x");
        assert_eq!(expand_env("plain", "r", &env).unwrap(), "plain");
        let err = expand_env("${NOPE}", "r", &env).unwrap_err();
        assert!(matches!(err, ManifestError::MissingEnv { ref var, .. } if var == "NOPE"));
    }

    #[test]
    fn test_build_router_from_yaml() {
        let manifest = Manifest::from_yaml_str(
            r#"
routers:
  - name: auth
    default_method: post
    postman:
      apikey: ${POSTMAN_API_KEY}
      collection_uid: c-1
    fragments:
      email: { type: string, required: true }
    endpoints:
      - route: /login
        params:
          email: { extends: email, description: Account email }
          remember: { type: boolean }
      - route: /avatar
        enctype: urlencoded
        files:
          image: { required: true, mimetypes: [image/png] }
"#,
        )
        .unwrap();
        let registry = manifest
            .build_registry_with(&RuntimeConfig::default(), env)
            .unwrap();
        let router = registry.get("auth").unwrap();
        assert_eq!(router.postman().unwrap().api_key, "secret");

        let login = router.endpoint("login").unwrap();
        assert_eq!(login.method, Method::POST);
        assert_eq!(login.params[0].name, "email");
        assert!(login.params[0].required);
        assert_eq!(login.params[1].name, "remember");

        let avatar = router.endpoint("avatar").unwrap();
        assert_eq!(avatar.enctype, Enctype::Urlencoded);
        assert_eq!(avatar.files[0].description, "[image/png]");
    }

    #[test]
    fn test_invalid_method_is_reported() {
        let manifest = Manifest::from_yaml_str(
            "routers:\n  - endpoints:\n      - route: /x\n        method: 'NOT A VERB'\n",
        )
        .unwrap();
        let err = manifest
            .build_registry_with(&RuntimeConfig::default(), env)
            .unwrap_err();
        assert!(matches!(err, ManifestError::InvalidMethod { .. }));
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        assert!(Manifest::from_yaml_str("routers:\n  - nmae: typo\n").is_err());
    }
}
