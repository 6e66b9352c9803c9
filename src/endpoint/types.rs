use crate::dispatcher::Handler;
use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Post-validation transform applied to a parameter value before it is stored
/// back into the request.
pub type Transform = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Verbs that can be bound to a route.
pub const SUPPORTED_METHODS: [Method; 7] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::HEAD,
    Method::OPTIONS,
];

/// Request body encoding of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Enctype {
    #[default]
    #[serde(rename = "multipart/form-data", alias = "formdata", alias = "multipart")]
    Multipart,
    #[serde(
        rename = "application/x-www-form-urlencoded",
        alias = "urlencoded"
    )]
    Urlencoded,
}

impl Enctype {
    #[must_use]
    pub fn mime(self) -> &'static str {
        match self {
            Enctype::Multipart => "multipart/form-data",
            Enctype::Urlencoded => "application/x-www-form-urlencoded",
        }
    }

    /// Postman body mode for this encoding.
    #[must_use]
    pub fn postman_mode(self) -> &'static str {
        match self {
            Enctype::Multipart => "formdata",
            Enctype::Urlencoded => "urlencoded",
        }
    }
}

impl fmt::Display for Enctype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

impl FromStr for Enctype {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "multipart/form-data" | "multipart" | "formdata" => Ok(Enctype::Multipart),
            "application/x-www-form-urlencoded" | "urlencoded" => Ok(Enctype::Urlencoded),
            other => Err(format!("unknown enctype '{other}'")),
        }
    }
}

/// Raw declaration of one body or query parameter.
///
/// The fields are written flatly (`{"type": "integer", "required": true}`) or
/// with an explicit `schema` object; see [`super::normalize`] for the rules.
#[derive(Clone, Default)]
pub struct ParamDecl {
    pub fields: Map<String, Value>,
    pub transform: Option<Transform>,
}

impl ParamDecl {
    /// Non-object declarations are kept as `{ "schema": <value> }` so the
    /// mistake is reported at registration rather than silently dropped.
    pub fn new(decl: Value) -> Self {
        let fields = match decl {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("schema".to_string(), other);
                map
            }
        };
        Self {
            fields,
            transform: None,
        }
    }

    #[must_use]
    pub fn transform<F>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(f));
        self
    }
}

impl From<Value> for ParamDecl {
    fn from(decl: Value) -> Self {
        ParamDecl::new(decl)
    }
}

impl fmt::Debug for ParamDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamDecl")
            .field("fields", &self.fields)
            .field("transform", &self.transform.is_some())
            .finish()
    }
}

/// Raw declaration of one uploaded file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FileDecl {
    pub required: bool,
    pub mimetypes: Option<Vec<String>>,
    pub description: Option<String>,
}

impl FileDecl {
    #[must_use]
    pub fn required() -> Self {
        Self {
            required: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn optional() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn mimetypes<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mimetypes = Some(types.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Declaration of one endpoint, consumed by [`crate::registry::ApiRouter::add`].
///
/// ```rust
/// use apirouter::endpoint::{EndpointDescriptor, FileDecl};
/// use http::Method;
/// use serde_json::json;
///
/// let desc = EndpointDescriptor::new("/users/:id/avatar")
///     .method(Method::POST)
///     .description("Upload a new avatar")
///     .param("crop", json!({ "type": "boolean", "example": true }))
///     .file("avatar", FileDecl::required().mimetypes(["image/png"]));
/// assert_eq!(desc.route, "/users/:id/avatar");
/// ```
#[derive(Clone, Default)]
pub struct EndpointDescriptor {
    pub route: String,
    pub method: Option<Method>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub params: Vec<(String, ParamDecl)>,
    pub query: Vec<(String, ParamDecl)>,
    pub files: Vec<(String, FileDecl)>,
    pub callbacks: Vec<Handler>,
    pub hidden: bool,
    pub enctype: Option<Enctype>,
}

impl EndpointDescriptor {
    pub fn new(route: impl Into<String>) -> Self {
        Self {
            route: route.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Declare a body parameter. Redeclaring a name replaces it in place.
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, decl: impl Into<ParamDecl>) -> Self {
        upsert(&mut self.params, name.into(), decl.into());
        self
    }

    /// Declare a query parameter. Redeclaring a name replaces it in place.
    #[must_use]
    pub fn query(mut self, name: impl Into<String>, decl: impl Into<ParamDecl>) -> Self {
        upsert(&mut self.query, name.into(), decl.into());
        self
    }

    #[must_use]
    pub fn file(mut self, name: impl Into<String>, decl: FileDecl) -> Self {
        upsert(&mut self.files, name.into(), decl);
        self
    }

    /// Append a callback. Callbacks run in order after validation succeeds.
    #[must_use]
    pub fn callback(mut self, handler: Handler) -> Self {
        self.callbacks.push(handler);
        self
    }

    #[must_use]
    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    #[must_use]
    pub fn enctype(mut self, enctype: Enctype) -> Self {
        self.enctype = Some(enctype);
        self
    }
}

fn upsert<T>(list: &mut Vec<(String, T)>, name: String, value: T) {
    match list.iter_mut().find(|(n, _)| *n == name) {
        Some(slot) => slot.1 = value,
        None => list.push((name, value)),
    }
}

impl fmt::Debug for EndpointDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointDescriptor")
            .field("route", &self.route)
            .field("method", &self.method)
            .field("name", &self.name)
            .field("params", &self.params)
            .field("query", &self.query)
            .field("files", &self.files)
            .field("callbacks", &self.callbacks.len())
            .field("hidden", &self.hidden)
            .field("enctype", &self.enctype)
            .finish()
    }
}

/// Normalized constraint record for one body or query parameter.
#[derive(Clone)]
pub struct ParameterSpec {
    pub name: String,
    pub required: bool,
    /// Never null after normalization
    pub schema: Value,
    pub example: Option<Value>,
    pub description: Option<String>,
    pub transform: Option<Transform>,
}

impl ParameterSpec {
    /// Human-readable type used in documentation: the schema `type` (union
    /// types joined with `|`), the `$ref` target, or `object`.
    #[must_use]
    pub fn display_type(&self) -> String {
        match self.schema.get("type") {
            Some(Value::String(t)) => t.clone(),
            Some(Value::Array(types)) => types
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join("|"),
            _ => match self.schema.get("$ref").and_then(Value::as_str) {
                Some(reference) => reference.to_string(),
                None => "object".to_string(),
            },
        }
    }
}

impl fmt::Debug for ParameterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterSpec")
            .field("name", &self.name)
            .field("required", &self.required)
            .field("schema", &self.schema)
            .field("example", &self.example)
            .field("description", &self.description)
            .field("transform", &self.transform.is_some())
            .finish()
    }
}

/// Normalized constraint record for one uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSpec {
    pub name: String,
    pub required: bool,
    /// `None` accepts any MIME type
    pub mimetypes: Option<Vec<String>>,
    /// Description prefixed with the allowed MIME list
    pub description: String,
}

impl FileSpec {
    pub const DISPLAY_TYPE: &'static str = "file";

    /// MIME parameters (`; charset=..`) and case are ignored.
    #[must_use]
    pub fn accepts(&self, mimetype: &str) -> bool {
        let Some(allowed) = &self.mimetypes else {
            return true;
        };
        let essence = mimetype.split(';').next().unwrap_or(mimetype).trim();
        allowed.iter().any(|a| a.eq_ignore_ascii_case(essence))
    }
}

/// Immutable, normalized endpoint held by a router for its lifetime.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub name: String,
    pub route: String,
    pub method: Method,
    pub description: Option<String>,
    pub params: Vec<ParameterSpec>,
    pub query: Vec<ParameterSpec>,
    pub files: Vec<FileSpec>,
    pub hidden: bool,
    pub enctype: Enctype,
}
