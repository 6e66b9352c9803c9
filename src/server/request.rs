use crate::dispatcher::{FileField, HandlerRequest, HeaderVec, UploadedFile};
use crate::ids::RequestId;
use http::Method;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Request as handed over by the host HTTP server.
///
/// The host supplies the method, the URI, headers, and (for multipart
/// requests) the uploaded files. Query strings, URL-encoded and JSON bodies
/// are parsed here.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRequest {
    pub method: Method,
    /// Path without the query string
    pub path: String,
    /// HTTP headers (lowercase keys)
    pub headers: HashMap<String, String>,
    pub query_params: Map<String, Value>,
    pub body: Map<String, Value>,
    pub files: HashMap<String, FileField>,
}

impl ParsedRequest {
    /// Split `uri` into path and query parameters.
    pub fn new(method: Method, uri: &str) -> Self {
        let path = uri.split('?').next().unwrap_or("/");
        let path = if path.is_empty() { "/" } else { path };
        Self {
            method,
            path: path.to_string(),
            headers: HashMap::new(),
            query_params: parse_query_params(uri),
            body: Map::new(),
            files: HashMap::new(),
        }
    }

    #[must_use]
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Use the fields of a JSON object as the body.
    #[must_use]
    pub fn json_body(mut self, body: Value) -> Self {
        if let Value::Object(fields) = body {
            self.body = fields;
        }
        self
    }

    #[must_use]
    pub fn form_body(mut self, body: &str) -> Self {
        self.body = parse_form_body(body);
        self
    }

    #[must_use]
    pub fn body_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.body.insert(name.into(), value);
        self
    }

    /// Parse a raw body according to its content type.
    #[must_use]
    pub fn raw_body(mut self, content_type: Option<&str>, body: &[u8]) -> Self {
        self.body = parse_body(content_type, body);
        self
    }

    /// Add an uploaded file; repeated names accumulate into a list.
    #[must_use]
    pub fn file(mut self, field: impl Into<String>, file: UploadedFile) -> Self {
        let field = field.into();
        let merged = match self.files.remove(&field) {
            None => FileField::Single(file),
            Some(FileField::Single(first)) => FileField::Many(vec![first, file]),
            Some(FileField::Many(mut files)) => {
                files.push(file);
                FileField::Many(files)
            }
        };
        self.files.insert(field, merged);
        self
    }

    /// Convert into the dispatch-time request, with `path` relative to the
    /// router's mount path.
    #[must_use]
    pub fn into_handler_request(self, path: String) -> HandlerRequest {
        let request_id =
            RequestId::from_header_or_new(self.headers.get("x-request-id").map(String::as_str));
        let mut headers = HeaderVec::new();
        for (k, v) in self.headers {
            headers.push((Arc::from(k.as_str()), v));
        }
        HandlerRequest {
            request_id,
            method: self.method,
            path,
            endpoint: None,
            path_params: Default::default(),
            query: self.query_params,
            body: self.body,
            files: self.files,
            headers,
        }
    }
}

/// Parse and URL-decode the query string of `uri`. Repeated keys collect
/// into an array of strings.
#[must_use]
pub fn parse_query_params(uri: &str) -> Map<String, Value> {
    match uri.split_once('?') {
        Some((_, query)) => parse_form_body(query),
        None => Map::new(),
    }
}

/// Parse an `application/x-www-form-urlencoded` body.
#[must_use]
pub fn parse_form_body(body: &str) -> Map<String, Value> {
    let mut out = Map::new();
    for (k, v) in url::form_urlencoded::parse(body.as_bytes()) {
        let v = Value::String(v.into_owned());
        match out.get_mut(k.as_ref()) {
            None => {
                out.insert(k.into_owned(), v);
            }
            Some(Value::Array(items)) => items.push(v),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, v]);
            }
        }
    }
    out
}

/// Parse a JSON object or URL-encoded body. Other content types (multipart
/// included) are left to the host and yield an empty map.
#[must_use]
pub fn parse_body(content_type: Option<&str>, body: &[u8]) -> Map<String, Value> {
    if body.is_empty() {
        return Map::new();
    }
    let essence = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .unwrap_or_default();
    match essence.as_str() {
        "application/json" => match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(fields)) => fields,
            Ok(_) => {
                debug!("JSON body is not an object; ignored");
                Map::new()
            }
            Err(e) => {
                debug!(error = %e, "JSON body parse failed");
                Map::new()
            }
        },
        "application/x-www-form-urlencoded" => parse_form_body(&String::from_utf8_lossy(body)),
        _ => Map::new(),
    }
}
