use crate::error::{success_body, ApiError, HandlerError};
use crate::ids::RequestId;
use http::Method;
use serde::Serialize;
use serde_json::{Map, Value};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, warn};

/// Maximum path parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Path parameters extracted from the route pattern, in pattern order.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Maximum inline headers before heap allocation.
pub const MAX_INLINE_HEADERS: usize = 16;

pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// One uploaded file as handed over by the host's multipart parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedFile {
    pub filename: String,
    pub mimetype: String,
    pub size: u64,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, mimetype: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            mimetype: mimetype.into(),
            size: 0,
        }
    }
}

/// Files uploaded under one form field: one file or several.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FileField {
    Single(UploadedFile),
    Many(Vec<UploadedFile>),
}

impl FileField {
    /// A single upload is treated as a one-element list.
    #[must_use]
    pub fn as_slice(&self) -> &[UploadedFile] {
        match self {
            FileField::Single(f) => std::slice::from_ref(f),
            FileField::Many(files) => files,
        }
    }
}

/// Request state flowing through middleware and callbacks.
///
/// Validation writes decoded (and transformed) values back into `body` and
/// `query`, so callbacks read typed JSON rather than raw strings.
#[derive(Debug, Clone)]
pub struct HandlerRequest {
    pub request_id: RequestId,
    pub method: Method,
    /// Path relative to the router's mount path
    pub path: String,
    /// Name of the endpoint whose route matched, when known
    pub endpoint: Option<String>,
    pub path_params: ParamVec,
    pub query: Map<String, Value>,
    pub body: Map<String, Value>,
    pub files: HashMap<String, FileField>,
    pub headers: HeaderVec,
}

impl HandlerRequest {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            request_id: RequestId::new(),
            method,
            path: path.into(),
            endpoint: None,
            path_params: ParamVec::new(),
            query: Map::new(),
            body: Map::new(),
            files: HashMap::new(),
            headers: HeaderVec::new(),
        }
    }

    /// Last occurrence wins for duplicate names.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Case-insensitive per RFC 7230.
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Response produced by middleware or callbacks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandlerResponse {
    pub status: u16,
    #[serde(skip_serializing)]
    pub headers: HeaderVec,
    pub body: Value,
}

impl HandlerResponse {
    #[must_use]
    pub fn new(status: u16, headers: HeaderVec, body: Value) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), "application/json".to_string()));
        Self {
            status,
            headers,
            body,
        }
    }

    /// `{ "error": {..} }` with HTTP 200; the outcome lives in `error.code`.
    #[must_use]
    pub fn api_error(err: &ApiError) -> Self {
        Self::json(200, err.to_body())
    }

    /// `{ "error": { "code": 200, .. }, "result": .. }`
    #[must_use]
    pub fn api_result(result: Value) -> Self {
        Self::json(200, success_body(result))
    }

    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }

    /// The `error.code` carried in an API body, if this is one.
    #[must_use]
    pub fn api_code(&self) -> Option<i64> {
        self.body.get("error")?.get("code")?.as_i64()
    }
}

/// What a callback decided: answer now, or hand over to the next callback.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerOutcome {
    Next,
    Respond(HandlerResponse),
}

/// Route callback. Callbacks may mutate the request for the ones after them.
pub type Handler = Arc<dyn Fn(&mut HandlerRequest) -> HandlerOutcome + Send + Sync>;

/// Wrap a plain callback.
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&mut HandlerRequest) -> HandlerOutcome + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wrap a result-returning callback into the API envelope.
///
/// * `Ok(v)` → `{ "error": SUCCESS, "result": v }`
/// * `Err(HandlerError::Api(e))` → `{ "error": e }`, sent as-is
/// * `Err(HandlerError::Fault(e))` or a panic → logged, answered with a
///   generic `INTERNAL_ERROR`
pub fn api_handler<F>(f: F) -> Handler
where
    F: Fn(&HandlerRequest) -> Result<Value, HandlerError> + Send + Sync + 'static,
{
    Arc::new(move |req: &mut HandlerRequest| {
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| f(req)));
        let response = match outcome {
            Ok(Ok(result)) => HandlerResponse::api_result(result),
            Ok(Err(HandlerError::Api(err))) => {
                warn!(
                    request_id = %req.request_id,
                    endpoint = ?req.endpoint,
                    code = %err.code,
                    msg = %err.msg,
                    "Handler returned API error"
                );
                HandlerResponse::api_error(&err)
            }
            Ok(Err(HandlerError::Fault(err))) => {
                error!(
                    request_id = %req.request_id,
                    endpoint = ?req.endpoint,
                    error = %format!("{err:#}"),
                    "Handler failed"
                );
                HandlerResponse::api_error(&ApiError::internal("internal error"))
            }
            Err(panic) => {
                let panic_message = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(
                    request_id = %req.request_id,
                    endpoint = ?req.endpoint,
                    panic_message = %panic_message,
                    "Handler panicked"
                );
                HandlerResponse::api_error(&ApiError::internal("internal error"))
            }
        };
        HandlerOutcome::Respond(response)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use serde_json::json;

    fn run(h: &Handler) -> HandlerResponse {
        let mut req = HandlerRequest::new(Method::GET, "/x");
        match h(&mut req) {
            HandlerOutcome::Respond(r) => r,
            HandlerOutcome::Next => panic!("expected a response"),
        }
    }

    #[test]
    fn test_api_handler_success() {
        let h = api_handler(|_req| Ok(json!({ "ok": true })));
        let res = run(&h);
        assert_eq!(res.status, 200);
        assert_eq!(res.api_code(), Some(200));
        assert_eq!(res.body["result"]["ok"], json!(true));
    }

    #[test]
    fn test_api_handler_structured_error_is_forwarded() {
        let h = api_handler(|_req| {
            Err(ApiError::new(ErrorCode::Forbidden, "nope")
                .with_data(json!({ "reason": "x" }))
                .into())
        });
        let res = run(&h);
        assert_eq!(res.api_code(), Some(403));
        assert_eq!(res.body["error"]["data"]["reason"], json!("x"));
    }

    #[test]
    fn test_api_handler_fault_is_hidden() {
        let h = api_handler(|_req| Err(anyhow::anyhow!("db connection refused").into()));
        let res = run(&h);
        assert_eq!(res.api_code(), Some(500));
        assert_eq!(res.body["error"]["msg"], json!("internal error"));
    }

    #[test]
    fn test_api_handler_panic_is_caught() {
        let h = api_handler(|_req| panic!("boom"));
        let res = run(&h);
        assert_eq!(res.api_code(), Some(500));
    }

    #[test]
    fn test_single_file_is_one_element_list() {
        let field = FileField::Single(UploadedFile::new("a.png", "image/png"));
        assert_eq!(field.as_slice().len(), 1);
    }
}
