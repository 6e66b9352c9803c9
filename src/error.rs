//! # Error Module
//!
//! Request-facing errors are structured values, never HTTP statuses: every
//! failure a client can observe is rendered as
//!
//! ```json
//! { "error": { "code": 400, "msg": "missing parameter: `name`", "data": { "param": "name" } } }
//! ```
//!
//! and every success as `{ "error": { "code": 200, ... }, "result": <payload> }`.
//!
//! Registration mistakes are programmer errors and surface as
//! [`RegistrationError`] from [`crate::registry::ApiRouter::add`].

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Map, Value};
use std::fmt;

/// Numeric error codes carried inside the `error` object of every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Unknown,
    Success,
    /// Not found (404). The name is kept for wire compatibility with existing clients.
    Found,
    BadRequest,
    Unauthorized,
    Forbidden,
    InternalError,
}

impl ErrorCode {
    #[must_use]
    pub fn as_i32(self) -> i32 {
        match self {
            ErrorCode::Unknown => -2,
            ErrorCode::Success => 200,
            ErrorCode::Found => 404,
            ErrorCode::BadRequest => 400,
            ErrorCode::Unauthorized => 401,
            ErrorCode::Forbidden => 403,
            ErrorCode::InternalError => 500,
        }
    }

    #[must_use]
    pub fn from_i32(code: i32) -> Self {
        match code {
            200 => ErrorCode::Success,
            404 => ErrorCode::Found,
            400 => ErrorCode::BadRequest,
            401 => ErrorCode::Unauthorized,
            403 => ErrorCode::Forbidden,
            500 => ErrorCode::InternalError,
            _ => ErrorCode::Unknown,
        }
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.as_i32())
    }
}

impl<'de> Deserialize<'de> for ErrorCode {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        i32::deserialize(deserializer).map(ErrorCode::from_i32)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i32())
    }
}

/// Structured API error `{ code, msg, data }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub msg: String,
    pub data: Value,
}

impl Default for ApiError {
    fn default() -> Self {
        Self {
            code: ErrorCode::Unknown,
            msg: "no error description available".to_string(),
            data: Value::Object(Map::new()),
        }
    }
}

impl ApiError {
    pub fn new(code: ErrorCode, msg: impl Into<String>) -> Self {
        Self {
            code,
            msg: msg.into(),
            data: Value::Object(Map::new()),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Found, msg)
    }

    /// Attach a data payload. Non-object payloads are wrapped as `{ "value": .. }`
    /// so clients can always index into `data`.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = match data {
            Value::Object(_) => data,
            Value::Null => Value::Object(Map::new()),
            other => json!({ "value": other }),
        };
        self
    }

    /// The parameter name recorded in `data.param`, if any.
    #[must_use]
    pub fn param(&self) -> Option<&str> {
        self.data.get("param").and_then(Value::as_str)
    }

    /// Render as a response body `{ "error": { .. } }`.
    #[must_use]
    pub fn to_body(&self) -> Value {
        json!({ "error": self })
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.msg)
    }
}

impl std::error::Error for ApiError {}

/// Render a success body `{ "error": { "code": 200, .. }, "result": payload }`.
#[must_use]
pub fn success_body(result: Value) -> Value {
    json!({
        "error": ApiError::new(ErrorCode::Success, "success"),
        "result": result,
    })
}

/// Failure returned by handlers wrapped with [`crate::dispatcher::api_handler`].
///
/// `Api` is a deliberate, client-facing error and is sent as-is. `Fault` is a
/// programming or infrastructure failure: it is logged and the client only sees
/// a generic `INTERNAL_ERROR`.
#[derive(Debug)]
pub enum HandlerError {
    Api(ApiError),
    Fault(anyhow::Error),
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerError::Api(e) => write!(f, "api error: {e}"),
            HandlerError::Fault(e) => write!(f, "handler fault: {e:#}"),
        }
    }
}

impl std::error::Error for HandlerError {}

impl From<ApiError> for HandlerError {
    fn from(e: ApiError) -> Self {
        HandlerError::Api(e)
    }
}

impl From<anyhow::Error> for HandlerError {
    fn from(e: anyhow::Error) -> Self {
        HandlerError::Fault(e)
    }
}

/// Errors raised while registering endpoints on an [`crate::registry::ApiRouter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// Route is empty or does not start with `/`
    InvalidRoute { route: String },
    /// Method outside GET, POST, PUT, PATCH, DELETE, HEAD, OPTIONS
    UnsupportedMethod { method: String },
    /// `extends` names a fragment that was never registered
    UnknownFragment { param: String, fragment: String },
    /// A parameter declaration or fragment is not a JSON object
    InvalidDeclaration { param: String, reason: String },
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationError::InvalidRoute { route } => {
                write!(f, "invalid route '{route}': routes must be non-empty and start with '/'")
            }
            RegistrationError::UnsupportedMethod { method } => {
                write!(f, "unsupported method '{method}'")
            }
            RegistrationError::UnknownFragment { param, fragment } => {
                write!(f, "parameter '{param}' extends unknown fragment '{fragment}'")
            }
            RegistrationError::InvalidDeclaration { param, reason } => {
                write!(f, "invalid declaration for parameter '{param}': {reason}")
            }
        }
    }
}

impl std::error::Error for RegistrationError {}
