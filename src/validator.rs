//! # Request Validation Pipeline
//!
//! Runs an endpoint's declared constraints against an incoming request:
//! body parameters, then query parameters, then files. The first failure
//! aborts the request and is returned as an [`ApiError`]; on success the
//! decoded (and transformed) values are written back into the request.

use crate::dispatcher::{FileField, HandlerRequest};
use crate::endpoint::{Endpoint, FileSpec, ParameterSpec};
use crate::error::ApiError;
use crate::validator_cache::ValidatorCache;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, error, info};

/// Where a parameter is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamLocation {
    Body,
    Query,
}

impl fmt::Display for ParamLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamLocation::Body => f.write_str("body"),
            ParamLocation::Query => f.write_str("query"),
        }
    }
}

/// Validate `req` against `endpoint`, fail fast.
pub fn validate_request(
    endpoint: &Endpoint,
    req: &mut HandlerRequest,
    schemas: &ValidatorCache,
) -> Result<(), ApiError> {
    check_parameters(&endpoint.params, &mut req.body, ParamLocation::Body, schemas)?;
    check_parameters(&endpoint.query, &mut req.query, ParamLocation::Query, schemas)?;
    check_files(&endpoint.files, &req.files)?;
    debug!(
        request_id = %req.request_id,
        endpoint = %endpoint.name,
        "Request validated"
    );
    Ok(())
}

/// Check every declared parameter present in `values`, replacing each raw
/// value with its decoded (and transformed) form.
pub fn check_parameters(
    specs: &[ParameterSpec],
    values: &mut Map<String, Value>,
    location: ParamLocation,
    schemas: &ValidatorCache,
) -> Result<(), ApiError> {
    for spec in specs {
        let Some(raw) = values.get(&spec.name).cloned() else {
            if spec.required {
                info!(param = %spec.name, %location, "Missing required parameter");
                return Err(ApiError::bad_request(format!("missing parameter: `{}`", spec.name))
                    .with_data(json!({ "param": spec.name })));
            }
            continue;
        };
        let value = check_parameter(spec, raw, location, schemas)?;
        values.insert(spec.name.clone(), value);
    }
    Ok(())
}

/// Decode, validate and transform one raw value.
pub fn check_parameter(
    spec: &ParameterSpec,
    raw: Value,
    location: ParamLocation,
    schemas: &ValidatorCache,
) -> Result<Value, ApiError> {
    let value = match raw {
        Value::String(text) if !schemas.is_string_schema(&spec.schema) => {
            serde_json::from_str::<Value>(&text).map_err(|e| {
                info!(param = %spec.name, %location, error = %e, "Parameter is not valid JSON");
                ApiError::bad_request(format!("invalid JSON: `{}`", spec.name))
                    .with_data(json!({ "param": spec.name, "error": e.to_string() }))
            })?
        }
        other => other,
    };

    let errors = schemas.validate(&spec.schema, &value).map_err(|e| {
        error!(param = %spec.name, %location, error = %e, "Parameter schema cannot be compiled");
        ApiError::internal(format!("invalid schema: `{}`", spec.name))
            .with_data(json!({ "param": spec.name, "error": e.to_string() }))
    })?;
    if !errors.is_empty() {
        info!(param = %spec.name, %location, errors = ?errors, "Parameter failed schema validation");
        return Err(ApiError::bad_request(format!("schema error: `{}`", spec.name))
            .with_data(json!({ "param": spec.name, "errors": errors })));
    }

    Ok(match &spec.transform {
        Some(transform) => transform(value),
        None => value,
    })
}

/// Presence and MIME checks for uploaded files.
pub fn check_files(
    specs: &[FileSpec],
    files: &HashMap<String, FileField>,
) -> Result<(), ApiError> {
    for spec in specs {
        let uploaded = files.get(&spec.name).map(FileField::as_slice).unwrap_or_default();
        if uploaded.is_empty() {
            if spec.required {
                info!(param = %spec.name, "Missing required file");
                return Err(ApiError::bad_request(format!("missing file(s): `{}`", spec.name))
                    .with_data(json!({ "param": spec.name })));
            }
            continue;
        }
        let Some(allowed) = &spec.mimetypes else {
            continue;
        };
        if uploaded.iter().any(|f| !spec.accepts(&f.mimetype)) {
            let received: Vec<&str> = uploaded.iter().map(|f| f.mimetype.as_str()).collect();
            info!(param = %spec.name, received = ?received, "Rejected file MIME type");
            return Err(ApiError::bad_request(format!("invalid mimetypes: `{}`", spec.name))
                .with_data(json!({
                    "param": spec.name,
                    "mimetypes": allowed,
                    "received": received,
                })));
        }
    }
    Ok(())
}
