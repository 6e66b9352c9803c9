//! Declaration normalization, executed once per endpoint at registration.
//!
//! 1. `extends` fragments are merged into the declaration: a field is copied
//!    only when not already present, fragments are applied left to right
//!    (first definition wins) and their own `extends` are not followed.
//! 2. Without an explicit `schema` object, every non-reserved field moves into
//!    a synthesized schema. A boolean `required` is the parameter flag; an array
//!    `required` is the JSON-schema keyword and stays in the schema.
//! 3. File descriptions are prefixed with the allowed MIME list.

use super::types::{
    Endpoint, EndpointDescriptor, Enctype, FileDecl, FileSpec, ParamDecl, ParameterSpec,
    SUPPORTED_METHODS,
};
use crate::dispatcher::Handler;
use crate::error::RegistrationError;
use http::Method;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Fields that describe the parameter rather than its schema.
pub const RESERVED_FIELDS: [&str; 4] = ["description", "example", "schema", "required"];

const EXTENDS: &str = "extends";

/// Reject empty routes and routes that do not start with `/`.
pub fn validate_route(route: &str) -> Result<(), RegistrationError> {
    if route.trim().is_empty() || !route.starts_with('/') {
        return Err(RegistrationError::InvalidRoute {
            route: route.to_string(),
        });
    }
    Ok(())
}

pub fn validate_method(method: &Method) -> Result<(), RegistrationError> {
    if SUPPORTED_METHODS.contains(method) {
        Ok(())
    } else {
        Err(RegistrationError::UnsupportedMethod {
            method: method.to_string(),
        })
    }
}

/// Endpoint name derived from the final route segment.
///
/// The segment is kept verbatim since it keys remote collection items:
/// `/users/:id` yields `:id`, `/auth/login/` yields `login`, `/` yields `index`.
#[must_use]
pub fn endpoint_name(route: &str) -> String {
    route
        .split('/')
        .rev()
        .find(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| "index".to_string())
}

fn resolve_extends(
    param: &str,
    mut fields: Map<String, Value>,
    fragments: &HashMap<String, Value>,
) -> Result<Map<String, Value>, RegistrationError> {
    let Some(extends) = fields.remove(EXTENDS) else {
        return Ok(fields);
    };
    let refs = match extends {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        single => vec![single],
    };

    for reference in refs {
        let fragment = match reference {
            Value::String(name) => fragments
                .get(&name)
                .cloned()
                .ok_or_else(|| RegistrationError::UnknownFragment {
                    param: param.to_string(),
                    fragment: name.clone(),
                })?,
            inline => inline,
        };
        let Value::Object(fragment) = fragment else {
            return Err(RegistrationError::InvalidDeclaration {
                param: param.to_string(),
                reason: "extends entries must be objects or fragment names".to_string(),
            });
        };
        for (key, value) in fragment {
            if key == EXTENDS {
                continue;
            }
            fields.entry(key).or_insert(value);
        }
    }
    Ok(fields)
}

/// Normalize one parameter declaration into an immutable [`ParameterSpec`].
pub fn normalize_param(
    name: &str,
    decl: ParamDecl,
    fragments: &HashMap<String, Value>,
) -> Result<ParameterSpec, RegistrationError> {
    let ParamDecl { fields, transform } = decl;
    let mut fields = resolve_extends(name, fields, fragments)?;

    let required = match fields.get("required") {
        Some(Value::Bool(b)) => {
            let b = *b;
            fields.remove("required");
            b
        }
        _ => false,
    };
    let example = fields.remove("example");
    let description = match fields.remove("description") {
        Some(Value::String(s)) => Some(s),
        Some(Value::Null) | None => None,
        Some(other) => Some(other.to_string()),
    };

    let schema = match fields.remove("schema") {
        Some(schema @ Value::Object(_)) => schema,
        Some(Value::Null) | None => Value::Object(fields),
        Some(other) => {
            return Err(RegistrationError::InvalidDeclaration {
                param: name.to_string(),
                reason: format!("schema must be an object, got {other}"),
            })
        }
    };

    Ok(ParameterSpec {
        name: name.to_string(),
        required,
        schema,
        example,
        description,
        transform,
    })
}

/// Normalize one file declaration; the description gains a `[mime, ..]`
/// prefix, or `[*]` when any MIME type is accepted.
#[must_use]
pub fn normalize_file(name: &str, decl: FileDecl) -> FileSpec {
    let prefix = match &decl.mimetypes {
        Some(types) if !types.is_empty() => format!("[{}]", types.join(", ")),
        _ => "[*]".to_string(),
    };
    let description = match decl.description.as_deref().map(str::trim) {
        Some(d) if !d.is_empty() => format!("{prefix} {d}"),
        _ => prefix,
    };
    FileSpec {
        name: name.to_string(),
        required: decl.required,
        mimetypes: decl.mimetypes.filter(|t| !t.is_empty()),
        description,
    }
}

/// Normalize a whole descriptor, returning the endpoint and its callbacks.
pub fn normalize(
    desc: EndpointDescriptor,
    default_method: &Method,
    default_enctype: Enctype,
    fragments: &HashMap<String, Value>,
) -> Result<(Endpoint, Vec<Handler>), RegistrationError> {
    validate_route(&desc.route)?;
    let method = desc.method.unwrap_or_else(|| default_method.clone());
    validate_method(&method)?;

    let name = desc
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| endpoint_name(&desc.route));

    let params = desc
        .params
        .into_iter()
        .map(|(n, d)| normalize_param(&n, d, fragments))
        .collect::<Result<Vec<_>, _>>()?;
    let query = desc
        .query
        .into_iter()
        .map(|(n, d)| normalize_param(&n, d, fragments))
        .collect::<Result<Vec<_>, _>>()?;
    let files = desc
        .files
        .into_iter()
        .map(|(n, d)| normalize_file(&n, d))
        .collect();

    let endpoint = Endpoint {
        name,
        route: desc.route,
        method,
        description: desc.description,
        params,
        query,
        files,
        hidden: desc.hidden,
        enctype: desc.enctype.unwrap_or(default_enctype),
    };
    Ok((endpoint, desc.callbacks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn no_fragments() -> HashMap<String, Value> {
        HashMap::new()
    }

    #[test]
    fn test_flat_fields_become_schema() {
        let spec = normalize_param(
            "age",
            json!({ "type": "integer", "minimum": 0, "required": true, "description": "Age", "example": 42 }).into(),
            &no_fragments(),
        )
        .unwrap();
        assert!(spec.required);
        assert_eq!(spec.schema, json!({ "type": "integer", "minimum": 0 }));
        assert_eq!(spec.example, Some(json!(42)));
        assert_eq!(spec.description.as_deref(), Some("Age"));
    }

    #[test]
    fn test_explicit_schema_is_kept() {
        let spec = normalize_param(
            "name",
            json!({ "required": true, "schema": { "type": "string" } }).into(),
            &no_fragments(),
        )
        .unwrap();
        assert_eq!(spec.schema, json!({ "type": "string" }));
        assert_eq!(spec.display_type(), "string");
    }

    #[test]
    fn test_schema_keyword_required_stays_in_schema() {
        let spec = normalize_param(
            "user",
            json!({ "type": "object", "required": ["id"], "properties": { "id": { "type": "integer" } } }).into(),
            &no_fragments(),
        )
        .unwrap();
        assert!(!spec.required);
        assert_eq!(spec.schema["required"], json!(["id"]));
    }

    #[test]
    fn test_empty_declaration_gets_empty_schema() {
        let spec = normalize_param("anything", json!({}).into(), &no_fragments()).unwrap();
        assert_eq!(spec.schema, json!({}));
        assert_eq!(spec.display_type(), "object");
    }

    #[test]
    fn test_extends_first_definition_wins() {
        let spec = normalize_param(
            "id",
            json!({
                "description": "local",
                "extends": [
                    { "type": "integer", "description": "first", "minimum": 1 },
                    { "type": "string", "maximum": 10, "required": true }
                ]
            })
            .into(),
            &no_fragments(),
        )
        .unwrap();
        assert_eq!(spec.description.as_deref(), Some("local"));
        assert_eq!(spec.schema, json!({ "type": "integer", "minimum": 1, "maximum": 10 }));
        assert!(spec.required);
    }

    #[test]
    fn test_extends_is_one_level() {
        let mut fragments = HashMap::new();
        fragments.insert(
            "base".to_string(),
            json!({ "type": "integer", "extends": { "minimum": 5 } }),
        );
        let spec =
            normalize_param("n", json!({ "extends": "base" }).into(), &fragments).unwrap();
        assert_eq!(spec.schema, json!({ "type": "integer" }));
    }

    #[test]
    fn test_unknown_fragment_is_rejected() {
        let err = normalize_param("n", json!({ "extends": "nope" }).into(), &no_fragments())
            .unwrap_err();
        assert_eq!(
            err,
            RegistrationError::UnknownFragment {
                param: "n".to_string(),
                fragment: "nope".to_string()
            }
        );
    }

    #[test]
    fn test_file_description_prefix() {
        let spec = normalize_file(
            "avatar",
            FileDecl::required()
                .mimetypes(["image/png", "image/jpeg"])
                .description("Profile picture"),
        );
        assert_eq!(spec.description, "[image/png, image/jpeg] Profile picture");
        assert!(spec.accepts("image/PNG"));
        assert!(!spec.accepts("image/gif"));

        let open = normalize_file("doc", FileDecl::optional());
        assert_eq!(open.description, "[*]");
        assert!(open.accepts("application/pdf"));
    }

    #[test]
    fn test_endpoint_name_from_route() {
        assert_eq!(endpoint_name("/auth/login"), "login");
        assert_eq!(endpoint_name("/auth/login/"), "login");
        assert_eq!(endpoint_name("/users/:id"), ":id");
        assert_eq!(endpoint_name("/users/:id?"), ":id?");
        assert_eq!(endpoint_name("/"), "index");
    }

    #[test]
    fn test_invalid_route_and_method() {
        assert!(validate_route("").is_err());
        assert!(validate_route("users").is_err());
        assert!(validate_route("/users").is_ok());
        assert!(validate_method(&Method::TRACE).is_err());
        assert!(validate_method(&Method::PATCH).is_ok());
    }
}
