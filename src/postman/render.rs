//! Postman item rendering for one endpoint.

use crate::endpoint::{Endpoint, FileSpec, ParameterSpec};
use crate::registry::ApiRouter;
use crate::validator_cache::ValidatorCache;
use serde_json::{json, Map, Value};

/// `(<type>, required|optional) <description>`
#[must_use]
pub fn field_description(display_type: &str, required: bool, description: Option<&str>) -> String {
    let presence = if required { "required" } else { "optional" };
    format!("({display_type}, {presence}) {}", description.unwrap_or_default())
}

/// Value shown for a field: the declared example, else the value already in
/// the remote collection, else `""`. Examples are JSON-encoded unless the
/// parameter is string-kinded.
#[must_use]
pub fn field_value(spec: &ParameterSpec, is_string: bool, previous: Option<&Value>) -> Value {
    match &spec.example {
        Some(Value::String(s)) if is_string => Value::String(s.clone()),
        Some(example) => Value::String(example.to_string()),
        None => previous.cloned().unwrap_or_else(|| Value::String(String::new())),
    }
}

fn param_field(
    spec: &ParameterSpec,
    kind: Option<&str>,
    previous: &[Value],
    schemas: &ValidatorCache,
) -> Value {
    let mut field = Map::new();
    field.insert("key".to_string(), Value::String(spec.name.clone()));
    field.insert(
        "value".to_string(),
        field_value(
            spec,
            schemas.is_string_schema(&spec.schema),
            previous_value(previous, &spec.name),
        ),
    );
    if let Some(kind) = kind {
        field.insert("type".to_string(), Value::String(kind.to_string()));
    }
    field.insert(
        "description".to_string(),
        Value::String(field_description(
            &spec.display_type(),
            spec.required,
            spec.description.as_deref(),
        )),
    );
    Value::Object(field)
}

fn file_field(spec: &FileSpec, previous: &[Value]) -> Value {
    let mut field = Map::new();
    field.insert("key".to_string(), Value::String(spec.name.clone()));
    field.insert(
        "value".to_string(),
        previous_value(previous, &spec.name)
            .cloned()
            .unwrap_or_else(|| Value::String(String::new())),
    );
    field.insert("type".to_string(), Value::String(FileSpec::DISPLAY_TYPE.to_string()));
    field.insert(
        "description".to_string(),
        Value::String(field_description(
            FileSpec::DISPLAY_TYPE,
            spec.required,
            Some(&spec.description),
        )),
    );
    if let Some(src) = previous_field(previous, &spec.name).and_then(|f| f.get("src")) {
        field.insert("src".to_string(), src.clone());
    }
    Value::Object(field)
}

fn previous_field<'a>(previous: &'a [Value], key: &str) -> Option<&'a Value> {
    previous
        .iter()
        .find(|f| f.get("key").and_then(Value::as_str) == Some(key))
}

fn previous_value<'a>(previous: &'a [Value], key: &str) -> Option<&'a Value> {
    previous_field(previous, key)
        .and_then(|f| f.get("value"))
        .filter(|v| !v.is_null())
}

/// Body and query fields of an existing item, whatever its body mode.
fn previous_fields(previous: Option<&Value>) -> (Vec<Value>, Vec<Value>) {
    let Some(request) = previous.and_then(|p| p.get("request")) else {
        return (Vec::new(), Vec::new());
    };
    let mut body = Vec::new();
    if let Some(b) = request.get("body") {
        for mode in ["formdata", "urlencoded"] {
            if let Some(fields) = b.get(mode).and_then(Value::as_array) {
                body.extend(fields.iter().cloned());
            }
        }
    }
    let query = request
        .get("url")
        .and_then(|u| u.get("query"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    (body, query)
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Percent-encoded `key=value&...` for the `raw` URL.
fn raw_query(query: &[Value]) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for q in query {
        let key = q.get("key").and_then(Value::as_str).unwrap_or_default();
        match q.get("value") {
            Some(Value::String(v)) => serializer.append_pair(key, v),
            Some(v) => serializer.append_pair(key, &v.to_string()),
            None => serializer.append_pair(key, ""),
        };
    }
    serializer.finish()
}

/// Postman URL object for `endpoint` as served by `router`.
#[must_use]
pub fn render_url(router: &ApiRouter, endpoint: &Endpoint, query: Vec<Value>) -> Value {
    let options = router.options();
    let path: Vec<&str> = segments(&options.mountpath)
        .chain(segments(&endpoint.route))
        .collect();

    let mut raw = format!("{}/{}", router.base_url(), path.join("/"));
    if !query.is_empty() {
        raw.push('?');
        raw.push_str(&raw_query(&query));
    }

    let mut url = Map::new();
    url.insert("raw".to_string(), Value::String(raw));
    url.insert("protocol".to_string(), Value::String(options.protocol.clone()));
    url.insert(
        "host".to_string(),
        json!(options.host.split('.').collect::<Vec<_>>()),
    );
    if let Some(port) = options.port {
        url.insert("port".to_string(), Value::String(port.to_string()));
    }
    url.insert("path".to_string(), json!(path));
    url.insert("query".to_string(), Value::Array(query));
    Value::Object(url)
}

/// Build the collection item for `endpoint`, carrying over ids, saved
/// responses and scripts from `previous`.
#[must_use]
pub fn render_item(router: &ApiRouter, endpoint: &Endpoint, previous: Option<&Value>) -> Value {
    let (prev_body, prev_query) = previous_fields(previous);
    let mode = endpoint.enctype.postman_mode();

    let mut body_fields: Vec<Value> = endpoint
        .params
        .iter()
        .map(|p| param_field(p, Some("text"), &prev_body, router.schemas()))
        .collect();
    if mode == "formdata" {
        body_fields.extend(endpoint.files.iter().map(|f| file_field(f, &prev_body)));
    }
    let query_fields: Vec<Value> = endpoint
        .query
        .iter()
        .map(|q| param_field(q, None, &prev_query, router.schemas()))
        .collect();

    let header = if endpoint.enctype == router.options().enctype {
        json!([])
    } else {
        json!([{ "key": "Content-Type", "value": endpoint.enctype.mime() }])
    };

    let mut body = Map::new();
    body.insert("mode".to_string(), Value::String(mode.to_string()));
    body.insert(mode.to_string(), Value::Array(body_fields));

    let mut request = Map::new();
    request.insert("method".to_string(), Value::String(endpoint.method.to_string()));
    request.insert("header".to_string(), header);
    request.insert("body".to_string(), Value::Object(body));
    request.insert("url".to_string(), render_url(router, endpoint, query_fields));
    request.insert(
        "description".to_string(),
        Value::String(endpoint.description.clone().unwrap_or_default()),
    );

    let mut item = Map::new();
    item.insert("name".to_string(), Value::String(endpoint.name.clone()));
    for key in ["_postman_id", "id"] {
        if let Some(v) = previous.and_then(|p| p.get(key)) {
            item.insert(key.to_string(), v.clone());
        }
    }
    item.insert(
        "protocolProfileBehavior".to_string(),
        json!({ "disableBodyPruning": true }),
    );
    item.insert("request".to_string(), Value::Object(request));
    item.insert(
        "response".to_string(),
        previous
            .and_then(|p| p.get("response"))
            .cloned()
            .unwrap_or_else(|| json!([])),
    );
    if let Some(event) = previous.and_then(|p| p.get("event")) {
        item.insert("event".to_string(), event.clone());
    }
    Value::Object(item)
}
