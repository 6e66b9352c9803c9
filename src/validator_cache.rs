//! # Schema Registry and Validator Cache
//!
//! Each router owns one [`ValidatorCache`]: the set of named schemas registered
//! with `add_schema` plus the compiled validators for parameter schemas.
//!
//! ## References
//!
//! A parameter schema refers to a registered schema with `{"$ref": "<id>"}`
//! or to a sub-schema with `{"$ref": "<id>#/json/pointer"}`. References are
//! inlined before compilation, so registered schemas must be self-contained.
//! References that do not name a registered schema are left to the engine
//! (local `#/...` pointers keep working).
//!
//! ## Compilation
//!
//! Nothing is compiled at registration. Validators are compiled on first use
//! and cached by the schema's serialized form, so identical schemas across
//! endpoints share one validator. Registering a schema clears the cache
//! because previously inlined references may now resolve differently.
//!
//! ## Thread Safety
//!
//! Both maps sit behind `RwLock`s: requests take read locks, registration and
//! first compilation take short write locks. Poisoned locks are recovered
//! rather than propagated as panics.

use jsonschema::Validator;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, warn};

/// Maximum nesting of registered-schema references.
const MAX_REF_DEPTH: usize = 16;

/// Failure to turn a parameter schema into a validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The JSON-schema engine rejected the (resolved) schema
    Compile { reason: String },
    /// Registered schemas reference each other too deeply (usually a cycle)
    RefDepth { reference: String },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::Compile { reason } => write!(f, "schema does not compile: {reason}"),
            SchemaError::RefDepth { reference } => {
                write!(f, "reference '{reference}' nests deeper than {MAX_REF_DEPTH} levels")
            }
        }
    }
}

impl std::error::Error for SchemaError {}

/// Strip the decoration that different schema-id styles carry (`/User`, `User#`).
fn normalize_id(id: &str) -> &str {
    id.trim().trim_start_matches('/').trim_end_matches('#')
}

pub struct ValidatorCache {
    schemas: RwLock<HashMap<String, Value>>,
    compiled: RwLock<HashMap<String, Arc<Validator>>>,
    enabled: bool,
}

impl Default for ValidatorCache {
    fn default() -> Self {
        Self::new(true)
    }
}

impl fmt::Debug for ValidatorCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorCache")
            .field("schemas", &self.schema_ids())
            .field("compiled", &self.len())
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl ValidatorCache {
    /// `enabled = false` compiles on every use (debugging aid).
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            schemas: RwLock::new(HashMap::new()),
            compiled: RwLock::new(HashMap::new()),
            enabled,
        }
    }

    /// Register a named schema. `id` defaults to the schema's `$id` (or
    /// legacy `id`); a schema without any id is ignored with a warning.
    pub fn add_schema(&self, schema: Value, id: Option<&str>) {
        let declared = schema
            .get("$id")
            .or_else(|| schema.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let Some(id) = id.map(str::to_string).or(declared) else {
            warn!("Schema without id ignored; pass an id or declare $id");
            return;
        };
        let key = normalize_id(&id).to_string();
        self.schemas
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone(), schema);
        self.clear();
        info!(schema_id = %key, "Schema registered");
    }

    #[must_use]
    pub fn schema_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .schemas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    /// Inline every reference to a registered schema.
    pub fn resolve(&self, schema: &Value) -> Result<Value, SchemaError> {
        let schemas = self.schemas.read().unwrap_or_else(PoisonError::into_inner);
        resolve_refs(schema, &schemas, 0)
    }

    /// Primitive `type` of `schema` once registered references are inlined.
    ///
    /// A `$ref` with sibling keywords resolves to an `allOf`; the kind is then
    /// taken from the first member that declares one. Schemas that fail to
    /// resolve fall back to their literal `type`.
    #[must_use]
    pub fn primitive_kind(&self, schema: &Value) -> Option<String> {
        if let Some(kind) = literal_kind(schema) {
            return Some(kind.to_string());
        }
        match self.resolve(schema) {
            Ok(resolved) => literal_kind(&resolved).map(str::to_string),
            Err(e) => {
                debug!(error = %e, "Schema kind unknown; references did not resolve");
                None
            }
        }
    }

    /// True when raw string values must be validated as-is rather than
    /// decoded as JSON first.
    #[must_use]
    pub fn is_string_schema(&self, schema: &Value) -> bool {
        self.primitive_kind(schema).as_deref() == Some("string")
    }

    /// Cached validator for `schema`, compiling it on first use.
    pub fn get_or_compile(&self, schema: &Value) -> Result<Arc<Validator>, SchemaError> {
        let key = schema.to_string();
        if self.enabled {
            let compiled = self.compiled.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(validator) = compiled.get(&key) {
                return Ok(Arc::clone(validator));
            }
        }

        let resolved = self.resolve(schema)?;
        let validator = jsonschema::validator_for(&resolved)
            .map(Arc::new)
            .map_err(|e| SchemaError::Compile {
                reason: e.to_string(),
            })?;

        if self.enabled {
            let mut compiled = self.compiled.write().unwrap_or_else(PoisonError::into_inner);
            // Another thread may have compiled the same schema meanwhile
            let cached = Arc::clone(compiled.entry(key).or_insert(validator));
            debug!(cached = compiled.len(), "Schema validator compiled");
            return Ok(cached);
        }
        Ok(validator)
    }

    /// Validate `instance`, returning the list of failures (empty when valid).
    pub fn validate(&self, schema: &Value, instance: &Value) -> Result<Vec<String>, SchemaError> {
        let validator = self.get_or_compile(schema)?;
        Ok(validator.iter_errors(instance).map(|e| e.to_string()).collect())
    }

    pub fn clear(&self) {
        self.compiled
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.compiled
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn literal_kind(schema: &Value) -> Option<&str> {
    if let Some(kind) = schema.get("type").and_then(Value::as_str) {
        return Some(kind);
    }
    schema
        .get("allOf")
        .and_then(Value::as_array)?
        .iter()
        .find_map(literal_kind)
}

fn lookup<'a>(reference: &str, schemas: &'a HashMap<String, Value>) -> Option<&'a Value> {
    let (id, pointer) = match reference.split_once('#') {
        Some((id, pointer)) => (id, pointer),
        None => (reference, ""),
    };
    let id = normalize_id(id);
    if id.is_empty() {
        return None;
    }
    let schema = schemas.get(id)?;
    if pointer.is_empty() {
        Some(schema)
    } else {
        schema.pointer(pointer)
    }
}

fn resolve_refs(
    schema: &Value,
    schemas: &HashMap<String, Value>,
    depth: usize,
) -> Result<Value, SchemaError> {
    match schema {
        Value::Object(obj) => {
            if let Some(reference) = obj.get("$ref").and_then(Value::as_str) {
                if let Some(target) = lookup(reference, schemas) {
                    if depth >= MAX_REF_DEPTH {
                        return Err(SchemaError::RefDepth {
                            reference: reference.to_string(),
                        });
                    }
                    let mut target = target.clone();
                    if let Value::Object(t) = &mut target {
                        t.remove("$id");
                        t.remove("$schema");
                        if t.get("id").is_some_and(Value::is_string) {
                            t.remove("id");
                        }
                    }
                    let target = resolve_refs(&target, schemas, depth + 1)?;

                    let mut siblings = Map::new();
                    for (k, v) in obj.iter().filter(|(k, _)| k.as_str() != "$ref") {
                        siblings.insert(k.clone(), resolve_refs(v, schemas, depth)?);
                    }
                    if siblings.is_empty() {
                        return Ok(target);
                    }
                    match siblings.get_mut("allOf") {
                        Some(Value::Array(all)) => all.push(target),
                        _ => {
                            siblings.insert("allOf".to_string(), Value::Array(vec![target]));
                        }
                    }
                    return Ok(Value::Object(siblings));
                }
            }
            let mut out = Map::new();
            for (k, v) in obj {
                out.insert(k.clone(), resolve_refs(v, schemas, depth)?);
            }
            Ok(Value::Object(out))
        }
        Value::Array(items) => items
            .iter()
            .map(|v| resolve_refs(v, schemas, depth))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        other => Ok(other.clone()),
    }
}
