//! Integration tests for schema registration and validator caching
//!
//! # Test Coverage
//!
//! - Cache population on first request, reuse afterwards
//! - Identical schemas on different endpoints share one validator
//! - Functional parity with the cache disabled
//! - Thread safety of concurrent first compilation
//! - Re-registering a schema invalidates validators that inlined it

use apirouter::dispatcher::api_handler;
use apirouter::endpoint::EndpointDescriptor;
use apirouter::registry::{ApiRouter, ApiRouterOptions};
use apirouter::server::ParsedRequest;
use apirouter::validator_cache::{SchemaError, ValidatorCache};
use http::Method;
use serde_json::json;
use std::sync::Arc;
use std::thread;

fn pet_router() -> ApiRouter {
    let router = ApiRouter::new(ApiRouterOptions::default().name("pets"));
    for route in ["/pets", "/pets/:id"] {
        router
            .add(
                EndpointDescriptor::new(route)
                    .method(Method::POST)
                    .param("pet", json!({ "$ref": "/Pet", "required": true }))
                    .callback(api_handler(|_| Ok(json!("ok")))),
            )
            .unwrap();
    }
    router
}

#[test]
fn test_validators_compile_lazily_and_are_shared() {
    let router = pet_router();
    router.add_schema(
        json!({ "$id": "/Pet", "type": "object", "required": ["name"] }),
        None,
    );
    assert!(router.schemas().is_empty(), "nothing compiles at registration");

    let res = router.handle(
        ParsedRequest::new(Method::POST, "/pets").json_body(json!({ "pet": { "name": "Rex" } })),
    );
    assert_eq!(res.api_code(), Some(200));
    assert_eq!(router.schemas().len(), 1);

    let res = router.handle(
        ParsedRequest::new(Method::POST, "/pets/1").json_body(json!({ "pet": {} })),
    );
    assert_eq!(res.api_code(), Some(400));
    assert_eq!(
        router.schemas().len(),
        1,
        "identical schemas share one compiled validator"
    );
}

#[test]
fn test_reregistered_schema_replaces_cached_validator() {
    let router = pet_router();
    router.add_schema(json!({ "type": "object", "required": ["name"] }), Some("Pet"));
    let request = || {
        ParsedRequest::new(Method::POST, "/pets").json_body(json!({ "pet": { "name": "Rex" } }))
    };
    assert_eq!(router.handle(request()).api_code(), Some(200));

    router.add_schema(
        json!({ "type": "object", "required": ["name", "species"] }),
        Some("/Pet"),
    );
    assert!(router.schemas().is_empty());
    let res = router.handle(request());
    assert_eq!(res.api_code(), Some(400));
    assert_eq!(res.body["error"]["msg"], json!("schema error: `pet`"));
}

#[test]
fn test_cache_disabled_has_same_results() {
    let schema = json!({ "type": "array", "items": { "type": "integer" }, "maxItems": 2 });
    let cached = ValidatorCache::new(true);
    let uncached = ValidatorCache::new(false);

    for instance in [json!([1, 2]), json!([1, 2, 3]), json!(["a"])] {
        assert_eq!(
            cached.validate(&schema, &instance).unwrap(),
            uncached.validate(&schema, &instance).unwrap()
        );
    }
    assert_eq!(cached.len(), 1);
    assert!(uncached.is_empty());
}

#[test]
fn test_cache_thread_safety() {
    let cache = Arc::new(ValidatorCache::new(true));
    let schema = json!({ "type": "object", "properties": { "id": { "type": "integer" } } });

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let schema = schema.clone();
            thread::spawn(move || cache.get_or_compile(&schema).unwrap())
        })
        .collect();
    let validators: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    // threads that lose the compile race receive the validator already cached
    assert_eq!(cache.len(), 1);
    for validator in &validators[1..] {
        assert!(Arc::ptr_eq(&validators[0], validator));
    }
}

#[test]
fn test_invalid_schema_not_cached() {
    let cache = ValidatorCache::new(true);
    let invalid = json!({ "type": "invalid_type_that_does_not_exist" });

    for _ in 0..2 {
        assert!(matches!(
            cache.get_or_compile(&invalid),
            Err(SchemaError::Compile { .. })
        ));
        assert_eq!(cache.len(), 0);
    }
}

#[test]
fn test_cache_clear() {
    let cache = ValidatorCache::new(true);
    cache.get_or_compile(&json!({ "type": "object" })).unwrap();
    cache.get_or_compile(&json!({ "type": "string" })).unwrap();
    assert_eq!(cache.len(), 2);

    cache.clear();
    assert!(cache.is_empty());

    cache.get_or_compile(&json!({ "type": "object" })).unwrap();
    assert_eq!(cache.len(), 1);
}
