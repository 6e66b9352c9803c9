use super::core::path_to_regex;
use super::{RoutePattern, Router, Stage};
use crate::dispatcher::{handler, HandlerOutcome, HandlerRequest, HandlerResponse};
use crate::middleware::Middleware;
use http::Method;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn respond(tag: &'static str) -> crate::dispatcher::Handler {
    handler(move |_req| HandlerOutcome::Respond(HandlerResponse::json(200, json!({ "tag": tag }))))
}

fn tag_of(res: &HandlerResponse) -> Option<&str> {
    res.body.get("tag").and_then(|t| t.as_str())
}

#[test]
fn test_root_path() {
    let (re, params) = path_to_regex("/").unwrap();
    assert!(re.is_match("/"));
    assert!(!re.is_match("/x"));
    assert!(params.is_empty());
}

#[test]
fn test_parameterized_path() {
    let (re, params) = path_to_regex("/items/:id").unwrap();
    assert!(re.is_match("/items/123"));
    assert!(re.is_match("/items/123/"));
    assert!(!re.is_match("/items"));
    assert_eq!(params, vec!["id"]);
}

#[test]
fn test_nested_path() {
    let route = RoutePattern::parse("/a/:b/c").unwrap();
    let params = route.matches("/a/1/c").unwrap();
    assert_eq!(params[0].0.as_ref(), "b");
    assert_eq!(params[0].1, "1");
}

#[test]
fn test_optional_and_wildcard() {
    let route = RoutePattern::parse("/files/:name?").unwrap();
    assert!(route.matches("/files").unwrap().is_empty());
    assert_eq!(route.matches("/files/a.txt").unwrap()[0].1, "a.txt");

    let route = RoutePattern::parse("/static/*").unwrap();
    assert_eq!(route.matches("/static/css/site.css").unwrap()[0].1, "css/site.css");
}

#[test]
fn test_literal_segments_are_escaped() {
    let route = RoutePattern::parse("/v1.0/items").unwrap();
    assert!(route.matches("/v1.0/items").is_some());
    assert!(route.matches("/v1x0/items").is_none());
}

#[test]
fn test_invalid_patterns() {
    assert!(RoutePattern::parse("users").is_err());
    assert!(RoutePattern::parse("/users/:").is_err());
}

#[test]
fn test_method_filter_and_fallthrough() {
    let mut router = Router::new();
    router
        .bind(
            Method::GET,
            "/users/:id",
            handler(|req| {
                req.body.insert("seen".to_string(), json!(true));
                HandlerOutcome::Next
            }),
        )
        .unwrap();
    router.bind(Method::GET, "/users/:id", respond("get")).unwrap();
    router.bind(Method::POST, "/users/:id", respond("post")).unwrap();

    let mut req = HandlerRequest::new(Method::GET, "/users/7");
    let res = router.dispatch(&mut req);
    assert_eq!(tag_of(&res), Some("get"));
    assert_eq!(req.body.get("seen"), Some(&json!(true)));
    assert_eq!(req.get_path_param("id"), Some("7"));

    let mut req = HandlerRequest::new(Method::POST, "/users/7");
    assert_eq!(tag_of(&router.dispatch(&mut req)), Some("post"));
}

#[test]
fn test_unmatched_route_is_found_404() {
    let router = Router::new();
    let mut req = HandlerRequest::new(Method::GET, "/nope");
    let res = router.dispatch(&mut req);
    assert_eq!(res.status, 404);
    assert_eq!(res.api_code(), Some(404));
}

struct Gate;

impl Middleware for Gate {
    fn before(&self, req: &mut HandlerRequest) -> Option<HandlerResponse> {
        req.get_header("x-deny")
            .map(|_| HandlerResponse::json(200, json!({ "tag": "denied" })))
    }
}

#[test]
fn test_route_middleware_short_circuits() {
    let mut router = Router::new();
    router
        .route_middleware("/secret", Some(Method::GET), Arc::new(Gate))
        .unwrap();
    router.bind(Method::GET, "/secret", respond("open")).unwrap();

    let mut req = HandlerRequest::new(Method::GET, "/secret");
    assert_eq!(tag_of(&router.dispatch(&mut req)), Some("open"));

    let mut req = HandlerRequest::new(Method::GET, "/secret");
    req.headers.push((Arc::from("x-deny"), "1".to_string()));
    assert_eq!(tag_of(&router.dispatch(&mut req)), Some("denied"));
}

#[derive(Default)]
struct Counter {
    after: AtomicUsize,
}

impl Middleware for Counter {
    fn after(&self, _req: &HandlerRequest, _res: &mut HandlerResponse, _latency: Duration) {
        self.after.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_global_after_sees_every_response() {
    let counter = Arc::new(Counter::default());
    let mut router = Router::new();
    router.use_middleware(Arc::clone(&counter) as Arc<dyn Middleware>);
    router.bind(Method::GET, "/", respond("root")).unwrap();

    router.dispatch(&mut HandlerRequest::new(Method::GET, "/"));
    router.dispatch(&mut HandlerRequest::new(Method::GET, "/missing"));
    assert_eq!(counter.after.load(Ordering::SeqCst), 2);
}

#[test]
fn test_mount_replaces_in_place() {
    let mut router = Router::new();
    router
        .mount("a", "/x", Some(Method::GET), vec![Stage::Handler(respond("a1"))])
        .unwrap();
    router
        .mount("b", "/x", Some(Method::GET), vec![Stage::Handler(respond("b"))])
        .unwrap();
    router
        .mount("a", "/x", Some(Method::GET), vec![Stage::Handler(respond("a2"))])
        .unwrap();

    assert_eq!(router.len(), 2);
    let mut req = HandlerRequest::new(Method::GET, "/x");
    assert_eq!(tag_of(&router.dispatch(&mut req)), Some("a2"));
}
