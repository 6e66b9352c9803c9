use apirouter::endpoint::{EndpointDescriptor, Enctype, FileDecl};
use apirouter::postman::{update_postman_collection, MergeStats, SyncError};
use apirouter::registry::{ApiRouter, ApiRouterOptions};
use http::Method;
use serde_json::{json, Value};

fn auth_router() -> ApiRouter {
    let router = ApiRouter::new(
        ApiRouterOptions::default()
            .name("auth")
            .mountpath("/auth")
            .host("api.example.com", Some(8443)),
    );
    router
        .add(
            EndpointDescriptor::new("/login")
                .method(Method::POST)
                .description("Log in")
                .param(
                    "email",
                    json!({ "type": "string", "required": true, "description": "Account email", "example": "ada@example.com" }),
                )
                .param("remember", json!({ "type": "boolean" }))
                .query("redirect", json!({ "type": "string" }))
                .file("avatar", FileDecl::optional().mimetypes(["image/png"])),
        )
        .unwrap();
    router
        .add(
            EndpointDescriptor::new("/token")
                .method(Method::POST)
                .enctype(Enctype::Urlencoded)
                .param("grant", json!({ "type": "object", "example": { "kind": "refresh" } }))
                .file("ignored", FileDecl::optional()),
        )
        .unwrap();
    router
        .add(EndpointDescriptor::new("/debug").hidden(true))
        .unwrap();
    router
}

fn item<'a>(doc: &'a Value, name: &str) -> &'a Value {
    doc["collection"]["item"]
        .as_array()
        .unwrap()
        .iter()
        .find(|i| i["name"] == json!(name))
        .unwrap()
}

#[test]
fn test_new_items_are_appended() {
    let mut doc = json!({ "collection": { "info": { "name": "API" }, "item": [ { "name": "other" } ] } });
    let stats = update_postman_collection(&auth_router(), &mut doc).unwrap();
    assert_eq!(
        stats,
        MergeStats {
            replaced: 0,
            appended: 2,
            hidden: 1
        }
    );

    let items = doc["collection"]["item"].as_array().unwrap();
    let names: Vec<&str> = items.iter().filter_map(|i| i["name"].as_str()).collect();
    assert_eq!(names, vec!["other", "login", "token"]);
    assert_eq!(doc["collection"]["info"]["name"], json!("API"));
}

#[test]
fn test_item_shape() {
    let mut doc = json!({ "collection": { "item": [] } });
    update_postman_collection(&auth_router(), &mut doc).unwrap();
    let login = item(&doc, "login");

    assert_eq!(login["protocolProfileBehavior"], json!({ "disableBodyPruning": true }));
    assert_eq!(login["response"], json!([]));
    assert_eq!(login["request"]["method"], json!("POST"));
    assert_eq!(login["request"]["header"], json!([]));
    assert_eq!(login["request"]["description"], json!("Log in"));
    assert_eq!(login["request"]["body"]["mode"], json!("formdata"));
    assert_eq!(
        login["request"]["body"]["formdata"],
        json!([
            { "key": "email", "value": "ada@example.com", "type": "text", "description": "(string, required) Account email" },
            { "key": "remember", "value": "", "type": "text", "description": "(boolean, optional) " },
            { "key": "avatar", "value": "", "type": "file", "description": "(file, optional) [image/png]" }
        ])
    );
    assert_eq!(
        login["request"]["url"],
        json!({
            "raw": "https://api.example.com:8443/auth/login?redirect=",
            "protocol": "https",
            "host": ["api", "example", "com"],
            "port": "8443",
            "path": ["auth", "login"],
            "query": [
                { "key": "redirect", "value": "", "description": "(string, optional) " }
            ]
        })
    );
}

#[test]
fn test_urlencoded_endpoint_gets_header_and_no_files() {
    let mut doc = json!({ "collection": { "item": [] } });
    update_postman_collection(&auth_router(), &mut doc).unwrap();
    let token = item(&doc, "token");

    assert_eq!(
        token["request"]["header"],
        json!([{ "key": "Content-Type", "value": "application/x-www-form-urlencoded" }])
    );
    assert_eq!(token["request"]["body"]["mode"], json!("urlencoded"));
    assert_eq!(
        token["request"]["body"]["urlencoded"],
        json!([
            { "key": "grant", "value": "{\"kind\":\"refresh\"}", "type": "text", "description": "(object, optional) " }
        ])
    );
}

#[test]
fn test_replacement_keeps_position_ids_and_responses() {
    let mut doc = json!({
        "collection": {
            "item": [
                {
                    "name": "login",
                    "_postman_id": "pm-1",
                    "id": "id-1",
                    "request": {
                        "method": "GET",
                        "body": { "mode": "formdata", "formdata": [
                            { "key": "remember", "value": "true", "type": "text" }
                        ] },
                        "url": { "query": [ { "key": "redirect", "value": "/home" } ] }
                    },
                    "response": [ { "name": "ok" } ]
                },
                { "name": "other" }
            ]
        }
    });
    let stats = update_postman_collection(&auth_router(), &mut doc).unwrap();
    assert_eq!(stats.replaced, 1);

    let items = doc["collection"]["item"].as_array().unwrap();
    assert_eq!(items[0]["name"], json!("login"));
    assert_eq!(items[1]["name"], json!("other"));
    assert_eq!(items[2]["name"], json!("token"));

    let login = &items[0];
    assert_eq!(login["_postman_id"], json!("pm-1"));
    assert_eq!(login["id"], json!("id-1"));
    assert_eq!(login["response"], json!([{ "name": "ok" }]));
    assert_eq!(login["request"]["method"], json!("POST"));
    // previous remote values survive when no example is declared
    assert_eq!(login["request"]["body"]["formdata"][1]["value"], json!("true"));
    assert_eq!(login["request"]["url"]["query"][0]["value"], json!("/home"));
    assert_eq!(
        login["request"]["url"]["raw"],
        json!("https://api.example.com:8443/auth/login?redirect=%2Fhome")
    );
}

#[test]
fn test_merge_is_idempotent() {
    let router = auth_router();
    let mut doc = json!({ "collection": { "item": [ { "name": "login", "_postman_id": "x" } ] } });
    update_postman_collection(&router, &mut doc).unwrap();
    let first = doc.to_string();
    update_postman_collection(&router, &mut doc).unwrap();
    assert_eq!(doc.to_string(), first);
}

#[test]
fn test_rename_appends_new_item() {
    let router = auth_router();
    let mut doc = json!({ "collection": { "item": [] } });
    update_postman_collection(&router, &mut doc).unwrap();

    router
        .add(EndpointDescriptor::new("/signin").method(Method::POST))
        .unwrap();
    update_postman_collection(&router, &mut doc).unwrap();

    let names: Vec<&str> = doc["collection"]["item"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|i| i["name"].as_str())
        .collect();
    assert_eq!(names, vec!["login", "token", "signin"]);
}

#[test]
fn test_missing_item_array_is_created() {
    let mut doc = json!({ "collection": { "info": {} } });
    update_postman_collection(&auth_router(), &mut doc).unwrap();
    assert_eq!(doc["collection"]["item"].as_array().unwrap().len(), 2);
}

#[test]
fn test_malformed_document() {
    let router = auth_router();
    let err = update_postman_collection(&router, &mut json!({ "item": [] })).unwrap_err();
    assert!(matches!(err, SyncError::Malformed { .. }));

    let err = update_postman_collection(&router, &mut json!({ "collection": { "item": {} } }))
        .unwrap_err();
    assert!(matches!(err, SyncError::Malformed { .. }));
}

#[test]
fn test_string_ref_example_is_shown_unquoted() {
    let router = ApiRouter::new(ApiRouterOptions::default().name("people"));
    router.add_schema(json!({ "$id": "/Name", "type": "string" }), None);
    router
        .add(
            EndpointDescriptor::new("/hello")
                .query("name", json!({ "schema": { "$ref": "/Name" }, "example": "ada lovelace" }))
                .param("age", json!({ "type": "integer", "example": 36 })),
        )
        .unwrap();

    let mut doc = json!({ "collection": { "item": [] } });
    update_postman_collection(&router, &mut doc).unwrap();
    let hello = item(&doc, "hello");
    assert_eq!(hello["request"]["url"]["query"][0]["value"], json!("ada lovelace"));
    assert_eq!(hello["request"]["body"]["formdata"][0]["value"], json!("36"));
    assert!(hello["request"]["url"]["raw"]
        .as_str()
        .unwrap()
        .ends_with("/hello?name=ada+lovelace"));
}
