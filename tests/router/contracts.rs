//! Token and query contracts of the route table.

use http::StatusCode;

use crate::support::{body_json, call, env};

#[tokio::test]
async fn unknown_route_is_a_bare_404() {
    let env = env();
    let r = call(&env, "GET", "/nope/such/route").await;
    assert_eq!(r.status, StatusCode::NOT_FOUND);
    assert!(r.body.is_empty());
}

#[tokio::test]
async fn wrong_method_on_known_prefix_is_a_bare_405() {
    let env = env();
    let r = call(&env, "PATCH", "/m2/container/ns/NS1/ref/R1").await;
    assert_eq!(r.status, StatusCode::METHOD_NOT_ALLOWED);
    assert!(r.body.is_empty());
}

#[tokio::test]
async fn missing_path_token_names_the_token() {
    let env = env();
    let r = call(&env, "GET", "/m2/content/ns/NS1/ref/R1").await;
    assert_eq!(r.status, StatusCode::BAD_REQUEST);
    let j = body_json(&r);
    assert_eq!(j["status"], 400);
    assert_eq!(j["message"], "Missing PATH");
}

#[tokio::test]
async fn missing_ns_and_ref_are_named_too() {
    let env = env();
    let r = call(&env, "GET", "/m2/container/ref/R1").await;
    assert_eq!(body_json(&r)["message"], "Missing NS");

    let r = call(&env, "GET", "/m2/container/ns/NS1").await;
    assert_eq!(body_json(&r)["message"], "Missing REF");

    let r = call(&env, "GET", "/lb/sl/ns/NS1").await;
    assert_eq!(body_json(&r)["message"], "Missing TYPE");
}

#[tokio::test]
async fn unexpected_token_is_rejected() {
    let env = env();
    let r = call(&env, "GET", "/m2/container/ns/NS1/ref/R1/bogus/x").await;
    assert_eq!(r.status, StatusCode::BAD_REQUEST);
    assert_eq!(body_json(&r)["message"], "Unexpected URI token [bogus]");
}

#[tokio::test]
async fn duplicate_token_is_rejected() {
    let env = env();
    let r = call(&env, "GET", "/m2/container/ns/NS1/ns/NS1/ref/R1").await;
    assert_eq!(r.status, StatusCode::BAD_REQUEST);
    assert_eq!(body_json(&r)["message"], "Duplicate URI token [ns]");
}

#[tokio::test]
async fn dangling_key_is_invalid_uri() {
    let env = env();
    let r = call(&env, "GET", "/m2/container/ns/NS1/ref").await;
    assert_eq!(r.status, StatusCode::BAD_REQUEST);
    assert_eq!(body_json(&r)["message"], "Invalid URI");
}

#[tokio::test]
async fn token_keys_are_case_insensitive() {
    let env = env();
    let r = call(&env, "GET", "/m2/container/NS/NS1/Ref/R1").await;
    assert_eq!(r.status, StatusCode::OK);
}

#[tokio::test]
async fn path_tokens_are_percent_decoded() {
    let env = env();
    env.directory
        .link("my ref", "meta2", vec![gridgate_core::ServiceUrl::new(1, "127.0.0.1:6010", "")]);
    let r = call(&env, "GET", "/m2/container/ns/NS1/ref/my%20ref").await;
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(body_json(&r)["URL"]["ref"], "my ref");
}

#[tokio::test]
async fn unknown_query_argument_is_rejected() {
    let env = env();
    let r = call(&env, "GET", "/m2/container/ns/NS1/ref/R1?bogus=1").await;
    assert_eq!(r.status, StatusCode::BAD_REQUEST);
    assert_eq!(body_json(&r)["message"], "Unexpected query argument [bogus]");
}

#[tokio::test]
async fn missing_required_query_argument_is_named() {
    let env = env();
    let r = call(&env, "POST", "/m2/container/ns/NS1/ref/R1").await;
    assert_eq!(r.status, StatusCode::BAD_REQUEST);
    assert_eq!(body_json(&r)["message"], "Missing ACTION");
}

#[tokio::test]
async fn foreign_namespace_is_a_soft_error() {
    let env = env();
    let r = call(&env, "GET", "/m2/container/ns/OTHER/ref/R1").await;
    assert_eq!(r.status, StatusCode::OK);
    let j = body_json(&r);
    assert_eq!(j["status"], 418);
    assert_eq!(j["message"], "Invalid NS");
}

#[tokio::test]
async fn fragment_is_dropped_from_the_uri() {
    let env = env();
    let r = call(&env, "GET", "/m2/container/ns/NS1/ref/R1#section").await;
    assert_eq!(r.status, StatusCode::OK);
}

#[tokio::test]
async fn empty_type_token_is_rejected() {
    let env = env();
    let r = call(&env, "GET", "/dir/srv/ns/NS1/ref/R1/type/").await;
    // The trailing empty segment drops, leaving a dangling key.
    assert_eq!(r.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn head_status_has_no_body() {
    let env = env();
    let r = call(&env, "HEAD", "/status").await;
    assert_eq!(r.status, StatusCode::OK);
    assert!(r.body.is_empty());
}

#[tokio::test]
async fn status_page_is_properties_text() {
    let env = env();
    call(&env, "GET", "/m2/container/ns/NS1/ref/R1").await;
    let r = call(&env, "GET", "/status").await;
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(r.content_type, Some("text/x-java-properties"));
    let text = String::from_utf8(r.body.to_vec()).unwrap();
    assert!(text.contains("proxy.req.m2 = 1"));
    assert!(text.contains("cache.srv.count ="));
}
