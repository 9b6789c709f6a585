//! The REST surface end to end.

use std::sync::atomic::Ordering;

use gridgate_core::{ServiceDescriptor, ServiceUrl, TagValue};
use http::{HeaderMap, StatusCode};
use serde_json::json;

use crate::support::{body_json, call, call_body, call_full, env};

#[tokio::test]
async fn cs_listing_carries_scores_and_tags() {
    let env = env();
    let mut a = ServiceDescriptor::new("NS1", "meta2", "A:80", 42);
    a.tags
        .insert("tag.vol".into(), TagValue::Str("/srv/a".into()));
    let b = ServiceDescriptor::new("NS1", "meta2", "B:80", 17);
    env.conscience.set_services("meta2", vec![a, b]);

    let r = call(&env, "GET", "/cs/srv/ns/NS1/type/meta2").await;
    assert_eq!(r.status, StatusCode::OK);
    let j = body_json(&r);
    assert_eq!(j["status"], 200);
    assert_eq!(j["message"], "OK");
    assert_eq!(j["srv"][0]["addr"], "A:80");
    assert_eq!(j["srv"][0]["score"], 42);
    assert_eq!(j["srv"][0]["tags"]["tag.vol"], "/srv/a");
    assert_eq!(j["srv"][1]["addr"], "B:80");
    assert_eq!(j["srv"][1]["score"], 17);
}

#[tokio::test]
async fn cold_container_list_issues_one_lookup_per_stage() {
    let env = env();
    let r = call(&env, "GET", "/m2/container/ns/NS1/ref/R1").await;
    assert_eq!(r.status, StatusCode::OK);

    // One conscience (directory discovery), one directory (meta2
    // binding), one LIST against the backend.
    assert_eq!(env.conscience.list_calls.load(Ordering::SeqCst), 1);
    assert_eq!(env.directory.list_calls.load(Ordering::SeqCst), 1);
    assert_eq!(env.container.calls_for("list").len(), 1);

    let j = body_json(&r);
    for key in ["URL", "aliases", "headers", "contents", "chunks"] {
        assert!(j.get(key).is_some(), "missing payload key {}", key);
    }
    assert_eq!(j["aliases"], json!([]));
    assert_eq!(j["URL"]["ns"], "NS1");
    assert_eq!(j["URL"]["ref"], "R1");
}

#[tokio::test]
async fn flush_low_forces_a_new_meta2_lookup() {
    let env = env();
    // dir/srv goes through the resolver without the decache-on-use
    // policy of the container loop, so the second hit is cached.
    call(&env, "GET", "/dir/srv/ns/NS1/ref/R1/type/meta2").await;
    call(&env, "GET", "/dir/srv/ns/NS1/ref/R1/type/meta2").await;
    assert_eq!(env.directory.list_calls.load(Ordering::SeqCst), 1);

    let r = call(&env, "POST", "/cache/flush/low/").await;
    assert_eq!(r.status, StatusCode::OK);

    call(&env, "GET", "/dir/srv/ns/NS1/ref/R1/type/meta2").await;
    assert_eq!(env.directory.list_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn empty_service_list_is_refusable_by_header() {
    let env = env();

    // Plain request: empty list is a success.
    let r = call(&env, "GET", "/dir/srv/ns/NS1/ref/missing/type/meta2").await;
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(body_json(&r)["srv"], json!([]));

    // With the refusal header: soft 404.
    let mut headers = HeaderMap::new();
    headers.insert("x-disallow-empty-service-list", "true".parse().unwrap());
    let r = call_full(&env, "GET", "/dir/srv/ns/NS1/ref/missing/type/meta2", headers, "").await;
    assert_eq!(r.status, StatusCode::OK);
    let j = body_json(&r);
    assert_eq!(j["status"], 404);
    assert_eq!(j["message"], "No service linked");
}

#[tokio::test]
async fn dir_srv_lists_seq_url_args_records() {
    let env = env();
    env.directory.link(
        "R2",
        "rawx",
        vec![
            ServiceUrl::new(1, "10.0.0.1:6004", "opt=a"),
            ServiceUrl::new(2, "10.0.0.2:6004", ""),
        ],
    );
    let r = call(&env, "GET", "/dir/srv/ns/NS1/ref/R2/type/rawx").await;
    let j = body_json(&r);
    assert_eq!(j["srv"][0], json!({"seq": 1, "url": "10.0.0.1:6004", "args": "opt=a"}));
    assert_eq!(j["srv"][1]["seq"], 2);
}

#[tokio::test]
async fn reference_lifecycle_and_properties() {
    let env = env();

    let r = call(&env, "PUT", "/dir/ref/ns/NS1/ref/R9").await;
    assert_eq!(r.status, StatusCode::OK);

    // Creating it again conflicts, surfaced softly.
    let r = call(&env, "PUT", "/dir/ref/ns/NS1/ref/R9").await;
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(body_json(&r)["status"], 433);

    let r = call_body(
        &env,
        "PUT",
        "/dir/prop/ns/NS1/ref/R9",
        r#"{"pairs":{"color":"blue","owner":"svc"}}"#,
    )
    .await;
    assert_eq!(r.status, StatusCode::OK);

    let r = call_body(&env, "GET", "/dir/prop/ns/NS1/ref/R9", r#"{"keys":["color"]}"#).await;
    assert_eq!(body_json(&r)["pairs"], json!({"color": "blue"}));

    let r = call_body(&env, "DELETE", "/dir/prop/ns/NS1/ref/R9", r#"{"keys":["color"]}"#).await;
    assert_eq!(r.status, StatusCode::OK);
    let r = call_body(&env, "GET", "/dir/prop/ns/NS1/ref/R9", "").await;
    assert_eq!(body_json(&r)["pairs"], json!({"owner": "svc"}));

    let r = call(&env, "DELETE", "/dir/ref/ns/NS1/ref/R9").await;
    assert_eq!(r.status, StatusCode::OK);
}

#[tokio::test]
async fn dir_srv_link_actions() {
    let env = env();
    let r = call(&env, "POST", "/dir/srv/ns/NS1/ref/R1/type/rawx?action=link").await;
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(body_json(&r)["srv"][0]["url"], "10.0.0.9:6010");
    assert_eq!(
        env.directory.link_calls.lock().unwrap()[0],
        ("rawx".to_string(), "link".to_string())
    );

    let r = call(&env, "POST", "/dir/srv/ns/NS1/ref/R1/type/rawx?action=bogus").await;
    assert_eq!(r.status, StatusCode::BAD_REQUEST);
    assert_eq!(body_json(&r)["message"], "Invalid action [bogus]");
}

#[tokio::test]
async fn lb_single_pick_and_policies() {
    let env = env();
    env.state.lb.replace(
        "rawx",
        vec![
            ServiceDescriptor::new("NS1", "rawx", "10.0.0.1:6004", 50),
            ServiceDescriptor::new("NS1", "rawx", "10.0.0.2:6004", 50),
        ],
    );

    let r = call(&env, "GET", "/lb/sl/ns/NS1/type/rawx").await;
    assert_eq!(r.status, StatusCode::OK);
    let j = body_json(&r);
    assert_eq!(j["ns"], "NS1");
    assert_eq!(j["type"], "rawx");
    assert_eq!(j["srv"].as_array().unwrap().len(), 1);

    let r = call(&env, "GET", "/lb/rr/ns/NS1/type/rawx?size=2").await;
    assert_eq!(body_json(&r)["srv"].as_array().unwrap().len(), 2);

    // Unknown type: 460 soft.
    let r = call(&env, "GET", "/lb/sl/ns/NS1/type/nope").await;
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(body_json(&r)["status"], 460);

    // Unsatisfiable size: 481 soft.
    let r = call(&env, "GET", "/lb/wrr/ns/NS1/type/rawx?size=5").await;
    assert_eq!(body_json(&r)["status"], 481);
}

#[tokio::test]
async fn cache_status_and_tuning() {
    let env = env();
    call(&env, "GET", "/dir/srv/ns/NS1/ref/R1/type/meta2").await;

    let r = call(&env, "GET", "/cache/status/").await;
    let j = body_json(&r);
    assert_eq!(j["csm0"]["count"], 1);
    assert_eq!(j["meta1"]["count"], 1);
    assert_eq!(j["meta1"]["ttl"], 3600);

    let r = call(&env, "POST", "/cache/set/ttl/low/60").await;
    assert_eq!(r.status, StatusCode::OK);
    let r = call(&env, "POST", "/cache/set/max/high/128").await;
    assert_eq!(r.status, StatusCode::OK);

    let j = body_json(&call(&env, "GET", "/cache/status/").await);
    assert_eq!(j["meta1"]["ttl"], 60);
    assert_eq!(j["csm0"]["max"], 128);

    let r = call(&env, "POST", "/cache/set/ttl/low/nope").await;
    assert_eq!(r.status, StatusCode::BAD_REQUEST);
    assert_eq!(body_json(&r)["message"], "Invalid count [nope]");
}

#[tokio::test]
async fn cs_info_and_types() {
    let env = env();
    let r = call(&env, "GET", "/cs/info/ns/NS1").await;
    assert_eq!(body_json(&r)["ns_info"]["name"], "NS1");

    let r = call(&env, "GET", "/cs/types/ns/NS1").await;
    assert_eq!(body_json(&r)["srvtypes"], json!(["meta1", "meta2", "rawx"]));

    let r = call(&env, "HEAD", "/cs/srv/ns/NS1/type/rawx").await;
    assert_eq!(r.status, StatusCode::OK);
    let r = call(&env, "HEAD", "/cs/srv/ns/NS1/type/nope").await;
    assert_eq!(body_json(&r)["status"], 460);
}

#[tokio::test]
async fn content_routes_require_their_contract() {
    let env = env();

    // Content fetch works with the full hierarchy.
    let r = call(&env, "GET", "/m2/content/ns/NS1/ref/R1/path/obj").await;
    assert_eq!(r.status, StatusCode::OK);

    // beans action needs a parseable size.
    let r = call(&env, "POST", "/m2/content/ns/NS1/ref/R1/path/obj?action=beans").await;
    assert_eq!(r.status, StatusCode::BAD_REQUEST);
    assert_eq!(body_json(&r)["message"], "Missing size estimation");

    let r = call(
        &env,
        "POST",
        "/m2/content/ns/NS1/ref/R1/path/obj?action=beans&size=12x",
    )
    .await;
    assert_eq!(body_json(&r)["message"], "Invalid size format");

    let r = call(
        &env,
        "POST",
        "/m2/content/ns/NS1/ref/R1/path/obj?action=beans&size=4096",
    )
    .await;
    assert_eq!(r.status, StatusCode::OK);

    // force is the not-implemented overwrite.
    let r = call(&env, "POST", "/m2/content/ns/NS1/ref/R1/path/obj?action=force").await;
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(body_json(&r)["status"], 501);
}

#[tokio::test]
async fn content_put_checks_alias_names() {
    let env = env();
    let body = r#"{"beans":{"alias":[{"name":"other","ver":1}]}}"#;
    let r = call_body(&env, "PUT", "/m2/content/ns/NS1/ref/R1/path/obj", body).await;
    assert_eq!(r.status, StatusCode::BAD_REQUEST);
    assert_eq!(body_json(&r)["message"], "Path mismatch, (obj) vs (other)");

    let body = r#"{"beans":{"alias":[{"name":"obj","ver":1}]}}"#;
    let r = call_body(&env, "PUT", "/m2/content/ns/NS1/ref/R1/path/obj", body).await;
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(body_json(&r)["aliases"][0]["name"], "obj");
}

#[tokio::test]
async fn dedup_report_is_json_escaped() {
    let env = env();
    *env.container.dedup_report.lock().unwrap() =
        Some("freed 2 chunks \"quoted\"\npath: a/b".to_string());
    let r = call(&env, "POST", "/m2/container/ns/NS1/ref/R1?action=dedup").await;
    assert_eq!(r.status, StatusCode::OK);
    let j = body_json(&r);
    assert_eq!(j["msg"][0], "freed 2 chunks \"quoted\"\npath: a/b");
}
