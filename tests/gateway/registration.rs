//! Registration flow and the coalescing push queue.

use http::StatusCode;

use crate::support::{body_json, call_body, env};
use gridgate::tasks;

#[tokio::test]
async fn push_registration_echoes_and_queues() {
    let env = env();
    let r = call_body(
        &env,
        "PUT",
        "/cs/srv/ns/NS1/type/meta2",
        r#"{"ns_name":"NS1","addr":"C:80","score":7}"#,
    )
    .await;
    assert_eq!(r.status, StatusCode::OK);
    let j = body_json(&r);
    assert_eq!(j["status"], 200);
    assert_eq!(j["srv"]["addr"], "C:80");
    // Plain registration resets the score.
    assert_eq!(j["srv"]["score"], 0);
    assert_eq!(j["srv"]["type"], "meta2");

    // The next upstream tick flushes exactly one entry for the key.
    let queues = tasks::build(&env.state);
    queues.fire().await;
    let pushes = env.conscience.pushes.lock().unwrap();
    assert_eq!(pushes.len(), 1);
    assert_eq!(pushes[0].len(), 1);
    assert_eq!(pushes[0][0].service_key(), "C:80@meta2");
}

#[tokio::test]
async fn repeated_heartbeats_coalesce_per_key() {
    let env = env();
    for score in [1, 2, 3] {
        let body = format!(r#"{{"ns_name":"NS1","addr":"C:80","score":{}}}"#, score);
        let r = call_body(&env, "POST", "/cs/srv/ns/NS1/type/meta2?action=lock", &body).await;
        assert_eq!(r.status, StatusCode::OK);
    }
    // Another key survives alongside.
    call_body(
        &env,
        "PUT",
        "/cs/srv/ns/NS1/type/meta2",
        r#"{"ns_name":"NS1","addr":"D:80"}"#,
    )
    .await;

    assert_eq!(env.state.push.len(), 2);
    let batch = env.state.push.drain();
    let locked = batch.iter().find(|s| s.addr == "C:80").unwrap();
    // Last insert wins: the lock at score 3.
    assert_eq!(locked.score, 3);
    assert!(env.state.push.is_empty());
}

#[tokio::test]
async fn lock_keeps_body_score_and_unlock_forces_minus_one() {
    let env = env();

    let r = call_body(
        &env,
        "POST",
        "/cs/srv/ns/NS1/type/meta2?action=lock",
        r#"{"ns_name":"NS1","addr":"C:80","score":12}"#,
    )
    .await;
    assert_eq!(body_json(&r)["srv"]["score"], 12);

    let r = call_body(
        &env,
        "POST",
        "/cs/srv/ns/NS1/type/meta2?action=unlock",
        r#"{"ns_name":"NS1","addr":"C:80","score":12}"#,
    )
    .await;
    assert_eq!(body_json(&r)["srv"]["score"], -1);

    let r = call_body(
        &env,
        "POST",
        "/cs/srv/ns/NS1/type/meta2?action=promote",
        r#"{"ns_name":"NS1","addr":"C:80"}"#,
    )
    .await;
    assert_eq!(r.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn foreign_namespace_in_body_is_refused() {
    let env = env();
    let r = call_body(
        &env,
        "PUT",
        "/cs/srv/ns/NS1/type/meta2",
        r#"{"ns_name":"OTHER","addr":"C:80"}"#,
    )
    .await;
    assert_eq!(r.status, StatusCode::OK);
    let j = body_json(&r);
    assert_eq!(j["status"], 418);
    assert_eq!(j["message"], "Unexpected NS");
    assert!(env.state.push.is_empty());
}

#[tokio::test]
async fn invalid_registration_body_is_a_format_error() {
    let env = env();
    let r = call_body(&env, "PUT", "/cs/srv/ns/NS1/type/meta2", "{not json").await;
    assert_eq!(r.status, StatusCode::BAD_REQUEST);
    assert_eq!(body_json(&r)["status"], 400);
}

#[tokio::test]
async fn empty_queue_skips_the_push() {
    let env = env();
    let queues = tasks::build(&env.state);
    queues.fire().await;
    assert!(env.conscience.pushes.lock().unwrap().is_empty());
}

#[tokio::test]
async fn clear_deregisters_the_type() {
    let env = env();
    let r = call_body(&env, "DELETE", "/cs/srv/ns/NS1/type/rawx", "").await;
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(body_json(&r)["status"], 200);
    assert_eq!(*env.conscience.cleared.lock().unwrap(), vec!["rawx"]);
}
