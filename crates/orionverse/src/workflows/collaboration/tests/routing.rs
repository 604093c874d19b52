use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::workflows::collaboration::domain::Decision;
use crate::workflows::collaboration::engine::WorkflowEngine;
use crate::workflows::collaboration::router::collaboration_router;
use crate::workflows::collaboration::store::MemoryStore;

fn build_router() -> (axum::Router, WorkflowEngine<MemoryStore>) {
    let store = Arc::new(MemoryStore::default());
    let engine = Arc::new(WorkflowEngine::new(store.clone()));
    (collaboration_router(engine), WorkflowEngine::new(store))
}

fn as_user(
    request: axum::http::request::Builder,
    id: &str,
    name: &str,
) -> axum::http::request::Builder {
    request
        .header("x-user-id", id)
        .header("x-user-name", name)
        .header("content-type", "application/json")
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

#[tokio::test]
async fn publishing_requires_an_identity_header() {
    let (router, _) = build_router();
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/posts")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::to_vec(&json!({
                "title": "Untitled",
                "description": "No identity attached",
                "postType": "PROBLEM",
            }))
            .expect("serialize"),
        ))
        .expect("request");

    let response = router.oneshot(request).await.expect("router dispatch");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn publish_and_fetch_round_trip() {
    let (router, _) = build_router();
    let request = as_user(Request::builder().method("POST").uri("/api/v1/posts"), "u1", "Alice")
        .body(Body::from(
            serde_json::to_vec(&json!({
                "title": "Fix flaky data sync",
                "description": "Records drop under load.",
                "postType": "PROBLEM",
                "tags": ["backend"],
            }))
            .expect("serialize"),
        ))
        .expect("request");

    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("router dispatch");
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = json_body(response).await;
    assert_eq!(created.get("postType"), Some(&json!("problem")));
    assert_eq!(created.get("applicationsCount"), Some(&json!(0)));
    assert_eq!(created.get("acceptsApplications"), Some(&json!(true)));
    let post_id = created
        .get("id")
        .and_then(Value::as_str)
        .expect("id present");

    let response = router
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/api/v1/posts/{post_id}"))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("router dispatch");
    assert_eq!(response.status(), StatusCode::OK);
    let fetched = json_body(response).await;
    assert_eq!(fetched.get("title"), Some(&json!("Fix flaky data sync")));
}

#[tokio::test]
async fn duplicate_application_maps_to_conflict() {
    let (router, engine) = build_router();
    let post = publish_problem(&engine);

    let apply = |router: axum::Router| {
        let request = as_user(
            Request::builder()
                .method("POST")
                .uri(format!("/api/v1/posts/{}/applications", post.id.0)),
            "u2",
            "Bob",
        )
        .body(Body::from(
            serde_json::to_vec(&json!({ "proposal": "I can do this" })).expect("serialize"),
        ))
        .expect("request");
        async move { router.oneshot(request).await.expect("router dispatch") }
    };

    let first = apply(router.clone()).await;
    assert_eq!(first.status(), StatusCode::CREATED);
    let payload = json_body(first).await;
    assert_eq!(payload.get("status"), Some(&json!("pending")));

    let second = apply(router).await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let payload = json_body(second).await;
    assert!(payload
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .contains("already applied"));
}

#[tokio::test]
async fn only_the_author_may_decide_over_http() {
    let (router, engine) = build_router();
    let (_, application) = applied(&engine);

    let decide = |router: axum::Router, user: (&'static str, &'static str)| {
        let uri = format!("/api/v1/applications/{}/decision", application.id.0);
        let request = as_user(Request::builder().method("POST").uri(uri), user.0, user.1)
            .body(Body::from(
                serde_json::to_vec(&json!({ "decision": "ACCEPT" })).expect("serialize"),
            ))
            .expect("request");
        async move { router.oneshot(request).await.expect("router dispatch") }
    };

    let forbidden = decide(router.clone(), ("u2", "Bob")).await;
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let accepted = decide(router.clone(), ("u1", "Alice")).await;
    assert_eq!(accepted.status(), StatusCode::OK);
    let payload = json_body(accepted).await;
    assert_eq!(payload.get("status"), Some(&json!("accepted")));

    let again = decide(router, ("u1", "Alice")).await;
    assert_eq!(again.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn illegal_project_transitions_are_unprocessable() {
    let (router, engine) = build_router();
    let (_, application) = applied(&engine);
    engine
        .decide(&author(), &application.id, Decision::Accept)
        .expect("decision lands");
    let project = engine
        .projects_for(&developer().id)
        .expect("projects load")
        .remove(0);

    let response = router
        .oneshot(
            as_user(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/v1/projects/{}/status", project.id.0)),
                "u2",
                "Bob",
            )
            .body(Body::from(
                serde_json::to_vec(&json!({ "status": "COMPLETED" })).expect("serialize"),
            ))
            .expect("request"),
        )
        .await
        .expect("router dispatch");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = json_body(response).await;
    assert!(payload
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .contains("cannot move"));
}

#[tokio::test]
async fn notification_feed_reports_unread_counts() {
    let (router, engine) = build_router();
    let (_, application) = applied(&engine);
    engine
        .decide(&author(), &application.id, Decision::Accept)
        .expect("decision lands");

    let response = router
        .oneshot(
            as_user(
                Request::builder().method("GET").uri("/api/v1/notifications"),
                "u2",
                "Bob",
            )
            .body(Body::empty())
            .expect("request"),
        )
        .await
        .expect("router dispatch");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = json_body(response).await;
    assert_eq!(payload.get("unread"), Some(&json!(1)));
    let notifications = payload
        .get("notifications")
        .and_then(Value::as_array)
        .expect("notifications array");
    assert_eq!(notifications.len(), 1);
    assert_eq!(
        notifications[0].get("type"),
        Some(&json!("application_accepted"))
    );
}
