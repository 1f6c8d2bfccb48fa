//! Integration tests for admin-api endpoints
//!
//! Router driven in-process with `oneshot`, backed by in-memory SQLite.
//! Covers create/list/get for every kind, course update/delete, validation
//! rejection before persistence, store failure mapping, event broadcast,
//! health and status.

use admin_api::hub::ChannelSubscriber;
use admin_api::{build_router, AppState};
use admin_common::config::{AdminConfig, Timeouts};
use admin_common::store::{Ack, RecordQuery, RecordStore, SqlStore, StoreError};
use admin_common::{Kind, Record};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::mpsc::Receiver;
use tower::util::ServiceExt; // for `oneshot` method

/// Test helper: App over a fresh in-memory database
async fn setup_app() -> (Router, AppState) {
    let store = SqlStore::connect("sqlite::memory:", 1, Timeouts::default())
        .await
        .expect("Should open in-memory store");
    let state = AppState::new(Arc::new(store), AdminConfig::default());
    (build_router(state.clone()), state)
}

/// Test helper: Register a subscriber and return its receiving end
async fn listen(state: &AppState) -> Receiver<String> {
    let (subscriber, rx) = ChannelSubscriber::channel();
    state.hub.subscribe(Arc::new(subscriber)).await;
    rx
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    let request = match body {
        Some(body) => request.body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Should parse JSON")
    };
    (status, json)
}

fn next_event(rx: &mut Receiver<String>) -> Value {
    let text = rx.try_recv().expect("Should have received an event");
    serde_json::from_str(&text).unwrap()
}

fn physics_course() -> Value {
    json!({
        "title": "Wave Mechanics",
        "description": "Standing waves, interference and diffraction",
        "subject": "Physics",
        "level": "advanced",
        "price": 49.99,
        "duration_weeks": "6",
    })
}

// =============================================================================
// Health & status
// =============================================================================

#[tokio::test]
async fn test_health_reports_connected_store() {
    let (app, _) = setup_app().await;
    let (status, body) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["module"], "admin-api");
    assert_eq!(body["backend"], "sql");
    assert_eq!(body["database"], "connected");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_system_status_lists_entities_and_subscribers() {
    let (app, state) = setup_app().await;
    let _rx = listen(&state).await;

    let (status, body) = send(&app, "GET", "/api/system/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["subscribers"], 1);
    assert_eq!(
        body["entities"],
        json!(["blog_posts", "courses", "testimonials", "jobs"])
    );
    assert!(body["build"]["git_hash"].is_string());
}

// =============================================================================
// Create / list / get
// =============================================================================

#[tokio::test]
async fn test_create_course_persists_and_broadcasts() {
    let (app, state) = setup_app().await;
    let mut rx = listen(&state).await;

    let (status, body) = send(&app, "POST", "/api/courses", Some(physics_course())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["title"], "Wave Mechanics");
    let id = body["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["created_at"], body["created_at"]);
    assert_eq!(body["data"]["updated_at"], body["created_at"]);
    assert_eq!(body["data"]["duration_weeks"], 6);
    assert_eq!(body["data"]["is_published"], false);
    assert_eq!(body["data"]["created_by"], "admin");

    let event = next_event(&mut rx);
    assert_eq!(event["type"], "course_created");
    assert_eq!(event["data"]["id"], id.as_str());

    let (status, body) = send(&app, "GET", "/api/courses", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["items"][0]["id"], id.as_str());

    let (status, body) = send(&app, "GET", &format!("/api/courses/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["subject"], "Physics");
    assert_eq!(body["data"]["price"], 49.99);
}

#[tokio::test]
async fn test_create_ignores_client_supplied_id_and_timestamps() {
    let (app, _) = setup_app().await;

    let mut course = physics_course();
    course["id"] = json!("my-id");
    course["created_at"] = json!("garbage");
    course["updated_at"] = json!("1999-01-01");
    let (status, body) = send(&app, "POST", "/api/courses", Some(course)).await;

    assert_eq!(status, StatusCode::CREATED);
    let id = body["id"].as_str().unwrap();
    assert_ne!(id, "my-id");
    assert!(uuid::Uuid::parse_str(id).is_ok());
    let created_at = body["data"]["created_at"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(created_at).is_ok());
    assert_eq!(body["data"]["updated_at"], body["data"]["created_at"]);

    let (status, _) = send(&app, "GET", "/api/courses/my-id", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_subject_is_rejected_without_persisting_or_broadcasting() {
    let (app, state) = setup_app().await;
    let mut rx = listen(&state).await;

    let mut course = physics_course();
    course["subject"] = json!("Astrology");
    let (status, body) = send(&app, "POST", "/api/courses", Some(course)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["details"], json!(["Invalid subject: Astrology"]));

    let (_, list) = send(&app, "GET", "/api/courses", None).await;
    assert_eq!(list["count"], 0);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_missing_required_fields_are_all_reported() {
    let (app, _) = setup_app().await;
    let (status, body) = send(
        &app,
        "POST",
        "/api/testimonials",
        Some(json!({ "client_name": "  ", "rating": 9 })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body["details"],
        json!([
            "Client name is required",
            "Testimonial text is required",
            "Rating must be between 1 and 5"
        ])
    );
}

#[tokio::test]
async fn test_create_testimonial_and_blog_with_defaults() {
    let (app, _) = setup_app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/testimonials",
        Some(json!({ "client_name": "Asha", "testimonial_text": "Great tutors" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["client_name"], "Asha");
    assert_eq!(body["data"]["rating"], 5);
    assert_eq!(body["data"]["target_pages"], json!(["homepage"]));

    let (status, body) = send(
        &app,
        "POST",
        "/api/blogs",
        Some(json!({ "title": "Exam tips", "content": "Sleep.", "tags": "exams, study ,, tips" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["tags"], json!(["exams", "study", "tips"]));
    assert_eq!(body["data"]["author_name"], "Admin");
    assert_eq!(body["data"]["status"], "published");
}

#[tokio::test]
async fn test_job_listing_paginates_and_filters() {
    let (app, _) = setup_app().await;
    for title in ["Tutor", "Counsellor", "Coordinator"] {
        let (status, _) = send(
            &app,
            "POST",
            "/api/jobs",
            Some(json!({
                "title": title,
                "company_name": "Boss Academy",
                "location": "Remote",
                "description": "Help students succeed",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, body) = send(
        &app,
        "GET",
        "/api/jobs?order_by=title&order_direction=asc&limit=2&offset=1",
        None,
    )
    .await;
    assert_eq!(body["count"], 2);
    assert_eq!(body["items"][0]["title"], "Counsellor");
    assert_eq!(body["items"][1]["title"], "Tutor");

    let (_, body) = send(&app, "GET", "/api/jobs?search=TUT", None).await;
    assert_eq!(body["count"], 1);

    // Jobs have no subject column
    let (status, body) = send(&app, "GET", "/api/jobs?subject=Physics", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "MALFORMED_REQUEST");
}

#[tokio::test]
async fn test_course_filters_by_subject_and_price() {
    let (app, _) = setup_app().await;
    let courses = [
        ("Algebra I", "Mathematics", 20.0),
        ("Optics", "Physics", 35.0),
        ("Quantum", "Physics", 120.0),
    ];
    for (title, subject, price) in courses {
        let body = json!({
            "title": title,
            "description": "A complete introduction",
            "subject": subject,
            "price": price,
        });
        send(&app, "POST", "/api/courses", Some(body)).await;
    }

    let (_, body) = send(
        &app,
        "GET",
        "/api/courses?subject=Physics&max_price=100",
        None,
    )
    .await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["items"][0]["title"], "Optics");
}

#[tokio::test]
async fn test_unknown_record_is_not_found() {
    let (app, _) = setup_app().await;
    let (status, body) = send(&app, "GET", "/api/blogs/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_malformed_bodies_are_bad_requests() {
    let (app, _) = setup_app().await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/blogs")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "POST", "/api/blogs", Some(json!(["a"]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

// =============================================================================
// Course update / delete
// =============================================================================

#[tokio::test]
async fn test_update_and_delete_course() {
    let (app, state) = setup_app().await;
    let (_, created) = send(&app, "POST", "/api/courses", Some(physics_course())).await;
    let id = created["id"].as_str().unwrap().to_string();
    let uri = format!("/api/courses/{}", id);
    let mut rx = listen(&state).await;

    let (status, body) = send(
        &app,
        "PUT",
        &uri,
        Some(json!({ "price": 0, "is_featured": "true", "created_at": "1999-01-01" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated_fields"], json!(["is_featured", "price", "updated_at"]));

    let event = next_event(&mut rx);
    assert_eq!(event["type"], "course_updated");
    assert_eq!(event["data"]["id"], id.as_str());
    assert_eq!(event["data"]["changes"]["price"], 0.0);

    let (_, fetched) = send(&app, "GET", &uri, None).await;
    assert_eq!(fetched["data"]["price"], 0.0);
    assert_eq!(fetched["data"]["is_featured"], true);
    assert_eq!(fetched["data"]["created_at"], created["created_at"]);

    let (status, _) = send(&app, "PUT", &uri, Some(json!({ "price": -1 }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id.as_str());
    let event = next_event(&mut rx);
    assert_eq!(event["type"], "course_deleted");
    assert_eq!(event["data"], json!({ "id": id }));

    let (status, body) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_update_of_missing_course_is_not_found() {
    let (app, _) = setup_app().await;
    let (status, body) = send(
        &app,
        "PUT",
        "/api/courses/does-not-exist",
        Some(json!({ "title": "Renamed" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_only_courses_accept_updates() {
    let (app, _) = setup_app().await;
    let request = Request::builder()
        .method("DELETE")
        .uri("/api/jobs/abc")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

// =============================================================================
// Store failures
// =============================================================================

/// Store whose access policy rejects every write
struct DenyingStore;

#[async_trait]
impl RecordStore for DenyingStore {
    async fn insert(&self, _kind: Kind, _record: Record) -> Result<Record, StoreError> {
        Err(StoreError::AuthorizationDenied(
            "new row violates row-level security policy".into(),
        ))
    }

    async fn query(&self, _kind: Kind, _query: &RecordQuery) -> Result<Vec<Record>, StoreError> {
        Err(StoreError::TransientUnavailable("connection refused".into()))
    }

    async fn update(&self, _kind: Kind, _id: &str, _patch: Record) -> Result<Ack, StoreError> {
        Err(StoreError::AuthorizationDenied("denied".into()))
    }

    async fn delete(&self, _kind: Kind, _id: &str) -> Result<Ack, StoreError> {
        Err(StoreError::AuthorizationDenied("denied".into()))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(StoreError::TransientUnavailable("connection refused".into()))
    }

    fn backend_name(&self) -> &'static str {
        "rest"
    }
}

#[tokio::test]
async fn test_access_policy_denial_carries_solution_and_skips_broadcast() {
    let state = AppState::new(Arc::new(DenyingStore), AdminConfig::default());
    let app = build_router(state.clone());
    let mut rx = listen(&state).await;

    let (status, body) = send(&app, "POST", "/api/courses", Some(physics_course())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "ACCESS_POLICY_DENIED");
    assert!(body["solution"].is_string());
    assert!(rx.try_recv().is_err());

    let (status, body) = send(&app, "GET", "/api/courses", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "STORE_UNAVAILABLE");

    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unhealthy");
}
