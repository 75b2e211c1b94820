use app::{AppState, router};
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use edu_core::time::fixed_clock;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use services::{CatalogImport, ProgressServices};
use tower::ServiceExt;

const S1: &str = "11111111-1111-4111-8111-111111111111";
const T1: &str = "22222222-2222-4222-8222-222222222201";
const T2: &str = "22222222-2222-4222-8222-222222222202";
const L1: &str = "33333333-3333-4333-8333-333333333301";
const L2: &str = "33333333-3333-4333-8333-333333333302";
const L3: &str = "33333333-3333-4333-8333-333333333303";
const USER: &str = "44444444-4444-4444-8444-444444444444";
const UNKNOWN_LESSON: &str = "55555555-5555-4555-8555-555555555555";

async fn app() -> Router {
    let raw = format!(
        r#"{{
            "subjects": [{{
                "id": "{S1}",
                "title": "Biology",
                "topics": [
                    {{ "id": "{T1}", "title": "Cells",
                       "lessons": [{{ "id": "{L1}", "title": "Membranes" }},
                                   {{ "id": "{L2}", "title": "Organelles" }}] }},
                    {{ "id": "{T2}", "title": "Genetics",
                       "lessons": [{{ "id": "{L3}", "title": "DNA" }}] }}
                ]
            }}]
        }}"#
    );
    let services = ProgressServices::in_memory(fixed_clock());
    services
        .catalog()
        .import(CatalogImport::from_json(&raw).unwrap())
        .await
        .unwrap();
    router(AppState::new(services))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn start_reports_whether_a_row_was_created() {
    let app = app().await;
    let uri = format!("/progress/lessons/{L1}/start");

    let (status, body) = send(&app, post(&uri, json!({ "userId": USER }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "created": true }));

    let (status, body) = send(&app, post(&uri, json!({ "userId": USER }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "created": false }));
}

#[tokio::test]
async fn completion_rolls_up_into_dashboard() {
    let app = app().await;

    let (status, body) = send(
        &app,
        post(
            &format!("/progress/lessons/{L1}/complete"),
            json!({ "userId": USER, "quizScore": 80 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "rollup": "updated" }));

    let (status, body) = send(&app, get(&format!("/progress/dashboard?userId={USER}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ S1: 25 }));

    let (status, body) = send(
        &app,
        get(&format!("/progress/subjects/{S1}/topics?userId={USER}")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ T1: 50, T2: 0 }));
}

#[tokio::test]
async fn lesson_progress_is_served_after_completion() {
    let app = app().await;
    let uri = format!("/progress/lessons/{L3}?userId={USER}");

    let (status, _) = send(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    send(
        &app,
        post(
            &format!("/progress/lessons/{L3}/complete"),
            json!({ "userId": USER, "quizScore": 92.5 }),
        ),
    )
    .await;

    let (status, body) = send(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["quizScore"], 92.5);
    assert_eq!(body["lessonId"], L3);
}

#[tokio::test]
async fn dashboard_for_new_user_is_empty() {
    let app = app().await;
    let (status, body) = send(&app, get(&format!("/progress/dashboard?userId={USER}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));
}

#[tokio::test]
async fn unknown_lesson_is_404() {
    let app = app().await;
    let (status, body) = send(
        &app,
        post(
            &format!("/progress/lessons/{UNKNOWN_LESSON}/complete"),
            json!({ "userId": USER }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn out_of_range_quiz_score_is_400() {
    let app = app().await;
    let (status, body) = send(
        &app,
        post(
            &format!("/progress/lessons/{L1}/complete"),
            json!({ "userId": USER, "quizScore": 101 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    // Nothing was recorded.
    let (_, body) = send(&app, get(&format!("/progress/dashboard?userId={USER}"))).await;
    assert_eq!(body, json!({}));
}

#[tokio::test]
async fn malformed_ids_are_400() {
    let app = app().await;

    let (status, _) = send(&app, get("/progress/dashboard?userId=not-a-uuid")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        post("/progress/lessons/lesson-one/start", json!({ "userId": USER })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_body_fields_are_400_with_envelope() {
    let app = app().await;

    let (status, body) = send(
        &app,
        post(
            &format!("/progress/lessons/{L1}/start"),
            json!({ "userId": "not-a-uuid" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().starts_with("malformed request"));

    let (status, body) = send(
        &app,
        post(
            &format!("/progress/lessons/{L1}/complete"),
            json!({ "userId": USER, "quizScore": "high" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    // Nothing was recorded by either request.
    let (status, _) = send(&app, get(&format!("/progress/lessons/{L1}?userId={USER}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
