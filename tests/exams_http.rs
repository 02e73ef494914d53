mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::app::{spawn_test_server, TestApp};
use common::auth::{auth_header, user_token};
use common::http::{assert_json_error, assert_status_ok_json, request, response_json};

async fn submit_exam(
    test_app: &TestApp,
    token: &str,
    subject_id: &str,
    results: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let resp = request(
        &test_app.app,
        Method::POST,
        "/api/exams/complete",
        Some(json!({ "subjectId": subject_id, "results": results })),
        &[("authorization", auth_header(token))],
    )
    .await;
    let (status, _, body) = response_json(resp).await;
    (status, body)
}

#[tokio::test]
async fn complete_exam_requires_token() {
    let test_app = spawn_test_server().await;

    let resp = request(
        &test_app.app,
        Method::POST,
        "/api/exams/complete",
        Some(json!({ "subjectId": "CMET", "results": [] })),
        &[],
    )
    .await;
    let (status, _, body) = response_json(resp).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_json_error(&body, "AUTH_UNAUTHORIZED");
}

#[tokio::test]
async fn token_subject_with_key_separator_is_rejected() {
    let test_app = spawn_test_server().await;
    // A colon in the subject would bleed into another principal's key prefix.
    let token = user_token(&test_app.config, "student:impostor");

    let resp = request(
        &test_app.app,
        Method::GET,
        "/api/weak-points",
        None,
        &[("authorization", auth_header(&token))],
    )
    .await;
    let (status, _, body) = response_json(resp).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_json_error(&body, "AUTH_UNAUTHORIZED");
}

#[tokio::test]
async fn complete_exam_creates_weak_points_per_topic() {
    let test_app = spawn_test_server().await;
    let token = user_token(&test_app.config, "student-1");

    let (status, body) = submit_exam(
        &test_app,
        &token,
        "CMET",
        json!([
            { "topic": "Wind Shear", "correct": false },
            { "topic": "Wind Shear", "correct": false },
            { "topic": "METAR Decoding", "correct": true },
        ]),
    )
    .await;

    assert_status_ok_json(status, &body);
    let data = &body["data"];
    assert_eq!(data["subjectId"], "CMET");
    assert_eq!(data["subjectName"], "CPL Meteorology");
    assert_eq!(data["topicsUpdated"], 2);

    let points = data["weakPoints"].as_array().expect("weakPoints array");
    assert_eq!(points.len(), 2);

    let wind_shear = points
        .iter()
        .find(|p| p["topic"] == "Wind Shear")
        .expect("Wind Shear entry");
    assert_eq!(wind_shear["accuracy"], 0);
    assert_eq!(wind_shear["questionsAttempted"], 2);
    assert_eq!(wind_shear["priority"], "high");
    assert_eq!(wind_shear["subjectName"], "CPL Meteorology");

    let metar = points
        .iter()
        .find(|p| p["topic"] == "METAR Decoding")
        .expect("METAR entry");
    assert_eq!(metar["accuracy"], 100);
    assert_eq!(metar["questionsAttempted"], 1);
    assert_eq!(metar["priority"], "low");
}

#[tokio::test]
async fn repeat_submission_merges_weighted() {
    let test_app = spawn_test_server().await;
    let token = user_token(&test_app.config, "student-merge");

    // First attempt: 8 of 10 correct on one topic.
    let first: Vec<serde_json::Value> = (0..10)
        .map(|i| json!({ "topic": "VOR Tracking", "correct": i < 8 }))
        .collect();
    let (status, _) = submit_exam(&test_app, &token, "CNAV", json!(first)).await;
    assert_eq!(status, StatusCode::OK);

    // Second attempt: 5 of 5 correct. 13/15 rounds to 87.
    let second: Vec<serde_json::Value> = (0..5)
        .map(|_| json!({ "topic": "VOR Tracking", "correct": true }))
        .collect();
    let (status, body) = submit_exam(&test_app, &token, "CNAV", json!(second)).await;

    assert_status_ok_json(status, &body);
    let point = &body["data"]["weakPoints"][0];
    assert_eq!(point["accuracy"], 87);
    assert_eq!(point["questionsAttempted"], 15);
    assert_eq!(point["priority"], "low");
}

#[tokio::test]
async fn unknown_subject_is_rejected() {
    let test_app = spawn_test_server().await;
    let token = user_token(&test_app.config, "student-2");

    let (status, body) = submit_exam(
        &test_app,
        &token,
        "PPL-MET",
        json!([{ "topic": "Fog", "correct": true }]),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_json_error(&body, "UNKNOWN_SUBJECT");
}

#[tokio::test]
async fn empty_results_are_rejected() {
    let test_app = spawn_test_server().await;
    let token = user_token(&test_app.config, "student-3");

    let (status, body) = submit_exam(&test_app, &token, "CMET", json!([])).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_json_error(&body, "VALIDATION_ERROR");
}

#[tokio::test]
async fn oversized_batch_is_rejected() {
    let test_app = spawn_test_server().await;
    let token = user_token(&test_app.config, "student-4");

    let oversized: Vec<serde_json::Value> = (0..201)
        .map(|i| json!({ "topic": format!("Topic {i}"), "correct": true }))
        .collect();
    let (status, body) = submit_exam(&test_app, &token, "CMET", json!(oversized)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_json_error(&body, "BATCH_TOO_LARGE");
}

#[tokio::test]
async fn weak_point_listing_is_sorted_and_scoped() {
    let test_app = spawn_test_server().await;
    let token = user_token(&test_app.config, "student-list");
    let other_token = user_token(&test_app.config, "student-other");

    submit_exam(
        &test_app,
        &token,
        "CMET",
        json!([
            { "topic": "Thunderstorms", "correct": true },
            { "topic": "Thunderstorms", "correct": true },
            { "topic": "Icing", "correct": false },
        ]),
    )
    .await;
    submit_exam(
        &test_app,
        &token,
        "CNAV",
        json!([
            { "topic": "Dead Reckoning", "correct": true },
            { "topic": "Dead Reckoning", "correct": false },
        ]),
    )
    .await;
    submit_exam(
        &test_app,
        &other_token,
        "CMET",
        json!([{ "topic": "Icing", "correct": false }]),
    )
    .await;

    let resp = request(
        &test_app.app,
        Method::GET,
        "/api/weak-points",
        None,
        &[("authorization", auth_header(&token))],
    )
    .await;
    let (status, _, body) = response_json(resp).await;

    assert_status_ok_json(status, &body);
    let points = body["data"].as_array().expect("data array");
    assert_eq!(points.len(), 3);
    // Weakest topic first.
    assert_eq!(points[0]["topic"], "Icing");
    assert_eq!(points[0]["accuracy"], 0);
    assert_eq!(points[1]["topic"], "Dead Reckoning");
    assert_eq!(points[1]["accuracy"], 50);
    assert_eq!(points[2]["topic"], "Thunderstorms");
    assert_eq!(points[2]["accuracy"], 100);

    let resp = request(
        &test_app.app,
        Method::GET,
        "/api/weak-points/CMET",
        None,
        &[("authorization", auth_header(&token))],
    )
    .await;
    let (status, _, body) = response_json(resp).await;

    assert_status_ok_json(status, &body);
    let points = body["data"].as_array().expect("data array");
    assert_eq!(points.len(), 2);
    assert!(points.iter().all(|p| p["subjectId"] == "CMET"));
}
