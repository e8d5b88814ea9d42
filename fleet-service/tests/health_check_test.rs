//! Health, readiness and metrics endpoints.

mod common;

use common::TestApp;

#[tokio::test]
async fn health_check_returns_200() {
    let app = TestApp::spawn().await;

    let response = app
        .client()
        .get(app.url("/health"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "fleet-service-test");
}

#[tokio::test]
async fn readiness_needs_no_token() {
    let app = TestApp::spawn().await;

    let response = app
        .client()
        .get(app.url("/ready"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn metrics_expose_request_counters() {
    let app = TestApp::spawn().await;
    app.get("/own-firms").await;

    let response = app
        .client()
        .get(app.url("/metrics"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 200);
    let body = response.text().await.expect("Failed to read body");
    assert!(body.contains("fleet_http_requests_total"));
}
