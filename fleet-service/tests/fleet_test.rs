//! Workers, tours, fuel cards and the roster export.

mod common;

use base64::{engine::general_purpose::STANDARD, Engine};
use common::TestApp;
use serde_json::{json, Value};

async fn create_worker(app: &TestApp, firm: i64, nr: &str, name: &str) -> i64 {
    let response = app
        .post(
            "/workers",
            json!({
                "own_firm_id": firm,
                "worker_nr": nr,
                "name": name,
                "position": "Fahrer",
                "salary": "2800.00",
                "daily_expense": "14.50",
                "start_date": "2022-04-01"
            }),
        )
        .await;
    assert_eq!(response.status(), 201);
    common::id_of(response).await
}

#[tokio::test]
async fn duplicate_worker_nr_is_a_conflict() {
    let app = TestApp::spawn().await;
    let firm = app.create_own_firm("Harby Logistik").await;
    create_worker(&app, firm, "P-1", "Jan Petersen").await;

    let response = app
        .post(
            "/workers",
            json!({ "own_firm_id": firm, "worker_nr": "P-1", "name": "Ole Hansen" }),
        )
        .await;
    assert_eq!(response.status(), 409);
}

#[tokio::test]
async fn roster_export_is_an_xlsx() {
    let app = TestApp::spawn().await;
    let firm = app.create_own_firm("Harby Logistik").await;
    create_worker(&app, firm, "P-1", "Jan Petersen").await;
    create_worker(&app, firm, "P-2", "Ole Hansen").await;

    let response = app
        .get(&format!("/workers/roster?own_firm_id={}", firm))
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.expect("Failed to parse response");

    let name = body["name"].as_str().unwrap();
    assert!(name.starts_with("Harby Logistik Arbeiterliste "));
    assert!(name.ends_with(".xlsx"));
    let bytes = STANDARD.decode(body["file"].as_str().unwrap()).unwrap();
    assert!(bytes.starts_with(b"PK"));
}

#[tokio::test]
async fn tour_days_are_added_and_removed() {
    let app = TestApp::spawn().await;
    let firm = app.create_own_firm("Harby Logistik").await;
    let driver = create_worker(&app, firm, "P-1", "Jan Petersen").await;

    let response = app
        .post(
            "/tours",
            json!({ "own_firm_id": firm, "roller_nr": "R-17", "driver_id": driver }),
        )
        .await;
    assert_eq!(response.status(), 201);
    let tour = common::id_of(response).await;

    let response = app
        .post(
            &format!("/tours/{}/days", tour),
            json!({ "dates": ["2024-03-04", "2024-03-05"], "driver_ids": [driver] }),
        )
        .await;
    assert_eq!(response.status(), 201);

    let detail: Value = app
        .get(&format!("/tours/{}", tour))
        .await
        .json()
        .await
        .expect("Failed to parse response");
    let days = detail["days"].as_array().unwrap();
    assert_eq!(days.len(), 2);
    assert_eq!(days[0]["date"], "2024-03-04");

    let day_id = days[0]["id"].as_i64().unwrap();
    let response = app
        .client()
        .delete(app.url(&format!("/tours/{}/days", tour)))
        .header("x-admin-token", &app.token)
        .json(&json!({ "day_ids": [day_id] }))
        .send()
        .await
        .expect("Failed to execute request");
    assert!(response.status().is_success());

    let detail: Value = app
        .get(&format!("/tours/{}", tour))
        .await
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(detail["days"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn tour_rejects_driver_of_another_firm() {
    let app = TestApp::spawn().await;
    let firm = app.create_own_firm("Harby Logistik").await;
    let other = app.create_own_firm("Elbe Transporte").await;
    let foreign_driver = create_worker(&app, other, "P-9", "Kai Möller").await;

    let response = app
        .post(
            "/tours",
            json!({ "own_firm_id": firm, "roller_nr": "R-18", "driver_id": foreign_driver }),
        )
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn fuel_card_handover_moves_the_card() {
    let app = TestApp::spawn().await;
    let firm = app.create_own_firm("Harby Logistik").await;
    let driver = create_worker(&app, firm, "P-1", "Jan Petersen").await;

    let response = app
        .post(
            "/fuel-cards",
            json!({ "own_firm_id": firm, "card_nr": "7077 1234", "provider": "DKV" }),
        )
        .await;
    assert_eq!(response.status(), 201);
    let card = common::id_of(response).await;

    let response = app
        .post(
            &format!("/fuel-cards/{}/handovers", card),
            json!({ "worker_id": driver, "received_date": "2024-03-01" }),
        )
        .await;
    assert_eq!(response.status(), 201);
    let detail: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(detail["holder_id"], driver);
    assert_eq!(detail["handovers"].as_array().unwrap().len(), 1);

    let messages = app.audit_messages(firm).await;
    assert_eq!(
        messages[0],
        "Tankkarte 7077 1234 wurde am 01.03.2024 an Jan Petersen abgegeben"
    );
}

#[tokio::test]
async fn handover_returned_before_received_is_rejected() {
    let app = TestApp::spawn().await;
    let firm = app.create_own_firm("Harby Logistik").await;
    let driver = create_worker(&app, firm, "P-1", "Jan Petersen").await;
    let response = app
        .post("/fuel-cards", json!({ "own_firm_id": firm, "card_nr": "7077 9999" }))
        .await;
    let card = common::id_of(response).await;

    let response = app
        .post(
            &format!("/fuel-cards/{}/handovers", card),
            json!({
                "worker_id": driver,
                "received_date": "2024-03-10",
                "returned_date": "2024-03-01"
            }),
        )
        .await;
    assert_eq!(response.status(), 400);
}
