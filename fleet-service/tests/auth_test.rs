//! Login, token checks and per-firm access control.

mod common;

use common::{error_of, TestApp, ROOT_USERNAME};
use serde_json::json;

#[tokio::test]
async fn login_returns_token_and_role() {
    let app = TestApp::spawn().await;

    let response = app
        .client()
        .post(app.url("/login"))
        .json(&json!({ "username": ROOT_USERNAME, "password": common::ROOT_PASSWORD }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["role"], "superuser");
    assert_eq!(body["token"], app.token.as_str());
}

#[tokio::test]
async fn wrong_password_is_rejected_in_german() {
    let app = TestApp::spawn().await;

    let response = app
        .client()
        .post(app.url("/login"))
        .json(&json!({ "username": ROOT_USERNAME, "password": "falsch-falsch" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 401);
    assert_eq!(error_of(response).await, "Benutzername oder Passwort ist falsch");
}

#[tokio::test]
async fn missing_or_unknown_token_is_401() {
    let app = TestApp::spawn().await;

    let response = app
        .client()
        .get(app.url("/own-firms"))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 401);

    let response = app
        .get_as(&uuid::Uuid::new_v4().to_string(), "/own-firms")
        .await;
    assert_eq!(response.status(), 401);

    let response = app.get_as("not-a-token", "/own-firms").await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn admin_only_reaches_assigned_firms() {
    let app = TestApp::spawn().await;
    let north = app.create_own_firm("Nordspedition").await;
    let south = app.create_own_firm("Südspedition").await;
    let token = app.create_admin("disponent", &[north]).await;

    let response = app
        .get_as(&token, &format!("/customers?own_firm_id={}", north))
        .await;
    assert_eq!(response.status(), 200);

    let response = app
        .get_as(&token, &format!("/customers?own_firm_id={}", south))
        .await;
    assert_eq!(response.status(), 403);

    let firms: serde_json::Value = app
        .get_as(&token, "/own-firms")
        .await
        .json()
        .await
        .expect("Failed to parse response");
    let names: Vec<&str> = firms
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Nordspedition"]);
}

#[tokio::test]
async fn plain_admin_cannot_manage_admins_or_firms() {
    let app = TestApp::spawn().await;
    let firm = app.create_own_firm("Nordspedition").await;
    let token = app.create_admin("disponent", &[firm]).await;

    assert_eq!(app.get_as(&token, "/admins").await.status(), 403);
    let response = app
        .post_as(&token, "/own-firms", json!({ "name": "Eigene Firma" }))
        .await;
    assert_eq!(response.status(), 403);
    assert_eq!(app.get_as(&token, "/audit-log").await.status(), 403);
}

#[tokio::test]
async fn weak_admin_password_is_rejected() {
    let app = TestApp::spawn().await;

    let response = app
        .post(
            "/admins",
            json!({
                "username": "schwach",
                "name": "Schwach",
                "password": "12345678"
            }),
        )
        .await;

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn admin_cannot_delete_themselves() {
    let app = TestApp::spawn().await;
    let admins: serde_json::Value = app
        .get("/admins")
        .await
        .json()
        .await
        .expect("Failed to parse response");
    let own_id = admins[0]["id"].as_i64().unwrap();

    let response = app.delete(&format!("/admins/{}", own_id)).await;
    assert_eq!(response.status(), 400);
}
