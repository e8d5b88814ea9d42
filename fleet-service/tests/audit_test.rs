//! Audit entries written by mutations.

mod common;

use common::{error_of, TestApp};
use serde_json::{json, Value};

async fn create_truck(app: &TestApp, firm: i64, plate: &str) -> i64 {
    let response = app
        .post(
            "/trucks",
            json!({ "own_firm_id": firm, "plate": plate, "manufacturer": "MAN", "model": "TGX" }),
        )
        .await;
    assert_eq!(response.status(), 201);
    common::id_of(response).await
}

#[tokio::test]
async fn field_changes_are_narrated() {
    let app = TestApp::spawn().await;
    let firm = app.create_own_firm("Harby Logistik").await;
    let truck = create_truck(&app, firm, "HH-HL 101").await;

    let response = app
        .patch(&format!("/trucks/{}", truck), json!({ "model": "TGS" }))
        .await;
    assert_eq!(response.status(), 200);

    let messages = app.audit_messages(firm).await;
    assert!(messages[0].starts_with("Daten zum LKW HH-HL 101 wurden verändert. Veränderungen: "));
    assert!(messages[0].contains("TGX => TGS"));
}

#[tokio::test]
async fn empty_patch_still_writes_an_entry() {
    let app = TestApp::spawn().await;
    let firm = app.create_own_firm("Harby Logistik").await;
    let truck = create_truck(&app, firm, "HH-HL 102").await;
    let before = app.audit_messages(firm).await.len();

    let response = app.patch(&format!("/trucks/{}", truck), json!({})).await;
    assert_eq!(response.status(), 200);

    let messages = app.audit_messages(firm).await;
    assert_eq!(messages.len(), before + 1);
    assert_eq!(
        messages[0],
        "Daten zum LKW HH-HL 102 wurden verändert. Veränderungen: "
    );
}

#[tokio::test]
async fn entries_carry_the_acting_admin() {
    let app = TestApp::spawn().await;
    let firm = app.create_own_firm("Harby Logistik").await;
    let token = app.create_admin("disponent", &[firm]).await;

    let response = app
        .post_as(&token, "/customers", json!({ "own_firm_id": firm, "name": "Paketdienst Nord" }))
        .await;
    assert_eq!(response.status(), 201);

    let entries: Value = app
        .get(&format!("/audit-log?own_firm_id={}", firm))
        .await
        .json()
        .await
        .expect("Failed to parse response");
    let newest = &entries[0];
    assert_eq!(newest["admin_name"], "disponent");
    assert_eq!(newest["message"], "Kunde Paketdienst Nord wurde hinzugefügt.");
}

#[tokio::test]
async fn duplicates_are_rejected_with_german_messages() {
    let app = TestApp::spawn().await;
    let firm = app.create_own_firm("Harby Logistik").await;
    create_truck(&app, firm, "HH-HL 103").await;

    let response = app
        .post("/trucks", json!({ "own_firm_id": firm, "plate": "HH-HL 103" }))
        .await;
    assert_eq!(response.status(), 409);
    assert_eq!(
        error_of(response).await,
        "Es existiert bereits ein LKW mit diesem Kennzeichen."
    );

    let response = app.post("/own-firms", json!({ "name": "Harby Logistik" })).await;
    assert_eq!(response.status(), 409);
    assert_eq!(
        error_of(response).await,
        "Es existiert bereits eine Firma mit diesem Namen."
    );
}

#[tokio::test]
async fn rejected_mutation_leaves_no_entry() {
    let app = TestApp::spawn().await;
    let firm = app.create_own_firm("Harby Logistik").await;
    create_truck(&app, firm, "HH-HL 104").await;
    let before = app.audit_messages(firm).await.len();

    let response = app
        .post("/trucks", json!({ "own_firm_id": firm, "plate": "HH-HL 104" }))
        .await;
    assert_eq!(response.status(), 409);

    assert_eq!(app.audit_messages(firm).await.len(), before);
}

#[tokio::test]
async fn superuser_lists_the_whole_log() {
    let app = TestApp::spawn().await;
    let north = app.create_own_firm("Nordspedition").await;
    let south = app.create_own_firm("Südspedition").await;
    app.create_customer(north, "Paketdienst Nord").await;
    app.create_customer(south, "Paketdienst Süd").await;

    let entries: Value = app
        .get("/audit-log")
        .await
        .json()
        .await
        .expect("Failed to parse response");
    let firms: Vec<Option<i64>> = entries
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["own_firm_id"].as_i64())
        .collect();
    assert!(firms.contains(&Some(north)));
    assert!(firms.contains(&Some(south)));
}
