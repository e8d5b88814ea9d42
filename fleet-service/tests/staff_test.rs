//! Documents, debts, working times, offdays, tags, meetings, firm logos and
//! the dashboard.

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
                "daily_expense": "14.50",
                "holidays": 25
            }),
        )
        .await;
    assert_eq!(response.status(), 201);
    common::id_of(response).await
}

async fn create_tag(app: &TestApp, section: &str, name: &str) -> i64 {
    let response = app
        .post(
            "/tags",
            json!({ "section": section, "name": name, "colour": "#3a7bd5" }),
        )
        .await;
    assert_eq!(response.status(), 201);
    common::id_of(response).await
}

async fn json_of(response: reqwest::Response) -> Value {
    response.json().await.expect("Failed to parse response")
}

#[tokio::test]
async fn worker_document_file_is_stored_and_served() {
    let app = TestApp::spawn().await;
    let firm = app.create_own_firm("Harby Logistik").await;
    let worker = create_worker(&app, firm, "P-1", "Jan Petersen").await;

    let response = app
        .post(
            &format!("/workers/{}/documents", worker),
            json!({ "name": "Führerschein", "expiry_date": "2025-02-28" }),
        )
        .await;
    assert_eq!(response.status(), 201);
    let document = common::id_of(response).await;

    let response = app
        .upload(
            &format!("/documents/{}/file", document),
            "fuehrerschein.pdf",
            b"%PDF-1.4 scan".to_vec(),
        )
        .await;
    assert_eq!(response.status(), 200);
    let uploaded = json_of(response).await;
    assert!(uploaded["upload_date"].is_string());

    let stored = json_of(app.get(&format!("/documents/{}/file", document)).await).await;
    assert_eq!(stored["name"], "Führerschein.pdf");
    let bytes = STANDARD.decode(stored["file"].as_str().unwrap()).unwrap();
    assert_eq!(bytes, b"%PDF-1.4 scan");

    let response = app.delete(&format!("/documents/{}/file", document)).await;
    assert_eq!(response.status(), 200);
    let response = app.get(&format!("/documents/{}/file", document)).await;
    assert_eq!(response.status(), 404);

    let messages = app.audit_messages(firm).await;
    assert!(messages
        .iter()
        .any(|m| m.contains("Eine Datei wurde dem") && m.contains("Führerschein")));
}

#[tokio::test]
async fn document_uploads_above_the_default_body_limit_are_accepted() {
    let app = TestApp::spawn().await;
    let firm = app.create_own_firm("Harby Logistik").await;
    let response = app
        .post(
            "/trucks",
            json!({ "own_firm_id": firm, "plate": "HH-HL 101", "manufacturer": "MAN" }),
        )
        .await;
    let truck = common::id_of(response).await;

    let response = app
        .post(
            &format!("/trucks/{}/documents", truck),
            json!({ "name": "TÜV", "expiry_date": "2025-06-30" }),
        )
        .await;
    assert_eq!(response.status(), 201);
    let document = common::id_of(response).await;

    let scan = vec![b'%'; 2 * 1024 * 1024 + 100 * 1024];
    let response = app
        .upload(&format!("/documents/{}/file", document), "tuev.pdf", scan.clone())
        .await;
    assert_eq!(response.status(), 200);

    let stored = json_of(app.get(&format!("/documents/{}/file", document)).await).await;
    let bytes = STANDARD.decode(stored["file"].as_str().unwrap()).unwrap();
    assert_eq!(bytes.len(), scan.len());
}

#[tokio::test]
async fn pending_documents_are_listed_by_expiry() {
    let app = TestApp::spawn().await;
    let firm = app.create_own_firm("Harby Logistik").await;
    let worker = create_worker(&app, firm, "P-1", "Jan Petersen").await;

    for (name, expiry, done) in [
        ("Fahrerkarte", "2025-09-01", false),
        ("Führerschein", "2025-02-28", false),
        ("Schulung", "2024-11-15", true),
    ] {
        let response = app
            .post(
                &format!("/workers/{}/documents", worker),
                json!({ "name": name, "expiry_date": expiry, "done": done }),
            )
            .await;
        assert_eq!(response.status(), 201);
    }

    let pending = json_of(
        app.get(&format!("/documents?own_firm_id={}&pending_only=true", firm))
            .await,
    )
    .await;
    let names: Vec<&str> = pending
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Führerschein", "Fahrerkarte"]);
}

#[tokio::test]
async fn debt_ledger_sums_advances_and_repayments() {
    let app = TestApp::spawn().await;
    let firm = app.create_own_firm("Harby Logistik").await;
    let worker = create_worker(&app, firm, "P-1", "Jan Petersen").await;

    for (amount, date) in [("500.00", "2024-03-01"), ("-120.50", "2024-04-01")] {
        let response = app
            .post(
                &format!("/workers/{}/debts", worker),
                json!({ "amount": amount, "date": date }),
            )
            .await;
        assert_eq!(response.status(), 201);
    }

    let ledger = json_of(app.get(&format!("/workers/{}/debts", worker)).await).await;
    assert_eq!(ledger["debts"].as_array().unwrap().len(), 2);
    assert_eq!(ledger["summary"]["given"], "500.00");
    assert_eq!(ledger["summary"]["repaid"], "120.50");
    assert_eq!(ledger["summary"]["outstanding"], "379.50");

    let response = app
        .post(
            &format!("/workers/{}/debts", worker),
            json!({ "amount": "0", "date": "2024-05-01" }),
        )
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn planned_holidays_are_booked_on_the_account() {
    let app = TestApp::spawn().await;
    let firm = app.create_own_firm("Harby Logistik").await;
    let worker = create_worker(&app, firm, "P-1", "Jan Petersen").await;
    let holiday = create_tag(&app, "offday", "Urlaub").await;
    let sick = create_tag(&app, "offday", "Krank").await;

    // 2024-07-06 is a Saturday.
    let response = app
        .post(
            &format!("/workers/{}/offdays", worker),
            json!({ "dates": ["2024-07-01", "2024-07-02", "2024-07-06"], "tag_id": holiday }),
        )
        .await;
    assert_eq!(response.status(), 201);
    let planned = json_of(response).await;
    assert_eq!(planned.as_array().unwrap().len(), 2);

    let response = app
        .post(
            &format!("/workers/{}/offdays", worker),
            json!({ "dates": ["2024-07-02"], "tag_id": sick }),
        )
        .await;
    assert_eq!(response.status(), 201);

    let overview = json_of(
        app.get(&format!("/holiday-accounts?own_firm_id={}&year=2024", firm))
            .await,
    )
    .await;
    assert_eq!(overview["available_years"], json!([2024]));
    let entry = &overview["workers"][0];
    assert_eq!(entry["used_holiday_days"], 1);
    assert_eq!(entry["remaining_holiday_days"], 24);
    assert_eq!(entry["months"][6]["holiday"], json!(["2024-07-01"]));
    assert_eq!(entry["months"][6]["sick"], json!(["2024-07-02"]));

    let calendar = json_of(
        app.get(&format!(
            "/offdays?own_firm_id={}&year=2024&month=7&tag_id={}",
            firm, sick
        ))
        .await,
    )
    .await;
    assert_eq!(calendar[0]["offdays"].as_array().unwrap().len(), 1);
    assert_eq!(calendar[0]["offdays"][0]["tag"], "Krank");

    let messages = app.audit_messages(firm).await;
    assert!(messages
        .iter()
        .any(|m| m.starts_with("Urlaubsplanung für Mitarbeiter Jan Petersen(P-1) hinzugefügt")));
}

#[tokio::test]
async fn removing_a_holiday_refunds_the_day() {
    let app = TestApp::spawn().await;
    let firm = app.create_own_firm("Harby Logistik").await;
    let worker = create_worker(&app, firm, "P-1", "Jan Petersen").await;
    let holiday = create_tag(&app, "offday", "Urlaub").await;

    let planned = json_of(
        app.post(
            &format!("/workers/{}/offdays", worker),
            json!({ "dates": ["2024-08-05", "2024-08-06"], "tag_id": holiday }),
        )
        .await,
    )
    .await;
    let first = planned[0]["id"].as_i64().unwrap();

    let response = app
        .client()
        .delete(app.url(&format!("/workers/{}/offdays", worker)))
        .header("x-admin-token", &app.token)
        .json(&json!({ "ids": [first] }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 200);

    let overview = json_of(
        app.get(&format!("/holiday-accounts?own_firm_id={}&year=2024", firm))
            .await,
    )
    .await;
    assert_eq!(overview["workers"][0]["used_holiday_days"], 1);
    assert_eq!(overview["workers"][0]["remaining_holiday_days"], 24);
}

#[tokio::test]
async fn offday_plans_need_weekdays_and_an_offday_tag() {
    let app = TestApp::spawn().await;
    let firm = app.create_own_firm("Harby Logistik").await;
    let worker = create_worker(&app, firm, "P-1", "Jan Petersen").await;
    let holiday = create_tag(&app, "offday", "Urlaub").await;
    let tour_tag = create_tag(&app, "tour", "Kühlware").await;

    let response = app
        .post(
            &format!("/workers/{}/offdays", worker),
            json!({ "dates": ["2024-07-06", "2024-07-07"], "tag_id": holiday }),
        )
        .await;
    assert_eq!(response.status(), 400);
    assert!(common::error_of(response).await.contains("Keine Werktage"));

    let response = app
        .post(
            &format!("/workers/{}/offdays", worker),
            json!({ "dates": ["2024-07-01"], "tag_id": tour_tag }),
        )
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn tags_are_managed_by_superusers() {
    let app = TestApp::spawn().await;
    let firm = app.create_own_firm("Harby Logistik").await;
    let token = app.create_admin("disponent", &[firm]).await;

    let response = app
        .post_as(
            &token,
            "/tags",
            json!({ "section": "tour", "name": "Express", "colour": "#ff0000" }),
        )
        .await;
    assert_eq!(response.status(), 403);

    create_tag(&app, "tour", "Express").await;
    create_tag(&app, "offday", "Urlaub").await;
    let response = app
        .post(
            "/tags",
            json!({ "section": "tour", "name": "Express", "colour": "#00ff00" }),
        )
        .await;
    assert_eq!(response.status(), 409);

    let response = app
        .post(
            "/tags",
            json!({ "section": "tour", "name": "Nacht", "colour": "blau" }),
        )
        .await;
    assert_eq!(response.status(), 422);

    let tours = json_of(app.get_as(&token, "/tags?section=tour").await).await;
    assert_eq!(tours.as_array().unwrap().len(), 1);
    assert_eq!(tours[0]["name"], "Express");
}

#[tokio::test]
async fn tag_in_use_cannot_be_deleted() {
    let app = TestApp::spawn().await;
    let firm = app.create_own_firm("Harby Logistik").await;
    let worker = create_worker(&app, firm, "P-1", "Jan Petersen").await;
    let sick = create_tag(&app, "offday", "Krank").await;

    let response = app
        .post(
            &format!("/workers/{}/offdays", worker),
            json!({ "dates": ["2024-07-01"], "tag_id": sick }),
        )
        .await;
    assert_eq!(response.status(), 201);

    let response = app.delete(&format!("/tags/{}", sick)).await;
    assert_eq!(response.status(), 409);
}

#[tokio::test]
async fn worktime_is_replaced_per_day() {
    let app = TestApp::spawn().await;
    let firm = app.create_own_firm("Harby Logistik").await;
    let worker = create_worker(&app, firm, "P-1", "Jan Petersen").await;
    let path = format!("/workers/{}/worktimes", worker);

    let response = app
        .post(
            &path,
            json!({ "date": "2024-06-03", "start": "06:00:00", "end": "14:00:00", "pause_minutes": 30 }),
        )
        .await;
    assert_eq!(response.status(), 201);
    let first = json_of(response).await;
    assert_eq!(first["duration_minutes"], 450);
    assert_eq!(first["cost"], "14.50");

    let response = app
        .post(
            &path,
            json!({ "date": "2024-06-03", "start": "06:00:00", "end": "16:00:00", "pause_minutes": 45 }),
        )
        .await;
    assert_eq!(response.status(), 201);
    let second = json_of(response).await;
    assert_eq!(second["id"], first["id"]);
    assert_eq!(second["duration_minutes"], 555);

    let month = json_of(app.get(&format!("{}?year=2024&month=6", path)).await).await;
    assert_eq!(month.as_array().unwrap().len(), 1);

    let response = app
        .post(
            &path,
            json!({ "date": "2024-06-04", "start": "14:00:00", "end": "06:00:00" }),
        )
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn daily_expense_change_is_listed() {
    let app = TestApp::spawn().await;
    let firm = app.create_own_firm("Harby Logistik").await;
    let worker = create_worker(&app, firm, "P-1", "Jan Petersen").await;

    let response = app
        .client()
        .put(app.url(&format!("/workers/{}/daily-expense", worker)))
        .header("x-admin-token", &app.token)
        .json(&json!({ "amount": "28.00" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 200);

    let expenses = json_of(
        app.get(&format!("/daily-expenses?own_firm_id={}", firm))
            .await,
    )
    .await;
    assert_eq!(expenses[0]["daily_expense"], "28.00");

    let response = app
        .client()
        .put(app.url(&format!("/workers/{}/daily-expense", worker)))
        .header("x-admin-token", &app.token)
        .json(&json!({ "amount": "-1.00" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn remaining_holidays_are_kept_on_this_years_account() {
    let app = TestApp::spawn().await;
    let firm = app.create_own_firm("Harby Logistik").await;
    let response = app
        .post(
            "/workers",
            json!({
                "own_firm_id": firm,
                "worker_nr": "P-1",
                "name": "Jan Petersen",
                "holidays": 28,
                "remaining_holidays": 17
            }),
        )
        .await;
    assert_eq!(response.status(), 201);
    let created = json_of(response).await;
    assert_eq!(created["remaining_holidays"], 17);
    let id = created["id"].as_i64().unwrap();

    let fetched = json_of(app.get(&format!("/workers/{}", id)).await).await;
    assert_eq!(fetched["remaining_holidays"], 17);

    let response = app
        .patch(&format!("/workers/{}", id), json!({ "remaining_holidays": 9 }))
        .await;
    assert_eq!(response.status(), 200);
    let fetched = json_of(app.get(&format!("/workers/{}", id)).await).await;
    assert_eq!(fetched["remaining_holidays"], 9);
}

#[tokio::test]
async fn meetings_follow_their_contact() {
    let app = TestApp::spawn().await;
    let firm = app.create_own_firm("Harby Logistik").await;
    let response = app
        .post(
            "/contacts",
            json!({ "own_firm_id": firm, "name": "Birte Jensen", "company": "Nordfracht" }),
        )
        .await;
    assert_eq!(response.status(), 201);
    let contact = common::id_of(response).await;

    let response = app
        .post(
            &format!("/contacts/{}/meetings", contact),
            json!({ "date": "2024-05-14", "notes": "Rahmenvertrag besprochen" }),
        )
        .await;
    assert_eq!(response.status(), 201);
    let meeting = common::id_of(response).await;

    let response = app
        .patch(
            &format!("/meetings/{}", meeting),
            json!({ "notes": "Rahmenvertrag unterschrieben" }),
        )
        .await;
    assert_eq!(response.status(), 200);

    let meetings = json_of(app.get(&format!("/contacts/{}/meetings", contact)).await).await;
    assert_eq!(meetings[0]["notes"], "Rahmenvertrag unterschrieben");

    let response = app.delete(&format!("/contacts/{}", contact)).await;
    assert!(response.status().is_success());
    let response = app.patch(&format!("/meetings/{}", meeting), json!({ "notes": "x" })).await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn firm_logo_is_uploaded_and_served() {
    let app = TestApp::spawn().await;
    let firm = app.create_own_firm("Harby Logistik").await;

    let response = app.get(&format!("/own-firms/{}/logo", firm)).await;
    assert_eq!(response.status(), 404);

    let response = app
        .upload(&format!("/own-firms/{}/logo", firm), "logo.exe", b"MZ".to_vec())
        .await;
    assert_eq!(response.status(), 400);

    let png = b"\x89PNG\r\n\x1a\nlogo".to_vec();
    let response = app
        .upload(&format!("/own-firms/{}/logo", firm), "logo.png", png.clone())
        .await;
    assert_eq!(response.status(), 200);
    let updated = json_of(response).await;
    assert!(updated["logo_path"].is_string());

    let stored = json_of(app.get(&format!("/own-firms/{}/logo", firm)).await).await;
    assert_eq!(stored["name"], "Logo -- Harby Logistik.png");
    let bytes = STANDARD.decode(stored["file"].as_str().unwrap()).unwrap();
    assert_eq!(bytes, png);

    let messages = app.audit_messages(firm).await;
    assert_eq!(messages[0], "Logo der Firma Harby Logistik wurde aktualisiert.");
}

#[tokio::test]
async fn dashboard_shows_todays_tours_and_appointments() {
    let app = TestApp::spawn().await;
    let firm = app.create_own_firm("Harby Logistik").await;
    let driver = create_worker(&app, firm, "P-1", "Jan Petersen").await;

    let response = app
        .post(
            "/tours",
            json!({ "own_firm_id": firm, "roller_nr": "R-17", "driver_id": driver }),
        )
        .await;
    let tour = common::id_of(response).await;
    let response = app
        .post(
            &format!("/tours/{}/days", tour),
            json!({ "dates": ["2024-03-04"], "driver_ids": [driver] }),
        )
        .await;
    assert_eq!(response.status(), 201);

    let response = app
        .post(
            &format!("/workers/{}/documents", driver),
            json!({ "name": "Fahrerkarte", "expiry_date": "2024-04-30" }),
        )
        .await;
    assert_eq!(response.status(), 201);

    let dashboard = json_of(
        app.get(&format!("/dashboard?own_firm_id={}&as_of=2024-03-04", firm))
            .await,
    )
    .await;
    assert_eq!(dashboard["sales"]["months"].as_array().unwrap().len(), 12);
    assert_eq!(dashboard["current_month"]["month"], 3);
    assert_eq!(dashboard["tours"][0]["roller_nr"], "R-17");
    assert_eq!(dashboard["tours"][0]["drivers"], json!(["Jan Petersen"]));
    assert_eq!(dashboard["appointments"]["workers"][0]["owner"], "Jan Petersen");
    assert_eq!(dashboard["appointments"]["trucks"], json!([]));

    let response = app
        .get(&format!("/dashboard?own_firm_id={}&as_of=2024-03-05", firm))
        .await;
    let next_day = json_of(response).await;
    assert_eq!(next_day["tours"], json!([]));
}
