//! Back-office writes through the real forms.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde_json::{Value, json};
use siddha_clinic_integration_tests::{TestApp, location};
use siddha_clinic_web::config::DEFAULT_UPLOAD_BUCKET;
use siddha_clinic_web::services::upload::MAX_BATCH_FILES;

const NEW_BADGE: &str = r#"<span class="badge badge-default">New</span>"#;
const CONTACTED_BADGE: &str = r#"<span class="badge badge-secondary">Contacted</span>"#;

fn medicine_form(name: &str, price: &str) -> Vec<(&'static str, String)> {
    vec![
        ("name", name.to_string()),
        ("category", "Churnam".to_string()),
        ("price", price.to_string()),
        ("stock_status", "Available".to_string()),
        ("images", String::new()),
        ("description", "Traditional polyherbal decoction".to_string()),
        ("used_for", "Fever, Body pain".to_string()),
        ("is_active", "on".to_string()),
    ]
}

async fn post_owned(app: &TestApp, path: &str, form: &[(&'static str, String)]) -> reqwest::Response {
    let borrowed: Vec<(&str, &str)> = form.iter().map(|(k, v)| (*k, v.as_str())).collect();
    app.post_form(path, &borrowed).await
}

fn png(name: &str) -> Part {
    Part::bytes(vec![0x89, b'P', b'N', b'G'])
        .file_name(name.to_string())
        .mime_str("image/png")
        .unwrap()
}

#[tokio::test]
async fn test_admin_adds_and_deletes_medicine() {
    let app = TestApp::spawn().await;
    app.sign_in_admin().await;

    let response = post_owned(&app, "/admin/medicines", &medicine_form("Amukkara Churnam", "180")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/medicines");

    let rows = app.backend.rows("medicines");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], "Amukkara Churnam");
    assert_eq!(rows[0]["is_active"], true);
    let id = TestApp::id_of(&rows[0]);

    // Listed publicly straight away.
    let body = app.get("/medicines").await.text().await.unwrap();
    assert!(body.contains("Amukkara Churnam"));

    // Deleting without the confirmation leaves the row alone.
    let response = app.post_form(&format!("/admin/medicines/{id}/delete"), &[]).await;
    assert!(response.status().is_redirection());
    assert_eq!(app.backend.rows("medicines").len(), 1);

    let response = app
        .post_form(&format!("/admin/medicines/{id}/delete"), &[("confirm", "yes")])
        .await;
    assert!(response.status().is_redirection());
    assert!(app.backend.rows("medicines").is_empty());
}

#[tokio::test]
async fn test_medicine_with_zero_price_is_not_saved() {
    let app = TestApp::spawn().await;
    app.sign_in_admin().await;

    let response = post_owned(&app, "/admin/medicines", &medicine_form("Free Sample", "0")).await;
    assert!(response.status().is_client_error());
    let body = response.text().await.unwrap();
    assert!(body.contains("Free Sample"), "form keeps the draft");
    assert!(app.backend.rows("medicines").is_empty());
}

#[tokio::test]
async fn test_consultation_status_update() {
    let app = TestApp::spawn().await;
    let row = app.seed(
        "consultation_requests",
        json!({
            "patient_name": "Meena",
            "patient_phone": "9876543210",
            "health_issue": "Joint pain",
            "status": "New",
        }),
    );
    let id = TestApp::id_of(&row);
    app.sign_in_admin().await;

    let response = app.get("/admin/consultations").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("Meena"));
    assert!(body.contains(NEW_BADGE));

    let response = app
        .post_form(&format!("/admin/consultations/{id}/status"), &[("status", "Contacted")])
        .await;
    assert!(response.status().is_redirection());
    assert_eq!(app.backend.rows("consultation_requests")[0]["status"], "Contacted");

    // First reload renders the patched local copy, the second refetches.
    for _ in 0..2 {
        let body = app.get("/admin/consultations").await.text().await.unwrap();
        assert!(body.contains(CONTACTED_BADGE), "{body}");
        assert!(!body.contains(NEW_BADGE));
    }

    // Unknown statuses never reach the backend.
    let response = app
        .post_form(&format!("/admin/consultations/{id}/status"), &[("status", "Archived")])
        .await;
    assert!(response.status().is_redirection());
    assert_eq!(app.backend.rows("consultation_requests")[0]["status"], "Contacted");
    let body = app.get("/admin/consultations").await.text().await.unwrap();
    assert!(body.contains(CONTACTED_BADGE));
}

#[tokio::test]
async fn test_enabling_maintenance_closes_the_public_site() {
    let app = TestApp::spawn().await;
    app.sign_in_admin().await;

    let response = app.get("/admin/settings").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.backend.rows("admin_settings").len(), 1);

    let response = app
        .post_form(
            "/admin/settings",
            &[("maintenance_mode", "on"), ("medicine_selling_enabled", "on")],
        )
        .await;
    assert!(response.status().is_redirection());
    assert_eq!(app.backend.rows("admin_settings")[0]["maintenance_mode"], true);

    assert_eq!(app.get("/").await.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(app.get("/admin").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_upload_requires_admin() {
    let app = TestApp::spawn().await;

    let form = Form::new()
        .text("folder", "medicines")
        .text("mode", "multiple")
        .part("files", png("a.png"));
    let response = app
        .client
        .post(app.url("/admin/uploads"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(app.backend.object_count(DEFAULT_UPLOAD_BUCKET), 0);
}

#[tokio::test]
async fn test_upload_appends_to_current_images() {
    let app = TestApp::spawn().await;
    app.sign_in_admin().await;

    let form = Form::new()
        .text("folder", "medicines")
        .text("mode", "multiple")
        .text("current", "https://cdn.test/existing.png")
        .part("files", png("a.png"))
        .part("files", png("b.png"));
    let response = app
        .client
        .post(app.url("/admin/uploads"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["urls"].as_array().unwrap().len(), 2);
    let value = body["value"].as_array().unwrap();
    assert_eq!(value.len(), 3);
    assert_eq!(value[0], "https://cdn.test/existing.png");
    assert!(
        value[1]
            .as_str()
            .unwrap()
            .starts_with("http://memory.local/storage/v1/object/public/admin-uploads/medicines/")
    );
    assert_eq!(app.backend.object_count(DEFAULT_UPLOAD_BUCKET), 2);
}

#[tokio::test]
async fn test_upload_batch_over_the_file_cap_is_rejected_whole() {
    let app = TestApp::spawn().await;
    app.sign_in_admin().await;

    let form = (0..=MAX_BATCH_FILES).fold(
        Form::new().text("folder", "medicines").text("mode", "multiple"),
        |form, i| form.part("files", png(&format!("{i}.png"))),
    );
    let response = app
        .client
        .post(app.url("/admin/uploads"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("at most 10"));
    assert_eq!(app.backend.object_count(DEFAULT_UPLOAD_BUCKET), 0);
}
