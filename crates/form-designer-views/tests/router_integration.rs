//! Integration tests for the form pages and the admin API, driven through
//! the axum router with `tower::ServiceExt::oneshot`.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use form_designer_core::FormDesignerSettings;
use form_designer_mail::InMemoryBackend;
use form_designer_views::{FormApp, FormServices};

// ============================================================================
// Shared helpers
// ============================================================================

fn contact_json() -> serde_json::Value {
    serde_json::json!({
        "name": "contact",
        "title": "Contact us",
        "mail_to": "office@example.com; {{ email }}",
        "mail_subject": "Message from {{ name }}",
        "fields": [
            {"name": "name", "label": "Name", "field_class": "forms.CharField", "position": 1},
            {"name": "email", "label": "E-Mail", "field_class": "forms.EmailField", "position": 2},
            {"name": "topic", "label": "Topic", "field_class": "forms.ChoiceField",
             "choice_values": "sales\nsupport", "choice_labels": "Sales\nSupport", "position": 3}
        ]
    })
}

fn app() -> (FormServices, InMemoryBackend, Router) {
    let (services, outbox) = FormServices::in_memory(FormDesignerSettings::default());
    let router = FormApp::new(services.clone()).into_axum_router();
    (services, outbox, router)
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

fn json_request(method: &str, uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn form_post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn create_contact(router: &Router) -> i64 {
    let (status, body) = send(router, json_request("POST", "/admin/api/forms/", &contact_json())).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let created: serde_json::Value = serde_json::from_str(&body).unwrap();
    created["id"].as_i64().unwrap()
}

// ============================================================================
// Form pages
// ============================================================================

#[tokio::test]
async fn test_detail_page_renders_form() {
    let (_, _, router) = app();
    create_contact(&router).await;

    let (status, html) = send(&router, get("/contact/?name=Ann")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("<title>Contact us</title>"));
    assert!(html.contains(r#"<form method="post" action="">"#));
    assert!(html.contains(r#"name="submit__contact""#));
    assert!(html.contains(r#"value="Ann""#));
    assert!(html.contains(r#"<option value="support">Support</option>"#));
}

#[tokio::test]
async fn test_unknown_form_is_404() {
    let (_, _, router) = app();
    let (status, _) = send(&router, get("/missing/")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_other_methods_are_rejected() {
    let (_, _, router) = app();
    create_contact(&router).await;
    let request = Request::builder()
        .method("DELETE")
        .uri("/contact/")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&router, request).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_invalid_post_shows_errors() {
    let (_, outbox, router) = app();
    create_contact(&router).await;

    let (status, html) = send(&router, form_post("/contact/", "name=Ann&email=nope&submit__contact=1")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("The data could not be submitted, please try again."));
    assert!(html.contains("Enter a valid email address."));
    assert_eq!(outbox.message_count().await, 0);
}

#[tokio::test]
async fn test_valid_post_logs_mails_and_thanks() {
    let (services, outbox, router) = app();
    let id = create_contact(&router).await;

    let body = "name=Ann&email=ann%40example.com&topic=sales&submit__contact=1";
    let (status, html) = send(&router, form_post("/contact/", body)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Thank you, the data was submitted successfully."));
    assert!(!html.contains(r#"value="Ann""#));

    let logs = services.store.list_logs(id).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].data[2].value, serde_json::json!("sales"));

    let sent = outbox.messages().await;
    assert_eq!(sent[0].to, ["office@example.com", "ann@example.com"]);
    assert_eq!(sent[0].subject, "Message from Ann");
    assert_eq!(
        sent[0].body,
        "Name: Ann\nE-Mail: ann@example.com\nTopic: sales\n"
    );
}

#[tokio::test]
async fn test_success_redirect_and_embedded() {
    let (_, _, router) = app();
    let id = create_contact(&router).await;
    let mut def = contact_json();
    def["success_redirect"] = serde_json::json!(true);
    let uri = format!("/admin/api/forms/{id}/");
    let (status, _) = send(&router, json_request("PUT", &uri, &def)).await;
    assert_eq!(status, StatusCode::OK);

    let body = "name=Ann&email=ann%40example.com&topic=sales&submit__contact=1";
    let mut request = form_post("/contact/", body);
    request
        .headers_mut()
        .insert(header::REFERER, "/landing/".parse().unwrap());
    let response = router.clone().oneshot(request).await.unwrap();
    assert!(response.status().is_redirection());
    assert_eq!(response.headers()[header::LOCATION], "/landing/");

    let (status, html) = send(&router, form_post("/contact/embedded/", body)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!html.contains("<html>"));
    assert!(html.contains("Thank you"));
}

#[tokio::test]
async fn test_multipart_upload_is_submitted() {
    let (services, _, router) = app();
    let def = serde_json::json!({
        "name": "upload",
        "fields": [
            {"name": "doc", "label": "Document", "field_class": "forms.FileField"}
        ]
    });
    let (status, body) = send(&router, json_request("POST", "/admin/api/forms/", &def)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let id = serde_json::from_str::<serde_json::Value>(&body).unwrap()["id"]
        .as_i64()
        .unwrap();

    let (_, html) = send(&router, get("/upload/")).await;
    assert!(html.contains(r#"enctype="multipart/form-data""#));

    let body = "--XX\r\n\
                Content-Disposition: form-data; name=\"doc\"; filename=\"report.pdf\"\r\n\
                Content-Type: application/pdf\r\n\r\n\
                %PDF-1.4\r\n\
                --XX\r\n\
                Content-Disposition: form-data; name=\"submit__upload\"\r\n\r\n\
                1\r\n\
                --XX--\r\n";
    let request = Request::builder()
        .method("POST")
        .uri("/upload/")
        .header(header::CONTENT_TYPE, "multipart/form-data; boundary=XX")
        .body(Body::from(body))
        .unwrap();
    let (status, html) = send(&router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Thank you, the data was submitted successfully."));

    let logs = services.store.list_logs(id).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].data[0].value, serde_json::json!("report.pdf"));
}

// ============================================================================
// Admin API
// ============================================================================

#[tokio::test]
async fn test_admin_crud() {
    let (_, _, router) = app();
    let id = create_contact(&router).await;

    let (status, body) = send(&router, get("/admin/api/forms/")).await;
    assert_eq!(status, StatusCode::OK);
    let list: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(list[0]["name"], "contact");
    assert_eq!(list[0]["field_count"], 3);

    let (status, body) = send(&router, get(&format!("/admin/api/forms/{id}/"))).await;
    assert_eq!(status, StatusCode::OK);
    let def: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(def["fields"][1]["name"], "email");

    let (status, _) = send(&router, json_request("POST", "/admin/api/forms/", &contact_json())).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/admin/api/forms/{id}/"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&router, request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&router, get(&format!("/admin/api/forms/{id}/"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_rejects_inconsistent_fields() {
    let (_, _, router) = app();
    let mut def = contact_json();
    def["fields"][0]["field_class"] = serde_json::json!("forms.RegexField");

    let (status, body) = send(&router, json_request("POST", "/admin/api/forms/", &def)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(
        error["field_errors"]["fields[0].regex"][0],
        "This field class requires a regular expression."
    );
}

#[tokio::test]
async fn test_admin_rejects_names_that_are_not_slugs() {
    let (services, _, router) = app();
    let mut def = contact_json();
    def["name"] = serde_json::json!("my form/x");
    def["fields"][1]["name"] = serde_json::json!("e mail");

    let (status, body) = send(&router, json_request("POST", "/admin/api/forms/", &def)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert!(error["field_errors"]["name"][0]
        .as_str()
        .unwrap()
        .starts_with("Enter a valid \"slug\""));
    assert!(error["field_errors"]["fields[1].name"].is_array());
    assert!(services.store.list_definitions().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_admin_logs_and_csv_export() {
    let (_, _, router) = app();
    let id = create_contact(&router).await;

    for name in ["Ann", "Bob"] {
        let body = format!("name={name}&email=x%40example.com&topic=support&submit__contact=1");
        send(&router, form_post("/contact/", &body)).await;
    }

    let (status, body) = send(&router, get(&format!("/admin/api/forms/{id}/logs/"))).await;
    assert_eq!(status, StatusCode::OK);
    let logs: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(logs[0]["data"][0]["value"], "Bob");
    assert_eq!(logs[1]["data"][0]["value"], "Ann");

    let response = router
        .clone()
        .oneshot(get(&format!("/admin/api/forms/{id}/logs.csv")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/csv"));
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let csv = String::from_utf8(bytes.to_vec()).unwrap();
    let lines: Vec<_> = csv.lines().collect();
    assert_eq!(lines[0], "created,Name,E-Mail,Topic");
    assert!(lines[1].ends_with(",Bob,x@example.com,support"));
    assert_eq!(lines.len(), 3);
}
