//! Router-level tests.
//!
//! The offline app's pool points at a closed port, so every test here only
//! exercises paths that answer before or without the database.

mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use common::{get, json_request, parse_body, TestApp};
use gatepass_server::models::Role;
use serde_json::json;

#[tokio::test]
async fn health_reports_version() {
    let app = TestApp::offline();

    let response = app.send(get("/api/v1/health", None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = parse_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn readiness_fails_without_database() {
    let app = TestApp::offline();

    let response = app.send(get("/api/v1/ready", None)).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(parse_body(response).await["status"], "unavailable");
}

#[tokio::test]
async fn staff_endpoints_require_a_token() {
    let app = TestApp::offline();

    let response = app.send(get("/api/v1/visitors", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = parse_body(response).await;
    assert_eq!(body["error"], "NotAuthorized");

    let basic = Request::builder()
        .uri("/api/v1/invites")
        .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.send(basic).await.status(), StatusCode::UNAUTHORIZED);

    let forged = app.send(get("/api/v1/reports", Some("not.a.jwt"))).await;
    assert_eq!(forged.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_status_is_rejected_before_any_write() {
    let app = TestApp::offline();
    let token = app.token(Role::Employee);

    for uri in ["/api/v1/visitors/1/status", "/api/v1/invites/1/status"] {
        let response = app
            .send(json_request("PATCH", uri, Some(&token), &json!({"status": "teleported"})))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);

        let body = parse_body(response).await;
        assert_eq!(body["error"], "InvalidStatus");
        assert!(body["message"].as_str().unwrap().contains("teleported"));
    }
}

#[tokio::test]
async fn deletions_require_admin() {
    let app = TestApp::offline();
    let token = app.token(Role::Employee);

    for uri in ["/api/v1/visitors/1", "/api/v1/invites/1", "/api/v1/reports/1"] {
        let request = Request::builder()
            .method("DELETE")
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        assert_eq!(app.send(request).await.status(), StatusCode::FORBIDDEN, "{}", uri);
    }
}

#[tokio::test]
async fn registration_input_is_validated() {
    let app = TestApp::offline();

    let response = app
        .send(json_request(
            "POST",
            "/api/v1/visitors",
            None,
            &json!({"name": "Jane", "email": "not-an-email", "phone": "+1 555 0100"}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = parse_body(response).await;
    assert!(body["message"].as_str().unwrap().contains("email"));
}

#[tokio::test]
async fn invite_capture_requires_an_image() {
    let app = TestApp::offline();
    let boundary = "gatepass-boundary";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"invite_code\"\r\n\r\nABCD1234\r\n--{b}--\r\n",
        b = boundary
    );
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/invites/capture")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap();

    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = parse_body(response).await;
    assert!(body["message"].as_str().unwrap().contains("image"));
}

#[tokio::test]
async fn statistics_degrade_instead_of_failing() {
    let app = TestApp::offline();
    let token = app.token(Role::Employee);

    let response = app
        .send(get("/api/v1/reports/stats/total-visitors", Some(&token)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = parse_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["data"]["total"], 0);
    assert!(body["error"].is_string());

    let response = app
        .send(get("/api/v1/reports/stats/average-duration", Some(&token)))
        .await;
    let body = parse_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["data"]["formatted"], "0m");
}

#[tokio::test]
async fn inverted_trend_range_degrades() {
    let app = TestApp::offline();
    let token = app.token(Role::Admin);

    let response = app
        .send(get(
            "/api/v1/reports/charts/visitor-trends?start_date=2025-06-05&end_date=2025-06-01",
            Some(&token),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = parse_body(response).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("start_date"));
    assert_eq!(body["data"]["points"], json!([]));
}

#[tokio::test]
async fn non_numeric_limit_degrades_through_the_envelope() {
    let app = TestApp::offline();
    let token = app.token(Role::Employee);

    for uri in [
        "/api/v1/reports/stats/active-visits?limit=abc",
        "/api/v1/reports/activity/recent?limit=ten",
    ] {
        let response = app.send(get(uri, Some(&token))).await;
        assert_eq!(response.status(), StatusCode::OK, "{}", uri);

        let body = parse_body(response).await;
        assert_eq!(body["success"], false, "{}", uri);
        assert!(body["error"].as_str().unwrap().contains("limit"), "{}", uri);
    }
}

#[tokio::test]
async fn degraded_hourly_activity_still_lists_every_hour() {
    let app = TestApp::offline();
    let token = app.token(Role::Employee);

    let response = app
        .send(get("/api/v1/reports/charts/todays-activity", Some(&token)))
        .await;
    let body = parse_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["data"]["hours"].as_array().unwrap().len(), 24);

    let response = app
        .send(get("/api/v1/reports/stats/total-visitors", Some(&token)))
        .await;
    assert_eq!(parse_body(response).await["data"]["growth"], "0%");
}

#[tokio::test]
async fn employee_profiles_are_role_gated() {
    let app = TestApp::offline();
    let profile = json!({
        "user_id": 42,
        "email": "dana@example.com",
        "name": "Dana",
        "designation": "Receptionist"
    });

    let employee = app.token(Role::Employee);
    let response = app
        .send(json_request("POST", "/api/v1/employees", Some(&employee), &profile))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let admin = app.token(Role::Admin);
    let request = Request::builder()
        .method("DELETE")
        .uri("/api/v1/employees/1")
        .header(header::AUTHORIZATION, format!("Bearer {}", admin))
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.send(request).await.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn code_image_options_are_validated() {
    let app = TestApp::offline();
    let token = app.token(Role::Employee);

    let response = app
        .send(json_request(
            "POST",
            "/api/v1/qr/codes",
            Some(&token),
            &json!({"size": 5000, "foreground": "black"}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let message = parse_body(response).await["message"].as_str().unwrap().to_string();
    assert!(message.contains("size"));
    assert!(message.contains("foreground"));
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = TestApp::offline();

    let response = app.send(get("/api-docs/openapi.json", None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = parse_body(response).await;
    assert_eq!(body["info"]["title"], "Gatepass API");
    assert!(body["paths"]["/invites/capture"].is_object());
    assert!(body["paths"]["/employees/{id}"].is_object());
    assert!(body["paths"]["/qr/codes"].is_object());
}
