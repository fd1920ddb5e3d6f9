use arcadia_backend::config::Config;
use arcadia_backend::media::MediaStore;
use arcadia_backend::{AppState, create_app};
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// Helper to create the application over an in-memory database
async fn setup_app() -> (TempDir, axum::Router) {
    let db = arcadia_db::Database::open_in_memory()
        .await
        .expect("Failed to create in-memory database");
    let static_dir = tempfile::tempdir().expect("Failed to create static dir");
    let config = Config::default();
    let state = AppState::new(db, MediaStore::new(static_dir.path()), config.session_ttl);
    let app = create_app(
        Arc::new(state),
        config.request_body_limit,
        config.request_timeout,
        None,
    );
    (static_dir, app)
}

/// Helper to send a request and get response
async fn send_request(
    app: axum::Router,
    method: &str,
    uri: &str,
    form: Option<&str>,
    auth_token: Option<&str>,
) -> (StatusCode, Value) {
    let mut request_builder = Request::builder().uri(uri).method(method);

    if let Some(token) = auth_token {
        request_builder = request_builder.header("Authorization", format!("Bearer {}", token));
    }

    let request = if let Some(form) = form {
        request_builder
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(Body::from(form.to_string()))
            .unwrap()
    } else {
        request_builder.body(Body::empty()).unwrap()
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();

    let body_bytes = response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes();

    let json = if body_bytes.is_empty() {
        json!({})
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or(json!({}))
    };

    (status, json)
}

fn assert_error_shape(body: &Value) {
    assert_eq!(body["success"], false, "error responses carry success=false");
    assert!(
        body["error"].as_str().is_some_and(|e| !e.is_empty()),
        "Response should have a non-empty 'error' field"
    );
}

#[tokio::test]
async fn test_error_response_format_for_unknown_game() {
    // GIVEN: An empty catalog
    let (_dir, app) = setup_app().await;

    // WHEN: Playing a game that does not exist
    let (status, body) = send_request(app, "GET", "/play/7", None, None).await;

    // THEN: Should return 404 with JSON error
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_error_shape(&body);
    assert_eq!(body["error"], "Game not found");
}

#[tokio::test]
async fn test_error_response_format_for_missing_session() {
    // GIVEN: No session token
    let (_dir, app) = setup_app().await;

    // WHEN: Requesting a page that needs login
    let (status, body) = send_request(app, "GET", "/upload", None, None).await;

    // THEN: Should return 401 with JSON error
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_error_shape(&body);
}

#[tokio::test]
async fn test_error_response_format_for_bogus_token() {
    // GIVEN: A token that was never issued
    let (_dir, app) = setup_app().await;

    // WHEN: Using it to like a game
    let (status, body) = send_request(app, "GET", "/like/1", None, Some("not-a-real-token")).await;

    // THEN: Should return 401, not 404, since auth is checked first
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_error_shape(&body);
}

#[tokio::test]
async fn test_error_response_format_for_validation() {
    // GIVEN: An empty application
    let (_dir, app) = setup_app().await;

    // WHEN: Registering with an invalid username
    let (status, body) = send_request(
        app,
        "POST",
        "/register",
        Some("username=bad%2Fname&password=secret"),
        None,
    )
    .await;

    // THEN: Should return 400 with the validation message
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error_shape(&body);
    assert_eq!(body["error"], "Username contains invalid characters");
}

#[tokio::test]
async fn test_error_response_format_for_conflict() {
    // GIVEN: A registered user
    let (_dir, app) = setup_app().await;
    let (status, _) = send_request(
        app.clone(),
        "POST",
        "/register",
        Some("username=alice&password=secret"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // WHEN: Registering the same name again
    let (status, body) = send_request(
        app,
        "POST",
        "/register",
        Some("username=alice&password=secret"),
        None,
    )
    .await;

    // THEN: Should return 409 with JSON error
    assert_eq!(status, StatusCode::CONFLICT);
    assert_error_shape(&body);
}

#[tokio::test]
async fn test_error_response_format_for_missing_comment_target() {
    // GIVEN: A logged-in user and an empty catalog
    let (_dir, app) = setup_app().await;
    let (_, alice) = send_request(
        app.clone(),
        "POST",
        "/register",
        Some("username=alice&password=secret"),
        None,
    )
    .await;
    let token = alice["token"].as_str().unwrap();

    // WHEN: Deleting a comment on a game that does not exist
    let (status, body) = send_request(app, "GET", "/delete_comment/1/1", None, Some(token)).await;

    // THEN: Should return 404 with JSON error
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_error_shape(&body);
}

#[tokio::test]
async fn test_error_response_for_malformed_upload() {
    // GIVEN: A logged-in user
    let (_dir, app) = setup_app().await;
    let (_, alice) = send_request(
        app.clone(),
        "POST",
        "/register",
        Some("username=alice&password=secret"),
        None,
    )
    .await;
    let token = alice["token"].as_str().unwrap();

    // WHEN: Posting a multipart body that is cut off mid-part
    let request = Request::post("/upload")
        .header("Authorization", format!("Bearer {token}"))
        .header("Content-Type", "multipart/form-data; boundary=cut")
        .body(Body::from("--cut\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\nSnake"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    // THEN: Should be a client error, not a server error
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_error_response_does_not_leak_internal_details() {
    // GIVEN: A login attempt for an unknown user
    let (_dir, app) = setup_app().await;

    // WHEN: Logging in
    let (status, body) = send_request(
        app,
        "POST",
        "/login",
        Some("username=nobody&password=secret"),
        None,
    )
    .await;

    // THEN: Should not reveal whether the user exists or any storage detail
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_error_shape(&body);
    let error_msg = body["error"].as_str().unwrap().to_lowercase();
    assert!(!error_msg.contains("not found"));
    assert!(!error_msg.contains("json"));
    assert!(!error_msg.contains("users"));
    assert!(body.get("details").is_none());
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    // GIVEN: A running application
    let (_dir, app) = setup_app().await;

    // WHEN: Requesting a path with no route
    let (status, _) = send_request(app, "GET", "/nope", None, None).await;

    // THEN: Should return 404
    assert_eq!(status, StatusCode::NOT_FOUND);
}
