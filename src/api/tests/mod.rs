use super::*;
use crate::source::LogSource;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::time::Duration;
use tower::ServiceExt;


/// Helper to create a test LogImporter instance wrapped in Arc
async fn create_test_importer() -> (Arc<LogImporter>, tempfile::TempDir) {
    let (importer, temp_dir) = crate::importer::test_helpers::create_test_importer().await;
    (Arc::new(importer), temp_dir)
}

/// Same as [`create_test_importer`] serving logs from `source`
async fn create_test_importer_with(
    source: Arc<dyn LogSource>,
) -> (Arc<LogImporter>, tempfile::TempDir) {
    let (importer, temp_dir) =
        crate::importer::test_helpers::create_test_importer_with(source).await;
    (Arc::new(importer), temp_dir)
}

/// Router built from the importer's own configuration
fn test_router(importer: &Arc<LogImporter>) -> Router {
    create_router(importer.clone(), importer.get_config())
}

/// Send one request and decode the JSON body (Null when empty or not JSON)
async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_api_server_spawns() {
    let (importer, _temp_dir) = create_test_importer().await;

    // Port 0 = OS assigns a free port
    let mut config = (*importer.get_config()).clone();
    config.server.api.bind_address = "127.0.0.1:0".parse().unwrap();
    let config = Arc::new(config);

    let api_handle = tokio::spawn({
        let importer = importer.clone();
        let config = config.clone();
        async move { start_api_server(importer, config).await }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!api_handle.is_finished(), "server should still be serving");

    api_handle.abort();
}

#[tokio::test]
async fn test_api_server_reports_bind_failure() {
    let (importer, _temp_dir) = create_test_importer().await;

    let occupied = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let mut config = (*importer.get_config()).clone();
    config.server.api.bind_address = occupied.local_addr().unwrap();

    let result = start_api_server(importer, Arc::new(config)).await;
    assert!(matches!(result, Err(crate::Error::Io(_))));
}

#[tokio::test]
async fn test_cors_enabled() {
    let (importer, _temp_dir) = create_test_importer().await;

    let mut config = (*importer.get_config()).clone();
    config.server.api.cors_enabled = true;
    config.server.api.cors_origins = vec!["*".to_string()];
    let app = create_router(importer, Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn test_cors_specific_origin() {
    let (importer, _temp_dir) = create_test_importer().await;

    let mut config = (*importer.get_config()).clone();
    config.server.api.cors_origins = vec!["http://dashboard.test".to_string()];
    let app = create_router(importer, Arc::new(config));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("Origin", "http://dashboard.test")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "http://dashboard.test"
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let (importer, _temp_dir) = create_test_importer().await;

    let mut config = (*importer.get_config()).clone();
    config.server.api.cors_enabled = false;
    let app = create_router(importer, Arc::new(config));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("Origin", "http://localhost:3000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_spawn_api_server_method() {
    let (importer, _temp_dir) = create_test_importer().await;

    let api_handle = importer.spawn_api_server();
    tokio::time::sleep(Duration::from_millis(100)).await;
    api_handle.abort();
}

#[tokio::test]
async fn test_authentication_with_api_key() {
    let (importer, _temp_dir) = create_test_importer().await;

    let mut config = (*importer.get_config()).clone();
    config.server.api.api_key = Some("test-secret-key".to_string());
    let app = create_router(importer, Arc::new(config));

    let (status, _) = send(app.clone(), get("/imports")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/imports")
        .header("X-Api-Key", "test-secret-key")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(app.clone(), request).await;
    assert_eq!(status, StatusCode::OK);

    let request = Request::builder()
        .uri("/imports")
        .header("X-Api-Key", "wrong-key")
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"]["code"], "unauthorized");
}

#[tokio::test]
async fn test_authentication_disabled_by_default() {
    let (importer, _temp_dir) = create_test_importer().await;
    assert!(importer.get_config().server.api.api_key.is_none());

    let (status, _) = send(test_router(&importer), get("/imports")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_swagger_ui_toggle() {
    let (importer, _temp_dir) = create_test_importer().await;

    let response = test_router(&importer)
        .oneshot(get("/swagger-ui/"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let mut config = (*importer.get_config()).clone();
    config.server.api.swagger_ui = false;
    let app = create_router(importer, Arc::new(config));
    let response = app.oneshot(get("/swagger-ui/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let (importer, _temp_dir) = create_test_importer().await;
    let (status, _) = send(test_router(&importer), get("/downloads")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
