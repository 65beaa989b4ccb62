mod common;

use http::StatusCode;

use crate::common::{body_string, TestServer};

#[tokio::test]
async fn readyz_waits_for_first_scan() {
    let server = TestServer::unscanned();

    assert_eq!(server.get("/_status/livez").await.status(), StatusCode::OK);
    assert_eq!(
        server.get("/_status/readyz").await.status(),
        StatusCode::SERVICE_UNAVAILABLE
    );

    server.scan();
    assert_eq!(server.get("/_status/readyz").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn version_reports_build_info() {
    let server = TestServer::unscanned();

    let response = server.get("/_status/version").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["name"], "vedrod");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn health_alias_answers_liveness() {
    let server = TestServer::unscanned();

    let response = server.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["status"], "ok");
}
