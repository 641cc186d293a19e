//! E2E tests for unguarded operational endpoints

mod common;

use common::TestServer;

#[tokio::test]
async fn test_health_check_requires_no_session() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/health"))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.expect("response body"), "OK");
}

#[tokio::test]
async fn test_metrics_endpoint_requires_no_session() {
    let server = TestServer::new().await;

    // Generate at least one guard decision first
    let _ = server.client.get(server.url("/login")).send().await;

    let response = server
        .client
        .get(server.url("/metrics"))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 200);
    let body = response.text().await.expect("response body");
    assert!(body.contains("pocketledger_"));
}
