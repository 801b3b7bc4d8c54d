//! Integration tests for the HTTP client against a stub server.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use reel_client::{
    with_retry, BackoffConfig, ClientError, FileState, GenerateOptions, MediaApiClient,
    MediaApiConfig, RemoteMedia, SystemJitter,
};

fn client_for(server: &MockServer) -> MediaApiClient {
    let config = MediaApiConfig {
        api_key: "test-key".to_string(),
        base_url: server.uri(),
        timeout: Duration::from_secs(5),
    };
    MediaApiClient::new(config).unwrap()
}

fn fast_backoff() -> BackoffConfig {
    BackoffConfig {
        max_retries: 3,
        base_delay: Duration::from_millis(1),
        multiplier: 1.1,
        max_delay: Duration::from_millis(5),
    }
}

#[tokio::test]
async fn test_upload_returns_tracked_file() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/upload/v1beta/files"))
        .and(header("X-Goog-Upload-Protocol", "raw"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "file": {
                "name": "files/abc123",
                "uri": "https://api.test/files/abc123",
                "state": "PROCESSING"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let file = client
        .upload(vec![0u8; 64], "video/mp4", "match.mp4")
        .await
        .unwrap();

    assert_eq!(file.name, "files/abc123");
    assert_eq!(file.state, FileState::Processing);
}

#[tokio::test]
async fn test_get_file_reports_state() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1beta/files/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "files/abc123",
            "uri": "https://api.test/files/abc123",
            "state": "ACTIVE"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let file = client.get_file("files/abc123").await.unwrap();

    assert_eq!(file.state, FileState::Active);
    assert!(file.state.is_terminal());
}

#[tokio::test]
async fn test_generate_extracts_model_text() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-pro:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {
                    "parts": [{"text": "{\"highlights\": []}"}]
                }
            }]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let file = client_file();
    let text = client
        .generate(&file, "find the highlights", &GenerateOptions::default())
        .await
        .unwrap();

    assert_eq!(text, "{\"highlights\": []}");
}

#[tokio::test]
async fn test_generate_empty_candidates_is_malformed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-pro:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = client
        .generate(&client_file(), "prompt", &GenerateOptions::default())
        .await;

    assert!(matches!(result, Err(ClientError::MalformedResponse(_))));
}

#[tokio::test]
async fn test_rate_limit_is_retried_with_hint() {
    let server = MockServer::start().await;

    // First call hits the quota, the retry succeeds
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-pro:generateContent"))
        .respond_with(
            ResponseTemplate::new(429)
                .set_body_string("quota exceeded, please retry in 0.01s"),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-pro:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "ok"}]}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let file = client_file();
    let options = GenerateOptions::default();

    let text = with_retry(&fast_backoff(), &SystemJitter, "generate", || {
        client.generate(&file, "prompt", &options)
    })
    .await
    .unwrap();

    assert_eq!(text, "ok");
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-pro:generateContent"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid argument"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let file = client_file();
    let options = GenerateOptions::default();

    let result = with_retry(&fast_backoff(), &SystemJitter, "generate", || {
        client.generate(&file, "prompt", &options)
    })
    .await;

    assert!(matches!(result, Err(ClientError::Rejected(_))));
}

#[tokio::test]
async fn test_server_error_maps_to_unavailable() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1beta/files/abc123"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = client.get_file("files/abc123").await;

    match result {
        Err(e) => assert!(e.is_retryable()),
        Ok(_) => panic!("expected an error"),
    }
}

#[tokio::test]
async fn test_delete_file() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/v1beta/files/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.delete_file("files/abc123").await.unwrap();
}

fn client_file() -> reel_client::RemoteFile {
    serde_json::from_value(json!({
        "name": "files/abc123",
        "uri": "https://api.test/files/abc123",
        "state": "ACTIVE"
    }))
    .unwrap()
}
