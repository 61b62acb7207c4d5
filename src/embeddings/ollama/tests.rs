use super::*;
use crate::config::OllamaConfig;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(dimension: u32) -> OllamaConfig {
    OllamaConfig {
        embedding_dimension: dimension,
        batch_size: 4,
        ..OllamaConfig::default()
    }
}

fn client_for(server: &MockServer, dimension: u32) -> OllamaClient {
    let uri = Url::parse(&server.uri()).expect("mock server uri should parse");
    let config = OllamaConfig {
        host: uri.host_str().expect("mock uri has host").to_string(),
        port: uri.port().expect("mock uri has port"),
        ..test_config(dimension)
    };
    OllamaClient::new(&config)
        .expect("should create client")
        .with_retry_attempts(1)
}

#[test]
fn client_configuration() {
    let config = OllamaConfig {
        protocol: "http".to_string(),
        host: "test-host".to_string(),
        port: 1234,
        embedding_model: "test-embed".to_string(),
        generation_model: "test-gen".to_string(),
        batch_size: 128,
        embedding_dimension: 768,
    };
    let client = OllamaClient::new(&config).expect("Failed to create client");

    assert_eq!(client.embedding_model, "test-embed");
    assert_eq!(client.generation_model, "test-gen");
    assert_eq!(client.batch_size, 128);
    assert_eq!(client.embedding_dimension, 768);
    assert_eq!(client.base_url.host_str(), Some("test-host"));
    assert_eq!(client.base_url.port(), Some(1234));
    assert_eq!(client.retry_attempts, DEFAULT_RETRY_ATTEMPTS);
}

#[test]
fn unparseable_host_is_a_configuration_error() {
    let config = OllamaConfig {
        host: "not a host".to_string(),
        ..test_config(768)
    };

    let err = OllamaClient::new(&config).expect_err("bad host must fail");
    assert!(matches!(err, crate::SearchError::Config(_)));
}

#[test]
fn client_builder_methods() {
    let config = OllamaConfig::default();
    let client = OllamaClient::new(&config)
        .expect("Failed to create client")
        .with_timeout(Duration::from_secs(60))
        .with_retry_attempts(5);

    assert_eq!(client.retry_attempts, 5);
}

#[test]
fn vector_validation_rejects_wrong_dimension() {
    let client = OllamaClient::new(&test_config(4)).expect("should create client");

    assert!(client.validate_vector(&[0.5, 0.5, 0.5, 0.5]).is_ok());
    assert!(client.validate_vector(&[0.5, 0.5]).is_err());
}

#[test]
fn vector_validation_rejects_non_finite_values() {
    let client = OllamaClient::new(&test_config(3)).expect("should create client");

    assert!(client.validate_vector(&[0.1, f32::NAN, 0.3]).is_err());
    assert!(client.validate_vector(&[0.1, f32::INFINITY, 0.3]).is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn single_embedding_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"embedding": [0.6, 0.8, 0.0]})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server, 3);
    let embedding = tokio::task::spawn_blocking(move || client.generate_embedding("Ana"))
        .await
        .expect("task should join")
        .expect("embedding should succeed");

    assert_eq!(embedding, vec![0.6, 0.8, 0.0]);
}

#[tokio::test(flavor = "multi_thread")]
async fn embedding_with_wrong_dimension_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embedding": [0.6, 0.8]})))
        .mount(&server)
        .await;

    let client = client_for(&server, 3);
    let result = tokio::task::spawn_blocking(move || client.generate_embedding("Ana"))
        .await
        .expect("task should join");

    assert!(result.is_err());
    let message = format!("{:#}", result.expect_err("should be an error"));
    assert!(message.contains("dimensions"), "unexpected error: {message}");
}

#[tokio::test(flavor = "multi_thread")]
async fn batch_count_mismatch_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"embeddings": [[0.1, 0.2, 0.3]]})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server, 3);
    let texts = vec!["one".to_string(), "two".to_string()];
    let result = tokio::task::spawn_blocking(move || client.generate_embeddings_batch(&texts))
        .await
        .expect("task should join");

    assert!(result.is_err());
    let message = format!("{:#}", result.expect_err("should be an error"));
    assert!(message.contains("Mismatch"), "unexpected error: {message}");
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_batch_makes_no_requests() {
    let server = MockServer::start().await;
    // No mocks mounted: any request would 404 and fail the call

    let client = client_for(&server, 3);
    let result = tokio::task::spawn_blocking(move || client.generate_embeddings_batch(&[]))
        .await
        .expect("task should join")
        .expect("empty batch should succeed");

    assert!(result.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(400))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 3).with_retry_attempts(3);
    let result = tokio::task::spawn_blocking(move || client.generate_embedding("Ana"))
        .await
        .expect("task should join");

    assert!(result.is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn completion_request_returns_response_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"response": "Ana is available for the project."})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server, 3);
    let answer = tokio::task::spawn_blocking(move || client.generate_completion("Who knows Python?"))
        .await
        .expect("task should join")
        .expect("completion should succeed");

    assert_eq!(answer, "Ana is available for the project.");
}
