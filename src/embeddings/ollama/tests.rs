use super::*;

#[test]
fn client_configuration() {
    let config = OllamaConfig {
        protocol: "http".to_string(),
        host: "test-host".to_string(),
        port: 1234,
        model: "test-model".to_string(),
        batch_size: 128,
        embedding_dimension: 384,
    };
    let client = OllamaClient::new(&config).expect("should create client");

    assert_eq!(client.model, "test-model");
    assert_eq!(client.batch_size, 128);
    assert_eq!(client.dimension(), 384);
    assert_eq!(client.base_url.host_str(), Some("test-host"));
    assert_eq!(client.base_url.port(), Some(1234));
    assert_eq!(client.retry_attempts, DEFAULT_RETRY_ATTEMPTS);
}

#[test]
fn client_builder_methods() {
    let client = OllamaClient::new(&OllamaConfig::default())
        .expect("should create client")
        .with_timeout(Duration::from_secs(60))
        .with_retry_attempts(5);
    assert_eq!(client.retry_attempts, 5);

    let client = client.with_retry_attempts(0);
    assert_eq!(client.retry_attempts, 1);
}

#[test]
fn embed_request_uses_input_array() {
    let texts = vec!["a".to_string(), "b".to_string()];
    let request = EmbedRequest {
        model: "nomic-embed-text",
        input: &texts,
    };
    let json = serde_json::to_value(&request).expect("should serialize request");
    assert_eq!(
        json,
        serde_json::json!({"model": "nomic-embed-text", "input": ["a", "b"]})
    );
}

#[test]
fn empty_batch_makes_no_request() {
    let config = OllamaConfig {
        host: "unreachable.invalid".to_string(),
        ..OllamaConfig::default()
    };
    let client = OllamaClient::new(&config).expect("should create client");
    let result = client
        .generate_embeddings_batch(&[])
        .expect("empty batch should succeed");
    assert!(result.is_empty());
}
