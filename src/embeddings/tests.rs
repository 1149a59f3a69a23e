use super::*;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(base_url: String) -> EmbeddingConfig {
    EmbeddingConfig {
        base_url,
        model: "nomic-embed-text".to_string(),
        dimension: 4,
        batch_size: 16,
        timeout_secs: 5,
        api_key_env: None,
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn embeds_batch_in_input_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "embedding": [0.1, 0.2, 0.3, 0.4], "index": 0 },
                { "embedding": [0.5, 0.6, 0.7, 0.8], "index": 1 }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let embedder = HttpEmbedder::new(&test_config(server.uri())).expect("should build embedder");
    let texts = vec!["first".to_string(), "second".to_string()];

    let vectors = tokio::task::spawn_blocking(move || embedder.embed(&texts))
        .await
        .expect("task should not panic")
        .expect("embedding should succeed");

    assert_eq!(vectors.len(), 2);
    assert_eq!(vectors[0], vec![0.1, 0.2, 0.3, 0.4]);
    assert_eq!(vectors[1], vec![0.5, 0.6, 0.7, 0.8]);
}

#[tokio::test(flavor = "multi_thread")]
async fn rejects_vectors_of_wrong_dimension() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [ { "embedding": [0.1, 0.2], "index": 0 } ]
        })))
        .mount(&server)
        .await;

    let embedder = HttpEmbedder::new(&test_config(server.uri())).expect("should build embedder");
    let texts = vec!["text".to_string()];

    let err = tokio::task::spawn_blocking(move || embedder.embed(&texts))
        .await
        .expect("task should not panic")
        .expect_err("wrong dimension should fail");

    assert!(matches!(
        err,
        DocChatError::DimensionMismatch {
            expected: 4,
            actual: 2
        }
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(400))
        .expect(1)
        .mount(&server)
        .await;

    let embedder = HttpEmbedder::new(&test_config(server.uri()))
        .expect("should build embedder")
        .with_retry_attempts(3);
    let texts = vec!["text".to_string()];

    let err = tokio::task::spawn_blocking(move || embedder.embed(&texts))
        .await
        .expect("task should not panic")
        .expect_err("client error should fail");

    assert!(matches!(err, DocChatError::Embedding(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn response_count_must_match_request_count() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [ { "embedding": [0.1, 0.2, 0.3, 0.4], "index": 0 } ]
        })))
        .mount(&server)
        .await;

    let embedder = HttpEmbedder::new(&test_config(server.uri())).expect("should build embedder");
    let texts = vec!["one".to_string(), "two".to_string()];

    let err = tokio::task::spawn_blocking(move || embedder.embed(&texts))
        .await
        .expect("task should not panic")
        .expect_err("count mismatch should fail");

    assert!(matches!(err, DocChatError::Embedding(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_input_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let embedder = HttpEmbedder::new(&test_config(server.uri())).expect("should build embedder");
    let vectors = tokio::task::spawn_blocking(move || embedder.embed(&[]))
        .await
        .expect("task should not panic")
        .expect("empty input should succeed");

    assert!(vectors.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn large_inputs_are_split_into_batches() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [ { "embedding": [0.1, 0.2, 0.3, 0.4], "index": 0 } ]
        })))
        .expect(3)
        .mount(&server)
        .await;

    let mut config = test_config(server.uri());
    config.batch_size = 1;
    let embedder = HttpEmbedder::new(&config).expect("should build embedder");

    let texts = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    let vectors = tokio::task::spawn_blocking(move || embedder.embed(&texts))
        .await
        .expect("task should not panic")
        .expect("batched embedding should succeed");

    assert_eq!(vectors.len(), 3);
}
