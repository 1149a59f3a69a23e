use super::*;
use crate::store::{ChunkMetadata, EmbeddingRecord};
use tempfile::TempDir;

const DIM: usize = 8;

/// Deterministic stand-in for a real embedding model: texts sharing words get
/// nearby vectors.
struct StubEmbedder;

fn stub_vector(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; DIM];
    for (i, byte) in text.bytes().enumerate() {
        vector[i % DIM] += f32::from(byte) / 255.0;
    }
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt().max(1e-6);
    vector.iter_mut().for_each(|v| *v /= norm);
    vector
}

impl TextEmbedder for StubEmbedder {
    fn model_id(&self) -> &str {
        "stub-embed"
    }

    fn dimension(&self) -> usize {
        DIM
    }

    fn embed(&self, texts: &[String]) -> crate::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| stub_vector(t)).collect())
    }
}

fn record(text: &str, access: AccessLevel) -> EmbeddingRecord {
    EmbeddingRecord {
        id: uuid::Uuid::new_v4().to_string(),
        vector: stub_vector(text),
        metadata: ChunkMetadata {
            text: text.to_string(),
            tenant_id: "acme".to_string(),
            access_level: access,
            source_filename: "handbook.txt".to_string(),
            chunk_index: 0,
            created_at: "2024-01-01T00:00:00Z".to_string(),
        },
    }
}

async fn seed_store(root: &std::path::Path, records: &[EmbeddingRecord]) {
    let mut store = TenantStore::open_or_create(root, "acme", "stub-embed", DIM)
        .await
        .expect("should create store");
    store.add(records).await.expect("should add records");
}

#[tokio::test]
async fn user_never_sees_admin_chunks() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    seed_store(
        temp_dir.path(),
        &[
            record("the refund policy allows returns within 7 days", AccessLevel::Public),
            record("office hours are 9 to 6 on weekdays", AccessLevel::Public),
            record("internal payroll runs on the 25th", AccessLevel::Admin),
            record("admin passwords rotate monthly", AccessLevel::Admin),
        ],
    )
    .await;

    let retriever = Retriever::new(std::sync::Arc::new(StubEmbedder), temp_dir.path().to_path_buf());

    for query in ["refund policy", "payroll", "passwords", "anything at all"] {
        let results = retriever
            .retrieve("acme", AccessRole::User, query, 10)
            .await
            .expect("retrieval should succeed");

        for result in &results {
            assert_eq!(
                result.chunk.access_level,
                AccessLevel::Public,
                "user must never see admin chunk '{}'",
                result.chunk.text
            );
        }
    }
}

#[tokio::test]
async fn admin_sees_admin_and_public_chunks() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    seed_store(
        temp_dir.path(),
        &[
            record("the refund policy allows returns within 7 days", AccessLevel::Public),
            record("internal payroll runs on the 25th", AccessLevel::Admin),
        ],
    )
    .await;

    let retriever = Retriever::new(std::sync::Arc::new(StubEmbedder), temp_dir.path().to_path_buf());

    let results = retriever
        .retrieve("acme", AccessRole::Admin, "payroll and refunds", 10)
        .await
        .expect("retrieval should succeed");

    assert!(
        results
            .iter()
            .any(|r| r.chunk.access_level == AccessLevel::Admin)
    );
    assert!(
        results
            .iter()
            .any(|r| r.chunk.access_level == AccessLevel::Public)
    );
}

#[tokio::test]
async fn results_are_capped_at_k() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let records: Vec<EmbeddingRecord> = (0..10)
        .map(|i| record(&format!("chunk number {} about shipping", i), AccessLevel::Public))
        .collect();
    seed_store(temp_dir.path(), &records).await;

    let retriever = Retriever::new(std::sync::Arc::new(StubEmbedder), temp_dir.path().to_path_buf());

    let results = retriever
        .retrieve("acme", AccessRole::User, "shipping", DEFAULT_TOP_K)
        .await
        .expect("retrieval should succeed");
    assert!(results.len() <= DEFAULT_TOP_K);
}

#[tokio::test]
async fn unknown_tenant_is_store_not_found() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let retriever = Retriever::new(std::sync::Arc::new(StubEmbedder), temp_dir.path().to_path_buf());

    let err = retriever
        .retrieve("never-ingested", AccessRole::User, "anything", 4)
        .await
        .expect_err("unknown tenant should fail");
    assert!(matches!(err, DocChatError::StoreNotFound(_)));
}

#[test]
fn role_parsing_and_filters() {
    assert_eq!(AccessRole::parse("user"), Some(AccessRole::User));
    assert_eq!(AccessRole::parse("admin"), Some(AccessRole::Admin));
    assert_eq!(AccessRole::parse("superuser"), None);

    assert_eq!(AccessRole::User.access_filter(), Some(AccessLevel::Public));
    assert_eq!(AccessRole::Admin.access_filter(), None);
}
