
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::chunking::{ChunkingConfig, chunk_documents};
use crate::documents::{FileUpload, RawDocument, is_supported, load_document};
use crate::embeddings::TextEmbedder;
use crate::store::{AccessLevel, ChunkMetadata, EmbeddingRecord, TenantStore, validate_tenant_id};
use crate::{DocChatError, Result};

/// Outcome of one ingestion batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionReport {
    pub files_ingested: usize,
    /// Uploads skipped for an unsupported extension, by filename.
    pub files_skipped: Vec<String>,
    pub chunks_added: usize,
}

/// Validates, loads, chunks, embeds and persists uploaded documents for one
/// tenant at a time. Ingestions for the same tenant are serialized; different
/// tenants proceed concurrently.
pub struct IngestionPipeline {
    embedder: Arc<dyn TextEmbedder>,
    vector_db_root: PathBuf,
    chunking: ChunkingConfig,
    tenant_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl IngestionPipeline {
    #[inline]
    pub fn new(
        embedder: Arc<dyn TextEmbedder>,
        vector_db_root: PathBuf,
        chunking: ChunkingConfig,
    ) -> Self {
        Self {
            embedder,
            vector_db_root,
            chunking,
            tenant_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Ingest a batch of uploads into the tenant's store at the given access
    /// level.
    ///
    /// The quota is enforced against the submitted file count before any file
    /// is read or the store is touched, so a rejected batch leaves the store
    /// exactly as it was. Unsupported files are skipped with a warning;
    /// parse and embedding failures abort the whole batch. The surviving
    /// chunks land in the store as one atomic append.
    #[inline]
    pub async fn ingest(
        &self,
        tenant_id: &str,
        access_level: AccessLevel,
        files: &[&dyn FileUpload],
        max_docs: Option<usize>,
    ) -> Result<IngestionReport> {
        if let Some(limit) = max_docs {
            if files.len() > limit {
                return Err(DocChatError::QuotaExceeded {
                    submitted: files.len(),
                    limit,
                });
            }
        }

        let lock = self.lock_for(tenant_id);
        let _guard = lock.lock().await;

        let mut documents: Vec<RawDocument> = Vec::new();
        let mut skipped = Vec::new();

        for file in files {
            if !is_supported(file.name()) {
                warn!(
                    tenant = tenant_id,
                    file = file.name(),
                    "Skipping unsupported file type"
                );
                skipped.push(file.name().to_string());
                continue;
            }
            documents.extend(load_document(*file)?);
        }

        let files_ingested = documents.len();
        let chunks = chunk_documents(&documents, &self.chunking);
        if chunks.is_empty() {
            return Err(DocChatError::EmptyIngestion);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed(&texts)?;
        if vectors.len() != chunks.len() {
            return Err(DocChatError::Embedding(format!(
                "expected {} vectors, got {}",
                chunks.len(),
                vectors.len()
            )));
        }

        let created_at = Utc::now().to_rfc3339();
        let records: Vec<EmbeddingRecord> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| EmbeddingRecord {
                id: Uuid::new_v4().to_string(),
                vector,
                metadata: ChunkMetadata {
                    text: chunk.text,
                    tenant_id: tenant_id.to_string(),
                    access_level,
                    source_filename: chunk.source_filename,
                    chunk_index: chunk.chunk_index,
                    created_at: created_at.clone(),
                },
            })
            .collect();

        let mut store = self.open_store(tenant_id).await?;
        if let Err(err) = store.add(&records).await {
            match err {
                DocChatError::Store(_) => {
                    error!(
                        tenant = tenant_id,
                        error = %err,
                        "Store is unreadable; rebuilding from this batch only, prior content will be lost"
                    );
                    store.rebuild(&records).await?;
                }
                other => return Err(other),
            }
        }

        info!(
            tenant = tenant_id,
            access = %access_level,
            files = files_ingested,
            skipped = skipped.len(),
            chunks = records.len(),
            "Ingestion complete"
        );

        Ok(IngestionReport {
            files_ingested,
            files_skipped: skipped,
            chunks_added: records.len(),
        })
    }

    /// Open the tenant's store. A model or dimension mismatch against the
    /// persisted manifest is rejected, exactly as on the retrieval path;
    /// wiping a store is an explicit operator action, never a side effect
    /// of a config edit. An unreadable store (unparseable manifest, broken
    /// table) is discarded and recreated so ingestion cannot wedge
    /// permanently for the tenant, at the loudly logged cost of prior
    /// content.
    async fn open_store(&self, tenant_id: &str) -> Result<TenantStore> {
        validate_tenant_id(tenant_id)?;

        let model = self.embedder.model_id();
        let dimension = self.embedder.dimension();

        match TenantStore::open_or_create(&self.vector_db_root, tenant_id, model, dimension).await {
            Ok(store) => Ok(store),
            Err(DocChatError::Store(reason)) => {
                error!(
                    tenant = tenant_id,
                    reason,
                    "Store is unreadable; recreating it from scratch, prior content will be lost"
                );
                std::fs::remove_dir_all(self.vector_db_root.join(tenant_id))?;
                TenantStore::open_or_create(&self.vector_db_root, tenant_id, model, dimension).await
            }
            Err(err) => Err(err),
        }
    }

    fn lock_for(&self, tenant_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .tenant_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            locks
                .entry(tenant_id.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
        )
    }
}
