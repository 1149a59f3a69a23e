
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::config::Config;
use crate::documents::{DiskFile, FileUpload};
use crate::embeddings::{HttpEmbedder, TextEmbedder};
use crate::generation::GenerationOrchestrator;
use crate::ingest::{IngestionPipeline, IngestionReport};
use crate::retrieval::{DEFAULT_TOP_K, Retriever};
use crate::session::Session;
use crate::store::{AccessLevel, TenantStore};
use crate::{DocChatError, Result};

/// Returned to the caller when answering fails internally. The real cause is
/// logged server-side; this string carries no error detail.
pub const APOLOGY_ANSWER: &str = "I couldn't process that request right now.";

/// Returned when the tenant has no vector store yet.
pub const NO_DOCUMENTS_ANSWER: &str =
    "No documents have been ingested for this business yet. Please upload some documents first.";

/// Chunk counts for one tenant's store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantStatus {
    pub total_chunks: usize,
    pub public_chunks: usize,
    pub admin_chunks: usize,
}

/// Ingestion results of one bootstrap pass, per access level. `None` means
/// the corresponding directory was absent or empty.
#[derive(Debug, Clone, Default)]
pub struct BootstrapReport {
    pub public: Option<IngestionReport>,
    pub admin: Option<IngestionReport>,
}

/// The application facade: every entrypoint a UI or CLI needs, wired over
/// the ingestion pipeline, retriever and generator.
pub struct DocChat {
    config: Config,
    pipeline: IngestionPipeline,
    retriever: Retriever,
    generator: GenerationOrchestrator,
}

impl DocChat {
    /// Build the service from configuration, with HTTP-backed embedding and
    /// generation. Fails up front when a required API key is missing from
    /// the environment.
    #[inline]
    pub fn new(config: Config) -> Result<Self> {
        config
            .validate()
            .map_err(|e| DocChatError::Config(e.to_string()))?;
        config
            .validate_secrets()
            .map_err(|e| DocChatError::Config(e.to_string()))?;

        let embedder: Arc<dyn TextEmbedder> = Arc::new(HttpEmbedder::new(&config.embedding)?);
        let generator = GenerationOrchestrator::from_config(&config.generation)?;

        Ok(Self::with_components(config, embedder, generator))
    }

    /// Wire the service from explicit components. Used by tests to
    /// substitute stub models, and by embedders other than the HTTP one.
    #[inline]
    pub fn with_components(
        config: Config,
        embedder: Arc<dyn TextEmbedder>,
        generator: GenerationOrchestrator,
    ) -> Self {
        let vector_db_root = config.vector_db_path();
        let pipeline = IngestionPipeline::new(
            Arc::clone(&embedder),
            vector_db_root.clone(),
            config.chunking.clone(),
        );
        let retriever = Retriever::new(embedder, vector_db_root);

        Self {
            config,
            pipeline,
            retriever,
            generator,
        }
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Ingest uploaded files for a tenant at one access level.
    ///
    /// `max_docs` overrides the quota for this batch; when `None`, the
    /// configured package tier supplies it. A quota rejection happens before
    /// any file is read.
    #[inline]
    pub async fn ingest_files(
        &self,
        tenant_id: &str,
        access_level: AccessLevel,
        files: &[&dyn FileUpload],
        max_docs: Option<usize>,
    ) -> Result<IngestionReport> {
        let quota = max_docs.or_else(|| self.config.package.max_docs());
        self.pipeline
            .ingest(tenant_id, access_level, files, quota)
            .await
    }

    /// Ingest any documents already on disk under
    /// `businesses/<tenant>/public_docs/` and `businesses/<tenant>/admin_docs/`.
    /// Missing or empty directories are skipped without error.
    #[inline]
    pub async fn bootstrap_tenant(&self, tenant_id: &str) -> Result<BootstrapReport> {
        let tenant_root = self.config.businesses_path().join(tenant_id);
        let mut report = BootstrapReport::default();

        for (subdir, access_level) in [
            ("public_docs", AccessLevel::Public),
            ("admin_docs", AccessLevel::Admin),
        ] {
            let dir = tenant_root.join(subdir);
            let files = collect_disk_files(&dir)?;
            if files.is_empty() {
                debug!(tenant = tenant_id, dir = %dir.display(), "No documents to bootstrap");
                continue;
            }

            let uploads: Vec<&dyn FileUpload> =
                files.iter().map(|f| f as &dyn FileUpload).collect();
            let result = self
                .pipeline
                .ingest(
                    tenant_id,
                    access_level,
                    &uploads,
                    self.config.package.max_docs(),
                )
                .await?;

            info!(
                tenant = tenant_id,
                access = %access_level,
                files = result.files_ingested,
                chunks = result.chunks_added,
                "Bootstrapped documents from disk"
            );

            match access_level {
                AccessLevel::Public => report.public = Some(result),
                AccessLevel::Admin => report.admin = Some(result),
            }
        }

        Ok(report)
    }

    /// Answer a question for the session's tenant and role, recording the
    /// exchange on the transcript.
    ///
    /// This entrypoint never fails: internal errors are logged with full
    /// detail and surface to the caller as a fixed apology string, and a
    /// tenant with no store yet gets a "no documents" message instead of an
    /// error.
    #[inline]
    pub async fn answer_query(&self, session: &mut Session, question: &str) -> String {
        let answer = self.try_answer(session, question).await;
        session.record_exchange(question, &answer);
        answer
    }

    async fn try_answer(&self, session: &Session, question: &str) -> String {
        let chunks = match self
            .retriever
            .retrieve(session.tenant_id(), session.role(), question, DEFAULT_TOP_K)
            .await
        {
            Ok(chunks) => chunks,
            Err(DocChatError::StoreNotFound(_)) => {
                return NO_DOCUMENTS_ANSWER.to_string();
            }
            Err(err) => {
                error!(
                    tenant = session.tenant_id(),
                    error = %err,
                    "Retrieval failed"
                );
                return APOLOGY_ANSWER.to_string();
            }
        };

        match self.generator.answer(&chunks, question) {
            Ok(answer) => answer,
            Err(err) => {
                error!(
                    tenant = session.tenant_id(),
                    error = %err,
                    "Generation failed"
                );
                APOLOGY_ANSWER.to_string()
            }
        }
    }

    /// Chunk counts for one tenant. Fails with
    /// [`DocChatError::StoreNotFound`] when the tenant has never been
    /// ingested.
    #[inline]
    pub async fn status(&self, tenant_id: &str) -> Result<TenantStatus> {
        let store = TenantStore::load(
            &self.config.vector_db_path(),
            tenant_id,
            self.retriever_model(),
            self.retriever_dimension(),
        )
        .await?;

        Ok(TenantStatus {
            total_chunks: store.count().await?,
            public_chunks: store.count_by_access(AccessLevel::Public).await?,
            admin_chunks: store.count_by_access(AccessLevel::Admin).await?,
        })
    }

    fn retriever_model(&self) -> &str {
        self.retriever.embedder().model_id()
    }

    fn retriever_dimension(&self) -> usize {
        self.retriever.embedder().dimension()
    }
}

/// All regular files in `dir`, sorted by name for deterministic ingestion
/// order. An absent directory yields an empty list.
fn collect_disk_files(dir: &Path) -> Result<Vec<DiskFile>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();

    Ok(files.into_iter().map(DiskFile::new).collect())
}
