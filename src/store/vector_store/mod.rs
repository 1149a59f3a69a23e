
use super::{AccessLevel, ChunkMetadata, EmbeddingRecord, StoreManifest};
use crate::{DocChatError, Result};
use arrow::array::{Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt32Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::Utc;
use futures::TryStreamExt;
use lancedb::{
    Connection,
    query::{ExecutableQuery, QueryBase},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

const TABLE_NAME: &str = "chunks";
const MANIFEST_FILE: &str = "manifest.json";

/// A single tenant's vector store: a LanceDB table under
/// `vector_db/<tenant_id>/` plus a manifest pinning the embedding model.
/// Never shared or merged across tenants.
pub struct TenantStore {
    tenant_id: String,
    connection: Connection,
    manifest: StoreManifest,
    store_dir: PathBuf,
}

impl std::fmt::Debug for TenantStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantStore")
            .field("tenant_id", &self.tenant_id)
            .field("manifest", &self.manifest)
            .field("store_dir", &self.store_dir)
            .finish_non_exhaustive()
    }
}

/// One hit from a similarity search, nearest first.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub chunk: ChunkMetadata,
    /// Relative ranking score, computed as `1.0 - distance`. Only meaningful
    /// for ordering hits within one result set; with an L2 metric it is not
    /// bounded to `[0, 1]` and goes negative for distances above 1.0. Use
    /// [`SearchResult::distance`] for metric-space comparisons.
    pub similarity_score: f32,
    /// Raw distance reported by the index, smaller is nearer.
    pub distance: f32,
}

/// Tenant ids become directory names and filter predicates, so restrict them
/// to a safe alphabet.
#[inline]
pub fn validate_tenant_id(tenant_id: &str) -> Result<()> {
    if tenant_id.is_empty()
        || !tenant_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(DocChatError::Store(format!(
            "invalid tenant id '{}': only alphanumerics, '-' and '_' are allowed",
            tenant_id
        )));
    }
    Ok(())
}

impl TenantStore {
    /// Open the tenant's store, creating an empty one if none exists yet.
    /// This is the caller's explicit choice when absence is acceptable
    /// (first ingestion); use [`TenantStore::load`] when absence is an error.
    #[inline]
    pub async fn open_or_create(
        root: &Path,
        tenant_id: &str,
        embedding_model: &str,
        dimension: usize,
    ) -> Result<Self> {
        validate_tenant_id(tenant_id)?;
        let store_dir = root.join(tenant_id);

        std::fs::create_dir_all(&store_dir).map_err(|e| {
            DocChatError::Store(format!(
                "failed to create store directory for tenant '{}': {}",
                tenant_id, e
            ))
        })?;

        let manifest_path = store_dir.join(MANIFEST_FILE);
        let manifest = if manifest_path.exists() {
            let manifest = Self::read_manifest(&manifest_path)?;
            Self::check_manifest(&manifest, embedding_model, dimension)?;
            manifest
        } else {
            let manifest = StoreManifest {
                embedding_model: embedding_model.to_string(),
                dimension,
                created_at: Utc::now().to_rfc3339(),
            };
            Self::write_manifest(&manifest_path, &manifest)?;
            info!(
                tenant = tenant_id,
                model = embedding_model,
                dimension,
                "Created new vector store"
            );
            manifest
        };

        let connection = Self::connect(&store_dir).await?;

        let mut store = Self {
            tenant_id: tenant_id.to_string(),
            connection,
            manifest,
            store_dir,
        };
        store.ensure_table().await?;

        Ok(store)
    }

    /// Open an existing store. Fails with [`DocChatError::StoreNotFound`]
    /// when the tenant has never been ingested.
    #[inline]
    pub async fn load(
        root: &Path,
        tenant_id: &str,
        embedding_model: &str,
        dimension: usize,
    ) -> Result<Self> {
        validate_tenant_id(tenant_id)?;
        let store_dir = root.join(tenant_id);

        if !store_dir.join(MANIFEST_FILE).exists() {
            return Err(DocChatError::StoreNotFound(tenant_id.to_string()));
        }

        Self::open_or_create(root, tenant_id, embedding_model, dimension).await
    }

    /// Whether a persisted store exists for this tenant.
    #[inline]
    pub fn exists(root: &Path, tenant_id: &str) -> bool {
        root.join(tenant_id).join(MANIFEST_FILE).exists()
    }

    #[inline]
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    #[inline]
    pub fn manifest(&self) -> &StoreManifest {
        &self.manifest
    }

    /// Append records to the store. The entire batch lands in one LanceDB
    /// commit, so concurrent readers see the store fully updated or
    /// untouched. Rejects records whose dimensionality disagrees with the
    /// manifest rather than corrupting similarity results.
    #[inline]
    pub async fn add(&mut self, records: &[EmbeddingRecord]) -> Result<()> {
        if records.is_empty() {
            debug!(tenant = %self.tenant_id, "No records to add");
            return Ok(());
        }

        for record in records {
            if record.vector.len() != self.manifest.dimension {
                return Err(DocChatError::DimensionMismatch {
                    expected: self.manifest.dimension,
                    actual: record.vector.len(),
                });
            }
        }

        let record_batch = self.create_record_batch(records)?;

        let table = self.open_table().await?;
        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| DocChatError::Store(format!("failed to insert records: {}", e)))?;

        info!(
            tenant = %self.tenant_id,
            records = records.len(),
            "Stored embedding records"
        );
        Ok(())
    }

    /// Discard all prior content and write `records` fresh. Used as the
    /// recovery path when an incremental add is not possible; callers log
    /// the data-loss risk before reaching for this.
    #[inline]
    pub async fn rebuild(&mut self, records: &[EmbeddingRecord]) -> Result<()> {
        warn!(tenant = %self.tenant_id, "Rebuilding vector store from scratch");

        self.drop_table_if_exists().await?;
        self.ensure_table().await?;
        self.add(records).await
    }

    /// Nearest-neighbor search, optionally restricted to one access level.
    /// The restriction is pushed into the LanceDB query as a native metadata
    /// filter, so the top-k results are taken from the eligible set rather
    /// than post-filtered below k.
    #[inline]
    pub async fn search(
        &self,
        query_vector: &[f32],
        limit: usize,
        access_filter: Option<AccessLevel>,
    ) -> Result<Vec<SearchResult>> {
        if query_vector.len() != self.manifest.dimension {
            return Err(DocChatError::DimensionMismatch {
                expected: self.manifest.dimension,
                actual: query_vector.len(),
            });
        }

        debug!(
            tenant = %self.tenant_id,
            limit,
            filter = ?access_filter,
            "Searching for similar chunks"
        );

        let table = self.open_table().await?;

        let mut query = table
            .vector_search(query_vector)
            .map_err(|e| DocChatError::Store(format!("failed to create vector search: {}", e)))?
            .column("vector")
            .limit(limit);

        if let Some(level) = access_filter {
            query = query.only_if(format!("access_level = '{}'", level.as_str()));
        }

        let mut stream = query
            .execute()
            .await
            .map_err(|e| DocChatError::Store(format!("failed to execute search: {}", e)))?;

        let mut results = Vec::new();
        while let Some(batch) = stream
            .try_next()
            .await
            .map_err(|e| DocChatError::Store(format!("failed to read result stream: {}", e)))?
        {
            results.extend(self.parse_search_batch(&batch)?);
        }

        debug!(tenant = %self.tenant_id, hits = results.len(), "Search complete");
        Ok(results)
    }

    /// Total number of chunks in the store.
    #[inline]
    pub async fn count(&self) -> Result<usize> {
        let table = self.open_table().await?;
        table
            .count_rows(None)
            .await
            .map_err(|e| DocChatError::Store(format!("failed to count rows: {}", e)))
    }

    /// Number of chunks at one access level.
    #[inline]
    pub async fn count_by_access(&self, level: AccessLevel) -> Result<usize> {
        let table = self.open_table().await?;
        table
            .count_rows(Some(format!("access_level = '{}'", level.as_str())))
            .await
            .map_err(|e| DocChatError::Store(format!("failed to count rows: {}", e)))
    }

    async fn connect(store_dir: &Path) -> Result<Connection> {
        let uri = format!("file://{}", store_dir.join("data").display());
        lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| DocChatError::Store(format!("failed to connect to LanceDB: {}", e)))
    }

    async fn ensure_table(&mut self) -> Result<()> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| DocChatError::Store(format!("failed to list tables: {}", e)))?;

        if table_names.contains(&TABLE_NAME.to_string()) {
            return Ok(());
        }

        let schema = self.create_schema();
        self.connection
            .create_empty_table(TABLE_NAME, schema)
            .execute()
            .await
            .map_err(|e| DocChatError::Store(format!("failed to create table: {}", e)))?;

        debug!(tenant = %self.tenant_id, "Created chunks table");
        Ok(())
    }

    async fn open_table(&self) -> Result<lancedb::Table> {
        self.connection
            .open_table(TABLE_NAME)
            .execute()
            .await
            .map_err(|e| DocChatError::Store(format!("failed to open table: {}", e)))
    }

    async fn drop_table_if_exists(&self) -> Result<()> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| DocChatError::Store(format!("failed to list tables: {}", e)))?;

        if table_names.contains(&TABLE_NAME.to_string()) {
            self.connection
                .drop_table(TABLE_NAME)
                .await
                .map_err(|e| DocChatError::Store(format!("failed to drop table: {}", e)))?;
        }

        Ok(())
    }

    fn read_manifest(path: &Path) -> Result<StoreManifest> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DocChatError::Store(format!("failed to read store manifest: {}", e)))?;
        serde_json::from_str(&content)
            .map_err(|e| DocChatError::Store(format!("failed to parse store manifest: {}", e)))
    }

    fn write_manifest(path: &Path, manifest: &StoreManifest) -> Result<()> {
        let content = serde_json::to_string_pretty(manifest)
            .map_err(|e| DocChatError::Store(format!("failed to serialize manifest: {}", e)))?;
        std::fs::write(path, content)
            .map_err(|e| DocChatError::Store(format!("failed to write store manifest: {}", e)))
    }

    fn check_manifest(
        manifest: &StoreManifest,
        embedding_model: &str,
        dimension: usize,
    ) -> Result<()> {
        if manifest.embedding_model != embedding_model {
            return Err(DocChatError::ModelMismatch {
                expected: manifest.embedding_model.clone(),
                actual: embedding_model.to_string(),
            });
        }
        if manifest.dimension != dimension {
            return Err(DocChatError::DimensionMismatch {
                expected: manifest.dimension,
                actual: dimension,
            });
        }
        Ok(())
    }

    fn create_schema(&self) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, false)),
                    self.manifest.dimension as i32,
                ),
                false,
            ),
            Field::new("text", DataType::Utf8, false),
            Field::new("tenant_id", DataType::Utf8, false),
            Field::new("access_level", DataType::Utf8, false),
            Field::new("source_filename", DataType::Utf8, false),
            Field::new("chunk_index", DataType::UInt32, false),
            Field::new("created_at", DataType::Utf8, false),
        ]))
    }

    fn create_record_batch(&self, records: &[EmbeddingRecord]) -> Result<RecordBatch> {
        let len = records.len();
        let dimension = self.manifest.dimension;

        let mut ids = Vec::with_capacity(len);
        let mut texts = Vec::with_capacity(len);
        let mut tenant_ids = Vec::with_capacity(len);
        let mut access_levels = Vec::with_capacity(len);
        let mut source_filenames = Vec::with_capacity(len);
        let mut chunk_indices = Vec::with_capacity(len);
        let mut created_ats = Vec::with_capacity(len);
        let mut flat_values = Vec::with_capacity(len * dimension);

        for record in records {
            ids.push(record.id.as_str());
            texts.push(record.metadata.text.as_str());
            tenant_ids.push(record.metadata.tenant_id.as_str());
            access_levels.push(record.metadata.access_level.as_str());
            source_filenames.push(record.metadata.source_filename.as_str());
            chunk_indices.push(record.metadata.chunk_index);
            created_ats.push(record.metadata.created_at.as_str());
            flat_values.extend_from_slice(&record.vector);
        }

        let values_array = Float32Array::from(flat_values);
        let item_field = Arc::new(Field::new("item", DataType::Float32, false));
        let vector_array =
            FixedSizeListArray::try_new(item_field, dimension as i32, Arc::new(values_array), None)
                .map_err(|e| DocChatError::Store(format!("failed to create vector array: {}", e)))?;

        let schema = self.create_schema();
        let arrays: Vec<Arc<dyn Array>> = vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(vector_array),
            Arc::new(StringArray::from(texts)),
            Arc::new(StringArray::from(tenant_ids)),
            Arc::new(StringArray::from(access_levels)),
            Arc::new(StringArray::from(source_filenames)),
            Arc::new(UInt32Array::from(chunk_indices)),
            Arc::new(StringArray::from(created_ats)),
        ];

        RecordBatch::try_new(schema, arrays)
            .map_err(|e| DocChatError::Store(format!("failed to create record batch: {}", e)))
    }

    fn parse_search_batch(&self, batch: &RecordBatch) -> Result<Vec<SearchResult>> {
        let texts = string_column(batch, "text")?;
        let tenant_ids = string_column(batch, "tenant_id")?;
        let access_levels = string_column(batch, "access_level")?;
        let source_filenames = string_column(batch, "source_filename")?;
        let created_ats = string_column(batch, "created_at")?;

        let chunk_indices = batch
            .column_by_name("chunk_index")
            .and_then(|col| col.as_any().downcast_ref::<UInt32Array>())
            .ok_or_else(|| DocChatError::Store("missing chunk_index column".to_string()))?;

        let distances = batch
            .column_by_name("_distance")
            .and_then(|col| col.as_any().downcast_ref::<Float32Array>());

        let mut results = Vec::with_capacity(batch.num_rows());
        for row in 0..batch.num_rows() {
            let access_level = AccessLevel::parse(access_levels.value(row)).ok_or_else(|| {
                DocChatError::Store(format!(
                    "unknown access level '{}' in store for tenant '{}'",
                    access_levels.value(row),
                    self.tenant_id
                ))
            })?;

            let chunk = ChunkMetadata {
                text: texts.value(row).to_string(),
                tenant_id: tenant_ids.value(row).to_string(),
                access_level,
                source_filename: source_filenames.value(row).to_string(),
                chunk_index: chunk_indices.value(row),
                created_at: created_ats.value(row).to_string(),
            };

            let distance =
                distances.map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

            results.push(SearchResult {
                chunk,
                similarity_score: 1.0 - distance,
                distance,
            });
        }

        Ok(results)
    }

    /// Directory holding this tenant's persisted data.
    #[inline]
    pub fn store_dir(&self) -> &Path {
        &self.store_dir
    }
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|col| col.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| DocChatError::Store(format!("missing {} column", name)))
}
