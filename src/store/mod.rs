// Vector storage module
// One LanceDB store per tenant, tagged with the embedding model that built it

pub mod vector_store;

use serde::{Deserialize, Serialize};

pub use vector_store::{SearchResult, TenantStore, validate_tenant_id};

/// Visibility of a chunk: which roles may retrieve it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Public,
    Admin,
}

impl AccessLevel {
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            AccessLevel::Public => "public",
            AccessLevel::Admin => "admin",
        }
    }

    #[inline]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "public" => Some(AccessLevel::Public),
            "admin" => Some(AccessLevel::Admin),
            _ => None,
        }
    }
}

impl std::fmt::Display for AccessLevel {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata persisted alongside each embedding. Chunks are immutable once
/// written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub text: String,
    pub tenant_id: String,
    pub access_level: AccessLevel,
    pub source_filename: String,
    pub chunk_index: u32,
    pub created_at: String,
}

/// One embedding and the chunk it represents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub metadata: ChunkMetadata,
}

/// Per-store manifest pinning the embedding model and dimensionality.
/// Mixing models in one store corrupts similarity comparisons, so `add` and
/// `load` reject on mismatch instead of proceeding silently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreManifest {
    pub embedding_model: String,
    pub dimension: usize,
    pub created_at: String,
}
