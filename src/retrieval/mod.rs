#[cfg(test)]
mod tests;

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::embeddings::TextEmbedder;
use crate::store::{AccessLevel, SearchResult, TenantStore};
use crate::{DocChatError, Result};

/// Default number of chunks fed to generation.
pub const DEFAULT_TOP_K: usize = 4;

/// Role of the querying user, mapped to an access predicate at query time.
/// Admin is unrestricted; every other role sees public chunks only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessRole {
    User,
    Admin,
}

impl AccessRole {
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            AccessRole::User => "user",
            AccessRole::Admin => "admin",
        }
    }

    #[inline]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(AccessRole::User),
            "admin" => Some(AccessRole::Admin),
            _ => None,
        }
    }

    /// The store-level filter for this role. `None` means unrestricted.
    #[inline]
    pub fn access_filter(self) -> Option<AccessLevel> {
        match self {
            AccessRole::Admin => None,
            AccessRole::User => Some(AccessLevel::Public),
        }
    }
}

impl std::fmt::Display for AccessRole {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role-scoped nearest-neighbor retrieval over one tenant's store.
pub struct Retriever {
    embedder: Arc<dyn TextEmbedder>,
    vector_db_root: PathBuf,
}

impl Retriever {
    #[inline]
    pub fn new(embedder: Arc<dyn TextEmbedder>, vector_db_root: PathBuf) -> Self {
        Self {
            embedder,
            vector_db_root,
        }
    }

    /// The embedder this retriever queries with.
    #[inline]
    pub fn embedder(&self) -> &dyn TextEmbedder {
        self.embedder.as_ref()
    }

    /// Return the top-`k` chunks for `query` that `role` may see, nearest
    /// first. Fails with [`DocChatError::StoreNotFound`] when the tenant has
    /// never been ingested; callers present that as "no documents yet", not
    /// a crash.
    #[inline]
    pub async fn retrieve(
        &self,
        tenant_id: &str,
        role: AccessRole,
        query: &str,
        k: usize,
    ) -> Result<Vec<SearchResult>> {
        let store = TenantStore::load(
            &self.vector_db_root,
            tenant_id,
            self.embedder.model_id(),
            self.embedder.dimension(),
        )
        .await?;

        let vectors = self.embedder.embed(&[query.to_string()])?;
        let query_vector = vectors
            .first()
            .ok_or_else(|| DocChatError::Embedding("embedder returned no vector".to_string()))?;

        let results = store.search(query_vector, k, role.access_filter()).await?;

        debug!(
            tenant = tenant_id,
            role = %role,
            k,
            hits = results.len(),
            "Retrieved chunks"
        );
        Ok(results)
    }
}
