use thiserror::Error;

pub type Result<T> = std::result::Result<T, DocChatError>;

#[derive(Error, Debug)]
pub enum DocChatError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Failed to parse document '{filename}': {reason}")]
    DocumentParse { filename: String, reason: String },

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Embedding dimension mismatch: store has {expected}, records have {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error(
        "Embedding model mismatch: store was built with '{expected}', configured model is '{actual}'"
    )]
    ModelMismatch { expected: String, actual: String },

    #[error("No vector store exists for tenant '{0}'")]
    StoreNotFound(String),

    #[error("Ingestion quota exceeded: {submitted} files submitted, package allows {limit}")]
    QuotaExceeded { submitted: usize, limit: usize },

    #[error("No valid documents found for ingestion")]
    EmptyIngestion,

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod chunking;
pub mod commands;
pub mod config;
pub mod documents;
pub mod embeddings;
pub mod generation;
pub mod ingest;
pub mod retrieval;
pub mod service;
pub mod session;
pub mod store;
