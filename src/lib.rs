//! # Slidenote - Annotation persistence for tissue slide servers
//!
//! Lets clients list, load, save and remove named annotation documents
//! attached to a tissue image. Two stores are kept in step:
//! - SQLite metadata (tissues and annotation rows)
//! - JSON blob files under an annotation folder
//!
//! Commands arrive as `"<verb>/<payload>"` strings and are routed by
//! [`command::Router`].

pub mod annotation;
pub mod blob;
pub mod command;
pub mod config;
pub mod filename;
pub mod response;
pub mod server;
pub mod storage;
pub mod tissue;
pub mod ui;

// Re-exports for convenient access
pub use annotation::{AnnotationStore, SavedAnnotation};
pub use blob::{BlobGateway, FsBlobStore};
pub use command::{Command, Router};
pub use config::{Environment, SlidenoteConfig};
pub use response::{CapturedEmitter, RequestContext, ResponseEmitter, StreamEmitter};
pub use storage::{MetadataGateway, SqliteStore};
pub use tissue::{ResolvedTissue, TissueResolver};

/// Result type alias for Slidenote operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Slidenote operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Malformed command: {0}")]
    MalformedCommand(String),

    #[error("Conversion of id {0} failed")]
    InvalidId(String),

    #[error("Error while parsing json: {0}")]
    InvalidJson(String),

    #[error("{0} does not exist")]
    TissueNotFound(String),

    #[error("Wrong annotation id: {0}")]
    AnnotationNotFound(i64),

    #[error("Error while deleting annotation {path}: {source}")]
    DeletionFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Stable machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Error::MalformedCommand(_) => "malformed_command",
            Error::InvalidId(_) => "invalid_id",
            Error::InvalidJson(_) => "invalid_json",
            Error::TissueNotFound(_) => "tissue_not_found",
            Error::AnnotationNotFound(_) => "annotation_not_found",
            Error::DeletionFailed { .. } => "deletion_failed",
            Error::Storage(_) => "storage",
            Error::Io(_) => "io",
            Error::Serialization(_) => "serialization",
        }
    }

    /// Whether the caller sent something unusable (as opposed to a backend failure)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::MalformedCommand(_) | Error::InvalidId(_) | Error::InvalidJson(_)
        )
    }

    /// Whether the error reports a missing tissue or annotation
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::TissueNotFound(_) | Error::AnnotationNotFound(_))
    }
}
