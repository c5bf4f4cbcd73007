//! Storage Layer - SQLite-backed annotation metadata
//!
//! System of record is SQLite with tables:
//! - tissues(id, logical_path, abs_path)
//! - annotations(id, name, abs_path, tissue_id)
//!
//! Blob contents live on the filesystem, see [`crate::blob`].

pub mod schema;
pub mod sqlite;

pub use sqlite::{AnnotationRow, AnnotationSummary, DbStats, SqliteStore, TissueRow};

use crate::Result;

/// Named, parameterized metadata operations the annotation core relies on.
///
/// Reads are non-transactional. Every write commits on its own; no
/// transaction spans more than one call.
pub trait MetadataGateway {
    /// Annotations attached to the tissue with this logical path, in id order
    fn get_list(&self, tissue_path: &str) -> Result<Vec<AnnotationSummary>>;

    /// Blob path of the annotation to load
    fn load(&self, annotation_id: i64) -> Result<Option<String>>;

    fn get_tissue_id_and_abs_path(&self, tissue_path: &str) -> Result<Option<TissueRow>>;

    /// Register a tissue unless one with the same logical path exists.
    /// Returns the id of whichever row holds the logical path afterwards.
    fn insert_tissue(&self, tissue_path: &str, abs_path: &str) -> Result<i64>;

    /// Insert an annotation row, or re-point the row that already owns `abs_path`
    fn insert_annotation(&self, name: &str, abs_path: &str, tissue_id: i64) -> Result<i64>;

    fn get_annotation_abs_path(&self, annotation_id: i64) -> Result<Option<String>>;

    fn find_annotation_by_path(&self, abs_path: &str) -> Result<Option<AnnotationRow>>;

    /// Returns false when no row had this id
    fn delete_annotation(&self, annotation_id: i64) -> Result<bool>;
}
