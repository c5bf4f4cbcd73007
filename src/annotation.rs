//! Annotation store - paired metadata rows and JSON blobs
//!
//! Operations:
//! - List the annotations of a tissue
//! - Load an annotation document
//! - Save a document (blob write, then row insert)
//! - Remove an annotation (blob delete, then row delete)
//!
//! The metadata row is the source of truth. A save whose row insert fails
//! deletes the blob it just wrote, or puts the previous content back when
//! an existing row already points at that blob.

use serde::Serialize;
use serde_json::Value;
use crate::blob::BlobGateway;
use crate::config::Environment;
use crate::filename::{annotation_file_name, is_valid_display_name};
use crate::storage::{AnnotationSummary, MetadataGateway};
use crate::tissue::TissueResolver;
use crate::{Error, Result};

/// Listing returned by `getList`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationList {
    pub tissue_path: String,
    pub annotations: Vec<AnnotationSummary>,
}

/// Outcome of a successful save
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedAnnotation {
    pub id: i64,
    pub tissue_id: i64,
    pub file_name: String,
    pub abs_path: String,
}

/// Document returned when there is nothing to load (JSON `null`)
pub fn empty_document() -> Value {
    Value::Null
}

/// Annotation persistence over a metadata gateway and a blob gateway
pub struct AnnotationStore<M, B> {
    metadata: M,
    blobs: B,
    env: Environment,
}

impl<M: MetadataGateway, B: BlobGateway> AnnotationStore<M, B> {
    pub fn new(metadata: M, blobs: B, env: Environment) -> Self {
        Self { metadata, blobs, env }
    }

    pub fn metadata(&self) -> &M {
        &self.metadata
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn tissue_resolver(&self) -> TissueResolver<'_, M, B> {
        TissueResolver::new(&self.metadata, &self.blobs, &self.env)
    }

    /// Annotations saved against a tissue.
    ///
    /// The tissue's image must exist on disk; registration in the metadata
    /// store is not required (an unregistered tissue simply has none).
    pub fn get_list(&self, tissue_path: &str) -> Result<AnnotationList> {
        tracing::debug!("getList for {}", tissue_path);

        let tissue_abs_path = self.env.tissue_abs_path(tissue_path);
        if !self.blobs.exists(&tissue_abs_path) {
            return Err(Error::TissueNotFound(tissue_path.to_string()));
        }

        Ok(AnnotationList {
            tissue_path: tissue_path.to_string(),
            annotations: self.metadata.get_list(tissue_path)?,
        })
    }

    /// Stored document for an annotation, or `null` when the row is missing
    /// or its blob cannot be read.
    pub fn load(&self, annotation_id: i64) -> Result<Value> {
        tracing::debug!("load annotation {}", annotation_id);

        let Some(path) = self.metadata.load(annotation_id)? else {
            tracing::debug!("No annotation row with id {}", annotation_id);
            return Ok(empty_document());
        };

        let bytes = match self.blobs.read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Annotation {} blob {} unreadable: {}", annotation_id, path, e);
                return Ok(empty_document());
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(document) => Ok(document),
            Err(e) => {
                tracing::warn!("Annotation {} blob {} is not valid JSON: {}", annotation_id, path, e);
                Ok(empty_document())
            }
        }
    }

    /// Save `json_text` as annotation `display_name` of a tissue.
    ///
    /// Re-saving the same name on the same tissue overwrites the blob and
    /// keeps the existing annotation id.
    pub fn save(&self, tissue_path: &str, display_name: &str, json_text: &str) -> Result<SavedAnnotation> {
        tracing::debug!("save {} on {}", display_name, tissue_path);

        let document: Value =
            serde_json::from_str(json_text).map_err(|e| Error::InvalidJson(e.to_string()))?;

        if !is_valid_display_name(display_name) {
            return Err(Error::MalformedCommand(format!(
                "annotation name {:?} must be a single path component",
                display_name
            )));
        }

        let tissue = self.tissue_resolver().resolve(tissue_path)?;

        let file_name = annotation_file_name(tissue_path, tissue.id, display_name);
        let abs_path = self.env.annotation_abs_path(&file_name);
        let previous = self.metadata.find_annotation_by_path(&abs_path)?;
        let previous_content = match previous {
            Some(_) => self.blobs.read(&abs_path).ok(),
            None => None,
        };

        let content = serde_json::to_vec_pretty(&document)?;
        self.blobs.write(&abs_path, &content)?;

        let row_name = format!("{}.json", display_name);
        let id = match self.metadata.insert_annotation(&row_name, &abs_path, tissue.id) {
            Ok(id) => id,
            Err(e) => {
                if previous.is_none() {
                    match self.blobs.delete(&abs_path) {
                        Ok(()) => tracing::warn!("Removed orphan blob {} after failed insert", abs_path),
                        Err(cleanup) => tracing::error!(
                            "Orphan blob {} left behind after failed insert: {}",
                            abs_path,
                            cleanup
                        ),
                    }
                } else if let Some(old) = previous_content {
                    match self.blobs.write(&abs_path, &old) {
                        Ok(()) => tracing::warn!("Restored blob {} after failed insert", abs_path),
                        Err(restore) => tracing::error!(
                            "Blob {} holds unsaved content after failed insert: {}",
                            abs_path,
                            restore
                        ),
                    }
                } else {
                    tracing::error!("Blob {} rewritten but its row could not be updated", abs_path);
                }
                return Err(e);
            }
        };

        tracing::info!(
            registered_tissue = tissue.registered,
            "Saved annotation {} ({}) for tissue {}",
            id,
            file_name,
            tissue.id
        );
        Ok(SavedAnnotation {
            id,
            tissue_id: tissue.id,
            file_name,
            abs_path,
        })
    }

    /// Delete an annotation's blob and then its row
    pub fn remove(&self, annotation_id: i64) -> Result<()> {
        tracing::debug!("remove annotation {}", annotation_id);

        let path = self
            .metadata
            .get_annotation_abs_path(annotation_id)?
            .ok_or(Error::AnnotationNotFound(annotation_id))?;

        self.blobs
            .delete(&path)
            .map_err(|source| Error::DeletionFailed { path: path.clone(), source })?;

        if let Err(e) = self.metadata.delete_annotation(annotation_id) {
            tracing::error!("Blob {} deleted but row {} remains: {}", path, annotation_id, e);
            return Err(e);
        }

        tracing::info!("Removed annotation {} ({})", annotation_id, path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::FsBlobStore;
    use crate::storage::{AnnotationRow, SqliteStore, TissueRow};
    use serde_json::json;
    use std::cell::Cell;
    use std::path::Path;
    use tempfile::TempDir;

    fn environment(dir: &TempDir) -> Environment {
        Environment::new(
            format!("{}/slides/", dir.path().display()),
            "",
            format!("{}/annotations/", dir.path().display()),
        )
    }

    fn add_slide(dir: &TempDir, name: &str) {
        let slides = dir.path().join("slides");
        std::fs::create_dir_all(&slides).unwrap();
        std::fs::write(slides.join(name), b"image").unwrap();
    }

    fn setup() -> (AnnotationStore<SqliteStore, FsBlobStore>, TempDir) {
        let dir = TempDir::new().unwrap();
        let env = environment(&dir);
        let store = AnnotationStore::new(SqliteStore::open_in_memory().unwrap(), FsBlobStore::new(), env);
        (store, dir)
    }

    #[test]
    fn test_save_then_load_roundtrip() {
        let (store, dir) = setup();
        add_slide(&dir, "scan001");

        let doc = json!({"shapes": [{"type": "polygon", "points": [[1, 2], [3, 4]]}], "label": "tumor"});
        let saved = store.save("scan001", "roi1", &doc.to_string()).unwrap();

        assert_eq!(saved.file_name, format!("scan001_{}-roi1.json", saved.tissue_id));
        assert!(Path::new(&saved.abs_path).exists());
        assert_eq!(store.load(saved.id).unwrap(), doc);
    }

    #[test]
    fn test_save_rejects_bad_json_before_touching_stores() {
        let (store, dir) = setup();
        add_slide(&dir, "scan001");

        let err = store.save("scan001", "roi1", "{not json").unwrap_err();
        assert!(matches!(err, Error::InvalidJson(_)));
        assert_eq!(store.metadata().count_tissues().unwrap(), 0);
    }

    #[test]
    fn test_save_rejects_path_like_names() {
        let (store, dir) = setup();
        add_slide(&dir, "scan001");

        let err = store.save("scan001", "../../etc/passwd", "{}").unwrap_err();
        assert!(matches!(err, Error::MalformedCommand(_)));
    }

    #[test]
    fn test_save_unknown_tissue() {
        let (store, _dir) = setup();
        let err = store.save("ghost", "roi1", "{}").unwrap_err();
        assert!(matches!(err, Error::TissueNotFound(_)));
        assert_eq!(store.metadata().count_annotations().unwrap(), 0);
    }

    #[test]
    fn test_resave_same_name_replaces_content() {
        let (store, dir) = setup();
        add_slide(&dir, "scan001");

        let first = store.save("scan001", "roi1", r#"{"v":1}"#).unwrap();
        let second = store.save("scan001", "roi1", r#"{"v":2}"#).unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(store.load(first.id).unwrap(), json!({"v": 2}));
        assert_eq!(store.get_list("scan001").unwrap().annotations.len(), 1);
    }

    #[test]
    fn test_get_list_only_own_tissue() {
        let (store, dir) = setup();
        add_slide(&dir, "a");
        add_slide(&dir, "b");

        let one = store.save("a", "one", "{}").unwrap();
        store.save("b", "other", "{}").unwrap();
        let two = store.save("a", "two", "[]").unwrap();

        let list = store.get_list("a").unwrap();
        assert_eq!(list.tissue_path, "a");
        assert_eq!(
            list.annotations,
            vec![
                AnnotationSummary { id: one.id, name: "one.json".to_string() },
                AnnotationSummary { id: two.id, name: "two.json".to_string() },
            ]
        );
    }

    #[test]
    fn test_get_list_requires_image_not_registration() {
        let (store, dir) = setup();
        assert!(matches!(store.get_list("scan001"), Err(Error::TissueNotFound(_))));

        add_slide(&dir, "scan001");
        let list = store.get_list("scan001").unwrap();
        assert!(list.annotations.is_empty());
        assert_eq!(
            serde_json::to_value(&list).unwrap(),
            json!({"tissuePath": "scan001", "annotations": []})
        );
    }

    #[test]
    fn test_load_missing_row_or_blob_is_null() {
        let (store, dir) = setup();
        add_slide(&dir, "scan001");
        assert_eq!(store.load(12345).unwrap(), Value::Null);

        let saved = store.save("scan001", "roi1", r#"{"x":1}"#).unwrap();
        std::fs::remove_file(&saved.abs_path).unwrap();
        assert_eq!(store.load(saved.id).unwrap(), Value::Null);
    }

    #[test]
    fn test_load_corrupted_blob_is_null() {
        let (store, dir) = setup();
        add_slide(&dir, "scan001");

        let saved = store.save("scan001", "roi1", r#"{"x":1}"#).unwrap();
        std::fs::write(&saved.abs_path, b"{\"x\": tru").unwrap();
        assert_eq!(store.load(saved.id).unwrap(), Value::Null);
    }

    #[test]
    fn test_remove_deletes_blob_and_row() {
        let (store, dir) = setup();
        add_slide(&dir, "scan001");

        let saved = store.save("scan001", "roi1", r#"{"x":1}"#).unwrap();
        store.remove(saved.id).unwrap();

        assert!(!Path::new(&saved.abs_path).exists());
        assert_eq!(store.load(saved.id).unwrap(), Value::Null);
        assert!(matches!(store.remove(saved.id), Err(Error::AnnotationNotFound(id)) if id == saved.id));
    }

    #[test]
    fn test_remove_keeps_row_when_blob_delete_fails() {
        let (store, dir) = setup();
        add_slide(&dir, "scan001");

        let saved = store.save("scan001", "roi1", "{}").unwrap();
        std::fs::remove_file(&saved.abs_path).unwrap();

        let err = store.remove(saved.id).unwrap_err();
        assert!(matches!(err, Error::DeletionFailed { .. }));
        assert!(store.metadata().get_annotation(saved.id).unwrap().is_some());
    }

    /// Delegates to SQLite, failing inserts or deletes on demand
    struct FlakyMetadata {
        inner: SqliteStore,
        fail_inserts: Cell<bool>,
        fail_deletes: Cell<bool>,
    }

    impl FlakyMetadata {
        fn new() -> Self {
            Self {
                inner: SqliteStore::open_in_memory().unwrap(),
                fail_inserts: Cell::new(false),
                fail_deletes: Cell::new(false),
            }
        }
    }

    fn unavailable() -> Error {
        Error::Io(std::io::Error::other("metadata store unavailable"))
    }

    impl MetadataGateway for FlakyMetadata {
        fn get_list(&self, tissue_path: &str) -> Result<Vec<AnnotationSummary>> {
            self.inner.get_list(tissue_path)
        }
        fn load(&self, annotation_id: i64) -> Result<Option<String>> {
            self.inner.load(annotation_id)
        }
        fn get_tissue_id_and_abs_path(&self, tissue_path: &str) -> Result<Option<TissueRow>> {
            self.inner.get_tissue_id_and_abs_path(tissue_path)
        }
        fn insert_tissue(&self, tissue_path: &str, abs_path: &str) -> Result<i64> {
            self.inner.insert_tissue(tissue_path, abs_path)
        }
        fn insert_annotation(&self, name: &str, abs_path: &str, tissue_id: i64) -> Result<i64> {
            if self.fail_inserts.get() {
                return Err(unavailable());
            }
            self.inner.insert_annotation(name, abs_path, tissue_id)
        }
        fn get_annotation_abs_path(&self, annotation_id: i64) -> Result<Option<String>> {
            self.inner.get_annotation_abs_path(annotation_id)
        }
        fn find_annotation_by_path(&self, abs_path: &str) -> Result<Option<AnnotationRow>> {
            self.inner.find_annotation_by_path(abs_path)
        }
        fn delete_annotation(&self, annotation_id: i64) -> Result<bool> {
            if self.fail_deletes.get() {
                return Err(unavailable());
            }
            self.inner.delete_annotation(annotation_id)
        }
    }

    fn flaky_setup() -> (AnnotationStore<FlakyMetadata, FsBlobStore>, TempDir) {
        let dir = TempDir::new().unwrap();
        add_slide(&dir, "scan001");
        let store = AnnotationStore::new(FlakyMetadata::new(), FsBlobStore::new(), environment(&dir));
        (store, dir)
    }

    #[test]
    fn test_failed_insert_removes_orphan_blob() {
        let (store, _dir) = flaky_setup();
        store.metadata().fail_inserts.set(true);

        assert!(store.save("scan001", "roi1", "{}").is_err());

        let tissue = store.metadata().get_tissue_id_and_abs_path("scan001").unwrap().unwrap();
        let blob = store
            .environment()
            .annotation_abs_path(&annotation_file_name("scan001", tissue.id, "roi1"));
        assert!(!Path::new(&blob).exists());
    }

    #[test]
    fn test_failed_resave_restores_previous_content() {
        let (store, _dir) = flaky_setup();
        let saved = store.save("scan001", "roi1", r#"{"v":1}"#).unwrap();

        store.metadata().fail_inserts.set(true);
        assert!(store.save("scan001", "roi1", r#"{"v":2}"#).is_err());

        assert!(store.metadata().inner.get_annotation(saved.id).unwrap().is_some());
        assert_eq!(store.load(saved.id).unwrap(), json!({"v": 1}));
    }

    #[test]
    fn test_failed_row_delete_after_blob_delete() {
        let (store, _dir) = flaky_setup();
        let saved = store.save("scan001", "roi1", r#"{"x":1}"#).unwrap();

        store.metadata().fail_deletes.set(true);
        let err = store.remove(saved.id).unwrap_err();
        assert!(matches!(err, Error::Io(_)));

        assert!(!Path::new(&saved.abs_path).exists());
        let listed: Vec<i64> = store.get_list("scan001").unwrap().annotations.iter().map(|a| a.id).collect();
        assert_eq!(listed, vec![saved.id]);
        assert_eq!(store.load(saved.id).unwrap(), Value::Null);
    }
}
