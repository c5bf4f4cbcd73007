//! SQLite storage implementation

use std::path::Path;
use rusqlite::{Connection, params, OptionalExtension};
use serde::Serialize;
use crate::Result;
use super::{schema, MetadataGateway};

/// SQLite-backed storage for tissue and annotation metadata
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        for stmt in schema::all_schema_statements() {
            self.conn.execute(stmt, [])?;
        }
        Ok(())
    }

    // ========== Tissue Operations ==========

    /// Count registered tissues
    pub fn count_tissues(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row("SELECT COUNT(*) FROM tissues", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Helper to convert a row to a TissueRow
    fn row_to_tissue(row: &rusqlite::Row) -> rusqlite::Result<TissueRow> {
        Ok(TissueRow {
            id: row.get("id")?,
            logical_path: row.get("logical_path")?,
            abs_path: row.get("abs_path")?,
        })
    }

    // ========== Annotation Operations ==========

    /// Count annotation rows
    pub fn count_annotations(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row("SELECT COUNT(*) FROM annotations", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Get a full annotation row by id
    pub fn get_annotation(&self, annotation_id: i64) -> Result<Option<AnnotationRow>> {
        self.conn
            .query_row(
                "SELECT id, name, abs_path, tissue_id FROM annotations WHERE id = ?1",
                [annotation_id],
                Self::row_to_annotation,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Helper to convert a row to an AnnotationRow
    fn row_to_annotation(row: &rusqlite::Row) -> rusqlite::Result<AnnotationRow> {
        Ok(AnnotationRow {
            id: row.get("id")?,
            name: row.get("name")?,
            abs_path: row.get("abs_path")?,
            tissue_id: row.get("tissue_id")?,
        })
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        Ok(DbStats {
            tissues: self.count_tissues()?,
            annotations: self.count_annotations()?,
        })
    }
}

impl MetadataGateway for SqliteStore {
    fn get_list(&self, tissue_path: &str) -> Result<Vec<AnnotationSummary>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT a.id, a.name
            FROM annotations a
            JOIN tissues t ON a.tissue_id = t.id
            WHERE t.logical_path = ?1
            ORDER BY a.id
            "#,
        )?;

        let annotations = stmt
            .query_map([tissue_path], |row| {
                Ok(AnnotationSummary {
                    id: row.get("id")?,
                    name: row.get("name")?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(annotations)
    }

    fn load(&self, annotation_id: i64) -> Result<Option<String>> {
        self.get_annotation_abs_path(annotation_id)
    }

    fn get_tissue_id_and_abs_path(&self, tissue_path: &str) -> Result<Option<TissueRow>> {
        self.conn
            .query_row(
                "SELECT id, logical_path, abs_path FROM tissues WHERE logical_path = ?1",
                [tissue_path],
                Self::row_to_tissue,
            )
            .optional()
            .map_err(Into::into)
    }

    fn insert_tissue(&self, tissue_path: &str, abs_path: &str) -> Result<i64> {
        let tx = self.conn.unchecked_transaction()?;
        let inserted = tx.execute(
            r#"
            INSERT INTO tissues (logical_path, abs_path)
            VALUES (?1, ?2)
            ON CONFLICT(logical_path) DO NOTHING
            "#,
            params![tissue_path, abs_path],
        )?;
        let id: i64 = tx.query_row(
            "SELECT id FROM tissues WHERE logical_path = ?1",
            [tissue_path],
            |row| row.get(0),
        )?;
        tx.commit()?;

        if inserted == 0 {
            tracing::debug!("Tissue {} was registered concurrently as id {}", tissue_path, id);
        }
        Ok(id)
    }

    fn insert_annotation(&self, name: &str, abs_path: &str, tissue_id: i64) -> Result<i64> {
        let tx = self.conn.unchecked_transaction()?;
        let id: i64 = tx.query_row(
            r#"
            INSERT INTO annotations (name, abs_path, tissue_id)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(abs_path) DO UPDATE SET name = excluded.name, tissue_id = excluded.tissue_id
            RETURNING id
            "#,
            params![name, abs_path, tissue_id],
            |row| row.get(0),
        )?;
        tx.commit()?;
        Ok(id)
    }

    fn get_annotation_abs_path(&self, annotation_id: i64) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT abs_path FROM annotations WHERE id = ?1",
                [annotation_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    fn find_annotation_by_path(&self, abs_path: &str) -> Result<Option<AnnotationRow>> {
        self.conn
            .query_row(
                "SELECT id, name, abs_path, tissue_id FROM annotations WHERE abs_path = ?1",
                [abs_path],
                Self::row_to_annotation,
            )
            .optional()
            .map_err(Into::into)
    }

    fn delete_annotation(&self, annotation_id: i64) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;
        let deleted = tx.execute("DELETE FROM annotations WHERE id = ?1", [annotation_id])?;
        tx.commit()?;
        Ok(deleted > 0)
    }
}

/// A registered tissue image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TissueRow {
    pub id: i64,
    pub logical_path: String,
    pub abs_path: String,
}

/// A stored annotation's metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationRow {
    pub id: i64,
    /// Display name with the `.json` extension
    pub name: String,
    pub abs_path: String,
    pub tissue_id: i64,
}

/// One entry of a tissue's annotation listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotationSummary {
    pub id: i64,
    pub name: String,
}

/// Database statistics
#[derive(Debug, Clone, Serialize)]
pub struct DbStats {
    pub tissues: usize,
    pub annotations: usize,
}

impl std::fmt::Display for DbStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        writeln!(f, "  Tissues: {}", self.tissues)?;
        writeln!(f, "  Annotations: {}", self.annotations)
    }
}
