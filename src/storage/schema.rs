//! Database schema definitions

/// SQL to create the tissues table
///
/// `logical_path` is the business key; the unique constraint is what makes
/// lazy registration an insert-if-absent.
pub const CREATE_TISSUES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS tissues (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    logical_path TEXT NOT NULL UNIQUE,
    abs_path TEXT NOT NULL
)
"#;

/// SQL to create the annotations table
pub const CREATE_ANNOTATIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS annotations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    abs_path TEXT NOT NULL UNIQUE,
    tissue_id INTEGER NOT NULL REFERENCES tissues(id)
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_annotations_tissue ON annotations(tissue_id)",
];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![CREATE_TISSUES_TABLE, CREATE_ANNOTATIONS_TABLE];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
