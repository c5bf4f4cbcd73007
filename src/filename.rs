//! Filename helpers for logical tissue paths

use std::path::Path;

/// Base name of a logical path: no directory, no extension.
///
/// `"case1/scan001.svs"` -> `"scan001"`. Falls back to the whole input
/// when it has no usable file component.
pub fn base_name(logical_path: &str) -> String {
    Path::new(logical_path)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| logical_path.to_string())
}

/// Blob file name for an annotation: `<tissueBase>_<tissueId>-<name>.json`
pub fn annotation_file_name(tissue_logical_path: &str, tissue_id: i64, display_name: &str) -> String {
    format!("{}_{}-{}.json", base_name(tissue_logical_path), tissue_id, display_name)
}

/// A display name is usable only as a single path component
pub fn is_valid_display_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}
