use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SlidenoteConfig {
    pub database: Option<String>,
    /// Prepended to a tissue's logical path to find its image file
    pub fs_prefix: Option<String>,
    /// Appended to a tissue's logical path to find its image file
    pub fs_suffix: Option<String>,
    /// Folder holding the annotation JSON blobs
    pub annotation_folder: Option<String>,
    pub port: Option<u16>,
}

impl SlidenoteConfig {
    /// Config written by `slidenote init`
    pub fn starter() -> Self {
        Self {
            database: Some(default_database_path_in(Path::new(".")).display().to_string()),
            fs_prefix: Some(String::new()),
            fs_suffix: Some(String::new()),
            annotation_folder: Some("annotations/".to_string()),
            port: Some(DEFAULT_PORT),
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.database
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(|| default_database_path_in(Path::new(".")))
    }

    pub fn environment(&self) -> Environment {
        Environment {
            fs_prefix: self.fs_prefix.clone().unwrap_or_default(),
            fs_suffix: self.fs_suffix.clone().unwrap_or_default(),
            annotation_folder: self
                .annotation_folder
                .clone()
                .unwrap_or_else(|| "annotations/".to_string()),
        }
    }
}

/// Filesystem layout the annotation core builds paths from.
///
/// Paths are built by plain string concatenation, so a prefix or folder that
/// is meant to be a directory must carry its trailing separator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    pub fs_prefix: String,
    pub fs_suffix: String,
    pub annotation_folder: String,
}

impl Environment {
    pub fn new(
        fs_prefix: impl Into<String>,
        fs_suffix: impl Into<String>,
        annotation_folder: impl Into<String>,
    ) -> Self {
        Self {
            fs_prefix: fs_prefix.into(),
            fs_suffix: fs_suffix.into(),
            annotation_folder: annotation_folder.into(),
        }
    }

    /// `<fs_prefix><logical_path><fs_suffix>`
    pub fn tissue_abs_path(&self, logical_path: &str) -> String {
        format!("{}{}{}", self.fs_prefix, logical_path, self.fs_suffix)
    }

    /// `<annotation_folder><file_name>`
    pub fn annotation_abs_path(&self, file_name: &str) -> String {
        format!("{}{}", self.annotation_folder, file_name)
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("slidenote.toml")
}

pub fn default_database_path_in(base: &Path) -> PathBuf {
    base.join(".slidenote").join("slidenote.db")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<SlidenoteConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: SlidenoteConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &SlidenoteConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

pub fn ensure_annotation_folder(env: &Environment) -> anyhow::Result<()> {
    let folder = Path::new(&env.annotation_folder);
    if !folder.as_os_str().is_empty() && !folder.exists() {
        tracing::info!("Creating annotation folder {}", folder.display());
        std::fs::create_dir_all(folder)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_environment_paths() {
        let env = Environment::new("/slides/", ".tif", "/annot/");
        assert_eq!(env.tissue_abs_path("case1/scan001"), "/slides/case1/scan001.tif");
        assert_eq!(env.annotation_abs_path("scan001_1-roi.json"), "/annot/scan001_1-roi.json");
    }

    #[test]
    fn test_config_roundtrip_through_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("slidenote.toml");

        let config = SlidenoteConfig {
            fs_prefix: Some("/data/".to_string()),
            port: Some(9000),
            ..SlidenoteConfig::default()
        };
        write_config(&path, &config, false).unwrap();

        let loaded = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(loaded.fs_prefix.as_deref(), Some("/data/"));
        assert_eq!(loaded.port, Some(9000));
        assert_eq!(loaded.environment().fs_suffix, "");

        assert!(write_config(&path, &config, false).is_err());
        assert!(write_config(&path, &config, true).is_ok());
    }

    #[test]
    fn test_missing_config_is_none() {
        let dir = TempDir::new().unwrap();
        let loaded = load_config(Some(&dir.path().join("absent.toml"))).unwrap();
        assert!(loaded.is_none());
    }
}
