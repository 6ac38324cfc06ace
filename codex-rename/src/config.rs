use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::extension::{CODEX_EXTENSION_ID, FsExtensionCatalog, default_extension_roots};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Settings persisted at `~/.codex-rename/config.json`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenameConfig {
    /// Published id of the extension to patch.
    pub extension_id: String,
    /// Extra extension roots, scanned before the editor defaults.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extension_roots: Vec<PathBuf>,
    /// Also scan `~/.vscode/extensions` and the other editor defaults.
    pub include_default_roots: bool,
}

impl Default for RenameConfig {
    fn default() -> Self {
        Self {
            extension_id: CODEX_EXTENSION_ID.to_string(),
            extension_roots: Vec::new(),
            include_default_roots: true,
        }
    }
}

impl RenameConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".codex-rename").join("config.json"))
    }

    /// Load from `~/.codex-rename/config.json`; defaults when absent.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load from `path`. A missing file yields defaults; a malformed one is an error.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        let data = serde_json::to_string_pretty(self).map_err(std::io::Error::other).map_err(write_err)?;
        std::fs::write(path, data).map_err(write_err)
    }

    /// Roots to scan, configured ones first.
    pub fn extension_roots(&self) -> Vec<PathBuf> {
        let mut roots = self.extension_roots.clone();
        if self.include_default_roots {
            roots.extend(default_extension_roots());
        }
        roots
    }

    pub fn catalog(&self) -> FsExtensionCatalog {
        FsExtensionCatalog::new(self.extension_roots())
    }
}
