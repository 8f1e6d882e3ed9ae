//! Persisted identifier → spreadsheet URL map
//!
//! Lets a logger created without an explicit URL find the spreadsheet it
//! auto-created on a previous run.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

/// Identifier → URL entries, ordered for stable output.
pub type UrlMap = BTreeMap<String, String>;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Default location: `~/.config/gsheet_logger/config.json`
pub fn default_store_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("gsheet_logger")
        .join("config.json")
}

/// JSON file holding the [`UrlMap`].
#[derive(Debug, Clone)]
pub struct UrlStore {
    path: PathBuf,
}

impl Default for UrlStore {
    fn default() -> Self {
        Self::with_path(default_store_path())
    }
}

impl UrlStore {
    /// Create a store with a custom path (for testing)
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the map; a missing file is an empty map.
    pub fn load(&self) -> Result<UrlMap, StoreError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(UrlMap::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        serde_json::from_str(&text).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    /// Write the whole map, creating the parent directory if needed.
    pub fn save(&self, map: &UrlMap) -> Result<(), StoreError> {
        let io_err = |source: io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let text = serde_json::to_string_pretty(map).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })?;
        std::fs::write(&self.path, text).map_err(io_err)
    }

    pub fn get(&self, id: &str) -> Result<Option<String>, StoreError> {
        Ok(self.load()?.remove(id))
    }

    /// Load, set `id → url`, and save.
    pub fn insert(&self, id: &str, url: &str) -> Result<(), StoreError> {
        let mut map = self.load()?;
        map.insert(id.to_string(), url.to_string());
        self.save(&map)
    }
}
