use crate::error::{Error, Result};
use crate::store_healthcheck::StoreHealthChecker;
use crate::types::RecencyEntry;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// JSON file holding the persisted recency list.
///
/// The file is a single array of `{identity, display_label, last_used}`
/// objects in most-recent-first order. Live handles are never written.
#[derive(Debug, Clone)]
pub struct RecencyStore {
    path: PathBuf,
}

impl StoreHealthChecker for RecencyStore {
    fn store_path(&self) -> &Path {
        &self.path
    }

    fn count_entries(&self) -> Result<u64> {
        Ok(self.load()?.len() as u64)
    }
}

impl RecencyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrites the store with `records`. Nothing is retried on failure.
    pub fn save(&self, records: &[RecencyEntry]) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| Error::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let encoded = serde_json::to_string_pretty(records).map_err(Error::StoreEncode)?;
        fs::write(&self.path, encoded).map_err(|source| Error::StoreWrite {
            path: self.path.clone(),
            source,
        })?;

        tracing::debug!(path = %self.path.display(), count = records.len(), "Saved recency store");
        Ok(())
    }

    /// Reads the persisted list. A missing file is an empty history and so is
    /// a file that fails to parse; in the latter case the content is discarded
    /// as a whole, individual records are never salvaged.
    pub fn load(&self) -> Result<Vec<RecencyEntry>> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No recency store yet");
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(Error::StoreRead {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        // invalid utf8 surfaces as a parse error here, same as broken json
        match serde_json::from_slice::<Vec<RecencyEntry>>(&raw) {
            Ok(records) => Ok(records),
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %err,
                    "Discarding malformed recency store"
                );
                Ok(Vec::new())
            }
        }
    }
}
