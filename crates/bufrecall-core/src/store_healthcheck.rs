use crate::error::Result;
use std::path::Path;

/// Health information about a persisted store
#[derive(Debug, Clone)]
pub struct StoreHealth {
    /// Path to the store file
    pub path: String,
    pub exists: bool,
    /// Size on disk in bytes, 0 when the file does not exist
    pub disk_size: u64,
    /// Number of records that currently parse out of the file
    pub entry_count: u64,
}

pub trait StoreHealthChecker {
    fn store_path(&self) -> &Path;
    fn count_entries(&self) -> Result<u64>;

    fn get_health(&self) -> Result<StoreHealth> {
        let path = self.store_path();
        let metadata = std::fs::metadata(path).ok();

        Ok(StoreHealth {
            path: path.to_string_lossy().to_string(),
            exists: metadata.is_some(),
            disk_size: metadata.map(|m| m.len()).unwrap_or(0),
            entry_count: self.count_entries()?,
        })
    }
}
