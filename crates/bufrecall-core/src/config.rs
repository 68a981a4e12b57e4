use crate::error::{Error, Result};
use std::path::PathBuf;

pub const DEFAULT_MAX_ENTRIES: usize = 100;
pub const DEFAULT_CACHE_FILE_NAME: &str = "recent_documents.json";
/// Maximum bytes of a line handed back to the host for display. Prevents
/// minified files from blowing up the result tables.
pub const DEFAULT_MAX_LINE_DISPLAY_LEN: usize = 512;

const MIN_LINE_DISPLAY_LEN: usize = 16;
const APP_DIR_NAME: &str = "bufrecall";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecallConfig {
    /// Capacity of the recency list, the tail is evicted past this.
    pub max_entries: usize,
    /// Directory holding the persisted cache. `None` resolves to the platform
    /// data directory.
    pub data_dir: Option<PathBuf>,
    pub cache_file_name: String,
    pub max_line_display_len: usize,
}

impl Default for RecallConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            data_dir: None,
            cache_file_name: DEFAULT_CACHE_FILE_NAME.to_string(),
            max_line_display_len: DEFAULT_MAX_LINE_DISPLAY_LEN,
        }
    }
}

impl RecallConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_entries == 0 {
            return Err(Error::InvalidConfig(
                "max_entries must be at least 1".to_string(),
            ));
        }

        if self.cache_file_name.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "cache_file_name is required".to_string(),
            ));
        }

        if self.max_line_display_len < MIN_LINE_DISPLAY_LEN {
            return Err(Error::InvalidConfig(format!(
                "max_line_display_len must be at least {MIN_LINE_DISPLAY_LEN}"
            )));
        }

        Ok(())
    }

    pub fn resolved_data_dir(&self) -> PathBuf {
        match &self.data_dir {
            Some(dir) => dir.clone(),
            None => dirs::data_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(APP_DIR_NAME),
        }
    }

    /// Full path of the persisted cache file.
    pub fn store_path(&self) -> PathBuf {
        self.resolved_data_dir().join(&self.cache_file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = RecallConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_entries, 100);
    }

    #[test]
    fn rejects_zero_capacity() {
        let config = RecallConfig {
            max_entries: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn rejects_blank_file_name() {
        let config = RecallConfig {
            cache_file_name: "  ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn store_path_uses_explicit_data_dir() {
        let config = RecallConfig {
            data_dir: Some(PathBuf::from("/tmp/nvim-data")),
            ..Default::default()
        };
        assert_eq!(
            config.store_path(),
            PathBuf::from("/tmp/nvim-data/recent_documents.json")
        );
    }

    #[test]
    fn store_path_falls_back_to_app_dir() {
        let path = RecallConfig::default().store_path();
        assert!(path.ends_with("bufrecall/recent_documents.json"));
    }
}
