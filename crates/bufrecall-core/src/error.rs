use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("Recall session not initialized")]
    SessionMissing,
    #[error("Search index not built, call open_search first")]
    SearchIndexMissing,
    #[error("Failed to acquire lock for recall session")]
    AcquireSessionLock,
    #[error("Failed to acquire lock for search index")]
    AcquireSearchLock,
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Unknown match mode {0:?}, expected \"fuzzy\" or \"exact\"")]
    UnknownMatchMode(String),

    #[error("Failed to create store directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to read recency store {path}: {source}")]
    StoreRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write recency store {path}: {source}")]
    StoreWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to encode recency entries: {0}")]
    StoreEncode(#[source] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
