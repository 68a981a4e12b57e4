//! bufrecall-core - recently used documents and buffer line search
//!
//! This crate keeps a bounded, deduplicated most-recently-used list of
//! document identities that survives restarts through a JSON cache, and a
//! line search engine over the documents an editor has loaded, with fuzzy
//! (ranked subsequence) and exact (literal substring) matching plus highlight
//! spans for the focused result.
//!
//! It holds no global state. Editor integrations own a [`RecallSession`] and a
//! [`LineSearch`] and drive their lifecycle explicitly.

pub mod config;
mod error;
pub mod highlight;
pub mod line_index;
pub mod match_engine;
pub mod path_utils;
pub mod recency;
pub mod recency_store;
pub mod search_results;
pub mod session;
mod store_healthcheck;
pub mod types;

// Re-export main types for convenience
pub use config::RecallConfig;
pub use error::{Error, Result};
pub use highlight::{clip_byte_ranges, compute_spans, line_highlights, spans_to_byte_ranges};
pub use line_index::DocumentLineIndex;
pub use match_engine::{MatchMode, match_entries};
pub use recency::RecencyTracker;
pub use recency_store::RecencyStore;
pub use search_results::{LineSearch, SearchOutcome};
pub use session::{FsProbe, HostProbe, LoadedDocument, RecallSession, SessionHealth};
pub use store_healthcheck::{StoreHealth, StoreHealthChecker};
pub use types::{
    Document, DocumentHandle, HighlightSpan, LineHighlights, MatchRank, MatchResult,
    PaginationArgs, RecencyEntry, RecentListing, SearchLineEntry,
};
