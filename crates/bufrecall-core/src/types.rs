use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use smartstring::{LazyCompact, SmartString};
use std::sync::Arc;

/// Host-assigned handle of an open document (a buffer number in Neovim).
pub type DocumentHandle = i64;

pub type Label = SmartString<LazyCompact>;

/// A document currently loaded by the host, as handed to the index builder.
#[derive(Debug, Clone)]
pub struct Document {
    pub handle: DocumentHandle,
    pub identity: String,
    pub lines: Vec<String>,
}

impl Document {
    pub fn new(handle: DocumentHandle, identity: impl Into<String>, lines: Vec<String>) -> Self {
        Self {
            handle,
            identity: identity.into(),
            lines,
        }
    }
}

/// One element of the recency list. Only `identity`, `display_label` and
/// `last_used` are persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecencyEntry {
    pub identity: String,
    pub display_label: Label,
    /// Unix timestamp, whole seconds.
    pub last_used: i64,
    #[serde(skip)]
    pub live_handle: Option<DocumentHandle>,
}

/// A recency entry annotated with host-side state at listing time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentListing {
    pub entry: RecencyEntry,
    pub is_live: bool,
    /// Only probed when the entry is not live.
    pub exists: Option<bool>,
}

/// A single searchable non-blank line. Rebuilt on every index build.
#[derive(Debug, Clone)]
pub struct SearchLineEntry {
    pub document_identity: Arc<str>,
    pub display_label: Arc<str>,
    pub handle: DocumentHandle,
    /// 1-based line number in the source document.
    pub line_number: u32,
    pub text: String,
}

impl SearchLineEntry {
    /// The string the fuzzy ranker scores: `[label:line] text`.
    pub fn display(&self) -> String {
        format!("[{}:{}] {}", self.display_label, self.line_number, self.text)
    }
}

/// Half-open range `[start, end)` in character units of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightSpan {
    pub start: usize,
    pub end: usize,
}

impl HighlightSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Highlights for the focused line: a whole-line base layer plus the query
/// spans drawn on top of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineHighlights {
    pub line: HighlightSpan,
    pub matches: SmallVec<[HighlightSpan; 4]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRank {
    /// Exact mode (and empty queries): binary acceptance, no ordering key.
    Accepted,
    /// Fuzzy mode: score reported by the ranker, higher is better.
    Scored(u16),
}

impl MatchRank {
    pub fn score(&self) -> Option<u16> {
        match self {
            MatchRank::Accepted => None,
            MatchRank::Scored(score) => Some(*score),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MatchResult<'a> {
    /// Position of `entry` in the index it was matched against.
    pub entry_index: usize,
    pub entry: &'a SearchLineEntry,
    pub rank: MatchRank,
    pub highlights: Option<LineHighlights>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PaginationArgs {
    pub offset: usize,
    /// 0 means no limit.
    pub limit: usize,
}
