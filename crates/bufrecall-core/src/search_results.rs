use crate::highlight::line_highlights;
use crate::line_index::DocumentLineIndex;
use crate::match_engine::{MatchMode, match_entries};
use crate::types::{Document, LineHighlights, MatchResult, PaginationArgs};

/// Accepted set of the previous keystroke, used to narrow the next one.
///
/// Extending a query can only shrink the accepted set in both modes (a line
/// containing `foob` contains `foo`, a subsequence match of `foob` is one of
/// `foo`), so when the new query starts with the previous one only the lines
/// accepted last time are rescanned.
#[derive(Debug, Clone, Default)]
pub struct SearchResultsState {
    pub query: String,
    pub mode: MatchMode,
    pub matched_entries: Vec<usize>,
    valid: bool,
}

impl SearchResultsState {
    pub fn candidates(&self, query: &str, mode: MatchMode) -> Option<Vec<usize>> {
        if self.valid && self.mode == mode && query.starts_with(self.query.as_str()) {
            let mut narrowed = self.matched_entries.clone();
            narrowed.sort_unstable();
            Some(narrowed)
        } else {
            None
        }
    }

    fn capture(&mut self, query: &str, mode: MatchMode, results: &[MatchResult<'_>]) {
        self.query.clear();
        self.query.push_str(query);
        self.mode = mode;
        self.matched_entries.clear();
        self.matched_entries
            .extend(results.iter().map(|r| r.entry_index));
        self.valid = true;
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchOutcome<'a> {
    pub items: Vec<MatchResult<'a>>,
    pub total_matched: usize,
    pub total_lines: usize,
}

impl SearchOutcome<'_> {
    /// Computes highlights for the item at `position` in this page, the one
    /// the picker currently previews.
    pub fn focus(&mut self, position: usize, query: &str, mode: MatchMode) -> Option<&LineHighlights> {
        self.items
            .get_mut(position)
            .map(|item| item.highlights(query, mode))
    }
}

/// One picker invocation: the index is built once when the picker opens and
/// every keystroke re-runs matching against it.
#[derive(Debug, Default)]
pub struct LineSearch {
    index: DocumentLineIndex,
    last_results: SearchResultsState,
}

impl LineSearch {
    pub fn open(documents: &[Document]) -> Self {
        Self {
            index: DocumentLineIndex::build(documents),
            last_results: SearchResultsState::default(),
        }
    }

    pub fn index(&self) -> &DocumentLineIndex {
        &self.index
    }

    pub fn search(
        &mut self,
        query: &str,
        mode: MatchMode,
        pagination: PaginationArgs,
    ) -> SearchOutcome<'_> {
        let candidates = self.last_results.candidates(query, mode);
        let results = match_entries(&self.index, candidates.as_deref(), query, mode);
        self.last_results.capture(query, mode, &results);

        paginate(results, self.index.len(), pagination)
    }

    /// Highlights for the entry at `entry_index` in the index.
    pub fn highlight(
        &self,
        entry_index: usize,
        query: &str,
        mode: MatchMode,
    ) -> Option<LineHighlights> {
        self.index
            .get(entry_index)
            .map(|entry| line_highlights(&entry.text, query, mode))
    }
}

pub fn paginate(
    results: Vec<MatchResult<'_>>,
    total_lines: usize,
    pagination: PaginationArgs,
) -> SearchOutcome<'_> {
    let total_matched = results.len();
    let limit = if pagination.limit == 0 {
        usize::MAX
    } else {
        pagination.limit
    };

    let items = results
        .into_iter()
        .skip(pagination.offset)
        .take(limit)
        .collect();

    SearchOutcome {
        items,
        total_matched,
        total_lines,
    }
}
