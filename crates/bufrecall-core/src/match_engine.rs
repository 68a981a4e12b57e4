//! Query matching over a [`DocumentLineIndex`].
//!
//! Two modes that are never mixed:
//!
//! - `Fuzzy` hands ranking to neo_frizbee's Smith-Waterman scorer over the
//!   `[label:line] text` display string. Only lines that contain the query as
//!   a case-insensitive ordered subsequence are kept, best score first.
//! - `Exact` is a case-sensitive literal substring filter over the raw line
//!   text. It does not rank: accepted lines keep index build order.
//!
//! An empty query accepts every line in build order in both modes.

use crate::error::Error;
use crate::line_index::DocumentLineIndex;
use crate::types::{MatchRank, MatchResult};
use std::str::FromStr;
use tracing::Level;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    #[default]
    Fuzzy,
    Exact,
}

impl MatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMode::Fuzzy => "fuzzy",
            MatchMode::Exact => "exact",
        }
    }
}

impl FromStr for MatchMode {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "fuzzy" => Ok(MatchMode::Fuzzy),
            "exact" => Ok(MatchMode::Exact),
            other => Err(Error::UnknownMatchMode(other.to_string())),
        }
    }
}

/// Case-insensitive comparison of two chars, including multi-char lowercase
/// expansions.
#[inline]
pub(crate) fn chars_eq_ignore_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

/// Whether every char of `needle` appears in `haystack` in order, ignoring
/// case. Gaps between the chars are allowed.
pub fn is_ordered_subsequence(needle: &str, haystack: &str) -> bool {
    let mut haystack_chars = haystack.chars();
    needle
        .chars()
        .all(|n| haystack_chars.any(|h| chars_eq_ignore_case(n, h)))
}

/// Whether `text` contains `query` literally, case-sensitive.
#[inline]
pub fn exact_accepts(query: &str, text: &str) -> bool {
    memchr::memmem::find(text.as_bytes(), query.as_bytes()).is_some()
}

fn frizbee_config() -> neo_frizbee::Config {
    neo_frizbee::Config {
        // only ranks, acceptance is `is_ordered_subsequence`
        prefilter: false,
        max_typos: None,
        sort: false, // we order ourselves so ties keep build order
        scoring: neo_frizbee::Scoring::default(),
    }
}

/// Runs `query` against the index. `candidates` restricts matching to a
/// subset of entry indices, in ascending order; `None` means the whole index.
#[tracing::instrument(skip(index, candidates), level = Level::DEBUG)]
pub fn match_entries<'a>(
    index: &'a DocumentLineIndex,
    candidates: Option<&[usize]>,
    query: &str,
    mode: MatchMode,
) -> Vec<MatchResult<'a>> {
    let candidate_indices: Vec<usize> = match candidates {
        Some(subset) => subset
            .iter()
            .copied()
            .filter(|&i| i < index.len())
            .collect(),
        None => (0..index.len()).collect(),
    };

    if query.is_empty() {
        return candidate_indices
            .into_iter()
            .map(|i| accepted(index, i, MatchRank::Accepted))
            .collect();
    }

    let results = match mode {
        MatchMode::Exact => exact_match(index, &candidate_indices, query),
        MatchMode::Fuzzy => fuzzy_match(index, &candidate_indices, query),
    };

    tracing::debug!(
        candidates = candidate_indices.len(),
        matched = results.len(),
        "Matched query against line index"
    );
    results
}

#[inline]
fn accepted(index: &DocumentLineIndex, entry_index: usize, rank: MatchRank) -> MatchResult<'_> {
    MatchResult {
        entry_index,
        entry: &index.entries()[entry_index],
        rank,
        highlights: None,
    }
}

fn exact_match<'a>(
    index: &'a DocumentLineIndex,
    candidates: &[usize],
    query: &str,
) -> Vec<MatchResult<'a>> {
    let finder = memchr::memmem::Finder::new(query.as_bytes());
    let entries = index.entries();

    candidates
        .iter()
        .copied()
        .filter(|&i| finder.find(entries[i].text.as_bytes()).is_some())
        .map(|i| accepted(index, i, MatchRank::Accepted))
        .collect()
}

fn fuzzy_match<'a>(
    index: &'a DocumentLineIndex,
    candidates: &[usize],
    query: &str,
) -> Vec<MatchResult<'a>> {
    let entries = index.entries();
    let (accepted_indices, displays): (Vec<usize>, Vec<String>) = candidates
        .iter()
        .map(|&i| (i, entries[i].display()))
        .filter(|(_, display)| is_ordered_subsequence(query, display))
        .unzip();

    if accepted_indices.is_empty() {
        return Vec::new();
    }

    let haystacks: Vec<&str> = displays.iter().map(String::as_str).collect();
    let mut scores = vec![0u16; haystacks.len()];
    for m in neo_frizbee::match_list(query, &haystacks, &frizbee_config()) {
        if let Some(score) = scores.get_mut(m.index as usize) {
            *score = m.score;
        }
    }

    let mut results: Vec<MatchResult<'a>> = accepted_indices
        .iter()
        .zip(scores)
        .map(|(&i, score)| accepted(index, i, MatchRank::Scored(score)))
        .collect();

    glidesort::sort_by(&mut results, |a, b| {
        b.rank
            .score()
            .cmp(&a.rank.score())
            .then(a.entry_index.cmp(&b.entry_index))
    });

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Document;

    fn index_of(label: &str, raw: &[&str]) -> DocumentLineIndex {
        let lines = raw.iter().map(|l| l.to_string()).collect();
        DocumentLineIndex::build(&[Document::new(1, label, lines)])
    }

    fn texts<'a>(results: &[MatchResult<'a>]) -> Vec<&'a str> {
        results.iter().map(|r| r.entry.text.as_str()).collect()
    }

    #[test]
    fn parses_modes() {
        assert_eq!("fuzzy".parse::<MatchMode>().unwrap(), MatchMode::Fuzzy);
        assert_eq!("exact".parse::<MatchMode>().unwrap(), MatchMode::Exact);
        assert!(matches!(
            "regex".parse::<MatchMode>(),
            Err(Error::UnknownMatchMode(_))
        ));
    }

    #[test]
    fn exact_is_case_sensitive_substring() {
        let index = index_of("n", &["food", "Foo", "xfoox"]);
        let results = match_entries(&index, None, "foo", MatchMode::Exact);

        assert_eq!(texts(&results), vec!["food", "xfoox"]);
        assert!(results.iter().all(|r| r.rank == MatchRank::Accepted));
    }

    #[test]
    fn exact_keeps_build_order() {
        let index = index_of("n", &["zzz foo", "foo", "a foo b foo"]);
        let results = match_entries(&index, None, "foo", MatchMode::Exact);
        assert_eq!(texts(&results), vec!["zzz foo", "foo", "a foo b foo"]);
    }

    #[test]
    fn exact_does_not_match_label() {
        let index = index_of("/p/foo.rs", &["bar"]);
        assert!(match_entries(&index, None, "foo", MatchMode::Exact).is_empty());
    }

    #[test]
    fn empty_query_accepts_everything() {
        let index = index_of("n", &["one", "", "two"]);
        for mode in [MatchMode::Exact, MatchMode::Fuzzy] {
            let results = match_entries(&index, None, "", mode);
            assert_eq!(texts(&results), vec!["one", "two"]);
        }
    }

    #[test]
    fn ordered_subsequence_rule() {
        assert!(is_ordered_subsequence("ace", "abcde"));
        assert!(!is_ordered_subsequence("ace", "cab"));
        assert!(is_ordered_subsequence("ACE", "abcde"));
        assert!(is_ordered_subsequence("", "anything"));
    }

    #[test]
    fn fuzzy_accepts_subsequence_and_rejects_out_of_order() {
        let index = index_of("n", &["abcde", "cab"]);
        let results = match_entries(&index, None, "ace", MatchMode::Fuzzy);
        assert_eq!(texts(&results), vec!["abcde"]);
        assert!(results[0].rank.score().is_some());
    }

    #[test]
    fn fuzzy_is_case_insensitive() {
        let index = index_of("n", &["HandleRequest"]);
        let results = match_entries(&index, None, "handreq", MatchMode::Fuzzy);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn fuzzy_matches_against_label_and_line_number() {
        let index = index_of("/p/router.rs", &["fn x() {}"]);
        let results = match_entries(&index, None, "router", MatchMode::Fuzzy);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn fuzzy_keeps_contiguous_and_scattered_matches() {
        let index = index_of("n", &["s_o_r_t_e_d", "sorted"]);
        let results = match_entries(&index, None, "sorted", MatchMode::Fuzzy);
        assert_eq!(texts(&results), vec!["sorted", "s_o_r_t_e_d"]);
    }

    #[test]
    fn fuzzy_accepts_wide_gaps() {
        let gap = "_".repeat(30);
        let line = format!("a{gap}b{gap}c");
        let index = index_of("n", &[line.as_str(), "cba"]);
        let results = match_entries(&index, None, "abc", MatchMode::Fuzzy);
        assert_eq!(texts(&results), vec![line.as_str()]);
    }

    #[test]
    fn fuzzy_folds_unicode_case() {
        let index = index_of("n", &["ÉCOLE primaire", "collège"]);
        let results = match_entries(&index, None, "école", MatchMode::Fuzzy);
        assert_eq!(texts(&results), vec!["ÉCOLE primaire"]);
    }

    #[test]
    fn fuzzy_accepts_identical_text() {
        let index = index_of("n", &["config"]);
        let results = match_entries(&index, None, "config", MatchMode::Fuzzy);
        assert_eq!(texts(&results), vec!["config"]);
    }

    #[test]
    fn candidates_restrict_the_scan() {
        let index = index_of("n", &["foo one", "foo two", "foo three"]);
        let results = match_entries(&index, Some(&[0, 2, 99]), "foo", MatchMode::Exact);
        assert_eq!(texts(&results), vec!["foo one", "foo three"]);
    }
}
