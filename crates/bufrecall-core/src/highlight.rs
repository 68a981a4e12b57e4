//! Highlight spans for the focused search result.
//!
//! Spans are half-open ranges in character units. The host renderer works in
//! bytes, so [`spans_to_byte_ranges`] converts them at the boundary.
//!
//! Fuzzy highlighting is a greedy left-to-right scan that takes the first
//! occurrence of every query character after the previous one. It never
//! backtracks, so it can mark a different subsequence than the one the fuzzy
//! ranker scored.

use crate::match_engine::{MatchMode, chars_eq_ignore_case};
use crate::types::{HighlightSpan, LineHighlights, MatchResult};
use smallvec::SmallVec;

pub type Spans = SmallVec<[HighlightSpan; 4]>;

/// Query spans for `text`. Empty queries produce no spans.
pub fn compute_spans(text: &str, query: &str, mode: MatchMode) -> Spans {
    if query.is_empty() {
        return Spans::new();
    }

    match mode {
        MatchMode::Exact => exact_spans(text, query),
        MatchMode::Fuzzy => greedy_fuzzy_spans(text, query),
    }
}

/// Whole-line base layer plus the query spans on top.
pub fn line_highlights(text: &str, query: &str, mode: MatchMode) -> LineHighlights {
    LineHighlights {
        line: HighlightSpan::new(0, text.chars().count()),
        matches: compute_spans(text, query, mode),
    }
}

fn exact_spans(text: &str, query: &str) -> Spans {
    let Some(byte_start) = memchr::memmem::find(text.as_bytes(), query.as_bytes()) else {
        return Spans::new();
    };

    let start = text[..byte_start].chars().count();
    let mut spans = Spans::new();
    spans.push(HighlightSpan::new(start, start + query.chars().count()));
    spans
}

fn greedy_fuzzy_spans(text: &str, query: &str) -> Spans {
    let mut spans = Spans::new();
    let mut text_chars = text.chars().enumerate();

    for needle in query.chars() {
        let found = text_chars
            .by_ref()
            .find(|&(_, c)| chars_eq_ignore_case(needle, c));

        match found {
            Some((position, _)) => spans.push(HighlightSpan::new(position, position + 1)),
            // partial highlighting is fine, stop at the first miss
            None => break,
        }
    }

    spans
}

impl MatchResult<'_> {
    /// Lazily computes and caches the highlights of this result.
    pub fn highlights(&mut self, query: &str, mode: MatchMode) -> &LineHighlights {
        let entry = self.entry;
        self.highlights
            .get_or_insert_with(|| line_highlights(&entry.text, query, mode))
    }
}

/// Convert character spans into byte ranges `(start, end)` within `text`.
/// Adjacent ranges are merged, out of bounds spans are dropped.
pub fn spans_to_byte_ranges(text: &str, spans: &[HighlightSpan]) -> SmallVec<[(u32, u32); 4]> {
    if spans.is_empty() {
        return SmallVec::new();
    }

    // byte offset of every char start plus the end of the string
    let mut boundaries: Vec<usize> = text.char_indices().map(|(byte, _)| byte).collect();
    boundaries.push(text.len());

    let mut result: SmallVec<[(u32, u32); 4]> = SmallVec::with_capacity(spans.len());
    for span in spans {
        if span.is_empty() || span.end >= boundaries.len() {
            continue;
        }

        let start = boundaries[span.start] as u32;
        let end = boundaries[span.end] as u32;
        if let Some(last) = result.last_mut()
            && last.1 == start
        {
            last.1 = end;
            continue;
        }
        result.push((start, end));
    }

    result
}

/// Byte ranges restricted to the first `visible_len` bytes of the line, for
/// hosts that draw onto a truncated copy. Ranges starting past the cut are
/// dropped, ranges crossing it are shortened.
pub fn clip_byte_ranges(ranges: &[(u32, u32)], visible_len: usize) -> SmallVec<[(u32, u32); 4]> {
    let visible_len = u32::try_from(visible_len).unwrap_or(u32::MAX);
    ranges
        .iter()
        .filter(|&&(start, _)| start < visible_len)
        .map(|&(start, end)| (start, end.min(visible_len)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positions(spans: &Spans) -> Vec<(usize, usize)> {
        spans.iter().map(|s| (s.start, s.end)).collect()
    }

    #[test]
    fn fuzzy_greedy_single_char_spans() {
        let spans = compute_spans("xaxbx", "ab", MatchMode::Fuzzy);
        assert_eq!(positions(&spans), vec![(1, 2), (3, 4)]);
    }

    #[test]
    fn fuzzy_does_not_backtrack() {
        // a globally tighter pick would be (3, 4) for "ab"; greedy keeps the first a
        let spans = compute_spans("a__ab", "ab", MatchMode::Fuzzy);
        assert_eq!(positions(&spans), vec![(0, 1), (4, 5)]);
    }

    #[test]
    fn fuzzy_is_case_insensitive() {
        let spans = compute_spans("FooBar", "fb", MatchMode::Fuzzy);
        assert_eq!(positions(&spans), vec![(0, 1), (3, 4)]);
    }

    #[test]
    fn fuzzy_stops_at_first_missing_char() {
        let spans = compute_spans("abc", "azc", MatchMode::Fuzzy);
        assert_eq!(positions(&spans), vec![(0, 1)]);
    }

    #[test]
    fn exact_marks_first_occurrence() {
        let spans = compute_spans("a foo b foo", "foo", MatchMode::Exact);
        assert_eq!(positions(&spans), vec![(2, 5)]);
    }

    #[test]
    fn exact_without_occurrence_is_tolerated() {
        assert!(compute_spans("Foo", "foo", MatchMode::Exact).is_empty());
    }

    #[test]
    fn exact_spans_are_in_chars() {
        let spans = compute_spans("héllo wörld", "wö", MatchMode::Exact);
        assert_eq!(positions(&spans), vec![(6, 8)]);
    }

    #[test]
    fn empty_query_has_only_line_layer() {
        let highlights = line_highlights("abc", "", MatchMode::Exact);
        assert_eq!(highlights.line, HighlightSpan::new(0, 3));
        assert!(highlights.matches.is_empty());
    }

    #[test]
    fn line_layer_always_covers_whole_line() {
        let highlights = line_highlights("naïve", "zz", MatchMode::Fuzzy);
        assert_eq!(highlights.line, HighlightSpan::new(0, 5));
        assert!(highlights.matches.is_empty());
    }

    #[test]
    fn byte_ranges_merge_adjacent_chars() {
        let text = "héllo";
        let spans = [
            HighlightSpan::new(0, 1),
            HighlightSpan::new(1, 2),
            HighlightSpan::new(4, 5),
        ];
        let ranges = spans_to_byte_ranges(text, &spans);
        assert_eq!(ranges.as_slice(), &[(0, 3), (5, 6)]);
    }

    #[test]
    fn byte_ranges_drop_out_of_bounds() {
        let ranges = spans_to_byte_ranges("ab", &[HighlightSpan::new(1, 9)]);
        assert!(ranges.is_empty());
    }

    #[test]
    fn byte_ranges_are_clipped_to_visible_text() {
        let ranges = [(0, 2), (4, 9), (12, 14)];
        assert_eq!(clip_byte_ranges(&ranges, 6).as_slice(), &[(0, 2), (4, 6)]);
        assert_eq!(clip_byte_ranges(&ranges, 100).as_slice(), &ranges);
        assert!(clip_byte_ranges(&ranges, 0).is_empty());
    }
}
