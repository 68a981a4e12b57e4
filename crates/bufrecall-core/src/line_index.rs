//! Flat line index over the documents the host has loaded.
//!
//! The index is rebuilt from scratch every time a picker opens. Blank lines
//! are skipped but every kept line remembers its original 1-based position so
//! the host can jump straight to it.

use crate::path_utils::{display_label, unnamed_label};
use crate::types::{Document, SearchLineEntry};
use std::sync::Arc;
use tracing::Level;

#[derive(Debug, Clone, Default)]
pub struct DocumentLineIndex {
    entries: Vec<SearchLineEntry>,
    document_count: usize,
}

impl DocumentLineIndex {
    #[tracing::instrument(skip_all, level = Level::DEBUG, fields(documents = documents.len()))]
    pub fn build(documents: &[Document]) -> Self {
        let total_lines: usize = documents.iter().map(|d| d.lines.len()).sum();
        let mut entries = Vec::with_capacity(total_lines);

        for document in documents {
            let (identity, label): (Arc<str>, Arc<str>) = if document.identity.is_empty() {
                (Arc::from(""), Arc::from(unnamed_label(document.handle)))
            } else {
                (
                    Arc::from(document.identity.as_str()),
                    Arc::from(display_label(&document.identity).as_str()),
                )
            };

            for (index, line) in document.lines.iter().enumerate() {
                if !line.chars().any(|c| !c.is_whitespace()) {
                    continue;
                }

                entries.push(SearchLineEntry {
                    document_identity: Arc::clone(&identity),
                    display_label: Arc::clone(&label),
                    handle: document.handle,
                    line_number: (index + 1) as u32,
                    text: line.clone(),
                });
            }
        }

        tracing::debug!(
            total_lines,
            indexed_lines = entries.len(),
            "Built document line index"
        );

        Self {
            entries,
            document_count: documents.len(),
        }
    }

    pub fn entries(&self) -> &[SearchLineEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&SearchLineEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn document_count(&self) -> usize {
        self.document_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn blank_lines_are_dropped_but_numbers_preserved() {
        let docs = vec![Document::new(1, "/p/a.txt", lines(&["", "  ", "foo", "bar"]))];
        let index = DocumentLineIndex::build(&docs);

        let got: Vec<(u32, &str)> = index
            .entries()
            .iter()
            .map(|e| (e.line_number, e.text.as_str()))
            .collect();
        assert_eq!(got, vec![(3, "foo"), (4, "bar")]);
    }

    #[test]
    fn tabs_and_unicode_spaces_count_as_blank() {
        let docs = vec![Document::new(1, "/p/a.txt", lines(&["\t", "\u{3000}", " x "]))];
        let index = DocumentLineIndex::build(&docs);
        assert_eq!(index.len(), 1);
        assert_eq!(index.entries()[0].line_number, 3);
        assert_eq!(index.entries()[0].text, " x ");
    }

    #[test]
    fn unnamed_documents_use_placeholder_label() {
        let docs = vec![Document::new(5, "", lines(&["scratch"]))];
        let index = DocumentLineIndex::build(&docs);

        let entry = &index.entries()[0];
        assert_eq!(&*entry.display_label, "[Buffer 5]");
        assert_eq!(&*entry.document_identity, "");
        assert_eq!(entry.handle, 5);
    }

    #[test]
    fn documents_keep_build_order() {
        let docs = vec![
            Document::new(2, "/p/b.rs", lines(&["fn b() {}"])),
            Document::new(1, "/p/a.rs", lines(&["fn a() {}", "", "fn c() {}"])),
        ];
        let index = DocumentLineIndex::build(&docs);

        let got: Vec<(&str, u32)> = index
            .entries()
            .iter()
            .map(|e| (&*e.display_label, e.line_number))
            .collect();
        assert_eq!(got, vec![("b.rs", 1), ("a.rs", 1), ("a.rs", 3)]);
        assert_eq!(index.document_count(), 2);
    }

    #[test]
    fn display_string_includes_label_and_line() {
        let docs = vec![Document::new(1, "/p/main.rs", lines(&["", "let x = 1;"]))];
        let index = DocumentLineIndex::build(&docs);
        assert_eq!(index.entries()[0].display(), "[main.rs:2] let x = 1;");
    }
}
