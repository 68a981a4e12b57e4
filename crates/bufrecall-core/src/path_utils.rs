//! Identity and label helpers shared by the tracker and the line index

use crate::types::{DocumentHandle, Label};
use std::path::Path;

/// True for identities like `oil:///home/me` or `fugitive://...` that do not
/// name a plain file on disk.
pub fn is_scheme_identity(identity: &str) -> bool {
    match identity.find("://") {
        // a single letter before ':' is a windows drive, not a scheme
        Some(pos) if pos > 1 => identity[..pos]
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')),
        _ => false,
    }
}

/// Short human readable label for an identity: the last path segment for
/// local paths, the segment after the final `/` for scheme identities.
///
/// Never returns an empty label for a non-empty identity, a trailing separator
/// falls back to the full identity.
pub fn display_label(identity: &str) -> Label {
    let segment = if is_scheme_identity(identity) {
        identity.rsplit('/').next()
    } else {
        Path::new(identity).file_name().and_then(|name| name.to_str())
    };

    match segment {
        Some(segment) if !segment.is_empty() => Label::from(segment),
        _ => Label::from(identity),
    }
}

/// Placeholder label for documents without an identity.
pub fn unnamed_label(handle: DocumentHandle) -> String {
    format!("[Buffer {handle}]")
}

/// Whether a resource still exists behind an identity. Scheme identities are
/// owned by whatever plugin handles the scheme so they are assumed to exist.
pub fn identity_exists(identity: &str) -> bool {
    if identity.is_empty() {
        return false;
    }

    if is_scheme_identity(identity) {
        return true;
    }

    Path::new(identity).exists()
}

/// Check if a byte is a valid UTF-8 character boundary.
#[inline]
fn is_utf8_char_boundary(b: u8) -> bool {
    // Continuation bytes have the bit pattern 10xxxxxx.
    (b as i8) >= -0x40
}

/// Truncate `text` to at most `max_len` bytes, flooring to a char boundary.
pub fn truncate_for_display(text: &str, max_len: usize) -> &str {
    if text.len() <= max_len {
        return text;
    }

    let bytes = text.as_bytes();
    let mut end = max_len;
    while end > 0 && !is_utf8_char_boundary(bytes[end]) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_scheme_identities() {
        assert!(is_scheme_identity("oil:///home/user/project/"));
        assert!(is_scheme_identity("fugitive:///repo/.git//abc/src/main.rs"));
        assert!(!is_scheme_identity("/home/user/main.rs"));
        assert!(!is_scheme_identity("C://weird"));
        assert!(!is_scheme_identity("notes.md"));
    }

    #[test]
    #[cfg(not(target_family = "windows"))]
    fn label_is_last_path_segment() {
        assert_eq!(display_label("/home/user/src/main.rs").as_str(), "main.rs");
        assert_eq!(display_label("README.md").as_str(), "README.md");
    }

    #[test]
    fn label_for_scheme_identity_is_after_final_slash() {
        assert_eq!(display_label("term://~/code//1234:/bin/zsh").as_str(), "zsh");
        assert_eq!(
            display_label("fugitive:///repo/.git//0/src/lib.rs").as_str(),
            "lib.rs"
        );
    }

    #[test]
    fn label_never_empty() {
        assert_eq!(display_label("oil:///home/user/").as_str(), "oil:///home/user/");
        assert_eq!(display_label("/").as_str(), "/");
    }

    #[test]
    fn unnamed_documents_get_placeholder() {
        assert_eq!(unnamed_label(7), "[Buffer 7]");
    }

    #[test]
    fn scheme_identities_always_exist() {
        assert!(identity_exists("oil:///definitely/not/here"));
        assert!(!identity_exists("/definitely/not/here/bufrecall.txt"));
        assert!(!identity_exists(""));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_for_display("hello", 10), "hello");
        assert_eq!(truncate_for_display("hello", 3), "hel");
        // 'é' is two bytes, cutting inside it floors to the previous char
        assert_eq!(truncate_for_display("aé", 2), "a");
    }
}
