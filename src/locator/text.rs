//! Plain-text locator
//!
//! Used when the caller has no structural hint. Tries a verbatim match
//! first, then a whitespace-tolerant one, since browsers collapse runs of
//! whitespace that the source file may still contain.

use regex::{NoExpand, Regex};

/// Which strategy produced a replacement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextMatch {
    Exact,
    WhitespaceNormalized,
}

/// Replace `original` with `replacement` in `content`.
///
/// Returns `None` when neither strategy matches. Both strategies replace
/// every occurrence.
pub fn locate(content: &str, original: &str, replacement: &str) -> Option<(String, TextMatch)> {
    if original.is_empty() {
        return None;
    }

    if content.contains(original) {
        return Some((content.replace(original, replacement), TextMatch::Exact));
    }

    let pattern = whitespace_tolerant_pattern(original)?;
    if !pattern.is_match(content) {
        return None;
    }

    let replaced = pattern.replace_all(content, NoExpand(replacement));
    Some((replaced.into_owned(), TextMatch::WhitespaceNormalized))
}

/// Build a regex matching the whitespace-separated tokens of `text` in
/// order, separated by any run of whitespace. `None` for fewer than two
/// tokens, where it would add nothing over a literal search.
pub fn whitespace_tolerant_pattern(text: &str) -> Option<Regex> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() < 2 {
        return None;
    }

    Regex::new(&tokens_pattern(&tokens)).ok()
}

/// Escaped tokens joined by `\s+`
pub(crate) fn tokens_pattern(tokens: &[&str]) -> String {
    tokens
        .iter()
        .map(|token| regex::escape(token))
        .collect::<Vec<_>>()
        .join(r"\s+")
}
