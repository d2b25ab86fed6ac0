//! Discovery of Markdown image references.
//!
//! Each `![alt](target)` token is matched on its own: the alt text cannot
//! contain `]` or a newline, and the target runs to the closing `)` on the
//! same line, allowing one level of balanced parentheses inside it
//! (`Foo_(bar).jpg`). Two images on one line therefore stay two references.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::ops::Range;

static IMAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[[^\]\n]*\]\(((?:[^()\n]|\([^()\n]*\))*)\)").expect("valid image regex"));

/// One image token occurrence in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageTarget {
    /// Reference text as written, without title or angle brackets.
    pub reference: String,
    /// Byte range of `reference` inside the document.
    pub span: Range<usize>,
}

/// Every image token in document order, duplicates included.
pub fn image_targets(text: &str) -> Vec<ImageTarget> {
    IMAGE_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let group = caps.get(1)?;
            let (offset, len) = locate_reference(group.as_str())?;
            let start = group.start() + offset;
            Some(ImageTarget {
                reference: text[start..start + len].to_string(),
                span: start..start + len,
            })
        })
        .collect()
}

/// Deduplicated references in first-seen order.
pub fn find_image_refs(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    image_targets(text)
        .into_iter()
        .filter(|t| seen.insert(t.reference.clone()))
        .map(|t| t.reference)
        .collect()
}

/// Finds the reference inside the parenthesised part of a token and returns
/// its offset and length. Handles `<target>` and a trailing `"title"`.
fn locate_reference(inner: &str) -> Option<(usize, usize)> {
    let lead = inner.len() - inner.trim_start().len();
    let rest = &inner[lead..];

    if let Some(stripped) = rest.strip_prefix('<') {
        let end = stripped.find('>')?;
        return (end > 0).then_some((lead + 1, end));
    }

    let len = rest.find(char::is_whitespace).unwrap_or(rest.len());
    (len > 0).then_some((lead, len))
}
