//! Reference extraction from raw markdown lines.
//!
//! This is a small delimiter scanner rather than a markdown parser: every
//! occurrence of `](`, `src="` or `href="` on a line is one candidate
//! reference, and malformed candidates are reported instead of dropped.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Delimiter of markdown `[text](target)` references.
pub const MARKDOWN_DELIMITER: &str = "](";

/// Delimiters of HTML attribute references, in scan order.
pub const HTML_DELIMITERS: [&str; 2] = ["src=\"", "href=\""];

/// Targets produced by the local site build, not content references.
pub const BUILD_OUTPUT_PREFIX: &str = "./dist";

/// What kind of embedded content a reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    Link,
    Image,
    Iframe,
    Source,
    Script,
    /// Produced only for syntax errors
    Unknown,
}

impl ReferenceKind {
    /// Map an HTML tag name to the kind of reference it embeds.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "a" => Some(ReferenceKind::Link),
            "iframe" => Some(ReferenceKind::Iframe),
            "img" => Some(ReferenceKind::Image),
            "source" => Some(ReferenceKind::Source),
            "script" => Some(ReferenceKind::Script),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceKind::Link => "link",
            ReferenceKind::Image => "image",
            ReferenceKind::Iframe => "iframe",
            ReferenceKind::Source => "source",
            ReferenceKind::Script => "script",
            ReferenceKind::Unknown => "unknown",
        }
    }
}

/// A reference found on a line, before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReference {
    pub text: String,
    pub target: String,
    pub kind: ReferenceKind,
    /// Raw markdown span, or the whole line for HTML references
    pub full: String,
}

/// Outcome of examining one delimiter occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Reference(RawReference),
    /// The delimiter could not be tied to an opening bracket or tag
    SyntaxError,
}

/// HTML reference inside a tag that is not a known embedding tag.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unsupported HTML tag <{tag}>")]
pub struct UnknownTag {
    pub tag: String,
}

/// Positions of every occurrence of `delimiter`, each search resuming one
/// byte after the previous match.
fn occurrences(line: &str, delimiter: &str) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut from = 0;
    while from <= line.len() {
        match line[from..].find(delimiter) {
            Some(offset) => {
                let position = from + offset;
                positions.push(position);
                from = position + 1;
            }
            None => break,
        }
    }
    positions
}

/// Nearest `[` before `end` that is not closed by a `]` in between.
fn unmatched_open_bracket(bytes: &[u8], end: usize) -> Option<usize> {
    let mut depth = 0usize;
    for index in (0..end).rev() {
        match bytes[index] {
            b']' => depth += 1,
            b'[' if depth == 0 => return Some(index),
            b'[' => depth -= 1,
            _ => {}
        }
    }
    None
}

/// Closing `)` for the `(` at `open`.
///
/// Parenthesized asides inside the target extend the search past their own
/// `)`; when the parentheses never balance, the first `)` closes the target.
fn closing_paren(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (index, byte) in bytes.iter().enumerate().skip(open) {
        match byte {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
    }
    bytes[open + 1..]
        .iter()
        .position(|&b| b == b')')
        .map(|offset| open + 1 + offset)
}

/// Extract `[text](target)` and `![text](target)` references from a line.
pub fn extract_markdown(line: &str) -> Vec<Extraction> {
    let bytes = line.as_bytes();
    occurrences(line, MARKDOWN_DELIMITER)
        .into_iter()
        .map(|delimiter| {
            let Some(open_bracket) = unmatched_open_bracket(bytes, delimiter) else {
                return Extraction::SyntaxError;
            };
            let open_paren = delimiter + 1;
            let Some(close_paren) = closing_paren(bytes, open_paren) else {
                return Extraction::SyntaxError;
            };
            let is_image = open_bracket > 0 && bytes[open_bracket - 1] == b'!';
            let start = if is_image { open_bracket - 1 } else { open_bracket };
            Extraction::Reference(RawReference {
                text: line[open_bracket + 1..delimiter].to_string(),
                target: line[open_paren + 1..close_paren].to_string(),
                kind: if is_image {
                    ReferenceKind::Image
                } else {
                    ReferenceKind::Link
                },
                full: line[start..=close_paren].to_string(),
            })
        })
        .collect()
}

/// Extract references from HTML attributes introduced by `delimiter`
/// (`src="` or `href="`).
pub fn extract_html(line: &str, delimiter: &str) -> Result<Vec<Extraction>, UnknownTag> {
    let mut extractions = Vec::new();
    for position in occurrences(line, delimiter) {
        let value_start = position + delimiter.len();
        let Some(tag_open) = line[..value_start].rfind('<') else {
            extractions.push(Extraction::SyntaxError);
            continue;
        };
        let tag_start = tag_open + 1;
        let Some(tag_len) = line[tag_start..].find(' ') else {
            extractions.push(Extraction::SyntaxError);
            continue;
        };
        let tag = &line[tag_start..tag_start + tag_len];
        let kind = ReferenceKind::from_tag(tag).ok_or_else(|| UnknownTag {
            tag: tag.to_string(),
        })?;
        let Some(value_len) = line[value_start..].find('"') else {
            extractions.push(Extraction::SyntaxError);
            continue;
        };
        let target = &line[value_start..value_start + value_len];
        if target.starts_with(BUILD_OUTPUT_PREFIX) {
            continue;
        }
        extractions.push(Extraction::Reference(RawReference {
            text: String::new(),
            target: target.to_string(),
            kind,
            full: line.to_string(),
        }));
    }
    Ok(extractions)
}

/// All references on a line: markdown syntax first, then `src="`, then
/// `href="` attributes.
pub fn extract_line(line: &str) -> Result<Vec<Extraction>, UnknownTag> {
    let mut extractions = extract_markdown(line);
    for delimiter in HTML_DELIMITERS {
        extractions.extend(extract_html(line, delimiter)?);
    }
    Ok(extractions)
}
