//! # Shallow Markup Tokenizer
//!
//! Splits model output such as `Ada <COND>kecelakaan</COND> di <PLOC>Jl. Sudirman</PLOC>`
//! into a flat sequence of text runs and entity segments.
//!
//! Only top-level text and `<NAME>text</NAME>` pairs are accepted. Anything
//! else is an error; malformed output is never repaired.

use crate::error::{LantasError, Result};

/// Kind of a top-level markup segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentKind {
    /// Untagged text run.
    Text,
    /// Entity span; the tag name is uppercased.
    Entity(String),
}

/// A top-level segment of tagged text with positional information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub kind: SegmentKind,
    /// Text content with character references decoded.
    pub text: String,
    /// Start position in the original string
    pub start: usize,
    /// End position in the original string
    pub end: usize,
}

impl Segment {
    /// Whitespace-separated tokens of this segment.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.text.split_whitespace()
    }
}

/// Character references decoded inside text; any other `&` stays literal.
const CHAR_REFS: &[(&str, char)] = &[
    ("&amp;", '&'),
    ("&lt;", '<'),
    ("&gt;", '>'),
    ("&quot;", '"'),
    ("&#39;", '\''),
];

struct OpenTag {
    name: String,
    start: usize,
    content_start: usize,
}

struct TagToken {
    name: String,
    closing: bool,
    end: usize,
}

/// Tokenizer for the restricted entity markup.
#[derive(Debug, Clone, Default)]
pub struct MarkupTokenizer;

impl MarkupTokenizer {
    /// Create a new tokenizer instance.
    pub fn new() -> Self {
        Self
    }

    /// Split tagged text into top-level segments in document order.
    ///
    /// Empty text runs between adjacent tags are not emitted.
    ///
    /// # Errors
    ///
    /// Returns a markup error for unclosed, stray, mismatched, nested or
    /// malformed tags.
    ///
    /// # Examples
    /// ```
    /// use lantas_core::markup::{MarkupTokenizer, SegmentKind};
    ///
    /// let segments = MarkupTokenizer::new()
    ///     .tokenize("<PLOC>Jalan Sudirman</PLOC> macet")
    ///     .unwrap();
    /// assert_eq!(segments.len(), 2);
    /// assert_eq!(segments[0].kind, SegmentKind::Entity("PLOC".into()));
    /// assert_eq!(segments[1].text, " macet");
    /// ```
    pub fn tokenize(&self, input: &str) -> Result<Vec<Segment>> {
        let bytes = input.as_bytes();
        let mut segments = Vec::new();
        let mut open: Option<OpenTag> = None;
        let mut text_start = 0;
        let mut pos = 0;

        while pos < bytes.len() {
            if bytes[pos] != b'<' || !starts_tag(bytes, pos) {
                pos += 1;
                continue;
            }

            let tag = read_tag(input, pos)?;
            match (open.take(), tag.closing) {
                (None, false) => {
                    if pos > text_start {
                        segments.push(text_segment(input, text_start, pos));
                    }
                    open = Some(OpenTag {
                        name: tag.name,
                        start: pos,
                        content_start: tag.end,
                    });
                }
                (None, true) => {
                    return Err(LantasError::UnexpectedClosingTag {
                        tag: tag.name,
                        offset: pos,
                    });
                }
                (Some(outer), false) => {
                    return Err(LantasError::NestedTag {
                        outer: outer.name,
                        inner: tag.name,
                        offset: pos,
                    });
                }
                (Some(entity), true) => {
                    if !entity.name.eq_ignore_ascii_case(&tag.name) {
                        return Err(LantasError::MismatchedClosingTag {
                            expected: entity.name,
                            found: tag.name,
                            offset: pos,
                        });
                    }
                    segments.push(Segment {
                        kind: SegmentKind::Entity(entity.name.to_uppercase()),
                        text: decode_char_refs(&input[entity.content_start..pos]),
                        start: entity.start,
                        end: tag.end,
                    });
                }
            }

            pos = tag.end;
            text_start = pos;
        }

        if let Some(entity) = open {
            return Err(LantasError::UnclosedTag {
                tag: entity.name,
                offset: entity.start,
            });
        }

        if text_start < bytes.len() {
            segments.push(text_segment(input, text_start, bytes.len()));
        }

        Ok(segments)
    }
}

/// A `<` opens a tag only when followed by a letter or `/`.
fn starts_tag(bytes: &[u8], pos: usize) -> bool {
    matches!(bytes.get(pos + 1), Some(b) if b.is_ascii_alphabetic() || *b == b'/')
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

/// Read `<NAME>` or `</NAME>` starting at `start`.
fn read_tag(input: &str, start: usize) -> Result<TagToken> {
    let bytes = input.as_bytes();
    let mut i = start + 1;

    let closing = bytes.get(i) == Some(&b'/');
    if closing {
        i += 1;
    }

    let name_start = i;
    while i < bytes.len() && is_name_byte(bytes[i]) {
        i += 1;
    }
    if i == name_start || !bytes[name_start].is_ascii_alphabetic() {
        return Err(LantasError::MalformedTag { offset: start });
    }
    let name = input[name_start..i].to_string();

    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    if bytes.get(i) != Some(&b'>') {
        return Err(LantasError::MalformedTag { offset: start });
    }

    Ok(TagToken {
        name,
        closing,
        end: i + 1,
    })
}

fn text_segment(input: &str, start: usize, end: usize) -> Segment {
    Segment {
        kind: SegmentKind::Text,
        text: decode_char_refs(&input[start..end]),
        start,
        end,
    }
}

fn decode_char_refs(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        match CHAR_REFS.iter().find(|(entity, _)| tail.starts_with(entity)) {
            Some((entity, ch)) => {
                out.push(*ch);
                rest = &tail[entity.len()..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
