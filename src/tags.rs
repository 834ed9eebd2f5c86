//! Discovery of tags in a document's text.
//!
//! A tag opens with a run of two or more `<` and closes with a run of `>`
//! of exactly the same length. Quoted strings inside a tag are skipped, so
//! `<<f(">>")>>` is a single tag.
//!
//! | Delimiter | Kind                                        |
//! |-----------|---------------------------------------------|
//! | `<<...>>`   | ordinary, replaced by its formatted value |
//! | `<<<...>>>` | special, evaluated first, output dropped  |
use crate::document::{Block, Document};
use std::fmt;
use thiserror::Error;

/// Delimiter width of ordinary tags.
pub const ORDINARY: usize = 2;
/// Delimiter width of special tags.
pub const SPECIAL: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagError {
    #[error("Tag delimiters do not match: {0}")]
    Delimiter(String),
}

/// A tag as found in the document, split into program and format spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    raw: String,
    width: usize,
    program: String,
    format_spec: Option<String>,
}

impl Tag {
    /// Splits tag text, delimiters included, into its parts.
    ///
    /// ```
    /// use docweave::Tag;
    ///
    /// let tag = Tag::parse("<<Invoice.B9 * 2:curr>>").unwrap();
    /// assert_eq!(tag.program(), "Invoice.B9 * 2");
    /// assert_eq!(tag.format_spec(), Some("curr"));
    ///
    /// let tag = Tag::parse("<<\"a:b\">>").unwrap();
    /// assert_eq!(tag.format_spec(), None);
    /// ```
    pub fn parse(raw: &str) -> Result<Tag, TagError> {
        let chars: Vec<char> = raw.chars().collect();
        let width = chars.iter().take_while(|c| **c == '<').count();
        let closing = chars.iter().rev().take_while(|c| **c == '>').count();
        if width < 2 || closing != width || chars.len() < width * 2 {
            return Err(TagError::Delimiter(raw.to_string()));
        }

        let body: String = chars[width..chars.len() - width].iter().collect();
        let (program, format_spec) = split_format_spec(&body);
        Ok(Tag {
            raw: raw.to_string(),
            width,
            program,
            format_spec,
        })
    }

    /// Full tag text including delimiters.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_special(&self) -> bool {
        self.width == SPECIAL
    }

    /// Program text without the format spec.
    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn format_spec(&self) -> Option<&str> {
        self.format_spec.as_deref()
    }

    /// Everything between the delimiters, format spec included.
    pub fn body(&self) -> &str {
        let start = self.width;
        let end = self.raw.len() - self.width;
        // Delimiters are ASCII, so byte offsets equal char counts here
        self.raw.get(start..end).unwrap_or("")
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// The spec follows the last colon, unless a quote comes at or after it
/// (then the colon belongs to a string).
fn split_format_spec(body: &str) -> (String, Option<String>) {
    let Some(colon) = body.rfind(':') else {
        return (body.to_string(), None);
    };
    let last_quote = body.rfind(['"', '\'']);
    if last_quote.is_some_and(|q| q >= colon) {
        return (body.to_string(), None);
    }
    (
        body[..colon].to_string(),
        Some(body[colon + 1..].trim().to_string()),
    )
}

#[derive(Debug, Clone, Copy)]
enum ScanState {
    Waiting,
    Building { start: usize, width: usize },
    Stringing { start: usize, width: usize, quote: char },
}

fn run_length(chars: &[char], from: usize, ch: char) -> usize {
    chars[from..].iter().take_while(|c| **c == ch).count()
}

/// Scans `text` for tags of any width, in order of appearance.
pub fn scan_tags(text: &str) -> Vec<Tag> {
    let chars: Vec<char> = text.chars().collect();
    let mut tags = Vec::new();
    let mut state = ScanState::Waiting;
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        match state {
            ScanState::Waiting => {
                if ch == '<' {
                    let width = run_length(&chars, i, '<');
                    if width >= 2 {
                        state = ScanState::Building { start: i, width };
                    }
                    i += width;
                    continue;
                }
            }
            ScanState::Building { start, width } => match ch {
                '"' | '\'' => state = ScanState::Stringing { start, width, quote: ch },
                '>' => {
                    let closing = run_length(&chars, i, '>');
                    if closing == width {
                        let raw: String = chars[start..i + closing].iter().collect();
                        if let Ok(tag) = Tag::parse(&raw) {
                            tags.push(tag);
                        }
                        state = ScanState::Waiting;
                    }
                    i += closing;
                    continue;
                }
                _ => {}
            },
            ScanState::Stringing { start, width, quote } => {
                if ch == '\\' {
                    i += 2;
                    continue;
                }
                if ch == quote {
                    state = ScanState::Building { start, width };
                }
            }
        }
        i += 1;
    }

    tags
}

/// Visible text of the document in reading order: paragraphs, then tables
/// row by row and cell by cell. Content controls are skipped.
pub fn document_text(doc: &Document) -> String {
    let mut text = String::new();
    collect_text(&doc.body, &mut text);
    text
}

fn collect_text(blocks: &[Block], out: &mut String) {
    for block in blocks {
        match block {
            Block::Paragraph(p) => {
                for run in &p.runs {
                    out.push_str(&run.text);
                }
                out.push('\n');
            }
            Block::Table(t) => {
                for cell in t.cells() {
                    collect_text(&cell.blocks, out);
                }
            }
            Block::ContentControl(_) => {}
        }
    }
}

/// Tags of one delimiter width, in document order.
pub fn extract_tags(doc: &Document, width: usize) -> Vec<Tag> {
    scan_tags(&document_text(doc))
        .into_iter()
        .filter(|tag| tag.width() == width)
        .collect()
}
