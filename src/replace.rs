//! Ordered, formatting-preserving replacement of tag text.
//!
//! Replacers are applied strictly in the order their tags were extracted.
//! The walk keeps two cursors, the current block and the current replacer;
//! a block is only left once it no longer contains the current bookmark.
use crate::document::{Block, Document, Paragraph};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplaceError {
    #[error("Bookmark cannot be blank")]
    BlankBookmark,

    #[error("The replacers were not fully consumed: {remaining} of {total} remain")]
    Unconsumed { remaining: usize, total: usize },
}

/// Original tag text and the text that replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacer {
    bookmark: String,
    replacement: String,
}

impl Replacer {
    pub fn new(
        bookmark: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Result<Self, ReplaceError> {
        let bookmark = bookmark.into();
        if bookmark.trim().is_empty() {
            return Err(ReplaceError::BlankBookmark);
        }
        Ok(Replacer {
            bookmark,
            replacement: replacement.into(),
        })
    }

    pub fn bookmark(&self) -> &str {
        &self.bookmark
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }
}

impl fmt::Display for Replacer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.bookmark, self.replacement)
    }
}

/// Applies every replacer, in order, to the document.
///
/// Fails when the walk ends with replacers left over, which means the
/// document no longer contains the tags it was extracted from.
pub fn ordered_replace(doc: &mut Document, replacers: &[Replacer]) -> Result<(), ReplaceError> {
    let consumed = replace_in_blocks(&mut doc.body, replacers);
    if consumed < replacers.len() {
        return Err(ReplaceError::Unconsumed {
            remaining: replacers.len() - consumed,
            total: replacers.len(),
        });
    }
    Ok(())
}

/// Returns how many replacers were consumed.
///
/// Within a block the search resumes just past the previous replacement, so
/// a later replacer never lands on text an earlier one skipped or produced.
fn replace_in_blocks(blocks: &mut [Block], replacers: &[Replacer]) -> usize {
    let mut r = 0;
    let mut e = 0;
    let mut cursor = 0;

    while e < blocks.len() && r < replacers.len() {
        let found = match &mut blocks[e] {
            Block::Paragraph(p) => replace_in_paragraph(p, &replacers[r], cursor),
            // Read-only: acknowledge the tag without editing
            Block::ContentControl(c) => find_from(&c.text, replacers[r].bookmark(), cursor),
            Block::Table(t) => {
                for cell in t.cells_mut() {
                    r += replace_in_blocks(&mut cell.blocks, &replacers[r..]);
                }
                e += 1;
                cursor = 0;
                continue;
            }
        };

        match found {
            Some(next) => {
                cursor = next;
                r += 1;
            }
            None => {
                e += 1;
                cursor = 0;
            }
        }
    }

    r
}

/// Char offset just past the first `needle` at or after char `from`.
fn find_from(text: &str, needle: &str, from: usize) -> Option<usize> {
    let rest: String = text.chars().skip(from).collect();
    let at = rest.find(needle)?;
    Some(from + rest[..at].chars().count() + needle.chars().count())
}

/// Replaces the first occurrence of the bookmark at or after char `from`
/// of the paragraph's text. The occurrence may be spread over several runs.
///
/// Returns the char offset just past the inserted replacement, or `None`
/// when there is no occurrence.
fn replace_in_paragraph(
    paragraph: &mut Paragraph,
    replacer: &Replacer,
    from: usize,
) -> Option<usize> {
    let tag: Vec<char> = replacer.bookmark().chars().collect();

    // Runs covering the current partial match, where it starts in the
    // first of them, and where it ends in the last
    let mut cover: Vec<usize> = Vec::new();
    let mut start = 0;
    let mut end = 0;
    let mut matched = 0;
    // Chars in the runs before the current one, and before `cover[0]`
    let mut offset = 0;
    let mut origin = 0;

    for (j, run) in paragraph.runs.iter().enumerate() {
        if matched == tag.len() {
            break;
        }

        let mut restarted = matched == 0;
        let mut i = 0;
        for ch in run.text.chars() {
            if matched == tag.len() {
                break;
            }
            i += 1;
            if offset + i <= from {
                continue;
            }
            if ch == tag[matched] {
                matched += 1;
            } else {
                restarted = true;
                matched = usize::from(ch == tag[0]);
            }
        }

        if matched == 0 {
            cover.clear();
        } else if restarted {
            cover = vec![j];
            start = i - matched;
            origin = offset;
        } else {
            cover.push(j);
        }
        end = i;
        offset += run.text.chars().count();
    }

    if matched != tag.len() || cover.is_empty() {
        return None;
    }

    let first = cover[0];
    let last = cover[cover.len() - 1];
    let first_text: Vec<char> = paragraph.runs[first].text.chars().collect();
    paragraph.runs[first].text = first_text[..start].iter().collect();

    let mut replacement = replacer.replacement().to_string();
    let mut trailing = 0;
    if first != last {
        let last_text: Vec<char> = paragraph.runs[last].text.chars().collect();
        paragraph.runs[last].text = last_text[end..].iter().collect();
        paragraph.runs.drain(first + 1..last);
    } else {
        // Text after the tag in the same run moves behind the replacement
        trailing = first_text.len() - end;
        replacement.extend(&first_text[end..]);
    }

    let inserted = insert_runs(paragraph, first, &replacement);
    Some(origin + start + inserted.saturating_sub(trailing))
}

/// Inserts runs after `origin` holding `text`, one per line with a break
/// run between lines. Formatting is copied from the origin run.
///
/// Returns the number of chars inserted.
fn insert_runs(paragraph: &mut Paragraph, origin: usize, text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    let template = paragraph.runs[origin].clone();
    let mut at = origin + 1;
    let mut inserted = 0;

    for (k, line) in text.lines().enumerate() {
        if k > 0 {
            paragraph.runs.insert(at, template.with_text("\n"));
            at += 1;
            inserted += 1;
        }
        paragraph.runs.insert(at, template.with_text(line));
        at += 1;
        inserted += line.chars().count();
    }
    inserted
}
