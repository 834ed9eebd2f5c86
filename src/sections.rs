//! Repeated and removed sections.
//!
//! Marker paragraphs bracket a run of top-level blocks:
//!
//! ```text
//! repeat_start          (or repeat_start_3 to force three copies)
//! Contract <<CN_Ord>>: <<CN_Value:curr>>
//! repeat_end
//!
//! remove_start
//! Notes for the template author
//! remove_end
//! ```
//!
//! Markers are case-insensitive substrings of a paragraph's text.
use crate::document::{Block, Document, Paragraph};
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, warn};

static REPEAT_OVERRIDE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"repeat_start_(\d+)").expect("override pattern is valid"));

const REPEAT_START: &str = "repeat_start";
const REPEAT_END: &str = "repeat_end";
const REMOVE_START: &str = "remove_start";
const REMOVE_END: &str = "remove_end";

/// Expands every `repeat_start` ... `repeat_end` section to `times` copies
/// (or to the count given by a `repeat_start_N` marker), stamping the
/// ordinal of each copy into its `CN` placeholders. Both markers are
/// removed; a count of zero removes the section entirely.
pub fn repeat_sections(doc: &mut Document, times: usize) {
    let body = &mut doc.body;
    let mut start: Option<usize> = None;
    let mut count = times;
    let mut i = 0;

    while i < body.len() {
        let Some(text) = body[i].marker_text() else {
            i += 1;
            continue;
        };

        if text.contains(REPEAT_START) {
            start = Some(i + 1);
            count = REPEAT_OVERRIDE
                .captures(&text)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(times);
        } else if text.contains(REPEAT_END) {
            let Some(first) = start.take() else {
                warn!("Ignoring repeat_end without a repeat_start (block {i})");
                i += 1;
                continue;
            };

            if count == 0 {
                debug!("Removing repeated section of {} blocks", i - first);
                body.drain(first - 1..=i);
                i = first - 1;
                continue;
            }

            let period = i - first;
            let copies: Vec<Block> = (1..count)
                .flat_map(|_| body[first..i].iter().cloned())
                .collect();
            let end = i + copies.len();
            body.splice(i..i, copies);
            debug!("Repeated section of {period} blocks {count} times");

            if period > 0 {
                enumerate_blocks(&mut body[first..end], period);
            }
            body.remove(end);
            body.remove(first - 1);
            // The block after the old end marker
            i = end - 1;
            continue;
        }
        i += 1;
    }
}

/// Numbers the copies of a section: block `k` of the span belongs to copy
/// `k / period + 1`.
fn enumerate_blocks(blocks: &mut [Block], period: usize) {
    for (k, block) in blocks.iter_mut().enumerate() {
        stamp_ordinal(block, k / period + 1);
    }
}

fn stamp_ordinal(block: &mut Block, ordinal: usize) {
    match block {
        Block::Paragraph(p) => enumerate_paragraph(p, ordinal),
        Block::Table(t) => {
            for cell in t.cells_mut() {
                for block in &mut cell.blocks {
                    stamp_ordinal(block, ordinal);
                }
            }
        }
        Block::ContentControl(_) => {}
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placeholder {
    Waiting,
    Opening,
    Active,
    Closing,
    Setting,
}

/// Replaces `CN` with `C<ordinal>` inside `<<...>>` tags only. The state
/// carries across runs, so tags split over several runs are handled.
fn enumerate_paragraph(paragraph: &mut Paragraph, ordinal: usize) {
    let digits: Vec<char> = ordinal.to_string().chars().collect();
    let mut state = Placeholder::Waiting;

    for run in &mut paragraph.runs {
        let mut chars: Vec<char> = run.text.chars().collect();
        let mut changed = false;
        let mut i = 0;

        while i < chars.len() {
            let next = match (state, chars[i]) {
                (Placeholder::Waiting, '<') => Placeholder::Opening,
                (Placeholder::Waiting, _) => Placeholder::Waiting,
                (Placeholder::Opening, '<') => Placeholder::Active,
                (Placeholder::Opening, _) => Placeholder::Waiting,
                (Placeholder::Active, '>') => Placeholder::Closing,
                (Placeholder::Active, 'C') => Placeholder::Setting,
                (Placeholder::Active, _) => Placeholder::Active,
                (Placeholder::Closing, '>') => Placeholder::Waiting,
                (Placeholder::Setting, 'N') => {
                    chars.splice(i..=i, digits.iter().copied());
                    changed = true;
                    i += digits.len();
                    state = Placeholder::Active;
                    continue;
                }
                // Still inside the tag; look at this char again
                (Placeholder::Closing | Placeholder::Setting, _) => {
                    state = Placeholder::Active;
                    continue;
                }
            };
            state = next;
            i += 1;
        }

        if changed {
            run.text = chars.into_iter().collect();
        }
    }
}

/// Deletes every `remove_start` ... `remove_end` section, markers included.
pub fn remove_sections(doc: &mut Document) {
    let body = &mut doc.body;
    let mut start: Option<usize> = None;
    let mut i = 0;

    while i < body.len() {
        if let Some(text) = body[i].marker_text() {
            if text.contains(REMOVE_START) {
                start = Some(i);
            } else if text.contains(REMOVE_END) {
                match start.take() {
                    Some(first) => {
                        debug!("Removing section of {} blocks", i + 1 - first);
                        body.drain(first..=i);
                        i = first;
                        continue;
                    }
                    None => warn!("Ignoring remove_end without a remove_start (block {i})"),
                }
            }
        }
        i += 1;
    }
}
