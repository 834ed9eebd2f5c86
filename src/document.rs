//! Tree-structured document container.
//!
//! A document is an ordered list of blocks. Paragraphs hold runs of text
//! that share formatting; tables hold rows of cells, each of which holds
//! blocks again. Content controls are read-only text.
//!
//! Formatting is opaque here: every node carries a `props` map that is
//! preserved and cloned along with the node, but never interpreted.
//!
//! ```json
//! {"body": [
//!   {"paragraph": {"runs": [{"props": {"bold": true}, "text": "Dear <<Name>>,"}]}},
//!   {"table": {"rows": [{"cells": [{"blocks": []}]}]}}
//! ]}
//! ```
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Formatting properties of a node.
pub type Props = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Cannot read document {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Cannot write document {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed document: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub body: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Block {
    Paragraph(Paragraph),
    Table(Table),
    ContentControl(ContentControl),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    #[serde(default, skip_serializing_if = "Props::is_empty")]
    pub props: Props,
    #[serde(default)]
    pub runs: Vec<Run>,
}

/// A stretch of text with uniform formatting. A `\n` in the text is a line
/// break.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Run {
    #[serde(default, skip_serializing_if = "Props::is_empty")]
    pub props: Props,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    #[serde(default, skip_serializing_if = "Props::is_empty")]
    pub props: Props,
    #[serde(default)]
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    #[serde(default, skip_serializing_if = "Props::is_empty")]
    pub props: Props,
    #[serde(default)]
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    #[serde(default, skip_serializing_if = "Props::is_empty")]
    pub props: Props,
    #[serde(default)]
    pub blocks: Vec<Block>,
}

/// Read-only structured content. Its text takes part in replacement
/// bookkeeping but is never edited.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentControl {
    #[serde(default)]
    pub text: String,
}

impl Document {
    pub fn new(body: Vec<Block>) -> Self {
        Document { body }
    }

    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let json = fs::read_to_string(path).map_err(|source| DocumentError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn save(&self, path: &Path) -> Result<(), DocumentError> {
        let json = self.to_json()?;
        fs::write(path, json).map_err(|source| DocumentError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Text of every top-level paragraph, one per line. Tables and content
    /// controls are left out.
    pub fn paragraph_texts(&self) -> Vec<String> {
        self.body
            .iter()
            .filter_map(|block| match block {
                Block::Paragraph(p) => Some(p.text()),
                _ => None,
            })
            .collect()
    }
}

impl Paragraph {
    pub fn new(runs: Vec<Run>) -> Self {
        Paragraph {
            props: Props::new(),
            runs,
        }
    }

    /// A paragraph holding a single unformatted run.
    pub fn from_text(text: impl Into<String>) -> Self {
        Paragraph::new(vec![Run::new(text)])
    }

    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

impl Run {
    pub fn new(text: impl Into<String>) -> Self {
        Run {
            props: Props::new(),
            text: text.into(),
        }
    }

    /// A run with the same formatting as `self` and different text.
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Run {
            props: self.props.clone(),
            text: text.into(),
        }
    }
}

impl Block {
    pub fn paragraph(text: impl Into<String>) -> Self {
        Block::Paragraph(Paragraph::from_text(text))
    }

    pub fn as_paragraph(&self) -> Option<&Paragraph> {
        match self {
            Block::Paragraph(p) => Some(p),
            _ => None,
        }
    }

    /// Lowercased paragraph text, used for marker detection.
    pub(crate) fn marker_text(&self) -> Option<String> {
        self.as_paragraph().map(|p| p.text().to_lowercase())
    }
}

impl Table {
    pub fn new(rows: Vec<Row>) -> Self {
        Table {
            props: Props::new(),
            rows,
        }
    }

    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.rows.iter().flat_map(|row| row.cells.iter())
    }

    pub fn cells_mut(&mut self) -> impl Iterator<Item = &mut Cell> {
        self.rows.iter_mut().flat_map(|row| row.cells.iter_mut())
    }
}

impl Row {
    pub fn new(cells: Vec<Cell>) -> Self {
        Row {
            props: Props::new(),
            cells,
        }
    }
}

impl Cell {
    pub fn new(blocks: Vec<Block>) -> Self {
        Cell {
            props: Props::new(),
            blocks,
        }
    }
}
