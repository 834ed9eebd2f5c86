//! Workbook data source.
//!
//! A workbook is read from JSON:
//!
//! ```json
//! {
//!   "sheets": [
//!     {"name": "Summary", "code_name": "Home", "cells": {
//!       "A1": "Client", "B1": "Acme Ltd",
//!       "B2": {"value": 1250.5, "formula": "SUM(Data!C2:C40)"}
//!     }}
//!   ],
//!   "names": {"ClientName": "Summary!$B$1"}
//! }
//! ```
//!
//! Cells are keyed by A1 address and hold a number, a string or a boolean,
//! optionally with the formula that produced it.
use crate::value::HostObject;
use regex::Regex;
use serde::Deserialize;
use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use thiserror::Error;

/// Largest column index (`XFD`) plus one.
const MAX_COLUMNS: u32 = 16_384;
const MAX_ROWS: u32 = 1_048_576;

static A1: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?:'((?:[^']|'')+)'|([^!'\s]+))!)?\$?([A-Za-z]{1,3})\$?([0-9]+)$")
        .expect("A1 pattern is valid")
});

static R1C1: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?:'((?:[^']|'')+)'|([^!'\s]+))!)?[Rr]([0-9]+)[Cc]([0-9]+)$")
        .expect("R1C1 pattern is valid")
});

#[derive(Debug, Error)]
pub enum WorkbookError {
    #[error("Cannot read workbook {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed workbook: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid cell address '{address}' on sheet '{sheet}'")]
    Address { sheet: String, address: String },

    #[error("Name '{name}' refers to unknown sheet '{sheet}'")]
    UnknownSheet { name: String, sheet: String },
}

/// A cell position, 0-based, optionally qualified by a sheet name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellAddress {
    pub sheet: Option<String>,
    pub row: u32,
    pub col: u32,
}

impl CellAddress {
    /// Parses `B7`, `$B$7`, `Data!B7`, `'My Data'!$B$7` or `R7C2`.
    ///
    /// ```
    /// use docweave::workbook::CellAddress;
    ///
    /// let address = CellAddress::parse("Summary!$B$7").unwrap();
    /// assert_eq!((address.row, address.col), (6, 1));
    /// assert_eq!(address.sheet.as_deref(), Some("Summary"));
    /// assert_eq!(CellAddress::parse("R7C2").unwrap().a1(), "B7");
    /// assert!(CellAddress::parse("Revenue").is_none());
    /// ```
    pub fn parse(text: &str) -> Option<CellAddress> {
        let text = text.trim();
        let sheet_of = |caps: &regex::Captures| {
            caps.get(1)
                .map(|m| m.as_str().replace("''", "'"))
                .or_else(|| caps.get(2).map(|m| m.as_str().to_string()))
        };

        if let Some(caps) = A1.captures(text) {
            let col = column_index(caps.get(3)?.as_str())?;
            let row: u32 = caps.get(4)?.as_str().parse().ok()?;
            return CellAddress::checked(sheet_of(&caps), row, col + 1);
        }
        if let Some(caps) = R1C1.captures(text) {
            let row: u32 = caps.get(3)?.as_str().parse().ok()?;
            let col: u32 = caps.get(4)?.as_str().parse().ok()?;
            return CellAddress::checked(sheet_of(&caps), row, col);
        }
        None
    }

    /// Builds an address from 1-based coordinates, rejecting out of range
    /// ones.
    fn checked(sheet: Option<String>, row: u32, col: u32) -> Option<CellAddress> {
        if !(1..=MAX_ROWS).contains(&row) || !(1..=MAX_COLUMNS).contains(&col) {
            return None;
        }
        Some(CellAddress {
            sheet,
            row: row - 1,
            col: col - 1,
        })
    }

    /// `B7` style text, without the sheet.
    pub fn a1(&self) -> String {
        format!("{}{}", column_name(self.col), self.row + 1)
    }
}

/// `A` is 0, `Z` is 25, `AA` is 26.
fn column_index(letters: &str) -> Option<u32> {
    let mut index: u32 = 0;
    for ch in letters.chars() {
        let digit = ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1;
        index = index.checked_mul(26)?.checked_add(digit)?;
    }
    index.checked_sub(1)
}

fn column_name(mut index: u32) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(char::from(b'A' + (index % 26) as u8));
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.iter().rev().collect()
}

/// Cached value of a cell.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Bool(true) => f.write_str("TRUE"),
            CellValue::Bool(false) => f.write_str("FALSE"),
            CellValue::Number(n) => write!(f, "{}", crate::value::Value::Double(*n)),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

/// A non-empty cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub sheet: String,
    pub row: u32,
    pub col: u32,
    pub value: Option<CellValue>,
    pub formula: Option<String>,
}

impl Cell {
    pub fn address(&self) -> String {
        CellAddress {
            sheet: None,
            row: self.row,
            col: self.col,
        }
        .a1()
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{value}"),
            None => Ok(()),
        }
    }
}

impl HostObject for Cell {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
pub struct Sheet {
    pub name: String,
    pub code_name: String,
    cells: HashMap<(u32, u32), Arc<Cell>>,
    names: HashMap<String, Arc<Cell>>,
}

impl Sheet {
    pub fn cell(&self, row: u32, col: u32) -> Option<&Arc<Cell>> {
        self.cells.get(&(row, col))
    }

    pub fn cell_at(&self, address: &CellAddress) -> Option<&Arc<Cell>> {
        self.cell(address.row, address.col)
    }

    /// A defined name that refers to a cell on this sheet.
    pub fn named(&self, name: &str) -> Option<&Arc<Cell>> {
        self.names.get(name)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl fmt::Display for Sheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl HostObject for Sheet {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
pub struct Workbook {
    sheets: Vec<Arc<Sheet>>,
    names: Vec<(String, Arc<Cell>)>,
}

#[derive(Deserialize)]
struct RawWorkbook {
    sheets: Vec<RawSheet>,
    #[serde(default)]
    names: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct RawSheet {
    name: String,
    #[serde(default)]
    code_name: Option<String>,
    #[serde(default)]
    cells: BTreeMap<String, RawCell>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCell {
    Plain(CellValue),
    Detailed {
        #[serde(default)]
        value: Option<CellValue>,
        #[serde(default)]
        formula: Option<String>,
    },
}

impl Workbook {
    pub fn load(path: &Path) -> Result<Self, WorkbookError> {
        let json = fs::read_to_string(path).map_err(|source| WorkbookError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self, WorkbookError> {
        let raw: RawWorkbook = serde_json::from_str(json)?;

        let mut sheets = Vec::with_capacity(raw.sheets.len());
        for (k, raw_sheet) in raw.sheets.into_iter().enumerate() {
            let mut cells = HashMap::with_capacity(raw_sheet.cells.len());
            for (key, raw_cell) in raw_sheet.cells {
                let address = CellAddress::parse(&key).ok_or_else(|| WorkbookError::Address {
                    sheet: raw_sheet.name.clone(),
                    address: key.clone(),
                })?;
                let (value, formula) = match raw_cell {
                    RawCell::Plain(value) => (Some(value), None),
                    RawCell::Detailed { value, formula } => (value, formula),
                };
                let cell = Cell {
                    sheet: raw_sheet.name.clone(),
                    row: address.row,
                    col: address.col,
                    value,
                    formula,
                };
                cells.insert((address.row, address.col), Arc::new(cell));
            }

            sheets.push(Sheet {
                code_name: raw_sheet.code_name.unwrap_or_else(|| format!("Sheet{}", k + 1)),
                name: raw_sheet.name,
                cells,
                names: HashMap::new(),
            });
        }

        let mut names = Vec::new();
        for (name, reference) in raw.names {
            // Ranges and other non-cell references are not bound
            let Some(address) = CellAddress::parse(&reference) else {
                continue;
            };
            let Some(sheet_name) = address.sheet.clone() else {
                continue;
            };
            let sheet = sheets
                .iter_mut()
                .find(|s| s.name == sheet_name)
                .ok_or_else(|| WorkbookError::UnknownSheet {
                    name: name.clone(),
                    sheet: sheet_name.clone(),
                })?;
            let cell = sheet
                .cells
                .entry((address.row, address.col))
                .or_insert_with(|| {
                    Arc::new(Cell {
                        sheet: sheet_name,
                        row: address.row,
                        col: address.col,
                        value: None,
                        formula: None,
                    })
                })
                .clone();
            sheet.names.insert(name.clone(), cell.clone());
            names.push((name, cell));
        }

        Ok(Workbook {
            sheets: sheets.into_iter().map(Arc::new).collect(),
            names,
        })
    }

    pub fn sheets(&self) -> &[Arc<Sheet>] {
        &self.sheets
    }

    pub fn sheet(&self, name: &str) -> Option<&Arc<Sheet>> {
        self.sheets.iter().find(|s| s.name == name)
    }

    /// Defined names that refer to a single cell.
    pub fn names(&self) -> &[(String, Arc<Cell>)] {
        &self.names
    }
}
