//! Workbook access from scripts.
//!
//! [`workbook_bindings`] seeds the global scope with sheets, named cells and
//! conversion markers; [`WorkbookHost`] gives meaning to member syntax on
//! them:
//!
//! ```text
//! Home.B7          // cell B7 of the sheet with code name Home
//! Home.R7C2        // the same cell
//! Home.ClientName  // a defined name on that sheet
//! let c = Home.B7
//! num.c            // the cell's value as a double
//! int.Total        // a named cell (or double variable) as an integer
//! ```
//!
//! Conversions apply to the variable named by the member, never to a
//! member path.
use crate::{
    environment::Environment,
    interpreter::{MemberError, MemberHost},
    lexer::is_identifier,
    value::{Bindings, Handle, HostObject, Value},
    workbook::{Cell, CellAddress, CellValue, Sheet, Workbook},
};
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Conversion markers, bound as handles under their aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    /// Cell text
    Str,
    /// Default text of any variable
    ToStr,
    /// Cell serial number as a date
    Date,
    /// Truncated integer, also for double variables
    Int,
    Num,
    Bool,
    /// 1-based row of a cell
    Row,
    /// 1-based column of a cell
    Col,
    /// Formula text of a cell
    Formula,
}

impl Conversion {
    pub const ALIASES: [(&'static str, Conversion); 10] = [
        ("str", Conversion::Str),
        ("tostr", Conversion::ToStr),
        ("date", Conversion::Date),
        ("int", Conversion::Int),
        ("num", Conversion::Num),
        ("bool", Conversion::Bool),
        ("row", Conversion::Row),
        ("col", Conversion::Col),
        ("formula", Conversion::Formula),
        ("f", Conversion::Formula),
    ];
}

impl fmt::Display for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let alias = Conversion::ALIASES
            .iter()
            .find(|(_, c)| c == self)
            .map_or("conversion", |(alias, _)| *alias);
        f.write_str(alias)
    }
}

impl HostObject for Conversion {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn handle<T: HostObject>(object: &Arc<T>) -> Value {
    let object: Arc<dyn HostObject> = object.clone();
    Value::Handle(Handle::from_arc(object))
}

/// Global bindings for a workbook.
///
/// Each sheet is bound under its code name, and under its name when that
/// is a valid identifier. Named cells are bound under their names; a name
/// that clashes with another binding is dropped altogether. `Now` holds the
/// given timestamp.
pub fn workbook_bindings(workbook: &Workbook, now: NaiveDateTime) -> Bindings {
    let mut vars = Bindings::new();

    for (alias, conversion) in Conversion::ALIASES {
        vars.insert(alias.to_string(), Value::handle(conversion));
    }
    vars.insert("Now".to_string(), Value::Date(now));

    for sheet in workbook.sheets() {
        debug!("Binding sheet '{}' ({} cells)", sheet.name, sheet.len());
        vars.insert(sheet.code_name.clone(), handle(sheet));
        if is_identifier(&sheet.name) {
            vars.insert(sheet.name.clone(), handle(sheet));
        }
    }

    let mut duplicates = HashSet::new();
    for (name, cell) in workbook.names() {
        if vars.contains_key(name) {
            duplicates.insert(name.clone());
        } else {
            vars.insert(name.clone(), handle(cell));
        }
    }
    for name in duplicates {
        debug!("Dropping ambiguous name '{name}'");
        vars.remove(&name);
    }

    vars
}

/// Member access on sheets and conversion markers.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkbookHost;

impl MemberHost for WorkbookHost {
    fn read_member(
        &self,
        object: &Value,
        member: &str,
        env: &Environment,
    ) -> Result<Value, MemberError> {
        let Value::Handle(target) = object else {
            return Err(MemberError(format!(
                "A {} value has no member '{member}'",
                object.type_name()
            )));
        };

        if let Some(sheet) = target.downcast_ref::<Sheet>() {
            return read_sheet(sheet, member, env);
        }
        if let Some(conversion) = target.downcast_ref::<Conversion>() {
            return convert(*conversion, member, env);
        }
        Err(MemberError(format!("'{target}' has no member '{member}'")))
    }
}

fn cell_value(sheet: &Sheet, address: &CellAddress) -> Value {
    sheet.cell_at(address).map_or(Value::Null, handle)
}

/// A name on the sheet, then a variable holding an address, then the
/// member itself as an address.
fn read_sheet(sheet: &Sheet, member: &str, env: &Environment) -> Result<Value, MemberError> {
    if let Some(cell) = sheet.named(member) {
        return Ok(handle(cell));
    }
    if let Some(Value::String(text)) = env.lookup(member)
        && let Some(address) = CellAddress::parse(text)
    {
        return Ok(cell_value(sheet, &address));
    }
    if let Some(address) = CellAddress::parse(member) {
        return Ok(cell_value(sheet, &address));
    }
    Err(MemberError(format!(
        "Sheet member \"{member}\" is not a defined name, or a valid cell address (like A1)"
    )))
}

fn convert(conversion: Conversion, member: &str, env: &Environment) -> Result<Value, MemberError> {
    let thing = env
        .lookup(member)
        .ok_or_else(|| MemberError(format!("Variable '{member}' is undefined")))?;

    if conversion == Conversion::ToStr {
        return Ok(Value::String(thing.to_string()));
    }
    if let Value::Handle(h) = thing
        && let Some(cell) = h.downcast_ref::<Cell>()
    {
        return convert_cell(conversion, cell);
    }
    if conversion == Conversion::Int
        && let Value::Double(n) = thing
    {
        return Ok(Value::Integer(n.trunc() as i64));
    }
    Ok(Value::Null)
}

fn convert_cell(conversion: Conversion, cell: &Cell) -> Result<Value, MemberError> {
    let number = match &cell.value {
        Some(CellValue::Number(n)) => Some(*n),
        _ => None,
    };

    Ok(match conversion {
        Conversion::Row => Value::Integer(i64::from(cell.row) + 1),
        Conversion::Col => Value::Integer(i64::from(cell.col) + 1),
        Conversion::Formula => cell.formula.clone().map_or(Value::Null, Value::String),
        Conversion::ToStr => Value::String(cell.to_string()),
        Conversion::Str => match &cell.value {
            None => Value::String(String::new()),
            Some(CellValue::Text(s)) => Value::String(s.clone()),
            Some(_) => {
                return Err(MemberError(format!(
                    "Cell {}!{} does not hold text",
                    cell.sheet,
                    cell.address()
                )));
            }
        },
        Conversion::Int => number.map_or(Value::Null, |n| Value::Integer(n.trunc() as i64)),
        Conversion::Num => number.map_or(Value::Null, Value::Double),
        Conversion::Date => number.and_then(serial_date).map_or(Value::Null, Value::Date),
        Conversion::Bool => match &cell.value {
            Some(CellValue::Bool(b)) => Value::Boolean(*b),
            _ => Value::Null,
        },
    })
}

/// Spreadsheet serial day number to a timestamp (day 1 is 31/12/1899 in
/// the 1900 date system, with its phantom leap day).
pub fn serial_date(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    epoch.checked_add_signed(TimeDelta::try_milliseconds(millis)?)
}
