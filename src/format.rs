//! Rendering of tag results.
//!
//! A tag may end in `:spec`. A spec containing `%` is a printf-style
//! template applied to the single result value; otherwise it names one of
//! a few fixed formats:
//!
//! ```text
//! <<Invoice.B4:sdate>>        31/12/2023
//! <<Invoice.B9:curr>>         £ 1,234.50
//! <<Invoice.B9:%08.3f>>       1234.500
//! ```
use crate::value::Value;
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("Unrecognised format spec: {0}")]
    UnknownSpec(String),

    #[error("Format '{spec}' cannot be applied to a {found} value")]
    Incompatible { spec: String, found: &'static str },

    #[error("Format '{template}' refers to argument {index}, but only one value is available")]
    MissingArgument { template: String, index: usize },
}

/// `%[index$][flags][width][.precision]conversion`
static DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"%(\d+\$)?([-#+ 0,(]*)(\d+)?(\.\d+)?([a-zA-Z%])")
        .expect("directive pattern is valid")
});

/// Formats a tag result. Without a spec the value's default text is used.
pub fn render(value: &Value, spec: Option<&str>) -> Result<String, FormatError> {
    match spec {
        None => Ok(value.to_string()),
        Some(spec) if spec.contains('%') => sprintf(spec, value),
        Some(spec) => apply_named(value, spec),
    }
}

fn apply_named(value: &Value, spec: &str) -> Result<String, FormatError> {
    let incompatible = || FormatError::Incompatible {
        spec: spec.to_string(),
        found: value.type_name(),
    };

    match spec {
        "short_date" | "sdate" => match value {
            Value::Date(dt) => Ok(dt.format("%d/%m/%Y").to_string()),
            _ => Err(incompatible()),
        },
        "currency" | "curr" => sprintf("£ %,.2f", value),
        "currp" => {
            let n = value.as_f64().ok_or_else(incompatible)?;
            Ok(format!("{} p", group_number(n * 100.0, 3)))
        }
        "currpx" => {
            let n = value.as_f64().ok_or_else(incompatible)?;
            Ok(format!("{} p", group_number(n, 3)))
        }
        _ => Err(FormatError::UnknownSpec(spec.to_string())),
    }
}

/// Formats `n` with thousands separators and at most `max_fraction`
/// fraction digits, rounding half to even. Trailing zeros are dropped.
///
/// ```
/// use docweave::format::group_number;
///
/// assert_eq!(group_number(1234567.891, 3), "1,234,567.891");
/// assert_eq!(group_number(2.5, 0), "2");
/// assert_eq!(group_number(-1000.0, 3), "-1,000");
/// ```
pub fn group_number(n: f64, max_fraction: u32) -> String {
    if !n.is_finite() {
        return Value::Double(n).to_string();
    }
    let text = match to_decimal(n) {
        Some(d) => d
            .round_dp_with_strategy(max_fraction, RoundingStrategy::MidpointNearestEven)
            .normalize()
            .to_string(),
        None => format!("{n:.0}"),
    };
    group_text(&text)
}

fn to_decimal(n: f64) -> Option<Decimal> {
    n.to_string().parse::<Decimal>().ok()
}

/// Inserts `,` every three digits of the integer part of a plain
/// decimal string.
fn group_text(text: &str) -> String {
    let (sign, unsigned) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text),
    };
    let (int_part, fraction) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*ch);
    }

    match fraction {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

#[derive(Debug)]
struct Directive<'a> {
    flags: &'a str,
    width: Option<usize>,
    precision: Option<usize>,
    conversion: char,
}

impl Directive<'_> {
    fn has(&self, flag: char) -> bool {
        self.flags.contains(flag)
    }
}

/// printf-style substitution of a single value into `template`.
///
/// Supports `%s %S %d %f %e %x %X %b %c %n %%` with flags `-`, `0`, `+`,
/// space, `,` and `(`, optional width and precision, and the explicit
/// argument index `1$`.
///
/// ```
/// use docweave::{Value, format::sprintf};
///
/// assert_eq!(sprintf("%05d", &Value::Integer(42)).unwrap(), "00042");
/// assert_eq!(sprintf("Total: %,.2f", &Value::Double(1234.5)).unwrap(), "Total: 1,234.50");
/// ```
pub fn sprintf(template: &str, arg: &Value) -> Result<String, FormatError> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    let mut consumed = false;

    for caps in DIRECTIVE.captures_iter(template) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&template[last..whole.start()]);
        last = whole.end();

        let directive = Directive {
            flags: caps.get(2).map_or("", |m| m.as_str()),
            width: caps.get(3).and_then(|m| m.as_str().parse().ok()),
            precision: caps
                .get(4)
                .and_then(|m| m.as_str().trim_start_matches('.').parse().ok()),
            conversion: caps
                .get(5)
                .and_then(|m| m.as_str().chars().next())
                .unwrap_or('s'),
        };

        match directive.conversion {
            '%' => {
                out.push_str(&pad("%".to_string(), &directive));
                continue;
            }
            'n' => {
                out.push('\n');
                continue;
            }
            _ => {}
        }

        let explicit = caps
            .get(1)
            .and_then(|m| m.as_str().trim_end_matches('$').parse::<usize>().ok());
        let index = match explicit {
            Some(index) => index,
            None if consumed => 2,
            None => {
                consumed = true;
                1
            }
        };
        if index != 1 {
            return Err(FormatError::MissingArgument {
                template: template.to_string(),
                index,
            });
        }

        out.push_str(&format_directive(&directive, arg, template)?);
    }

    out.push_str(&template[last..]);
    Ok(out)
}

fn format_directive(d: &Directive, arg: &Value, template: &str) -> Result<String, FormatError> {
    let incompatible = || FormatError::Incompatible {
        spec: template.to_string(),
        found: arg.type_name(),
    };

    // A null argument prints as "null" for every conversion but %b
    if arg.is_null() && d.conversion.to_ascii_lowercase() != 'b' {
        return Ok(pad(case(d, "null".to_string()), d));
    }

    let body = match d.conversion.to_ascii_lowercase() {
        's' => {
            let text = arg.to_string();
            match d.precision {
                Some(p) => text.chars().take(p).collect(),
                None => text,
            }
        }
        'b' => {
            let truth = match arg {
                Value::Null => false,
                Value::Boolean(b) => *b,
                _ => true,
            };
            truth.to_string()
        }
        'c' => match arg {
            Value::Integer(n) => u32::try_from(*n)
                .ok()
                .and_then(char::from_u32)
                .ok_or_else(incompatible)?
                .to_string(),
            Value::String(s) if s.chars().count() == 1 => s.clone(),
            _ => return Err(incompatible()),
        },
        'd' => {
            let n = match arg {
                Value::Integer(n) => *n,
                Value::Double(n) if n.is_finite() => n.trunc() as i64,
                _ => return Err(incompatible()),
            };
            return Ok(numeric(n < 0, n.unsigned_abs().to_string(), d));
        }
        'f' => {
            let n = arg.as_f64().ok_or_else(incompatible)?;
            let precision = d.precision.unwrap_or(6);
            return Ok(numeric(n < 0.0, fixed(n.abs(), precision), d));
        }
        'e' => {
            let n = arg.as_f64().ok_or_else(incompatible)?;
            let precision = d.precision.unwrap_or(6);
            let text = scientific(n.abs(), precision);
            return Ok(pad(case(d, signed(n < 0.0, text, d)), d));
        }
        'x' => {
            let n = match arg {
                Value::Integer(n) => *n,
                _ => return Err(incompatible()),
            };
            let hex = format!("{n:x}");
            let hex = if d.has('#') { format!("0x{hex}") } else { hex };
            return Ok(pad(case(d, zero_fill(hex, d)), d));
        }
        _ => return Err(incompatible()),
    };

    Ok(pad(case(d, body), d))
}

/// Uppercase conversions (`%S`, `%X`, `%E`, ...) uppercase their output.
fn case(d: &Directive, text: String) -> String {
    if d.conversion.is_ascii_uppercase() {
        text.to_uppercase()
    } else {
        text
    }
}

/// Fixed-point text of a non-negative number, rounding half up.
fn fixed(n: f64, precision: usize) -> String {
    let dp = u32::try_from(precision).unwrap_or(u32::MAX);
    match to_decimal(n) {
        Some(d) if precision <= 28 => {
            let mut rounded = d.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
            rounded.rescale(dp);
            rounded.to_string()
        }
        _ => format!("{n:.precision$}"),
    }
}

/// `1.234560e+01` style text of a non-negative number.
fn scientific(n: f64, precision: usize) -> String {
    let text = format!("{n:.precision$e}");
    match text.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => text,
    }
}

fn signed(negative: bool, magnitude: String, d: &Directive) -> String {
    if negative {
        if d.has('(') {
            format!("({magnitude})")
        } else {
            format!("-{magnitude}")
        }
    } else if d.has('+') {
        format!("+{magnitude}")
    } else if d.has(' ') {
        format!(" {magnitude}")
    } else {
        magnitude
    }
}

/// Grouping, sign and zero padding for `%d` and `%f`.
fn numeric(negative: bool, magnitude: String, d: &Directive) -> String {
    let magnitude = if d.has(',') { group_text(&magnitude) } else { magnitude };
    let text = signed(negative, magnitude, d);
    pad(zero_fill(text, d), d)
}

/// Pads with zeros after any sign when the `0` flag is set.
fn zero_fill(text: String, d: &Directive) -> String {
    let Some(width) = d.width else { return text };
    let len = text.chars().count();
    if !d.has('0') || d.has('-') || len >= width {
        return text;
    }
    let sign_len = text
        .chars()
        .take_while(|c| matches!(c, '-' | '+' | ' ' | '('))
        .count();
    let (sign, rest) = text.split_at(sign_len);
    format!("{sign}{}{rest}", "0".repeat(width - len))
}

fn pad(text: String, d: &Directive) -> String {
    let Some(width) = d.width else { return text };
    let len = text.chars().count();
    if len >= width {
        return text;
    }
    let fill = " ".repeat(width - len);
    if d.has('-') {
        format!("{text}{fill}")
    } else {
        format!("{fill}{text}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> Value {
        Value::date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn named_specs() {
        assert_eq!(render(&date(2023, 12, 31), Some("sdate")).unwrap(), "31/12/2023");
        assert_eq!(render(&Value::Double(1234.5), Some("curr")).unwrap(), "£ 1,234.50");
        assert_eq!(render(&Value::Double(0.125), Some("currency")).unwrap(), "£ 0.13");
        assert_eq!(render(&Value::Double(0.42), Some("currp")).unwrap(), "42 p");
        assert_eq!(render(&Value::Double(1500.25), Some("currpx")).unwrap(), "1,500.25 p");
    }

    #[test]
    fn unknown_spec_is_an_error() {
        assert_eq!(
            render(&Value::Integer(1), Some("money")),
            Err(FormatError::UnknownSpec("money".to_string()))
        );
        assert!(matches!(
            render(&Value::Integer(1), Some("sdate")),
            Err(FormatError::Incompatible { .. })
        ));
    }

    #[test]
    fn default_text() {
        assert_eq!(render(&Value::Double(3.0), None).unwrap(), "3.0");
        assert_eq!(render(&Value::Double(0.1), None).unwrap(), "0.1");
        assert_eq!(render(&date(2024, 2, 1), None).unwrap(), "01/02/2024");
    }

    #[test]
    fn printf_directives() {
        assert_eq!(sprintf("%s!", &Value::from("hi")).unwrap(), "hi!");
        assert_eq!(sprintf("[%-5s]", &Value::from("ab")).unwrap(), "[ab   ]");
        assert_eq!(sprintf("%S", &Value::from("ab")).unwrap(), "AB");
        assert_eq!(sprintf("%,d", &Value::Integer(-1234567)).unwrap(), "-1,234,567");
        assert_eq!(sprintf("%+d", &Value::Integer(5)).unwrap(), "+5");
        assert_eq!(sprintf("%(.1f", &Value::Double(-2.25)).unwrap(), "(2.3)");
        assert_eq!(sprintf("%x", &Value::Integer(255)).unwrap(), "ff");
        assert_eq!(sprintf("%X", &Value::Integer(255)).unwrap(), "FF");
        assert_eq!(sprintf("%.2e", &Value::Double(1234.5)).unwrap(), "1.23e+03");
        assert_eq!(sprintf("%b", &Value::Null).unwrap(), "false");
        assert_eq!(sprintf("%c", &Value::Integer(65)).unwrap(), "A");
        assert_eq!(sprintf("100%%", &Value::Null).unwrap(), "100%");
        assert_eq!(sprintf("%1$s and %1$s", &Value::from("x")).unwrap(), "x and x");
    }

    #[test]
    fn printf_single_argument_only() {
        assert_eq!(
            sprintf("%s %s", &Value::from("x")),
            Err(FormatError::MissingArgument {
                template: "%s %s".to_string(),
                index: 2
            })
        );
    }

    #[test]
    fn grouping_rounds_half_even() {
        assert_eq!(group_number(0.0005, 3), "0");
        assert_eq!(group_number(0.0015, 3), "0.002");
        assert_eq!(group_number(1234.5, 3), "1,234.5");
        assert_eq!(group_number(999.0, 3), "999");
    }
}
