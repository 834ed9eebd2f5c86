use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Name to value map. The global scope of an interpreter is one of these,
/// owned by the caller between runs.
pub type Bindings = HashMap<String, Value>;

/// A value of the tag scripting language.
///
/// The domain is closed: scripts can only produce the scalar variants.
/// `Handle` values come from the host (sheets, cells, conversion markers)
/// and are opaque to the interpreter; they only travel through member
/// access back into the host.
///
/// # Examples
///
/// ```
/// use docweave::Value;
///
/// let count = Value::Integer(3);
/// let rate = Value::Double(0.25);
/// let name = Value::String("Acme".to_string());
///
/// assert_eq!(count.to_string(), "3");
/// assert_eq!(Value::Double(2.0).to_string(), "2.0");
/// assert_eq!(rate.to_string(), "0.25");
/// assert_eq!(name.to_string(), "Acme");
/// ```
#[derive(Debug, Clone)]
pub enum Value {
    /// `empty`
    Null,

    Boolean(bool),

    /// Integer number (preserved separately from doubles)
    Integer(i64),

    Double(f64),

    String(String),

    /// Calendar date with optional time of day
    Date(NaiveDateTime),

    /// Host object, compared by identity
    Handle(Handle),
}

impl Value {
    pub fn date(date: NaiveDate) -> Self {
        Value::Date(date.and_time(NaiveTime::MIN))
    }

    pub fn handle(object: impl HostObject) -> Self {
        Value::Handle(Handle::new(object))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Date(_) => "date",
            Value::Handle(_) => "handle",
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Double(n) => Some(*n),
            _ => None,
        }
    }

    /// Text used when the value is the right operand of string `+`.
    ///
    /// Dates drop their time of day and doubles are digit-grouped with at
    /// most three fraction digits.
    pub fn concat_text(&self) -> String {
        match self {
            Value::Date(dt) => dt.format("%d/%m/%Y").to_string(),
            Value::Double(n) => crate::format::group_number(*n, 3),
            other => other.to_string(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Handle(a), Value::Handle(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Double(n) => f.write_str(&double_text(*n)),
            Value::String(s) => f.write_str(s),
            Value::Date(dt) => {
                if dt.time() == NaiveTime::MIN {
                    write!(f, "{}", dt.format("%d/%m/%Y"))
                } else {
                    write!(f, "{}", dt.format("%d/%m/%Y %H:%M:%S"))
                }
            }
            Value::Handle(h) => write!(f, "{h}"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Double(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

/// Whole doubles keep a trailing `.0` so they stay distinguishable from
/// integers.
fn double_text(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n == f64::INFINITY {
        "Infinity".to_string()
    } else if n == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e16 {
        format!("{n:.1}")
    } else {
        n.to_string()
    }
}

/// An object owned by the host and carried through scripts as a value.
pub trait HostObject: fmt::Debug + fmt::Display + Send + Sync + 'static {
    fn as_any(&self) -> &dyn Any;
}

/// Shared pointer to a host object.
#[derive(Clone)]
pub struct Handle(Arc<dyn HostObject>);

impl Handle {
    pub fn new(object: impl HostObject) -> Self {
        Handle(Arc::new(object))
    }

    pub fn from_arc(object: Arc<dyn HostObject>) -> Self {
        Handle(object)
    }

    pub fn downcast_ref<T: HostObject>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }

    pub fn ptr_eq(&self, other: &Handle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({:?})", self.0)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}
