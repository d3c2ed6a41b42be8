//! Decoded wire values
//!
//! A closed tree of the value shapes the daemon actually sends. The client
//! never inspects raw opcodes; it projects these values with the helpers
//! below, each of which names what it expected when the shape is wrong.

use std::fmt;

use crate::error::{JailwatchError, Result};

/// One decoded message body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireValue {
    /// Python `None`
    None,

    /// Text (unicode, or byte strings read as UTF-8 / Latin-1)
    String(String),

    /// Signed integer; booleans arrive as 0 / 1
    Integer(i64),

    /// Python list
    Sequence(Vec<WireValue>),

    /// Python tuple (positionally significant)
    Tuple(Vec<WireValue>),
}

impl WireValue {
    /// Short name of the variant, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            WireValue::None => "none",
            WireValue::String(_) => "string",
            WireValue::Integer(_) => "integer",
            WireValue::Sequence(_) => "sequence",
            WireValue::Tuple(_) => "tuple",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            WireValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            WireValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&[WireValue]> {
        match self {
            WireValue::Tuple(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[WireValue]> {
        match self {
            WireValue::Sequence(items) => Some(items),
            _ => None,
        }
    }

    // =========================================================================
    // Checked projections
    // =========================================================================

    /// Project to a string or fail with a protocol error naming `what`
    pub fn expect_str(&self, what: &str) -> Result<&str> {
        self.as_str().ok_or_else(|| self.mismatch(what, "string"))
    }

    /// Project to an integer or fail with a protocol error naming `what`
    pub fn expect_int(&self, what: &str) -> Result<i64> {
        self.as_int().ok_or_else(|| self.mismatch(what, "integer"))
    }

    /// Project to tuple items or fail with a protocol error naming `what`
    pub fn expect_tuple(&self, what: &str) -> Result<&[WireValue]> {
        self.as_tuple().ok_or_else(|| self.mismatch(what, "tuple"))
    }

    /// Project to sequence items or fail with a protocol error naming `what`
    pub fn expect_sequence(&self, what: &str) -> Result<&[WireValue]> {
        self.as_sequence().ok_or_else(|| self.mismatch(what, "sequence"))
    }

    /// Element `index` of a tuple with at least `index + 1` items
    pub fn tuple_element(&self, index: usize, what: &str) -> Result<&WireValue> {
        let items = self.expect_tuple(what)?;
        items.get(index).ok_or_else(|| {
            JailwatchError::protocol(format!(
                "{}: expected tuple with at least {} elements, got {}",
                what,
                index + 1,
                items.len()
            ))
        })
    }

    /// A `(label, value)` pair as sent in status responses
    pub fn labeled(&self, what: &str) -> Result<(&str, &WireValue)> {
        let label = self.tuple_element(0, what)?.expect_str(what)?;
        let value = self.tuple_element(1, what)?;
        Ok((label, value))
    }

    /// The response payload: element 1 of the `(code, payload)` reply tuple
    pub fn payload(&self, what: &str) -> Result<&WireValue> {
        self.tuple_element(1, what)
    }

    fn mismatch(&self, what: &str, expected: &str) -> JailwatchError {
        JailwatchError::protocol(format!(
            "{}: expected {}, got {}",
            what,
            expected,
            self.kind()
        ))
    }
}

/// Find the value of the first `(label, value)` pair carrying `label`.
///
/// Items that are not labeled pairs are skipped.
pub fn find_labeled<'a>(items: &'a [WireValue], label: &str) -> Option<&'a WireValue> {
    items.iter().find_map(|item| match item.as_tuple() {
        Some([WireValue::String(key), value, ..]) if key == label => Some(value),
        _ => None,
    })
}

impl fmt::Display for WireValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireValue::None => f.write_str("None"),
            WireValue::String(s) => write!(f, "{:?}", s),
            WireValue::Integer(n) => write!(f, "{}", n),
            WireValue::Sequence(items) => {
                f.write_str("[")?;
                write_items(f, items)?;
                f.write_str("]")
            }
            WireValue::Tuple(items) => {
                f.write_str("(")?;
                write_items(f, items)?;
                if items.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
        }
    }
}

fn write_items(f: &mut fmt::Formatter<'_>, items: &[WireValue]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl From<&str> for WireValue {
    fn from(s: &str) -> Self {
        WireValue::String(s.to_string())
    }
}

impl From<String> for WireValue {
    fn from(s: String) -> Self {
        WireValue::String(s)
    }
}

impl From<i64> for WireValue {
    fn from(n: i64) -> Self {
        WireValue::Integer(n)
    }
}
