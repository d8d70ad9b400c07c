use serde::{Deserialize, Serialize};
use std::fmt;

/// A single value handed to a writer.
///
/// Callers usually build these through the `From` conversions: `None` becomes
/// [`CellValue::Blank`], numeric types become [`CellValue::Number`], `bool`
/// becomes [`CellValue::Boolean`] and strings become [`CellValue::Text`].
/// Any other displayable value can be stored with [`CellValue::text`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Blank,
    Number(f64),
    Boolean(bool),
    Text(String),
}

impl CellValue {
    /// Create a text value from anything displayable
    #[must_use]
    pub fn text<T: fmt::Display>(value: T) -> Self {
        CellValue::Text(value.to_string())
    }

    /// Check if the value is blank
    #[must_use]
    pub fn is_blank(&self) -> bool {
        matches!(self, CellValue::Blank)
    }

    /// Get the canonical string form, as a reader would return it
    #[must_use]
    pub fn as_str(&self) -> String {
        self.to_string()
    }
}

/// Render a number the way readers return numeric cells (`1.0`, `-13.5`).
#[must_use]
pub fn format_number(value: f64) -> String {
    format!("{value:?}")
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::Blank
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Blank => write!(f, ""),
            CellValue::Number(n) => write!(f, "{}", format_number(*n)),
            CellValue::Boolean(b) => write!(f, "{b}"),
            CellValue::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

impl From<i32> for CellValue {
    fn from(i: i32) -> Self {
        CellValue::Number(f64::from(i))
    }
}

impl From<u32> for CellValue {
    fn from(i: u32) -> Self {
        CellValue::Number(f64::from(i))
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        // Excel stores all numbers as f64, integers beyond 2^53 lose precision
        CellValue::Number(i as f64)
    }
}

impl From<u64> for CellValue {
    fn from(i: u64) -> Self {
        CellValue::Number(i as f64)
    }
}

impl From<usize> for CellValue {
    fn from(i: usize) -> Self {
        CellValue::Number(i as f64)
    }
}

impl From<f64> for CellValue {
    fn from(f: f64) -> Self {
        CellValue::Number(f)
    }
}

impl From<f32> for CellValue {
    fn from(f: f32) -> Self {
        CellValue::Number(f64::from(f))
    }
}

impl From<char> for CellValue {
    fn from(c: char) -> Self {
        CellValue::Text(c.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<&String> for CellValue {
    fn from(s: &String) -> Self {
        CellValue::Text(s.clone())
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => CellValue::Blank,
        }
    }
}
