use std::fmt;

pub const DEFAULT_WIDTH: usize = 12;
pub const DEFAULT_FLOAT_DECIMALS: usize = 2;

/// A single report field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Str(String),
    Int(i64),
    Float(f64),
}

impl FieldValue {
    /// Right-justifies the value in `width` columns, floats with `float_decimals` digits.
    pub fn format(&self, width: usize, float_decimals: usize) -> String {
        match self {
            FieldValue::Str(s) => format!("{s:>width$}"),
            FieldValue::Int(i) => format!("{i:>width$}"),
            FieldValue::Float(f) => format!("{f:>width$.float_decimals$}"),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(DEFAULT_WIDTH, DEFAULT_FLOAT_DECIMALS))
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Str(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Str(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<usize> for FieldValue {
    fn from(value: usize) -> Self {
        FieldValue::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

/// Formats with the report defaults: 12 columns, 2 decimals.
pub fn fixed_width(value: impl Into<FieldValue>) -> String {
    value.into().to_string()
}
