//! Text values decoded leniently from arbitrary JSON.

use std::fmt;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A field rendered as label text.
///
/// The API is inconsistent about whether ids, counts and flags are strings,
/// numbers or booleans, and fields come and go between resources. Every
/// scalar the exporter turns into a label goes through this type:
///
/// - strings are kept as-is
/// - numbers become decimal text
/// - booleans become `true` / `false`
/// - `null` and absent fields become the empty string
/// - arrays and objects become compact JSON text
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LabelText(String);

impl LabelText {
    /// Create a label value from text.
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Borrow the text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the source field was missing, null or empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Take ownership of the text.
    pub fn into_string(self) -> String {
        self.0
    }

    /// Render an already-parsed JSON value.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => Self::default(),
            Value::String(s) => Self(s.clone()),
            Value::Bool(b) => Self(b.to_string()),
            Value::Number(n) => Self(n.to_string()),
            other => Self(other.to_string()),
        }
    }

    /// This value if non-empty, `fallback` otherwise.
    pub fn or(self, fallback: &LabelText) -> LabelText {
        if self.is_empty() {
            fallback.clone()
        } else {
            self
        }
    }
}

impl<'de> Deserialize<'de> for LabelText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

impl fmt::Display for LabelText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LabelText {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for LabelText {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<LabelText> for String {
    fn from(label: LabelText) -> Self {
        label.0
    }
}

/// Join a list of label values with commas.
pub fn join(values: &[LabelText]) -> LabelText {
    let parts: Vec<&str> = values.iter().map(LabelText::as_str).collect();
    LabelText(parts.join(","))
}
