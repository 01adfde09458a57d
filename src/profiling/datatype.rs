//! Raw type detection and conversion of cell values.

use crate::data::Value;
use serde::{Deserialize, Serialize};

/// Raw type a string cell can be converted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawType {
    Int,
    Float,
    Bool,
}

impl RawType {
    fn parse(self, text: &str) -> Option<Value> {
        match self {
            Self::Int => text.parse::<i64>().ok().map(Value::Int),
            Self::Float => text
                .parse::<f64>()
                .ok()
                .filter(|x| x.is_finite())
                .map(Value::Float),
            Self::Bool => match text.to_ascii_lowercase().as_str() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
        }
    }
}

/// Converts string cells to the first raw type in a list that parses them.
///
/// Non-string values pass through unchanged. Strings that no type accepts
/// stay strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatatypeConverter {
    types: Vec<RawType>,
}

impl Default for DatatypeConverter {
    /// Integers first, then floats.
    fn default() -> Self {
        Self::new(vec![RawType::Int, RawType::Float])
    }
}

impl DatatypeConverter {
    pub fn new(types: Vec<RawType>) -> Self {
        Self { types }
    }

    pub fn types(&self) -> &[RawType] {
        &self.types
    }

    pub fn convert(&self, value: &Value) -> Value {
        let Value::Str(s) = value else {
            return value.clone();
        };
        let text = s.trim();
        if text.is_empty() {
            return value.clone();
        }
        self.types
            .iter()
            .find_map(|t| t.parse(text))
            .unwrap_or_else(|| value.clone())
    }

    /// Converted value together with its type label.
    pub fn cast(&self, value: &Value) -> (&'static str, Value) {
        let converted = self.convert(value);
        (converted.type_label(), converted)
    }
}
