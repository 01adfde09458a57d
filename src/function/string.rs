//! String transformations.

use crate::data::Value;
use crate::error::{OpencleanError, Result};

/// Transformation applied to the string result of a child function.
///
/// List results are transformed element by element, except for
/// [`StringOp::Concat`] which joins the list into one string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StringOp {
    Lower,
    Upper,
    Capitalize,
    Trim,
    Length,
    Concat(String),
}

impl StringOp {
    /// Apply the operation. Non-string input is a type error unless
    /// `as_string` is set, in which case the value's text form is used.
    pub fn apply(&self, value: &Value, as_string: bool) -> Result<Value> {
        match (self, value) {
            (Self::Concat(delim), Value::List(values)) => {
                let parts = values
                    .iter()
                    .map(|v| text(v, as_string))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::Str(parts.join(delim)))
            }
            (_, Value::List(values)) => values
                .iter()
                .map(|v| self.apply(v, as_string))
                .collect::<Result<Vec<_>>>()
                .map(Value::List),
            _ => Ok(self.apply_str(&text(value, as_string)?)),
        }
    }

    fn apply_str(&self, s: &str) -> Value {
        match self {
            Self::Lower => Value::Str(s.to_lowercase()),
            Self::Upper => Value::Str(s.to_uppercase()),
            Self::Capitalize => Value::Str(capitalize(s)),
            Self::Trim => Value::Str(s.trim().to_owned()),
            Self::Length => Value::Int(s.chars().count() as i64),
            Self::Concat(_) => Value::Str(s.to_owned()),
        }
    }
}

fn text(value: &Value, as_string: bool) -> Result<String> {
    match value {
        Value::Str(s) => Ok(s.clone()),
        other if as_string => Ok(other.to_text()),
        other => Err(OpencleanError::type_error(format!(
            "expected a string, got {} value '{other}'",
            other.type_label()
        ))),
    }
}

/// First character upper case, the rest lower case.
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_ops() {
        let v = Value::from("  aLiCe ");
        assert_eq!(StringOp::Lower.apply(&v, false).unwrap(), Value::from("  alice "));
        assert_eq!(StringOp::Upper.apply(&v, false).unwrap(), Value::from("  ALICE "));
        assert_eq!(StringOp::Trim.apply(&v, false).unwrap(), Value::from("aLiCe"));
        assert_eq!(
            StringOp::Capitalize.apply(&"aLiCe".into(), false).unwrap(),
            Value::from("Alice")
        );
        assert_eq!(StringOp::Length.apply(&v, false).unwrap(), Value::Int(8));
    }

    #[test]
    fn test_non_string_input() {
        let err = StringOp::Upper.apply(&Value::Int(12), false).unwrap_err();
        assert!(matches!(err, OpencleanError::Type(_)));
        assert_eq!(
            StringOp::Length.apply(&Value::Int(123), true).unwrap(),
            Value::Int(3)
        );
    }

    #[test]
    fn test_list_input() {
        let list = Value::List(vec!["a".into(), "b".into()]);
        assert_eq!(
            StringOp::Upper.apply(&list, false).unwrap(),
            Value::List(vec!["A".into(), "B".into()])
        );
        assert_eq!(
            StringOp::Concat("-".to_owned()).apply(&list, false).unwrap(),
            Value::from("a-b")
        );
        let mixed = Value::List(vec!["a".into(), Value::Int(1)]);
        assert!(StringOp::Concat("|".to_owned()).apply(&mixed, false).is_err());
        assert_eq!(
            StringOp::Concat("|".to_owned()).apply(&mixed, true).unwrap(),
            Value::from("a|1")
        );
    }
}
