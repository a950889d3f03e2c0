//! Cleaned form values.
//!
//! [`Value`] is what a field produces after validation. It serializes to JSON
//! for submission logs (dates, times and decimals become strings) and converts
//! to a [`ContextValue`] for message templates.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::ser::{Serialize, SerializeSeq, Serializer};

use form_designer_template::ContextValue;

/// A typed, validated form value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// No value (an empty optional field).
    Null,
    /// A boolean.
    Bool(bool),
    /// A whole number.
    Int(i64),
    /// A decimal number, kept in its normalized textual form.
    Decimal(String),
    /// Text.
    String(String),
    /// A calendar date.
    Date(NaiveDate),
    /// A date and time without time zone.
    DateTime(NaiveDateTime),
    /// A time of day.
    Time(NaiveTime),
    /// Several values, from multi-valued fields.
    List(Vec<Value>),
}

impl Value {
    /// Returns `true` for [`Value::Null`].
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the text of a [`Value::String`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            Self::Int(i) => write!(f, "{i}"),
            Self::Decimal(s) | Self::String(s) => write!(f, "{s}"),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            Self::Time(t) => write!(f, "{}", t.format("%H:%M:%S")),
            Self::List(items) => {
                let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "{}", parts.join(", "))
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            other => serializer.serialize_str(&other.to_string()),
        }
    }
}

impl From<&Value> for ContextValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Self::None,
            Value::Bool(b) => Self::Bool(*b),
            Value::Int(i) => Self::Integer(*i),
            Value::List(items) => Self::List(items.iter().map(Self::from).collect()),
            other => Self::String(other.to_string()),
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(value: &Value) -> Self {
        serde_json::to_value(value).unwrap_or(Self::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::Bool(true).to_string(), "True");
        assert_eq!(Value::Decimal("3.50".into()).to_string(), "3.50");
        assert_eq!(
            Value::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()).to_string(),
            "2024-02-29"
        );
        assert_eq!(
            Value::List(vec![Value::String("a".into()), Value::String("b".into())]).to_string(),
            "a, b"
        );
    }

    #[test]
    fn test_json() {
        let v = Value::List(vec![
            Value::Int(1),
            Value::Null,
            Value::Time(NaiveTime::from_hms_opt(9, 30, 0).unwrap()),
        ]);
        assert_eq!(
            serde_json::Value::from(&v),
            serde_json::json!([1, null, "09:30:00"])
        );
    }

    #[test]
    fn test_context_value() {
        assert_eq!(ContextValue::from(&Value::Int(3)), ContextValue::Integer(3));
        assert_eq!(
            ContextValue::from(&Value::Decimal("1.5".into())),
            ContextValue::from("1.5")
        );
        assert_eq!(ContextValue::from(&Value::Null), ContextValue::None);
    }
}
