use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value as JsonValue};

/// Logical column type as it appears in a compiled select clause or a
/// table definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalType {
    Null,
    Boolean,
    Integer,
    Float,
    Timestamp,
    String,
    Binary,
}

impl LogicalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalType::Null => "Null",
            LogicalType::Boolean => "Boolean",
            LogicalType::Integer => "Integer",
            LogicalType::Float => "Float",
            LogicalType::Timestamp => "Timestamp",
            LogicalType::String => "String",
            LogicalType::Binary => "Binary",
        }
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogicalType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Boolean" => Ok(LogicalType::Boolean),
            "Integer" | "Number" => Ok(LogicalType::Integer),
            "Float" => Ok(LogicalType::Float),
            "Timestamp" => Ok(LogicalType::Timestamp),
            "String" => Ok(LogicalType::String),
            "Binary" => Ok(LogicalType::Binary),
            "Null" => Ok(LogicalType::Null),
            _ => Err(()),
        }
    }
}

impl From<&str> for LogicalType {
    fn from(value: &str) -> Self {
        LogicalType::from_str(value).unwrap_or(LogicalType::String)
    }
}

/// One cell of a result row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScalarValue {
    Null,
    Boolean(bool),
    Int64(i64),
    Float64(f64),
    Timestamp(i64),
    Utf8(String),
    Binary(Vec<u8>),
}

impl ScalarValue {
    pub fn logical_type(&self) -> LogicalType {
        match self {
            ScalarValue::Null => LogicalType::Null,
            ScalarValue::Boolean(_) => LogicalType::Boolean,
            ScalarValue::Int64(_) => LogicalType::Integer,
            ScalarValue::Float64(_) => LogicalType::Float,
            ScalarValue::Timestamp(_) => LogicalType::Timestamp,
            ScalarValue::Utf8(_) => LogicalType::String,
            ScalarValue::Binary(_) => LogicalType::Binary,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ScalarValue::Null)
    }

    /// Externalized byte size of the value. All quota accounting
    /// (watermarks, per-query cap, staging gauge) is in these units.
    pub fn external_size(&self) -> u64 {
        match self {
            ScalarValue::Null => 1,
            ScalarValue::Boolean(_) => 1,
            ScalarValue::Int64(_) => 8,
            ScalarValue::Float64(_) => 8,
            ScalarValue::Timestamp(_) => 8,
            ScalarValue::Utf8(s) => s.len() as u64,
            ScalarValue::Binary(b) => b.len() as u64,
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            ScalarValue::Null => JsonValue::Null,
            ScalarValue::Boolean(b) => JsonValue::Bool(*b),
            ScalarValue::Int64(i) => JsonValue::Number(Number::from(*i)),
            ScalarValue::Float64(f) => Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            ScalarValue::Timestamp(t) => JsonValue::Number(Number::from(*t)),
            ScalarValue::Utf8(s) => JsonValue::String(s.clone()),
            ScalarValue::Binary(b) => {
                JsonValue::Array(b.iter().map(|x| JsonValue::Number(Number::from(*x))).collect())
            }
        }
    }
}

impl From<JsonValue> for ScalarValue {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => ScalarValue::Null,
            JsonValue::Bool(b) => ScalarValue::Boolean(b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    ScalarValue::Int64(i)
                } else {
                    ScalarValue::Float64(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            JsonValue::String(s) => ScalarValue::Utf8(s),
            other => ScalarValue::Utf8(other.to_string()),
        }
    }
}

/// Externalized byte size of a whole row.
pub fn row_external_size(row: &[ScalarValue]) -> u64 {
    row.iter().map(ScalarValue::external_size).sum()
}

#[cfg(test)]
mod types_test {
    use super::*;

    #[test]
    fn external_size_counts_payload_bytes() {
        assert_eq!(ScalarValue::Null.external_size(), 1);
        assert_eq!(ScalarValue::Int64(-3).external_size(), 8);
        assert_eq!(ScalarValue::Utf8("abcd".into()).external_size(), 4);
        let row = vec![ScalarValue::Int64(1), ScalarValue::Utf8("xy".into())];
        assert_eq!(row_external_size(&row), 10);
    }

    #[test]
    fn json_bridging_keeps_integer_and_null() {
        let v = ScalarValue::from(serde_json::json!(42));
        assert_eq!(v, ScalarValue::Int64(42));
        assert_eq!(v.to_json(), serde_json::json!(42));
        assert!(ScalarValue::from(serde_json::json!(null)).is_null());
    }
}
