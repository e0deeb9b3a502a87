//! Lenient conversion of loosely typed argument values
//!
//! Models are not consistent about argument types: a number may arrive as
//! `0.5` or as `"0.5"`, a flag as `true` or as `"true"`. These conversions
//! accept both forms and fail explicitly on anything else.

use serde_json::{Number, Value};

/// Conversion of a JSON value into a primitive target type
pub trait Coerce {
    /// Convert to a string; numbers and booleans are rendered as text
    fn coerce_string(&self) -> Result<String, String>;

    /// Convert to a floating-point number
    fn coerce_f64(&self) -> Result<f64, String>;

    /// Convert to an integer; fractional values are rejected
    fn coerce_i64(&self) -> Result<i64, String>;

    /// Convert to a boolean
    fn coerce_bool(&self) -> Result<bool, String>;

    /// Convert to the JSON value matching a schema type name
    ///
    /// Unknown type names (`object`, `array`, ...) pass the value through.
    fn coerce_to(&self, schema_type: &str) -> Result<Value, String>;
}

impl Coerce for Value {
    fn coerce_string(&self) -> Result<String, String> {
        match self {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(format!("expected a string, got {}", kind(other))),
        }
    }

    fn coerce_f64(&self) -> Result<f64, String> {
        match self {
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| format!("number {} is not representable", n)),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .ok_or_else(|| format!("'{}' is not a number", s)),
            other => Err(format!("expected a number, got {}", kind(other))),
        }
    }

    fn coerce_i64(&self) -> Result<i64, String> {
        if let Value::Number(n) = self {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
        }
        if let Value::String(s) = self {
            if let Ok(i) = s.trim().parse::<i64>() {
                return Ok(i);
            }
        }

        let f = self.coerce_f64().map_err(|_| match self {
            Value::String(s) => format!("'{}' is not an integer", s),
            other => format!("expected an integer, got {}", kind(other)),
        })?;
        if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
            Ok(f as i64)
        } else {
            Err(format!("{} is not an integer", f))
        }
    }

    fn coerce_bool(&self) -> Result<bool, String> {
        match self {
            Value::Bool(b) => Ok(*b),
            Value::String(s) => match s.trim() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(format!("'{}' is not a boolean", s)),
            },
            other => Err(format!("expected a boolean, got {}", kind(other))),
        }
    }

    fn coerce_to(&self, schema_type: &str) -> Result<Value, String> {
        match schema_type {
            "string" => self.coerce_string().map(Value::String),
            "number" => {
                if self.is_number() {
                    return Ok(self.clone());
                }
                let f = self.coerce_f64()?;
                Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| format!("{} is not representable", f))
            }
            "integer" => self.coerce_i64().map(Value::from),
            "boolean" => self.coerce_bool().map(Value::Bool),
            _ => Ok(self.clone()),
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case(json!(0.5), 0.5 ; "json number")]
    #[test_case(json!("0.5"), 0.5 ; "numeric string")]
    #[test_case(json!(" 1.0 "), 1.0 ; "padded string")]
    #[test_case(json!(3), 3.0 ; "integer")]
    fn test_coerce_f64(value: Value, expected: f64) {
        assert_eq!(value.coerce_f64().unwrap(), expected);
    }

    #[test_case(json!("abc") ; "word")]
    #[test_case(json!("NaN") ; "not a number")]
    #[test_case(json!(null) ; "null")]
    #[test_case(json!([1]) ; "array")]
    fn test_coerce_f64_rejects(value: Value) {
        assert!(value.coerce_f64().is_err());
    }

    #[test_case(json!(7), Ok(7) ; "json integer")]
    #[test_case(json!("7"), Ok(7) ; "integer string")]
    #[test_case(json!(2.0), Ok(2) ; "whole float")]
    #[test_case(json!("2.0"), Ok(2) ; "whole float string")]
    #[test_case(json!(2.5), Err(()) ; "fractional")]
    #[test_case(json!(true), Err(()) ; "boolean")]
    fn test_coerce_i64(value: Value, expected: Result<i64, ()>) {
        assert_eq!(value.coerce_i64().map_err(|_| ()), expected);
    }

    #[test_case(json!(true), Ok(true) ; "json true")]
    #[test_case(json!("false"), Ok(false) ; "string false")]
    #[test_case(json!("yes"), Err(()) ; "other word")]
    #[test_case(json!(1), Err(()) ; "number")]
    fn test_coerce_bool(value: Value, expected: Result<bool, ()>) {
        assert_eq!(value.coerce_bool().map_err(|_| ()), expected);
    }

    #[test]
    fn test_coerce_string_renders_scalars() {
        assert_eq!(json!("red").coerce_string().unwrap(), "red");
        assert_eq!(json!(12).coerce_string().unwrap(), "12");
        assert_eq!(json!(false).coerce_string().unwrap(), "false");
        assert!(json!({"a": 1}).coerce_string().is_err());
    }

    #[test]
    fn test_coerce_to_schema_type() {
        assert_eq!(json!("1.0").coerce_to("number").unwrap(), json!(1.0));
        assert_eq!(json!(1).coerce_to("number").unwrap(), json!(1));
        assert_eq!(json!("4").coerce_to("integer").unwrap(), json!(4));
        assert_eq!(json!("true").coerce_to("boolean").unwrap(), json!(true));
        assert_eq!(json!([1, 2]).coerce_to("array").unwrap(), json!([1, 2]));
        assert!(json!("x").coerce_to("number").is_err());
    }
}
