//! Payload validation: coerce JSON values into bindable values by each column's declared kind.

use crate::error::{AppError, FieldErrors};
use crate::model::{ColumnDescriptor, TableDescriptor, ValueKind};
use crate::sql::SqlValue;
use base64::Engine as _;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::str::FromStr;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%y", "%m/%d/%Y"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

pub struct RequestValidator;

impl RequestValidator {
    /// Validate a create payload. Every required column must be present and non-null.
    pub fn validate(table: &TableDescriptor, body: &Map<String, Value>) -> Result<Vec<(String, SqlValue)>, AppError> {
        let mut errors = FieldErrors::default();
        for col in table.stored_columns().filter(|c| c.is_required) {
            if body.get(&col.name).map_or(true, Value::is_null) {
                errors.add(&col.name, format!("{} is required", col.name));
            }
        }
        let values = Self::coerce_fields(table, body, &mut errors);
        errors.into_result()?;
        Ok(values)
    }

    /// Validate only the fields present in body (for PATCH).
    pub fn validate_partial(
        table: &TableDescriptor,
        body: &Map<String, Value>,
    ) -> Result<Vec<(String, SqlValue)>, AppError> {
        let mut errors = FieldErrors::default();
        let values = Self::coerce_fields(table, body, &mut errors);
        errors.into_result()?;
        Ok(values)
    }

    fn coerce_fields(table: &TableDescriptor, body: &Map<String, Value>, errors: &mut FieldErrors) -> Vec<(String, SqlValue)> {
        let mut values = Vec::with_capacity(body.len());
        for (key, v) in body {
            let Some(col) = table.column(key) else {
                errors.add(key, format!("unknown column for {}", table.table_name));
                continue;
            };
            if col.is_primary() || col.is_computed() {
                errors.add(key, format!("{} is read-only", key));
                continue;
            }
            if col.is_relationship() {
                errors.add(key, "relationships cannot be set here");
                continue;
            }
            if v.is_null() {
                if col.nullable {
                    values.push((key.clone(), SqlValue::Null));
                } else if !col.is_required {
                    // falls back to the store default
                } else {
                    errors.add(key, format!("{} may not be null", key));
                }
                continue;
            }
            match coerce(col, v) {
                Ok(sql) => values.push((key.clone(), sql)),
                Err(msg) => errors.add(key, msg),
            }
        }
        values
    }
}

/// Coerce one non-null JSON value for `col`. Errors are field-level messages.
pub fn coerce(col: &ColumnDescriptor, v: &Value) -> Result<SqlValue, String> {
    let kind = col
        .type_mapping()
        .map(|m| m.kind)
        .ok_or_else(|| format!("{} has no value type", col.name))?;
    if v.is_null() {
        return Ok(SqlValue::Null);
    }
    match kind {
        ValueKind::Boolean => match v {
            Value::Bool(b) => Ok(SqlValue::Int(*b as i64)),
            Value::Number(n) if n.as_i64() == Some(0) || n.as_i64() == Some(1) => {
                Ok(SqlValue::Int(n.as_i64().unwrap_or_default()))
            }
            _ => Err("must be a boolean".into()),
        },
        ValueKind::Integer => match v {
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => Ok(SqlValue::Int(i)),
                (None, Some(f)) if f.is_finite() && f.fract() != 0.0 => Err("must be an integer".into()),
                // 2^63 is exactly representable; anything at or beyond it overflows.
                (None, Some(f)) if f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
                    Ok(SqlValue::Int(f as i64))
                }
                _ => Err("is out of range for a 64-bit integer".into()),
            },
            _ => Err("must be an integer".into()),
        },
        ValueKind::Decimal => match v {
            Value::Number(n) => parse_decimal(&n.to_string()),
            Value::String(s) => parse_decimal(s),
            _ => None,
        }
        .map(|d| SqlValue::Text(d.to_string()))
        .ok_or_else(|| "must be a decimal number".to_string()),
        ValueKind::Float => match v {
            Value::Number(n) => n.as_f64().map(SqlValue::Real).ok_or_else(|| "must be a number".into()),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(SqlValue::Real)
                .ok_or_else(|| "must be a number".into()),
            _ => Err("must be a number".into()),
        },
        ValueKind::Text => match v {
            Value::String(s) => {
                if let Some(max) = col.max_length() {
                    if s.chars().count() > max {
                        return Err(format!("must be at most {} characters", max));
                    }
                }
                Ok(SqlValue::Text(s.clone()))
            }
            _ => Err("must be a string".into()),
        },
        ValueKind::Binary => match v {
            Value::String(s) => base64::engine::general_purpose::STANDARD
                .decode(s)
                .map(SqlValue::Blob)
                .map_err(|_| "must be base64 encoded".into()),
            _ => Err("must be a base64 string".into()),
        },
        ValueKind::Date => v
            .as_str()
            .and_then(parse_date)
            .map(|d| SqlValue::Text(d.format("%Y-%m-%d").to_string()))
            .ok_or_else(|| "must be a date".into()),
        ValueKind::DateTime => v
            .as_str()
            .and_then(parse_datetime)
            .map(|dt| SqlValue::Text(dt.format("%Y-%m-%d %H:%M:%S").to_string()))
            .ok_or_else(|| "must be a datetime".into()),
    }
}

/// Exact decimal from plain or scientific notation.
pub fn parse_decimal(s: &str) -> Option<Decimal> {
    let s = s.trim();
    Decimal::from_str(s).or_else(|_| Decimal::from_scientific(s)).ok()
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
        .or_else(|| parse_datetime(s).map(|dt| dt.date()))
}

pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::discover_tables;
    use serde_json::json;

    fn body(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn coerces_by_kind() {
        let registry = discover_tables().unwrap();
        let event = registry.get("event").unwrap();
        let values = RequestValidator::validate(
            event,
            &body(json!({"type_id": 1, "commodity_id": 3, "currency_id": 3, "value": 100, "date": "1/22/12"})),
        )
        .unwrap();
        assert!(values.contains(&("date".into(), SqlValue::Text("2012-01-22".into()))));
        assert!(values.contains(&("value".into(), SqlValue::Text("100".into()))));
        assert!(values.contains(&("type_id".into(), SqlValue::Int(1))));
    }

    #[test]
    fn booleans_accept_zero_and_one() {
        let registry = discover_tables().unwrap();
        let t = registry.get("account_type").unwrap();
        let values = RequestValidator::validate(t, &body(json!({"name": "Brokerage", "is_tax_deferred": 0}))).unwrap();
        assert!(values.contains(&("is_tax_deferred".into(), SqlValue::Int(0))));
        let err = RequestValidator::validate(t, &body(json!({"name": "Roth", "is_tax_deferred": "no"}))).unwrap_err();
        assert!(matches!(err, AppError::Validation(f) if f.0.contains_key("is_tax_deferred")));
    }

    #[test]
    fn collects_field_errors() {
        let registry = discover_tables().unwrap();
        let t = registry.get("exchange").unwrap();
        let err = RequestValidator::validate(
            t,
            &body(json!({"symbol": "WAY-TOO-LONG-SYMBOL", "bogus": 1, "id": 9})),
        )
        .unwrap_err();
        let AppError::Validation(fields) = err else { panic!("expected validation error") };
        assert_eq!(fields.0["name"], "name is required");
        assert_eq!(fields.0["symbol"], "must be at most 12 characters");
        assert!(fields.0.contains_key("bogus"));
        assert_eq!(fields.0["id"], "id is read-only");
    }

    #[test]
    fn partial_skips_required() {
        let registry = discover_tables().unwrap();
        let t = registry.get("exchange").unwrap();
        let values = RequestValidator::validate_partial(t, &body(json!({"symbol": "NYSE"}))).unwrap();
        assert_eq!(values, vec![("symbol".to_string(), SqlValue::Text("NYSE".into()))]);
    }

    #[test]
    fn computed_columns_are_read_only() {
        let registry = discover_tables().unwrap();
        let t = registry.get("person").unwrap();
        let err = RequestValidator::validate_partial(t, &body(json!({"full_name": "A B"}))).unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn datetime_formats() {
        assert!(parse_datetime("2017-01-15T09:30:00Z").is_some());
        assert!(parse_datetime("2017-01-15 09:30:00").is_some());
        assert_eq!(
            parse_datetime("2017-01-15").map(|d| d.to_string()),
            Some("2017-01-15 00:00:00".into())
        );
        assert!(parse_date("15 Jan").is_none());
    }

    #[test]
    fn decimals_keep_their_digits() {
        let registry = discover_tables().unwrap();
        let close = registry.get("price").unwrap().column("close").unwrap();
        assert_eq!(
            coerce(close, &json!("123456789012345678.25")),
            Ok(SqlValue::Text("123456789012345678.25".into()))
        );
        assert_eq!(coerce(close, &json!(0.11)), Ok(SqlValue::Text("0.11".into())));
        assert!(coerce(close, &json!("1.5e3")).is_ok());
        assert!(coerce(close, &json!("12,5")).is_err());
    }

    #[test]
    fn integers_reject_fractions_and_overflow() {
        let registry = discover_tables().unwrap();
        let type_id = registry.get("commodity").unwrap().column("type_id").unwrap();
        assert_eq!(coerce(type_id, &json!(3.0)), Ok(SqlValue::Int(3)));
        assert_eq!(coerce(type_id, &json!(2.5)), Err("must be an integer".to_string()));
        assert_eq!(
            coerce(type_id, &json!(18446744073709551615u64)),
            Err("is out of range for a 64-bit integer".to_string())
        );
        assert!(coerce(type_id, &json!(1e300)).is_err());

        let t = registry.get("commodity").unwrap();
        let err = RequestValidator::validate_partial(t, &body(json!({"type_id": 1e19}))).unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::UNPROCESSABLE_ENTITY);
    }
}
