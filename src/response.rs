//! JSON envelope for every response. Values pass through a closed set of encodable variants so
//! dates, decimals and bytes always serialize the same way.

use crate::error::AppError;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use base64::Engine as _;
use chrono::{NaiveDate, NaiveDateTime};
use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

#[derive(Clone, Debug, PartialEq)]
pub enum ScalarValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum DateLike {
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    /// Exact decimal digits, written as a JSON string.
    Decimal(String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Encodable {
    Scalar(ScalarValue),
    DateLike(DateLike),
    Collection(Vec<Encodable>),
    Record(Record),
}

/// Ordered field container; keys keep insertion order on the wire.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record(Vec<(String, Encodable)>);

impl Record {
    pub fn new() -> Self {
        Record(Vec::new())
    }

    pub fn get(&self, key: &str) -> Option<&Encodable> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Set a field, replacing it in place if present.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Encodable>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Encodable>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Integer id of a stored row, if present.
    pub fn id(&self) -> Option<i64> {
        match self.get("id") {
            Some(Encodable::Scalar(ScalarValue::Int(n))) => Some(*n),
            _ => None,
        }
    }
}

impl Encodable {
    pub fn null() -> Self {
        Encodable::Scalar(ScalarValue::Null)
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Encodable::Record(r) => Some(r),
            _ => None,
        }
    }
}

impl From<ScalarValue> for Encodable {
    fn from(v: ScalarValue) -> Self {
        Encodable::Scalar(v)
    }
}

impl From<DateLike> for Encodable {
    fn from(v: DateLike) -> Self {
        Encodable::DateLike(v)
    }
}

impl From<Record> for Encodable {
    fn from(v: Record) -> Self {
        Encodable::Record(v)
    }
}

impl From<Vec<Encodable>> for Encodable {
    fn from(v: Vec<Encodable>) -> Self {
        Encodable::Collection(v)
    }
}

impl From<Vec<Record>> for Encodable {
    fn from(v: Vec<Record>) -> Self {
        Encodable::Collection(v.into_iter().map(Encodable::Record).collect())
    }
}

impl From<i64> for Encodable {
    fn from(v: i64) -> Self {
        Encodable::Scalar(ScalarValue::Int(v))
    }
}

impl From<bool> for Encodable {
    fn from(v: bool) -> Self {
        Encodable::Scalar(ScalarValue::Bool(v))
    }
}

impl From<&str> for Encodable {
    fn from(v: &str) -> Self {
        Encodable::Scalar(ScalarValue::Text(v.to_string()))
    }
}

impl From<String> for Encodable {
    fn from(v: String) -> Self {
        Encodable::Scalar(ScalarValue::Text(v))
    }
}

impl From<serde_json::Value> for Encodable {
    fn from(v: serde_json::Value) -> Self {
        use serde_json::Value;
        match v {
            Value::Null => Encodable::null(),
            Value::Bool(b) => b.into(),
            Value::Number(n) => match n.as_i64() {
                Some(i) => i.into(),
                None => Encodable::Scalar(ScalarValue::Float(n.as_f64().unwrap_or(f64::NAN))),
            },
            Value::String(s) => s.into(),
            Value::Array(items) => Encodable::Collection(items.into_iter().map(Encodable::from).collect()),
            Value::Object(map) => {
                let mut record = Record::new();
                for (k, v) in map {
                    record.insert(k, Encodable::from(v));
                }
                Encodable::Record(record)
            }
        }
    }
}

impl Serialize for ScalarValue {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            ScalarValue::Null => s.serialize_unit(),
            ScalarValue::Bool(b) => s.serialize_bool(*b),
            ScalarValue::Int(n) => s.serialize_i64(*n),
            ScalarValue::Float(f) if f.is_finite() => s.serialize_f64(*f),
            ScalarValue::Float(f) => Err(S::Error::custom(format!("non-finite float {}", f))),
            ScalarValue::Text(t) => s.serialize_str(t),
            ScalarValue::Bytes(b) => s.serialize_str(&base64::engine::general_purpose::STANDARD.encode(b)),
        }
    }
}

impl Serialize for DateLike {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            DateLike::Date(d) => s.serialize_str(&d.format("%Y-%m-%d").to_string()),
            DateLike::DateTime(dt) => s.serialize_str(&dt.format("%Y-%m-%dT%H:%M:%S").to_string()),
            DateLike::Decimal(raw) => s.serialize_str(raw),
        }
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let mut map = s.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl Serialize for Encodable {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            Encodable::Scalar(v) => v.serialize(s),
            Encodable::DateLike(v) => v.serialize(s),
            Encodable::Collection(items) => {
                let mut seq = s.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Encodable::Record(r) => r.serialize(s),
        }
    }
}

/// Serialize `body` and wrap it with the JSON and CORS headers.
pub fn envelope(status: StatusCode, body: &Encodable) -> Result<Response, AppError> {
    let bytes = serde_json::to_vec(body).map_err(|e| AppError::Serialization(e.to_string()))?;
    Ok(json_response(status, bytes))
}

/// Same as [`envelope`] for any serde value (site routes, swagger document).
pub fn envelope_json<T: Serialize>(status: StatusCode, body: &T) -> Result<Response, AppError> {
    let bytes = serde_json::to_vec(body).map_err(|e| AppError::Serialization(e.to_string()))?;
    Ok(json_response(status, bytes))
}

pub fn json_response(status: StatusCode, bytes: Vec<u8>) -> Response {
    (
        status,
        [
            (header::CONTENT_TYPE, JSON_CONTENT_TYPE),
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        ],
        bytes,
    )
        .into_response()
}

pub fn no_content() -> Response {
    (StatusCode::NO_CONTENT, [(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")]).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn to_json(e: &Encodable) -> serde_json::Value {
        serde_json::from_slice(&serde_json::to_vec(e).unwrap()).unwrap()
    }

    #[test]
    fn date_like_values_use_string_forms() {
        let date = NaiveDate::from_ymd_opt(2017, 1, 15).unwrap();
        let record = Record::new()
            .with("date", DateLike::Date(date))
            .with("stamp", DateLike::DateTime(date.and_hms_opt(9, 30, 0).unwrap()))
            .with("close", DateLike::Decimal("152.25".into()));
        assert_eq!(
            to_json(&record.into()),
            json!({"date": "2017-01-15", "stamp": "2017-01-15T09:30:00", "close": "152.25"})
        );
    }

    #[test]
    fn bytes_are_base64() {
        let v = Encodable::Scalar(ScalarValue::Bytes(b"hi".to_vec()));
        assert_eq!(to_json(&v), json!("aGk="));
    }

    #[test]
    fn non_finite_float_is_serialization_error() {
        let v = Encodable::Scalar(ScalarValue::Float(f64::INFINITY));
        let err = envelope(StatusCode::OK, &v).unwrap_err();
        assert!(matches!(err, AppError::Serialization(_)));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn decimals_are_never_rounded() {
        let v = Encodable::DateLike(DateLike::Decimal("123456789012345678.25".into()));
        assert_eq!(serde_json::to_string(&v).unwrap(), r#""123456789012345678.25""#);
    }

    #[test]
    fn record_keeps_insertion_order_and_replaces_in_place() {
        let mut r = Record::new().with("b", 1i64).with("a", 2i64);
        r.insert("b", 3i64);
        assert_eq!(r.keys().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(serde_json::to_string(&r).unwrap(), r#"{"b":3,"a":2}"#);
    }

    #[test]
    fn envelope_sets_headers() {
        let res = envelope(StatusCode::CREATED, &Record::new().into()).unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        assert_eq!(res.headers()[header::CONTENT_TYPE], JSON_CONTENT_TYPE);
        assert_eq!(res.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }
}
