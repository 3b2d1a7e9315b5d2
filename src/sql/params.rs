//! Bindable SQLite values and row decoding into response records.

use crate::error::AppError;
use crate::model::{TableDescriptor, ValueKind};
use crate::response::{DateLike, Encodable, Record, ScalarValue};
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::encode::{Encode, IsNull};
use sqlx::sqlite::{Sqlite, SqliteRow, SqliteTypeInfo};
use sqlx::{Column, Database, Row, TypeInfo, ValueRef};

/// A value bound to a SQLite statement. Produced by validation; never built from raw JSON.
#[derive(Clone, Debug, PartialEq)]
pub enum SqlValue {
    Null,
    Int(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl<'q> Encode<'q, Sqlite> for SqlValue {
    fn encode_by_ref(
        &self,
        buf: &mut <Sqlite as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        match self {
            SqlValue::Null => <Option<i64> as Encode<Sqlite>>::encode_by_ref(&None, buf),
            SqlValue::Int(n) => <i64 as Encode<Sqlite>>::encode_by_ref(n, buf),
            SqlValue::Real(f) => <f64 as Encode<Sqlite>>::encode_by_ref(f, buf),
            SqlValue::Text(s) => <String as Encode<Sqlite>>::encode_by_ref(s, buf),
            SqlValue::Blob(b) => <Vec<u8> as Encode<Sqlite>>::encode_by_ref(b, buf),
        }
    }
}

impl sqlx::Type<Sqlite> for SqlValue {
    fn type_info() -> SqliteTypeInfo {
        <str as sqlx::Type<Sqlite>>::type_info()
    }

    fn compatible(_ty: &SqliteTypeInfo) -> bool {
        true
    }
}

/// Storage-level value as SQLite hands it back.
enum Stored {
    Null,
    Int(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

fn read_stored(row: &SqliteRow, index: usize) -> Result<Stored, AppError> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Stored::Null);
    }
    let storage = raw.type_info().name().to_string();
    Ok(match storage.as_str() {
        "INTEGER" | "BOOLEAN" => Stored::Int(row.try_get(index)?),
        "REAL" => Stored::Real(row.try_get(index)?),
        "BLOB" => Stored::Blob(row.try_get(index)?),
        _ => Stored::Text(row.try_get(index)?),
    })
}

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
}

/// Interpret a stored value through the column's declared kind. Unknown kinds keep the
/// storage shape.
fn to_encodable(stored: Stored, kind: Option<ValueKind>) -> Encodable {
    use ValueKind::*;
    match (stored, kind) {
        (Stored::Null, _) => Encodable::null(),
        (Stored::Int(n), Some(Boolean)) => ScalarValue::Bool(n != 0).into(),
        (Stored::Int(n), Some(Decimal)) => DateLike::Decimal(n.to_string()).into(),
        (Stored::Real(f), Some(Decimal)) => DateLike::Decimal(f.to_string()).into(),
        (Stored::Text(s), Some(Decimal)) => DateLike::Decimal(s).into(),
        (Stored::Int(n), Some(Float)) => ScalarValue::Float(n as f64).into(),
        (Stored::Text(s), Some(Date)) => match NaiveDate::parse_from_str(&s, "%Y-%m-%d") {
            Ok(d) => DateLike::Date(d).into(),
            Err(_) => match parse_datetime(&s) {
                Some(dt) => DateLike::Date(dt.date()).into(),
                None => ScalarValue::Text(s).into(),
            },
        },
        (Stored::Text(s), Some(DateTime)) => match parse_datetime(&s) {
            Some(dt) => DateLike::DateTime(dt).into(),
            None => ScalarValue::Text(s).into(),
        },
        (Stored::Int(n), _) => ScalarValue::Int(n).into(),
        (Stored::Real(f), _) => ScalarValue::Float(f).into(),
        (Stored::Text(s), _) => ScalarValue::Text(s).into(),
        (Stored::Blob(b), _) => ScalarValue::Bytes(b).into(),
    }
}

/// Decode one result row of `table`; columns are matched by name.
pub fn decode_row(table: &TableDescriptor, row: &SqliteRow) -> Result<Record, AppError> {
    let mut record = Record::new();
    for (i, col) in row.columns().iter().enumerate() {
        let kind = table
            .column(col.name())
            .and_then(|c| c.type_mapping())
            .map(|m| m.kind);
        record.insert(col.name(), to_encodable(read_stored(row, i)?, kind));
    }
    Ok(record)
}

/// Decode a single cell with an explicit kind (aggregates, counts).
pub fn decode_cell(row: &SqliteRow, index: usize, kind: Option<ValueKind>) -> Result<Encodable, AppError> {
    Ok(to_encodable(read_stored(row, index)?, kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_and_boolean_follow_kind() {
        assert_eq!(
            to_encodable(Stored::Real(152.25), Some(ValueKind::Decimal)),
            DateLike::Decimal("152.25".into()).into()
        );
        assert_eq!(
            to_encodable(Stored::Int(1), Some(ValueKind::Boolean)),
            ScalarValue::Bool(true).into()
        );
        assert_eq!(to_encodable(Stored::Int(7), None), ScalarValue::Int(7).into());
        assert_eq!(
            to_encodable(Stored::Text("123456789012345678.25".into()), Some(ValueKind::Decimal)),
            DateLike::Decimal("123456789012345678.25".into()).into()
        );
    }

    #[test]
    fn stored_timestamps_become_dates() {
        let stamp = to_encodable(Stored::Text("2017-01-15 09:30:00".into()), Some(ValueKind::DateTime));
        let expected = NaiveDate::from_ymd_opt(2017, 1, 15).unwrap().and_hms_opt(9, 30, 0).unwrap();
        assert_eq!(stamp, DateLike::DateTime(expected).into());

        let date = to_encodable(Stored::Text("2017-01-15".into()), Some(ValueKind::Date));
        assert_eq!(date, DateLike::Date(expected.date()).into());

        let junk = to_encodable(Stored::Text("soon".into()), Some(ValueKind::Date));
        assert_eq!(junk, ScalarValue::Text("soon".into()).into());
    }
}
