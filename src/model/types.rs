//! Static declared-type mapping: backend column type -> swagger type -> JSON type (+ format).
//! Every declared type used by a registered entity must appear here; lookups never fall back.

/// How values of a column are coerced on input and decoded on output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    Boolean,
    Integer,
    Decimal,
    Float,
    Text,
    Binary,
    Date,
    DateTime,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TypeMapping {
    pub declared: &'static str,
    pub swagger_type: &'static str,
    pub json_type: &'static str,
    pub format: Option<&'static str>,
    pub kind: ValueKind,
}

const fn mapping(
    declared: &'static str,
    swagger_type: &'static str,
    json_type: &'static str,
    format: Option<&'static str>,
    kind: ValueKind,
) -> TypeMapping {
    TypeMapping {
        declared,
        swagger_type,
        json_type,
        format,
        kind,
    }
}

pub static TYPE_MAPPINGS: &[TypeMapping] = &[
    mapping("BOOLEAN", "boolean", "boolean", Some("bool"), ValueKind::Boolean),
    mapping("INTEGER", "integer", "integer", None, ValueKind::Integer),
    mapping("SMALLINT", "integer", "integer", Some("int32"), ValueKind::Integer),
    mapping("BIGINT", "integer", "integer", Some("int64"), ValueKind::Integer),
    mapping("NUMERIC", "number", "number", Some("number"), ValueKind::Decimal),
    mapping("DECIMAL", "number", "number", Some("number"), ValueKind::Decimal),
    mapping("FLOAT", "number", "number", Some("float"), ValueKind::Float),
    mapping("REAL", "number", "number", Some("float"), ValueKind::Float),
    mapping("VARCHAR", "string", "string", None, ValueKind::Text),
    mapping("TEXT", "string", "string", None, ValueKind::Text),
    mapping("ENUM", "string", "string", None, ValueKind::Text),
    mapping("BLOB", "binary", "string", Some("binary"), ValueKind::Binary),
    mapping("BYTEA", "binary", "string", Some("binary"), ValueKind::Binary),
    mapping("BINARY", "binary", "string", Some("binary"), ValueKind::Binary),
    mapping("VARBINARY", "binary", "string", Some("binary"), ValueKind::Binary),
    mapping("DATE", "date", "string", Some("date"), ValueKind::Date),
    mapping("DATETIME", "date-time", "string", Some("date-time"), ValueKind::DateTime),
    mapping("TIMESTAMP", "date-time", "string", Some("date-time"), ValueKind::DateTime),
    mapping("INTERVAL", "date-time", "string", Some("date-time"), ValueKind::DateTime),
];

/// A declared type split into its base name and parenthesized parameters.
/// e.g. "VARCHAR(255)" -> ("VARCHAR", [255]), "NUMERIC(10, 2)" -> ("NUMERIC", [10, 2])
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeclaredType {
    pub base: String,
    pub params: Vec<u32>,
}

impl DeclaredType {
    pub fn parse(raw: &str) -> Self {
        let (base, rest) = match raw.split_once('(') {
            Some((base, rest)) => (base, Some(rest)),
            None => (raw, None),
        };
        let params = rest
            .map(|r| {
                r.trim_end()
                    .trim_end_matches(')')
                    .split(',')
                    .filter_map(|p| p.trim().parse().ok())
                    .collect()
            })
            .unwrap_or_default();
        DeclaredType {
            base: base.trim().to_uppercase(),
            params,
        }
    }

    /// Maximum length for sized string types (VARCHAR(n)).
    pub fn max_length(&self) -> Option<usize> {
        match self.base.as_str() {
            "VARCHAR" | "CHAR" => self.params.first().map(|n| *n as usize),
            _ => None,
        }
    }
}

/// Look up the mapping for a raw declared type, ignoring any length/precision suffix.
pub fn lookup(declared_type: &str) -> Option<&'static TypeMapping> {
    let parsed = DeclaredType::parse(declared_type);
    TYPE_MAPPINGS.iter().find(|m| m.declared == parsed.base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_length_suffix() {
        let parsed = DeclaredType::parse("VARCHAR(120)");
        assert_eq!(parsed.base, "VARCHAR");
        assert_eq!(parsed.max_length(), Some(120));
        assert_eq!(lookup("VARCHAR(120)").map(|m| m.json_type), Some("string"));
    }

    #[test]
    fn precision_params() {
        let parsed = DeclaredType::parse("numeric(10, 2)");
        assert_eq!(parsed.base, "NUMERIC");
        assert_eq!(parsed.params, vec![10, 2]);
        assert_eq!(parsed.max_length(), None);
    }

    #[test]
    fn numeric_is_number_with_format() {
        let m = lookup("NUMERIC").unwrap();
        assert_eq!(m.json_type, "number");
        assert_eq!(m.format, Some("number"));
    }

    #[test]
    fn boolean_carries_bool_format() {
        let m = lookup("BOOLEAN").unwrap();
        assert_eq!(m.json_type, "boolean");
        assert_eq!(m.format, Some("bool"));
    }

    #[test]
    fn unknown_type_has_no_mapping() {
        assert!(lookup("GEOMETRY").is_none());
    }
}
