//! Value coercion from raw tabular cells into typed column values.
//!
//! [`coerce`] is total: it never panics and never errors. Invalid or
//! unrecognizable input degrades to a typed NULL for the target column, so
//! a bad cell empties one field instead of sinking the whole row.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::Value as Json;
use uuid::Uuid;

use crate::temporal;

// ---------------------------------------------------------------------------
// Scalar
// ---------------------------------------------------------------------------

/// A typed, nullable value ready to bind against a database column.
///
/// Every variant carries an `Option` so a failed coercion can degrade to a
/// NULL that still has the column's type.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Text(Option<String>),
    Integer(Option<i64>),
    Decimal(Option<Decimal>),
    Boolean(Option<bool>),
    Date(Option<NaiveDate>),
    Timestamp(Option<DateTime<Utc>>),
    Uuid(Option<Uuid>),
}

impl Scalar {
    /// A typed NULL for the given database column type.
    pub fn null_for(db_type: &str) -> Self {
        match TypeFamily::classify(db_type) {
            TypeFamily::Uuid => Self::Uuid(None),
            TypeFamily::Integer => Self::Integer(None),
            TypeFamily::Decimal => Self::Decimal(None),
            TypeFamily::Boolean => Self::Boolean(None),
            TypeFamily::Date => Self::Date(None),
            TypeFamily::Timestamp => Self::Timestamp(None),
            TypeFamily::Text => Self::Text(None),
        }
    }

    pub fn is_null(&self) -> bool {
        match self {
            Self::Text(v) => v.is_none(),
            Self::Integer(v) => v.is_none(),
            Self::Decimal(v) => v.is_none(),
            Self::Boolean(v) => v.is_none(),
            Self::Date(v) => v.is_none(),
            Self::Timestamp(v) => v.is_none(),
            Self::Uuid(v) => v.is_none(),
        }
    }
}

// ---------------------------------------------------------------------------
// Column type families
// ---------------------------------------------------------------------------

/// Database column type families the coercion engine distinguishes.
///
/// Declared types come from `information_schema` (`"bigint"`, `"numeric"`,
/// `"timestamp with time zone"`, …) and are matched loosely so dialect
/// spellings all land in the right family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TypeFamily {
    Uuid,
    Integer,
    Decimal,
    Boolean,
    Date,
    Timestamp,
    Text,
}

impl TypeFamily {
    fn classify(db_type: &str) -> Self {
        let t = db_type.trim().to_ascii_lowercase();
        if t.contains("uuid") {
            Self::Uuid
        } else if t.contains("int") {
            Self::Integer
        } else if t.contains("numeric")
            || t.contains("decimal")
            || t.contains("real")
            || t.contains("double")
            || t.contains("money")
        {
            Self::Decimal
        } else if t.contains("bool") {
            Self::Boolean
        } else if t.contains("timestamp") {
            Self::Timestamp
        } else if t == "date" {
            Self::Date
        } else {
            Self::Text
        }
    }
}

// ---------------------------------------------------------------------------
// Coercion
// ---------------------------------------------------------------------------

/// Coerce a raw cell into the semantic type required by a target column.
///
/// Empty and whitespace-only input yields a typed NULL. Identifier columns
/// require the canonical hex-grouped UUID shape. Numeric columns strip
/// thousands separators and currency symbols and read parenthesized values
/// as negatives (accounting convention). Bare `YYYY-MM-DD` dates are
/// anchored at UTC midnight to avoid off-by-one-day shifts; all other
/// temporal text goes through [`temporal`]. Unrecognized declared types
/// pass the value through as text.
pub fn coerce(raw: &Json, db_type: &str) -> Scalar {
    let family = TypeFamily::classify(db_type);
    match raw {
        Json::Null => Scalar::null_for(db_type),
        Json::String(s) => coerce_text(s, family, db_type),
        Json::Number(n) => coerce_number(n, family),
        Json::Bool(b) => coerce_bool(*b, family, db_type),
        // Arrays/objects have no place in a tabular cell.
        _ => Scalar::null_for(db_type),
    }
}

fn coerce_text(s: &str, family: TypeFamily, db_type: &str) -> Scalar {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Scalar::null_for(db_type);
    }
    match family {
        TypeFamily::Uuid => Scalar::Uuid(Uuid::parse_str(trimmed).ok()),
        TypeFamily::Integer => Scalar::Integer(parse_integer(trimmed)),
        TypeFamily::Decimal => Scalar::Decimal(parse_decimal(trimmed)),
        TypeFamily::Boolean => Scalar::Boolean(parse_boolean(trimmed)),
        TypeFamily::Date => Scalar::Date(parse_anchored_date(trimmed)),
        TypeFamily::Timestamp => Scalar::Timestamp(parse_anchored_timestamp(trimmed)),
        TypeFamily::Text => Scalar::Text(Some(trimmed.to_string())),
    }
}

fn coerce_number(n: &serde_json::Number, family: TypeFamily) -> Scalar {
    match family {
        TypeFamily::Integer => Scalar::Integer(
            n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        ),
        TypeFamily::Decimal => Scalar::Decimal(
            n.as_i64()
                .map(Decimal::from)
                .or_else(|| n.as_f64().and_then(Decimal::from_f64)),
        ),
        TypeFamily::Boolean => Scalar::Boolean(match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        }),
        // Spreadsheet exports routinely ship temporal cells as serials.
        TypeFamily::Date => Scalar::Date(n.as_f64().and_then(temporal::date_from_serial)),
        TypeFamily::Timestamp => {
            Scalar::Timestamp(n.as_f64().and_then(|f| temporal::parse_timestamp(&f.to_string())))
        }
        TypeFamily::Text => Scalar::Text(Some(n.to_string())),
        TypeFamily::Uuid => Scalar::Uuid(None),
    }
}

fn coerce_bool(b: bool, family: TypeFamily, db_type: &str) -> Scalar {
    match family {
        TypeFamily::Boolean => Scalar::Boolean(Some(b)),
        TypeFamily::Integer => Scalar::Integer(Some(i64::from(b))),
        TypeFamily::Text => Scalar::Text(Some(b.to_string())),
        _ => Scalar::null_for(db_type),
    }
}

// ---------------------------------------------------------------------------
// Parsers
// ---------------------------------------------------------------------------

/// Currency symbols stripped before numeric parsing.
const CURRENCY_SYMBOLS: &[char] = &['₹', '$', '€', '£', '¥'];

/// Strip separators/symbols and resolve the accounting-negative convention.
/// Returns `None` when nothing numeric remains.
fn clean_numeric(raw: &str) -> Option<String> {
    let mut text = raw.trim();
    let mut negative = false;
    if text.starts_with('(') && text.ends_with(')') && text.len() >= 2 {
        negative = true;
        text = &text[1..text.len() - 1];
    }
    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',' && !CURRENCY_SYMBOLS.contains(c))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    Some(if negative {
        format!("-{cleaned}")
    } else {
        cleaned
    })
}

fn parse_integer(raw: &str) -> Option<i64> {
    let cleaned = clean_numeric(raw)?;
    cleaned
        .parse::<i64>()
        .ok()
        .or_else(|| cleaned.parse::<f64>().ok().map(|f| f.trunc() as i64))
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    clean_numeric(raw)?.parse::<Decimal>().ok()
}

fn parse_boolean(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => Some(true),
        "false" | "0" | "no" | "n" => Some(false),
        _ => None,
    }
}

fn is_bare_iso_date(text: &str) -> bool {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok()
}

fn parse_anchored_date(text: &str) -> Option<NaiveDate> {
    if is_bare_iso_date(text) {
        // Already timezone-free; parse directly rather than via an
        // instant that a local-zone interpretation could shift by a day.
        return NaiveDate::parse_from_str(text, "%Y-%m-%d").ok();
    }
    temporal::parse_date(text)
}

fn parse_anchored_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if is_bare_iso_date(text) {
        let date = NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()?;
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }
    temporal::parse_timestamp(text)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    // -- numeric coercion -----------------------------------------------------

    #[test]
    fn currency_with_thousands_separator() {
        assert_eq!(
            coerce(&json!("₹1,200.50"), "numeric"),
            Scalar::Decimal(Some(dec("1200.50")))
        );
    }

    #[test]
    fn parenthesized_is_negative() {
        assert_eq!(
            coerce(&json!("(500)"), "numeric"),
            Scalar::Decimal(Some(dec("-500")))
        );
    }

    #[test]
    fn empty_string_is_typed_null() {
        assert_eq!(coerce(&json!(""), "numeric"), Scalar::Decimal(None));
        assert_eq!(coerce(&json!("   "), "bigint"), Scalar::Integer(None));
    }

    #[test]
    fn non_numeric_degrades_to_null() {
        assert_eq!(coerce(&json!("n/a"), "numeric"), Scalar::Decimal(None));
    }

    #[test]
    fn integer_from_decimal_text_truncates() {
        assert_eq!(
            coerce(&json!("1,200.50"), "integer"),
            Scalar::Integer(Some(1200))
        );
    }

    #[test]
    fn json_number_into_decimal_column() {
        assert_eq!(
            coerce(&json!(42), "numeric"),
            Scalar::Decimal(Some(dec("42")))
        );
    }

    // -- identifier coercion --------------------------------------------------

    #[test]
    fn uuid_shape_accepted() {
        let id = "550e8400-e29b-41d4-a716-446655440000";
        assert_eq!(
            coerce(&json!(id), "uuid"),
            Scalar::Uuid(Some(Uuid::parse_str(id).unwrap()))
        );
    }

    #[test]
    fn non_uuid_identifier_is_null() {
        assert_eq!(coerce(&json!("SKU-123"), "uuid"), Scalar::Uuid(None));
    }

    // -- boolean coercion -----------------------------------------------------

    #[test]
    fn boolean_tokens() {
        for truthy in ["true", "1", "yes", "Y", "YES"] {
            assert_eq!(
                coerce(&json!(truthy), "boolean"),
                Scalar::Boolean(Some(true)),
                "{truthy}"
            );
        }
        for falsy in ["false", "0", "no", "n"] {
            assert_eq!(
                coerce(&json!(falsy), "boolean"),
                Scalar::Boolean(Some(false)),
                "{falsy}"
            );
        }
        assert_eq!(coerce(&json!("maybe"), "boolean"), Scalar::Boolean(None));
    }

    // -- temporal coercion ----------------------------------------------------

    #[test]
    fn bare_iso_date_anchored_at_utc_midnight() {
        let ts = match coerce(&json!("2024-09-21"), "timestamp with time zone") {
            Scalar::Timestamp(Some(ts)) => ts,
            other => panic!("expected timestamp, got {other:?}"),
        };
        assert_eq!(ts.to_rfc3339(), "2024-09-21T00:00:00+00:00");
    }

    #[test]
    fn day_first_date_into_date_column() {
        assert_eq!(
            coerce(&json!("21/09/2024"), "date"),
            Scalar::Date(NaiveDate::from_ymd_opt(2024, 9, 21))
        );
    }

    #[test]
    fn serial_number_into_date_column() {
        assert_eq!(
            coerce(&json!(45000), "date"),
            Scalar::Date(NaiveDate::from_ymd_opt(2023, 3, 15))
        );
    }

    #[test]
    fn garbage_date_is_null() {
        assert_eq!(coerce(&json!("soon"), "date"), Scalar::Date(None));
    }

    // -- passthrough ----------------------------------------------------------

    #[test]
    fn unknown_type_passes_text_through() {
        assert_eq!(
            coerce(&json!("as-is"), "character varying"),
            Scalar::Text(Some("as-is".to_string()))
        );
    }

    #[test]
    fn json_null_is_typed_null() {
        assert_eq!(coerce(&Json::Null, "uuid"), Scalar::Uuid(None));
    }

    #[test]
    fn null_for_matches_family() {
        assert!(Scalar::null_for("timestamp with time zone").is_null());
        assert_eq!(Scalar::null_for("bigint"), Scalar::Integer(None));
        assert_eq!(Scalar::null_for("text"), Scalar::Text(None));
    }
}
