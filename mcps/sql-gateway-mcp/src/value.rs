//! Database values and their canonical display form

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Timelike};
use std::fmt;

/// A single database value, tagged at the database boundary
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    DateTimeTz(DateTime<FixedOffset>),
}

/// Format a value for display.
///
/// `NULL` for nulls, ISO-8601 for temporal values, the plain string form
/// for everything else. Never fails.
pub fn format_value(value: &SqlValue) -> String {
    match value {
        SqlValue::Null => "NULL".to_string(),
        SqlValue::Integer(i) => i.to_string(),
        SqlValue::Real(f) => format_real(*f),
        SqlValue::Text(s) => s.clone(),
        SqlValue::Blob(b) => format!("<blob {} bytes>", b.len()),
        SqlValue::Date(d) => d.format("%Y-%m-%d").to_string(),
        SqlValue::DateTime(dt) => dt.format(time_format(dt.nanosecond(), false)).to_string(),
        SqlValue::DateTimeTz(dt) => dt.format(time_format(dt.nanosecond(), true)).to_string(),
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_value(self))
    }
}

/// Microseconds only when present, offset only when carried
fn time_format(nanos: u32, with_offset: bool) -> &'static str {
    match (nanos / 1_000 == 0, with_offset) {
        (true, false) => "%Y-%m-%dT%H:%M:%S",
        (false, false) => "%Y-%m-%dT%H:%M:%S%.6f",
        (true, true) => "%Y-%m-%dT%H:%M:%S%:z",
        (false, true) => "%Y-%m-%dT%H:%M:%S%.6f%:z",
    }
}

/// Shortest round-trip float text: `1.0`, `0.5`, `1e+20`, `1.5e-05`
fn format_real(f: f64) -> String {
    if f.is_nan() {
        return "nan".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let abs = f.abs();
    if abs != 0.0 && !(1e-4..1e16).contains(&abs) {
        let sci = format!("{:e}", f);
        return match sci.split_once('e') {
            Some((mantissa, exp)) => {
                let (sign, digits) = match exp.strip_prefix('-') {
                    Some(digits) => ('-', digits),
                    None => ('+', exp),
                };
                format!("{}e{}{:0>2}", mantissa, sign, digits)
            }
            None => sci,
        };
    }

    if f.fract() == 0.0 {
        format!("{:.1}", f)
    } else {
        f.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    #[test]
    fn test_null_renders_literal() {
        assert_eq!(format_value(&SqlValue::Null), "NULL");
    }

    #[test]
    fn test_date_is_iso() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(format_value(&SqlValue::Date(date)), "2024-01-05");
    }

    #[test]
    fn test_datetime_keeps_precision() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let whole = date.and_time(NaiveTime::from_hms_opt(10, 30, 0).unwrap());
        assert_eq!(
            format_value(&SqlValue::DateTime(whole)),
            "2024-01-05T10:30:00"
        );

        let micros = date.and_time(NaiveTime::from_hms_micro_opt(10, 30, 0, 123456).unwrap());
        assert_eq!(
            format_value(&SqlValue::DateTime(micros)),
            "2024-01-05T10:30:00.123456"
        );
    }

    #[test]
    fn test_datetime_with_offset() {
        let dt = DateTime::parse_from_rfc3339("2024-01-05T10:30:00+02:00").unwrap();
        assert_eq!(
            format_value(&SqlValue::DateTimeTz(dt)),
            "2024-01-05T10:30:00+02:00"
        );
    }

    #[test]
    fn test_scalars() {
        assert_eq!(format_value(&SqlValue::Integer(-42)), "-42");
        assert_eq!(format_value(&SqlValue::Text("Alice".into())), "Alice");
        assert_eq!(format_value(&SqlValue::Blob(vec![0; 16])), "<blob 16 bytes>");
    }

    #[test]
    fn test_reals() {
        assert_eq!(format_value(&SqlValue::Real(1.0)), "1.0");
        assert_eq!(format_value(&SqlValue::Real(2.5)), "2.5");
        assert_eq!(format_value(&SqlValue::Real(-0.1)), "-0.1");
        assert_eq!(format_value(&SqlValue::Real(0.0)), "0.0");
        assert_eq!(format_value(&SqlValue::Real(1e20)), "1e+20");
        assert_eq!(format_value(&SqlValue::Real(1.5e-5)), "1.5e-05");
        assert_eq!(format_value(&SqlValue::Real(f64::INFINITY)), "inf");
        assert_eq!(format_value(&SqlValue::Real(f64::NAN)), "nan");
    }
}
