//! Scalar value model and string coercion.
//!
//! Resolved configuration values are strings. Typed lookups convert them
//! through a closed set of kinds, one coercion routine per kind. There is no
//! open-ended conversion: a Rust type takes part only by implementing
//! [`ConfigScalar`].

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Target type tag for coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Bool,
    Int16,
    Int32,
    Int64,
    Decimal,
    Double,
    DateTime,
    String,
}

impl ValueKind {
    pub const ALL: [ValueKind; 8] = [
        ValueKind::Bool,
        ValueKind::Int16,
        ValueKind::Int32,
        ValueKind::Int64,
        ValueKind::Decimal,
        ValueKind::Double,
        ValueKind::DateTime,
        ValueKind::String,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Bool => "bool",
            ValueKind::Int16 => "int16",
            ValueKind::Int32 => "int32",
            ValueKind::Int64 => "int64",
            ValueKind::Decimal => "decimal",
            ValueKind::Double => "double",
            ValueKind::DateTime => "datetime",
            ValueKind::String => "string",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "bool" | "boolean" => Ok(ValueKind::Bool),
            "int16" | "i16" | "short" => Ok(ValueKind::Int16),
            "int32" | "i32" | "int" => Ok(ValueKind::Int32),
            "int64" | "i64" | "long" => Ok(ValueKind::Int64),
            "decimal" => Ok(ValueKind::Decimal),
            "double" | "f64" | "float" => Ok(ValueKind::Double),
            "datetime" | "date" => Ok(ValueKind::DateTime),
            "string" | "str" | "text" => Ok(ValueKind::String),
            _ => Err(Error::InvalidArgument(format!("unknown value kind: {}", s))),
        }
    }
}

/// Largest mantissa magnitude (96 bits).
const DECIMAL_MAX_MANTISSA: i128 = (1i128 << 96) - 1;

/// Largest number of fractional digits.
const DECIMAL_MAX_SCALE: u32 = 28;

/// Fixed-point decimal number: `mantissa * 10^-scale`.
///
/// Keeps the scale it was parsed with, so `1.50` prints as `1.50`; equality
/// compares numeric value.
#[derive(Debug, Clone, Copy)]
pub struct Decimal {
    mantissa: i128,
    scale: u32,
}

impl Decimal {
    pub fn new(mantissa: i128, scale: u32) -> Option<Self> {
        if scale > DECIMAL_MAX_SCALE || mantissa.unsigned_abs() > DECIMAL_MAX_MANTISSA as u128 {
            return None;
        }
        Some(Decimal { mantissa, scale })
    }

    pub fn mantissa(&self) -> i128 {
        self.mantissa
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Strip trailing fractional zeros.
    pub fn normalize(&self) -> Self {
        let mut d = *self;
        while d.scale > 0 && d.mantissa % 10 == 0 {
            d.mantissa /= 10;
            d.scale -= 1;
        }
        d
    }

    pub fn to_f64(&self) -> f64 {
        self.mantissa as f64 / 10f64.powi(self.scale as i32)
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        let a = self.normalize();
        let b = other.normalize();
        a.mantissa == b.mantissa && a.scale == b.scale
    }
}

impl Eq for Decimal {}

impl FromStr for Decimal {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidArgument(format!("invalid decimal: {}", s));
        let t = s.trim();
        let (negative, digits) = match t.as_bytes().first() {
            Some(b'-') => (true, &t[1..]),
            Some(b'+') => (false, &t[1..]),
            _ => (false, t),
        };
        let (int_part, frac_part) = match digits.split_once('.') {
            Some((i, f)) => (i, f),
            None => (digits, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let scale = u32::try_from(frac_part.len()).map_err(|_| invalid())?;
        let mut mantissa: i128 = 0;
        for b in int_part.bytes().chain(frac_part.bytes()) {
            mantissa = mantissa
                .checked_mul(10)
                .and_then(|m| m.checked_add(i128::from(b - b'0')))
                .filter(|m| *m <= DECIMAL_MAX_MANTISSA)
                .ok_or_else(invalid)?;
        }
        if negative {
            mantissa = -mantissa;
        }
        Decimal::new(mantissa, scale).ok_or_else(invalid)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.mantissa.unsigned_abs().to_string();
        let sign = if self.mantissa < 0 { "-" } else { "" };
        let scale = self.scale as usize;
        if scale == 0 {
            return write!(f, "{}{}", sign, digits);
        }
        let padded = format!("{:0>width$}", digits, width = scale + 1);
        let (int_part, frac_part) = padded.split_at(padded.len() - scale);
        write!(f, "{}{}.{}", sign, int_part, frac_part)
    }
}

/// A coerced scalar.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Bool(bool),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Decimal(Decimal),
    Double(f64),
    DateTime(NaiveDateTime),
    String(String),
}

impl TypedValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            TypedValue::Bool(_) => ValueKind::Bool,
            TypedValue::Int16(_) => ValueKind::Int16,
            TypedValue::Int32(_) => ValueKind::Int32,
            TypedValue::Int64(_) => ValueKind::Int64,
            TypedValue::Decimal(_) => ValueKind::Decimal,
            TypedValue::Double(_) => ValueKind::Double,
            TypedValue::DateTime(_) => ValueKind::DateTime,
            TypedValue::String(_) => ValueKind::String,
        }
    }

    /// Convert into a concrete Rust type.
    pub fn into_scalar<T: ConfigScalar>(self) -> Result<T> {
        let kind = self.kind();
        T::from_typed(self).ok_or(Error::UnsupportedType(kind))
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::Bool(v) => write!(f, "{}", v),
            TypedValue::Int16(v) => write!(f, "{}", v),
            TypedValue::Int32(v) => write!(f, "{}", v),
            TypedValue::Int64(v) => write!(f, "{}", v),
            TypedValue::Decimal(v) => write!(f, "{}", v),
            TypedValue::Double(v) => write!(f, "{}", v),
            TypedValue::DateTime(v) => write!(f, "{}", v),
            TypedValue::String(v) => f.write_str(v),
        }
    }
}

/// Accepted date/time layouts, tried in order after RFC 3339.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y"];

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn parse_bool(s: &str) -> Option<bool> {
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Convert a raw string to the given kind.
///
/// Surrounding whitespace is ignored for every kind except `String`, which
/// passes the text through unchanged. Returns `None` when the text is not a
/// valid value of that kind.
pub fn coerce(kind: ValueKind, raw: &str) -> Option<TypedValue> {
    let s = raw.trim();
    match kind {
        ValueKind::Bool => parse_bool(s).map(TypedValue::Bool),
        ValueKind::Int16 => s.parse().ok().map(TypedValue::Int16),
        ValueKind::Int32 => s.parse().ok().map(TypedValue::Int32),
        ValueKind::Int64 => s.parse().ok().map(TypedValue::Int64),
        ValueKind::Decimal => s.parse().ok().map(TypedValue::Decimal),
        ValueKind::Double => s.parse().ok().map(TypedValue::Double),
        ValueKind::DateTime => parse_datetime(s).map(TypedValue::DateTime),
        ValueKind::String => Some(TypedValue::String(raw.to_string())),
    }
}

/// Rust types that can be read as typed configuration values.
pub trait ConfigScalar: Clone + Sized {
    const KIND: ValueKind;

    fn into_typed(self) -> TypedValue;

    fn from_typed(value: TypedValue) -> Option<Self>;

    /// Text form used as the string default of a typed lookup.
    fn to_config_string(&self) -> String {
        self.clone().into_typed().to_string()
    }
}

macro_rules! impl_config_scalar {
    ($ty:ty, $kind:ident) => {
        impl ConfigScalar for $ty {
            const KIND: ValueKind = ValueKind::$kind;

            fn into_typed(self) -> TypedValue {
                TypedValue::$kind(self)
            }

            fn from_typed(value: TypedValue) -> Option<Self> {
                match value {
                    TypedValue::$kind(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

impl_config_scalar!(bool, Bool);
impl_config_scalar!(i16, Int16);
impl_config_scalar!(i32, Int32);
impl_config_scalar!(i64, Int64);
impl_config_scalar!(Decimal, Decimal);
impl_config_scalar!(f64, Double);
impl_config_scalar!(NaiveDateTime, DateTime);
impl_config_scalar!(String, String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_is_case_insensitive() {
        assert_eq!(coerce(ValueKind::Bool, "True"), Some(TypedValue::Bool(true)));
        assert_eq!(coerce(ValueKind::Bool, " FALSE "), Some(TypedValue::Bool(false)));
        assert_eq!(coerce(ValueKind::Bool, "yes"), None);
        assert_eq!(coerce(ValueKind::Bool, "1"), None);
    }

    #[test]
    fn test_integer_widths_reject_overflow() {
        assert_eq!(coerce(ValueKind::Int16, "32767"), Some(TypedValue::Int16(32767)));
        assert_eq!(coerce(ValueKind::Int16, "32768"), None);
        assert_eq!(coerce(ValueKind::Int32, " -42 "), Some(TypedValue::Int32(-42)));
        assert_eq!(coerce(ValueKind::Int32, "abc"), None);
        assert_eq!(coerce(ValueKind::Int32, "4.2"), None);
        assert_eq!(
            coerce(ValueKind::Int64, "9223372036854775807"),
            Some(TypedValue::Int64(i64::MAX))
        );
    }

    #[test]
    fn test_double() {
        assert_eq!(coerce(ValueKind::Double, "2.5"), Some(TypedValue::Double(2.5)));
        assert_eq!(coerce(ValueKind::Double, "1e3"), Some(TypedValue::Double(1000.0)));
        assert_eq!(coerce(ValueKind::Double, "two"), None);
    }

    #[test]
    fn test_string_passes_through_untrimmed() {
        assert_eq!(
            coerce(ValueKind::String, "  padded "),
            Some(TypedValue::String("  padded ".to_string()))
        );
    }

    #[test]
    fn test_datetime_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap();
        for input in [
            "2024-03-01 12:30:00",
            "2024-03-01T12:30:00",
            "2024-03-01T12:30:00Z",
            "2024-03-01T14:30:00+02:00",
            "01.03.2024 12:30:00",
            "2024-03-01 12:30",
        ] {
            assert_eq!(
                coerce(ValueKind::DateTime, input),
                Some(TypedValue::DateTime(expected)),
                "input {input}"
            );
        }
        let midnight = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(
            coerce(ValueKind::DateTime, "2024-03-01"),
            Some(TypedValue::DateTime(midnight))
        );
        assert_eq!(coerce(ValueKind::DateTime, "yesterday"), None);
    }

    #[test]
    fn test_datetime_display_round_trips() {
        let dt = NaiveDate::from_ymd_opt(2020, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        let text = dt.to_config_string();
        assert_eq!(coerce(ValueKind::DateTime, &text), Some(TypedValue::DateTime(dt)));
    }

    #[test]
    fn test_decimal_parse_and_display() {
        let d: Decimal = "1.50".parse().unwrap();
        assert_eq!(d.mantissa(), 150);
        assert_eq!(d.scale(), 2);
        assert_eq!(d.to_string(), "1.50");
        assert_eq!(d, "1.5".parse::<Decimal>().unwrap());

        assert_eq!("-0.05".parse::<Decimal>().unwrap().to_string(), "-0.05");
        assert_eq!(".5".parse::<Decimal>().unwrap().to_string(), "0.5");
        assert_eq!("+7".parse::<Decimal>().unwrap().to_string(), "7");
    }

    #[test]
    fn test_decimal_rejects_garbage_and_overflow() {
        assert!("".parse::<Decimal>().is_err());
        assert!(".".parse::<Decimal>().is_err());
        assert!("1e5".parse::<Decimal>().is_err());
        assert!("1,5".parse::<Decimal>().is_err());
        assert!("79228162514264337593543950335".parse::<Decimal>().is_ok());
        assert!("79228162514264337593543950336".parse::<Decimal>().is_err());
    }

    #[test]
    fn test_decimal_new_bounds() {
        assert!(Decimal::new(DECIMAL_MAX_MANTISSA, 0).is_some());
        assert!(Decimal::new(-DECIMAL_MAX_MANTISSA, 28).is_some());
        assert!(Decimal::new(DECIMAL_MAX_MANTISSA + 1, 0).is_none());
        assert!(Decimal::new(-DECIMAL_MAX_MANTISSA - 1, 0).is_none());
        assert!(Decimal::new(i128::MIN, 0).is_none());
        assert!(Decimal::new(i128::MAX, 0).is_none());
        assert!(Decimal::new(1, 29).is_none());
    }

    #[test]
    fn test_into_scalar_mismatch_is_unsupported_type() {
        let err = TypedValue::Int32(1).into_scalar::<bool>().unwrap_err();
        assert!(matches!(err, Error::UnsupportedType(ValueKind::Int32)));
        assert_eq!(TypedValue::Int32(7).into_scalar::<i32>().unwrap(), 7);
    }

    #[test]
    fn test_value_kind_from_str() {
        assert_eq!("int".parse::<ValueKind>().unwrap(), ValueKind::Int32);
        assert_eq!("DateTime".parse::<ValueKind>().unwrap(), ValueKind::DateTime);
        assert!("uint8".parse::<ValueKind>().is_err());
        for kind in ValueKind::ALL {
            assert_eq!(kind.as_str().parse::<ValueKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_default_string_forms() {
        assert_eq!(true.to_config_string(), "true");
        assert_eq!((-1i32).to_config_string(), "-1");
        assert_eq!(2.0f64.to_config_string(), "2");
        assert_eq!("x".to_string().to_config_string(), "x");
    }
}
