use crate::value::{NexusValue, parse_datetime};
use serde::{Serialize, Serializer};

/// The NXDL type of a field or attribute.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
pub enum NexusType {
    #[default]
    #[strum(serialize = "NX_CHAR")]
    Char,
    #[strum(serialize = "NX_FLOAT")]
    Float,
    #[strum(serialize = "NX_INT")]
    Int,
    #[strum(serialize = "NX_UINT")]
    UInt,
    #[strum(serialize = "NX_POSINT")]
    PosInt,
    #[strum(serialize = "NX_NUMBER")]
    Number,
    #[strum(serialize = "NX_BOOLEAN")]
    Boolean,
    #[strum(serialize = "NX_DATE_TIME")]
    DateTime,
    #[strum(serialize = "ISO8601")]
    Iso8601,
    #[strum(serialize = "NX_BINARY")]
    Binary,
    #[strum(serialize = "NX_CHAR_OR_NUMBER")]
    CharOrNumber,
}

impl NexusType {
    pub fn is_datetime(&self) -> bool {
        matches!(self, Self::DateTime | Self::Iso8601)
    }

    /// Whether a value may be stored in a field of this type.
    ///
    /// Signed and unsigned integers are interchangeable where every element
    /// fits the declared range. Integers are never accepted as floats, and
    /// text is only accepted as a date-time when every element parses.
    pub fn accepts(&self, value: &NexusValue) -> bool {
        match (self, value) {
            (Self::Char, NexusValue::Text(_)) => true,
            (Self::Float, NexusValue::Float(_)) => true,
            (Self::Int, NexusValue::Int(_)) => true,
            (Self::Int, NexusValue::UInt(array)) => {
                array.iter().all(|value| i64::try_from(*value).is_ok())
            }
            (Self::UInt, NexusValue::UInt(_)) => true,
            (Self::UInt, NexusValue::Int(array)) => array.iter().all(|value| *value >= 0),
            (Self::PosInt, NexusValue::UInt(array)) => array.iter().all(|value| *value > 0),
            (Self::PosInt, NexusValue::Int(array)) => array.iter().all(|value| *value > 0),
            (Self::Number, NexusValue::Float(_) | NexusValue::Int(_) | NexusValue::UInt(_)) => {
                true
            }
            (Self::Boolean, NexusValue::Bool(_)) => true,
            (Self::DateTime | Self::Iso8601, NexusValue::DateTime(_)) => true,
            (Self::DateTime | Self::Iso8601, NexusValue::Text(array)) => {
                array.iter().all(|text| parse_datetime(text).is_ok())
            }
            (Self::Binary, NexusValue::UInt(_) | NexusValue::Int(_)) => true,
            (
                Self::CharOrNumber,
                NexusValue::Text(_)
                | NexusValue::Float(_)
                | NexusValue::Int(_)
                | NexusValue::UInt(_),
            ) => true,
            _ => false,
        }
    }
}

impl Serialize for NexusType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn parses_nxdl_names() {
        assert_eq!(NexusType::from_str("NX_FLOAT").unwrap(), NexusType::Float);
        assert_eq!(NexusType::from_str("ISO8601").unwrap(), NexusType::Iso8601);
        assert!(NexusType::from_str("NX_QUATERNION").is_err());
        assert_eq!(NexusType::CharOrNumber.to_string(), "NX_CHAR_OR_NUMBER");
    }

    #[test]
    fn float_rejects_integers() {
        assert!(NexusType::Float.accepts(&NexusValue::from(300.0)));
        assert!(!NexusType::Float.accepts(&NexusValue::from(300_i64)));
        assert!(NexusType::Number.accepts(&NexusValue::from(300_i64)));
    }

    #[test]
    fn unsigned_types_check_sign() {
        assert!(NexusType::UInt.accepts(&NexusValue::from(vec![0_i64, 4])));
        assert!(!NexusType::UInt.accepts(&NexusValue::from(vec![-1_i64, 4])));
        assert!(!NexusType::PosInt.accepts(&NexusValue::from(vec![0_u64, 4])));
        assert!(NexusType::PosInt.accepts(&NexusValue::from(3_u64)));
    }

    #[test]
    fn int_rejects_oversized_unsigned() {
        assert!(!NexusType::Int.accepts(&NexusValue::from(u64::MAX)));
        assert!(NexusType::Int.accepts(&NexusValue::from(12_u64)));
    }

    #[test]
    fn date_time_accepts_parseable_text() {
        assert!(NexusType::DateTime.accepts(&NexusValue::from("2024-01-01T00:00:00Z")));
        assert!(!NexusType::DateTime.accepts(&NexusValue::from("soon")));
        assert!(!NexusType::Char.accepts(&NexusValue::from(true)));
    }
}
