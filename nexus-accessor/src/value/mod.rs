//! Dynamically typed values exchanged with the storage layer.
//!
//! A [NexusValue] is an N-dimensional array holding elements of a single
//! [ElementType]. Scalars are stored as zero-dimensional arrays.
mod datetime;

pub use datetime::{DATETIME_FORMAT, NexusDateTime, format_datetime, parse_datetime};
use ndarray::{Array1, ArrayD, arr0};
use serde::Serialize;
use std::fmt::{Display, Formatter};

/// The tag identifying which kind of element a value holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, Serialize)]
pub enum ElementType {
    Float,
    Int,
    UInt,
    Bool,
    Text,
    DateTime,
}

/// A single element of any supported type.
#[derive(Debug, Clone, PartialEq)]
pub enum NexusScalar {
    Float(f64),
    Int(i64),
    UInt(u64),
    Bool(bool),
    Text(String),
    DateTime(NexusDateTime),
}

impl NexusScalar {
    pub fn element_type(&self) -> ElementType {
        match self {
            Self::Float(_) => ElementType::Float,
            Self::Int(_) => ElementType::Int,
            Self::UInt(_) => ElementType::UInt,
            Self::Bool(_) => ElementType::Bool,
            Self::Text(_) => ElementType::Text,
            Self::DateTime(_) => ElementType::DateTime,
        }
    }
}

/// Renders the element the way enumeration literals are written in NXDL.
impl Display for NexusScalar {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Float(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::UInt(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
            Self::DateTime(value) => f.write_str(&format_datetime(value)),
        }
    }
}

/// An N-dimensional array of one element type.
#[derive(Debug, Clone, PartialEq)]
pub enum NexusValue {
    Float(ArrayD<f64>),
    Int(ArrayD<i64>),
    UInt(ArrayD<u64>),
    Bool(ArrayD<bool>),
    Text(ArrayD<String>),
    DateTime(ArrayD<NexusDateTime>),
}

/// Evaluates `$body` with `$array` bound to the inner array, whatever its element type.
macro_rules! on_array {
    ($value:expr, $array:ident => $body:expr) => {
        match $value {
            NexusValue::Float($array) => $body,
            NexusValue::Int($array) => $body,
            NexusValue::UInt($array) => $body,
            NexusValue::Bool($array) => $body,
            NexusValue::Text($array) => $body,
            NexusValue::DateTime($array) => $body,
        }
    };
}

/// Collects the elements of `array` in logical order, wrapping each with `variant`.
fn collect_scalars<T: Clone>(
    array: &ArrayD<T>,
    variant: impl Fn(T) -> NexusScalar,
) -> Vec<NexusScalar> {
    array.iter().cloned().map(variant).collect()
}

impl NexusValue {
    /// Creates a zero-dimensional value holding exactly one element.
    pub fn scalar(scalar: impl Into<NexusScalar>) -> Self {
        match scalar.into() {
            NexusScalar::Float(value) => Self::Float(arr0(value).into_dyn()),
            NexusScalar::Int(value) => Self::Int(arr0(value).into_dyn()),
            NexusScalar::UInt(value) => Self::UInt(arr0(value).into_dyn()),
            NexusScalar::Bool(value) => Self::Bool(arr0(value).into_dyn()),
            NexusScalar::Text(value) => Self::Text(arr0(value).into_dyn()),
            NexusScalar::DateTime(value) => Self::DateTime(arr0(value).into_dyn()),
        }
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            Self::Float(_) => ElementType::Float,
            Self::Int(_) => ElementType::Int,
            Self::UInt(_) => ElementType::UInt,
            Self::Bool(_) => ElementType::Bool,
            Self::Text(_) => ElementType::Text,
            Self::DateTime(_) => ElementType::DateTime,
        }
    }

    pub fn shape(&self) -> &[usize] {
        on_array!(self, array => array.shape())
    }

    pub fn ndim(&self) -> usize {
        on_array!(self, array => array.ndim())
    }

    /// The number of elements, which is one for zero-dimensional values.
    pub fn len(&self) -> usize {
        on_array!(self, array => array.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns every element in logical (row-major) order.
    pub fn to_scalars(&self) -> Vec<NexusScalar> {
        match self {
            Self::Float(array) => collect_scalars(array, NexusScalar::Float),
            Self::Int(array) => collect_scalars(array, NexusScalar::Int),
            Self::UInt(array) => collect_scalars(array, NexusScalar::UInt),
            Self::Bool(array) => collect_scalars(array, NexusScalar::Bool),
            Self::Text(array) => collect_scalars(array, NexusScalar::Text),
            Self::DateTime(array) => collect_scalars(array, NexusScalar::DateTime),
        }
    }

    pub fn first(&self) -> Option<NexusScalar> {
        match self {
            Self::Float(array) => array.iter().next().cloned().map(NexusScalar::Float),
            Self::Int(array) => array.iter().next().cloned().map(NexusScalar::Int),
            Self::UInt(array) => array.iter().next().cloned().map(NexusScalar::UInt),
            Self::Bool(array) => array.iter().next().cloned().map(NexusScalar::Bool),
            Self::Text(array) => array.iter().next().cloned().map(NexusScalar::Text),
            Self::DateTime(array) => array.iter().next().cloned().map(NexusScalar::DateTime),
        }
    }

    /// Returns the text of the first element if this is a text value.
    pub fn first_text(&self) -> Option<&str> {
        match self {
            Self::Text(array) => array.iter().next().map(String::as_str),
            _ => None,
        }
    }

    /// Converts text elements to date-times when every element parses,
    /// otherwise returns the value unchanged.
    pub fn conform_datetime(self) -> Self {
        match self {
            Self::Text(array) => {
                let parsed = array
                    .iter()
                    .map(|text| parse_datetime(text))
                    .collect::<Result<Vec<_>, _>>();
                match parsed
                    .ok()
                    .and_then(|values| ArrayD::from_shape_vec(array.raw_dim(), values).ok())
                {
                    Some(datetimes) => Self::DateTime(datetimes),
                    None => Self::Text(array),
                }
            }
            other => other,
        }
    }
}

macro_rules! impl_from_element {
    ($element:ty, $variant:ident) => {
        impl From<$element> for NexusScalar {
            fn from(value: $element) -> Self {
                Self::$variant(value)
            }
        }

        impl From<$element> for NexusValue {
            fn from(value: $element) -> Self {
                Self::scalar(value)
            }
        }

        impl From<ArrayD<$element>> for NexusValue {
            fn from(array: ArrayD<$element>) -> Self {
                Self::$variant(array)
            }
        }

        impl From<Vec<$element>> for NexusValue {
            fn from(values: Vec<$element>) -> Self {
                Self::$variant(Array1::from(values).into_dyn())
            }
        }

        impl<const N: usize> From<[$element; N]> for NexusValue {
            fn from(values: [$element; N]) -> Self {
                Self::from(Vec::from(values))
            }
        }
    };
}

impl_from_element!(f64, Float);
impl_from_element!(i64, Int);
impl_from_element!(u64, UInt);
impl_from_element!(bool, Bool);
impl_from_element!(String, Text);
impl_from_element!(NexusDateTime, DateTime);

/// Narrower element types are widened to the stored element type.
macro_rules! impl_from_widened {
    ($element:ty => $stored:ty, $variant:ident) => {
        impl From<$element> for NexusScalar {
            fn from(value: $element) -> Self {
                Self::$variant(<$stored>::from(value))
            }
        }

        impl From<$element> for NexusValue {
            fn from(value: $element) -> Self {
                Self::scalar(value)
            }
        }

        impl From<Vec<$element>> for NexusValue {
            fn from(values: Vec<$element>) -> Self {
                Self::$variant(
                    values
                        .into_iter()
                        .map(<$stored>::from)
                        .collect::<Array1<_>>()
                        .into_dyn(),
                )
            }
        }

        impl<const N: usize> From<[$element; N]> for NexusValue {
            fn from(values: [$element; N]) -> Self {
                Self::from(Vec::from(values))
            }
        }
    };
}

impl_from_widened!(f32 => f64, Float);
impl_from_widened!(i32 => i64, Int);
impl_from_widened!(u32 => u64, UInt);
impl_from_widened!(&str => String, Text);

/// Implemented by the element types an accessor can read scalars as.
pub trait FromNexusScalar: Sized {
    /// The element type reported when a conversion fails.
    const ELEMENT_TYPE: ElementType;

    fn from_scalar(scalar: NexusScalar) -> Option<Self>;
}

impl FromNexusScalar for f64 {
    const ELEMENT_TYPE: ElementType = ElementType::Float;

    fn from_scalar(scalar: NexusScalar) -> Option<Self> {
        match scalar {
            NexusScalar::Float(value) => Some(value),
            NexusScalar::Int(value) => Some(value as f64),
            NexusScalar::UInt(value) => Some(value as f64),
            _ => None,
        }
    }
}

impl FromNexusScalar for f32 {
    const ELEMENT_TYPE: ElementType = ElementType::Float;

    fn from_scalar(scalar: NexusScalar) -> Option<Self> {
        f64::from_scalar(scalar).map(|value| value as f32)
    }
}

macro_rules! impl_from_nexus_integer {
    ($integer:ty, $element_type:ident) => {
        impl FromNexusScalar for $integer {
            const ELEMENT_TYPE: ElementType = ElementType::$element_type;

            fn from_scalar(scalar: NexusScalar) -> Option<Self> {
                match scalar {
                    NexusScalar::Int(value) => <$integer>::try_from(value).ok(),
                    NexusScalar::UInt(value) => <$integer>::try_from(value).ok(),
                    _ => None,
                }
            }
        }
    };
}

impl_from_nexus_integer!(i64, Int);
impl_from_nexus_integer!(i32, Int);
impl_from_nexus_integer!(u64, UInt);
impl_from_nexus_integer!(u32, UInt);

impl FromNexusScalar for bool {
    const ELEMENT_TYPE: ElementType = ElementType::Bool;

    fn from_scalar(scalar: NexusScalar) -> Option<Self> {
        match scalar {
            NexusScalar::Bool(value) => Some(value),
            _ => None,
        }
    }
}

impl FromNexusScalar for String {
    const ELEMENT_TYPE: ElementType = ElementType::Text;

    fn from_scalar(scalar: NexusScalar) -> Option<Self> {
        match scalar {
            NexusScalar::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl FromNexusScalar for NexusDateTime {
    const ELEMENT_TYPE: ElementType = ElementType::DateTime;

    fn from_scalar(scalar: NexusScalar) -> Option<Self> {
        match scalar {
            NexusScalar::DateTime(value) => Some(value),
            NexusScalar::Text(value) => parse_datetime(&value).ok(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use ndarray::Array2;

    #[test]
    fn scalar_is_zero_dimensional() {
        let value = NexusValue::scalar(300.0);
        assert_eq!(value.ndim(), 0);
        assert_eq!(value.len(), 1);
        assert_eq!(value.first(), Some(NexusScalar::Float(300.0)));
    }

    #[test]
    fn narrow_types_widen() {
        assert_eq!(NexusValue::from(3_i32), NexusValue::scalar(3_i64));
        assert_eq!(
            NexusValue::from(vec![1.5_f32, 2.5]),
            NexusValue::from(vec![1.5_f64, 2.5])
        );
        assert_eq!(
            NexusValue::from("Liquid H2"),
            NexusValue::scalar("Liquid H2".to_owned())
        );
    }

    #[test]
    fn scalars_in_row_major_order() {
        let array = Array2::from_shape_vec((2, 2), vec![1_u64, 2, 3, 4]).unwrap();
        let value = NexusValue::from(array.into_dyn());
        assert_eq!(value.shape(), &[2, 2]);
        assert_eq!(
            value.to_scalars(),
            vec![
                NexusScalar::UInt(1),
                NexusScalar::UInt(2),
                NexusScalar::UInt(3),
                NexusScalar::UInt(4)
            ]
        );
    }

    #[test]
    fn empty_value() {
        let value = NexusValue::from(Vec::<f64>::new());
        assert!(value.is_empty());
        assert_eq!(value.first(), None);
    }

    #[test]
    fn conform_parses_text() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let value = NexusValue::from("2024-05-01T12:30:00Z").conform_datetime();
        assert_eq!(value, NexusValue::scalar(expected));
    }

    #[test]
    fn conform_keeps_unparseable_text() {
        let value = NexusValue::from(vec!["2024-05-01T12:30:00Z", "yesterday"]);
        assert_eq!(value.clone().conform_datetime(), value);
    }

    #[test]
    fn integers_convert_within_range() {
        assert_eq!(u32::from_scalar(NexusScalar::Int(7)), Some(7));
        assert_eq!(u32::from_scalar(NexusScalar::Int(-7)), None);
        assert_eq!(f64::from_scalar(NexusScalar::UInt(2)), Some(2.0));
        assert_eq!(bool::from_scalar(NexusScalar::Float(1.0)), None);
    }

    #[test]
    fn display_matches_literal() {
        assert_eq!(NexusScalar::Text("Soller".to_owned()).to_string(), "Soller");
        assert_eq!(NexusScalar::UInt(3).to_string(), "3");
    }
}
