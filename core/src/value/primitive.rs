//! The primitive value type: a tagged sum over the VR families.

use super::partial::{DicomDate, DicomDateTime, DicomTime};
use crate::header::{Length, Tag};
use num_traits::NumCast;
use smallvec::SmallVec;
use std::borrow::Cow;
use std::fmt;

/// An aggregation of one or more values within an element.
pub type C<T> = SmallVec<[T; 2]>;

/// The type of a stored value, without the data itself.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ValueType {
    /// No value.
    Empty,
    /// A sequence of strings.
    Strs,
    /// A single string.
    Str,
    /// A sequence of attribute tags.
    Tags,
    /// Raw bytes.
    U8,
    /// Signed 16-bit integers.
    I16,
    /// Unsigned 16-bit integers.
    U16,
    /// Signed 32-bit integers.
    I32,
    /// Unsigned 32-bit integers.
    U32,
    /// Signed 64-bit integers.
    I64,
    /// Unsigned 64-bit integers.
    U64,
    /// Single-precision floats.
    F32,
    /// Double-precision floats.
    F64,
    /// Dates with partial precision.
    Date,
    /// Times with partial precision.
    Time,
    /// Date-times with partial precision.
    DateTime,
    /// A nested data set item.
    Item,
    /// An encapsulated pixel data sequence.
    PixelSequence,
}

/// An error which occurs when fetching a value
/// as a type that does not match the stored variant.
#[derive(Debug, Clone, PartialEq)]
pub struct CastValueError {
    /// The value type requested by the caller.
    pub requested: &'static str,
    /// The type of the value actually stored.
    pub got: ValueType,
}

impl fmt::Display for CastValueError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "bad value cast: requested {} but value is {:?}",
            self.requested, self.got
        )
    }
}

impl std::error::Error for CastValueError {}

/// An error which occurs when converting a value
/// into another value domain (e.g. string to integer).
#[derive(Debug)]
pub struct ConvertValueError {
    /// The target type of the conversion.
    pub requested: &'static str,
    /// The type of the original value.
    pub original: ValueType,
    /// The underlying cause, if any.
    pub cause: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl fmt::Display for ConvertValueError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "could not convert {:?} value to {}",
            self.original, self.requested
        )?;
        if let Some(cause) = &self.cause {
            write!(f, ": {}", cause)?;
        }
        Ok(())
    }
}

impl std::error::Error for ConvertValueError {}

pub type ConvertResult<T> = Result<T, ConvertValueError>;

/// A primitive DICOM value: one variant per VR family.
///
/// Multi-valued content is held in a [`C`] (a small vector),
/// so that the common single- and double-valued cases do not allocate.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveValue {
    /// No value. Used for zero-length elements.
    Empty,
    /// A sequence of strings (the multi-valued textual VRs).
    Strs(C<String>),
    /// A single string (LT, ST, UT, UR, or any single-valued text).
    Str(String),
    /// A sequence of attribute tags (AT).
    Tags(C<Tag>),
    /// Raw bytes (OB, UN).
    U8(C<u8>),
    /// Signed 16-bit integers (SS).
    I16(C<i16>),
    /// Unsigned 16-bit integers (US, OW).
    U16(C<u16>),
    /// Signed 32-bit integers (SL).
    I32(C<i32>),
    /// Unsigned 32-bit integers (UL, OL).
    U32(C<u32>),
    /// Signed 64-bit integers (SV).
    I64(C<i64>),
    /// Unsigned 64-bit integers (UV, OV).
    U64(C<u64>),
    /// Single-precision floats (FL, OF).
    F32(C<f32>),
    /// Double-precision floats (FD, OD).
    F64(C<f64>),
    /// Dates with partial precision (DA).
    Date(C<DicomDate>),
    /// Times with partial precision (TM).
    Time(C<DicomTime>),
    /// Date-times with partial precision (DT).
    DateTime(C<DicomDateTime>),
}

impl PrimitiveValue {
    /// Retrieve the specific type of this value.
    pub fn value_type(&self) -> ValueType {
        use PrimitiveValue::*;
        match self {
            Empty => ValueType::Empty,
            Strs(_) => ValueType::Strs,
            Str(_) => ValueType::Str,
            Tags(_) => ValueType::Tags,
            U8(_) => ValueType::U8,
            I16(_) => ValueType::I16,
            U16(_) => ValueType::U16,
            I32(_) => ValueType::I32,
            U32(_) => ValueType::U32,
            I64(_) => ValueType::I64,
            U64(_) => ValueType::U64,
            F32(_) => ValueType::F32,
            F64(_) => ValueType::F64,
            Date(_) => ValueType::Date,
            Time(_) => ValueType::Time,
            DateTime(_) => ValueType::DateTime,
        }
    }

    /// The number of individual values.
    pub fn multiplicity(&self) -> u32 {
        use PrimitiveValue::*;
        match self {
            Empty => 0,
            Str(_) => 1,
            Strs(c) => c.len() as u32,
            Tags(c) => c.len() as u32,
            U8(c) => c.len() as u32,
            I16(c) => c.len() as u32,
            U16(c) => c.len() as u32,
            I32(c) => c.len() as u32,
            U32(c) => c.len() as u32,
            I64(c) => c.len() as u32,
            U64(c) => c.len() as u32,
            F32(c) => c.len() as u32,
            F64(c) => c.len() as u32,
            Date(c) => c.len() as u32,
            Time(c) => c.len() as u32,
            DateTime(c) => c.len() as u32,
        }
    }

    /// Whether the value holds nothing.
    pub fn is_empty(&self) -> bool {
        self.multiplicity() == 0
    }

    /// The number of bytes the value would take when encoded,
    /// already padded to even length.
    pub fn calculate_byte_len(&self) -> usize {
        use PrimitiveValue::*;
        let len = match self {
            Empty => 0,
            U8(c) => c.len(),
            I16(c) => c.len() * 2,
            U16(c) => c.len() * 2,
            I32(c) => c.len() * 4,
            U32(c) => c.len() * 4,
            I64(c) => c.len() * 8,
            U64(c) => c.len() * 8,
            F32(c) => c.len() * 4,
            F64(c) => c.len() * 8,
            Tags(c) => c.len() * 4,
            Str(s) => s.len(),
            Strs(c) => {
                let data: usize = c.iter().map(|s| s.len()).sum();
                data + c.len().saturating_sub(1)
            }
            Date(c) => {
                let data: usize = c.iter().map(|d| d.to_string().len()).sum();
                data + c.len().saturating_sub(1)
            }
            Time(c) => {
                let data: usize = c.iter().map(|t| t.to_string().len()).sum();
                data + c.len().saturating_sub(1)
            }
            DateTime(c) => {
                let data: usize = c.iter().map(|d| d.to_string().len()).sum();
                data + c.len().saturating_sub(1)
            }
        };
        (len + 1) & !1
    }

    /// The encoded value length, as a [`Length`].
    pub fn length(&self) -> Length {
        Length(self.calculate_byte_len() as u32)
    }

    /// Convert the value into a single string.
    ///
    /// Multiple values are joined with the standard `\` delimiter.
    pub fn to_str(&self) -> Cow<'_, str> {
        use PrimitiveValue::*;
        match self {
            Empty => Cow::Borrowed(""),
            Str(s) => Cow::Borrowed(s.as_str()),
            Strs(c) if c.len() == 1 => Cow::Borrowed(c[0].as_str()),
            Strs(c) => Cow::Owned(c.join("\\")),
            other => Cow::Owned(other.display_values("\\")),
        }
    }

    /// Convert the value into a single string,
    /// with trailing spaces and null characters removed.
    pub fn to_clean_str(&self) -> Cow<'_, str> {
        match self.to_str() {
            Cow::Borrowed(s) => Cow::Borrowed(s.trim_end_matches([' ', '\0'])),
            Cow::Owned(s) => Cow::Owned(s.trim_end_matches([' ', '\0']).to_string()),
        }
    }

    /// Convert the value into a vector of strings,
    /// one per individual value.
    pub fn to_multi_str(&self) -> Cow<'_, [String]> {
        use PrimitiveValue::*;
        match self {
            Strs(c) => Cow::Borrowed(&c[..]),
            Empty => Cow::Owned(Vec::new()),
            Str(s) => Cow::Owned(vec![s.clone()]),
            other => Cow::Owned(
                other
                    .display_values("\x00")
                    .split('\x00')
                    .map(|s| s.to_string())
                    .collect(),
            ),
        }
    }

    fn display_values(&self, sep: &str) -> String {
        use itertools::Itertools;
        use PrimitiveValue::*;
        match self {
            Empty => String::new(),
            Str(s) => s.clone(),
            Strs(c) => c.iter().join(sep),
            Tags(c) => c.iter().join(sep),
            U8(c) => c.iter().join(sep),
            I16(c) => c.iter().join(sep),
            U16(c) => c.iter().join(sep),
            I32(c) => c.iter().join(sep),
            U32(c) => c.iter().join(sep),
            I64(c) => c.iter().join(sep),
            U64(c) => c.iter().join(sep),
            F32(c) => c.iter().join(sep),
            F64(c) => c.iter().join(sep),
            Date(c) => c.iter().join(sep),
            Time(c) => c.iter().join(sep),
            DateTime(c) => c.iter().join(sep),
        }
    }

    /// Convert the value into raw bytes.
    ///
    /// Strings are provided in UTF-8; binary values in native order.
    pub fn to_bytes(&self) -> Cow<'_, [u8]> {
        use PrimitiveValue::*;
        match self {
            Empty => Cow::Borrowed(&[]),
            U8(c) => Cow::Borrowed(&c[..]),
            Str(s) => Cow::Borrowed(s.as_bytes()),
            Strs(c) if c.len() == 1 => Cow::Borrowed(c[0].as_bytes()),
            other => Cow::Owned(other.to_str().into_owned().into_bytes()),
        }
    }

    /// Retrieve a single integer, converting from the stored
    /// variant when feasible. String variants are parsed.
    pub fn to_int<T>(&self) -> ConvertResult<T>
    where
        T: NumCast + std::str::FromStr<Err = std::num::ParseIntError>,
    {
        use PrimitiveValue::*;

        fn cast<T: NumCast, V: Copy + num_traits::ToPrimitive>(
            v: V,
            original: ValueType,
        ) -> ConvertResult<T> {
            NumCast::from(v).ok_or(ConvertValueError {
                requested: "integer",
                original,
                cause: None,
            })
        }

        let original = self.value_type();
        match self {
            U8(c) if !c.is_empty() => cast(c[0], original),
            I16(c) if !c.is_empty() => cast(c[0], original),
            U16(c) if !c.is_empty() => cast(c[0], original),
            I32(c) if !c.is_empty() => cast(c[0], original),
            U32(c) if !c.is_empty() => cast(c[0], original),
            I64(c) if !c.is_empty() => cast(c[0], original),
            U64(c) if !c.is_empty() => cast(c[0], original),
            F32(c) if !c.is_empty() => cast(c[0], original),
            F64(c) if !c.is_empty() => cast(c[0], original),
            Str(_) | Strs(_) => {
                let text = self.to_clean_str();
                let first = text.split('\\').next().unwrap_or("").trim();
                first.parse().map_err(|e: std::num::ParseIntError| {
                    ConvertValueError {
                        requested: "integer",
                        original,
                        cause: Some(Box::new(e)),
                    }
                })
            }
            _ => Err(ConvertValueError {
                requested: "integer",
                original,
                cause: None,
            }),
        }
    }

    /// Retrieve all integers in the value,
    /// converting from the stored variant when feasible.
    pub fn to_multi_int<T>(&self) -> ConvertResult<Vec<T>>
    where
        T: NumCast + std::str::FromStr<Err = std::num::ParseIntError>,
    {
        use PrimitiveValue::*;

        fn cast_all<T: NumCast, V: Copy + num_traits::ToPrimitive>(
            values: &[V],
            original: ValueType,
        ) -> ConvertResult<Vec<T>> {
            values
                .iter()
                .map(|v| {
                    NumCast::from(*v).ok_or(ConvertValueError {
                        requested: "integer",
                        original,
                        cause: None,
                    })
                })
                .collect()
        }

        let original = self.value_type();
        match self {
            Empty => Ok(Vec::new()),
            U8(c) => cast_all(c, original),
            I16(c) => cast_all(c, original),
            U16(c) => cast_all(c, original),
            I32(c) => cast_all(c, original),
            U32(c) => cast_all(c, original),
            I64(c) => cast_all(c, original),
            U64(c) => cast_all(c, original),
            Str(_) | Strs(_) => {
                let text = self.to_clean_str();
                text.split('\\')
                    .map(|s| {
                        s.trim().parse().map_err(|e: std::num::ParseIntError| {
                            ConvertValueError {
                                requested: "integer",
                                original,
                                cause: Some(Box::new(e)),
                            }
                        })
                    })
                    .collect()
            }
            _ => Err(ConvertValueError {
                requested: "integer",
                original,
                cause: None,
            }),
        }
    }

    /// Retrieve a single double-precision float,
    /// converting from the stored variant when feasible.
    pub fn to_float64(&self) -> ConvertResult<f64> {
        use PrimitiveValue::*;
        let original = self.value_type();
        let err = |cause: Option<Box<dyn std::error::Error + Send + Sync>>| ConvertValueError {
            requested: "float64",
            original,
            cause,
        };
        match self {
            F64(c) if !c.is_empty() => Ok(c[0]),
            F32(c) if !c.is_empty() => Ok(c[0] as f64),
            U8(c) if !c.is_empty() => Ok(c[0] as f64),
            I16(c) if !c.is_empty() => Ok(c[0] as f64),
            U16(c) if !c.is_empty() => Ok(c[0] as f64),
            I32(c) if !c.is_empty() => Ok(c[0] as f64),
            U32(c) if !c.is_empty() => Ok(c[0] as f64),
            I64(c) if !c.is_empty() => Ok(c[0] as f64),
            U64(c) if !c.is_empty() => Ok(c[0] as f64),
            Str(_) | Strs(_) => {
                let text = self.to_clean_str();
                let first = text.split('\\').next().unwrap_or("").trim();
                first.parse().map_err(|e| err(Some(Box::new(e))))
            }
            _ => Err(err(None)),
        }
    }

    /// Retrieve a single date; fails when the stored variant
    /// is not a date and cannot be parsed as one.
    pub fn to_date(&self) -> ConvertResult<DicomDate> {
        use PrimitiveValue::*;
        let original = self.value_type();
        let err = |cause: Option<Box<dyn std::error::Error + Send + Sync>>| ConvertValueError {
            requested: "DicomDate",
            original,
            cause,
        };
        match self {
            Date(c) if !c.is_empty() => Ok(c[0]),
            Str(_) | Strs(_) => DicomDate::parse(&self.to_clean_str())
                .map_err(|e| err(Some(Box::new(e)))),
            _ => Err(err(None)),
        }
    }

    /// Retrieve a single time; fails when the stored variant
    /// is not a time and cannot be parsed as one.
    pub fn to_time(&self) -> ConvertResult<DicomTime> {
        use PrimitiveValue::*;
        let original = self.value_type();
        let err = |cause: Option<Box<dyn std::error::Error + Send + Sync>>| ConvertValueError {
            requested: "DicomTime",
            original,
            cause,
        };
        match self {
            Time(c) if !c.is_empty() => Ok(c[0]),
            Str(_) | Strs(_) => DicomTime::parse(&self.to_clean_str())
                .map_err(|e| err(Some(Box::new(e)))),
            _ => Err(err(None)),
        }
    }

    /// Retrieve a single date-time; fails when the stored variant
    /// is not a date-time and cannot be parsed as one.
    pub fn to_datetime(&self) -> ConvertResult<DicomDateTime> {
        use PrimitiveValue::*;
        let original = self.value_type();
        let err = |cause: Option<Box<dyn std::error::Error + Send + Sync>>| ConvertValueError {
            requested: "DicomDateTime",
            original,
            cause,
        };
        match self {
            DateTime(c) if !c.is_empty() => Ok(c[0]),
            Str(_) | Strs(_) => DicomDateTime::parse(&self.to_clean_str())
                .map_err(|e| err(Some(Box::new(e)))),
            _ => Err(err(None)),
        }
    }

    /// Interpret the value as a person name,
    /// parsing its component groups.
    pub fn to_person_name(&self) -> ConvertResult<super::PersonName> {
        use PrimitiveValue::*;
        match self {
            Str(_) | Strs(_) => Ok(super::PersonName::parse(&self.to_clean_str())),
            _ => Err(ConvertValueError {
                requested: "PersonName",
                original: self.value_type(),
                cause: None,
            }),
        }
    }

    /// Retrieve the raw bytes, failing when the stored variant
    /// is not `U8`.
    pub fn bytes(&self) -> Result<&[u8], CastValueError> {
        match self {
            PrimitiveValue::U8(c) => Ok(c),
            other => Err(CastValueError {
                requested: "bytes",
                got: other.value_type(),
            }),
        }
    }

    /// Retrieve the value as a string slice,
    /// failing when the stored variant is not textual.
    pub fn string(&self) -> Result<&str, CastValueError> {
        match self {
            PrimitiveValue::Str(s) => Ok(s),
            PrimitiveValue::Strs(c) if c.len() == 1 => Ok(&c[0]),
            other => Err(CastValueError {
                requested: "string",
                got: other.value_type(),
            }),
        }
    }
}

impl fmt::Display for PrimitiveValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_str())
    }
}

macro_rules! impl_from_collection {
    ($typ:ty, $variant:ident) => {
        impl From<$typ> for PrimitiveValue {
            fn from(value: $typ) -> Self {
                PrimitiveValue::$variant(smallvec::smallvec![value])
            }
        }
        impl From<Vec<$typ>> for PrimitiveValue {
            fn from(value: Vec<$typ>) -> Self {
                PrimitiveValue::$variant(value.into_iter().collect())
            }
        }
        impl From<C<$typ>> for PrimitiveValue {
            fn from(value: C<$typ>) -> Self {
                PrimitiveValue::$variant(value)
            }
        }
    };
}

impl_from_collection!(u8, U8);
impl_from_collection!(i16, I16);
impl_from_collection!(u16, U16);
impl_from_collection!(i32, I32);
impl_from_collection!(u32, U32);
impl_from_collection!(i64, I64);
impl_from_collection!(u64, U64);
impl_from_collection!(f32, F32);
impl_from_collection!(f64, F64);
impl_from_collection!(Tag, Tags);
impl_from_collection!(DicomDate, Date);
impl_from_collection!(DicomTime, Time);
impl_from_collection!(DicomDateTime, DateTime);

impl From<String> for PrimitiveValue {
    fn from(value: String) -> Self {
        PrimitiveValue::Str(value)
    }
}

impl From<&str> for PrimitiveValue {
    fn from(value: &str) -> Self {
        PrimitiveValue::Str(value.to_string())
    }
}

impl From<Vec<String>> for PrimitiveValue {
    fn from(value: Vec<String>) -> Self {
        PrimitiveValue::Strs(value.into_iter().collect())
    }
}

impl From<&[u8]> for PrimitiveValue {
    fn from(value: &[u8]) -> Self {
        PrimitiveValue::U8(value.iter().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[test]
    fn multiplicity_and_length() {
        let v = PrimitiveValue::U16(smallvec![1, 2, 3]);
        assert_eq!(v.multiplicity(), 3);
        assert_eq!(v.calculate_byte_len(), 6);

        let v = PrimitiveValue::from("CT");
        assert_eq!(v.multiplicity(), 1);
        assert_eq!(v.calculate_byte_len(), 2);

        // odd-length values are padded to even
        let v = PrimitiveValue::from("DERIVED");
        assert_eq!(v.calculate_byte_len(), 8);

        let v = PrimitiveValue::Strs(smallvec!["ORIGINAL".into(), "PRIMARY".into()]);
        assert_eq!(v.calculate_byte_len(), 16);
    }

    #[test]
    fn string_joining() {
        let v = PrimitiveValue::Strs(smallvec!["ORIGINAL".into(), "PRIMARY".into()]);
        assert_eq!(v.to_str(), "ORIGINAL\\PRIMARY");
        assert_eq!(
            v.to_multi_str().as_ref(),
            &["ORIGINAL".to_string(), "PRIMARY".to_string()][..]
        );
    }

    #[test]
    fn int_conversions() {
        assert_eq!(PrimitiveValue::from(512_u16).to_int::<u32>().unwrap(), 512);
        assert_eq!(PrimitiveValue::from("42").to_int::<u16>().unwrap(), 42);
        assert_eq!(
            PrimitiveValue::U16(smallvec![1, 2, 3])
                .to_multi_int::<i64>()
                .unwrap(),
            vec![1, 2, 3]
        );
        assert!(PrimitiveValue::from("abc").to_int::<u16>().is_err());
        assert!(PrimitiveValue::Empty.to_int::<u16>().is_err());
    }

    #[test]
    fn typed_accessors_guard_variants() {
        let v = PrimitiveValue::from("hello");
        assert_eq!(v.string().unwrap(), "hello");
        assert!(v.bytes().is_err());

        let v = PrimitiveValue::from(vec![0u8, 1, 2]);
        assert_eq!(v.bytes().unwrap(), &[0, 1, 2]);
        assert!(v.string().is_err());
    }

    #[test]
    fn date_conversion_from_text() {
        let v = PrimitiveValue::from("19980429");
        assert_eq!(
            v.to_date().unwrap(),
            DicomDate::from_ymd(1998, 4, 29).unwrap()
        );
    }

    #[test]
    fn person_name_conversion() {
        let v = PrimitiveValue::from("Doe^John ");
        let name = v.to_person_name().unwrap();
        assert_eq!(name.alphabetic.family, "Doe");
        assert_eq!(name.alphabetic.given, "John");
        assert!(PrimitiveValue::from(1u16).to_person_name().is_err());
    }
}
