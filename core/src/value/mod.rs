//! High-level abstraction over a data element's value.

use crate::header::Length;
use std::borrow::Cow;

pub mod partial;
pub mod person_name;
mod primitive;

pub use self::partial::{DicomDate, DicomDateTime, DicomTime};
pub use self::person_name::PersonName;
pub use self::primitive::{
    CastValueError, ConvertResult, ConvertValueError, PrimitiveValue, ValueType, C,
};

/// A full DICOM value: either primitive, a sequence of nested
/// data set items, or an encapsulated pixel data sequence.
///
/// `I` is the data set type of nested sequence items.
///
/// Equality is structural and ignores the declared size of
/// sequences, so that a sequence read with undefined length
/// compares equal to its explicit-length counterpart.
#[derive(Debug, Clone)]
pub enum Value<I> {
    /// A primitive value.
    Primitive(PrimitiveValue),
    /// An ordered sequence of nested data set items.
    Sequence {
        /// the item collection
        items: C<I>,
        /// the encoded size in bytes, possibly undefined
        size: Length,
    },
    /// An encapsulated pixel data sequence:
    /// a basic offset table followed by compressed fragments.
    PixelSequence {
        /// byte offsets to the first fragment of each frame
        offset_table: C<u32>,
        /// the compressed fragments
        fragments: C<Vec<u8>>,
    },
}

impl<I> Value<I> {
    /// Construct a sequence value from a list of items.
    #[inline]
    pub fn new_sequence<T>(items: T, size: Length) -> Self
    where
        T: Into<C<I>>,
    {
        Value::Sequence {
            items: items.into(),
            size,
        }
    }

    /// Construct an encapsulated pixel data value
    /// from an offset table and a list of fragments.
    ///
    /// The offset table is not validated against the fragments.
    pub fn new_pixel_sequence<T>(offset_table: C<u32>, fragments: T) -> Self
    where
        T: Into<C<Vec<u8>>>,
    {
        Value::PixelSequence {
            offset_table,
            fragments: fragments.into(),
        }
    }

    /// The encoded size of this value in bytes.
    /// Sequences may report an undefined length,
    /// and pixel sequences always do.
    pub fn size(&self) -> Length {
        match self {
            Value::Primitive(v) => v.length(),
            Value::Sequence { size, .. } => *size,
            Value::PixelSequence { .. } => Length::UNDEFINED,
        }
    }

    /// The specific type of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Primitive(v) => v.value_type(),
            Value::Sequence { .. } => ValueType::Item,
            Value::PixelSequence { .. } => ValueType::PixelSequence,
        }
    }

    /// The number of individual values:
    /// element count for primitives, item count for sequences,
    /// always 1 for pixel sequences.
    pub fn multiplicity(&self) -> u32 {
        match self {
            Value::Primitive(v) => v.multiplicity(),
            Value::Sequence { items, .. } => items.len() as u32,
            Value::PixelSequence { .. } => 1,
        }
    }

    /// Gets a reference to the primitive value, if this is one.
    pub fn primitive(&self) -> Option<&PrimitiveValue> {
        match self {
            Value::Primitive(v) => Some(v),
            _ => None,
        }
    }

    /// Gets a reference to the sequence items, if this is a sequence.
    pub fn items(&self) -> Option<&[I]> {
        match self {
            Value::Sequence { items, .. } => Some(items),
            _ => None,
        }
    }

    /// Consumes the value, returning the primitive inside, if any.
    pub fn into_primitive(self) -> Option<PrimitiveValue> {
        match self {
            Value::Primitive(v) => Some(v),
            _ => None,
        }
    }

    /// Consumes the value, returning the sequence items, if any.
    pub fn into_items(self) -> Option<C<I>> {
        match self {
            Value::Sequence { items, .. } => Some(items),
            _ => None,
        }
    }

    /// Convert the value into a single string,
    /// failing when the value is not primitive.
    pub fn to_str(&self) -> Result<Cow<'_, str>, CastValueError> {
        match self {
            Value::Primitive(prim) => Ok(prim.to_str()),
            _ => Err(CastValueError {
                requested: "string",
                got: self.value_type(),
            }),
        }
    }

    /// Convert the value into a single string with trailing
    /// padding removed, failing when the value is not primitive.
    pub fn to_clean_str(&self) -> Result<Cow<'_, str>, CastValueError> {
        match self {
            Value::Primitive(prim) => Ok(prim.to_clean_str()),
            _ => Err(CastValueError {
                requested: "string",
                got: self.value_type(),
            }),
        }
    }

    /// Convert the value into raw bytes,
    /// failing when the value is not primitive.
    pub fn to_bytes(&self) -> Result<Cow<'_, [u8]>, CastValueError> {
        match self {
            Value::Primitive(prim) => Ok(prim.to_bytes()),
            _ => Err(CastValueError {
                requested: "bytes",
                got: self.value_type(),
            }),
        }
    }

    /// Retrieve a single integer from the underlying primitive.
    pub fn to_int<T>(&self) -> ConvertResult<T>
    where
        T: num_traits::NumCast + std::str::FromStr<Err = std::num::ParseIntError>,
    {
        match self {
            Value::Primitive(prim) => prim.to_int(),
            _ => Err(ConvertValueError {
                requested: "integer",
                original: self.value_type(),
                cause: None,
            }),
        }
    }
}

impl<I> PartialEq for Value<I>
where
    I: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Primitive(a), Value::Primitive(b)) => a == b,
            (Value::Sequence { items: a, .. }, Value::Sequence { items: b, .. }) => a == b,
            (
                Value::PixelSequence {
                    offset_table: ot_a,
                    fragments: fr_a,
                },
                Value::PixelSequence {
                    offset_table: ot_b,
                    fragments: fr_b,
                },
            ) => ot_a == ot_b && fr_a == fr_b,
            _ => false,
        }
    }
}

impl<I> From<PrimitiveValue> for Value<I> {
    fn from(v: PrimitiveValue) -> Self {
        Value::Primitive(v)
    }
}

impl<I> From<&str> for Value<I> {
    fn from(v: &str) -> Self {
        Value::Primitive(v.into())
    }
}

impl<I> From<String> for Value<I> {
    fn from(v: String) -> Self {
        Value::Primitive(v.into())
    }
}
