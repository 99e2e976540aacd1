//! Interpretation of DICOM data sets as streams of tokens.
//!
//! Reading a data set yields a flat sequence of [`DataToken`]s
//! which mirror the element structure, including sequence nesting
//! and encapsulated pixel data framing. Writing consumes the same
//! token stream.

pub mod read;
pub mod write;

use dcmkit_core::header::{DataElementHeader, Length};
use dcmkit_core::value::PrimitiveValue;
use dcmkit_core::Tag;
use std::fmt;

pub use self::read::DataSetReader;
pub use self::write::DataSetWriter;

/// A token of a DICOM data set stream.
#[derive(Debug, Clone)]
pub enum DataToken {
    /// A data header of a primitive value.
    ElementHeader(DataElementHeader),
    /// The beginning of a sequence element.
    SequenceStart {
        /// the sequence tag
        tag: Tag,
        /// the declared sequence length, possibly undefined
        len: Length,
    },
    /// The beginning of an encapsulated pixel data element.
    PixelSequenceStart,
    /// The ending delimiter of a sequence or of encapsulated
    /// pixel data.
    SequenceEnd,
    /// The beginning of a new item in the sequence.
    ItemStart {
        /// the declared item length, possibly undefined
        len: Length,
    },
    /// The ending delimiter of an item.
    ItemEnd,
    /// A primitive data element value.
    PrimitiveValue(PrimitiveValue),
    /// The value of a single encapsulated pixel data fragment.
    ItemValue(Vec<u8>),
    /// The basic offset table of an encapsulated pixel data
    /// element: byte offsets to the first fragment of each frame.
    OffsetTable(Vec<u32>),
}

impl fmt::Display for DataToken {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DataToken::PrimitiveValue(v) => write!(f, "PrimitiveValue({:?})", v.value_type()),
            DataToken::ItemValue(data) => write!(f, "ItemValue({} bytes)", data.len()),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Token equality treats two undefined lengths as equal,
/// unlike [`Length`] itself.
impl PartialEq for DataToken {
    fn eq(&self, other: &Self) -> bool {
        use DataToken::*;
        match (self, other) {
            (ElementHeader(h1), ElementHeader(h2)) => {
                h1.tag == h2.tag && h1.vr == h2.vr && h1.len.inner_eq(h2.len)
            }
            (
                SequenceStart {
                    tag: tag1,
                    len: len1,
                },
                SequenceStart {
                    tag: tag2,
                    len: len2,
                },
            ) => tag1 == tag2 && len1.inner_eq(*len2),
            (ItemStart { len: len1 }, ItemStart { len: len2 }) => len1.inner_eq(*len2),
            (PrimitiveValue(v1), PrimitiveValue(v2)) => v1 == v2,
            (ItemValue(v1), ItemValue(v2)) => v1 == v2,
            (OffsetTable(v1), OffsetTable(v2)) => v1 == v2,
            (ItemEnd, ItemEnd)
            | (SequenceEnd, SequenceEnd)
            | (PixelSequenceStart, PixelSequenceStart) => true,
            _ => false,
        }
    }
}

impl From<DataElementHeader> for DataToken {
    fn from(header: DataElementHeader) -> Self {
        use dcmkit_core::VR;
        match (header.vr, header.tag) {
            (VR::OB | VR::OW | VR::UN, Tag(0x7FE0, 0x0010)) if header.len.is_undefined() => {
                DataToken::PixelSequenceStart
            }
            (VR::SQ, _) => DataToken::SequenceStart {
                tag: header.tag,
                len: header.len,
            },
            _ => DataToken::ElementHeader(header),
        }
    }
}

impl DataToken {
    /// Whether this token starts a sequence of nested data sets.
    pub fn is_sequence_start(&self) -> bool {
        matches!(self, DataToken::SequenceStart { .. })
    }

    /// Whether this token ends a sequence or an encapsulated
    /// pixel data element.
    pub fn is_sequence_end(&self) -> bool {
        matches!(self, DataToken::SequenceEnd)
    }
}
