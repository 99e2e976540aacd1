//! Data element header decoding, dispatched by transfer syntax.

use byteordered::Endianness;
use dcmkit_core::header::{DataElementHeader, SequenceItemHeader};
use dcmkit_core::Tag;
use snafu::{Backtrace, Snafu};
use std::io::{self, Read};

pub mod basic;
pub mod explicit_be;
pub mod explicit_le;
pub mod implicit_le;

/// An error which may occur while decoding element headers.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("could not read header tag"))]
    ReadHeaderTag {
        backtrace: Backtrace,
        source: io::Error,
    },
    #[snafu(display("could not read item header"))]
    ReadItemHeader {
        backtrace: Backtrace,
        source: io::Error,
    },
    #[snafu(display("could not read item length"))]
    ReadItemLength {
        backtrace: Backtrace,
        source: io::Error,
    },
    #[snafu(display("could not read value representation"))]
    ReadVr {
        backtrace: Backtrace,
        source: io::Error,
    },
    #[snafu(display("could not read reserved header bytes"))]
    ReadReserved {
        backtrace: Backtrace,
        source: io::Error,
    },
    #[snafu(display("could not read value length"))]
    ReadLength {
        backtrace: Backtrace,
        source: io::Error,
    },
    #[snafu(display("unrecognized value representation of element {}", tag))]
    UnknownVr { tag: Tag, backtrace: Backtrace },
    #[snafu(display("bad sequence item header"))]
    BadSequenceHeader {
        source: dcmkit_core::header::SequenceItemError,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Type trait for decoding basic binary values by a fixed byte order.
///
/// There are, and will only be, two implementations
/// ([`basic::LittleEndianBasicDecoder`] and
/// [`basic::BigEndianBasicDecoder`]), plus the run-time dispatching
/// [`basic::BasicDecoder`].
pub trait BasicDecode {
    /// The byte order expected by this decoder.
    fn endianness(&self) -> Endianness;

    /// Decode an unsigned short value from the source.
    fn decode_us(&self, source: &mut dyn Read) -> io::Result<u16>;

    /// Decode an unsigned long value from the source.
    fn decode_ul(&self, source: &mut dyn Read) -> io::Result<u32>;

    /// Decode an unsigned very long value from the source.
    fn decode_uv(&self, source: &mut dyn Read) -> io::Result<u64>;

    /// Decode a signed short value from the source.
    fn decode_ss(&self, source: &mut dyn Read) -> io::Result<i16>;

    /// Decode a signed long value from the source.
    fn decode_sl(&self, source: &mut dyn Read) -> io::Result<i32>;

    /// Decode a signed very long value from the source.
    fn decode_sv(&self, source: &mut dyn Read) -> io::Result<i64>;

    /// Decode a single precision float value from the source.
    fn decode_fl(&self, source: &mut dyn Read) -> io::Result<f32>;

    /// Decode a double precision float value from the source.
    fn decode_fd(&self, source: &mut dyn Read) -> io::Result<f64>;

    /// Decode an attribute tag from the source.
    fn decode_tag(&self, source: &mut dyn Read) -> io::Result<Tag> {
        let group = self.decode_us(source)?;
        let element = self.decode_us(source)?;
        Ok(Tag(group, element))
    }
}

/// Type trait for decoding data element headers
/// under a concrete transfer syntax.
///
/// The trait is object safe, so that a decoder can be chosen
/// at run time from the transfer syntax registry.
pub trait Decode {
    /// Decode a data element header from the source.
    /// Returns the header and the number of bytes read.
    ///
    /// The value itself is not read.
    fn decode_header(&self, source: &mut dyn Read) -> Result<(DataElementHeader, usize)>;

    /// Decode a sequence item header (item, item delimiter
    /// or sequence delimiter) from the source.
    /// Always reads exactly 8 bytes.
    fn decode_item_header(&self, source: &mut dyn Read) -> Result<SequenceItemHeader>;

    /// Decode an attribute tag from the source.
    fn decode_tag(&self, source: &mut dyn Read) -> Result<Tag>;

    /// The byte order of values under this decoder.
    fn endianness(&self) -> Endianness;
}

impl<T: ?Sized> Decode for Box<T>
where
    T: Decode,
{
    fn decode_header(&self, source: &mut dyn Read) -> Result<(DataElementHeader, usize)> {
        (**self).decode_header(source)
    }

    fn decode_item_header(&self, source: &mut dyn Read) -> Result<SequenceItemHeader> {
        (**self).decode_item_header(source)
    }

    fn decode_tag(&self, source: &mut dyn Read) -> Result<Tag> {
        (**self).decode_tag(source)
    }

    fn endianness(&self) -> Endianness {
        (**self).endianness()
    }
}

/// Obtain a decoder for the data elements of a DICOM file's meta
/// information group, which is always in Explicit VR Little Endian.
pub fn file_header_decoder() -> explicit_le::ExplicitVrLeDecoder {
    explicit_le::ExplicitVrLeDecoder::default()
}
