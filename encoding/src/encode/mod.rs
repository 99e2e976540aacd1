//! Data element header and primitive value encoding,
//! dispatched by transfer syntax.

use byteordered::Endianness;
use dcmkit_core::header::DataElementHeader;
use dcmkit_core::value::PrimitiveValue;
use dcmkit_core::Tag;
use snafu::{Backtrace, ResultExt, Snafu};
use std::io::{self, Write};

pub mod basic;
pub mod explicit_be;
pub mod explicit_le;
pub mod implicit_le;

/// An error which may occur while encoding element headers
/// and values.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("could not write tag"))]
    WriteTag {
        backtrace: Backtrace,
        source: io::Error,
    },
    #[snafu(display("could not write value representation"))]
    WriteVr {
        backtrace: Backtrace,
        source: io::Error,
    },
    #[snafu(display("could not write value length"))]
    WriteLength {
        backtrace: Backtrace,
        source: io::Error,
    },
    #[snafu(display("could not write item header"))]
    WriteItemHeader {
        backtrace: Backtrace,
        source: io::Error,
    },
    #[snafu(display("could not write {} value", typ))]
    WriteBinary {
        typ: &'static str,
        backtrace: Backtrace,
        source: io::Error,
    },
    #[snafu(display("could not write string value"))]
    WriteString {
        backtrace: Backtrace,
        source: io::Error,
    },
    #[snafu(display("could not write value bytes"))]
    WriteBytes {
        backtrace: Backtrace,
        source: io::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Type trait for an encoder of basic binary values
/// by a fixed byte order.
pub trait BasicEncode {
    /// The encoder's byte order.
    fn endianness(&self) -> Endianness;

    /// Encode an unsigned short value.
    fn encode_us(&self, to: &mut dyn Write, value: u16) -> io::Result<()>;

    /// Encode an unsigned long value.
    fn encode_ul(&self, to: &mut dyn Write, value: u32) -> io::Result<()>;

    /// Encode an unsigned very long value.
    fn encode_uv(&self, to: &mut dyn Write, value: u64) -> io::Result<()>;

    /// Encode a signed short value.
    fn encode_ss(&self, to: &mut dyn Write, value: i16) -> io::Result<()>;

    /// Encode a signed long value.
    fn encode_sl(&self, to: &mut dyn Write, value: i32) -> io::Result<()>;

    /// Encode a signed very long value.
    fn encode_sv(&self, to: &mut dyn Write, value: i64) -> io::Result<()>;

    /// Encode a single precision float value.
    fn encode_fl(&self, to: &mut dyn Write, value: f32) -> io::Result<()>;

    /// Encode a double precision float value.
    fn encode_fd(&self, to: &mut dyn Write, value: f64) -> io::Result<()>;

    /// Encode an attribute tag.
    fn encode_tag(&self, to: &mut dyn Write, tag: Tag) -> io::Result<()> {
        self.encode_us(to, tag.group())?;
        self.encode_us(to, tag.element())
    }

    /// Encode a primitive value, delegating to the typed methods.
    ///
    /// Returns the number of bytes written, without padding:
    /// text values are written in UTF-8 and it is up to the caller
    /// to re-encode them by the active character set beforehand
    /// and to pad the value to even length afterwards.
    fn encode_primitive(&self, to: &mut dyn Write, value: &PrimitiveValue) -> Result<usize> {
        use PrimitiveValue::*;
        match value {
            Empty => Ok(0),
            U8(values) => {
                to.write_all(values).context(WriteBytesSnafu)?;
                Ok(values.len())
            }
            I16(values) => {
                for v in values {
                    self.encode_ss(to, *v).context(WriteBinarySnafu { typ: "I16" })?;
                }
                Ok(values.len() * 2)
            }
            U16(values) => {
                for v in values {
                    self.encode_us(to, *v).context(WriteBinarySnafu { typ: "U16" })?;
                }
                Ok(values.len() * 2)
            }
            I32(values) => {
                for v in values {
                    self.encode_sl(to, *v).context(WriteBinarySnafu { typ: "I32" })?;
                }
                Ok(values.len() * 4)
            }
            U32(values) => {
                for v in values {
                    self.encode_ul(to, *v).context(WriteBinarySnafu { typ: "U32" })?;
                }
                Ok(values.len() * 4)
            }
            I64(values) => {
                for v in values {
                    self.encode_sv(to, *v).context(WriteBinarySnafu { typ: "I64" })?;
                }
                Ok(values.len() * 8)
            }
            U64(values) => {
                for v in values {
                    self.encode_uv(to, *v).context(WriteBinarySnafu { typ: "U64" })?;
                }
                Ok(values.len() * 8)
            }
            F32(values) => {
                for v in values {
                    self.encode_fl(to, *v).context(WriteBinarySnafu { typ: "F32" })?;
                }
                Ok(values.len() * 4)
            }
            F64(values) => {
                for v in values {
                    self.encode_fd(to, *v).context(WriteBinarySnafu { typ: "F64" })?;
                }
                Ok(values.len() * 8)
            }
            Tags(tags) => {
                for tag in tags {
                    self.encode_tag(to, *tag).context(WriteBinarySnafu { typ: "AT" })?;
                }
                Ok(tags.len() * 4)
            }
            Str(s) => {
                to.write_all(s.as_bytes()).context(WriteStringSnafu)?;
                Ok(s.len())
            }
            Strs(_) | Date(_) | Time(_) | DateTime(_) => {
                let text = value.to_str();
                to.write_all(text.as_bytes()).context(WriteStringSnafu)?;
                Ok(text.len())
            }
        }
    }
}

/// Type trait for encoding data element headers
/// under a concrete transfer syntax.
///
/// The trait is object safe, so that an encoder can be chosen
/// at run time from the transfer syntax registry.
pub trait Encode: BasicEncode {
    /// Encode a data element header.
    /// Returns the number of bytes written.
    fn encode_element_header(
        &self,
        to: &mut dyn Write,
        header: DataElementHeader,
    ) -> Result<usize>;

    /// Encode a sequence item header with the given length
    /// (possibly the undefined sentinel).
    fn encode_item_header(&self, to: &mut dyn Write, len: u32) -> Result<()>;

    /// Encode an item delimitation item.
    fn encode_item_delimiter(&self, to: &mut dyn Write) -> Result<()>;

    /// Encode a sequence delimitation item.
    fn encode_sequence_delimiter(&self, to: &mut dyn Write) -> Result<()>;
}

impl<T: ?Sized> BasicEncode for Box<T>
where
    T: BasicEncode,
{
    fn endianness(&self) -> Endianness {
        (**self).endianness()
    }

    fn encode_us(&self, to: &mut dyn Write, value: u16) -> io::Result<()> {
        (**self).encode_us(to, value)
    }

    fn encode_ul(&self, to: &mut dyn Write, value: u32) -> io::Result<()> {
        (**self).encode_ul(to, value)
    }

    fn encode_uv(&self, to: &mut dyn Write, value: u64) -> io::Result<()> {
        (**self).encode_uv(to, value)
    }

    fn encode_ss(&self, to: &mut dyn Write, value: i16) -> io::Result<()> {
        (**self).encode_ss(to, value)
    }

    fn encode_sl(&self, to: &mut dyn Write, value: i32) -> io::Result<()> {
        (**self).encode_sl(to, value)
    }

    fn encode_sv(&self, to: &mut dyn Write, value: i64) -> io::Result<()> {
        (**self).encode_sv(to, value)
    }

    fn encode_fl(&self, to: &mut dyn Write, value: f32) -> io::Result<()> {
        (**self).encode_fl(to, value)
    }

    fn encode_fd(&self, to: &mut dyn Write, value: f64) -> io::Result<()> {
        (**self).encode_fd(to, value)
    }
}

impl<T: ?Sized> Encode for Box<T>
where
    T: Encode,
{
    fn encode_element_header(
        &self,
        to: &mut dyn Write,
        header: DataElementHeader,
    ) -> Result<usize> {
        (**self).encode_element_header(to, header)
    }

    fn encode_item_header(&self, to: &mut dyn Write, len: u32) -> Result<()> {
        (**self).encode_item_header(to, len)
    }

    fn encode_item_delimiter(&self, to: &mut dyn Write) -> Result<()> {
        (**self).encode_item_delimiter(to)
    }

    fn encode_sequence_delimiter(&self, to: &mut dyn Write) -> Result<()> {
        (**self).encode_sequence_delimiter(to)
    }
}
