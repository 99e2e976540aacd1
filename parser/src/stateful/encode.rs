//! A stateful encoder over a byte sink.
//!
//! Complements the stateful decoder: tracks the write position and
//! the active character set, re-encodes text values accordingly,
//! and pads every value to even length.

use dcmkit_core::header::{DataElementHeader, Length};
use dcmkit_core::value::PrimitiveValue;
use dcmkit_core::{Tag, VR};
use dcmkit_encoding::encode::{self, Encode};
use dcmkit_encoding::text::{SpecificCharacterSet, TextCodec};
use dcmkit_encoding::transfer_syntax::TransferSyntax;
use snafu::{Backtrace, ResultExt, Snafu};
use std::io::Write;

/// An error during stateful encoding.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("could not encode element header of {} at position {}", tag, position))]
    EncodeHeader {
        tag: Tag,
        position: u64,
        #[snafu(backtrace)]
        source: encode::Error,
    },

    #[snafu(display("could not encode item framing at position {}", position))]
    EncodeItem {
        position: u64,
        #[snafu(backtrace)]
        source: encode::Error,
    },

    #[snafu(display("could not encode value of {} at position {}", tag, position))]
    EncodeValue {
        tag: Tag,
        position: u64,
        #[snafu(backtrace)]
        source: encode::Error,
    },

    #[snafu(display("could not encode text of {} at position {}", tag, position))]
    EncodeText {
        tag: Tag,
        position: u64,
        #[snafu(backtrace)]
        source: dcmkit_encoding::text::EncodeTextError,
    },

    #[snafu(display("could not write value bytes at position {}", position))]
    WriteBytes {
        position: u64,
        source: std::io::Error,
        backtrace: Backtrace,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A stateful DICOM data set encoder.
pub struct StatefulEncoder<W> {
    sink: W,
    encoder: Box<dyn Encode>,
    charset: SpecificCharacterSet,
    position: u64,
}

impl<W> std::fmt::Debug for StatefulEncoder<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatefulEncoder")
            .field("charset", &self.charset.name())
            .field("position", &self.position)
            .finish()
    }
}

impl<W> StatefulEncoder<W>
where
    W: Write,
{
    /// Create a stateful encoder writing to `sink`
    /// under the given transfer syntax.
    pub fn new(sink: W, ts: &TransferSyntax) -> Self {
        StatefulEncoder {
            sink,
            encoder: ts.encoder(),
            charset: SpecificCharacterSet::default(),
            position: 0,
        }
    }

    /// The number of bytes written so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Override the active character set used for text values.
    pub fn set_character_set(&mut self, charset: SpecificCharacterSet) {
        self.charset = charset;
    }

    /// Encode a whole primitive data element: header and value,
    /// with the value re-encoded by the active character set
    /// and padded to even length. The declared length of the given
    /// header is replaced by the actual encoded length.
    pub fn encode_primitive_element(
        &mut self,
        header: &DataElementHeader,
        value: &PrimitiveValue,
    ) -> Result<()> {
        let tag = header.tag;
        if header.vr.is_textual() {
            let text = value.to_str();
            let mut data = self
                .charset
                .encode(&text)
                .context(EncodeTextSnafu {
                    tag,
                    position: self.position,
                })?;
            if data.len() % 2 != 0 {
                data.push(header.vr.padding());
            }
            self.write_element_header(DataElementHeader::new(
                tag,
                header.vr,
                Length(data.len() as u32),
            ))?;
            self.write_all(&data)
        } else {
            let len = value.calculate_byte_len();
            self.write_element_header(DataElementHeader::new(
                tag,
                header.vr,
                Length(len as u32),
            ))?;
            let position = self.position;
            let written = self
                .encoder
                .encode_primitive(&mut self.sink, value)
                .context(EncodeValueSnafu { tag, position })?;
            self.position += written as u64;
            if written % 2 != 0 {
                self.write_all(&[header.vr.padding()])?;
            }
            Ok(())
        }
    }

    /// Encode a bare element header, leaving the value to the caller.
    pub fn write_element_header(&mut self, header: DataElementHeader) -> Result<()> {
        let position = self.position;
        let bytes = self
            .encoder
            .encode_element_header(&mut self.sink, header)
            .context(EncodeHeaderSnafu {
                tag: header.tag,
                position,
            })?;
        self.position += bytes as u64;
        Ok(())
    }

    /// Encode a sequence item header with the given length.
    pub fn encode_item_header(&mut self, len: u32) -> Result<()> {
        let position = self.position;
        self.encoder
            .encode_item_header(&mut self.sink, len)
            .context(EncodeItemSnafu { position })?;
        self.position += 8;
        Ok(())
    }

    /// Encode an item delimitation item.
    pub fn encode_item_delimiter(&mut self) -> Result<()> {
        let position = self.position;
        self.encoder
            .encode_item_delimiter(&mut self.sink)
            .context(EncodeItemSnafu { position })?;
        self.position += 8;
        Ok(())
    }

    /// Encode a sequence delimitation item.
    pub fn encode_sequence_delimiter(&mut self) -> Result<()> {
        let position = self.position;
        self.encoder
            .encode_sequence_delimiter(&mut self.sink)
            .context(EncodeItemSnafu { position })?;
        self.position += 8;
        Ok(())
    }

    /// Write raw bytes (fragment data, unknown content).
    pub fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let position = self.position;
        self.sink
            .write_all(data)
            .context(WriteBytesSnafu { position })?;
        self.position += data.len() as u64;
        Ok(())
    }

    /// Flush the underlying sink.
    pub fn flush(&mut self) -> Result<()> {
        let position = self.position;
        self.sink.flush().context(WriteBytesSnafu { position })
    }

    /// Recover the underlying sink.
    pub fn into_inner(self) -> W {
        self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcmkit_encoding::transfer_syntax::entries;

    #[test]
    fn odd_text_values_are_padded() {
        let mut out = Vec::new();
        {
            let mut enc = StatefulEncoder::new(&mut out, &entries::EXPLICIT_VR_LITTLE_ENDIAN);
            enc.encode_primitive_element(
                &DataElementHeader::new(Tag(0x0008, 0x0008), VR::CS, Length(7)),
                &PrimitiveValue::from("DERIVED"),
            )
            .unwrap();
        }
        // length field says 8, value is space padded
        assert_eq!(
            out,
            vec![
                0x08, 0x00, 0x08, 0x00, b'C', b'S', 0x08, 0x00, b'D', b'E', b'R', b'I', b'V',
                b'E', b'D', b' '
            ]
        );
    }

    #[test]
    fn uid_values_are_null_padded() {
        let mut out = Vec::new();
        {
            let mut enc = StatefulEncoder::new(&mut out, &entries::EXPLICIT_VR_LITTLE_ENDIAN);
            enc.encode_primitive_element(
                &DataElementHeader::new(Tag(0x0008, 0x0016), VR::UI, Length(0)),
                &PrimitiveValue::from("1.2.840.10008.1.1"),
            )
            .unwrap();
        }
        assert_eq!(out[6], 18);
        assert_eq!(*out.last().unwrap(), 0u8);
    }

    #[test]
    fn charset_applies_on_encode() {
        let mut out = Vec::new();
        {
            let mut enc = StatefulEncoder::new(&mut out, &entries::EXPLICIT_VR_LITTLE_ENDIAN);
            enc.set_character_set(SpecificCharacterSet::ISO_IR_100);
            enc.encode_primitive_element(
                &DataElementHeader::new(Tag(0x0010, 0x0010), VR::PN, Length(0)),
                &PrimitiveValue::from("João"),
            )
            .unwrap();
        }
        // "João" in ISO-8859-1 is 4 bytes
        assert_eq!(out[6], 4);
        assert_eq!(&out[8..], b"Jo\xE3o");
    }

    #[test]
    fn numeric_values_use_syntax_byte_order() {
        let mut out = Vec::new();
        {
            let mut enc = StatefulEncoder::new(&mut out, &entries::EXPLICIT_VR_BIG_ENDIAN);
            enc.encode_primitive_element(
                &DataElementHeader::new(Tag(0x0028, 0x0010), VR::US, Length(2)),
                &PrimitiveValue::from(512u16),
            )
            .unwrap();
        }
        assert_eq!(&out[8..], &[0x02, 0x00]);
    }
}
