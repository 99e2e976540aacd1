//! Element header encoding for Implicit VR Little Endian.

use super::basic::LittleEndianBasicEncoder;
use super::{BasicEncode, Encode, Result, WriteItemHeaderSnafu, WriteLengthSnafu, WriteTagSnafu};
use byteordered::Endianness;
use dcmkit_core::header::DataElementHeader;
use snafu::ResultExt;
use std::io::{self, Write};

/// A data element header encoder for the
/// Implicit VR Little Endian transfer syntax.
/// The value representation is not written.
#[derive(Debug, Default, Clone)]
pub struct ImplicitVrLeEncoder {
    basic: LittleEndianBasicEncoder,
}

impl BasicEncode for ImplicitVrLeEncoder {
    fn endianness(&self) -> Endianness {
        Endianness::Little
    }

    fn encode_us(&self, to: &mut dyn Write, value: u16) -> io::Result<()> {
        self.basic.encode_us(to, value)
    }

    fn encode_ul(&self, to: &mut dyn Write, value: u32) -> io::Result<()> {
        self.basic.encode_ul(to, value)
    }

    fn encode_uv(&self, to: &mut dyn Write, value: u64) -> io::Result<()> {
        self.basic.encode_uv(to, value)
    }

    fn encode_ss(&self, to: &mut dyn Write, value: i16) -> io::Result<()> {
        self.basic.encode_ss(to, value)
    }

    fn encode_sl(&self, to: &mut dyn Write, value: i32) -> io::Result<()> {
        self.basic.encode_sl(to, value)
    }

    fn encode_sv(&self, to: &mut dyn Write, value: i64) -> io::Result<()> {
        self.basic.encode_sv(to, value)
    }

    fn encode_fl(&self, to: &mut dyn Write, value: f32) -> io::Result<()> {
        self.basic.encode_fl(to, value)
    }

    fn encode_fd(&self, to: &mut dyn Write, value: f64) -> io::Result<()> {
        self.basic.encode_fd(to, value)
    }
}

impl Encode for ImplicitVrLeEncoder {
    fn encode_element_header(
        &self,
        to: &mut dyn Write,
        header: DataElementHeader,
    ) -> Result<usize> {
        self.basic
            .encode_tag(to, header.tag)
            .context(WriteTagSnafu)?;
        self.basic
            .encode_ul(to, header.len.0)
            .context(WriteLengthSnafu)?;
        Ok(8)
    }

    fn encode_item_header(&self, to: &mut dyn Write, len: u32) -> Result<()> {
        to.write_all(&[0xFE, 0xFF, 0x00, 0xE0])
            .context(WriteItemHeaderSnafu)?;
        self.basic.encode_ul(to, len).context(WriteLengthSnafu)
    }

    fn encode_item_delimiter(&self, to: &mut dyn Write) -> Result<()> {
        to.write_all(&[0xFE, 0xFF, 0x0D, 0xE0, 0x00, 0x00, 0x00, 0x00])
            .context(WriteItemHeaderSnafu)
    }

    fn encode_sequence_delimiter(&self, to: &mut dyn Write) -> Result<()> {
        to.write_all(&[0xFE, 0xFF, 0xDD, 0xE0, 0x00, 0x00, 0x00, 0x00])
            .context(WriteItemHeaderSnafu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcmkit_core::header::Length;
    use dcmkit_core::{Tag, VR};

    #[test]
    fn header_has_no_vr() {
        let enc = ImplicitVrLeEncoder::default();
        let mut out = Vec::new();
        let n = enc
            .encode_element_header(
                &mut out,
                DataElementHeader::new(Tag(0x0010, 0x0010), VR::PN, Length(10)),
            )
            .unwrap();
        assert_eq!(n, 8);
        assert_eq!(
            out,
            vec![0x10, 0x00, 0x10, 0x00, 0x0A, 0x00, 0x00, 0x00]
        );
    }
}
