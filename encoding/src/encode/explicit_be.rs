//! Element header encoding for Explicit VR Big Endian.

use super::basic::BigEndianBasicEncoder;
use super::{BasicEncode, Encode, Result, WriteItemHeaderSnafu, WriteLengthSnafu, WriteTagSnafu, WriteVrSnafu};
use byteordered::Endianness;
use dcmkit_core::header::DataElementHeader;
use snafu::ResultExt;
use std::io::{self, Write};

/// A data element header encoder for the
/// Explicit VR Big Endian transfer syntax.
#[derive(Debug, Default, Clone)]
pub struct ExplicitVrBeEncoder {
    basic: BigEndianBasicEncoder,
}

impl BasicEncode for ExplicitVrBeEncoder {
    fn endianness(&self) -> Endianness {
        Endianness::Big
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

impl Encode for ExplicitVrBeEncoder {
    fn encode_element_header(
        &self,
        to: &mut dyn Write,
        header: DataElementHeader,
    ) -> Result<usize> {
        self.basic
            .encode_tag(to, header.tag)
            .context(WriteTagSnafu)?;
        to.write_all(&header.vr.to_bytes()).context(WriteVrSnafu)?;
        if header.vr.has_long_length() {
            to.write_all(&[0u8, 0u8]).context(WriteVrSnafu)?;
            self.basic
                .encode_ul(to, header.len.0)
                .context(WriteLengthSnafu)?;
            Ok(12)
        } else {
            self.basic
                .encode_us(to, header.len.0 as u16)
                .context(WriteLengthSnafu)?;
            Ok(8)
        }
    }

    fn encode_item_header(&self, to: &mut dyn Write, len: u32) -> Result<()> {
        to.write_all(&[0xFF, 0xFE, 0xE0, 0x00])
            .context(WriteItemHeaderSnafu)?;
        self.basic.encode_ul(to, len).context(WriteLengthSnafu)
    }

    fn encode_item_delimiter(&self, to: &mut dyn Write) -> Result<()> {
        to.write_all(&[0xFF, 0xFE, 0xE0, 0x0D, 0x00, 0x00, 0x00, 0x00])
            .context(WriteItemHeaderSnafu)
    }

    fn encode_sequence_delimiter(&self, to: &mut dyn Write) -> Result<()> {
        to.write_all(&[0xFF, 0xFE, 0xE0, 0xDD, 0x00, 0x00, 0x00, 0x00])
            .context(WriteItemHeaderSnafu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcmkit_core::header::Length;
    use dcmkit_core::{Tag, VR};

    #[test]
    fn short_form_header_big_endian() {
        let enc = ExplicitVrBeEncoder::default();
        let mut out = Vec::new();
        let n = enc
            .encode_element_header(
                &mut out,
                DataElementHeader::new(Tag(0x0028, 0x0010), VR::US, Length(2)),
            )
            .unwrap();
        assert_eq!(n, 8);
        assert_eq!(out, vec![0x00, 0x28, 0x00, 0x10, b'U', b'S', 0x00, 0x02]);
    }
}
