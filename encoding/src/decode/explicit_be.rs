//! Element header decoding for Explicit VR Big Endian.
//!
//! This transfer syntax is retired but still encountered
//! in archives; header framing is identical to the little
//! endian form apart from the byte order.

use super::basic::BigEndianBasicDecoder;
use super::{
    BadSequenceHeaderSnafu, BasicDecode, Decode, ReadHeaderTagSnafu, ReadItemHeaderSnafu,
    ReadItemLengthSnafu, ReadLengthSnafu, ReadReservedSnafu, ReadVrSnafu, Result,
};
use byteordered::Endianness;
use dcmkit_core::header::{DataElementHeader, Length, SequenceItemHeader};
use dcmkit_core::{Tag, VR};
use snafu::ResultExt;
use std::io::Read;

/// A data element header decoder for the
/// Explicit VR Big Endian transfer syntax.
#[derive(Debug, Default, Clone)]
pub struct ExplicitVrBeDecoder {
    basic: BigEndianBasicDecoder,
}

impl Decode for ExplicitVrBeDecoder {
    fn decode_header(&self, source: &mut dyn Read) -> Result<(DataElementHeader, usize)> {
        let tag = self.basic.decode_tag(source).context(ReadHeaderTagSnafu)?;

        if tag.group() == 0xFFFE {
            let len = self.basic.decode_ul(source).context(ReadItemLengthSnafu)?;
            return Ok((DataElementHeader::new(tag, VR::UN, Length(len)), 8));
        }

        let mut vr_bytes = [0u8; 2];
        source.read_exact(&mut vr_bytes).context(ReadVrSnafu)?;
        let vr = VR::from_binary(vr_bytes).unwrap_or(VR::UN);

        let (len, bytes_read) = if vr.has_long_length() {
            let mut reserved = [0u8; 2];
            source.read_exact(&mut reserved).context(ReadReservedSnafu)?;
            let len = self.basic.decode_ul(source).context(ReadLengthSnafu)?;
            (len, 12)
        } else {
            let len = self.basic.decode_us(source).context(ReadLengthSnafu)?;
            (u32::from(len), 8)
        };

        Ok((DataElementHeader::new(tag, vr, Length(len)), bytes_read))
    }

    fn decode_item_header(&self, source: &mut dyn Read) -> Result<SequenceItemHeader> {
        let tag = self.basic.decode_tag(source).context(ReadItemHeaderSnafu)?;
        let len = self.basic.decode_ul(source).context(ReadItemLengthSnafu)?;
        SequenceItemHeader::new(tag, Length(len)).context(BadSequenceHeaderSnafu)
    }

    fn decode_tag(&self, source: &mut dyn Read) -> Result<Tag> {
        self.basic.decode_tag(source).context(ReadHeaderTagSnafu)
    }

    fn endianness(&self) -> Endianness {
        Endianness::Big
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcmkit_core::header::Header;

    //  Tag: (0028,0010) Rows, VR: US, Length: 2, Value: 512
    const RAW: &[u8] = &[0x00, 0x28, 0x00, 0x10, b'U', b'S', 0x00, 0x02, 0x02, 0x00];

    #[test]
    fn decode_big_endian_header() {
        let dec = ExplicitVrBeDecoder::default();
        let mut cursor = RAW;
        let (elem, bytes_read) = dec.decode_header(&mut cursor).unwrap();
        assert_eq!(elem.tag(), Tag(0x0028, 0x0010));
        assert_eq!(elem.vr(), VR::US);
        assert_eq!(elem.length(), Length(2));
        assert_eq!(bytes_read, 8);
        assert_eq!(
            dec.basic.decode_us(&mut cursor).unwrap(),
            512,
            "value bytes remain for the caller"
        );
    }
}
