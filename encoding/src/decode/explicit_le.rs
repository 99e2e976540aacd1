//! Element header decoding for Explicit VR Little Endian.

use super::basic::LittleEndianBasicDecoder;
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
/// Explicit VR Little Endian transfer syntax.
#[derive(Debug, Default, Clone)]
pub struct ExplicitVrLeDecoder {
    basic: LittleEndianBasicDecoder,
}

impl Decode for ExplicitVrLeDecoder {
    fn decode_header(&self, source: &mut dyn Read) -> Result<(DataElementHeader, usize)> {
        let tag = self.basic.decode_tag(source).context(ReadHeaderTagSnafu)?;

        if tag.group() == 0xFFFE {
            // item tags carry no VR or reserved field
            let len = self.basic.decode_ul(source).context(ReadItemLengthSnafu)?;
            return Ok((DataElementHeader::new(tag, VR::UN, Length(len)), 8));
        }

        let mut vr_bytes = [0u8; 2];
        source.read_exact(&mut vr_bytes).context(ReadVrSnafu)?;
        // unrecognized VRs are admitted as UN so that their value
        // can still be carried through
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
        Endianness::Little
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcmkit_core::header::Header;
    use std::io::{Cursor, Read, Seek, SeekFrom};

    // manually crafted data elements
    //  Tag: (0002,0002) Media Storage SOP Class UID
    //  VR: UI; Length: 26; Value: "1.2.840.10008.5.1.4.1.1.1\0"
    // --
    //  Tag: (0002,0010) Transfer Syntax UID
    //  VR: UI; Length: 20; Value: "1.2.840.10008.1.2.1\0"
    const RAW: &[u8; 62] = &[
        0x02, 0x00, 0x02, 0x00, 0x55, 0x49, 0x1a, 0x00, 0x31, 0x2e, 0x32, 0x2e, 0x38, 0x34, 0x30,
        0x2e, 0x31, 0x30, 0x30, 0x30, 0x38, 0x2e, 0x35, 0x2e, 0x31, 0x2e, 0x34, 0x2e, 0x31, 0x2e,
        0x31, 0x2e, 0x31, 0x00, 0x02, 0x00, 0x10, 0x00, 0x55, 0x49, 0x14, 0x00, 0x31, 0x2e, 0x32,
        0x2e, 0x38, 0x34, 0x30, 0x2e, 0x31, 0x30, 0x30, 0x30, 0x38, 0x2e, 0x31, 0x2e, 0x32, 0x2e,
        0x31, 0x00,
    ];

    #[test]
    fn decode_element_headers() {
        let dec = ExplicitVrLeDecoder::default();
        let mut cursor = Cursor::new(RAW.as_ref());
        {
            let (elem, bytes_read) = dec.decode_header(&mut cursor).expect("first header");
            assert_eq!(elem.tag(), Tag(0x0002, 0x0002));
            assert_eq!(elem.vr(), VR::UI);
            assert_eq!(elem.length(), Length(26));
            assert_eq!(bytes_read, 8);
            let mut buffer = [0; 26];
            cursor.read_exact(&mut buffer).unwrap();
            assert_eq!(&buffer[0..13], b"1.2.840.10008");
        }
        assert_eq!(cursor.seek(SeekFrom::Current(0)).unwrap(), 34);
        {
            let (elem, _) = dec.decode_header(&mut cursor).expect("second header");
            assert_eq!(elem.tag(), Tag(0x0002, 0x0010));
            assert_eq!(elem.vr(), VR::UI);
            assert_eq!(elem.length(), Length(20));
            let mut buffer = [0; 20];
            cursor.read_exact(&mut buffer).unwrap();
            assert_eq!(&buffer[..], b"1.2.840.10008.1.2.1\0");
        }
    }

    // a sequence with undefined length and its delimiters
    const RAW_SEQUENCE: &[u8] = &[
        0x08, 0x00, 0x3F, 0x10, b'S', b'Q', 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, // (0008,103F) SQ U/L
        0xFE, 0xFF, 0x00, 0xE0, 0xFF, 0xFF, 0xFF, 0xFF, // item, U/L
        0xFE, 0xFF, 0x0D, 0xE0, 0x00, 0x00, 0x00, 0x00, // item delimiter
        0xFE, 0xFF, 0xDD, 0xE0, 0x00, 0x00, 0x00, 0x00, // sequence delimiter
    ];

    #[test]
    fn decode_sequence_framing() {
        let dec = ExplicitVrLeDecoder::default();
        let mut cursor = Cursor::new(RAW_SEQUENCE);
        let (elem, bytes_read) = dec.decode_header(&mut cursor).expect("sequence header");
        assert_eq!(elem.tag(), Tag(0x0008, 0x103F));
        assert_eq!(elem.vr(), VR::SQ);
        assert!(elem.length().is_undefined());
        assert_eq!(bytes_read, 12);

        let item = dec.decode_item_header(&mut cursor).expect("item header");
        assert!(matches!(item, SequenceItemHeader::Item { len } if len.is_undefined()));

        let item = dec.decode_item_header(&mut cursor).expect("item delimiter");
        assert!(matches!(item, SequenceItemHeader::ItemDelimiter));

        let item = dec.decode_item_header(&mut cursor).expect("sequence delimiter");
        assert!(matches!(item, SequenceItemHeader::SequenceDelimiter));
    }

    #[test]
    fn unknown_vr_falls_back_to_un() {
        // (0009,0001) with bogus VR "ZZ"; UN takes the long length form
        let raw = [
            0x09, 0x00, 0x01, 0x00, b'Z', b'Z', 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0xAB, 0xCD,
        ];
        let dec = ExplicitVrLeDecoder::default();
        let (elem, bytes_read) = dec.decode_header(&mut &raw[..]).unwrap();
        assert_eq!(elem.vr(), VR::UN);
        assert_eq!(elem.length(), Length(2));
        assert_eq!(bytes_read, 12);
    }
}
