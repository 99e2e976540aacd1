//! Element header decoding for Implicit VR Little Endian.
//!
//! The value representation is not on the wire; it is inferred
//! from an attribute dictionary, falling back to UN for tags
//! the dictionary does not know.

use super::basic::LittleEndianBasicDecoder;
use super::{
    BadSequenceHeaderSnafu, BasicDecode, Decode, ReadHeaderTagSnafu, ReadItemHeaderSnafu,
    ReadItemLengthSnafu, ReadLengthSnafu, Result,
};
use byteordered::Endianness;
use dcmkit_core::dictionary::AttributeDictionary;
use dcmkit_core::header::{DataElementHeader, Length, SequenceItemHeader};
use dcmkit_core::{Tag, VR};
use dcmkit_dictionary_std::StandardAttributeDictionary;
use snafu::ResultExt;
use std::io::Read;

/// A data element header decoder for the
/// Implicit VR Little Endian transfer syntax,
/// with a pluggable attribute dictionary for VR inference.
#[derive(Debug, Clone)]
pub struct ImplicitVrLeDecoder<D = StandardAttributeDictionary> {
    basic: LittleEndianBasicDecoder,
    dict: D,
}

impl Default for ImplicitVrLeDecoder<StandardAttributeDictionary> {
    fn default() -> Self {
        ImplicitVrLeDecoder::with_dictionary(StandardAttributeDictionary)
    }
}

impl<D> ImplicitVrLeDecoder<D>
where
    D: AttributeDictionary,
{
    /// Create a decoder which infers VRs from the given dictionary.
    pub fn with_dictionary(dict: D) -> Self {
        ImplicitVrLeDecoder {
            basic: LittleEndianBasicDecoder,
            dict,
        }
    }

    fn infer_vr(&self, tag: Tag, len: Length) -> VR {
        match self.dict.entry(tag) {
            // sequences with a defined VR in the dictionary keep it;
            // an undefined length forces SQ even for unknown tags,
            // since only sequences may be framed that way here
            Some(entry) => entry.vr,
            None if len.is_undefined() => VR::SQ,
            None => VR::UN,
        }
    }
}

impl<D> Decode for ImplicitVrLeDecoder<D>
where
    D: AttributeDictionary,
{
    fn decode_header(&self, source: &mut dyn Read) -> Result<(DataElementHeader, usize)> {
        let tag = self.basic.decode_tag(source).context(ReadHeaderTagSnafu)?;
        let len = self.basic.decode_ul(source).context(ReadLengthSnafu)?;
        let len = Length(len);
        let vr = if tag.group() == 0xFFFE {
            VR::UN
        } else {
            self.infer_vr(tag, len)
        };
        Ok((DataElementHeader::new(tag, vr, len), 8))
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
