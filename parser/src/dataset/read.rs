//! A data set reader which interprets a byte source
//! as a stream of [`DataToken`]s.

use super::DataToken;
use crate::stateful::decode::{self, StatefulDecoder};
use dcmkit_core::header::{Header, Length, SequenceItemHeader};
use dcmkit_core::{Tag, VR};
use dcmkit_dictionary_std::tags;
use dcmkit_encoding::text::SpecificCharacterSet;
use dcmkit_encoding::TextCodec;
use dcmkit_encoding::transfer_syntax::TransferSyntax;
use snafu::Snafu;
use std::io::Read;
use tracing::warn;

/// An error while reading a data set token stream.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("could not decode data set content"))]
    DecodeContent {
        #[snafu(backtrace)]
        source: decode::Error,
    },

    #[snafu(display("unexpected {} delimiter at depth {}", kind, depth))]
    UnexpectedDelimiter { kind: &'static str, depth: usize },

    #[snafu(display("pixel data fragment item has undefined length"))]
    FragmentUndefinedLength,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Frame {
    /// Between items of a sequence.
    Sequence { end: Option<u64> },
    /// Inside a sequence item, reading elements.
    Item { end: Option<u64> },
    /// Inside an encapsulated pixel data element.
    PixelSequence { read_offset_table: bool },
}

/// A reader which interprets a byte source as a flat stream of
/// data set tokens, tracking sequence nesting, item framing,
/// encapsulated pixel data, and the active character set.
#[derive(Debug)]
pub struct DataSetReader<S> {
    decoder: StatefulDecoder<S>,
    stack: Vec<Frame>,
    pending_value: Option<dcmkit_core::DataElementHeader>,
    done: bool,
}

impl<S> DataSetReader<S>
where
    S: Read,
{
    /// Create a data set reader over the given source,
    /// decoding under the given transfer syntax.
    pub fn new(source: S, ts: &TransferSyntax) -> Self {
        DataSetReader {
            decoder: StatefulDecoder::new(source, ts),
            stack: Vec::new(),
            pending_value: None,
            done: false,
        }
    }

    /// Override the initial character set.
    pub fn with_character_set(mut self, charset: SpecificCharacterSet) -> Self {
        self.decoder.set_character_set(charset);
        self
    }

    /// The number of bytes consumed so far.
    pub fn position(&self) -> u64 {
        self.decoder.position()
    }

    /// Recover the inner stateful decoder.
    pub fn into_decoder(self) -> StatefulDecoder<S> {
        self.decoder
    }

    /// Skip the value owed by the last returned element header
    /// instead of decoding it on the next iteration.
    /// Returns whether there was a pending value to skip.
    pub fn skip_pending_value(&mut self) -> Result<bool> {
        match self.pending_value.take() {
            Some(header) => {
                if let Some(len) = header.len.get() {
                    self.decoder
                        .skip_bytes(len)
                        .map_err(|source| Error::DecodeContent { source })?;
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn next_token(&mut self) -> Result<Option<DataToken>> {
        // a previously returned header owes its value
        if let Some(header) = self.pending_value.take() {
            let value = self
                .decoder
                .read_value(&header)
                .map_err(|source| Error::DecodeContent { source })?;
            if header.tag == tags::SPECIFIC_CHARACTER_SET {
                self.update_character_set(&value);
            }
            return Ok(Some(DataToken::PrimitiveValue(value)));
        }

        // close any frame which ends exactly here by byte count
        if let Some(frame) = self.stack.last().copied() {
            let position = self.decoder.position();
            match frame {
                Frame::Sequence { end: Some(end) } if position >= end => {
                    self.stack.pop();
                    return Ok(Some(DataToken::SequenceEnd));
                }
                Frame::Item { end: Some(end) } if position >= end => {
                    self.stack.pop();
                    return Ok(Some(DataToken::ItemEnd));
                }
                _ => {}
            }
        }

        match self.stack.last().copied() {
            Some(Frame::Sequence { .. }) => self.read_item_boundary(),
            Some(Frame::PixelSequence { read_offset_table }) => {
                self.read_pixel_item(read_offset_table)
            }
            Some(Frame::Item { .. }) | None => self.read_element(),
        }
    }

    fn read_item_boundary(&mut self) -> Result<Option<DataToken>> {
        let item = self
            .decoder
            .decode_item_header()
            .map_err(|source| Error::DecodeContent { source })?;
        match item {
            SequenceItemHeader::Item { len } => {
                let end = len.get().map(|l| self.decoder.position() + u64::from(l));
                self.stack.push(Frame::Item { end });
                Ok(Some(DataToken::ItemStart { len }))
            }
            SequenceItemHeader::SequenceDelimiter => {
                self.stack.pop();
                Ok(Some(DataToken::SequenceEnd))
            }
            SequenceItemHeader::ItemDelimiter => UnexpectedDelimiterSnafu {
                kind: "item",
                depth: self.stack.len(),
            }
            .fail(),
        }
    }

    fn read_pixel_item(&mut self, read_offset_table: bool) -> Result<Option<DataToken>> {
        let item = self
            .decoder
            .decode_item_header()
            .map_err(|source| Error::DecodeContent { source })?;
        match item {
            SequenceItemHeader::Item { len } => {
                let len = len.get().ok_or_else(|| {
                    FragmentUndefinedLengthSnafu.build()
                })?;
                let header = dcmkit_core::DataElementHeader::new(
                    Tag(0xFFFE, 0xE000),
                    VR::OB,
                    Length(len),
                );
                let data = self
                    .decoder
                    .read_value_bytes(&header)
                    .map_err(|source| Error::DecodeContent { source })?;
                if !read_offset_table {
                    // the first item is the basic offset table
                    if let Some(Frame::PixelSequence { read_offset_table }) = self.stack.last_mut()
                    {
                        *read_offset_table = true;
                    }
                    let offsets = data
                        .chunks_exact(4)
                        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                        .collect();
                    Ok(Some(DataToken::OffsetTable(offsets)))
                } else {
                    Ok(Some(DataToken::ItemValue(data)))
                }
            }
            SequenceItemHeader::SequenceDelimiter => {
                self.stack.pop();
                Ok(Some(DataToken::SequenceEnd))
            }
            SequenceItemHeader::ItemDelimiter => UnexpectedDelimiterSnafu {
                kind: "item",
                depth: self.stack.len(),
            }
            .fail(),
        }
    }

    fn read_element(&mut self) -> Result<Option<DataToken>> {
        let header = match self.decoder.decode_header() {
            Ok(header) => header,
            Err(e) if self.stack.is_empty() && is_eof(&e) => {
                // a clean end of the data set
                return Ok(None);
            }
            Err(source) => return Err(Error::DecodeContent { source }),
        };

        if header.is_item_delimiter() {
            return match self.stack.pop() {
                Some(Frame::Item { .. }) => Ok(Some(DataToken::ItemEnd)),
                frame => {
                    if let Some(f) = frame {
                        self.stack.push(f);
                    }
                    UnexpectedDelimiterSnafu {
                        kind: "item",
                        depth: self.stack.len(),
                    }
                    .fail()
                }
            };
        }
        if header.is_sequence_delimiter() {
            // a sequence delimiter outside a sequence frame:
            // tolerated with a diagnostic, since some writers
            // emit stray delimiters after defined-length content
            warn!(
                "stray sequence delimiter at position {}",
                self.decoder.position()
            );
            return self.next_token();
        }

        match (header.vr, header.tag, header.len) {
            (VR::SQ, _, len) => {
                let end = len.get().map(|l| self.decoder.position() + u64::from(l));
                self.stack.push(Frame::Sequence { end });
                Ok(Some(DataToken::SequenceStart {
                    tag: header.tag,
                    len,
                }))
            }
            (VR::OB | VR::OW | VR::UN, Tag(0x7FE0, 0x0010), len) if len.is_undefined() => {
                self.stack.push(Frame::PixelSequence {
                    read_offset_table: false,
                });
                Ok(Some(DataToken::PixelSequenceStart))
            }
            (_, _, len) if len.is_undefined() => {
                // non-sequence elements cannot have undefined length;
                // treat the content as an implicitly framed sequence
                warn!(
                    "element {} with VR {} has undefined length; reading as sequence",
                    header.tag, header.vr
                );
                self.stack.push(Frame::Sequence { end: None });
                Ok(Some(DataToken::SequenceStart {
                    tag: header.tag,
                    len: Length::UNDEFINED,
                }))
            }
            _ => {
                self.pending_value = Some(header);
                Ok(Some(DataToken::ElementHeader(header)))
            }
        }
    }

    fn update_character_set(&mut self, value: &dcmkit_core::PrimitiveValue) {
        let codes = value.to_multi_str();
        match SpecificCharacterSet::from_codes(codes.iter().map(|c| c.as_str())) {
            Some(charset) => self.decoder.set_character_set(charset),
            None => warn!(
                "unsupported specific character set `{}`; keeping {:?}",
                value.to_str(),
                self.decoder.character_set().name()
            ),
        }
    }
}

fn is_eof(e: &decode::Error) -> bool {
    use std::error::Error as _;
    let mut source: Option<&(dyn std::error::Error + 'static)> = e.source();
    while let Some(err) = source {
        if let Some(io_err) = err.downcast_ref::<std::io::Error>() {
            return io_err.kind() == std::io::ErrorKind::UnexpectedEof;
        }
        source = err.source();
    }
    false
}

impl<S> Iterator for DataSetReader<S>
where
    S: Read,
{
    type Item = Result<DataToken>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_token() {
            Ok(Some(token)) => Some(Ok(token)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::DataToken;
    use dcmkit_core::header::DataElementHeader;
    use dcmkit_core::PrimitiveValue;
    use dcmkit_encoding::transfer_syntax::entries;

    fn collect_tokens(raw: &[u8], ts: &TransferSyntax) -> Vec<DataToken> {
        DataSetReader::new(raw, ts)
            .collect::<Result<Vec<_>, _>>()
            .expect("token stream")
    }

    #[test]
    fn flat_data_set() {
        // (0008,0060) CS "CT", (0028,0010) US 512
        let raw: &[u8] = &[
            0x08, 0x00, 0x60, 0x00, b'C', b'S', 0x02, 0x00, b'C', b'T', //
            0x28, 0x00, 0x10, 0x00, b'U', b'S', 0x02, 0x00, 0x00, 0x02,
        ];
        let tokens = collect_tokens(raw, &entries::EXPLICIT_VR_LITTLE_ENDIAN);
        assert_eq!(
            tokens,
            vec![
                DataToken::ElementHeader(DataElementHeader::new(
                    Tag(0x0008, 0x0060),
                    VR::CS,
                    Length(2)
                )),
                DataToken::PrimitiveValue(PrimitiveValue::from("CT")),
                DataToken::ElementHeader(DataElementHeader::new(
                    Tag(0x0028, 0x0010),
                    VR::US,
                    Length(2)
                )),
                DataToken::PrimitiveValue(PrimitiveValue::from(512u16)),
            ]
        );
    }

    #[test]
    fn sequence_with_undefined_lengths() {
        // (0008,1110) SQ U/L { item U/L { (0008,1150) UI "1.2" } }
        let raw: &[u8] = &[
            0x08, 0x00, 0x10, 0x11, b'S', b'Q', 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, //
            0xFE, 0xFF, 0x00, 0xE0, 0xFF, 0xFF, 0xFF, 0xFF, //
            0x08, 0x00, 0x50, 0x11, b'U', b'I', 0x04, 0x00, b'1', b'.', b'2', 0x00, //
            0xFE, 0xFF, 0x0D, 0xE0, 0x00, 0x00, 0x00, 0x00, //
            0xFE, 0xFF, 0xDD, 0xE0, 0x00, 0x00, 0x00, 0x00,
        ];
        let tokens = collect_tokens(raw, &entries::EXPLICIT_VR_LITTLE_ENDIAN);
        assert_eq!(
            tokens,
            vec![
                DataToken::SequenceStart {
                    tag: Tag(0x0008, 0x1110),
                    len: Length::UNDEFINED,
                },
                DataToken::ItemStart {
                    len: Length::UNDEFINED
                },
                DataToken::ElementHeader(DataElementHeader::new(
                    Tag(0x0008, 0x1150),
                    VR::UI,
                    Length(4)
                )),
                DataToken::PrimitiveValue(PrimitiveValue::from("1.2")),
                DataToken::ItemEnd,
                DataToken::SequenceEnd,
            ]
        );
    }

    #[test]
    fn sequence_with_defined_lengths() {
        // (0008,1110) SQ len=20 { item len=12 { (0008,1150) UI "1.2" } }
        let raw: &[u8] = &[
            0x08, 0x00, 0x10, 0x11, b'S', b'Q', 0x00, 0x00, 0x14, 0x00, 0x00, 0x00, //
            0xFE, 0xFF, 0x00, 0xE0, 0x0C, 0x00, 0x00, 0x00, //
            0x08, 0x00, 0x50, 0x11, b'U', b'I', 0x04, 0x00, b'1', b'.', b'2', 0x00,
        ];
        let tokens = collect_tokens(raw, &entries::EXPLICIT_VR_LITTLE_ENDIAN);
        assert_eq!(
            tokens,
            vec![
                DataToken::SequenceStart {
                    tag: Tag(0x0008, 0x1110),
                    len: Length(20),
                },
                DataToken::ItemStart { len: Length(12) },
                DataToken::ElementHeader(DataElementHeader::new(
                    Tag(0x0008, 0x1150),
                    VR::UI,
                    Length(4)
                )),
                DataToken::PrimitiveValue(PrimitiveValue::from("1.2")),
                DataToken::ItemEnd,
                DataToken::SequenceEnd,
            ]
        );
    }

    #[test]
    fn encapsulated_pixel_data() {
        // (7FE0,0010) OB U/L, offset table with one entry,
        // one fragment of 4 bytes, sequence delimiter
        let raw: &[u8] = &[
            0xE0, 0x7F, 0x10, 0x00, b'O', b'B', 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, //
            0xFE, 0xFF, 0x00, 0xE0, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
            0xFE, 0xFF, 0x00, 0xE0, 0x04, 0x00, 0x00, 0x00, 0xAA, 0xBB, 0xCC, 0xDD, //
            0xFE, 0xFF, 0xDD, 0xE0, 0x00, 0x00, 0x00, 0x00,
        ];
        let tokens = collect_tokens(raw, &entries::EXPLICIT_VR_LITTLE_ENDIAN);
        assert_eq!(
            tokens,
            vec![
                DataToken::PixelSequenceStart,
                DataToken::OffsetTable(vec![0]),
                DataToken::ItemValue(vec![0xAA, 0xBB, 0xCC, 0xDD]),
                DataToken::SequenceEnd,
            ]
        );
    }

    #[test]
    fn character_set_switch_applies_to_later_elements() {
        // (0008,0005) CS "ISO_IR 100", then (0010,0010) PN with 8859-1 bytes
        let raw: &[u8] = &[
            0x08, 0x00, 0x05, 0x00, b'C', b'S', 0x0A, 0x00, b'I', b'S', b'O', b'_', b'I', b'R',
            b' ', b'1', b'0', b'0', //
            0x10, 0x00, 0x10, 0x00, b'P', b'N', 0x04, 0x00, b'J', b'o', 0xE3, b'o',
        ];
        let tokens = collect_tokens(raw, &entries::EXPLICIT_VR_LITTLE_ENDIAN);
        assert_eq!(
            tokens[3],
            DataToken::PrimitiveValue(PrimitiveValue::from("João"))
        );
    }

    #[test]
    fn implicit_vr_nested_sequence() {
        // (0008,1110) SQ U/L { item U/L { (0008,1155) UI "1.2.3.4" + pad } }
        let raw: &[u8] = &[
            0x08, 0x00, 0x10, 0x11, 0xFF, 0xFF, 0xFF, 0xFF, //
            0xFE, 0xFF, 0x00, 0xE0, 0xFF, 0xFF, 0xFF, 0xFF, //
            0x08, 0x00, 0x55, 0x11, 0x08, 0x00, 0x00, 0x00, b'1', b'.', b'2', b'.', b'3', b'.',
            b'4', 0x00, //
            0xFE, 0xFF, 0x0D, 0xE0, 0x00, 0x00, 0x00, 0x00, //
            0xFE, 0xFF, 0xDD, 0xE0, 0x00, 0x00, 0x00, 0x00,
        ];
        let tokens = collect_tokens(raw, &entries::IMPLICIT_VR_LITTLE_ENDIAN);
        assert_eq!(tokens.len(), 6);
        assert!(matches!(
            tokens[0],
            DataToken::SequenceStart {
                tag: Tag(0x0008, 0x1110),
                ..
            }
        ));
        assert_eq!(
            tokens[3],
            DataToken::PrimitiveValue(PrimitiveValue::from("1.2.3.4"))
        );
    }
}
