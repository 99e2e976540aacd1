//! A data set writer which consumes a stream of [`DataToken`]s
//! and emits the encoded form.

use super::DataToken;
use crate::stateful::encode::{self, StatefulEncoder};
use dcmkit_core::header::{DataElementHeader, Length};
use dcmkit_core::{Tag, VR};
use dcmkit_dictionary_std::tags;
use dcmkit_encoding::text::SpecificCharacterSet;
use dcmkit_encoding::transfer_syntax::TransferSyntax;
use snafu::{ResultExt, Snafu};
use std::io::Write;
use tracing::warn;

/// An error while writing a data set token stream.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("could not encode data set content"))]
    EncodeContent {
        #[snafu(backtrace)]
        source: encode::Error,
    },

    #[snafu(display("token {} is not valid at this point of the stream", token))]
    UnexpectedToken { token: DataToken },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Frame {
    Sequence,
    Item,
    PixelSequence,
}

/// A writer of data set token streams.
///
/// Sequences and items are always written in the undefined-length
/// form, closed by their delimitation items; encapsulated pixel
/// data uses the undefined-length form as required.
#[derive(Debug)]
pub struct DataSetWriter<W: Write> {
    encoder: StatefulEncoder<W>,
    stack: Vec<Frame>,
    pending_header: Option<DataElementHeader>,
}

impl<W> DataSetWriter<W>
where
    W: Write,
{
    /// Create a data set writer over the given sink,
    /// encoding under the given transfer syntax.
    pub fn new(sink: W, ts: &TransferSyntax) -> Self {
        DataSetWriter {
            encoder: StatefulEncoder::new(sink, ts),
            stack: Vec::new(),
            pending_header: None,
        }
    }

    /// Override the initial character set.
    pub fn with_character_set(mut self, charset: SpecificCharacterSet) -> Self {
        self.encoder.set_character_set(charset);
        self
    }

    /// The number of bytes written so far.
    pub fn position(&self) -> u64 {
        self.encoder.position()
    }

    /// Write a full token stream.
    pub fn write_sequence<I>(&mut self, tokens: I) -> Result<()>
    where
        I: IntoIterator<Item = DataToken>,
    {
        for token in tokens {
            self.write(token)?;
        }
        Ok(())
    }

    /// Write one token.
    pub fn write(&mut self, token: DataToken) -> Result<()> {
        match token {
            DataToken::ElementHeader(header) => {
                if self.pending_header.replace(header).is_some() {
                    return UnexpectedTokenSnafu {
                        token: DataToken::ElementHeader(header),
                    }
                    .fail();
                }
                Ok(())
            }
            DataToken::PrimitiveValue(ref value) => {
                let header = match self.pending_header.take() {
                    Some(header) => header,
                    None => return UnexpectedTokenSnafu { token }.fail(),
                };
                self.encoder
                    .encode_primitive_element(&header, value)
                    .context(EncodeContentSnafu)?;
                if header.tag == tags::SPECIFIC_CHARACTER_SET {
                    self.update_character_set(value);
                }
                Ok(())
            }
            DataToken::SequenceStart { tag, .. } => {
                self.encoder
                    .write_element_header(DataElementHeader::new(tag, VR::SQ, Length::UNDEFINED))
                    .context(EncodeContentSnafu)?;
                self.stack.push(Frame::Sequence);
                Ok(())
            }
            DataToken::PixelSequenceStart => {
                self.encoder
                    .write_element_header(DataElementHeader::new(
                        Tag(0x7FE0, 0x0010),
                        VR::OB,
                        Length::UNDEFINED,
                    ))
                    .context(EncodeContentSnafu)?;
                self.stack.push(Frame::PixelSequence);
                Ok(())
            }
            DataToken::ItemStart { .. } => {
                self.encoder
                    .encode_item_header(0xFFFF_FFFF)
                    .context(EncodeContentSnafu)?;
                self.stack.push(Frame::Item);
                Ok(())
            }
            DataToken::ItemEnd => match self.stack.pop() {
                Some(Frame::Item) => self
                    .encoder
                    .encode_item_delimiter()
                    .context(EncodeContentSnafu),
                frame => {
                    if let Some(f) = frame {
                        self.stack.push(f);
                    }
                    UnexpectedTokenSnafu { token }.fail()
                }
            },
            DataToken::SequenceEnd => match self.stack.pop() {
                Some(Frame::Sequence) | Some(Frame::PixelSequence) => self
                    .encoder
                    .encode_sequence_delimiter()
                    .context(EncodeContentSnafu),
                frame => {
                    if let Some(f) = frame {
                        self.stack.push(f);
                    }
                    UnexpectedTokenSnafu { token }.fail()
                }
            },
            DataToken::OffsetTable(ref offsets) => {
                if self.stack.last() != Some(&Frame::PixelSequence) {
                    return UnexpectedTokenSnafu { token }.fail();
                }
                self.encoder
                    .encode_item_header(offsets.len() as u32 * 4)
                    .context(EncodeContentSnafu)?;
                for offset in offsets {
                    self.encoder
                        .write_all(&offset.to_le_bytes())
                        .context(EncodeContentSnafu)?;
                }
                Ok(())
            }
            DataToken::ItemValue(ref data) => {
                if self.stack.last() != Some(&Frame::PixelSequence) {
                    return UnexpectedTokenSnafu { token }.fail();
                }
                // fragments must have even length
                let padded = data.len() % 2 != 0;
                let len = data.len() as u32 + padded as u32;
                self.encoder
                    .encode_item_header(len)
                    .context(EncodeContentSnafu)?;
                self.encoder.write_all(data).context(EncodeContentSnafu)?;
                if padded {
                    self.encoder.write_all(&[0]).context(EncodeContentSnafu)?;
                }
                Ok(())
            }
        }
    }

    /// Flush the underlying sink.
    pub fn flush(&mut self) -> Result<()> {
        self.encoder.flush().context(EncodeContentSnafu)
    }

    fn update_character_set(&mut self, value: &dcmkit_core::PrimitiveValue) {
        let codes = value.to_multi_str();
        match SpecificCharacterSet::from_codes(codes.iter().map(|c| c.as_str())) {
            Some(charset) => self.encoder.set_character_set(charset),
            None => warn!(
                "unsupported specific character set `{}` left unapplied",
                value.to_str()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::DataSetReader;
    use dcmkit_core::PrimitiveValue;
    use dcmkit_encoding::transfer_syntax::entries;

    #[test]
    fn tokens_round_trip_through_writer_and_reader() {
        let tokens = vec![
            DataToken::ElementHeader(DataElementHeader::new(
                Tag(0x0008, 0x0060),
                VR::CS,
                Length(2),
            )),
            DataToken::PrimitiveValue(PrimitiveValue::from("MR")),
            DataToken::SequenceStart {
                tag: Tag(0x0008, 0x1110),
                len: Length::UNDEFINED,
            },
            DataToken::ItemStart {
                len: Length::UNDEFINED,
            },
            DataToken::ElementHeader(DataElementHeader::new(
                Tag(0x0008, 0x1150),
                VR::UI,
                Length(4),
            )),
            DataToken::PrimitiveValue(PrimitiveValue::from("1.2")),
            DataToken::ItemEnd,
            DataToken::SequenceEnd,
        ];

        let mut out = Vec::new();
        {
            let mut writer = DataSetWriter::new(&mut out, &entries::EXPLICIT_VR_LITTLE_ENDIAN);
            writer.write_sequence(tokens.clone()).unwrap();
        }

        let read_back: Vec<_> = DataSetReader::new(&out[..], &entries::EXPLICIT_VR_LITTLE_ENDIAN)
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(read_back, tokens);
    }

    #[test]
    fn pixel_sequence_writing() {
        let tokens = vec![
            DataToken::PixelSequenceStart,
            DataToken::OffsetTable(vec![0]),
            DataToken::ItemValue(vec![0xAA, 0xBB, 0xCC]),
            DataToken::SequenceEnd,
        ];
        let mut out = Vec::new();
        {
            let mut writer = DataSetWriter::new(&mut out, &entries::EXPLICIT_VR_LITTLE_ENDIAN);
            writer.write_sequence(tokens).unwrap();
        }

        let read_back: Vec<_> = DataSetReader::new(&out[..], &entries::EXPLICIT_VR_LITTLE_ENDIAN)
            .collect::<Result<_, _>>()
            .unwrap();
        // the odd fragment was padded to even length
        assert_eq!(
            read_back,
            vec![
                DataToken::PixelSequenceStart,
                DataToken::OffsetTable(vec![0]),
                DataToken::ItemValue(vec![0xAA, 0xBB, 0xCC, 0x00]),
                DataToken::SequenceEnd,
            ]
        );
    }

    #[test]
    fn value_without_header_is_rejected() {
        let mut out = Vec::new();
        let mut writer = DataSetWriter::new(&mut out, &entries::EXPLICIT_VR_LITTLE_ENDIAN);
        let err = writer
            .write(DataToken::PrimitiveValue(PrimitiveValue::from("X")))
            .unwrap_err();
        assert!(matches!(err, Error::UnexpectedToken { .. }));
    }
}
