//! A stateful decoder over a byte source.
//!
//! On top of the per-syntax header codecs, the stateful decoder
//! keeps track of the read position, the active character set and
//! the byte order, and interprets value bytes into typed
//! primitive values per VR.

use dcmkit_core::header::{DataElementHeader, Length, SequenceItemHeader};
use dcmkit_core::value::{DicomDate, DicomDateTime, DicomTime, PrimitiveValue, C};
use dcmkit_core::{Tag, VR};
use dcmkit_encoding::decode::basic::BasicDecoder;
use dcmkit_encoding::decode::{self, BasicDecode, Decode};
use dcmkit_encoding::text::{SpecificCharacterSet, TextCodec};
use dcmkit_encoding::transfer_syntax::TransferSyntax;
use smallvec::smallvec;
use snafu::{Backtrace, IntoError, ResultExt, Snafu};
use std::io::Read;
use tracing::warn;

/// An error during stateful decoding. Every variant records the
/// position in the source where the problem occurred.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("could not decode element header at position {}", position))]
    DecodeHeader {
        position: u64,
        #[snafu(backtrace)]
        source: decode::Error,
    },

    #[snafu(display("could not decode item header at position {}", position))]
    DecodeItemHeader {
        position: u64,
        #[snafu(backtrace)]
        source: decode::Error,
    },

    #[snafu(display(
        "element {} value of {} bytes is cut short at position {}",
        tag,
        len,
        position
    ))]
    TruncatedElement {
        tag: Tag,
        len: u32,
        position: u64,
        backtrace: Backtrace,
    },

    #[snafu(display("could not read value of element {} at position {}", tag, position))]
    ReadValue {
        tag: Tag,
        position: u64,
        source: std::io::Error,
        backtrace: Backtrace,
    },

    #[snafu(display("could not skip {} bytes at position {}", bytes, position))]
    SkipBytes {
        bytes: u32,
        position: u64,
        source: std::io::Error,
        backtrace: Backtrace,
    },

    #[snafu(display(
        "could not decode text of element {} at position {}",
        tag,
        position
    ))]
    DecodeText {
        tag: Tag,
        position: u64,
        #[snafu(backtrace)]
        source: dcmkit_encoding::text::DecodeTextError,
    },

    #[snafu(display("value of element {} has undefined length", tag))]
    UndefinedValueLength { tag: Tag, backtrace: Backtrace },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A stateful DICOM data set decoder.
pub struct StatefulDecoder<S> {
    source: S,
    decoder: Box<dyn Decode>,
    basic: BasicDecoder,
    charset: SpecificCharacterSet,
    position: u64,
}

impl<S> std::fmt::Debug for StatefulDecoder<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatefulDecoder")
            .field("charset", &self.charset.name())
            .field("position", &self.position)
            .finish()
    }
}

impl<S> StatefulDecoder<S>
where
    S: Read,
{
    /// Create a stateful decoder reading from `source`
    /// under the given transfer syntax.
    pub fn new(source: S, ts: &TransferSyntax) -> Self {
        StatefulDecoder {
            source,
            decoder: ts.decoder(),
            basic: BasicDecoder::new(ts.endianness()),
            charset: SpecificCharacterSet::default(),
            position: 0,
        }
    }

    /// The number of bytes read so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Override the active character set used for text values.
    pub fn set_character_set(&mut self, charset: SpecificCharacterSet) {
        self.charset = charset;
    }

    /// The active character set.
    pub fn character_set(&self) -> SpecificCharacterSet {
        self.charset
    }

    /// Decode the next data element header.
    pub fn decode_header(&mut self) -> Result<DataElementHeader> {
        let position = self.position;
        let (header, bytes_read) = self
            .decoder
            .decode_header(&mut self.source)
            .context(DecodeHeaderSnafu { position })?;
        self.position += bytes_read as u64;
        Ok(header)
    }

    /// Decode the next sequence item header.
    pub fn decode_item_header(&mut self) -> Result<SequenceItemHeader> {
        let position = self.position;
        let header = self
            .decoder
            .decode_item_header(&mut self.source)
            .context(DecodeItemHeaderSnafu { position })?;
        self.position += 8;
        Ok(header)
    }

    /// Read the raw value bytes of the given element header.
    pub fn read_value_bytes(&mut self, header: &DataElementHeader) -> Result<Vec<u8>> {
        let len = header
            .len
            .get()
            .ok_or_else(|| UndefinedValueLengthSnafu { tag: header.tag }.build())?;
        self.read_exact_n(header.tag, len)
    }

    /// Read and discard the given number of bytes.
    pub fn skip_bytes(&mut self, bytes: u32) -> Result<()> {
        let position = self.position;
        std::io::copy(
            &mut self.source.by_ref().take(u64::from(bytes)),
            &mut std::io::sink(),
        )
        .context(SkipBytesSnafu { bytes, position })?;
        self.position += u64::from(bytes);
        Ok(())
    }

    fn read_exact_n(&mut self, tag: Tag, len: u32) -> Result<Vec<u8>> {
        let position = self.position;
        let mut data = vec![0; len as usize];
        self.source.read_exact(&mut data).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                TruncatedElementSnafu { tag, len, position }.build()
            } else {
                ReadValueSnafu { tag, position }
                    .into_error(e)
            }
        })?;
        self.position += u64::from(len);
        Ok(data)
    }

    /// Read the value of the given element header, interpreting the
    /// bytes by the element's VR, the active byte order, and the
    /// active character set.
    pub fn read_value(&mut self, header: &DataElementHeader) -> Result<PrimitiveValue> {
        let len = header
            .len
            .get()
            .ok_or_else(|| UndefinedValueLengthSnafu { tag: header.tag }.build())?;
        if len == 0 {
            return Ok(PrimitiveValue::Empty);
        }

        use VR::*;
        match header.vr {
            // binary content kept as raw bytes
            OB | OD | OF | OL | OV | OW | UN => {
                Ok(PrimitiveValue::U8(C::from_vec(self.read_exact_n(header.tag, len)?)))
            }
            // numeric VRs honoring the byte order
            US => self.read_numeric(header, len, 2, |d, s| d.decode_us(s).map(Into::into)),
            SS => self.read_numeric(header, len, 2, |d, s| d.decode_ss(s).map(Into::into)),
            UL => self.read_numeric(header, len, 4, |d, s| d.decode_ul(s).map(Into::into)),
            SL => self.read_numeric(header, len, 4, |d, s| d.decode_sl(s).map(Into::into)),
            UV => self.read_numeric(header, len, 8, |d, s| d.decode_uv(s).map(Into::into)),
            SV => self.read_numeric(header, len, 8, |d, s| d.decode_sv(s).map(Into::into)),
            FL => self.read_numeric(header, len, 4, |d, s| d.decode_fl(s).map(Into::into)),
            FD => self.read_numeric(header, len, 8, |d, s| d.decode_fd(s).map(Into::into)),
            AT => {
                let count = len / 4;
                let mut tags: C<Tag> = smallvec![];
                for _ in 0..count {
                    let position = self.position;
                    let tag = self
                        .basic
                        .decode_tag(&mut self.source)
                        .context(ReadValueSnafu {
                            tag: header.tag,
                            position,
                        })?;
                    self.position += 4;
                    tags.push(tag);
                }
                Ok(PrimitiveValue::Tags(tags))
            }
            // dates and times are interpreted with their precision kept
            DA => self.read_temporal(header, len, |text| {
                DicomDate::parse(text).ok().map(PrimitiveValue::from)
            }),
            TM => self.read_temporal(header, len, |text| {
                DicomTime::parse(text).ok().map(PrimitiveValue::from)
            }),
            DT => self.read_temporal(header, len, |text| {
                DicomDateTime::parse(text).ok().map(PrimitiveValue::from)
            }),
            // single-valued text: the backslash is ordinary data
            LT | ST | UT | UR => {
                let text = self.read_text(header, len)?;
                Ok(PrimitiveValue::Str(
                    text.trim_end_matches([' ', '\0']).to_string(),
                ))
            }
            // the remaining VRs are textual and possibly multi-valued
            _ => {
                let text = self.read_text(header, len)?;
                let mut values: C<String> = text
                    .split('\\')
                    .map(|v| v.trim_end_matches([' ', '\0']).to_string())
                    .collect();
                if header.vr == UI {
                    for value in &values {
                        if let Err(e) = dcmkit_core::validate_uid(value) {
                            warn!("element {} holds a non-conforming UID: {}", header.tag, e);
                        }
                    }
                }
                if values.len() == 1 {
                    Ok(PrimitiveValue::Str(values.remove(0)))
                } else {
                    Ok(PrimitiveValue::Strs(values))
                }
            }
        }
    }

    fn read_text(&mut self, header: &DataElementHeader, len: u32) -> Result<String> {
        let position = self.position;
        let data = self.read_exact_n(header.tag, len)?;
        self.charset.decode(&data).context(DecodeTextSnafu {
            tag: header.tag,
            position,
        })
    }

    fn read_numeric<F>(
        &mut self,
        header: &DataElementHeader,
        len: u32,
        size: u32,
        read_one: F,
    ) -> Result<PrimitiveValue>
    where
        F: Fn(&BasicDecoder, &mut dyn Read) -> std::io::Result<PrimitiveOne>,
    {
        let count = len / size;
        let mut acc = NumericAccumulator::default();
        for _ in 0..count {
            let position = self.position;
            let one = read_one(&self.basic, &mut self.source).map_err(|e| {
                if e.kind() == std::io::ErrorKind::UnexpectedEof {
                    TruncatedElementSnafu {
                        tag: header.tag,
                        len,
                        position,
                    }
                    .build()
                } else {
                    ReadValueSnafu {
                        tag: header.tag,
                        position,
                    }
                    .into_error(e)
                }
            })?;
            self.position += u64::from(size);
            acc.push(one);
        }
        Ok(acc.finish())
    }

    fn read_temporal<F>(
        &mut self,
        header: &DataElementHeader,
        len: u32,
        parse: F,
    ) -> Result<PrimitiveValue>
    where
        F: Fn(&str) -> Option<PrimitiveValue>,
    {
        let text = self.read_text(header, len)?;
        let trimmed = text.trim_end_matches([' ', '\0']);
        if !trimmed.contains('\\') {
            if let Some(value) = parse(trimmed) {
                return Ok(value);
            }
        } else {
            // multi-valued: all components must parse
            let mut parts = Vec::new();
            for part in trimmed.split('\\') {
                match parse(part.trim_end_matches(' ')) {
                    Some(v) => parts.push(v),
                    None => {
                        parts.clear();
                        break;
                    }
                }
            }
            if !parts.is_empty() {
                return Ok(merge_temporal(parts));
            }
        }
        warn!(
            "element {} has a non-conforming {} value; kept as text",
            header.tag, header.vr
        );
        Ok(PrimitiveValue::Strs(
            trimmed
                .split('\\')
                .map(|v| v.trim_end_matches(' ').to_string())
                .collect(),
        ))
    }
}

/// One decoded numeric value, before aggregation.
enum PrimitiveOne {
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    F32(f32),
    F64(f64),
}

macro_rules! impl_primitive_one {
    ($typ:ty, $variant:ident) => {
        impl From<$typ> for PrimitiveOne {
            fn from(v: $typ) -> Self {
                PrimitiveOne::$variant(v)
            }
        }
    };
}

impl_primitive_one!(u16, U16);
impl_primitive_one!(i16, I16);
impl_primitive_one!(u32, U32);
impl_primitive_one!(i32, I32);
impl_primitive_one!(u64, U64);
impl_primitive_one!(i64, I64);
impl_primitive_one!(f32, F32);
impl_primitive_one!(f64, F64);

/// Collects values of one numeric type into a primitive value.
#[derive(Default)]
struct NumericAccumulator {
    value: Option<PrimitiveValue>,
}

impl NumericAccumulator {
    fn push(&mut self, one: PrimitiveOne) {
        use PrimitiveOne as O;
        use PrimitiveValue as V;
        match (&mut self.value, one) {
            (None, O::U16(v)) => self.value = Some(V::U16(smallvec![v])),
            (None, O::I16(v)) => self.value = Some(V::I16(smallvec![v])),
            (None, O::U32(v)) => self.value = Some(V::U32(smallvec![v])),
            (None, O::I32(v)) => self.value = Some(V::I32(smallvec![v])),
            (None, O::U64(v)) => self.value = Some(V::U64(smallvec![v])),
            (None, O::I64(v)) => self.value = Some(V::I64(smallvec![v])),
            (None, O::F32(v)) => self.value = Some(V::F32(smallvec![v])),
            (None, O::F64(v)) => self.value = Some(V::F64(smallvec![v])),
            (Some(V::U16(c)), O::U16(v)) => c.push(v),
            (Some(V::I16(c)), O::I16(v)) => c.push(v),
            (Some(V::U32(c)), O::U32(v)) => c.push(v),
            (Some(V::I32(c)), O::I32(v)) => c.push(v),
            (Some(V::U64(c)), O::U64(v)) => c.push(v),
            (Some(V::I64(c)), O::I64(v)) => c.push(v),
            (Some(V::F32(c)), O::F32(v)) => c.push(v),
            (Some(V::F64(c)), O::F64(v)) => c.push(v),
            // a single call site always pushes one type
            _ => unreachable!("mixed numeric types in one element"),
        }
    }

    fn finish(self) -> PrimitiveValue {
        self.value.unwrap_or(PrimitiveValue::Empty)
    }
}

fn merge_temporal(parts: Vec<PrimitiveValue>) -> PrimitiveValue {
    use PrimitiveValue as V;
    let mut out = parts.into_iter();
    let mut acc = out.next().expect("at least one part");
    for part in out {
        match (&mut acc, part) {
            (V::Date(c), V::Date(p)) => c.extend(p),
            (V::Time(c), V::Time(p)) => c.extend(p),
            (V::DateTime(c), V::DateTime(p)) => c.extend(p),
            _ => unreachable!("mixed temporal types in one element"),
        }
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcmkit_encoding::transfer_syntax::entries;

    #[test]
    fn decode_text_and_numeric_values() {
        // (0008,0060) CS "CT"; (0028,0010) US 512
        let raw: &[u8] = &[
            0x08, 0x00, 0x60, 0x00, b'C', b'S', 0x02, 0x00, b'C', b'T', //
            0x28, 0x00, 0x10, 0x00, b'U', b'S', 0x02, 0x00, 0x00, 0x02,
        ];
        let mut decoder = StatefulDecoder::new(raw, &entries::EXPLICIT_VR_LITTLE_ENDIAN);

        let header = decoder.decode_header().unwrap();
        assert_eq!(header.tag, Tag(0x0008, 0x0060));
        let value = decoder.read_value(&header).unwrap();
        assert_eq!(value.to_str(), "CT");

        let header = decoder.decode_header().unwrap();
        let value = decoder.read_value(&header).unwrap();
        assert_eq!(value.to_int::<u16>().unwrap(), 512);
        assert_eq!(decoder.position(), 20);
    }

    #[test]
    fn date_values_keep_precision() {
        // (0008,0020) DA "199804"
        let raw: &[u8] = &[
            0x08, 0x00, 0x20, 0x00, b'D', b'A', 0x06, 0x00, b'1', b'9', b'9', b'8', b'0', b'4',
        ];
        let mut decoder = StatefulDecoder::new(raw, &entries::EXPLICIT_VR_LITTLE_ENDIAN);
        let header = decoder.decode_header().unwrap();
        let value = decoder.read_value(&header).unwrap();
        assert_eq!(
            value,
            PrimitiveValue::from(DicomDate::from_ym(1998, 4).unwrap())
        );
        // re-encoding reproduces the original form
        assert_eq!(value.to_str(), "199804");
    }

    #[test]
    fn malformed_date_survives_as_text() {
        // (0008,0020) DA "NOT-DATE"
        let raw: &[u8] = &[
            0x08, 0x00, 0x20, 0x00, b'D', b'A', 0x08, 0x00, b'N', b'O', b'T', b'-', b'D', b'A',
            b'T', b'E',
        ];
        let mut decoder = StatefulDecoder::new(raw, &entries::EXPLICIT_VR_LITTLE_ENDIAN);
        let header = decoder.decode_header().unwrap();
        let value = decoder.read_value(&header).unwrap();
        assert_eq!(value.to_str(), "NOT-DATE");
    }

    #[test]
    fn truncated_value_is_reported_with_tag() {
        // (7FE0,0010) OW declares 8 bytes but only 4 follow
        let raw: &[u8] = &[
            0xE0, 0x7F, 0x10, 0x00, b'O', b'W', 0x00, 0x00, 0x08, 0x00, 0x00, 0x00, 0xAA, 0xBB,
            0xCC, 0xDD,
        ];
        let mut decoder = StatefulDecoder::new(raw, &entries::EXPLICIT_VR_LITTLE_ENDIAN);
        let header = decoder.decode_header().unwrap();
        let err = decoder.read_value(&header).unwrap_err();
        assert!(matches!(
            err,
            Error::TruncatedElement {
                tag: Tag(0x7FE0, 0x0010),
                len: 8,
                ..
            }
        ));
    }

    #[test]
    fn character_set_applies_to_text() {
        // (0010,0010) PN with ISO-8859-1 bytes
        let raw: &[u8] = &[
            0x10, 0x00, 0x10, 0x00, b'P', b'N', 0x04, 0x00, b'J', b'o', 0xE3, b'o',
        ];
        let mut decoder = StatefulDecoder::new(raw, &entries::EXPLICIT_VR_LITTLE_ENDIAN);
        decoder.set_character_set(SpecificCharacterSet::ISO_IR_100);
        let header = decoder.decode_header().unwrap();
        let value = decoder.read_value(&header).unwrap();
        assert_eq!(value.to_str(), "João");
    }
}
