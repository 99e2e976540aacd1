//! The in-memory DICOM data set object.

use dcmkit_core::dictionary::AttributeDictionary;
use dcmkit_core::header::{DataElementHeader, Header, Length};
use dcmkit_core::value::{PrimitiveValue, Value, C};
use dcmkit_core::{DataElement, Tag, VR};
use dcmkit_dictionary_std::StandardAttributeDictionary;
use dcmkit_encoding::transfer_syntax::TransferSyntax;
use dcmkit_parser::dataset::read::{self, DataSetReader};
use dcmkit_parser::dataset::write::{self, DataSetWriter};
use dcmkit_parser::dataset::DataToken;
use smallvec::smallvec;
use snafu::{ResultExt, Snafu};
use std::collections::btree_map::{self, BTreeMap};
use std::io::{Read, Write};

/// A data element whose sequence items are in-memory objects.
pub type InMemElement = DataElement<InMemObject>;

/// An error when manipulating or (de)serializing an in-memory object.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
#[non_exhaustive]
pub enum Error {
    #[snafu(display(
        "VR {} of element {} conflicts with the dictionary's {}",
        given,
        tag,
        expected
    ))]
    VrMismatch {
        tag: Tag,
        given: VR,
        expected: VR,
    },

    #[snafu(display("could not read data set"))]
    ReadDataSet {
        #[snafu(backtrace)]
        source: read::Error,
    },

    #[snafu(display("could not write data set"))]
    WriteDataSet {
        #[snafu(backtrace)]
        source: write::Error,
    },

    #[snafu(display("data set token stream ended inside a nested data set"))]
    PrematureEnd,

    #[snafu(display("unexpected token in data set stream: {}", token))]
    UnexpectedToken { token: DataToken },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An in-memory DICOM data set: a mapping from attribute tags to
/// data elements, ordered by tag for serialization.
///
/// There are no duplicate tags; inserting an element replaces any
/// previous element with the same tag. Sequence items are
/// themselves `InMemObject`s, so the no-duplicate invariant holds
/// recursively. The tree shape is guaranteed by construction:
/// items are owned by their sequence and cannot refer back.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct InMemObject {
    entries: BTreeMap<Tag, InMemElement>,
}

impl InMemObject {
    /// Create an empty data set.
    pub fn new_empty() -> Self {
        InMemObject::default()
    }

    /// The number of data elements.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the data set has no elements.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Retrieve the element with the given tag, if present.
    pub fn get(&self, tag: Tag) -> Option<&InMemElement> {
        self.entries.get(&tag)
    }

    /// Retrieve an element's value converted to a trimmed string.
    pub fn string_value(&self, tag: Tag) -> Option<String> {
        self.get(tag)
            .and_then(|e| e.value().to_clean_str().ok())
            .map(|s| s.into_owned())
    }

    /// Insert a data element, replacing and returning any element
    /// previously stored under the same tag.
    pub fn put(&mut self, elem: InMemElement) -> Option<InMemElement> {
        self.entries.insert(elem.tag(), elem)
    }

    /// Insert a data element after validating its VR against the
    /// dictionary. Elements with unknown tags are admitted when
    /// carrying the UN representation or when `tolerant` is set.
    pub fn insert(&mut self, elem: InMemElement, tolerant: bool) -> Result<Option<InMemElement>> {
        let dict = StandardAttributeDictionary;
        match dict.entry(elem.tag()) {
            Some(entry) => {
                // UN is always admissible for carrying raw content
                if elem.vr() != entry.vr && elem.vr() != VR::UN && !tolerant {
                    return VrMismatchSnafu {
                        tag: elem.tag(),
                        given: elem.vr(),
                        expected: entry.vr,
                    }
                    .fail();
                }
            }
            None => {
                if elem.vr() != VR::UN && !tolerant {
                    return VrMismatchSnafu {
                        tag: elem.tag(),
                        given: elem.vr(),
                        expected: VR::UN,
                    }
                    .fail();
                }
            }
        }
        Ok(self.put(elem))
    }

    /// Remove and return the element with the given tag.
    pub fn remove(&mut self, tag: Tag) -> Option<InMemElement> {
        self.entries.remove(&tag)
    }

    /// Iterate over the elements in ascending tag order.
    pub fn iter(&self) -> btree_map::Values<'_, Tag, InMemElement> {
        self.entries.values()
    }

    /// Iterate over the elements of the given group,
    /// in ascending element order.
    pub fn iter_group(
        &self,
        group: u16,
    ) -> impl Iterator<Item = &InMemElement> {
        self.entries
            .range(Tag(group, 0x0000)..=Tag(group, 0xFFFF))
            .map(|(_, e)| e)
    }

    /// Read a data set in the given transfer syntax into an object.
    pub fn read_dataset_with_ts<R: Read>(source: R, ts: &TransferSyntax) -> Result<Self> {
        let mut reader = DataSetReader::new(source, ts);
        InMemObject::build_object(&mut reader, false)
    }

    /// Write this data set to a sink in the given transfer syntax,
    /// without a file meta group.
    pub fn write_dataset_with_ts<W: Write>(&self, sink: W, ts: &TransferSyntax) -> Result<()> {
        let mut writer = DataSetWriter::new(sink, ts);
        writer
            .write_sequence(self.clone().into_tokens())
            .context(WriteDataSetSnafu)?;
        writer.flush().context(WriteDataSetSnafu)
    }

    /// Build an object from a token stream. When `in_item` is set,
    /// the object ends at the enclosing item's end token.
    pub(crate) fn build_object<R: Read>(
        reader: &mut DataSetReader<R>,
        in_item: bool,
    ) -> Result<Self> {
        let mut obj = InMemObject::new_empty();
        let mut pending: Option<DataElementHeader> = None;

        while let Some(token) = reader.next() {
            let token = token.context(ReadDataSetSnafu)?;
            match token {
                DataToken::ElementHeader(header) => {
                    pending = Some(header);
                }
                DataToken::PrimitiveValue(value) => {
                    let header = match pending.take() {
                        Some(header) => header,
                        None => {
                            return UnexpectedTokenSnafu {
                                token: DataToken::PrimitiveValue(value),
                            }
                            .fail()
                        }
                    };
                    obj.put(DataElement::new(
                        header.tag,
                        header.vr,
                        Value::Primitive(value),
                    ));
                }
                DataToken::SequenceStart { tag, .. } => {
                    let items = InMemObject::build_sequence(reader)?;
                    obj.put(DataElement::new(
                        tag,
                        VR::SQ,
                        Value::new_sequence(items, Length::UNDEFINED),
                    ));
                }
                DataToken::PixelSequenceStart => {
                    let (offset_table, fragments) = InMemObject::build_pixel_sequence(reader)?;
                    obj.put(DataElement::new(
                        Tag(0x7FE0, 0x0010),
                        VR::OB,
                        Value::new_pixel_sequence(offset_table, fragments),
                    ));
                }
                DataToken::ItemEnd if in_item => return Ok(obj),
                token => return UnexpectedTokenSnafu { token }.fail(),
            }
        }
        if in_item {
            // the enclosing item was not closed
            return PrematureEndSnafu.fail();
        }
        Ok(obj)
    }

    pub(crate) fn build_sequence<R: Read>(reader: &mut DataSetReader<R>) -> Result<C<InMemObject>> {
        let mut items: C<InMemObject> = smallvec![];
        while let Some(token) = reader.next() {
            match token.context(ReadDataSetSnafu)? {
                DataToken::ItemStart { .. } => {
                    items.push(InMemObject::build_object(reader, true)?);
                }
                DataToken::SequenceEnd => return Ok(items),
                token => return UnexpectedTokenSnafu { token }.fail(),
            }
        }
        PrematureEndSnafu.fail()
    }

    pub(crate) fn build_pixel_sequence<R: Read>(
        reader: &mut DataSetReader<R>,
    ) -> Result<(C<u32>, C<Vec<u8>>)> {
        let mut offset_table: C<u32> = smallvec![];
        let mut fragments: C<Vec<u8>> = smallvec![];
        while let Some(token) = reader.next() {
            match token.context(ReadDataSetSnafu)? {
                DataToken::OffsetTable(offsets) => {
                    offset_table = offsets.into_iter().collect();
                }
                DataToken::ItemValue(data) => fragments.push(data),
                DataToken::SequenceEnd => return Ok((offset_table, fragments)),
                token => return UnexpectedTokenSnafu { token }.fail(),
            }
        }
        PrematureEndSnafu.fail()
    }

    /// Turn the object into the token stream which encodes it.
    pub fn into_tokens(self) -> Vec<DataToken> {
        let mut tokens = Vec::with_capacity(self.entries.len() * 2);
        self.append_tokens(&mut tokens);
        tokens
    }

    fn append_tokens(self, tokens: &mut Vec<DataToken>) {
        for (_, elem) in self.entries {
            let (header, value) = elem.into_parts();
            match value {
                Value::Primitive(value) => {
                    tokens.push(DataToken::ElementHeader(header));
                    tokens.push(DataToken::PrimitiveValue(value));
                }
                Value::Sequence { items, .. } => {
                    tokens.push(DataToken::SequenceStart {
                        tag: header.tag,
                        len: Length::UNDEFINED,
                    });
                    for item in items {
                        tokens.push(DataToken::ItemStart {
                            len: Length::UNDEFINED,
                        });
                        item.append_tokens(tokens);
                        tokens.push(DataToken::ItemEnd);
                    }
                    tokens.push(DataToken::SequenceEnd);
                }
                Value::PixelSequence {
                    offset_table,
                    fragments,
                } => {
                    tokens.push(DataToken::PixelSequenceStart);
                    tokens.push(DataToken::OffsetTable(offset_table.into_vec()));
                    for fragment in fragments {
                        tokens.push(DataToken::ItemValue(fragment));
                    }
                    tokens.push(DataToken::SequenceEnd);
                }
            }
        }
    }
}

impl<'a> IntoIterator for &'a InMemObject {
    type Item = &'a InMemElement;
    type IntoIter = btree_map::Values<'a, Tag, InMemElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.values()
    }
}

impl std::iter::FromIterator<InMemElement> for InMemObject {
    fn from_iter<I: IntoIterator<Item = InMemElement>>(iter: I) -> Self {
        let mut obj = InMemObject::new_empty();
        for elem in iter {
            obj.put(elem);
        }
        obj
    }
}

/// Create an element with a primitive value,
/// borrowing the VR from the standard dictionary.
pub fn element<V>(tag: Tag, value: V) -> InMemElement
where
    V: Into<PrimitiveValue>,
{
    let dict = StandardAttributeDictionary;
    let vr = dict.entry(tag).map(|e| e.vr).unwrap_or(VR::UN);
    DataElement::new(tag, vr, Value::Primitive(value.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcmkit_dictionary_std::tags;
    use dcmkit_encoding::transfer_syntax::entries;

    fn sample_object() -> InMemObject {
        let mut obj = InMemObject::new_empty();
        obj.put(element(tags::MODALITY, "CT"));
        obj.put(element(tags::PATIENT_NAME, "DOE^JOHN"));
        obj.put(element(tags::ROWS, 512u16));
        obj.put(element(tags::COLUMNS, 512u16));
        obj
    }

    #[test]
    fn ordered_iteration_and_group_ranges() {
        let obj = sample_object();
        let order: Vec<Tag> = obj.iter().map(|e| e.tag()).collect();
        assert_eq!(
            order,
            vec![
                tags::MODALITY,
                tags::PATIENT_NAME,
                tags::ROWS,
                tags::COLUMNS
            ]
        );
        let group: Vec<Tag> = obj.iter_group(0x0028).map(|e| e.tag()).collect();
        assert_eq!(group, vec![tags::ROWS, tags::COLUMNS]);
    }

    #[test]
    fn put_replaces_duplicates() {
        let mut obj = sample_object();
        assert_eq!(obj.len(), 4);
        let old = obj.put(element(tags::MODALITY, "MR"));
        assert!(old.is_some());
        assert_eq!(obj.len(), 4);
        assert_eq!(obj.string_value(tags::MODALITY).unwrap(), "MR");
    }

    #[test]
    fn strict_insert_validates_vr() {
        let mut obj = InMemObject::new_empty();
        let bad = DataElement::new(tags::MODALITY, VR::US, Value::Primitive(1u16.into()));
        assert!(matches!(
            obj.insert(bad.clone(), false),
            Err(Error::VrMismatch {
                tag: Tag(0x0008, 0x0060),
                given: VR::US,
                expected: VR::CS,
            })
        ));
        // tolerant mode admits it
        assert!(obj.insert(bad, true).is_ok());

        // unknown tags require UN in strict mode
        let unknown = DataElement::new(Tag(0x0099, 0x0001), VR::LO, Value::from("x"));
        assert!(obj.insert(unknown.clone(), false).is_err());
        let unknown_un = DataElement::new(
            Tag(0x0099, 0x0001),
            VR::UN,
            Value::Primitive(PrimitiveValue::from(&b"x "[..])),
        );
        assert!(obj.insert(unknown_un, false).is_ok());
        assert!(obj.insert(unknown, true).is_ok());
    }

    #[test]
    fn deep_copy_is_independent() {
        let mut obj = sample_object();
        let copy = obj.clone();
        obj.remove(tags::ROWS);
        assert_eq!(copy.len(), 4);
        assert_ne!(obj, copy);
    }

    #[test]
    fn dataset_round_trip_explicit_le() {
        let obj = sample_object();
        let mut encoded = Vec::new();
        obj.write_dataset_with_ts(&mut encoded, &entries::EXPLICIT_VR_LITTLE_ENDIAN)
            .unwrap();
        let read_back =
            InMemObject::read_dataset_with_ts(&encoded[..], &entries::EXPLICIT_VR_LITTLE_ENDIAN)
                .unwrap();
        assert_eq!(read_back, obj);
    }

    #[test]
    fn dataset_round_trip_implicit_le_with_sequence() {
        let mut item = InMemObject::new_empty();
        item.put(element(tags::REFERENCED_SOP_CLASS_UID, "1.2.840.10008.1.1"));
        item.put(element(tags::REFERENCED_SOP_INSTANCE_UID, "1.2.3.4"));
        let mut obj = sample_object();
        obj.put(DataElement::new(
            tags::REFERENCED_STUDY_SEQUENCE,
            VR::SQ,
            Value::new_sequence(smallvec![item], Length::UNDEFINED),
        ));

        for ts in [
            &entries::IMPLICIT_VR_LITTLE_ENDIAN,
            &entries::EXPLICIT_VR_LITTLE_ENDIAN,
            &entries::EXPLICIT_VR_BIG_ENDIAN,
        ] {
            let mut encoded = Vec::new();
            obj.write_dataset_with_ts(&mut encoded, ts).unwrap();
            let read_back = InMemObject::read_dataset_with_ts(&encoded[..], ts).unwrap();
            assert_eq!(read_back, obj, "round trip failed for {}", ts.uid());
        }
    }

    #[test]
    fn pixel_sequence_round_trip() {
        let mut obj = InMemObject::new_empty();
        obj.put(DataElement::new(
            tags::PIXEL_DATA,
            VR::OB,
            Value::new_pixel_sequence(smallvec![0u32], smallvec![vec![0xAAu8, 0xBB]]),
        ));
        let mut encoded = Vec::new();
        obj.write_dataset_with_ts(&mut encoded, &entries::EXPLICIT_VR_LITTLE_ENDIAN)
            .unwrap();
        let read_back =
            InMemObject::read_dataset_with_ts(&encoded[..], &entries::EXPLICIT_VR_LITTLE_ENDIAN)
                .unwrap();
        assert_eq!(read_back, obj);
    }
}
