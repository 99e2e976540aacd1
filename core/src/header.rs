//! Basic types for interpreting DICOM data elements:
//! attribute tags, value representations, element lengths,
//! and the element header/element composite types.

use crate::value::{PrimitiveValue, Value};
use snafu::Snafu;
use std::cmp::Ordering;
use std::fmt;
use std::str::{from_utf8, FromStr};

/// An error from interpreting a tag and length pair
/// as a sequence item header.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum SequenceItemError {
    /// delimiter items must have zero length
    #[snafu(display("delimiter {} has non-zero length {}", tag, len))]
    DelimiterWithLength { tag: Tag, len: Length },

    /// the tag does not identify an item or delimiter
    #[snafu(display("unexpected tag {} for sequence item header", tag))]
    UnexpectedTag { tag: Tag },
}

/// A trait for any data type with a DICOM element header.
#[allow(clippy::len_without_is_empty)]
pub trait Header {
    /// The element's attribute tag.
    fn tag(&self) -> Tag;

    /// The value length in bytes as declared by the element,
    /// which may be undefined.
    fn length(&self) -> Length;

    /// Whether this is the header of a sequence item.
    fn is_item(&self) -> bool {
        self.tag() == Tag(0xFFFE, 0xE000)
    }

    /// Whether this is the header of an item delimiter.
    fn is_item_delimiter(&self) -> bool {
        self.tag() == Tag(0xFFFE, 0xE00D)
    }

    /// Whether this is the header of a sequence delimiter.
    fn is_sequence_delimiter(&self) -> bool {
        self.tag() == Tag(0xFFFE, 0xE0DD)
    }
}

/// Idiomatic alias for a tag's group number.
pub type GroupNumber = u16;
/// Idiomatic alias for a tag's element number.
pub type ElementNumber = u16;

/// The identifier of a DICOM attribute: a group number
/// and an element number. Ordering is lexicographic on
/// `(group, element)`.
#[derive(PartialEq, Eq, Hash, PartialOrd, Ord, Clone, Copy)]
pub struct Tag(pub GroupNumber, pub ElementNumber);

impl Tag {
    /// Getter for the tag's group number.
    #[inline]
    pub fn group(self) -> GroupNumber {
        self.0
    }

    /// Getter for the tag's element number.
    #[inline]
    pub fn element(self) -> ElementNumber {
        self.1
    }

    /// Whether this tag is in a private group.
    #[inline]
    pub fn is_private(self) -> bool {
        self.0 & 1 == 1
    }

    /// Whether this tag is a group length element
    /// (element number 0x0000).
    #[inline]
    pub fn is_group_length(self) -> bool {
        self.1 == 0x0000
    }

    /// Whether this tag identifies a private creator element.
    #[inline]
    pub fn is_private_creator(self) -> bool {
        self.is_private() && (0x0010..=0x00FF).contains(&self.1)
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Tag({:#06X?}, {:#06X?})", self.0, self.1)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({:04X},{:04X})", self.0, self.1)
    }
}

impl PartialEq<(u16, u16)> for Tag {
    fn eq(&self, other: &(u16, u16)) -> bool {
        self.0 == other.0 && self.1 == other.1
    }
}

impl From<(u16, u16)> for Tag {
    #[inline]
    fn from(value: (u16, u16)) -> Tag {
        Tag(value.0, value.1)
    }
}

impl From<[u16; 2]> for Tag {
    #[inline]
    fn from(value: [u16; 2]) -> Tag {
        Tag(value[0], value[1])
    }
}

/// Parse a tag from text in the form `"GGGG,EEEE"`
/// (with or without enclosing parentheses).
impl FromStr for Tag {
    type Err = &'static str;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim_start_matches('(').trim_end_matches(')');
        let (g, e) = s.split_once(',').ok_or("missing `,` separator")?;
        let group = u16::from_str_radix(g.trim(), 16).map_err(|_| "bad group number")?;
        let element = u16::from_str_radix(e.trim(), 16).map_err(|_| "bad element number")?;
        Ok(Tag(group, element))
    }
}

/// An enum type for a DICOM value representation.
#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone, Ord, PartialOrd)]
pub enum VR {
    /// Application Entity
    AE,
    /// Age String
    AS,
    /// Attribute Tag
    AT,
    /// Code String
    CS,
    /// Date
    DA,
    /// Decimal String
    DS,
    /// Date Time
    DT,
    /// Floating Point Single
    FL,
    /// Floating Point Double
    FD,
    /// Integer String
    IS,
    /// Long String
    LO,
    /// Long Text
    LT,
    /// Other Byte
    OB,
    /// Other Double
    OD,
    /// Other Float
    OF,
    /// Other Long
    OL,
    /// Other Very Long
    OV,
    /// Other Word
    OW,
    /// Person Name
    PN,
    /// Short String
    SH,
    /// Signed Long
    SL,
    /// Sequence of Items
    SQ,
    /// Signed Short
    SS,
    /// Short Text
    ST,
    /// Signed Very Long
    SV,
    /// Time
    TM,
    /// Unlimited Characters
    UC,
    /// Unique Identifier (UID)
    UI,
    /// Unsigned Long
    UL,
    /// Unknown
    UN,
    /// Universal Resource Identifier or Locator
    UR,
    /// Unsigned Short
    US,
    /// Unlimited Text
    UT,
    /// Unsigned Very Long
    UV,
}

impl VR {
    /// Obtain the value representation corresponding to the given two bytes,
    /// which should be two alphabetic characters in upper case.
    pub fn from_binary(chars: [u8; 2]) -> Option<Self> {
        from_utf8(chars.as_ref())
            .ok()
            .and_then(|s| VR::from_str(s).ok())
    }

    /// Retrieve a string representation of this VR.
    pub fn to_string(self) -> &'static str {
        use VR::*;
        match self {
            AE => "AE",
            AS => "AS",
            AT => "AT",
            CS => "CS",
            DA => "DA",
            DS => "DS",
            DT => "DT",
            FL => "FL",
            FD => "FD",
            IS => "IS",
            LO => "LO",
            LT => "LT",
            OB => "OB",
            OD => "OD",
            OF => "OF",
            OL => "OL",
            OV => "OV",
            OW => "OW",
            PN => "PN",
            SH => "SH",
            SL => "SL",
            SQ => "SQ",
            SS => "SS",
            ST => "ST",
            SV => "SV",
            TM => "TM",
            UC => "UC",
            UI => "UI",
            UL => "UL",
            UN => "UN",
            UR => "UR",
            US => "US",
            UT => "UT",
            UV => "UV",
        }
    }

    /// Retrieve a copy of this VR's byte representation:
    /// two alphabetic characters in upper case.
    pub fn to_bytes(self) -> [u8; 2] {
        let bytes = self.to_string().as_bytes();
        [bytes[0], bytes[1]]
    }

    /// Whether elements of this VR take a 32-bit length field
    /// (preceded by 2 reserved bytes) in the explicit VR encodings.
    /// The remaining VRs take a 16-bit length field.
    pub fn has_long_length(self) -> bool {
        use VR::*;
        matches!(self, OB | OD | OF | OL | OV | OW | SQ | UC | UN | UR | UT)
    }

    /// Whether values of this VR hold text subject to
    /// character-set decoding.
    pub fn is_textual(self) -> bool {
        use VR::*;
        matches!(
            self,
            AE | AS | CS | DA | DS | DT | IS | LO | LT | PN | SH | ST | TM | UC | UI | UR | UT
        )
    }

    /// Whether textual values of this VR can hold multiple values
    /// separated by a backslash. Text VRs which may contain
    /// a backslash as data (LT, ST, UT, UR) do not.
    pub fn supports_multiplicity(self) -> bool {
        use VR::*;
        self.is_textual() && !matches!(self, LT | ST | UT | UR)
    }

    /// The byte used to pad values of this VR to even length:
    /// NUL for UI and the binary VRs, space for text.
    pub fn padding(self) -> u8 {
        use VR::*;
        match self {
            UI => 0,
            vr if vr.is_textual() => b' ',
            _ => 0,
        }
    }

    /// The maximum value length in bytes admitted by this VR,
    /// or `None` when it is unbounded.
    pub fn max_length(self) -> Option<u32> {
        use VR::*;
        match self {
            AE | CS | DS | TM => Some(16),
            AS => Some(4),
            DA => Some(8),
            DT => Some(26),
            IS => Some(12),
            LO => Some(64),
            LT => Some(10240),
            PN => Some(64 * 3 + 2),
            SH => Some(16),
            ST => Some(1024),
            UI => Some(64),
            _ => None,
        }
    }
}

/// Obtain the value representation corresponding to the given string.
/// The string should hold exactly two UTF-8 encoded alphabetic characters
/// in upper case, otherwise no match is made.
impl FromStr for VR {
    type Err = &'static str;

    fn from_str(string: &str) -> std::result::Result<Self, Self::Err> {
        use VR::*;
        match string {
            "AE" => Ok(AE),
            "AS" => Ok(AS),
            "AT" => Ok(AT),
            "CS" => Ok(CS),
            "DA" => Ok(DA),
            "DS" => Ok(DS),
            "DT" => Ok(DT),
            "FL" => Ok(FL),
            "FD" => Ok(FD),
            "IS" => Ok(IS),
            "LO" => Ok(LO),
            "LT" => Ok(LT),
            "OB" => Ok(OB),
            "OD" => Ok(OD),
            "OF" => Ok(OF),
            "OL" => Ok(OL),
            "OV" => Ok(OV),
            "OW" => Ok(OW),
            "PN" => Ok(PN),
            "SH" => Ok(SH),
            "SL" => Ok(SL),
            "SQ" => Ok(SQ),
            "SS" => Ok(SS),
            "ST" => Ok(ST),
            "SV" => Ok(SV),
            "TM" => Ok(TM),
            "UC" => Ok(UC),
            "UI" => Ok(UI),
            "UL" => Ok(UL),
            "UN" => Ok(UN),
            "UR" => Ok(UR),
            "US" => Ok(US),
            "UT" => Ok(UT),
            "UV" => Ok(UV),
            _ => Err("no such value representation"),
        }
    }
}

impl fmt::Display for VR {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(VR::to_string(*self))
    }
}

const UNDEFINED_LEN: u32 = 0xFFFF_FFFF;

/// A value length in bytes. The internal value `0xFFFF_FFFF`
/// represents an undefined length, to be resolved by traversing
/// the content according to its encoding.
///
/// Comparisons involving at least one undefined length are always
/// `false`, and arithmetic with an undefined length yields an
/// undefined length.
#[derive(Clone, Copy)]
pub struct Length(pub u32);

impl Length {
    /// A length that is undefined.
    pub const UNDEFINED: Self = Length(UNDEFINED_LEN);

    /// Create a new length value from its internal representation.
    pub fn new(len: u32) -> Self {
        Length(len)
    }

    /// Create a new length value with the given number of bytes.
    ///
    /// # Panic
    ///
    /// Panics if `len` is the undefined length sentinel.
    pub fn defined(len: u32) -> Self {
        assert_ne!(len, UNDEFINED_LEN);
        Length(len)
    }

    /// Check whether this length is undefined.
    #[inline]
    pub fn is_undefined(self) -> bool {
        self.0 == UNDEFINED_LEN
    }

    /// Check whether this length is well defined.
    #[inline]
    pub fn is_defined(self) -> bool {
        !self.is_undefined()
    }

    /// Fetch the concrete length value, if defined.
    #[inline]
    pub fn get(self) -> Option<u32> {
        match self.0 {
            UNDEFINED_LEN => None,
            v => Some(v),
        }
    }

    /// Compare lengths by their internal representation,
    /// with undefined lengths comparing equal to each other.
    #[inline]
    pub fn inner_eq(self, other: Length) -> bool {
        self.0 == other.0
    }
}

impl From<u32> for Length {
    fn from(o: u32) -> Self {
        Length(o)
    }
}

impl PartialEq<Length> for Length {
    fn eq(&self, rhs: &Length) -> bool {
        match (self.0, rhs.0) {
            (UNDEFINED_LEN, _) | (_, UNDEFINED_LEN) => false,
            (l1, l2) => l1 == l2,
        }
    }
}

impl PartialEq<u32> for Length {
    fn eq(&self, rhs: &u32) -> bool {
        self.0 != UNDEFINED_LEN && self.0 == *rhs
    }
}

impl PartialOrd<Length> for Length {
    fn partial_cmp(&self, rhs: &Length) -> Option<Ordering> {
        match (self.0, rhs.0) {
            (UNDEFINED_LEN, _) | (_, UNDEFINED_LEN) => None,
            (l1, l2) => Some(l1.cmp(&l2)),
        }
    }
}

impl std::ops::Add<Length> for Length {
    type Output = Self;

    fn add(self, rhs: Length) -> Self::Output {
        match (self.0, rhs.0) {
            (UNDEFINED_LEN, _) | (_, UNDEFINED_LEN) => Length::UNDEFINED,
            (l1, l2) => {
                let o = l1 + l2;
                debug_assert!(
                    o != UNDEFINED_LEN,
                    "length arithmetic overflow (0xFFFF_FFFF is reserved)"
                );
                Length(o)
            }
        }
    }
}

impl std::ops::Add<u32> for Length {
    type Output = Self;

    fn add(self, rhs: u32) -> Self::Output {
        self + Length(rhs)
    }
}

impl fmt::Debug for Length {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0 {
            UNDEFINED_LEN => f.write_str("Length(Undefined)"),
            l => f.debug_tuple("Length").field(&l).finish(),
        }
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0 {
            UNDEFINED_LEN => f.write_str("U/L"),
            l => write!(f, "{}", &l),
        }
    }
}

/// A data element header: tag, value representation,
/// and declared value length.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct DataElementHeader {
    /// attribute tag
    pub tag: Tag,
    /// value representation
    pub vr: VR,
    /// declared value length
    pub len: Length,
}

impl DataElementHeader {
    /// Create a new data element header from its parts.
    pub fn new<T: Into<Tag>>(tag: T, vr: VR, len: Length) -> DataElementHeader {
        DataElementHeader {
            tag: tag.into(),
            vr,
            len,
        }
    }

    /// The element's value representation.
    pub fn vr(&self) -> VR {
        self.vr
    }
}

impl Header for DataElementHeader {
    fn tag(&self) -> Tag {
        self.tag
    }

    fn length(&self) -> Length {
        self.len
    }
}

/// The header of a sequence item or of one of the two
/// delimiter pseudo-elements.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum SequenceItemHeader {
    /// An item with the given length,
    /// which may be undefined (0xFFFFFFFF).
    Item {
        /// item length in bytes
        len: Length,
    },
    /// An item delimiter: the current item ends here.
    ItemDelimiter,
    /// A sequence delimiter: the enclosing sequence ends here.
    SequenceDelimiter,
}

impl SequenceItemHeader {
    /// Interpret a tag and length as a sequence item header.
    /// Fails if the tag does not name an item or delimiter,
    /// or if a delimiter carries a positive length.
    pub fn new<T: Into<Tag>>(
        tag: T,
        len: Length,
    ) -> std::result::Result<SequenceItemHeader, SequenceItemError> {
        match tag.into() {
            Tag(0xFFFE, 0xE000) => Ok(SequenceItemHeader::Item { len }),
            Tag(0xFFFE, 0xE00D) => {
                if len.0 != 0 {
                    DelimiterWithLengthSnafu {
                        tag: Tag(0xFFFE, 0xE00D),
                        len,
                    }
                    .fail()
                } else {
                    Ok(SequenceItemHeader::ItemDelimiter)
                }
            }
            Tag(0xFFFE, 0xE0DD) => Ok(SequenceItemHeader::SequenceDelimiter),
            tag => UnexpectedTagSnafu { tag }.fail(),
        }
    }
}

impl Header for SequenceItemHeader {
    fn tag(&self) -> Tag {
        match *self {
            SequenceItemHeader::Item { .. } => Tag(0xFFFE, 0xE000),
            SequenceItemHeader::ItemDelimiter => Tag(0xFFFE, 0xE00D),
            SequenceItemHeader::SequenceDelimiter => Tag(0xFFFE, 0xE0DD),
        }
    }

    fn length(&self) -> Length {
        match *self {
            SequenceItemHeader::Item { len } => len,
            SequenceItemHeader::ItemDelimiter | SequenceItemHeader::SequenceDelimiter => Length(0),
        }
    }
}

/// An owned DICOM data element: a header together with its value.
/// The item type `I` is the data set type for nested sequence items.
///
/// Elements are immutable once constructed. Equality compares the
/// tag, the VR and the value, but not the declared length, which
/// may legitimately differ between the two framing forms of
/// sequences.
#[derive(Debug, Clone)]
pub struct DataElement<I> {
    header: DataElementHeader,
    value: Value<I>,
}

impl<I> PartialEq for DataElement<I>
where
    I: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.header.tag == other.header.tag
            && self.header.vr == other.header.vr
            && self.value == other.value
    }
}

impl<I> Header for DataElement<I> {
    #[inline]
    fn tag(&self) -> Tag {
        self.header.tag()
    }

    #[inline]
    fn length(&self) -> Length {
        self.header.length()
    }
}

impl<I> DataElement<I> {
    /// Create an empty data element.
    pub fn empty(tag: Tag, vr: VR) -> Self {
        DataElement {
            header: DataElementHeader {
                tag,
                vr,
                len: Length(0),
            },
            value: Value::Primitive(PrimitiveValue::Empty),
        }
    }

    /// Create a data element from the given parts.
    /// The value representation is not checked against the value.
    pub fn new<V>(tag: Tag, vr: VR, value: V) -> Self
    where
        V: Into<Value<I>>,
    {
        let value = value.into();
        DataElement {
            header: DataElementHeader {
                tag,
                vr,
                len: value.size(),
            },
            value,
        }
    }

    /// Retrieve the element header.
    pub fn header(&self) -> &DataElementHeader {
        &self.header
    }

    /// Retrieve the element's value representation.
    pub fn vr(&self) -> VR {
        self.header.vr()
    }

    /// Retrieve a reference to the element's value.
    pub fn value(&self) -> &Value<I> {
        &self.value
    }

    /// Consume the element, returning its value.
    pub fn into_value(self) -> Value<I> {
        self.value
    }

    /// Split the element into its header and value.
    pub fn into_parts(self) -> (DataElementHeader, Value<I>) {
        (self.header, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_ordering_is_lexicographic() {
        let mut tags = vec![
            Tag(0x0010, 0x0020),
            Tag(0x0008, 0x0060),
            Tag(0x0010, 0x0010),
            Tag(0x0008, 0x103E),
        ];
        tags.sort();
        assert_eq!(
            tags,
            vec![
                Tag(0x0008, 0x0060),
                Tag(0x0008, 0x103E),
                Tag(0x0010, 0x0010),
                Tag(0x0010, 0x0020),
            ]
        );
    }

    #[test]
    fn tag_from_str() {
        assert_eq!("0010,0020".parse::<Tag>().unwrap(), Tag(0x0010, 0x0020));
        assert_eq!("(7FE0,0010)".parse::<Tag>().unwrap(), Tag(0x7FE0, 0x0010));
        assert!("bad".parse::<Tag>().is_err());
    }

    #[test]
    fn vr_length_field_width() {
        assert!(VR::OB.has_long_length());
        assert!(VR::SQ.has_long_length());
        assert!(VR::UN.has_long_length());
        assert!(VR::UC.has_long_length());
        assert!(!VR::UI.has_long_length());
        assert!(!VR::US.has_long_length());
        assert!(!VR::PN.has_long_length());
    }

    #[test]
    fn vr_padding_byte() {
        assert_eq!(VR::UI.padding(), 0);
        assert_eq!(VR::OB.padding(), 0);
        assert_eq!(VR::PN.padding(), b' ');
        assert_eq!(VR::CS.padding(), b' ');
    }

    #[test]
    fn undefined_lengths_never_compare() {
        assert_ne!(Length::UNDEFINED, Length::UNDEFINED);
        assert!(!(Length::UNDEFINED < Length(10)));
        assert!(!(Length::UNDEFINED > Length(10)));
        assert!((Length(2) + Length::UNDEFINED).is_undefined());
        assert_eq!(Length(4) + Length(4), Length(8));
    }

    #[test]
    fn sequence_item_header_checks_delimiters() {
        assert!(matches!(
            SequenceItemHeader::new(Tag(0xFFFE, 0xE000), Length::UNDEFINED),
            Ok(SequenceItemHeader::Item { .. })
        ));
        assert!(matches!(
            SequenceItemHeader::new(Tag(0xFFFE, 0xE00D), Length(0)),
            Ok(SequenceItemHeader::ItemDelimiter)
        ));
        assert!(SequenceItemHeader::new(Tag(0xFFFE, 0xE00D), Length(4)).is_err());
        assert!(SequenceItemHeader::new(Tag(0x0008, 0x0005), Length(0)).is_err());
    }
}
