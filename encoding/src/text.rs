//! Text encoding and decoding under DICOM character repertoires.
//!
//! Supported character sets:
//!
//! | Character set | decoding | encoding |
//! |---------------|----------|----------|
//! | ISO-IR 6 (default) | ✓ | ✓ |
//! | ISO-IR 100 (ISO-8859-1) | ✓ | ✓ |
//! | ISO-IR 101 (ISO-8859-2) | ✓ | ✓ |
//! | ISO-IR 109 (ISO-8859-3) | ✓ | ✓ |
//! | ISO-IR 110 (ISO-8859-4) | ✓ | ✓ |
//! | ISO-IR 144 (ISO-8859-5) | ✓ | ✓ |
//! | ISO-IR 192 (UTF-8) | ✓ | ✓ |
//! | GB18030 | ✓ | ✓ |
//!
//! Multi-valued Specific Character Set settings select their first
//! designated repertoire; ISO 2022 code extension sequences within
//! a value are not interpreted.

use encoding::all::{GB18030, ISO_8859_1, ISO_8859_2, ISO_8859_3, ISO_8859_4, ISO_8859_5, UTF_8};
use encoding::{DecoderTrap, EncoderTrap, Encoding, RawDecoder, StringWriter};
use snafu::{Backtrace, Snafu};
use std::borrow::Cow;

/// An error from encoding text into a character repertoire.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum EncodeTextError {
    #[snafu(display("{}", message))]
    EncodeCustom {
        message: Cow<'static, str>,
        backtrace: Backtrace,
    },
}

/// An error from decoding text from a character repertoire.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum DecodeTextError {
    #[snafu(display("{}", message))]
    DecodeCustom {
        message: Cow<'static, str>,
        backtrace: Backtrace,
    },
}

type EncodeResult<T> = Result<T, EncodeTextError>;
type DecodeResult<T> = Result<T, DecodeTextError>;

/// A holder of text encoding and decoding mechanisms for a
/// specific character set.
pub trait TextCodec {
    /// The defined term of this character set, suitable as a value
    /// of the Specific Character Set attribute.
    fn name(&self) -> Cow<'static, str>;

    /// Decode a byte buffer as a single string. The result may
    /// contain backslash value delimiters, to be split afterwards.
    fn decode(&self, text: &[u8]) -> DecodeResult<String>;

    /// Encode a text value into bytes. The input may carry multiple
    /// values delimited by backslashes.
    fn encode(&self, text: &str) -> EncodeResult<Vec<u8>>;
}

impl<T: ?Sized> TextCodec for Box<T>
where
    T: TextCodec,
{
    fn name(&self) -> Cow<'static, str> {
        self.as_ref().name()
    }

    fn decode(&self, text: &[u8]) -> DecodeResult<String> {
        self.as_ref().decode(text)
    }

    fn encode(&self, text: &str) -> EncodeResult<Vec<u8>> {
        self.as_ref().encode(text)
    }
}

impl<'a, T: ?Sized> TextCodec for &'a T
where
    T: TextCodec,
{
    fn name(&self) -> Cow<'static, str> {
        (**self).name()
    }

    fn decode(&self, text: &[u8]) -> DecodeResult<String> {
        (**self).decode(text)
    }

    fn encode(&self, text: &str) -> EncodeResult<Vec<u8>> {
        (**self).encode(text)
    }
}

/// A descriptor for a specific character set, selecting the
/// text codec used for the textual elements of a data set.
///
/// # Example
///
/// ```
/// use dcmkit_encoding::text::{SpecificCharacterSet, TextCodec};
///
/// let charset = SpecificCharacterSet::from_code("ISO_IR 100").unwrap();
/// assert_eq!(charset, SpecificCharacterSet::ISO_IR_100);
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SpecificCharacterSet(CharsetImpl);

impl SpecificCharacterSet {
    /// ISO IR 6: the default character repertoire.
    pub const ISO_IR_6: SpecificCharacterSet = SpecificCharacterSet(CharsetImpl::Default);

    /// ISO IR 100: ISO 8859-1, the Western Europe character set.
    pub const ISO_IR_100: SpecificCharacterSet = SpecificCharacterSet(CharsetImpl::IsoIr100);

    /// ISO IR 192: UTF-8.
    pub const ISO_IR_192: SpecificCharacterSet = SpecificCharacterSet(CharsetImpl::IsoIr192);

    /// Obtain the character set identified by the given code string,
    /// as found in a Specific Character Set element value.
    pub fn from_code(code: &str) -> Option<Self> {
        CharsetImpl::from_code(code).map(SpecificCharacterSet)
    }

    /// Obtain the character set for a possibly multi-valued
    /// Specific Character Set attribute. The first recognized
    /// non-empty code is selected; an empty first value resolves
    /// to the default repertoire.
    pub fn from_codes<'a, I>(codes: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut any = false;
        for code in codes {
            any = true;
            let code = code.trim();
            if code.is_empty() {
                continue;
            }
            if let Some(charset) = Self::from_code(code) {
                return Some(charset);
            }
        }
        if any {
            Some(SpecificCharacterSet::ISO_IR_6)
        } else {
            None
        }
    }
}

impl TextCodec for SpecificCharacterSet {
    fn name(&self) -> Cow<'static, str> {
        self.0.name()
    }

    fn decode(&self, text: &[u8]) -> DecodeResult<String> {
        self.0.decode(text)
    }

    fn encode(&self, text: &str) -> EncodeResult<Vec<u8>> {
        self.0.encode(text)
    }
}

/// The individually supported character sets.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, PartialOrd, Ord)]
#[non_exhaustive]
enum CharsetImpl {
    /// **ISO-IR 6**: the default character repertoire.
    #[default]
    Default,
    /// **ISO-IR 100** (ISO-8859-1), Western Europe.
    IsoIr100,
    /// **ISO-IR 101** (ISO-8859-2), Central/Eastern Europe.
    IsoIr101,
    /// **ISO-IR 109** (ISO-8859-3), South Europe.
    IsoIr109,
    /// **ISO-IR 110** (ISO-8859-4), North Europe.
    IsoIr110,
    /// **ISO-IR 144** (ISO-8859-5), Latin/Cyrillic.
    IsoIr144,
    /// **ISO-IR 192**, UTF-8.
    IsoIr192,
    /// **GB18030**, Simplified Chinese.
    Gb18030,
}

impl CharsetImpl {
    fn from_code(code: &str) -> Option<Self> {
        use self::CharsetImpl::*;
        match code.trim_end() {
            "Default" | "ISO_IR_6" | "ISO_IR 6" | "ISO 2022 IR 6" => Some(Default),
            "ISO_IR_100" | "ISO_IR 100" | "ISO 2022 IR 100" => Some(IsoIr100),
            "ISO_IR_101" | "ISO_IR 101" | "ISO 2022 IR 101" => Some(IsoIr101),
            "ISO_IR_109" | "ISO_IR 109" | "ISO 2022 IR 109" => Some(IsoIr109),
            "ISO_IR_110" | "ISO_IR 110" | "ISO 2022 IR 110" => Some(IsoIr110),
            "ISO_IR_144" | "ISO_IR 144" | "ISO 2022 IR 144" => Some(IsoIr144),
            "ISO_IR_192" | "ISO_IR 192" => Some(IsoIr192),
            "GB18030" => Some(Gb18030),
            _ => None,
        }
    }

    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed(match self {
            CharsetImpl::Default => "ISO_IR 6",
            CharsetImpl::IsoIr100 => "ISO_IR 100",
            CharsetImpl::IsoIr101 => "ISO_IR 101",
            CharsetImpl::IsoIr109 => "ISO_IR 109",
            CharsetImpl::IsoIr110 => "ISO_IR 110",
            CharsetImpl::IsoIr144 => "ISO_IR 144",
            CharsetImpl::IsoIr192 => "ISO_IR 192",
            CharsetImpl::Gb18030 => "GB18030",
        })
    }

    fn decode(&self, text: &[u8]) -> DecodeResult<String> {
        match self {
            CharsetImpl::Default => DefaultCharacterSetCodec.decode(text),
            CharsetImpl::IsoIr100 => IsoIr100CharacterSetCodec.decode(text),
            CharsetImpl::IsoIr101 => IsoIr101CharacterSetCodec.decode(text),
            CharsetImpl::IsoIr109 => IsoIr109CharacterSetCodec.decode(text),
            CharsetImpl::IsoIr110 => IsoIr110CharacterSetCodec.decode(text),
            CharsetImpl::IsoIr144 => IsoIr144CharacterSetCodec.decode(text),
            CharsetImpl::IsoIr192 => Utf8CharacterSetCodec.decode(text),
            CharsetImpl::Gb18030 => Gb18030CharacterSetCodec.decode(text),
        }
    }

    fn encode(&self, text: &str) -> EncodeResult<Vec<u8>> {
        match self {
            CharsetImpl::Default => DefaultCharacterSetCodec.encode(text),
            CharsetImpl::IsoIr100 => IsoIr100CharacterSetCodec.encode(text),
            CharsetImpl::IsoIr101 => IsoIr101CharacterSetCodec.encode(text),
            CharsetImpl::IsoIr109 => IsoIr109CharacterSetCodec.encode(text),
            CharsetImpl::IsoIr110 => IsoIr110CharacterSetCodec.encode(text),
            CharsetImpl::IsoIr144 => IsoIr144CharacterSetCodec.encode(text),
            CharsetImpl::IsoIr192 => Utf8CharacterSetCodec.encode(text),
            CharsetImpl::Gb18030 => Gb18030CharacterSetCodec.encode(text),
        }
    }
}

// On an undecodable byte, write out its octal escape instead of
// failing the whole value.
fn decode_text_trap(
    _decoder: &mut dyn RawDecoder,
    input: &[u8],
    output: &mut dyn StringWriter,
) -> bool {
    let c = input[0];
    let o0 = c & 7;
    let o1 = (c & 56) >> 3;
    let o2 = (c & 192) >> 6;
    output.write_char('\\');
    output.write_char((o2 + b'0') as char);
    output.write_char((o1 + b'0') as char);
    output.write_char((o0 + b'0') as char);
    true
}

/// Data type representing the default character set codec.
#[derive(Debug, Default, Copy, Clone, Eq, Hash, PartialEq)]
pub struct DefaultCharacterSetCodec;

impl TextCodec for DefaultCharacterSetCodec {
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("ISO_IR 6")
    }

    fn decode(&self, text: &[u8]) -> DecodeResult<String> {
        // ISO 8859-1 is a superset of the default repertoire
        ISO_8859_1
            .decode(text, DecoderTrap::Call(decode_text_trap))
            .map_err(|message| DecodeCustomSnafu { message }.build())
    }

    fn encode(&self, text: &str) -> EncodeResult<Vec<u8>> {
        ISO_8859_1
            .encode(text, EncoderTrap::Strict)
            .map_err(|message| EncodeCustomSnafu { message }.build())
    }
}

/// Declare and implement a character set codec type
/// backed by the `encoding` crate.
macro_rules! decl_character_set {
    ($typ:ident, $term:literal, $val:expr) => {
        #[derive(Debug, Default, Copy, Clone, Eq, Hash, PartialEq)]
        #[doc = "Data type for the "]
        #[doc = $term]
        #[doc = " character set codec."]
        pub struct $typ;

        impl TextCodec for $typ {
            fn name(&self) -> Cow<'static, str> {
                Cow::Borrowed($term)
            }

            fn decode(&self, text: &[u8]) -> DecodeResult<String> {
                $val.decode(text, DecoderTrap::Call(decode_text_trap))
                    .map_err(|message| DecodeCustomSnafu { message }.build())
            }

            fn encode(&self, text: &str) -> EncodeResult<Vec<u8>> {
                $val.encode(text, EncoderTrap::Strict)
                    .map_err(|message| EncodeCustomSnafu { message }.build())
            }
        }
    };
}

decl_character_set!(IsoIr100CharacterSetCodec, "ISO_IR 100", ISO_8859_1);
decl_character_set!(IsoIr101CharacterSetCodec, "ISO_IR 101", ISO_8859_2);
decl_character_set!(IsoIr109CharacterSetCodec, "ISO_IR 109", ISO_8859_3);
decl_character_set!(IsoIr110CharacterSetCodec, "ISO_IR 110", ISO_8859_4);
decl_character_set!(IsoIr144CharacterSetCodec, "ISO_IR 144", ISO_8859_5);
decl_character_set!(Utf8CharacterSetCodec, "ISO_IR 192", UTF_8);
decl_character_set!(Gb18030CharacterSetCodec, "GB18030", GB18030);

#[cfg(test)]
mod tests {
    use super::*;

    fn test_codec<T>(codec: T, string: &str, bytes: &[u8])
    where
        T: TextCodec,
    {
        assert_eq!(codec.encode(string).expect("encoding"), bytes);
        assert_eq!(codec.decode(bytes).expect("decoding"), string);
    }

    #[test]
    fn iso_ir_6_baseline() {
        test_codec(SpecificCharacterSet::default(), "Smith^John", b"Smith^John");
    }

    #[test]
    fn iso_ir_192_baseline() {
        let codec = SpecificCharacterSet::ISO_IR_192;
        test_codec(&codec, "Simões^John", "Simões^John".as_bytes());
        test_codec(codec, "Иванков^Андрей", "Иванков^Андрей".as_bytes());
    }

    #[test]
    fn iso_ir_100_baseline() {
        let codec = SpecificCharacterSet::ISO_IR_100;
        test_codec(&codec, "Simões^João", b"Sim\xF5es^Jo\xE3o");
        test_codec(codec, "Günther^Hans", b"G\xfcnther^Hans");
    }

    #[test]
    fn iso_ir_144_baseline() {
        let codec = SpecificCharacterSet::from_code("ISO_IR 144").unwrap();
        test_codec(
            codec,
            "Иванков^Андрей",
            b"\xb8\xd2\xd0\xdd\xda\xde\xd2^\xb0\xdd\xd4\xe0\xd5\xd9",
        );
    }

    #[test]
    fn multi_valued_codes_select_first_recognized() {
        let charset =
            SpecificCharacterSet::from_codes(["", "ISO 2022 IR 100"]).unwrap();
        assert_eq!(charset, SpecificCharacterSet::ISO_IR_100);

        // an empty first value alone resolves to the default
        let charset = SpecificCharacterSet::from_codes([""]).unwrap();
        assert_eq!(charset, SpecificCharacterSet::ISO_IR_6);
    }
}
