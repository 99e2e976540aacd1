//! DICOM encoding and decoding primitives:
//! endian-aware basic codecs, element header codecs per transfer
//! syntax, text repertoires, and the transfer syntax registry.

pub mod decode;
pub mod encode;
pub mod text;
pub mod transfer_syntax;

pub use crate::decode::{BasicDecode, Decode};
pub use crate::encode::{BasicEncode, Encode};
pub use crate::text::{SpecificCharacterSet, TextCodec};
pub use crate::transfer_syntax::{TransferSyntax, TransferSyntaxRegistry};
