//! Core data structures for DICOM content.
//!
//! This crate defines the vocabulary types shared by the rest of
//! the toolkit: attribute tags, value representations, element
//! headers and lengths, the primitive value model, person names,
//! the UID grammar, and the dictionary traits.

pub mod dictionary;
pub mod header;
pub mod uid;
pub mod value;

pub use crate::dictionary::{AttributeDictionary, AttributeEntry, Multiplicity, UidDictionary};
pub use crate::header::{DataElement, DataElementHeader, Header, Length, Tag, VR};
pub use crate::uid::{is_valid_uid, is_valid_uid_tolerant, trim_uid, validate_uid};
pub use crate::value::{PrimitiveValue, Value};
