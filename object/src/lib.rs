//! A high-level API for reading and manipulating DICOM objects.
//!
//! The central types are [`InMemObject`], an in-memory data set,
//! and [`FileObject`], a full Part-10 file object with its
//! preamble and file meta group.
//!
//! ## Example
//!
//! ```no_run
//! use dcmkit_object::open_file;
//! use dcmkit_dictionary_std::tags;
//!
//! # fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let file = open_file("image.dcm")?;
//! let name = file.object().string_value(tags::PATIENT_NAME);
//! println!("patient: {:?}", name);
//! # Ok(())
//! # }
//! ```

pub mod file;
pub mod mem;
pub mod meta;
pub mod validate;

pub use crate::file::{
    from_reader, open_file, open_file_with, FileObject, ReadMode, ReadOptions,
};
pub use crate::mem::{element, InMemElement, InMemObject};
pub use crate::meta::{FileMetaTable, FileMetaTableBuilder};
pub use crate::validate::{ValidationLevel, ValidationOptions, ValidationReport, Validator};

/// The implementation class UID advertised by this toolkit
/// in file meta groups and association requests.
pub const IMPLEMENTATION_CLASS_UID: &str = "2.25.922661943209363517416813422112852730";

/// The implementation version name advertised by this toolkit.
pub const IMPLEMENTATION_VERSION_NAME: &str = "DCMKIT_010";
