//! Standard DICOM dictionaries and constants.
//!
//! - [`tags`] holds attribute tag constants and the standard
//!   dictionary entry table.
//! - [`uids`] holds unique identifier constants and the UID
//!   registry table.
//! - [`registry`] provides the lazily indexed singleton behind
//!   [`StandardAttributeDictionary`] and [`StandardUidDictionary`].
//! - [`private`] supports run-time registration of private tag
//!   dictionaries keyed by private creator.

pub mod private;
pub mod registry;
pub mod tags;
pub mod uids;

pub use registry::{StandardAttributeDictionary, StandardUidDictionary};

#[cfg(test)]
mod tests {
    use dcmkit_core::Tag;

    #[test]
    fn tag_constants_available() {
        use crate::tags::*;
        assert_eq!(PATIENT_NAME, Tag(0x0010, 0x0010));
        assert_eq!(MODALITY, Tag(0x0008, 0x0060));
        assert_eq!(PIXEL_DATA, Tag(0x7FE0, 0x0010));
        assert_eq!(STATUS, Tag(0x0000, 0x0900));
    }

    #[test]
    fn uid_constants_available() {
        use crate::uids::*;
        assert_eq!(EXPLICIT_VR_LITTLE_ENDIAN, "1.2.840.10008.1.2.1");
        assert_eq!(VERIFICATION, "1.2.840.10008.1.1");
        assert_eq!(
            STUDY_ROOT_QUERY_RETRIEVE_INFORMATION_MODEL_FIND,
            "1.2.840.10008.5.1.4.1.2.2.1"
        );
    }
}
