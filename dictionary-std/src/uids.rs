//! Normative unique identifier constants and the UID registry table.

use dcmkit_core::dictionary::{UidEntry, UidKind};

/// DICOM Application Context Name
pub const APPLICATION_CONTEXT_NAME: &str = "1.2.840.10008.3.1.1.1";

// transfer syntaxes
pub const IMPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2";
pub const EXPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2.1";
pub const DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2.1.99";
pub const EXPLICIT_VR_BIG_ENDIAN: &str = "1.2.840.10008.1.2.2";
pub const JPEG_BASELINE8_BIT: &str = "1.2.840.10008.1.2.4.50";
pub const JPEG_EXTENDED12_BIT: &str = "1.2.840.10008.1.2.4.51";
pub const JPEG_LOSSLESS: &str = "1.2.840.10008.1.2.4.57";
pub const JPEG_LOSSLESS_SV1: &str = "1.2.840.10008.1.2.4.70";
pub const JPEG_LS_LOSSLESS: &str = "1.2.840.10008.1.2.4.80";
pub const JPEG_LS_NEAR_LOSSLESS: &str = "1.2.840.10008.1.2.4.81";
pub const JPEG2000_LOSSLESS: &str = "1.2.840.10008.1.2.4.90";
pub const JPEG2000: &str = "1.2.840.10008.1.2.4.91";
pub const RLE_LOSSLESS: &str = "1.2.840.10008.1.2.5";

// service classes
pub const VERIFICATION: &str = "1.2.840.10008.1.1";
pub const STORAGE_COMMITMENT_PUSH_MODEL: &str = "1.2.840.10008.1.20.1";
pub const STORAGE_COMMITMENT_PUSH_MODEL_INSTANCE: &str = "1.2.840.10008.1.20.1.1";

// storage SOP classes
pub const COMPUTED_RADIOGRAPHY_IMAGE_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.1";
pub const DIGITAL_X_RAY_IMAGE_STORAGE_FOR_PRESENTATION: &str = "1.2.840.10008.5.1.4.1.1.1.1";
pub const CT_IMAGE_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.2";
pub const ENHANCED_CT_IMAGE_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.2.1";
pub const ULTRASOUND_MULTI_FRAME_IMAGE_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.3.1";
pub const MR_IMAGE_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.4";
pub const ENHANCED_MR_IMAGE_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.4.1";
pub const ULTRASOUND_IMAGE_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.6.1";
pub const SECONDARY_CAPTURE_IMAGE_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.7";
pub const X_RAY_ANGIOGRAPHIC_IMAGE_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.12.1";
pub const NUCLEAR_MEDICINE_IMAGE_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.20";
pub const POSITRON_EMISSION_TOMOGRAPHY_IMAGE_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.128";
pub const RT_IMAGE_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.481.1";

// query/retrieve information models
pub const PATIENT_ROOT_QUERY_RETRIEVE_INFORMATION_MODEL_FIND: &str =
    "1.2.840.10008.5.1.4.1.2.1.1";
pub const PATIENT_ROOT_QUERY_RETRIEVE_INFORMATION_MODEL_MOVE: &str =
    "1.2.840.10008.5.1.4.1.2.1.2";
pub const PATIENT_ROOT_QUERY_RETRIEVE_INFORMATION_MODEL_GET: &str = "1.2.840.10008.5.1.4.1.2.1.3";
pub const STUDY_ROOT_QUERY_RETRIEVE_INFORMATION_MODEL_FIND: &str = "1.2.840.10008.5.1.4.1.2.2.1";
pub const STUDY_ROOT_QUERY_RETRIEVE_INFORMATION_MODEL_MOVE: &str = "1.2.840.10008.5.1.4.1.2.2.2";
pub const STUDY_ROOT_QUERY_RETRIEVE_INFORMATION_MODEL_GET: &str = "1.2.840.10008.5.1.4.1.2.2.3";
pub const PATIENT_STUDY_ONLY_QUERY_RETRIEVE_INFORMATION_MODEL_FIND: &str =
    "1.2.840.10008.5.1.4.1.2.3.1";
pub const PATIENT_STUDY_ONLY_QUERY_RETRIEVE_INFORMATION_MODEL_MOVE: &str =
    "1.2.840.10008.5.1.4.1.2.3.2";
pub const PATIENT_STUDY_ONLY_QUERY_RETRIEVE_INFORMATION_MODEL_GET: &str =
    "1.2.840.10008.5.1.4.1.2.3.3";
pub const MODALITY_WORKLIST_INFORMATION_MODEL_FIND: &str = "1.2.840.10008.5.1.4.31";

macro_rules! uid_entry {
    ($uid:ident, $keyword:literal, $kind:ident) => {
        UidEntry {
            uid: $uid,
            keyword: $keyword,
            kind: UidKind::$kind,
        }
    };
}

/// The UID registry entries.
#[rustfmt::skip]
pub static UID_ENTRIES: &[UidEntry<'static>] = &[
    uid_entry!(IMPLICIT_VR_LITTLE_ENDIAN, "ImplicitVRLittleEndian", TransferSyntax),
    uid_entry!(EXPLICIT_VR_LITTLE_ENDIAN, "ExplicitVRLittleEndian", TransferSyntax),
    uid_entry!(DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN, "DeflatedExplicitVRLittleEndian", TransferSyntax),
    uid_entry!(EXPLICIT_VR_BIG_ENDIAN, "ExplicitVRBigEndian", TransferSyntax),
    uid_entry!(JPEG_BASELINE8_BIT, "JPEGBaseline8Bit", TransferSyntax),
    uid_entry!(JPEG_EXTENDED12_BIT, "JPEGExtended12Bit", TransferSyntax),
    uid_entry!(JPEG_LOSSLESS, "JPEGLossless", TransferSyntax),
    uid_entry!(JPEG_LOSSLESS_SV1, "JPEGLosslessSV1", TransferSyntax),
    uid_entry!(JPEG_LS_LOSSLESS, "JPEGLSLossless", TransferSyntax),
    uid_entry!(JPEG_LS_NEAR_LOSSLESS, "JPEGLSNearLossless", TransferSyntax),
    uid_entry!(JPEG2000_LOSSLESS, "JPEG2000Lossless", TransferSyntax),
    uid_entry!(JPEG2000, "JPEG2000", TransferSyntax),
    uid_entry!(RLE_LOSSLESS, "RLELossless", TransferSyntax),

    uid_entry!(VERIFICATION, "Verification", SopClass),
    uid_entry!(STORAGE_COMMITMENT_PUSH_MODEL, "StorageCommitmentPushModel", SopClass),
    uid_entry!(STORAGE_COMMITMENT_PUSH_MODEL_INSTANCE, "StorageCommitmentPushModelInstance", SopInstance),

    uid_entry!(COMPUTED_RADIOGRAPHY_IMAGE_STORAGE, "ComputedRadiographyImageStorage", SopClass),
    uid_entry!(DIGITAL_X_RAY_IMAGE_STORAGE_FOR_PRESENTATION, "DigitalXRayImageStorageForPresentation", SopClass),
    uid_entry!(CT_IMAGE_STORAGE, "CTImageStorage", SopClass),
    uid_entry!(ENHANCED_CT_IMAGE_STORAGE, "EnhancedCTImageStorage", SopClass),
    uid_entry!(ULTRASOUND_MULTI_FRAME_IMAGE_STORAGE, "UltrasoundMultiFrameImageStorage", SopClass),
    uid_entry!(MR_IMAGE_STORAGE, "MRImageStorage", SopClass),
    uid_entry!(ENHANCED_MR_IMAGE_STORAGE, "EnhancedMRImageStorage", SopClass),
    uid_entry!(ULTRASOUND_IMAGE_STORAGE, "UltrasoundImageStorage", SopClass),
    uid_entry!(SECONDARY_CAPTURE_IMAGE_STORAGE, "SecondaryCaptureImageStorage", SopClass),
    uid_entry!(X_RAY_ANGIOGRAPHIC_IMAGE_STORAGE, "XRayAngiographicImageStorage", SopClass),
    uid_entry!(NUCLEAR_MEDICINE_IMAGE_STORAGE, "NuclearMedicineImageStorage", SopClass),
    uid_entry!(POSITRON_EMISSION_TOMOGRAPHY_IMAGE_STORAGE, "PositronEmissionTomographyImageStorage", SopClass),
    uid_entry!(RT_IMAGE_STORAGE, "RTImageStorage", SopClass),

    uid_entry!(PATIENT_ROOT_QUERY_RETRIEVE_INFORMATION_MODEL_FIND, "PatientRootQueryRetrieveInformationModelFind", SopClass),
    uid_entry!(PATIENT_ROOT_QUERY_RETRIEVE_INFORMATION_MODEL_MOVE, "PatientRootQueryRetrieveInformationModelMove", SopClass),
    uid_entry!(PATIENT_ROOT_QUERY_RETRIEVE_INFORMATION_MODEL_GET, "PatientRootQueryRetrieveInformationModelGet", SopClass),
    uid_entry!(STUDY_ROOT_QUERY_RETRIEVE_INFORMATION_MODEL_FIND, "StudyRootQueryRetrieveInformationModelFind", SopClass),
    uid_entry!(STUDY_ROOT_QUERY_RETRIEVE_INFORMATION_MODEL_MOVE, "StudyRootQueryRetrieveInformationModelMove", SopClass),
    uid_entry!(STUDY_ROOT_QUERY_RETRIEVE_INFORMATION_MODEL_GET, "StudyRootQueryRetrieveInformationModelGet", SopClass),
    uid_entry!(PATIENT_STUDY_ONLY_QUERY_RETRIEVE_INFORMATION_MODEL_FIND, "PatientStudyOnlyQueryRetrieveInformationModelFind", SopClass),
    uid_entry!(PATIENT_STUDY_ONLY_QUERY_RETRIEVE_INFORMATION_MODEL_MOVE, "PatientStudyOnlyQueryRetrieveInformationModelMove", SopClass),
    uid_entry!(PATIENT_STUDY_ONLY_QUERY_RETRIEVE_INFORMATION_MODEL_GET, "PatientStudyOnlyQueryRetrieveInformationModelGet", SopClass),
    uid_entry!(MODALITY_WORKLIST_INFORMATION_MODEL_FIND, "ModalityWorklistInformationModelFind", SopClass),
];
