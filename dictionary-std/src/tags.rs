//! Attribute tag constants and the standard dictionary entries.
//!
//! The table is not a full transcription of PS3.6; it covers the
//! attributes handled by the toolkit itself plus the identifying,
//! acquisition and pixel-description attributes commonly found in
//! composite objects. Unknown tags fall back to dictionary-less
//! handling at the call site.

use dcmkit_core::dictionary::{AttributeEntry, Multiplicity};
use dcmkit_core::{Tag, VR};

// command set group (0000)
pub const COMMAND_GROUP_LENGTH: Tag = Tag(0x0000, 0x0000);
pub const AFFECTED_SOP_CLASS_UID: Tag = Tag(0x0000, 0x0002);
pub const REQUESTED_SOP_CLASS_UID: Tag = Tag(0x0000, 0x0003);
pub const COMMAND_FIELD: Tag = Tag(0x0000, 0x0100);
pub const MESSAGE_ID: Tag = Tag(0x0000, 0x0110);
pub const MESSAGE_ID_BEING_RESPONDED_TO: Tag = Tag(0x0000, 0x0120);
pub const MOVE_DESTINATION: Tag = Tag(0x0000, 0x0600);
pub const PRIORITY: Tag = Tag(0x0000, 0x0700);
pub const COMMAND_DATA_SET_TYPE: Tag = Tag(0x0000, 0x0800);
pub const STATUS: Tag = Tag(0x0000, 0x0900);
pub const OFFENDING_ELEMENT: Tag = Tag(0x0000, 0x0901);
pub const ERROR_COMMENT: Tag = Tag(0x0000, 0x0902);
pub const ERROR_ID: Tag = Tag(0x0000, 0x0903);
pub const AFFECTED_SOP_INSTANCE_UID: Tag = Tag(0x0000, 0x1000);
pub const REQUESTED_SOP_INSTANCE_UID: Tag = Tag(0x0000, 0x1001);
pub const EVENT_TYPE_ID: Tag = Tag(0x0000, 0x1002);
pub const ATTRIBUTE_IDENTIFIER_LIST: Tag = Tag(0x0000, 0x1005);
pub const ACTION_TYPE_ID: Tag = Tag(0x0000, 0x1008);
pub const NUMBER_OF_REMAINING_SUBOPERATIONS: Tag = Tag(0x0000, 0x1020);
pub const NUMBER_OF_COMPLETED_SUBOPERATIONS: Tag = Tag(0x0000, 0x1021);
pub const NUMBER_OF_FAILED_SUBOPERATIONS: Tag = Tag(0x0000, 0x1022);
pub const NUMBER_OF_WARNING_SUBOPERATIONS: Tag = Tag(0x0000, 0x1023);
pub const MOVE_ORIGINATOR_APPLICATION_ENTITY_TITLE: Tag = Tag(0x0000, 0x1030);
pub const MOVE_ORIGINATOR_MESSAGE_ID: Tag = Tag(0x0000, 0x1031);

// file meta group (0002)
pub const FILE_META_INFORMATION_GROUP_LENGTH: Tag = Tag(0x0002, 0x0000);
pub const FILE_META_INFORMATION_VERSION: Tag = Tag(0x0002, 0x0001);
pub const MEDIA_STORAGE_SOP_CLASS_UID: Tag = Tag(0x0002, 0x0002);
pub const MEDIA_STORAGE_SOP_INSTANCE_UID: Tag = Tag(0x0002, 0x0003);
pub const TRANSFER_SYNTAX_UID: Tag = Tag(0x0002, 0x0010);
pub const IMPLEMENTATION_CLASS_UID: Tag = Tag(0x0002, 0x0012);
pub const IMPLEMENTATION_VERSION_NAME: Tag = Tag(0x0002, 0x0013);
pub const SOURCE_APPLICATION_ENTITY_TITLE: Tag = Tag(0x0002, 0x0016);
pub const SENDING_APPLICATION_ENTITY_TITLE: Tag = Tag(0x0002, 0x0017);
pub const RECEIVING_APPLICATION_ENTITY_TITLE: Tag = Tag(0x0002, 0x0018);
pub const PRIVATE_INFORMATION_CREATOR_UID: Tag = Tag(0x0002, 0x0100);
pub const PRIVATE_INFORMATION: Tag = Tag(0x0002, 0x0102);

// identifying group (0008)
pub const SPECIFIC_CHARACTER_SET: Tag = Tag(0x0008, 0x0005);
pub const IMAGE_TYPE: Tag = Tag(0x0008, 0x0008);
pub const INSTANCE_CREATION_DATE: Tag = Tag(0x0008, 0x0012);
pub const INSTANCE_CREATION_TIME: Tag = Tag(0x0008, 0x0013);
pub const SOP_CLASS_UID: Tag = Tag(0x0008, 0x0016);
pub const SOP_INSTANCE_UID: Tag = Tag(0x0008, 0x0018);
pub const STUDY_DATE: Tag = Tag(0x0008, 0x0020);
pub const SERIES_DATE: Tag = Tag(0x0008, 0x0021);
pub const ACQUISITION_DATE: Tag = Tag(0x0008, 0x0022);
pub const CONTENT_DATE: Tag = Tag(0x0008, 0x0023);
pub const STUDY_TIME: Tag = Tag(0x0008, 0x0030);
pub const SERIES_TIME: Tag = Tag(0x0008, 0x0031);
pub const ACQUISITION_TIME: Tag = Tag(0x0008, 0x0032);
pub const CONTENT_TIME: Tag = Tag(0x0008, 0x0033);
pub const ACCESSION_NUMBER: Tag = Tag(0x0008, 0x0050);
pub const QUERY_RETRIEVE_LEVEL: Tag = Tag(0x0008, 0x0052);
pub const RETRIEVE_AE_TITLE: Tag = Tag(0x0008, 0x0054);
pub const INSTANCE_AVAILABILITY: Tag = Tag(0x0008, 0x0056);
pub const FAILED_SOP_INSTANCE_UID_LIST: Tag = Tag(0x0008, 0x0058);
pub const MODALITY: Tag = Tag(0x0008, 0x0060);
pub const MODALITIES_IN_STUDY: Tag = Tag(0x0008, 0x0061);
pub const CONVERSION_TYPE: Tag = Tag(0x0008, 0x0064);
pub const MANUFACTURER: Tag = Tag(0x0008, 0x0070);
pub const INSTITUTION_NAME: Tag = Tag(0x0008, 0x0080);
pub const REFERRING_PHYSICIAN_NAME: Tag = Tag(0x0008, 0x0090);
pub const TIMEZONE_OFFSET_FROM_UTC: Tag = Tag(0x0008, 0x0201);
pub const STUDY_DESCRIPTION: Tag = Tag(0x0008, 0x1030);
pub const SERIES_DESCRIPTION: Tag = Tag(0x0008, 0x103E);
pub const PERFORMING_PHYSICIAN_NAME: Tag = Tag(0x0008, 0x1050);
pub const OPERATORS_NAME: Tag = Tag(0x0008, 0x1070);
pub const MANUFACTURER_MODEL_NAME: Tag = Tag(0x0008, 0x1090);
pub const REFERENCED_STUDY_SEQUENCE: Tag = Tag(0x0008, 0x1110);
pub const REFERENCED_SERIES_SEQUENCE: Tag = Tag(0x0008, 0x1115);
pub const REFERENCED_PATIENT_SEQUENCE: Tag = Tag(0x0008, 0x1120);
pub const REFERENCED_SOP_CLASS_UID: Tag = Tag(0x0008, 0x1150);
pub const REFERENCED_SOP_INSTANCE_UID: Tag = Tag(0x0008, 0x1155);
pub const REFERENCED_FRAME_NUMBER: Tag = Tag(0x0008, 0x1160);

// patient group (0010)
pub const PATIENT_NAME: Tag = Tag(0x0010, 0x0010);
pub const PATIENT_ID: Tag = Tag(0x0010, 0x0020);
pub const ISSUER_OF_PATIENT_ID: Tag = Tag(0x0010, 0x0021);
pub const PATIENT_BIRTH_DATE: Tag = Tag(0x0010, 0x0030);
pub const PATIENT_BIRTH_TIME: Tag = Tag(0x0010, 0x0032);
pub const PATIENT_SEX: Tag = Tag(0x0010, 0x0040);
pub const OTHER_PATIENT_NAMES: Tag = Tag(0x0010, 0x1001);
pub const PATIENT_AGE: Tag = Tag(0x0010, 0x1010);
pub const PATIENT_SIZE: Tag = Tag(0x0010, 0x1020);
pub const PATIENT_WEIGHT: Tag = Tag(0x0010, 0x1030);
pub const ETHNIC_GROUP: Tag = Tag(0x0010, 0x2160);
pub const ADDITIONAL_PATIENT_HISTORY: Tag = Tag(0x0010, 0x21B0);
pub const PATIENT_COMMENTS: Tag = Tag(0x0010, 0x4000);

// acquisition group (0018)
pub const BODY_PART_EXAMINED: Tag = Tag(0x0018, 0x0015);
pub const SCANNING_SEQUENCE: Tag = Tag(0x0018, 0x0020);
pub const SEQUENCE_VARIANT: Tag = Tag(0x0018, 0x0021);
pub const SCAN_OPTIONS: Tag = Tag(0x0018, 0x0022);
pub const MR_ACQUISITION_TYPE: Tag = Tag(0x0018, 0x0023);
pub const SLICE_THICKNESS: Tag = Tag(0x0018, 0x0050);
pub const KVP: Tag = Tag(0x0018, 0x0060);
pub const REPETITION_TIME: Tag = Tag(0x0018, 0x0080);
pub const ECHO_TIME: Tag = Tag(0x0018, 0x0081);
pub const DEVICE_SERIAL_NUMBER: Tag = Tag(0x0018, 0x1000);
pub const SOFTWARE_VERSIONS: Tag = Tag(0x0018, 0x1020);
pub const PROTOCOL_NAME: Tag = Tag(0x0018, 0x1030);
pub const RECONSTRUCTION_DIAMETER: Tag = Tag(0x0018, 0x1100);
pub const GANTRY_DETECTOR_TILT: Tag = Tag(0x0018, 0x1120);
pub const EXPOSURE_TIME: Tag = Tag(0x0018, 0x1150);
pub const X_RAY_TUBE_CURRENT: Tag = Tag(0x0018, 0x1151);
pub const EXPOSURE: Tag = Tag(0x0018, 0x1152);
pub const CONVOLUTION_KERNEL: Tag = Tag(0x0018, 0x1210);
pub const PATIENT_POSITION: Tag = Tag(0x0018, 0x5100);

// relationship group (0020)
pub const STUDY_INSTANCE_UID: Tag = Tag(0x0020, 0x000D);
pub const SERIES_INSTANCE_UID: Tag = Tag(0x0020, 0x000E);
pub const STUDY_ID: Tag = Tag(0x0020, 0x0010);
pub const SERIES_NUMBER: Tag = Tag(0x0020, 0x0011);
pub const ACQUISITION_NUMBER: Tag = Tag(0x0020, 0x0012);
pub const INSTANCE_NUMBER: Tag = Tag(0x0020, 0x0013);
pub const PATIENT_ORIENTATION: Tag = Tag(0x0020, 0x0020);
pub const IMAGE_POSITION_PATIENT: Tag = Tag(0x0020, 0x0032);
pub const IMAGE_ORIENTATION_PATIENT: Tag = Tag(0x0020, 0x0037);
pub const FRAME_OF_REFERENCE_UID: Tag = Tag(0x0020, 0x0052);
pub const LATERALITY: Tag = Tag(0x0020, 0x0060);
pub const POSITION_REFERENCE_INDICATOR: Tag = Tag(0x0020, 0x1040);
pub const SLICE_LOCATION: Tag = Tag(0x0020, 0x1041);
pub const NUMBER_OF_STUDY_RELATED_SERIES: Tag = Tag(0x0020, 0x1206);
pub const NUMBER_OF_STUDY_RELATED_INSTANCES: Tag = Tag(0x0020, 0x1208);
pub const NUMBER_OF_SERIES_RELATED_INSTANCES: Tag = Tag(0x0020, 0x1209);

// image presentation group (0028)
pub const SAMPLES_PER_PIXEL: Tag = Tag(0x0028, 0x0002);
pub const PHOTOMETRIC_INTERPRETATION: Tag = Tag(0x0028, 0x0004);
pub const PLANAR_CONFIGURATION: Tag = Tag(0x0028, 0x0006);
pub const NUMBER_OF_FRAMES: Tag = Tag(0x0028, 0x0008);
pub const ROWS: Tag = Tag(0x0028, 0x0010);
pub const COLUMNS: Tag = Tag(0x0028, 0x0011);
pub const PIXEL_SPACING: Tag = Tag(0x0028, 0x0030);
pub const BITS_ALLOCATED: Tag = Tag(0x0028, 0x0100);
pub const BITS_STORED: Tag = Tag(0x0028, 0x0101);
pub const HIGH_BIT: Tag = Tag(0x0028, 0x0102);
pub const PIXEL_REPRESENTATION: Tag = Tag(0x0028, 0x0103);
pub const SMALLEST_IMAGE_PIXEL_VALUE: Tag = Tag(0x0028, 0x0106);
pub const LARGEST_IMAGE_PIXEL_VALUE: Tag = Tag(0x0028, 0x0107);
pub const WINDOW_CENTER: Tag = Tag(0x0028, 0x1050);
pub const WINDOW_WIDTH: Tag = Tag(0x0028, 0x1051);
pub const RESCALE_INTERCEPT: Tag = Tag(0x0028, 0x1052);
pub const RESCALE_SLOPE: Tag = Tag(0x0028, 0x1053);
pub const RESCALE_TYPE: Tag = Tag(0x0028, 0x1054);
pub const LOSSY_IMAGE_COMPRESSION: Tag = Tag(0x0028, 0x2110);

// overlay groups (60xx); the group number of a concrete element
// may be any even value from 0x6000 to 0x601E
pub const OVERLAY_ROWS: Tag = Tag(0x6000, 0x0010);
pub const OVERLAY_COLUMNS: Tag = Tag(0x6000, 0x0011);
pub const OVERLAY_TYPE: Tag = Tag(0x6000, 0x0040);
pub const OVERLAY_ORIGIN: Tag = Tag(0x6000, 0x0050);
pub const OVERLAY_BITS_ALLOCATED: Tag = Tag(0x6000, 0x0100);
pub const OVERLAY_BIT_POSITION: Tag = Tag(0x6000, 0x0102);
pub const OVERLAY_DATA: Tag = Tag(0x6000, 0x3000);

// pixel data group (7FE0)
pub const PIXEL_DATA: Tag = Tag(0x7FE0, 0x0010);

// item and delimitation pseudo-elements (FFFE)
pub const ITEM: Tag = Tag(0xFFFE, 0xE000);
pub const ITEM_DELIMITATION_ITEM: Tag = Tag(0xFFFE, 0xE00D);
pub const SEQUENCE_DELIMITATION_ITEM: Tag = Tag(0xFFFE, 0xE0DD);

const ONE: Multiplicity = Multiplicity::ONE;
const ONE_TO_N: Multiplicity = Multiplicity::AtLeast(1);

macro_rules! entry {
    ($tag:ident, $keyword:literal, $vr:ident) => {
        AttributeEntry {
            tag: $tag,
            keyword: $keyword,
            vr: VR::$vr,
            vm: ONE,
            retired: false,
        }
    };
    ($tag:ident, $keyword:literal, $vr:ident, $vm:expr) => {
        AttributeEntry {
            tag: $tag,
            keyword: $keyword,
            vr: VR::$vr,
            vm: $vm,
            retired: false,
        }
    };
    ($tag:ident, $keyword:literal, $vr:ident, $vm:expr, retired) => {
        AttributeEntry {
            tag: $tag,
            keyword: $keyword,
            vr: VR::$vr,
            vm: $vm,
            retired: true,
        }
    };
}

/// The standard dictionary entries, ordered by tag.
#[rustfmt::skip]
pub static ENTRIES: &[AttributeEntry<'static>] = &[
    entry!(COMMAND_GROUP_LENGTH, "CommandGroupLength", UL),
    entry!(AFFECTED_SOP_CLASS_UID, "AffectedSOPClassUID", UI),
    entry!(REQUESTED_SOP_CLASS_UID, "RequestedSOPClassUID", UI),
    entry!(COMMAND_FIELD, "CommandField", US),
    entry!(MESSAGE_ID, "MessageID", US),
    entry!(MESSAGE_ID_BEING_RESPONDED_TO, "MessageIDBeingRespondedTo", US),
    entry!(MOVE_DESTINATION, "MoveDestination", AE),
    entry!(PRIORITY, "Priority", US),
    entry!(COMMAND_DATA_SET_TYPE, "CommandDataSetType", US),
    entry!(STATUS, "Status", US),
    entry!(OFFENDING_ELEMENT, "OffendingElement", AT, ONE_TO_N),
    entry!(ERROR_COMMENT, "ErrorComment", LO),
    entry!(ERROR_ID, "ErrorID", US),
    entry!(AFFECTED_SOP_INSTANCE_UID, "AffectedSOPInstanceUID", UI),
    entry!(REQUESTED_SOP_INSTANCE_UID, "RequestedSOPInstanceUID", UI),
    entry!(EVENT_TYPE_ID, "EventTypeID", US),
    entry!(ATTRIBUTE_IDENTIFIER_LIST, "AttributeIdentifierList", AT, ONE_TO_N),
    entry!(ACTION_TYPE_ID, "ActionTypeID", US),
    entry!(NUMBER_OF_REMAINING_SUBOPERATIONS, "NumberOfRemainingSuboperations", US),
    entry!(NUMBER_OF_COMPLETED_SUBOPERATIONS, "NumberOfCompletedSuboperations", US),
    entry!(NUMBER_OF_FAILED_SUBOPERATIONS, "NumberOfFailedSuboperations", US),
    entry!(NUMBER_OF_WARNING_SUBOPERATIONS, "NumberOfWarningSuboperations", US),
    entry!(MOVE_ORIGINATOR_APPLICATION_ENTITY_TITLE, "MoveOriginatorApplicationEntityTitle", AE),
    entry!(MOVE_ORIGINATOR_MESSAGE_ID, "MoveOriginatorMessageID", US),

    entry!(FILE_META_INFORMATION_GROUP_LENGTH, "FileMetaInformationGroupLength", UL),
    entry!(FILE_META_INFORMATION_VERSION, "FileMetaInformationVersion", OB),
    entry!(MEDIA_STORAGE_SOP_CLASS_UID, "MediaStorageSOPClassUID", UI),
    entry!(MEDIA_STORAGE_SOP_INSTANCE_UID, "MediaStorageSOPInstanceUID", UI),
    entry!(TRANSFER_SYNTAX_UID, "TransferSyntaxUID", UI),
    entry!(IMPLEMENTATION_CLASS_UID, "ImplementationClassUID", UI),
    entry!(IMPLEMENTATION_VERSION_NAME, "ImplementationVersionName", SH),
    entry!(SOURCE_APPLICATION_ENTITY_TITLE, "SourceApplicationEntityTitle", AE),
    entry!(SENDING_APPLICATION_ENTITY_TITLE, "SendingApplicationEntityTitle", AE),
    entry!(RECEIVING_APPLICATION_ENTITY_TITLE, "ReceivingApplicationEntityTitle", AE),
    entry!(PRIVATE_INFORMATION_CREATOR_UID, "PrivateInformationCreatorUID", UI),
    entry!(PRIVATE_INFORMATION, "PrivateInformation", OB),

    entry!(SPECIFIC_CHARACTER_SET, "SpecificCharacterSet", CS, ONE_TO_N),
    entry!(IMAGE_TYPE, "ImageType", CS, Multiplicity::AtLeast(2)),
    entry!(INSTANCE_CREATION_DATE, "InstanceCreationDate", DA),
    entry!(INSTANCE_CREATION_TIME, "InstanceCreationTime", TM),
    entry!(SOP_CLASS_UID, "SOPClassUID", UI),
    entry!(SOP_INSTANCE_UID, "SOPInstanceUID", UI),
    entry!(STUDY_DATE, "StudyDate", DA),
    entry!(SERIES_DATE, "SeriesDate", DA),
    entry!(ACQUISITION_DATE, "AcquisitionDate", DA),
    entry!(CONTENT_DATE, "ContentDate", DA),
    entry!(STUDY_TIME, "StudyTime", TM),
    entry!(SERIES_TIME, "SeriesTime", TM),
    entry!(ACQUISITION_TIME, "AcquisitionTime", TM),
    entry!(CONTENT_TIME, "ContentTime", TM),
    entry!(ACCESSION_NUMBER, "AccessionNumber", SH),
    entry!(QUERY_RETRIEVE_LEVEL, "QueryRetrieveLevel", CS),
    entry!(RETRIEVE_AE_TITLE, "RetrieveAETitle", AE, ONE_TO_N),
    entry!(INSTANCE_AVAILABILITY, "InstanceAvailability", CS),
    entry!(FAILED_SOP_INSTANCE_UID_LIST, "FailedSOPInstanceUIDList", UI, ONE_TO_N),
    entry!(MODALITY, "Modality", CS),
    entry!(MODALITIES_IN_STUDY, "ModalitiesInStudy", CS, ONE_TO_N),
    entry!(CONVERSION_TYPE, "ConversionType", CS),
    entry!(MANUFACTURER, "Manufacturer", LO),
    entry!(INSTITUTION_NAME, "InstitutionName", LO),
    entry!(REFERRING_PHYSICIAN_NAME, "ReferringPhysicianName", PN),
    entry!(TIMEZONE_OFFSET_FROM_UTC, "TimezoneOffsetFromUTC", SH),
    entry!(STUDY_DESCRIPTION, "StudyDescription", LO),
    entry!(SERIES_DESCRIPTION, "SeriesDescription", LO),
    entry!(PERFORMING_PHYSICIAN_NAME, "PerformingPhysicianName", PN, ONE_TO_N),
    entry!(OPERATORS_NAME, "OperatorsName", PN, ONE_TO_N),
    entry!(MANUFACTURER_MODEL_NAME, "ManufacturerModelName", LO),
    entry!(REFERENCED_STUDY_SEQUENCE, "ReferencedStudySequence", SQ),
    entry!(REFERENCED_SERIES_SEQUENCE, "ReferencedSeriesSequence", SQ),
    entry!(REFERENCED_PATIENT_SEQUENCE, "ReferencedPatientSequence", SQ),
    entry!(REFERENCED_SOP_CLASS_UID, "ReferencedSOPClassUID", UI),
    entry!(REFERENCED_SOP_INSTANCE_UID, "ReferencedSOPInstanceUID", UI),
    entry!(REFERENCED_FRAME_NUMBER, "ReferencedFrameNumber", IS, ONE_TO_N),

    entry!(PATIENT_NAME, "PatientName", PN),
    entry!(PATIENT_ID, "PatientID", LO),
    entry!(ISSUER_OF_PATIENT_ID, "IssuerOfPatientID", LO),
    entry!(PATIENT_BIRTH_DATE, "PatientBirthDate", DA),
    entry!(PATIENT_BIRTH_TIME, "PatientBirthTime", TM),
    entry!(PATIENT_SEX, "PatientSex", CS),
    entry!(OTHER_PATIENT_NAMES, "OtherPatientNames", PN, ONE_TO_N),
    entry!(PATIENT_AGE, "PatientAge", AS),
    entry!(PATIENT_SIZE, "PatientSize", DS),
    entry!(PATIENT_WEIGHT, "PatientWeight", DS),
    entry!(ETHNIC_GROUP, "EthnicGroup", SH),
    entry!(ADDITIONAL_PATIENT_HISTORY, "AdditionalPatientHistory", LT),
    entry!(PATIENT_COMMENTS, "PatientComments", LT),

    entry!(BODY_PART_EXAMINED, "BodyPartExamined", CS),
    entry!(SCANNING_SEQUENCE, "ScanningSequence", CS, ONE_TO_N),
    entry!(SEQUENCE_VARIANT, "SequenceVariant", CS, ONE_TO_N),
    entry!(SCAN_OPTIONS, "ScanOptions", CS, ONE_TO_N),
    entry!(MR_ACQUISITION_TYPE, "MRAcquisitionType", CS),
    entry!(SLICE_THICKNESS, "SliceThickness", DS),
    entry!(KVP, "KVP", DS),
    entry!(REPETITION_TIME, "RepetitionTime", DS),
    entry!(ECHO_TIME, "EchoTime", DS),
    entry!(DEVICE_SERIAL_NUMBER, "DeviceSerialNumber", LO),
    entry!(SOFTWARE_VERSIONS, "SoftwareVersions", LO, ONE_TO_N),
    entry!(PROTOCOL_NAME, "ProtocolName", LO),
    entry!(RECONSTRUCTION_DIAMETER, "ReconstructionDiameter", DS),
    entry!(GANTRY_DETECTOR_TILT, "GantryDetectorTilt", DS),
    entry!(EXPOSURE_TIME, "ExposureTime", IS),
    entry!(X_RAY_TUBE_CURRENT, "XRayTubeCurrent", IS),
    entry!(EXPOSURE, "Exposure", IS),
    entry!(CONVOLUTION_KERNEL, "ConvolutionKernel", SH, ONE_TO_N),
    entry!(PATIENT_POSITION, "PatientPosition", CS),

    entry!(STUDY_INSTANCE_UID, "StudyInstanceUID", UI),
    entry!(SERIES_INSTANCE_UID, "SeriesInstanceUID", UI),
    entry!(STUDY_ID, "StudyID", SH),
    entry!(SERIES_NUMBER, "SeriesNumber", IS),
    entry!(ACQUISITION_NUMBER, "AcquisitionNumber", IS),
    entry!(INSTANCE_NUMBER, "InstanceNumber", IS),
    entry!(PATIENT_ORIENTATION, "PatientOrientation", CS, Multiplicity::Exact(2)),
    entry!(IMAGE_POSITION_PATIENT, "ImagePositionPatient", DS, Multiplicity::Exact(3)),
    entry!(IMAGE_ORIENTATION_PATIENT, "ImageOrientationPatient", DS, Multiplicity::Exact(6)),
    entry!(FRAME_OF_REFERENCE_UID, "FrameOfReferenceUID", UI),
    entry!(LATERALITY, "Laterality", CS),
    entry!(POSITION_REFERENCE_INDICATOR, "PositionReferenceIndicator", LO),
    entry!(SLICE_LOCATION, "SliceLocation", DS),
    entry!(NUMBER_OF_STUDY_RELATED_SERIES, "NumberOfStudyRelatedSeries", IS),
    entry!(NUMBER_OF_STUDY_RELATED_INSTANCES, "NumberOfStudyRelatedInstances", IS),
    entry!(NUMBER_OF_SERIES_RELATED_INSTANCES, "NumberOfSeriesRelatedInstances", IS),

    entry!(SAMPLES_PER_PIXEL, "SamplesPerPixel", US),
    entry!(PHOTOMETRIC_INTERPRETATION, "PhotometricInterpretation", CS),
    entry!(PLANAR_CONFIGURATION, "PlanarConfiguration", US),
    entry!(NUMBER_OF_FRAMES, "NumberOfFrames", IS),
    entry!(ROWS, "Rows", US),
    entry!(COLUMNS, "Columns", US),
    entry!(PIXEL_SPACING, "PixelSpacing", DS, Multiplicity::Exact(2)),
    entry!(BITS_ALLOCATED, "BitsAllocated", US),
    entry!(BITS_STORED, "BitsStored", US),
    entry!(HIGH_BIT, "HighBit", US),
    entry!(PIXEL_REPRESENTATION, "PixelRepresentation", US),
    entry!(SMALLEST_IMAGE_PIXEL_VALUE, "SmallestImagePixelValue", US),
    entry!(LARGEST_IMAGE_PIXEL_VALUE, "LargestImagePixelValue", US),
    entry!(WINDOW_CENTER, "WindowCenter", DS, ONE_TO_N),
    entry!(WINDOW_WIDTH, "WindowWidth", DS, ONE_TO_N),
    entry!(RESCALE_INTERCEPT, "RescaleIntercept", DS),
    entry!(RESCALE_SLOPE, "RescaleSlope", DS),
    entry!(RESCALE_TYPE, "RescaleType", LO),
    entry!(LOSSY_IMAGE_COMPRESSION, "LossyImageCompression", CS),

    entry!(OVERLAY_ROWS, "OverlayRows", US),
    entry!(OVERLAY_COLUMNS, "OverlayColumns", US),
    entry!(OVERLAY_TYPE, "OverlayType", CS),
    entry!(OVERLAY_ORIGIN, "OverlayOrigin", SS, Multiplicity::Exact(2)),
    entry!(OVERLAY_BITS_ALLOCATED, "OverlayBitsAllocated", US),
    entry!(OVERLAY_BIT_POSITION, "OverlayBitPosition", US),
    entry!(OVERLAY_DATA, "OverlayData", OW),

    entry!(PIXEL_DATA, "PixelData", OW),
];

/// The tags whose entries repeat across a range of groups,
/// with the low byte of the group number masked to zero.
pub static REPEATING_GROUP_TAGS: &[Tag] = &[
    OVERLAY_ROWS,
    OVERLAY_COLUMNS,
    OVERLAY_TYPE,
    OVERLAY_ORIGIN,
    OVERLAY_BITS_ALLOCATED,
    OVERLAY_BIT_POSITION,
    OVERLAY_DATA,
];
