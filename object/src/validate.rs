//! Conformance validation of data set objects.
//!
//! The validator checks a body data set (and optionally its file
//! meta group) against a configurable level of requirements and
//! reports its findings as a structured result. Validation never
//! fails the call itself.

use crate::mem::InMemObject;
use crate::meta::FileMetaTable;
use dcmkit_core::dictionary::UidDictionary;
use dcmkit_core::header::Header;
use dcmkit_core::{is_valid_uid, is_valid_uid_tolerant, Tag};
use dcmkit_dictionary_std::{tags, StandardUidDictionary};
use dcmkit_encoding::transfer_syntax::TransferSyntaxRegistry;
use std::collections::BTreeSet;
use std::fmt;

/// How demanding the validation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ValidationLevel {
    /// Requires the SOP class and SOP instance UIDs,
    /// present, non-empty and well-formed.
    Minimal,
    /// Additionally requires study, series and instance
    /// identifiers and the modality.
    #[default]
    Standard,
    /// Additionally requires a recognized storage SOP class,
    /// a known transfer syntax, and complete, consistent
    /// pixel description attributes.
    Strict,
}

/// Validator configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationOptions {
    /// The validation level to apply.
    pub level: ValidationLevel,
    /// Report warnings as errors.
    pub treat_warnings_as_errors: bool,
    /// When non-empty, the SOP class UID must be in this set.
    pub allowed_sop_classes: BTreeSet<String>,
    /// Tags which must be present and non-empty
    /// in addition to the level's own requirements.
    pub additional_required_tags: BTreeSet<Tag>,
}

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Issue {
    /// A required attribute is absent.
    MissingRequiredAttribute { tag: Tag },
    /// A required attribute is present but empty.
    EmptyValue { tag: Tag },
    /// A value exceeds the maximum length of its VR.
    ValueTooLong { tag: Tag, actual: u32, max: u32 },
    /// A UID value does not match the UID grammar.
    InvalidUid { tag: Tag, uid: String },
    /// The SOP class is not a recognized storage class,
    /// or it is outside the configured allow list.
    UnknownSopClass { uid: String },
    /// The transfer syntax UID is not known.
    UnknownTransferSyntax { uid: String },
    /// Pixel data is present but its description is incomplete.
    IncompletePixelData { missing: Vec<Tag> },
    /// Pixel description attributes contradict each other.
    InconsistentPixelData { reason: String },
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Issue::MissingRequiredAttribute { tag } => {
                write!(f, "missing required attribute {}", tag)
            }
            Issue::EmptyValue { tag } => write!(f, "attribute {} has an empty value", tag),
            Issue::ValueTooLong { tag, actual, max } => {
                write!(f, "attribute {} has {} bytes, maximum is {}", tag, actual, max)
            }
            Issue::InvalidUid { tag, uid } => {
                write!(f, "attribute {} holds an invalid UID `{}`", tag, uid)
            }
            Issue::UnknownSopClass { uid } => write!(f, "unknown SOP class `{}`", uid),
            Issue::UnknownTransferSyntax { uid } => {
                write!(f, "unknown transfer syntax `{}`", uid)
            }
            Issue::IncompletePixelData { missing } => {
                write!(f, "pixel data is missing descriptors: ")?;
                for (i, tag) in missing.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", tag)?;
                }
                Ok(())
            }
            Issue::InconsistentPixelData { reason } => {
                write!(f, "inconsistent pixel description: {}", reason)
            }
        }
    }
}

/// The structured outcome of a validation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    /// Findings which make the object non-conformant.
    pub errors: Vec<Issue>,
    /// Findings worth surfacing which do not fail validation.
    pub warnings: Vec<Issue>,
}

impl ValidationReport {
    /// Whether the object passed validation.
    pub fn valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A configurable conformance checker for data set objects.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    options: ValidationOptions,
}

impl Validator {
    /// Create a validator with the given options.
    pub fn new(options: ValidationOptions) -> Self {
        Validator { options }
    }

    /// Validate a body data set, optionally with its file meta
    /// group for transfer syntax checks.
    pub fn validate(&self, obj: &InMemObject, meta: Option<&FileMetaTable>) -> ValidationReport {
        let mut report = ValidationReport::default();

        self.check_uid_attribute(obj, tags::SOP_CLASS_UID, &mut report);
        self.check_uid_attribute(obj, tags::SOP_INSTANCE_UID, &mut report);

        if self.options.level >= ValidationLevel::Standard {
            self.check_uid_attribute(obj, tags::STUDY_INSTANCE_UID, &mut report);
            self.check_uid_attribute(obj, tags::SERIES_INSTANCE_UID, &mut report);
            self.check_present_non_empty(obj, tags::MODALITY, &mut report);
            if obj.string_value(tags::PATIENT_ID).map_or(true, |v| v.is_empty()) {
                report.warnings.push(Issue::MissingRequiredAttribute {
                    tag: tags::PATIENT_ID,
                });
            }
            self.check_value_lengths(obj, &mut report);
        }

        if self.options.level >= ValidationLevel::Strict {
            self.check_sop_class(obj, &mut report);
            if let Some(meta) = meta {
                let ts = meta.transfer_syntax();
                if !ts.is_empty() && !TransferSyntaxRegistry.contains(ts) {
                    report.errors.push(Issue::UnknownTransferSyntax {
                        uid: ts.to_string(),
                    });
                }
            }
            self.check_pixel_data(obj, &mut report);
        }

        if !self.options.allowed_sop_classes.is_empty() {
            if let Some(sop_class) = obj.string_value(tags::SOP_CLASS_UID) {
                if !self.options.allowed_sop_classes.contains(&sop_class) {
                    report.errors.push(Issue::UnknownSopClass { uid: sop_class });
                }
            }
        }

        for &tag in &self.options.additional_required_tags {
            self.check_present_non_empty(obj, tag, &mut report);
        }

        if self.options.treat_warnings_as_errors {
            report.errors.append(&mut report.warnings);
        }
        report
    }

    fn check_present_non_empty(
        &self,
        obj: &InMemObject,
        tag: Tag,
        report: &mut ValidationReport,
    ) {
        match obj.get(tag) {
            None => report
                .errors
                .push(Issue::MissingRequiredAttribute { tag }),
            Some(elem) if elem.value().multiplicity() == 0 => {
                report.errors.push(Issue::EmptyValue { tag })
            }
            Some(_) => {}
        }
    }

    fn check_uid_attribute(&self, obj: &InMemObject, tag: Tag, report: &mut ValidationReport) {
        let value = match obj.string_value(tag) {
            None => {
                report.errors.push(Issue::MissingRequiredAttribute { tag });
                return;
            }
            Some(v) if v.is_empty() => {
                report.errors.push(Issue::EmptyValue { tag });
                return;
            }
            Some(v) => v,
        };
        if !is_valid_uid(&value) {
            // zero-padded components are tolerated as a warning,
            // anything else is an error
            if is_valid_uid_tolerant(&value) && self.options.level < ValidationLevel::Strict {
                report.warnings.push(Issue::InvalidUid { tag, uid: value });
            } else {
                report.errors.push(Issue::InvalidUid { tag, uid: value });
            }
        }
    }

    fn check_sop_class(&self, obj: &InMemObject, report: &mut ValidationReport) {
        if let Some(sop_class) = obj.string_value(tags::SOP_CLASS_UID) {
            if !StandardUidDictionary.is_storage_class(&sop_class) {
                report.errors.push(Issue::UnknownSopClass { uid: sop_class });
            }
        }
    }

    fn check_value_lengths(&self, obj: &InMemObject, report: &mut ValidationReport) {
        for elem in obj.iter() {
            if let Some(max) = elem.vr().max_length() {
                if let Ok(text) = elem.value().to_str() {
                    // per-value check for multi-valued attributes
                    let longest = text.split('\\').map(|v| v.len()).max().unwrap_or(0) as u32;
                    if longest > max {
                        report.warnings.push(Issue::ValueTooLong {
                            tag: elem.tag(),
                            actual: longest,
                            max,
                        });
                    }
                }
            }
        }
    }

    fn check_pixel_data(&self, obj: &InMemObject, report: &mut ValidationReport) {
        if obj.get(tags::PIXEL_DATA).is_none() {
            return;
        }
        let descriptors = [
            tags::ROWS,
            tags::COLUMNS,
            tags::BITS_ALLOCATED,
            tags::BITS_STORED,
            tags::HIGH_BIT,
            tags::PIXEL_REPRESENTATION,
            tags::SAMPLES_PER_PIXEL,
            tags::PHOTOMETRIC_INTERPRETATION,
        ];
        let missing: Vec<Tag> = descriptors
            .iter()
            .copied()
            .filter(|&tag| obj.get(tag).is_none())
            .collect();
        if !missing.is_empty() {
            report.errors.push(Issue::IncompletePixelData { missing });
            return;
        }

        let int_of = |tag: Tag| -> Option<u32> {
            obj.get(tag).and_then(|e| e.value().to_int::<u32>().ok())
        };
        if let (Some(allocated), Some(stored), Some(high_bit)) = (
            int_of(tags::BITS_ALLOCATED),
            int_of(tags::BITS_STORED),
            int_of(tags::HIGH_BIT),
        ) {
            if stored > allocated {
                report.errors.push(Issue::InconsistentPixelData {
                    reason: format!("bits stored {} exceeds bits allocated {}", stored, allocated),
                });
            }
            if high_bit + 1 != stored {
                report.warnings.push(Issue::InconsistentPixelData {
                    reason: format!("high bit {} does not match bits stored {}", high_bit, stored),
                });
            }
        }
        if let Some(samples) = int_of(tags::SAMPLES_PER_PIXEL) {
            if samples != 1 && samples != 3 {
                report.errors.push(Issue::InconsistentPixelData {
                    reason: format!("samples per pixel {} is not 1 or 3", samples),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::element;
    use dcmkit_dictionary_std::uids;

    fn minimal_object() -> InMemObject {
        let mut obj = InMemObject::new_empty();
        obj.put(element(tags::SOP_CLASS_UID, uids::CT_IMAGE_STORAGE));
        obj.put(element(tags::SOP_INSTANCE_UID, "1.2.3.4.5"));
        obj
    }

    fn standard_object() -> InMemObject {
        let mut obj = minimal_object();
        obj.put(element(tags::STUDY_INSTANCE_UID, "1.2.3.4"));
        obj.put(element(tags::SERIES_INSTANCE_UID, "1.2.3.4.1"));
        obj.put(element(tags::MODALITY, "CT"));
        obj.put(element(tags::PATIENT_ID, "P123"));
        obj
    }

    fn validator(level: ValidationLevel) -> Validator {
        Validator::new(ValidationOptions {
            level,
            ..Default::default()
        })
    }

    #[test]
    fn minimal_level_passes_and_fails() {
        let report = validator(ValidationLevel::Minimal).validate(&minimal_object(), None);
        assert!(report.valid(), "{:?}", report);

        let mut obj = minimal_object();
        obj.remove(tags::SOP_INSTANCE_UID);
        let report = validator(ValidationLevel::Minimal).validate(&obj, None);
        assert_eq!(
            report.errors,
            vec![Issue::MissingRequiredAttribute {
                tag: tags::SOP_INSTANCE_UID
            }]
        );
    }

    #[test]
    fn malformed_uid_is_detected() {
        let mut obj = minimal_object();
        obj.put(element(tags::SOP_INSTANCE_UID, "1..2"));
        let report = validator(ValidationLevel::Minimal).validate(&obj, None);
        assert!(matches!(
            report.errors[0],
            Issue::InvalidUid {
                tag: Tag(0x0008, 0x0018),
                ..
            }
        ));
    }

    #[test]
    fn standard_level_warns_on_missing_patient_id() {
        let mut obj = standard_object();
        obj.remove(tags::PATIENT_ID);
        let report = validator(ValidationLevel::Standard).validate(&obj, None);
        assert!(report.valid());
        assert_eq!(
            report.warnings,
            vec![Issue::MissingRequiredAttribute {
                tag: tags::PATIENT_ID
            }]
        );

        // warnings become errors on demand
        let strict_warnings = Validator::new(ValidationOptions {
            level: ValidationLevel::Standard,
            treat_warnings_as_errors: true,
            ..Default::default()
        });
        let report = strict_warnings.validate(&obj, None);
        assert!(!report.valid());
    }

    #[test]
    fn strict_level_checks_pixel_completeness() {
        let mut obj = standard_object();
        obj.put(element(tags::PIXEL_DATA, vec![0u8, 0]));
        let report = validator(ValidationLevel::Strict).validate(&obj, None);
        assert!(matches!(
            &report.errors[0],
            Issue::IncompletePixelData { missing } if missing.len() == 8
        ));

        obj.put(element(tags::ROWS, 1u16));
        obj.put(element(tags::COLUMNS, 1u16));
        obj.put(element(tags::BITS_ALLOCATED, 16u16));
        obj.put(element(tags::BITS_STORED, 12u16));
        obj.put(element(tags::HIGH_BIT, 11u16));
        obj.put(element(tags::PIXEL_REPRESENTATION, 0u16));
        obj.put(element(tags::SAMPLES_PER_PIXEL, 1u16));
        obj.put(element(tags::PHOTOMETRIC_INTERPRETATION, "MONOCHROME2"));
        let report = validator(ValidationLevel::Strict).validate(&obj, None);
        assert!(report.valid(), "{:?}", report);

        // inconsistency: bits stored above bits allocated
        obj.put(element(tags::BITS_STORED, 17u16));
        let report = validator(ValidationLevel::Strict).validate(&obj, None);
        assert!(!report.valid());
    }

    #[test]
    fn strict_level_rejects_non_storage_sop_class() {
        let mut obj = standard_object();
        obj.put(element(tags::SOP_CLASS_UID, uids::VERIFICATION));
        let report = validator(ValidationLevel::Strict).validate(&obj, None);
        assert!(report
            .errors
            .iter()
            .any(|i| matches!(i, Issue::UnknownSopClass { .. })));
    }

    #[test]
    fn sop_class_allow_list() {
        let mut allowed = BTreeSet::new();
        allowed.insert(uids::MR_IMAGE_STORAGE.to_string());
        let validator = Validator::new(ValidationOptions {
            level: ValidationLevel::Minimal,
            allowed_sop_classes: allowed,
            ..Default::default()
        });
        let report = validator.validate(&minimal_object(), None);
        assert!(report
            .errors
            .iter()
            .any(|i| matches!(i, Issue::UnknownSopClass { .. })));
    }

    #[test]
    fn additional_required_tags() {
        let mut required = BTreeSet::new();
        required.insert(tags::ACCESSION_NUMBER);
        let validator = Validator::new(ValidationOptions {
            level: ValidationLevel::Minimal,
            additional_required_tags: required,
            ..Default::default()
        });
        let report = validator.validate(&minimal_object(), None);
        assert_eq!(
            report.errors,
            vec![Issue::MissingRequiredAttribute {
                tag: tags::ACCESSION_NUMBER
            }]
        );
    }
}
