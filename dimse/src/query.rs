//! Query/retrieve information models, identifier data sets
//! and matching key classification.

use dcmkit_core::{Header, Tag, VR};
use dcmkit_dictionary_std::{tags, uids};
use dcmkit_object::InMemObject;
use snafu::{OptionExt, Snafu};

/// An error when interpreting a query identifier.
#[derive(Debug, Snafu, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// the identifier has no query retrieve level element
    MissingLevel,

    #[snafu(display("unknown query retrieve level `{}`", level))]
    UnknownLevel { level: String },

    #[snafu(display("level {:?} is not supported by the {:?} model", level, model))]
    UnsupportedLevel {
        level: QueryRetrieveLevel,
        model: InformationModel,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The level of a query retrieve identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryRetrieveLevel {
    Patient,
    Study,
    Series,
    Image,
}

impl QueryRetrieveLevel {
    /// Interpret the code string of the query retrieve level
    /// element.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim_end_matches([' ', '\0']) {
            "PATIENT" => Some(QueryRetrieveLevel::Patient),
            "STUDY" => Some(QueryRetrieveLevel::Study),
            "SERIES" => Some(QueryRetrieveLevel::Series),
            "IMAGE" => Some(QueryRetrieveLevel::Image),
            _ => None,
        }
    }

    /// The code string of this level.
    pub fn code(self) -> &'static str {
        match self {
            QueryRetrieveLevel::Patient => "PATIENT",
            QueryRetrieveLevel::Study => "STUDY",
            QueryRetrieveLevel::Series => "SERIES",
            QueryRetrieveLevel::Image => "IMAGE",
        }
    }
}

/// The three query/retrieve information models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InformationModel {
    /// Patient Root: patient, study, series and image levels.
    PatientRoot,
    /// Study Root: study, series and image levels.
    StudyRoot,
    /// Patient/Study Only: patient and study levels.
    PatientStudyOnly,
}

impl InformationModel {
    /// The levels this model admits.
    pub fn supported_levels(&self) -> &'static [QueryRetrieveLevel] {
        use QueryRetrieveLevel::*;
        match self {
            InformationModel::PatientRoot => &[Patient, Study, Series, Image],
            InformationModel::StudyRoot => &[Study, Series, Image],
            InformationModel::PatientStudyOnly => &[Patient, Study],
        }
    }

    /// The SOP class UID of this model's C-FIND service.
    pub fn find_sop_class_uid(&self) -> &'static str {
        match self {
            InformationModel::PatientRoot => {
                uids::PATIENT_ROOT_QUERY_RETRIEVE_INFORMATION_MODEL_FIND
            }
            InformationModel::StudyRoot => uids::STUDY_ROOT_QUERY_RETRIEVE_INFORMATION_MODEL_FIND,
            InformationModel::PatientStudyOnly => {
                uids::PATIENT_STUDY_ONLY_QUERY_RETRIEVE_INFORMATION_MODEL_FIND
            }
        }
    }

    /// The SOP class UID of this model's C-MOVE service.
    pub fn move_sop_class_uid(&self) -> &'static str {
        match self {
            InformationModel::PatientRoot => {
                uids::PATIENT_ROOT_QUERY_RETRIEVE_INFORMATION_MODEL_MOVE
            }
            InformationModel::StudyRoot => uids::STUDY_ROOT_QUERY_RETRIEVE_INFORMATION_MODEL_MOVE,
            InformationModel::PatientStudyOnly => {
                uids::PATIENT_STUDY_ONLY_QUERY_RETRIEVE_INFORMATION_MODEL_MOVE
            }
        }
    }

    /// The SOP class UID of this model's C-GET service.
    pub fn get_sop_class_uid(&self) -> &'static str {
        match self {
            InformationModel::PatientRoot => {
                uids::PATIENT_ROOT_QUERY_RETRIEVE_INFORMATION_MODEL_GET
            }
            InformationModel::StudyRoot => uids::STUDY_ROOT_QUERY_RETRIEVE_INFORMATION_MODEL_GET,
            InformationModel::PatientStudyOnly => {
                uids::PATIENT_STUDY_ONLY_QUERY_RETRIEVE_INFORMATION_MODEL_GET
            }
        }
    }

    /// Recognize the model a find/move/get SOP class belongs to.
    pub fn from_sop_class_uid(uid: &str) -> Option<Self> {
        let uid = uid.trim_end_matches([' ', '\0']);
        match uid {
            _ if uid == uids::PATIENT_ROOT_QUERY_RETRIEVE_INFORMATION_MODEL_FIND
                || uid == uids::PATIENT_ROOT_QUERY_RETRIEVE_INFORMATION_MODEL_MOVE
                || uid == uids::PATIENT_ROOT_QUERY_RETRIEVE_INFORMATION_MODEL_GET =>
            {
                Some(InformationModel::PatientRoot)
            }
            _ if uid == uids::STUDY_ROOT_QUERY_RETRIEVE_INFORMATION_MODEL_FIND
                || uid == uids::STUDY_ROOT_QUERY_RETRIEVE_INFORMATION_MODEL_MOVE
                || uid == uids::STUDY_ROOT_QUERY_RETRIEVE_INFORMATION_MODEL_GET =>
            {
                Some(InformationModel::StudyRoot)
            }
            _ if uid == uids::PATIENT_STUDY_ONLY_QUERY_RETRIEVE_INFORMATION_MODEL_FIND
                || uid == uids::PATIENT_STUDY_ONLY_QUERY_RETRIEVE_INFORMATION_MODEL_MOVE
                || uid == uids::PATIENT_STUDY_ONLY_QUERY_RETRIEVE_INFORMATION_MODEL_GET =>
            {
                Some(InformationModel::PatientStudyOnly)
            }
            _ => None,
        }
    }

    /// Extract and check the level of an identifier data set
    /// against this model.
    pub fn level_of(&self, identifier: &InMemObject) -> Result<QueryRetrieveLevel> {
        let code = identifier
            .string_value(tags::QUERY_RETRIEVE_LEVEL)
            .context(MissingLevelSnafu)?;
        let level =
            QueryRetrieveLevel::from_code(&code).context(UnknownLevelSnafu { level: code })?;
        if !self.supported_levels().contains(&level) {
            return UnsupportedLevelSnafu {
                level,
                model: *self,
            }
            .fail();
        }
        Ok(level)
    }
}

/// The kind of matching a key value requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchingKind {
    /// An empty value: every entity matches, and the attribute is
    /// requested in the result (a return key).
    Universal,
    /// An exact value.
    SingleValue,
    /// A textual pattern with `*` or `?`.
    Wildcard,
    /// A `lo-hi` range of a date/time attribute.
    Range,
    /// A `\`-separated list of admissible values.
    List,
    /// A sequence item with nested keys, one level deep.
    Sequence,
}

/// Classify the matching kind an identifier element requests.
pub fn matching_kind(vr: VR, value_text: &str) -> MatchingKind {
    if vr == VR::SQ {
        return MatchingKind::Sequence;
    }
    let value = value_text.trim_end_matches([' ', '\0']);
    if value.is_empty() {
        return MatchingKind::Universal;
    }
    if value.contains('\\') {
        return MatchingKind::List;
    }
    if matches!(vr, VR::DA | VR::TM | VR::DT) && value.contains('-') {
        return MatchingKind::Range;
    }
    if vr.is_textual() && (value.contains('*') || value.contains('?')) {
        return MatchingKind::Wildcard;
    }
    MatchingKind::SingleValue
}

/// Classify every key of an identifier data set, in tag order.
pub fn classify_keys(identifier: &InMemObject) -> Vec<(Tag, MatchingKind)> {
    identifier
        .iter()
        .filter(|e| e.tag() != tags::QUERY_RETRIEVE_LEVEL)
        .map(|e| {
            let text = e.value().to_str().unwrap_or_default();
            (e.tag(), matching_kind(e.vr(), &text))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcmkit_object::element;

    #[test]
    fn model_level_support() {
        use InformationModel::*;
        use QueryRetrieveLevel::*;
        assert!(PatientRoot.supported_levels().contains(&Patient));
        assert!(!StudyRoot.supported_levels().contains(&Patient));
        assert!(StudyRoot.supported_levels().contains(&Image));
        assert!(!PatientStudyOnly.supported_levels().contains(&Series));
    }

    #[test]
    fn identifier_level_checking() {
        let mut identifier = InMemObject::new_empty();
        assert_eq!(
            InformationModel::StudyRoot.level_of(&identifier),
            Err(Error::MissingLevel)
        );

        identifier.put(element(tags::QUERY_RETRIEVE_LEVEL, "STUDY"));
        assert_eq!(
            InformationModel::StudyRoot.level_of(&identifier),
            Ok(QueryRetrieveLevel::Study)
        );

        identifier.put(element(tags::QUERY_RETRIEVE_LEVEL, "PATIENT"));
        assert!(matches!(
            InformationModel::StudyRoot.level_of(&identifier),
            Err(Error::UnsupportedLevel {
                level: QueryRetrieveLevel::Patient,
                model: InformationModel::StudyRoot,
            })
        ));

        identifier.put(element(tags::QUERY_RETRIEVE_LEVEL, "VOLUME"));
        assert!(matches!(
            InformationModel::StudyRoot.level_of(&identifier),
            Err(Error::UnknownLevel { .. })
        ));
    }

    #[test]
    fn matching_kind_classification() {
        assert_eq!(matching_kind(VR::PN, ""), MatchingKind::Universal);
        assert_eq!(matching_kind(VR::PN, "DOE^JOHN"), MatchingKind::SingleValue);
        assert_eq!(matching_kind(VR::PN, "DOE^*"), MatchingKind::Wildcard);
        assert_eq!(matching_kind(VR::PN, "DOE^J?HN"), MatchingKind::Wildcard);
        assert_eq!(
            matching_kind(VR::DA, "19980101-19981231"),
            MatchingKind::Range
        );
        assert_eq!(matching_kind(VR::TM, "1000-1200"), MatchingKind::Range);
        assert_eq!(matching_kind(VR::CS, "CT\\MR"), MatchingKind::List);
        assert_eq!(matching_kind(VR::SQ, ""), MatchingKind::Sequence);
        // a dash in a non-temporal VR is an ordinary character
        assert_eq!(matching_kind(VR::LO, "A-B"), MatchingKind::SingleValue);
    }

    #[test]
    fn key_classification_skips_the_level() {
        let mut identifier = InMemObject::new_empty();
        identifier.put(element(tags::QUERY_RETRIEVE_LEVEL, "STUDY"));
        identifier.put(element(tags::PATIENT_NAME, "DOE^*"));
        identifier.put(element(tags::STUDY_INSTANCE_UID, ""));
        let keys = classify_keys(&identifier);
        assert_eq!(
            keys,
            vec![
                (tags::PATIENT_NAME, MatchingKind::Wildcard),
                (tags::STUDY_INSTANCE_UID, MatchingKind::Universal),
            ]
        );
    }
}
