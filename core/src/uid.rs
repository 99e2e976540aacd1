//! Unique identifier (UID) grammar checks.
//!
//! A conforming UID is a non-empty dot-separated list of numeric
//! components with a total length of up to 64 characters.
//! Components must not have leading zeros, except for the single
//! digit `0` itself.

use snafu::Snafu;

/// The reason a string failed UID validation.
#[derive(Debug, Snafu, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum InvalidUid {
    /// the UID is empty
    Empty,

    /// the UID exceeds 64 characters
    #[snafu(display("UID has {} characters, maximum is 64", len))]
    TooLong { len: usize },

    /// a component is empty
    #[snafu(display("empty component at position {}", index))]
    EmptyComponent { index: usize },

    /// a component contains a non-digit character
    #[snafu(display("component `{}` is not numeric", component))]
    NotNumeric { component: String },

    /// a multi-digit component starts with zero
    #[snafu(display("component `{}` has a leading zero", component))]
    LeadingZero { component: String },
}

/// Validate a string against the UID grammar.
///
/// Trailing null padding is not accepted here; strip it beforehand
/// (see [`trim_uid`]).
pub fn validate_uid(uid: &str) -> Result<(), InvalidUid> {
    if uid.is_empty() {
        return Err(InvalidUid::Empty);
    }
    if uid.len() > 64 {
        return Err(InvalidUid::TooLong { len: uid.len() });
    }
    for (index, component) in uid.split('.').enumerate() {
        if component.is_empty() {
            return Err(InvalidUid::EmptyComponent { index });
        }
        if !component.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidUid::NotNumeric {
                component: component.to_string(),
            });
        }
        if component.len() > 1 && component.starts_with('0') {
            return Err(InvalidUid::LeadingZero {
                component: component.to_string(),
            });
        }
    }
    Ok(())
}

/// Whether the string matches the UID grammar.
#[inline]
pub fn is_valid_uid(uid: &str) -> bool {
    validate_uid(uid).is_ok()
}

/// Whether the string matches the UID grammar when leading zeros
/// are tolerated. Some archives emit UIDs with zero-padded
/// components; tolerant readers accept them.
pub fn is_valid_uid_tolerant(uid: &str) -> bool {
    match validate_uid(uid) {
        Ok(()) => true,
        Err(InvalidUid::LeadingZero { .. }) => true,
        Err(_) => false,
    }
}

/// Trim trailing whitespace and null padding from a UID value.
pub fn trim_uid(uid: &str) -> &str {
    uid.trim_end_matches(|c: char| c.is_whitespace() || c == '\0')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_conforming_uids() {
        assert!(is_valid_uid("1.2.3.4"));
        assert!(is_valid_uid("0"));
        assert!(is_valid_uid("1.2.840.10008.1.2.1"));
        assert!(is_valid_uid("1.0.2"));
    }

    #[test]
    fn rejects_malformed_uids() {
        assert_eq!(validate_uid(""), Err(InvalidUid::Empty));
        assert!(matches!(
            validate_uid("1.2.3.4."),
            Err(InvalidUid::EmptyComponent { index: 4 })
        ));
        assert!(matches!(
            validate_uid("1..2"),
            Err(InvalidUid::EmptyComponent { index: 1 })
        ));
        assert!(matches!(
            validate_uid("1.02"),
            Err(InvalidUid::LeadingZero { .. })
        ));
        assert!(matches!(
            validate_uid("1.2.a"),
            Err(InvalidUid::NotNumeric { .. })
        ));
        let too_long = "1.".repeat(32) + "5";
        assert_eq!(too_long.len(), 65);
        assert!(matches!(
            validate_uid(&too_long),
            Err(InvalidUid::TooLong { len: 65 })
        ));
    }

    #[test]
    fn tolerant_mode_admits_leading_zeros_only() {
        assert!(is_valid_uid_tolerant("1.02.3"));
        assert!(!is_valid_uid_tolerant("1..2"));
        assert!(!is_valid_uid_tolerant("1.2.x"));
    }

    #[test]
    fn trims_padding() {
        assert_eq!(trim_uid("1.2.840.10008.1.2\0"), "1.2.840.10008.1.2");
        assert_eq!(trim_uid("1.2.840.10008.1.2 "), "1.2.840.10008.1.2");
    }
}
