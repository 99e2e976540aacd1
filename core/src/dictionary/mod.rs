//! The concept of attribute and UID dictionaries.
//!
//! The traits here have no generic method parameters
//! so that they can be used as trait objects.

pub mod stub;

use crate::header::{Tag, VR};
use std::fmt::Debug;
use std::str::FromStr;

/// The value multiplicity of an attribute,
/// as declared by the standard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Multiplicity {
    /// Exactly `n` values.
    Exact(u32),
    /// Between `min` and `max` values.
    Range(u32, u32),
    /// `n` or more values.
    AtLeast(u32),
}

impl Multiplicity {
    /// A single value (`1`).
    pub const ONE: Multiplicity = Multiplicity::Exact(1);

    /// Whether the given number of values satisfies this multiplicity.
    pub fn admits(&self, count: u32) -> bool {
        match *self {
            Multiplicity::Exact(n) => count == n,
            Multiplicity::Range(min, max) => (min..=max).contains(&count),
            Multiplicity::AtLeast(min) => count >= min,
        }
    }
}

/// An entry of the attribute dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeEntry<'a> {
    /// The attribute tag.
    pub tag: Tag,
    /// The attribute keyword, in UpperCamelCase without spaces.
    pub keyword: &'a str,
    /// The attribute's default value representation.
    pub vr: VR,
    /// The attribute's value multiplicity.
    pub vm: Multiplicity,
    /// Whether the attribute is retired from the standard.
    pub retired: bool,
}

/// Type trait for a dictionary of DICOM attributes,
/// mapping tags and keywords to entries.
pub trait AttributeDictionary: Debug {
    /// Fetch an entry by its tag.
    fn entry(&self, tag: Tag) -> Option<AttributeEntry<'_>>;

    /// Fetch an entry by its keyword
    /// (e.g. `"PatientName"` or `"SOPInstanceUID"`).
    fn entry_by_keyword(&self, keyword: &str) -> Option<AttributeEntry<'_>>;

    /// The default value representation for the given tag,
    /// or `UN` when the tag is unknown.
    fn vr_of(&self, tag: Tag) -> VR {
        self.entry(tag).map(|e| e.vr).unwrap_or(VR::UN)
    }
}

impl<'a, T: ?Sized> AttributeDictionary for &'a T
where
    T: AttributeDictionary,
{
    fn entry(&self, tag: Tag) -> Option<AttributeEntry<'_>> {
        (**self).entry(tag)
    }

    fn entry_by_keyword(&self, keyword: &str) -> Option<AttributeEntry<'_>> {
        (**self).entry_by_keyword(keyword)
    }
}

/// The kind of object a standardized UID names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum UidKind {
    /// A transfer syntax.
    TransferSyntax,
    /// A service-object pair class.
    SopClass,
    /// A well-known service-object pair instance.
    SopInstance,
    /// A meta SOP class grouping several SOP classes.
    MetaSopClass,
}

impl FromStr for UidKind {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TransferSyntax" => Ok(UidKind::TransferSyntax),
            "SopClass" => Ok(UidKind::SopClass),
            "SopInstance" => Ok(UidKind::SopInstance),
            "MetaSopClass" => Ok(UidKind::MetaSopClass),
            _ => Err("no such UID kind"),
        }
    }
}

/// An entry of the UID registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UidEntry<'a> {
    /// The unique identifier.
    pub uid: &'a str,
    /// The keyword, in UpperCamelCase without spaces.
    pub keyword: &'a str,
    /// What kind of object the UID names.
    pub kind: UidKind,
}

/// Type trait for a registry of standardized unique identifiers.
pub trait UidDictionary: Debug {
    /// Fetch an entry by UID value.
    fn entry(&self, uid: &str) -> Option<UidEntry<'_>>;

    /// Whether the UID names a known storage SOP class.
    fn is_storage_class(&self, uid: &str) -> bool {
        self.entry(uid)
            .map(|e| e.kind == UidKind::SopClass && e.keyword.ends_with("Storage"))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiplicity_admission() {
        assert!(Multiplicity::ONE.admits(1));
        assert!(!Multiplicity::ONE.admits(2));
        assert!(Multiplicity::Range(2, 4).admits(3));
        assert!(!Multiplicity::Range(2, 4).admits(5));
        assert!(Multiplicity::AtLeast(1).admits(100));
        assert!(!Multiplicity::AtLeast(1).admits(0));
    }
}
