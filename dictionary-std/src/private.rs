//! Private attribute dictionaries, registered at run time
//! and keyed by the private creator string.
//!
//! Registration is add-only. Lookups take a shared lock and
//! never block each other; writers are serialized.

use dcmkit_core::dictionary::Multiplicity;
use dcmkit_core::{Tag, VR};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::RwLock;

/// An entry of a private dictionary, with full ownership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateEntry {
    /// The attribute tag, with the element's high byte zeroed
    /// (the creator block offset is resolved at look-up time).
    pub tag: Tag,
    /// The attribute keyword.
    pub keyword: String,
    /// The attribute's value representation.
    pub vr: VR,
    /// The attribute's value multiplicity.
    pub vm: Multiplicity,
}

static OVERLAY: Lazy<RwLock<HashMap<String, HashMap<Tag, PrivateEntry>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Normalize a private element tag so that entries registered
/// against block offset 0x00 match any reserved block:
/// `(gggg,xxee)` becomes `(gggg,00ee)`.
fn normalize(tag: Tag) -> Tag {
    Tag(tag.group(), tag.element() & 0x00FF)
}

/// Register the entries of a private dictionary under the given
/// creator identifier. Later registrations for the same creator
/// add to (and may shadow) earlier ones.
pub fn register_private_dictionary<I>(creator: &str, entries: I)
where
    I: IntoIterator<Item = PrivateEntry>,
{
    let mut overlay = OVERLAY.write().expect("private dictionary lock poisoned");
    let table = overlay.entry(creator.trim().to_string()).or_default();
    for entry in entries {
        table.insert(normalize(entry.tag), entry);
    }
}

/// Look up a private attribute by creator identifier and tag.
///
/// The element's block offset is masked out, so the entry matches
/// whichever block the creator was assigned in the data set.
pub fn private_entry(creator: &str, tag: Tag) -> Option<PrivateEntry> {
    let overlay = OVERLAY.read().expect("private dictionary lock poisoned");
    overlay
        .get(creator.trim())
        .and_then(|table| table.get(&normalize(tag)))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_resolve() {
        register_private_dictionary(
            "ACME 1.0",
            vec![PrivateEntry {
                tag: Tag(0x0029, 0x0002),
                keyword: "AcmeCalibrationState".to_string(),
                vr: VR::CS,
                vm: Multiplicity::ONE,
            }],
        );

        // matches regardless of the assigned block
        let entry = private_entry("ACME 1.0", Tag(0x0029, 0x1002)).unwrap();
        assert_eq!(entry.keyword, "AcmeCalibrationState");
        let entry = private_entry("ACME 1.0", Tag(0x0029, 0x4002)).unwrap();
        assert_eq!(entry.vr, VR::CS);

        assert!(private_entry("ACME 1.0", Tag(0x0029, 0x1003)).is_none());
        assert!(private_entry("OTHER", Tag(0x0029, 0x1002)).is_none());
    }

    #[test]
    fn creator_string_is_trimmed() {
        register_private_dictionary(
            "VENDOR X ",
            vec![PrivateEntry {
                tag: Tag(0x0031, 0x0001),
                keyword: "VendorXMode".to_string(),
                vr: VR::LO,
                vm: Multiplicity::ONE,
            }],
        );
        assert!(private_entry("VENDOR X", Tag(0x0031, 0x2001)).is_some());
    }
}
