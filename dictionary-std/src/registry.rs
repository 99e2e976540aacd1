//! The standard dictionary registry: lazily indexed lookup
//! by tag, keyword and UID.

use crate::tags::{ENTRIES, REPEATING_GROUP_TAGS};
use crate::uids::UID_ENTRIES;
use dcmkit_core::dictionary::{
    AttributeDictionary, AttributeEntry, Multiplicity, UidDictionary, UidEntry,
};
use dcmkit_core::{Tag, VR};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

static REGISTRY: Lazy<Registry> = Lazy::new(Registry::build);

/// Retrieve the singleton instance of the indexed registry.
///
/// The unit types [`StandardAttributeDictionary`] and
/// [`StandardUidDictionary`] consult this automatically,
/// so calling this directly is rarely necessary.
#[inline]
pub fn registry() -> &'static Registry {
    &REGISTRY
}

/// The indexed form of the standard dictionary tables.
#[derive(Debug)]
pub struct Registry {
    by_tag: HashMap<Tag, &'static AttributeEntry<'static>>,
    by_keyword: HashMap<&'static str, &'static AttributeEntry<'static>>,
    repeating_groups: HashSet<Tag>,
    uid_by_value: HashMap<&'static str, &'static UidEntry<'static>>,
}

impl Registry {
    fn build() -> Registry {
        let mut by_tag = HashMap::with_capacity(ENTRIES.len());
        let mut by_keyword = HashMap::with_capacity(ENTRIES.len());
        for entry in ENTRIES {
            by_tag.insert(entry.tag, entry);
            by_keyword.insert(entry.keyword, entry);
        }
        let repeating_groups = REPEATING_GROUP_TAGS.iter().copied().collect();
        let uid_by_value = UID_ENTRIES.iter().map(|e| (e.uid, e)).collect();
        Registry {
            by_tag,
            by_keyword,
            repeating_groups,
            uid_by_value,
        }
    }

    fn attribute(&self, tag: Tag) -> Option<&'static AttributeEntry<'static>> {
        self.by_tag.get(&tag).copied().or_else(|| {
            // repeating groups index under the base group number
            let masked = Tag(tag.group() & 0xFF00, tag.element());
            if self.repeating_groups.contains(&masked) {
                self.by_tag.get(&masked).copied()
            } else {
                None
            }
        })
    }
}

/// A generic group length entry, synthesized for any tag
/// with element number 0x0000 absent from the table.
const GROUP_LENGTH_ENTRY: AttributeEntry<'static> = AttributeEntry {
    tag: Tag(0x0000, 0x0000),
    keyword: "GenericGroupLength",
    vr: VR::UL,
    vm: Multiplicity::ONE,
    retired: false,
};

/// A generic private creator entry, synthesized for reserved
/// elements (gggg,0010-00FF) in odd groups.
const PRIVATE_CREATOR_ENTRY: AttributeEntry<'static> = AttributeEntry {
    tag: Tag(0x0009, 0x0010),
    keyword: "PrivateCreator",
    vr: VR::LO,
    vm: Multiplicity::ONE,
    retired: false,
};

/// The standard attribute dictionary.
///
/// A unit type backed by a lazily initialized global index;
/// cheap to copy and safe to share across threads.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StandardAttributeDictionary;

impl AttributeDictionary for StandardAttributeDictionary {
    fn entry(&self, tag: Tag) -> Option<AttributeEntry<'_>> {
        registry()
            .attribute(tag)
            .copied()
            .or({
                if tag.is_private_creator() {
                    Some(PRIVATE_CREATOR_ENTRY)
                } else if tag.is_group_length() {
                    Some(GROUP_LENGTH_ENTRY)
                } else {
                    None
                }
            })
    }

    fn entry_by_keyword(&self, keyword: &str) -> Option<AttributeEntry<'_>> {
        registry().by_keyword.get(keyword).copied().copied()
    }
}

/// The standard UID registry.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StandardUidDictionary;

impl UidDictionary for StandardUidDictionary {
    fn entry(&self, uid: &str) -> Option<UidEntry<'_>> {
        registry()
            .uid_by_value
            .get(dcmkit_core::trim_uid(uid))
            .copied()
            .copied()
    }
}
