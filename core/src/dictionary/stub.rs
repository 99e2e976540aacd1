//! A stub dictionary which knows nothing.
//! Useful in tests and in contexts where dictionary
//! consultation should be a no-op.

use super::{AttributeDictionary, AttributeEntry, UidDictionary, UidEntry};
use crate::header::Tag;

/// An attribute dictionary with no entries.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StubAttributeDictionary;

impl AttributeDictionary for StubAttributeDictionary {
    fn entry(&self, _tag: Tag) -> Option<AttributeEntry<'_>> {
        None
    }

    fn entry_by_keyword(&self, _keyword: &str) -> Option<AttributeEntry<'_>> {
        None
    }
}

/// A UID registry with no entries.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StubUidDictionary;

impl UidDictionary for StubUidDictionary {
    fn entry(&self, _uid: &str) -> Option<UidEntry<'_>> {
        None
    }
}
