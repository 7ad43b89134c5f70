//! The shared item arena
//!
//! Annotations and attributes live in one arena keyed by identifier.
//! Documents and provenance records hold identifiers into the arena, never
//! direct ownership, so a store can be shared across documents (for
//! cross-document provenance or deduplicated storage) without aliasing
//! hazards. The arena is append-only for the lifetime of a processing
//! session.

use crate::model::{Annotation, Attribute, ItemId};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("item {0} already stored with different content")]
    DuplicateItem(ItemId),
}

/// A storable item: an annotation or an attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "item", rename_all = "snake_case")]
pub enum DataItem {
    Annotation(Annotation),
    Attribute(Attribute),
}

impl DataItem {
    pub fn uid(&self) -> ItemId {
        match self {
            Self::Annotation(ann) => ann.uid,
            Self::Attribute(attr) => attr.uid,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Annotation(ann) => &ann.label,
            Self::Attribute(attr) => &attr.label,
        }
    }

    pub fn as_annotation(&self) -> Option<&Annotation> {
        match self {
            Self::Annotation(ann) => Some(ann),
            Self::Attribute(_) => None,
        }
    }

    pub fn as_attribute(&self) -> Option<&Attribute> {
        match self {
            Self::Attribute(attr) => Some(attr),
            Self::Annotation(_) => None,
        }
    }
}

impl From<Annotation> for DataItem {
    fn from(ann: Annotation) -> Self {
        Self::Annotation(ann)
    }
}

impl From<Attribute> for DataItem {
    fn from(attr: Attribute) -> Self {
        Self::Attribute(attr)
    }
}

/// The shared arena mapping identifiers to data items.
///
/// Writes are serialized internally, so one store may be shared across
/// documents processed on different worker threads.
#[derive(Debug, Default)]
pub struct Store {
    items: DashMap<ItemId, DataItem>,
}

impl Store {
    pub fn new() -> Self {
        Self {
            items: DashMap::new(),
        }
    }

    /// Insert an item under its own uid.
    ///
    /// Re-inserting an identical item is idempotent: a document with a
    /// shared store may receive the same annotation through two code
    /// paths. Inserting a different item under a live uid fails.
    pub fn insert(&self, item: impl Into<DataItem>) -> Result<(), StoreError> {
        let item = item.into();
        match self.items.entry(item.uid()) {
            Entry::Occupied(existing) => {
                if *existing.get() == item {
                    Ok(())
                } else {
                    Err(StoreError::DuplicateItem(item.uid()))
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(item);
                Ok(())
            }
        }
    }

    /// Look up an item by uid. Absent is a normal outcome, not an error.
    pub fn get(&self, uid: &ItemId) -> Option<DataItem> {
        self.items.get(uid).map(|r| r.clone())
    }

    /// Look up an annotation by uid
    pub fn get_annotation(&self, uid: &ItemId) -> Option<Annotation> {
        self.items
            .get(uid)
            .and_then(|r| r.as_annotation().cloned())
    }

    /// Look up an attribute by uid
    pub fn get_attribute(&self, uid: &ItemId) -> Option<Attribute> {
        self.items.get(uid).and_then(|r| r.as_attribute().cloned())
    }

    /// Mutate a stored annotation in place.
    ///
    /// This is the arena's single mutation door: operations that enrich an
    /// annotation already attached to a document go through here. Returns
    /// `None` if the uid is absent or names an attribute. The closure must
    /// not reenter the store; it runs under the entry's shard lock.
    pub fn update_annotation<R>(
        &self,
        uid: &ItemId,
        f: impl FnOnce(&mut Annotation) -> R,
    ) -> Option<R> {
        let mut entry = self.items.get_mut(uid)?;
        match entry.value_mut() {
            DataItem::Annotation(ann) => Some(f(ann)),
            DataItem::Attribute(_) => None,
        }
    }

    pub fn contains(&self, uid: &ItemId) -> bool {
        self.items.contains_key(uid)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reinserting_the_identical_item_is_idempotent() {
        let store = Store::new();
        let ann = Annotation::new("sentence");

        store.insert(ann.clone()).unwrap();
        store.insert(ann.clone()).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn inserting_a_conflicting_item_fails() {
        let store = Store::new();
        let ann = Annotation::new("sentence");
        let mut conflicting = ann.clone();
        conflicting.add_key("other");

        store.insert(ann).unwrap();
        let err = store.insert(conflicting).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateItem(_)));
    }

    #[test]
    fn absent_lookup_is_none_not_an_error() {
        let store = Store::new();
        assert!(store.get(&ItemId::new()).is_none());
        assert!(store.get_annotation(&ItemId::new()).is_none());
    }

    #[test]
    fn update_annotation_mutates_in_place() {
        let store = Store::new();
        let ann = Annotation::new("entity");
        let uid = ann.uid;
        store.insert(ann).unwrap();

        let attached = store
            .update_annotation(&uid, |ann| {
                ann.add_attr(Attribute::new("is_negated").with_value(true))
            })
            .unwrap();
        attached.unwrap();

        let stored = store.get_annotation(&uid).unwrap();
        assert_eq!(stored.attrs().len(), 1);
    }

    #[test]
    fn update_annotation_refuses_attributes() {
        let store = Store::new();
        let attr = Attribute::new("flag");
        let uid = attr.uid;
        store.insert(attr).unwrap();

        assert!(store.update_annotation(&uid, |_| ()).is_none());
    }
}
