//! Documents and collections
//!
//! A document owns the set of annotation identifiers belonging to one unit
//! of source content and maintains label- and key-based indices into its
//! store. The store is private by default; sharing one across documents is
//! an explicit construction-time choice, in which case the document does
//! not own the store's lifecycle.

use crate::model::{Annotation, ItemId, Metadata};
use crate::store::{Store, StoreError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Errors from document mutation
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("annotation {0} already attached to this document")]
    DuplicateAnnotation(ItemId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Document metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocMetadata {
    /// When the document was created
    pub created_at: Option<DateTime<Utc>>,
    /// When an annotation was last attached
    pub updated_at: Option<DateTime<Utc>>,
    /// Free-form entries (source path, corpus id, ...)
    #[serde(default)]
    pub extra: Metadata,
}

/// A document holding annotations.
///
/// Membership, the label index and the key index are exclusively owned by
/// the document; annotation content lives in the referenced store. The key
/// index snapshots an annotation's `keys` at insertion time; later
/// `add_key`/`keep_keys` calls do not move the annotation between buckets.
#[derive(Debug)]
pub struct Document {
    id: ItemId,
    metadata: DocMetadata,
    order: Vec<ItemId>,
    members: HashSet<ItemId>,
    ids_by_label: HashMap<String, Vec<ItemId>>,
    ids_by_key: HashMap<String, Vec<ItemId>>,
    store: Arc<Store>,
    owns_store: bool,
}

impl Document {
    /// Create a document with a private store
    pub fn new() -> Self {
        Self::build(Arc::new(Store::new()), true)
    }

    /// Create a document over a shared store.
    ///
    /// The document does not own the store's lifecycle; the store is
    /// expected to live as long as the longest-lived referencing document
    /// or tracer.
    pub fn with_shared_store(store: Arc<Store>) -> Self {
        Self::build(store, false)
    }

    fn build(store: Arc<Store>, owns_store: bool) -> Self {
        Self {
            id: ItemId::new(),
            metadata: DocMetadata {
                created_at: Some(Utc::now()),
                ..DocMetadata::default()
            },
            order: Vec::new(),
            members: HashSet::new(),
            ids_by_label: HashMap::new(),
            ids_by_key: HashMap::new(),
            store,
            owns_store,
        }
    }

    /// Rebuild a document under a specific id
    pub fn with_id(mut self, id: ItemId) -> Self {
        self.id = id;
        self
    }

    /// Add a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.extra.insert(key.into(), value.into());
        self
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn metadata(&self) -> &DocMetadata {
        &self.metadata
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn has_shared_store(&self) -> bool {
        !self.owns_store
    }

    /// Attach an annotation to this document.
    ///
    /// Fails if the uid is already a member. On success the annotation is
    /// stored (idempotently, for shared-store double delivery), recorded in
    /// the membership set, and indexed under its label and under every key
    /// in its `keys` set as of this call.
    pub fn add_annotation(&mut self, ann: Annotation) -> Result<(), DocumentError> {
        let uid = ann.uid;
        if self.members.contains(&uid) {
            return Err(DocumentError::DuplicateAnnotation(uid));
        }

        let label = ann.label.clone();
        let keys: Vec<String> = ann.keys().iter().cloned().collect();
        self.store.insert(ann)?;

        self.members.insert(uid);
        self.order.push(uid);
        self.ids_by_label.entry(label).or_default().push(uid);
        for key in keys {
            self.ids_by_key.entry(key).or_default().push(uid);
        }
        self.touch();
        debug!(doc = %self.id, annotation = %uid, "annotation attached");
        Ok(())
    }

    /// Look up a member annotation by uid.
    ///
    /// Membership is filtered even on a shared store: an annotation
    /// belonging to another document over the same store is not visible
    /// here.
    pub fn annotation_by_id(&self, uid: &ItemId) -> Option<Annotation> {
        if !self.members.contains(uid) {
            return None;
        }
        self.store.get_annotation(uid)
    }

    /// All member annotations, in insertion order
    pub fn annotations(&self) -> Vec<Annotation> {
        self.resolve(&self.order)
    }

    /// Member annotations with the given label, insertion order preserved
    pub fn annotations_by_label(&self, label: &str) -> Vec<Annotation> {
        self.ids_by_label
            .get(label)
            .map(|ids| self.resolve(ids))
            .unwrap_or_default()
    }

    /// Member annotations indexed under the given pipeline key
    pub fn annotations_by_key(&self, key: &str) -> Vec<Annotation> {
        self.ids_by_key
            .get(key)
            .map(|ids| self.resolve(ids))
            .unwrap_or_default()
    }

    pub fn annotation_count(&self) -> usize {
        self.order.len()
    }

    fn resolve(&self, ids: &[ItemId]) -> Vec<Annotation> {
        ids.iter()
            .filter_map(|uid| self.store.get_annotation(uid))
            .collect()
    }

    fn touch(&mut self) {
        self.metadata.updated_at = Some(Utc::now());
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialized shape of a document: id, metadata and member annotations in
/// membership order.
#[derive(Serialize, Deserialize)]
struct DocumentRepr {
    id: ItemId,
    metadata: DocMetadata,
    annotations: Vec<Annotation>,
}

impl Serialize for Document {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        DocumentRepr {
            id: self.id,
            metadata: self.metadata.clone(),
            annotations: self.annotations(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = DocumentRepr::deserialize(deserializer)?;
        // a deserialized document always owns a fresh private store;
        // shared-store topology is a runtime construction concern
        let mut doc = Document::new().with_id(repr.id);
        for ann in repr.annotations {
            doc.add_annotation(ann).map_err(serde::de::Error::custom)?;
        }
        doc.metadata = repr.metadata;
        Ok(doc)
    }
}

/// An ordered sequence of documents; a pure aggregate with no shared
/// indices across documents.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Collection {
    pub documents: Vec<Document>,
}

impl Collection {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
