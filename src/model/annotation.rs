//! Annotations: derived units of knowledge attached to documents

use super::attribute::Attribute;
use super::id::ItemId;
use super::span::{self, Span};
use super::Metadata;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

/// Errors from annotation mutation
#[derive(Debug, Error)]
pub enum AnnotationError {
    #[error("attribute {0} already attached to this annotation")]
    DuplicateAttribute(ItemId),
}

/// Variant payload of an annotation
///
/// A closed union: deserialization dispatches on the `kind` tag and fails
/// on anything it doesn't know.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnnotationKind {
    /// A bare annotation with no positional payload
    Generic,
    /// A labeled span of text extracted from the source content
    TextSpan { text: String, spans: Vec<Span> },
}

/// Ordered attribute collection, indexed by uid and by label.
///
/// The label index is derived from the uid index and stays consistent with
/// it on every add. Serializes as the plain attribute list; deserialization
/// rebuilds both indices and rejects duplicate uids.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttrContainer {
    attrs: Vec<Attribute>,
    index_by_uid: HashMap<ItemId, usize>,
    ids_by_label: HashMap<String, Vec<ItemId>>,
}

impl AttrContainer {
    fn add(&mut self, attr: Attribute) -> Result<(), AnnotationError> {
        if self.index_by_uid.contains_key(&attr.uid) {
            return Err(AnnotationError::DuplicateAttribute(attr.uid));
        }
        self.index_by_uid.insert(attr.uid, self.attrs.len());
        self.ids_by_label
            .entry(attr.label.clone())
            .or_default()
            .push(attr.uid);
        self.attrs.push(attr);
        Ok(())
    }

    fn get(&self, uid: &ItemId) -> Option<&Attribute> {
        self.index_by_uid.get(uid).map(|&i| &self.attrs[i])
    }

    fn by_label(&self, label: &str) -> Vec<&Attribute> {
        self.ids_by_label
            .get(label)
            .map(|ids| ids.iter().filter_map(|uid| self.get(uid)).collect())
            .unwrap_or_default()
    }
}

impl Serialize for AttrContainer {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.attrs.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AttrContainer {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let attrs = Vec::<Attribute>::deserialize(deserializer)?;
        let mut container = Self::default();
        for attr in attrs {
            container.add(attr).map_err(serde::de::Error::custom)?;
        }
        Ok(container)
    }
}

/// A derived unit of knowledge attached to a document.
///
/// Identity (`uid`) is immutable; content (attributes, pipeline keys) grows
/// as operations enrich the annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Unique identifier
    pub uid: ItemId,
    /// Annotation label (e.g. "sentence", "disease")
    pub label: String,
    /// Pipeline output keys this annotation belongs to
    keys: BTreeSet<String>,
    /// Attached attributes
    attrs: AttrContainer,
    /// Free-form metadata
    #[serde(default)]
    pub metadata: Metadata,
    /// Variant payload
    #[serde(flatten)]
    pub kind: AnnotationKind,
}

impl Annotation {
    /// Create a generic annotation with the given label
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            uid: ItemId::new(),
            label: label.into(),
            keys: BTreeSet::new(),
            attrs: AttrContainer::default(),
            metadata: Metadata::new(),
            kind: AnnotationKind::Generic,
        }
    }

    /// Create a text-span annotation over the given source spans
    pub fn text_span(label: impl Into<String>, text: impl Into<String>, spans: Vec<Span>) -> Self {
        Self {
            kind: AnnotationKind::TextSpan {
                text: text.into(),
                spans,
            },
            ..Self::new(label)
        }
    }

    /// Rebuild an annotation under a specific uid
    pub fn with_uid(mut self, uid: ItemId) -> Self {
        self.uid = uid;
        self
    }

    /// Add a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Attach an attribute.
    ///
    /// Fails if an attribute with the same uid is already attached; the
    /// attribute itself is never mutated.
    pub fn add_attr(&mut self, attr: Attribute) -> Result<(), AnnotationError> {
        self.attrs.add(attr)
    }

    /// All attached attributes, in insertion order
    pub fn attrs(&self) -> &[Attribute] {
        &self.attrs.attrs
    }

    /// Attributes with the given label, insertion order preserved.
    /// Empty when none match.
    pub fn attrs_by_label(&self, label: &str) -> Vec<&Attribute> {
        self.attrs.by_label(label)
    }

    /// Look up an attached attribute by uid
    pub fn attr_by_id(&self, uid: &ItemId) -> Option<&Attribute> {
        self.attrs.get(uid)
    }

    /// The pipeline output keys this annotation currently belongs to
    pub fn keys(&self) -> &BTreeSet<String> {
        &self.keys
    }

    /// Tag the annotation with a pipeline output key
    pub fn add_key(&mut self, key: impl Into<String>) {
        self.keys.insert(key.into());
    }

    /// Intersect the key set with the given keys, dropping the rest
    pub fn keep_keys(&mut self, keys: &[&str]) {
        self.keys.retain(|k| keys.contains(&k.as_str()));
    }

    /// The text carried by a text-span annotation
    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            AnnotationKind::TextSpan { text, .. } => Some(text),
            AnnotationKind::Generic => None,
        }
    }

    /// The source spans of a text-span annotation
    pub fn spans(&self) -> Option<&[Span]> {
        match &self.kind {
            AnnotationKind::TextSpan { spans, .. } => Some(spans),
            AnnotationKind::Generic => None,
        }
    }

    /// Smallest single source range covering this annotation's spans
    pub fn envelope(&self) -> Option<Span> {
        self.spans().and_then(span::envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_attribute_uid_fails_and_leaves_container_unchanged() {
        let mut ann = Annotation::new("sentence");
        let attr = Attribute::new("is_family").with_value(true);
        let dup = attr.clone();

        ann.add_attr(attr).unwrap();
        let err = ann.add_attr(dup).unwrap_err();
        assert!(matches!(err, AnnotationError::DuplicateAttribute(_)));
        assert_eq!(ann.attrs().len(), 1);
    }

    #[test]
    fn label_index_preserves_insertion_order() {
        let mut ann = Annotation::new("sentence");
        let a = Attribute::new("score").with_value(1i64);
        let b = Attribute::new("is_negated").with_value(false);
        let c = Attribute::new("score").with_value(2i64);
        let (a_uid, c_uid) = (a.uid, c.uid);

        ann.add_attr(a).unwrap();
        ann.add_attr(b).unwrap();
        ann.add_attr(c).unwrap();

        let scores = ann.attrs_by_label("score");
        assert_eq!(
            scores.iter().map(|attr| attr.uid).collect::<Vec<_>>(),
            vec![a_uid, c_uid]
        );
        assert!(ann.attrs_by_label("absent").is_empty());
    }

    #[test]
    fn keep_keys_intersects() {
        let mut ann = Annotation::new("entity");
        ann.add_key("ner");
        ann.add_key("negation");
        ann.add_key("family");

        ann.keep_keys(&["negation", "unrelated"]);
        assert_eq!(
            ann.keys().iter().cloned().collect::<Vec<_>>(),
            vec!["negation".to_string()]
        );
    }

    #[test]
    fn roundtrip_with_nested_attributes_and_spans() {
        let mut ann = Annotation::text_span("disease", "maladie", vec![Span::new(66, 73)]);
        ann.add_key("entities");
        ann.add_attr(Attribute::new("is_negated").with_value(true))
            .unwrap();
        ann.add_attr(Attribute::new("is_family").with_value(false))
            .unwrap();

        let json = serde_json::to_value(&ann).unwrap();
        assert_eq!(json["kind"], "text_span");

        let back: Annotation = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(back, ann);
        assert_eq!(serde_json::to_value(&back).unwrap(), json);
    }

    #[test]
    fn unknown_kind_discriminator_is_fatal() {
        let json = serde_json::json!({
            "uid": ItemId::new(),
            "label": "x",
            "keys": [],
            "attrs": [],
            "metadata": {},
            "kind": "hologram",
        });
        assert!(serde_json::from_value::<Annotation>(json).is_err());
    }

    #[test]
    fn duplicate_attribute_in_serialized_form_is_fatal() {
        let attr = Attribute::new("flag");
        let json = serde_json::json!({
            "uid": ItemId::new(),
            "label": "x",
            "keys": [],
            "attrs": [attr.clone(), attr],
            "metadata": {},
            "kind": "generic",
        });
        assert!(serde_json::from_value::<Annotation>(json).is_err());
    }

    #[test]
    fn envelope_spans_the_whole_annotation() {
        let ann = Annotation::text_span(
            "syntagme",
            "ab",
            vec![Span::new(37, 38), Span::new(72, 73)],
        );
        assert_eq!(ann.envelope(), Some(Span::new(37, 73)));
        assert_eq!(Annotation::new("generic").envelope(), None);
    }
}
