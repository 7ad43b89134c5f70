//! Core data model: identities, attributes, annotations, spans

mod annotation;
mod attribute;
mod id;
pub mod span;

pub use annotation::{Annotation, AnnotationError, AnnotationKind, AttrContainer};
pub use attribute::{AttrValue, Attribute};
pub use id::ItemId;
pub use span::{Span, SpanError};

/// Free-form metadata carried by items and documents
pub type Metadata = std::collections::BTreeMap<String, serde_json::Value>;
