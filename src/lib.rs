//! Skein: Provenance-Aware Annotation Pipeline Engine
//!
//! An annotation-graph engine for document-centric data processing:
//! documents hold a growing set of derived annotations produced by a chain
//! of processing operations, and every derived item is traceable back to
//! the inputs that produced it.
//!
//! # Core Concepts
//!
//! - **Annotations**: Units of derived knowledge (labeled text spans, ...)
//! - **Attributes**: Typed properties attached to annotations
//! - **Store**: The shared arena mapping identifiers to items
//! - **Pipeline**: Ordered steps routing annotation groups between named keys
//! - **Provenance**: Recorded lineage from each derived item to its sources
//!
//! # Example
//!
//! ```
//! use skein::{Annotation, Document};
//!
//! let mut doc = Document::new();
//! doc.add_annotation(Annotation::new("sentence")).unwrap();
//! assert_eq!(doc.annotation_count(), 1);
//! ```

pub mod document;
pub mod metrics;
pub mod model;
pub mod ops;
pub mod pipeline;
pub mod prov;
pub mod storage;
pub mod store;

pub use document::{Collection, DocMetadata, Document, DocumentError};
pub use model::{
    Annotation, AnnotationError, AnnotationKind, AttrValue, Attribute, ItemId, Metadata, Span,
};
pub use pipeline::{
    DocPipeline, OpDescription, Operation, OperationError, Pipeline, PipelineError, PipelineStep,
};
pub use prov::{ProvTracer, Provenance};
pub use storage::{DocArchive, OpenArchive, SqliteArchive, StorageError, StorageResult};
pub use store::{DataItem, Store, StoreError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
