//! The operation pipeline
//!
//! Wires pluggable operations together with named input/output keys,
//! executes them in declaration order, and optionally attaches everything
//! they produce to a document.

mod doc_pipeline;
mod operation;
mod runner;

pub use doc_pipeline::DocPipeline;
pub use operation::{OpDescription, Operation, OperationError};
pub use runner::{Pipeline, PipelineError, PipelineStep};
