//! Running a pipeline over documents
//!
//! A document pipeline maps existing document annotations (selected by
//! label) onto pipeline input keys, runs the pipeline bound to the
//! document, and leaves every produced annotation attached to it. Nothing
//! is returned to the caller; results reach it through the document.

use super::runner::{Pipeline, PipelineError, PipelineStep};
use crate::document::{Collection, Document};
use crate::prov::ProvTracer;
use crate::store::DataItem;
use tracing::debug;

/// A pipeline adapted to documents.
///
/// `labels_by_input_key` associates each input key with the document
/// annotation labels whose annotations feed that key, in seeding order.
/// Several labels may feed one key; one label may feed several keys.
#[derive(Debug, Clone)]
pub struct DocPipeline {
    pipeline: Pipeline,
    labels_by_input_key: Vec<(String, Vec<String>)>,
}

impl DocPipeline {
    pub fn new(steps: Vec<PipelineStep>, labels_by_input_key: Vec<(String, Vec<String>)>) -> Self {
        let input_keys: Vec<&str> = labels_by_input_key
            .iter()
            .map(|(key, _)| key.as_str())
            .collect();
        // empty output keys: everything is captured via document attachment
        let pipeline = Pipeline::new(steps, &input_keys, &[]);
        Self {
            pipeline,
            labels_by_input_key,
        }
    }

    /// Run the pipeline on one document.
    ///
    /// For each input key, the document's annotations for every associated
    /// label are concatenated (label-list order, bucket-internal order
    /// preserved) into that key's seed group.
    pub fn run_on_doc(
        &self,
        doc: &mut Document,
        tracer: Option<&ProvTracer>,
    ) -> Result<(), PipelineError> {
        let mut inputs = Vec::with_capacity(self.labels_by_input_key.len());
        for (key, labels) in &self.labels_by_input_key {
            let mut group: Vec<DataItem> = Vec::new();
            for label in labels {
                group.extend(
                    doc.annotations_by_label(label)
                        .into_iter()
                        .map(DataItem::from),
                );
            }
            debug!(doc = %doc.id(), key = %key, seeded = group.len(), "seeding input key");
            inputs.push(group);
        }
        self.pipeline.process_on_doc(doc, inputs, tracer)?;
        Ok(())
    }

    /// Run the pipeline on every document of a collection, in collection
    /// order. The first failing document aborts the run; there is no
    /// built-in partial-failure recovery.
    pub fn run_on_collection(
        &self,
        collection: &mut Collection,
        tracer: Option<&ProvTracer>,
    ) -> Result<(), PipelineError> {
        for doc in &mut collection.documents {
            self.run_on_doc(doc, tracer)?;
        }
        Ok(())
    }
}
