//! Attribute propagation across overlapping spans
//!
//! Copies attributes with configured labels from source annotations onto
//! every target annotation whose span range overlaps the source's. Each
//! copy is a fresh attribute (new uid: an attribute belongs to exactly
//! one annotation) attached to the target through the store arena, so
//! targets already attached to a document are enriched in place.

use crate::model::{Attribute, ItemId, Span};
use crate::pipeline::{OpDescription, Operation, OperationError};
use crate::prov::ProvTracer;
use crate::store::{DataItem, Store};

/// Operation propagating attributes from sources to overlapping targets.
///
/// Consumes two groups (sources, then targets) and produces no output
/// groups: enrichment happens through the store.
pub struct AttributePropagator {
    attr_labels: Vec<String>,
    description: OpDescription,
}

impl AttributePropagator {
    pub fn new(attr_labels: &[&str]) -> Self {
        let attr_labels: Vec<String> = attr_labels.iter().map(|l| l.to_string()).collect();
        let description = OpDescription::new("attribute_propagator")
            .with_config("attr_labels", serde_json::json!(attr_labels));
        Self {
            attr_labels,
            description,
        }
    }
}

impl Operation for AttributePropagator {
    fn description(&self) -> &OpDescription {
        &self.description
    }

    fn process(
        &self,
        store: &Store,
        inputs: &[Vec<ItemId>],
        tracer: Option<&ProvTracer>,
    ) -> Result<Vec<Vec<ItemId>>, OperationError> {
        if inputs.len() != 2 {
            return Err(OperationError::InputArity {
                expected: 2,
                got: inputs.len(),
            });
        }
        let (source_ids, target_ids) = (&inputs[0], &inputs[1]);

        // resolve sources once; each carries its covering range
        let mut sources = Vec::with_capacity(source_ids.len());
        for uid in source_ids {
            let ann = store.get_annotation(uid).ok_or_else(|| {
                OperationError::InvalidInput(format!("{uid} is not a stored annotation"))
            })?;
            let envelope = ann.envelope().ok_or_else(|| {
                OperationError::InvalidInput(format!("annotation {uid} is not a text span"))
            })?;
            sources.push((ann, envelope));
        }

        for target_uid in target_ids {
            let target = store.get_annotation(target_uid).ok_or_else(|| {
                OperationError::InvalidInput(format!("{target_uid} is not a stored annotation"))
            })?;
            let target_envelope: Span = target.envelope().ok_or_else(|| {
                OperationError::InvalidInput(format!(
                    "annotation {target_uid} is not a text span"
                ))
            })?;

            for (source, source_envelope) in &sources {
                if !source_envelope.overlaps(&target_envelope) {
                    continue;
                }
                for label in &self.attr_labels {
                    for attr in source.attrs_by_label(label) {
                        let mut copied = Attribute::new(&attr.label);
                        copied.value = attr.value.clone();
                        copied.metadata = attr.metadata.clone();
                        let copied_item = DataItem::from(copied.clone());

                        store
                            .update_annotation(target_uid, |target| target.add_attr(copied))
                            .ok_or_else(|| {
                                OperationError::InvalidInput(format!(
                                    "{target_uid} is not a stored annotation"
                                ))
                            })?
                            .map_err(|e| OperationError::Internal(e.to_string()))?;

                        if let Some(tracer) = tracer {
                            tracer.record(
                                &copied_item,
                                &self.description,
                                &[DataItem::from(attr.clone())],
                            );
                        }
                    }
                }
            }
        }
        Ok(Vec::new())
    }
}
