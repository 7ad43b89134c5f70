//! Pipeline execution
//!
//! A pipeline is an ordered set of steps, each wrapping one operation plus
//! the named keys it consumes and produces. Steps execute strictly in
//! declaration order over a key→items binding map; no topological
//! reordering happens; producers must be declared before consumers.

use super::operation::{Operation, OperationError};
use crate::document::{Document, DocumentError};
use crate::model::ItemId;
use crate::prov::ProvTracer;
use crate::store::{DataItem, Store, StoreError};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Errors from pipeline execution
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A step read a key no earlier step produced and no pipeline input
    /// seeded. A fatal configuration error, detected at run time.
    #[error("key \"{0}\" read before any step or pipeline input produced it")]
    MissingKey(String),

    #[error("pipeline declares {expected} input keys but was given {got} input groups")]
    InputArity { expected: usize, got: usize },

    #[error("step \"{step}\" declares {expected} output keys but its operation returned {got} groups")]
    OutputArity {
        step: String,
        expected: usize,
        got: usize,
    },

    #[error(transparent)]
    Operation(#[from] OperationError),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One pipeline step: an operation plus its input/output key wiring
#[derive(Clone)]
pub struct PipelineStep {
    pub operation: Arc<dyn Operation>,
    pub input_keys: Vec<String>,
    pub output_keys: Vec<String>,
}

impl PipelineStep {
    pub fn new(operation: Arc<dyn Operation>, input_keys: &[&str], output_keys: &[&str]) -> Self {
        Self {
            operation,
            input_keys: input_keys.iter().map(|k| k.to_string()).collect(),
            output_keys: output_keys.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl std::fmt::Debug for PipelineStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineStep")
            .field("operation", &self.operation.description().name)
            .field("input_keys", &self.input_keys)
            .field("output_keys", &self.output_keys)
            .finish()
    }
}

/// An ordered set of steps routing data between named keys.
///
/// Constructed once; each `process` call runs over a fresh key→items
/// binding seeded from the positional input groups.
#[derive(Debug, Clone)]
pub struct Pipeline {
    steps: Vec<PipelineStep>,
    input_keys: Vec<String>,
    output_keys: Vec<String>,
}

impl Pipeline {
    pub fn new(steps: Vec<PipelineStep>, input_keys: &[&str], output_keys: &[&str]) -> Self {
        Self {
            steps,
            input_keys: input_keys.iter().map(|k| k.to_string()).collect(),
            output_keys: output_keys.iter().map(|k| k.to_string()).collect(),
        }
    }

    pub fn input_keys(&self) -> &[String] {
        &self.input_keys
    }

    pub fn output_keys(&self) -> &[String] {
        &self.output_keys
    }

    /// Run the pipeline against a store, without document attachment.
    ///
    /// The i-th input group seeds the i-th declared input key. Returns the
    /// final bindings of the declared output keys.
    pub fn process(
        &self,
        store: &Store,
        inputs: Vec<Vec<DataItem>>,
        tracer: Option<&ProvTracer>,
    ) -> Result<Vec<Vec<DataItem>>, PipelineError> {
        self.run(store, None, inputs, tracer)
    }

    /// Run the pipeline bound to a document.
    ///
    /// Every annotation a step produces is attached to the document right
    /// after the step, so operations never need to know about documents.
    pub fn process_on_doc(
        &self,
        doc: &mut Document,
        inputs: Vec<Vec<DataItem>>,
        tracer: Option<&ProvTracer>,
    ) -> Result<Vec<Vec<DataItem>>, PipelineError> {
        let store = Arc::clone(doc.store());
        self.run(&store, Some(doc), inputs, tracer)
    }

    fn run(
        &self,
        store: &Store,
        mut doc: Option<&mut Document>,
        inputs: Vec<Vec<DataItem>>,
        tracer: Option<&ProvTracer>,
    ) -> Result<Vec<Vec<DataItem>>, PipelineError> {
        if inputs.len() != self.input_keys.len() {
            return Err(PipelineError::InputArity {
                expected: self.input_keys.len(),
                got: inputs.len(),
            });
        }

        let mut bindings: HashMap<String, Vec<ItemId>> = HashMap::new();
        for (key, group) in self.input_keys.iter().zip(inputs) {
            let mut ids = Vec::with_capacity(group.len());
            for item in group {
                let uid = item.uid();
                store.insert(item)?;
                ids.push(uid);
            }
            bindings.insert(key.clone(), ids);
        }

        for step in &self.steps {
            Self::run_step(step, store, &mut bindings, doc.as_deref_mut(), tracer)?;
        }

        let mut outputs = Vec::with_capacity(self.output_keys.len());
        for key in &self.output_keys {
            let ids = bindings
                .get(key)
                .ok_or_else(|| PipelineError::MissingKey(key.clone()))?;
            outputs.push(ids.iter().filter_map(|uid| store.get(uid)).collect());
        }
        Ok(outputs)
    }

    fn run_step(
        step: &PipelineStep,
        store: &Store,
        bindings: &mut HashMap<String, Vec<ItemId>>,
        mut doc: Option<&mut Document>,
        tracer: Option<&ProvTracer>,
    ) -> Result<(), PipelineError> {
        let op_name = &step.operation.description().name;
        debug!(
            operation = %op_name,
            inputs = ?step.input_keys,
            outputs = ?step.output_keys,
            "running pipeline step"
        );

        let mut input_groups = Vec::with_capacity(step.input_keys.len());
        for key in &step.input_keys {
            let ids = bindings
                .get(key)
                .ok_or_else(|| PipelineError::MissingKey(key.clone()))?;
            input_groups.push(ids.clone());
        }

        let output_groups = step.operation.process(store, &input_groups, tracer)?;
        if output_groups.len() != step.output_keys.len() {
            return Err(PipelineError::OutputArity {
                step: op_name.clone(),
                expected: step.output_keys.len(),
                got: output_groups.len(),
            });
        }

        for (key, ids) in step.output_keys.iter().zip(output_groups) {
            // tag produced annotations with their output key before any
            // document attachment snapshots the key set
            for uid in &ids {
                store.update_annotation(uid, |ann| ann.add_key(key.clone()));
            }
            if let Some(doc) = doc.as_deref_mut() {
                for uid in &ids {
                    if let Some(ann) = store.get_annotation(uid) {
                        doc.add_annotation(ann)?;
                    }
                }
            }
            // last writer wins; a correctly designed pipeline produces
            // each key exactly once
            bindings.insert(key.clone(), ids);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Annotation;
    use crate::pipeline::OpDescription;

    /// Test operation: re-emits each input annotation as a fresh copy
    /// under a new label, recording provenance.
    struct Relabel {
        label: String,
        description: OpDescription,
    }

    impl Relabel {
        fn new(label: &str) -> Self {
            Self {
                label: label.to_string(),
                description: OpDescription::new("relabel").with_config("label", label),
            }
        }
    }

    impl Operation for Relabel {
        fn description(&self) -> &OpDescription {
            &self.description
        }

        fn process(
            &self,
            store: &Store,
            inputs: &[Vec<ItemId>],
            tracer: Option<&ProvTracer>,
        ) -> Result<Vec<Vec<ItemId>>, OperationError> {
            let mut out = Vec::new();
            for uid in &inputs[0] {
                let source = store.get_annotation(uid).ok_or_else(|| {
                    OperationError::InvalidInput(format!("{uid} is not a stored annotation"))
                })?;
                let derived = Annotation::new(&self.label);
                let derived_item = DataItem::from(derived);
                store.insert(derived_item.clone())?;
                if let Some(tracer) = tracer {
                    tracer.record(
                        &derived_item,
                        &self.description,
                        &[DataItem::from(source)],
                    );
                }
                out.push(derived_item.uid());
            }
            Ok(vec![out])
        }
    }

    /// Test operation: declares one output key but returns no groups.
    struct Mute(OpDescription);

    impl Operation for Mute {
        fn description(&self) -> &OpDescription {
            &self.0
        }

        fn process(
            &self,
            _store: &Store,
            _inputs: &[Vec<ItemId>],
            _tracer: Option<&ProvTracer>,
        ) -> Result<Vec<Vec<ItemId>>, OperationError> {
            Ok(Vec::new())
        }
    }

    /// Test operation: always fails.
    struct Exploding(OpDescription);

    impl Operation for Exploding {
        fn description(&self) -> &OpDescription {
            &self.0
        }

        fn process(
            &self,
            _store: &Store,
            _inputs: &[Vec<ItemId>],
            _tracer: Option<&ProvTracer>,
        ) -> Result<Vec<Vec<ItemId>>, OperationError> {
            Err(OperationError::Internal("boom".to_string()))
        }
    }

    fn seed() -> Vec<DataItem> {
        vec![DataItem::from(Annotation::new("seed"))]
    }

    #[test]
    fn steps_run_in_declaration_order_only() {
        let s1 = PipelineStep::new(Arc::new(Relabel::new("b_ann")), &["a"], &["b"]);
        let s2 = PipelineStep::new(Arc::new(Relabel::new("c_ann")), &["b"], &["c"]);

        // consumer before producer: fatal MissingKey
        let store = Store::new();
        let broken = Pipeline::new(vec![s2.clone(), s1.clone()], &["a"], &["c"]);
        let err = broken.process(&store, vec![seed()], None).unwrap_err();
        assert!(matches!(err, PipelineError::MissingKey(key) if key == "b"));

        // producer before consumer: succeeds
        let store = Store::new();
        let working = Pipeline::new(vec![s1, s2], &["a"], &["c"]);
        let outputs = working.process(&store, vec![seed()], None).unwrap();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].len(), 1);
        assert_eq!(outputs[0][0].label(), "c_ann");
    }

    #[test]
    fn seeding_arity_is_checked() {
        let pipeline = Pipeline::new(Vec::new(), &["a", "b"], &[]);
        let err = pipeline
            .process(&Store::new(), vec![seed()], None)
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InputArity {
                expected: 2,
                got: 1
            }
        ));
    }

    #[test]
    fn output_group_arity_is_checked() {
        let step = PipelineStep::new(
            Arc::new(Mute(OpDescription::new("mute"))),
            &["a"],
            &["b"],
        );
        let pipeline = Pipeline::new(vec![step], &["a"], &[]);
        let err = pipeline
            .process(&Store::new(), vec![seed()], None)
            .unwrap_err();
        assert!(matches!(err, PipelineError::OutputArity { .. }));
    }

    #[test]
    fn operation_failures_propagate_unmodified() {
        let step = PipelineStep::new(
            Arc::new(Exploding(OpDescription::new("exploding"))),
            &["a"],
            &[],
        );
        let pipeline = Pipeline::new(vec![step], &["a"], &[]);
        let err = pipeline
            .process(&Store::new(), vec![seed()], None)
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Operation(OperationError::Internal(msg)) if msg == "boom"
        ));
    }

    #[test]
    fn produced_annotations_carry_their_output_key() {
        let step = PipelineStep::new(Arc::new(Relabel::new("derived")), &["a"], &["b"]);
        let pipeline = Pipeline::new(vec![step], &["a"], &["b"]);
        let store = Store::new();

        let outputs = pipeline.process(&store, vec![seed()], None).unwrap();
        let ann = outputs[0][0].as_annotation().unwrap();
        assert!(ann.keys().contains("b"));
    }

    #[test]
    fn bound_document_receives_every_produced_annotation() {
        let step = PipelineStep::new(Arc::new(Relabel::new("derived")), &["a"], &["b"]);
        let pipeline = Pipeline::new(vec![step], &["a"], &[]);
        let mut doc = Document::new();

        pipeline.process_on_doc(&mut doc, vec![seed()], None).unwrap();

        let derived = doc.annotations_by_label("derived");
        assert_eq!(derived.len(), 1);
        assert_eq!(doc.annotations_by_key("b").len(), 1);
        // the seed input is not attached, only step outputs are
        assert!(doc.annotations_by_label("seed").is_empty());
    }

    #[test]
    fn empty_output_key_list_returns_nothing() {
        let step = PipelineStep::new(Arc::new(Relabel::new("derived")), &["a"], &["b"]);
        let pipeline = Pipeline::new(vec![step], &["a"], &[]);
        let outputs = pipeline.process(&Store::new(), vec![seed()], None).unwrap();
        assert!(outputs.is_empty());
    }
}
