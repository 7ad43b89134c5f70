//! Rule-based text normalization
//!
//! Produces, for each input text-span annotation, a derived copy with
//! replacement rules applied to its text. Derived annotations keep their
//! source spans so downstream span arithmetic still targets the original
//! content.

use crate::model::{Annotation, ItemId};
use crate::pipeline::{OpDescription, Operation, OperationError};
use crate::prov::ProvTracer;
use crate::store::{DataItem, Store};

/// A single replacement rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizerRule {
    pub pattern: String,
    pub replacement: String,
}

impl NormalizerRule {
    pub fn new(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            replacement: replacement.into(),
        }
    }
}

/// Ligature replacements commonly needed in French clinical text
pub fn ligature_rules() -> Vec<NormalizerRule> {
    [
        ("\u{00C6}", "AE"),
        ("\u{00E6}", "ae"),
        ("\u{0152}", "OE"),
        ("\u{0153}", "oe"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| NormalizerRule::new(pattern, replacement))
    .collect()
}

/// Operation applying replacement rules to text-span annotations.
///
/// Consumes one group of text-span annotations, produces one group of
/// normalized copies under `output_label`.
pub struct Normalizer {
    output_label: String,
    rules: Vec<NormalizerRule>,
    description: OpDescription,
}

impl Normalizer {
    pub fn new(output_label: impl Into<String>, rules: Vec<NormalizerRule>) -> Self {
        let output_label = output_label.into();
        let description = OpDescription::new("normalizer")
            .with_config("output_label", output_label.clone())
            .with_config(
                "rules",
                serde_json::json!(rules
                    .iter()
                    .map(|r| [r.pattern.clone(), r.replacement.clone()])
                    .collect::<Vec<_>>()),
            );
        Self {
            output_label,
            rules,
            description,
        }
    }

    fn apply_rules(&self, text: &str) -> String {
        let mut normalized = text.to_string();
        for rule in &self.rules {
            normalized = normalized.replace(&rule.pattern, &rule.replacement);
        }
        normalized
    }
}

impl Operation for Normalizer {
    fn description(&self) -> &OpDescription {
        &self.description
    }

    fn process(
        &self,
        store: &Store,
        inputs: &[Vec<ItemId>],
        tracer: Option<&ProvTracer>,
    ) -> Result<Vec<Vec<ItemId>>, OperationError> {
        if inputs.len() != 1 {
            return Err(OperationError::InputArity {
                expected: 1,
                got: inputs.len(),
            });
        }

        let mut out = Vec::with_capacity(inputs[0].len());
        for uid in &inputs[0] {
            let source = store.get_annotation(uid).ok_or_else(|| {
                OperationError::InvalidInput(format!("{uid} is not a stored annotation"))
            })?;
            let (text, spans) = match (source.text(), source.spans()) {
                (Some(text), Some(spans)) => (text, spans.to_vec()),
                _ => {
                    return Err(OperationError::InvalidInput(format!(
                        "annotation {uid} is not a text span"
                    )))
                }
            };

            let derived =
                Annotation::text_span(&self.output_label, self.apply_rules(text), spans);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Span;

    #[test]
    fn ligatures_are_replaced() {
        let store = Store::new();
        let segment = Annotation::text_span(
            "raw_text",
            "\u{0153}d\u{00E8}me du c\u{0153}ur",
            vec![Span::new(0, 13)],
        );
        let uid = segment.uid;
        store.insert(segment).unwrap();

        let normalizer = Normalizer::new("normalized_text", ligature_rules());
        let outputs = normalizer.process(&store, &[vec![uid]], None).unwrap();

        assert_eq!(outputs.len(), 1);
        let derived = store.get_annotation(&outputs[0][0]).unwrap();
        assert_eq!(derived.label, "normalized_text");
        assert_eq!(derived.text(), Some("oed\u{00E8}me du coeur"));
        // source spans are carried over
        assert_eq!(derived.spans(), Some(&[Span::new(0, 13)][..]));
    }

    #[test]
    fn provenance_links_each_copy_to_its_source() {
        let store = Store::new();
        let tracer = ProvTracer::new();
        let segment = Annotation::text_span("raw_text", "\u{00C6}on", vec![Span::new(0, 3)]);
        let source_uid = segment.uid;
        store.insert(segment).unwrap();

        let normalizer = Normalizer::new("normalized_text", ligature_rules());
        let outputs = normalizer
            .process(&store, &[vec![source_uid]], Some(&tracer))
            .unwrap();

        let prov = tracer.get_prov(&outputs[0][0]).unwrap();
        assert_eq!(prov.op_desc, *normalizer.description());
        assert_eq!(prov.source_data_items.len(), 1);
        assert_eq!(prov.source_data_items[0].uid(), source_uid);
    }

    #[test]
    fn generic_annotations_are_rejected() {
        let store = Store::new();
        let ann = Annotation::new("not_text");
        let uid = ann.uid;
        store.insert(ann).unwrap();

        let normalizer = Normalizer::new("normalized_text", ligature_rules());
        let err = normalizer.process(&store, &[vec![uid]], None).unwrap_err();
        assert!(matches!(err, OperationError::InvalidInput(_)));
    }
}
