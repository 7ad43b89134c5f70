//! Classification metrics over document-level attributes
//!
//! Compares an attribute's value between a reference document list and a
//! predicted document list, pairing documents positionally. The document
//! value is the first attribute carrying the configured label across the
//! document's annotations, in membership order.

use crate::document::Document;
use crate::model::ItemId;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors from metric computation
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("reference and predicted document counts differ: {reference} vs {predicted}")]
    LengthMismatch { reference: usize, predicted: usize },

    #[error("document {0} has no attribute labeled \"{1}\"")]
    MissingAttribute(ItemId, String),

    #[error("documents at position {0} do not carry the same \"{1}\" metadata entry")]
    PairMismatch(usize, String),
}

/// Per-class precision/recall/F1
#[derive(Debug, Clone, PartialEq)]
pub struct ValueMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Number of reference documents with this value
    pub support: usize,
}

/// Macro-averaged classification report
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub accuracy: f64,
    /// Number of document pairs evaluated
    pub support: usize,
    /// Per-value breakdown, keyed by the attribute value's string form
    pub per_value: BTreeMap<String, ValueMetrics>,
}

/// Evaluator comparing a document-level attribute between reference and
/// predicted documents.
#[derive(Debug, Clone)]
pub struct ClassificationEvaluator {
    attr_label: String,
    /// Optional metadata entry that must match between paired documents
    /// (guards against misaligned lists)
    metadata_key: Option<String>,
}

impl ClassificationEvaluator {
    pub fn new(attr_label: impl Into<String>) -> Self {
        Self {
            attr_label: attr_label.into(),
            metadata_key: None,
        }
    }

    /// Require paired documents to agree on this metadata entry
    pub fn with_metadata_key(mut self, key: impl Into<String>) -> Self {
        self.metadata_key = Some(key.into());
        self
    }

    /// Compute the macro-averaged classification report.
    ///
    /// Documents are paired positionally; `reference` and `predicted` must
    /// have the same length.
    pub fn evaluate(
        &self,
        reference: &[Document],
        predicted: &[Document],
    ) -> Result<ClassificationReport, MetricsError> {
        if reference.len() != predicted.len() {
            return Err(MetricsError::LengthMismatch {
                reference: reference.len(),
                predicted: predicted.len(),
            });
        }

        let mut pairs = Vec::with_capacity(reference.len());
        for (position, (true_doc, pred_doc)) in reference.iter().zip(predicted).enumerate() {
            if let Some(key) = &self.metadata_key {
                if true_doc.metadata().extra.get(key) != pred_doc.metadata().extra.get(key) {
                    return Err(MetricsError::PairMismatch(position, key.clone()));
                }
            }
            pairs.push((self.doc_value(true_doc)?, self.doc_value(pred_doc)?));
        }

        let mut classes: Vec<&String> = pairs
            .iter()
            .flat_map(|(t, p)| [t, p])
            .collect();
        classes.sort();
        classes.dedup();

        let mut per_value = BTreeMap::new();
        for class in classes {
            let tp = pairs.iter().filter(|(t, p)| t == class && p == class).count();
            let fp = pairs.iter().filter(|(t, p)| t != class && p == class).count();
            let fn_ = pairs.iter().filter(|(t, p)| t == class && p != class).count();

            let precision = ratio(tp, tp + fp);
            let recall = ratio(tp, tp + fn_);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            per_value.insert(
                class.clone(),
                ValueMetrics {
                    precision,
                    recall,
                    f1,
                    support: tp + fn_,
                },
            );
        }

        let class_count = per_value.len().max(1) as f64;
        let correct = pairs.iter().filter(|(t, p)| t == p).count();
        Ok(ClassificationReport {
            precision: per_value.values().map(|m| m.precision).sum::<f64>() / class_count,
            recall: per_value.values().map(|m| m.recall).sum::<f64>() / class_count,
            f1: per_value.values().map(|m| m.f1).sum::<f64>() / class_count,
            accuracy: ratio(correct, pairs.len()),
            support: pairs.len(),
            per_value,
        })
    }

    /// The document's value: first attribute with the configured label
    /// across its annotations, in membership order.
    fn doc_value(&self, doc: &Document) -> Result<String, MetricsError> {
        for ann in doc.annotations() {
            if let Some(attr) = ann.attrs_by_label(&self.attr_label).first() {
                return Ok(attr
                    .value
                    .as_ref()
                    .map(|v| v.to_string())
                    .unwrap_or_default());
            }
        }
        Err(MetricsError::MissingAttribute(
            doc.id(),
            self.attr_label.clone(),
        ))
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
