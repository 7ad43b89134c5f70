//! The operation contract
//!
//! An operation is a pluggable unit of processing consuming and producing
//! groups of arena ids. It reads its inputs from the store, writes any
//! items it creates into the store, and reports every derived item to the
//! provenance tracer when one is supplied. The tracer arrives as an
//! explicit parameter on every invocation, never as ambient state.

use crate::model::{ItemId, Metadata};
use crate::prov::ProvTracer;
use crate::store::{Store, StoreError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors from operation processing.
///
/// The pipeline propagates these unmodified: no retry, no rollback of
/// annotations already attached by earlier steps in the same run.
#[derive(Debug, Error)]
pub enum OperationError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("wrong number of input groups: expected {expected}, got {got}")]
    InputArity { expected: usize, got: usize },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("operation error: {0}")]
    Internal(String),
}

/// An operation's self-description.
///
/// Used verbatim as `op_desc` in provenance records, so two operations
/// configured differently compare unequal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpDescription {
    /// Human-readable operation name
    pub name: String,
    /// Configuration parameters the operation was constructed with
    #[serde(default)]
    pub config: Metadata,
}

impl OpDescription {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: Metadata::new(),
        }
    }

    /// Add a configuration entry
    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }
}

impl std::fmt::Display for OpDescription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// The contract operations implement.
///
/// `process` must accept exactly as many input groups as the wrapping
/// step declares input keys, and return exactly as many output groups as
/// it declares output keys. Each group is an ordered sequence of arena
/// ids; output items must already be in the store when they are returned.
pub trait Operation: Send + Sync {
    /// The operation's self-description
    fn description(&self) -> &OpDescription;

    /// Process input groups into output groups
    fn process(
        &self,
        store: &Store,
        inputs: &[Vec<ItemId>],
        tracer: Option<&ProvTracer>,
    ) -> Result<Vec<Vec<ItemId>>, OperationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptions_compare_by_name_and_config() {
        let a = OpDescription::new("propagator").with_config("attr_labels", "is_family");
        let b = OpDescription::new("propagator").with_config("attr_labels", "is_family");
        let c = OpDescription::new("propagator").with_config("attr_labels", "is_negated");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
