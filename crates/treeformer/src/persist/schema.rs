//! Schema types for tree serialization.
//!
//! A tree is stored as nested node objects; an ensemble is a JSON array of
//! root nodes. These types mirror the wire format and are kept apart from the
//! runtime arena in [`crate::repr`], so the format can be validated on read
//! and the arena can change freely.
//!
//! Unknown fields are ignored. Probability tables use string keys holding
//! the decimal token id, and a `BTreeMap` for deterministic output.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Token id (as a decimal string) -> probability.
pub type ClassProbsSchema = BTreeMap<String, f64>;

/// One node of a persisted tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_true: Option<Box<NodeSchema>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_false: Option<Box<NodeSchema>>,

    #[serde(default)]
    pub lookback: i32,

    #[serde(default)]
    pub compare: u16,

    #[serde(default)]
    pub dynamic_lookback: bool,

    #[serde(default)]
    pub relative_lookback: bool,

    /// Absent when the branch was never visited during estimation.
    #[serde(rename = "classProbs_true", default, skip_serializing_if = "Option::is_none")]
    pub class_probs_true: Option<ClassProbsSchema>,

    #[serde(rename = "classProbs_false", default, skip_serializing_if = "Option::is_none")]
    pub class_probs_false: Option<ClassProbsSchema>,
}

impl NodeSchema {
    pub fn child(&self, branch: bool) -> Option<&NodeSchema> {
        if branch {
            self.child_true.as_deref()
        } else {
            self.child_false.as_deref()
        }
    }
}

/// Persisted ensemble: one root node per tree.
pub type EnsembleSchema = Vec<NodeSchema>;
