//! FILENAME: src/group.rs
//! The data model threaded through the pipeline.
//!
//! A `Group` is a bucket of rows sharing a common key path, plus any
//! summaries attached by aggregation steps. These structures are designed
//! to be:
//! - Serializable (handed to downstream chart/presentation consumers)
//! - Cheap to rebuild (rows are shared via `Arc`, never deep-copied)
//! - Immutable snapshots between steps (a step never retroactively alters
//!   the group list produced by an earlier step)

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use smallvec::SmallVec;

/// A single source record. Opaque to the pipeline except for fields
/// addressed by dotted path (see `value::get_path`).
pub type Row = Value;

// ============================================================================
// GROUP KEY
// ============================================================================

/// One grouping level: the field that was grouped on and the value that
/// produced this group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyPart {
    pub field: String,
    pub value: Value,
}

/// Ordered grouping key, one entry per `group_items` application.
///
/// Empty for the root group. Insertion order is the order the grouping
/// steps were applied, which downstream consumers rely on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupKey(SmallVec<[KeyPart; 2]>);

impl GroupKey {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Looks up the key value recorded for a field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0
            .iter()
            .find(|part| part.field == field)
            .map(|part| &part.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyPart> {
        self.0.iter()
    }

    /// Extends this key with one more grouping level.
    pub(crate) fn child(&self, field: &str, value: Value) -> Self {
        let mut parts = self.0.clone();
        parts.push(KeyPart {
            field: field.to_string(),
            value,
        });
        GroupKey(parts)
    }
}

// ============================================================================
// SERIES & SUMMARY
// ============================================================================

/// One point of an aggregated series. The `{label, value}` shape is the
/// contract consumed by downstream presentation code.
///
/// Labels keep their original JSON type: a numeric label field yields
/// numeric labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub label: Value,
    pub value: f64,
}

/// The output of one aggregation step applied to one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Name of the aggregation function used (built-in or custom).
    pub kind: String,

    /// Field path whose distinct values label the series.
    pub label_field: String,

    /// Field path the numeric inputs were read from.
    pub value_field: String,

    /// Shared rounding precision applied to every series value, derived
    /// from the surviving numeric inputs of the whole group.
    pub decimal_places: usize,

    /// One entry per distinct label value with at least one surviving
    /// input, in first-seen order.
    pub series: Vec<SeriesPoint>,
}

// ============================================================================
// GROUP
// ============================================================================

/// The core unit threaded through the pipeline: a keyed bucket of rows with
/// accumulated summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    /// Accumulated grouping key (empty for the root group).
    pub key: GroupKey,

    /// Member rows, shared with the source dataset.
    pub items: Vec<Arc<Row>>,

    /// Summaries attached by aggregation steps; append-only.
    pub summaries: Vec<Summary>,
}

impl Group {
    /// The root group wrapping a whole dataset before any grouping step.
    pub(crate) fn root(items: Vec<Arc<Row>>) -> Self {
        Group {
            key: GroupKey::default(),
            items,
            summaries: Vec::new(),
        }
    }
}
