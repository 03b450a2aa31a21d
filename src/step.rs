//! FILENAME: src/step.rs
//! Pipeline steps: filtering, grouping and aggregation.
//!
//! The original closure-array design is replaced by a tagged step list
//! interpreted by a single `apply` dispatcher. Each step is a pure function
//! from a list of groups to a list of groups; all argument validation
//! happens in the constructors, so applying a step can never fail.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PivotError;
use crate::group::{Group, GroupKey, Row, SeriesPoint, Summary};
use crate::value::{
    coerce_number, get_path, is_null_like, max_decimal_places, partition_by, round_to,
    validate_field_path, MAX_DECIMAL_PLACES,
};

// ============================================================================
// FILTER CONFIGURATION
// ============================================================================

/// Whether a membership filter keeps or removes matching values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    Include,
    Exclude,
}

/// An inclusion/exclusion list filter over the value at a field path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub kind: FilterKind,
    pub values: Vec<Value>,
}

impl FilterSpec {
    pub fn include(values: Vec<Value>) -> Self {
        FilterSpec {
            kind: FilterKind::Include,
            values,
        }
    }

    pub fn exclude(values: Vec<Value>) -> Self {
        FilterSpec {
            kind: FilterKind::Exclude,
            values,
        }
    }

    /// Membership test against the looked-up value. A missing path
    /// participates as JSON null, so it fails an include test unless null
    /// itself is listed.
    fn matches(&self, value: Option<&Value>) -> bool {
        let value = value.unwrap_or(&Value::Null);
        let listed = self.values.iter().any(|candidate| candidate == value);
        match self.kind {
            FilterKind::Include => listed,
            FilterKind::Exclude => !listed,
        }
    }
}

// ============================================================================
// PREDICATES
// ============================================================================

type RowPredicateFn = Arc<dyn Fn(&Row) -> bool + Send + Sync>;
type KeyPredicateFn = Arc<dyn Fn(&GroupKey) -> bool + Send + Sync>;

/// Per-row predicate: a custom function or a field membership filter,
/// resolved once at step construction.
#[derive(Clone)]
enum RowPredicate {
    Func(RowPredicateFn),
    Members { field: String, spec: FilterSpec },
}

impl RowPredicate {
    fn test(&self, row: &Row) -> bool {
        match self {
            RowPredicate::Func(func) => func(row),
            RowPredicate::Members { field, spec } => spec.matches(get_path(row, field)),
        }
    }
}

impl fmt::Debug for RowPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowPredicate::Func(_) => f.write_str("RowPredicate::Func(..)"),
            RowPredicate::Members { field, spec } => f
                .debug_struct("RowPredicate::Members")
                .field("field", field)
                .field("spec", spec)
                .finish(),
        }
    }
}

/// Per-group predicate, applied to the group's key.
#[derive(Clone)]
enum KeyPredicate {
    Func(KeyPredicateFn),
    Members { field: String, spec: FilterSpec },
}

impl KeyPredicate {
    fn test(&self, key: &GroupKey) -> bool {
        match self {
            KeyPredicate::Func(func) => func(key),
            KeyPredicate::Members { field, spec } => spec.matches(key.get(field)),
        }
    }
}

impl fmt::Debug for KeyPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPredicate::Func(_) => f.write_str("KeyPredicate::Func(..)"),
            KeyPredicate::Members { field, spec } => f
                .debug_struct("KeyPredicate::Members")
                .field("field", field)
                .field("spec", spec)
                .finish(),
        }
    }
}

// ============================================================================
// AGGREGATION
// ============================================================================

type AggregateFn = Arc<dyn Fn(&[f64]) -> f64 + Send + Sync>;

/// Aggregation functions for summary series.
///
/// Built-ins match the names accepted by [`Aggregation::parse`]; `Custom`
/// carries a caller-supplied function together with the name recorded in
/// the resulting [`Summary`].
#[derive(Clone)]
pub enum Aggregation {
    Sum,
    Avg,
    Min,
    Max,
    Count,
    CountDistinct,
    Custom { name: String, func: AggregateFn },
}

impl Aggregation {
    /// Resolves a built-in aggregation by name (case-insensitive):
    /// `sum | avg | min | max | count | countd`.
    pub fn parse(name: &str) -> Result<Self, PivotError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "sum" => Ok(Aggregation::Sum),
            "avg" => Ok(Aggregation::Avg),
            "min" => Ok(Aggregation::Min),
            "max" => Ok(Aggregation::Max),
            "count" => Ok(Aggregation::Count),
            "countd" => Ok(Aggregation::CountDistinct),
            _ => Err(PivotError::UnknownAggregation(name.to_string())),
        }
    }

    /// Wraps a caller-supplied aggregation function.
    pub fn custom<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&[f64]) -> f64 + Send + Sync + 'static,
    {
        Aggregation::Custom {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    /// The name recorded in summaries produced with this aggregation.
    pub fn name(&self) -> &str {
        match self {
            Aggregation::Sum => "sum",
            Aggregation::Avg => "avg",
            Aggregation::Min => "min",
            Aggregation::Max => "max",
            Aggregation::Count => "count",
            Aggregation::CountDistinct => "countd",
            Aggregation::Custom { name, .. } => name,
        }
    }

    /// Applies the function to one partition's surviving inputs.
    ///
    /// `survivors` are the raw values that passed the null-like filter;
    /// `numbers` is their numerically-coercible subset. Counting functions
    /// work on survivors (so e.g. distinct text values can be counted);
    /// the numeric functions need at least one coercible value. `None`
    /// means the partition produces no series entry.
    fn apply(&self, survivors: &[&Value], numbers: &[f64]) -> Option<f64> {
        match self {
            Aggregation::Count => Some(survivors.len() as f64),
            Aggregation::CountDistinct => Some(distinct_count(survivors) as f64),
            _ if numbers.is_empty() => None,
            Aggregation::Sum => Some(numbers.iter().sum()),
            Aggregation::Avg => Some(numbers.iter().sum::<f64>() / numbers.len() as f64),
            Aggregation::Min => Some(numbers.iter().copied().fold(f64::INFINITY, f64::min)),
            Aggregation::Max => Some(numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
            Aggregation::Custom { func, .. } => Some(func(numbers)),
        }
    }
}

impl fmt::Debug for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregation::Custom { name, .. } => write!(f, "Aggregation::Custom({:?})", name),
            other => write!(f, "Aggregation::{}", other.name()),
        }
    }
}

/// Distinct count over raw survivors. Values that coerce to the same
/// number are identical (the string "2" matches the number 2, -0.0 matches
/// 0.0); everything else is compared by its JSON form.
fn distinct_count(survivors: &[&Value]) -> usize {
    let mut seen: FxHashSet<String> = FxHashSet::default();
    survivors
        .iter()
        .copied()
        .filter(|value| {
            let key = match coerce_number(Some(*value)) {
                Some(n) => {
                    let canonical = if n == 0.0 { 0.0f64 } else { n };
                    format!("n:{}", canonical.to_bits())
                }
                None => value.to_string(),
            };
            seen.insert(key)
        })
        .count()
}

// ============================================================================
// STEP
// ============================================================================

/// One pipeline transformation from a list of groups to a list of groups.
///
/// Built through the constructors below; malformed arguments fail here,
/// once, rather than per group during `transform`.
#[derive(Debug, Clone)]
pub struct Step {
    kind: StepKind,
}

#[derive(Debug, Clone)]
enum StepKind {
    FilterItems(RowPredicate),
    FilterGroups(KeyPredicate),
    GroupItems {
        field: String,
    },
    Aggregate {
        label_field: String,
        value_field: String,
        aggregation: Aggregation,
    },
}

impl Step {
    /// Filters rows within each group by a membership list on `field`.
    /// Group count, order and keys are unchanged; a group whose rows are
    /// all removed stays in the output with empty items.
    pub fn filter_items(field: impl Into<String>, filter: FilterSpec) -> Result<Self, PivotError> {
        let field = field.into();
        validate_field_path(&field)?;
        Ok(Step {
            kind: StepKind::FilterItems(RowPredicate::Members { field, spec: filter }),
        })
    }

    /// Filters rows within each group by a custom predicate.
    pub fn filter_items_with<F>(predicate: F) -> Self
    where
        F: Fn(&Row) -> bool + Send + Sync + 'static,
    {
        Step {
            kind: StepKind::FilterItems(RowPredicate::Func(Arc::new(predicate))),
        }
    }

    /// Removes whole groups whose key value at `field` fails a membership
    /// list. Same predicate contract as [`Step::filter_items`], applied to
    /// the group key instead of individual rows.
    pub fn filter_groups(field: impl Into<String>, filter: FilterSpec) -> Result<Self, PivotError> {
        let field = field.into();
        validate_field_path(&field)?;
        Ok(Step {
            kind: StepKind::FilterGroups(KeyPredicate::Members { field, spec: filter }),
        })
    }

    /// Removes whole groups by a custom predicate on the group key.
    pub fn filter_groups_with<F>(predicate: F) -> Self
    where
        F: Fn(&GroupKey) -> bool + Send + Sync + 'static,
    {
        Step {
            kind: StepKind::FilterGroups(KeyPredicate::Func(Arc::new(predicate))),
        }
    }

    /// Subdivides each group into one child per distinct value of `field`,
    /// in first-seen order. Child keys extend the parent key; summaries do
    /// not carry over. Every emitted child holds at least one row.
    pub fn group_items(field: impl Into<String>) -> Result<Self, PivotError> {
        let field = field.into();
        validate_field_path(&field)?;
        Ok(Step {
            kind: StepKind::GroupItems { field },
        })
    }

    /// Computes one numeric summary per group, labeled by the distinct
    /// values of `label_field` and aggregating the values of `value_field`
    /// with a built-in function named by `kind`.
    pub fn aggregate(
        label_field: impl Into<String>,
        value_field: impl Into<String>,
        kind: &str,
    ) -> Result<Self, PivotError> {
        Self::aggregate_with(label_field, value_field, Aggregation::parse(kind)?)
    }

    /// Like [`Step::aggregate`] but with a prebuilt [`Aggregation`],
    /// including custom functions.
    pub fn aggregate_with(
        label_field: impl Into<String>,
        value_field: impl Into<String>,
        aggregation: Aggregation,
    ) -> Result<Self, PivotError> {
        let label_field = label_field.into();
        let value_field = value_field.into();
        validate_field_path(&label_field)?;
        validate_field_path(&value_field)?;
        Ok(Step {
            kind: StepKind::Aggregate {
                label_field,
                value_field,
                aggregation,
            },
        })
    }

    /// Applies this step to an owned group list.
    pub(crate) fn apply(&self, groups: Vec<Group>) -> Vec<Group> {
        match &self.kind {
            StepKind::FilterItems(predicate) => groups
                .into_iter()
                .map(|mut group| {
                    group.items.retain(|row| predicate.test(row));
                    group
                })
                .collect(),
            StepKind::FilterGroups(predicate) => groups
                .into_iter()
                .filter(|group| predicate.test(&group.key))
                .collect(),
            StepKind::GroupItems { field } => apply_group_items(groups, field),
            StepKind::Aggregate {
                label_field,
                value_field,
                aggregation,
            } => groups
                .into_iter()
                .map(|group| apply_aggregate(group, label_field, value_field, aggregation))
                .collect(),
        }
    }
}

// ============================================================================
// STEP SEMANTICS
// ============================================================================

/// Splits every group into children keyed by `field`. The parents' own
/// items and summaries are discarded; output order is parent order, then
/// first-seen child order within each parent.
fn apply_group_items(groups: Vec<Group>, field: &str) -> Vec<Group> {
    let mut result = Vec::new();
    for group in groups {
        for (value, items) in partition_by(&group.items, field) {
            result.push(Group {
                key: group.key.child(field, value),
                items,
                summaries: Vec::new(),
            });
        }
    }
    result
}

/// Computes one summary for a group and appends it. Partitions whose
/// inputs are all null-like produce no series entry; the rounding
/// precision is shared across the whole group's series.
fn apply_aggregate(
    mut group: Group,
    label_field: &str,
    value_field: &str,
    aggregation: &Aggregation,
) -> Group {
    let mut series = Vec::new();
    let mut decimal_places = 0;

    for (label, items) in partition_by(&group.items, label_field) {
        let survivors: Vec<&Value> = items
            .iter()
            .map(|row| get_path(row, value_field))
            .filter(|value| !is_null_like(*value))
            .flatten()
            .collect();
        if survivors.is_empty() {
            continue;
        }
        let numbers: Vec<f64> = survivors
            .iter()
            .filter_map(|value| coerce_number(Some(*value)))
            .collect();
        let Some(value) = aggregation.apply(&survivors, &numbers) else {
            continue;
        };
        // Cap the aggregated precision to the max precision of the inputs.
        decimal_places = decimal_places.max(max_decimal_places(&numbers));
        series.push(SeriesPoint { label, value });
    }

    let decimal_places = decimal_places.min(MAX_DECIMAL_PLACES);
    for point in &mut series {
        point.value = round_to(point.value, decimal_places);
    }

    group.summaries.push(Summary {
        kind: aggregation.name().to_string(),
        label_field: label_field.to_string(),
        value_field: value_field.to_string(),
        decimal_places,
        series,
    });
    group
}
