//! FILENAME: src/pipeline.rs
//! The pivot pipeline container and executor.
//!
//! A `PivotTable` owns a source dataset and an ordered list of steps, and
//! folds the steps over a single root group wrapping the whole dataset.
//! Steps persist across `transform` calls: transforming is a pure read of
//! the pipeline, so the same pipeline can be re-run against new data.

use std::sync::Arc;

use crate::group::{Group, Row};
use crate::step::Step;

/// A composable pivot/aggregation pipeline over tabular row data.
///
/// Build one over a dataset, push filter/group/aggregate steps, then call
/// [`PivotTable::transform`] to obtain the final list of groups, each
/// annotated with its summaries.
#[derive(Debug, Clone, Default)]
pub struct PivotTable {
    data: Vec<Arc<Row>>,
    steps: Vec<Step>,
}

impl PivotTable {
    /// Creates an empty pipeline; data can be supplied later via
    /// [`PivotTable::set_data`] or per call via [`PivotTable::transform_data`].
    pub fn new() -> Self {
        PivotTable::default()
    }

    /// Creates a pipeline over a dataset. Rows are wrapped in `Arc` once
    /// here and shared by every group the pipeline produces.
    pub fn with_data(data: Vec<Row>) -> Self {
        PivotTable {
            data: data.into_iter().map(Arc::new).collect(),
            steps: Vec::new(),
        }
    }

    /// Replaces the stored dataset.
    pub fn set_data(&mut self, data: Vec<Row>) {
        self.data = data.into_iter().map(Arc::new).collect();
    }

    /// Appends one transformation step.
    pub fn push(&mut self, step: Step) {
        self.steps.push(step);
    }

    /// Appends several transformation steps in order.
    pub fn push_all(&mut self, steps: impl IntoIterator<Item = Step>) {
        self.steps.extend(steps);
    }

    /// Number of steps currently in the pipeline.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Runs the pipeline against the stored dataset.
    ///
    /// The working state starts as a single root group (empty key, all
    /// rows, no summaries); each step is folded over it in push order.
    /// With no steps this returns the root group unchanged. Never fails:
    /// all validation happened when the steps were constructed.
    pub fn transform(&self) -> Vec<Group> {
        self.run(self.data.clone())
    }

    /// Runs the pipeline against call-time data, ignoring the stored
    /// dataset.
    pub fn transform_data(&self, data: Vec<Row>) -> Vec<Group> {
        self.run(data.into_iter().map(Arc::new).collect())
    }

    fn run(&self, rows: Vec<Arc<Row>>) -> Vec<Group> {
        log::debug!(
            "pivot transform: {} steps over {} rows",
            self.steps.len(),
            rows.len()
        );

        let mut groups = vec![Group::root(rows)];
        for step in &self.steps {
            groups = step.apply(groups);
        }

        log::trace!("pivot transform produced {} groups", groups.len());
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::FilterSpec;
    use serde_json::json;

    fn sales_rows() -> Vec<Row> {
        vec![
            json!({"region": "north", "product": "apples", "sales": "1.5"}),
            json!({"region": "south", "product": "apples", "sales": "2.25"}),
            json!({"region": "north", "product": "pears", "sales": "3"}),
            json!({"region": "south", "product": "pears", "sales": "na"}),
        ]
    }

    #[test]
    fn test_no_steps_returns_root_passthrough() {
        let pivot = PivotTable::with_data(sales_rows());
        let groups = pivot.transform();

        assert_eq!(groups.len(), 1);
        assert!(groups[0].key.is_empty());
        assert_eq!(groups[0].items.len(), 4);
        assert!(groups[0].summaries.is_empty());
    }

    #[test]
    fn test_transform_is_repeatable() {
        // Steps persist: a second transform with no intervening push yields
        // the same result as the first.
        let mut pivot = PivotTable::with_data(sales_rows());
        pivot.push(Step::group_items("region").unwrap());
        pivot.push(Step::aggregate("product", "sales", "sum").unwrap());

        let first = pivot.transform();
        let second = pivot.transform();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].summaries.len(), 1);
    }

    #[test]
    fn test_exclude_filter_then_group() {
        let mut pivot = PivotTable::with_data(sales_rows());
        pivot.push_all([
            Step::filter_items("region", FilterSpec::exclude(vec![json!("south")])).unwrap(),
            Step::group_items("region").unwrap(),
        ]);

        let groups = pivot.transform();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].key.get("region"), Some(&json!("north")));
        assert_eq!(groups[0].items.len(), 2);
    }

    #[test]
    fn test_group_then_aggregate_chain() {
        let mut pivot = PivotTable::with_data(sales_rows());
        pivot.push(Step::group_items("region").unwrap());
        pivot.push(Step::aggregate("product", "sales", "sum").unwrap());

        let groups = pivot.transform();
        assert_eq!(groups.len(), 2);

        let north = &groups[0];
        assert_eq!(north.key.get("region"), Some(&json!("north")));
        let summary = &north.summaries[0];
        assert_eq!(summary.series.len(), 2);
        assert_eq!(summary.series[0].label, json!("apples"));
        assert_eq!(summary.series[0].value, 1.5);
        assert_eq!(summary.series[1].label, json!("pears"));
        assert_eq!(summary.series[1].value, 3.0);

        // South's pears are all null-like: only one series entry.
        let south = &groups[1];
        assert_eq!(south.summaries[0].series.len(), 1);
        assert_eq!(south.summaries[0].series[0].label, json!("apples"));
    }

    #[test]
    fn test_transform_data_overrides_stored_dataset() {
        let mut pivot = PivotTable::with_data(sales_rows());
        pivot.push(Step::group_items("region").unwrap());

        let groups = pivot.transform_data(vec![json!({"region": "east"})]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].key.get("region"), Some(&json!("east")));

        // Stored data untouched.
        assert_eq!(pivot.transform().len(), 2);
    }

    #[test]
    fn test_transform_without_data_yields_empty_root() {
        let pivot = PivotTable::new();
        let groups = pivot.transform();
        assert_eq!(groups.len(), 1);
        assert!(groups[0].items.is_empty());
    }

    #[test]
    fn test_source_rows_never_mutated() {
        let original = sales_rows();
        let mut pivot = PivotTable::with_data(original.clone());
        pivot.push(Step::filter_items("region", FilterSpec::include(vec![json!("north")])).unwrap());
        pivot.push(Step::group_items("product").unwrap());
        pivot.push(Step::aggregate("product", "sales", "sum").unwrap());
        let _ = pivot.transform();
        let _ = pivot.transform();

        // The stored rows, shared with every produced group, are unchanged.
        assert_eq!(pivot.data.len(), original.len());
        for (row, source) in pivot.data.iter().zip(original.iter()) {
            assert_eq!(&**row, source);
        }
    }
}
