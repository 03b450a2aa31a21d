//! FILENAME: tests/test_pipeline.rs
//! Integration tests for full pivot pipelines: filter -> group -> aggregate
//! chains and the series contract consumed by downstream charts.

use pivot_table::{Aggregation, FilterSpec, PivotTable, Step};
use serde_json::{json, Value};

// ============================================================================
// FIXTURES
// ============================================================================

/// Quarterly sales records, including the null-like value markers that show
/// up in real exported data.
fn sales_data() -> Vec<Value> {
    vec![
        json!({"region": "north", "product": "apples", "quarter": "Q1", "sales": "120.5"}),
        json!({"region": "north", "product": "pears",  "quarter": "Q1", "sales": "80"}),
        json!({"region": "south", "product": "apples", "quarter": "Q1", "sales": "200.25"}),
        json!({"region": "south", "product": "pears",  "quarter": "Q1", "sales": "na"}),
        json!({"region": "north", "product": "apples", "quarter": "Q2", "sales": "99.5"}),
        json!({"region": "south", "product": "apples", "quarter": "Q2", "sales": "-"}),
        json!({"region": "west",  "product": "pears",  "quarter": "Q2", "sales": "310"}),
    ]
}

// ============================================================================
// END-TO-END PIPELINES
// ============================================================================

#[test]
fn test_group_by_region_sum_by_product() {
    let mut pivot = PivotTable::with_data(sales_data());
    pivot.push(Step::group_items("region").unwrap());
    pivot.push(Step::aggregate("product", "sales", "sum").unwrap());

    let groups = pivot.transform();
    assert_eq!(groups.len(), 3);

    let north = &groups[0];
    assert_eq!(north.key.get("region"), Some(&json!("north")));
    let series = &north.summaries[0].series;
    assert_eq!(series[0].label, json!("apples"));
    assert_eq!(series[0].value, 220.0);
    assert_eq!(series[1].label, json!("pears"));
    assert_eq!(series[1].value, 80.0);

    // South pears are all null-like; the partition emits no entry.
    let south = &groups[1];
    let series = &south.summaries[0].series;
    assert_eq!(series.len(), 1);
    assert_eq!(series[0].label, json!("apples"));
    assert_eq!(series[0].value, 200.25);
}

#[test]
fn test_filter_group_aggregate_chain() {
    let mut pivot = PivotTable::with_data(sales_data());
    pivot.push_all([
        Step::filter_items("quarter", FilterSpec::include(vec![json!("Q1")])).unwrap(),
        Step::group_items("region").unwrap(),
        Step::aggregate("product", "sales", "count").unwrap(),
    ]);

    let groups = pivot.transform();
    assert_eq!(groups.len(), 2); // west has no Q1 rows, so no group

    assert_eq!(groups[0].key.get("region"), Some(&json!("north")));
    assert_eq!(groups[0].summaries[0].series.len(), 2);
    assert_eq!(groups[1].key.get("region"), Some(&json!("south")));
}

#[test]
fn test_filter_groups_after_grouping() {
    let mut pivot = PivotTable::with_data(sales_data());
    pivot.push_all([
        Step::group_items("region").unwrap(),
        Step::filter_groups("region", FilterSpec::include(vec![json!("west")])).unwrap(),
        Step::aggregate("quarter", "sales", "max").unwrap(),
    ]);

    let groups = pivot.transform();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].key.get("region"), Some(&json!("west")));
    assert_eq!(groups[0].summaries[0].series[0].value, 310.0);
}

#[test]
fn test_multiple_summaries_accumulate() {
    let mut pivot = PivotTable::with_data(sales_data());
    pivot.push(Step::group_items("quarter").unwrap());
    pivot.push(Step::aggregate("region", "sales", "sum").unwrap());
    pivot.push(Step::aggregate("region", "sales", "avg").unwrap());
    pivot.push(Step::aggregate_with(
        "region",
        "sales",
        Aggregation::custom("double_sum", |values: &[f64]| 2.0 * values.iter().sum::<f64>()),
    )
    .unwrap());

    let groups = pivot.transform();
    for group in &groups {
        assert_eq!(group.summaries.len(), 3);
        assert_eq!(group.summaries[0].kind, "sum");
        assert_eq!(group.summaries[1].kind, "avg");
        assert_eq!(group.summaries[2].kind, "double_sum");
    }
}

#[test]
fn test_decimal_precision_follows_inputs() {
    let mut pivot = PivotTable::with_data(sales_data());
    pivot.push(Step::group_items("quarter").unwrap());
    pivot.push(Step::aggregate("region", "sales", "sum").unwrap());

    let groups = pivot.transform();

    // Q1 inputs carry at most 2 fractional digits (120.5, 80, 200.25).
    let q1 = &groups[0];
    assert_eq!(q1.key.get("quarter"), Some(&json!("Q1")));
    assert_eq!(q1.summaries[0].decimal_places, 2);

    // Q2 surviving inputs are 99.5 and 310.
    let q2 = &groups[1];
    assert_eq!(q2.summaries[0].decimal_places, 1);
}

// ============================================================================
// OUTPUT CONTRACT
// ============================================================================

#[test]
fn test_series_json_shape_for_chart_consumers() {
    let mut pivot = PivotTable::with_data(sales_data());
    pivot.push(Step::aggregate("region", "sales", "sum").unwrap());

    let groups = pivot.transform();
    let encoded = serde_json::to_value(&groups).unwrap();

    let series = &encoded[0]["summaries"][0]["series"];
    assert!(series.is_array());
    for point in series.as_array().unwrap() {
        assert!(point["label"].is_string());
        assert!(point["value"].is_number());
    }
}

#[test]
fn test_pipeline_reuse_across_datasets() {
    let mut pivot = PivotTable::new();
    pivot.push(Step::group_items("g").unwrap());
    pivot.push(Step::aggregate("g", "v", "sum").unwrap());

    let first = pivot.transform_data(vec![json!({"g": "a", "v": 1})]);
    let second = pivot.transform_data(vec![json!({"g": "b", "v": 2}), json!({"g": "b", "v": 3})]);

    assert_eq!(first.len(), 1);
    assert_eq!(first[0].summaries[0].series[0].value, 1.0);
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].summaries[0].series[0].value, 5.0);
}
