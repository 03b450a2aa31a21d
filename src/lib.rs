//! FILENAME: src/lib.rs
//! Composable pivot pipeline for tabular row data.
//!
//! This crate provides a small data-cube-style transformation pipeline:
//! rows are grouped by field values, filtered within or across groups, and
//! aggregated into labeled numeric series suitable for chart consumers.
//! It has no rendering or I/O surface; the in-process call contract is the
//! whole interface.
//!
//! Layers:
//! - `group`: the data model threaded through the pipeline (WHAT flows)
//! - `step`: filter/group/aggregate transformations (WHAT each step does)
//! - `pipeline`: the container/executor folding steps in order (HOW we run)
//! - `value`: row access and numeric semantics shared by the steps
//!
//! ```
//! use pivot_table::{FilterSpec, PivotTable, Step};
//! use serde_json::json;
//!
//! let mut pivot = PivotTable::with_data(vec![
//!     json!({"region": "north", "sales": "1.5"}),
//!     json!({"region": "north", "sales": "2.25"}),
//!     json!({"region": "south", "sales": "3"}),
//! ]);
//! pivot.push(Step::filter_items("region", FilterSpec::exclude(vec![json!("south")]))?);
//! pivot.push(Step::aggregate("region", "sales", "sum")?);
//!
//! let groups = pivot.transform();
//! let series = &groups[0].summaries[0].series;
//! assert_eq!(series[0].value, 3.75);
//! # Ok::<(), pivot_table::PivotError>(())
//! ```

pub mod error;
pub mod group;
pub mod pipeline;
pub mod step;
pub mod value;

pub use error::PivotError;
pub use group::{Group, GroupKey, KeyPart, Row, SeriesPoint, Summary};
pub use pipeline::PivotTable;
pub use step::{Aggregation, FilterKind, FilterSpec, Step};
pub use value::{coerce_number, get_path, is_null_like, MAX_DECIMAL_PLACES};
