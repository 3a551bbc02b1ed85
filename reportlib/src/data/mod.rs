//! Data model: cells, rows, columns and datasets.
//!
//! This module handles the first stage of the pipeline - turning whatever the
//! report API returns into typed rows and resolved column descriptors. It
//! provides:
//!
//! - **Values**: tagged cells (`CellValue`) instead of free-form JSON
//! - **Rows**: `Row` and `Dataset` (rows plus ordered columns)
//! - **Columns**: descriptors, labels, filter-type inference and ordering
//! - **Dates**: date detection and `MM/DD/YYYY` formatting
//!
//! ## Example
//!
//! ```rust
//! use reportlib::data::Dataset;
//! use serde_json::json;
//!
//! let dataset = Dataset::from_json(json!([
//!     {"id": 1, "close_price": 100, "company": "A", "date": "2024-01-10"}
//! ])).unwrap();
//! assert_eq!(dataset.column_keys(), vec!["company", "date", "close_price"]);
//! ```

pub mod column;
pub mod date;
pub mod row;
pub mod value;

pub use column::{
    humanize_key, infer_filter_type, order_columns, resolve_company_field, Column,
    ColumnDescriptor, ColumnSpec, FilterOperator, FilterType,
};
pub use date::{detect_date, display_value, format_date, parse_date, parse_datetime};
pub use row::{Dataset, QueryResult, Row};
pub use value::CellValue;
