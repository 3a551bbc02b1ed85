//! Query processing: filter and sort report rows.
//!
//! This module handles the second stage of the pipeline - deriving the
//! displayed rows from a dataset. It provides:
//!
//! - **Options**: View state (`ViewState`, `SortState`, `DateRange`, ...)
//! - **Filter**: The filter pipeline (company, search, date range, columns)
//! - **QuerySet**: The live view combining a dataset with its view state
//!
//! ## Example
//!
//! ```rust
//! use reportlib::data::Dataset;
//! use reportlib::query::{OrderDirection, ReportQuerySet};
//! use serde_json::json;
//!
//! let dataset = Dataset::from_json(json!([
//!     {"id": 1, "company": "A", "close_price": 100},
//!     {"id": 2, "company": "B", "close_price": 200}
//! ])).unwrap();
//!
//! let mut qs = ReportQuerySet::from_dataset(dataset);
//! qs.sort("close_price", OrderDirection::Descending);
//! assert_eq!(qs.items()[0].id, 2);
//! ```

pub mod filter;
pub mod options;
pub mod queryset;

pub use filter::{apply_filters, available_companies, matches_column_filter};
pub use options::{
    ColumnFilter, CompanySelection, DateRange, FilterExpr, OrderDirection, SortState,
    ViewState, VisibleColumns,
};
pub use queryset::{sort_rows, ReportQuerySet};
