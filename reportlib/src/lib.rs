//! # reportlib
//!
//! A tabular engine for financial report data: filter, sort, project and
//! export rows served by a report API.
//!
//! ## Overview
//!
//! Report rows arrive as loosely typed JSON records with a column set that
//! changes per report. This library turns them into typed rows and resolved
//! columns, then derives the displayed view from a small immutable view
//! state:
//!
//! - **Companies**: keep rows whose company is selected
//! - **Search**: case-insensitive substring over every field
//! - **Date range**: inclusive calendar-date bounds on the `date` field
//! - **Column filters**: typed (text, number, date) with comparison operators
//! - **Sort**: stable single-key sort, toggled by field
//! - **Visibility**: a never-empty set of visible columns
//!
//! ## Pipeline
//!
//! 1. [`data`]: parse payloads into a [`Dataset`]
//! 2. [`query`]: filter and sort into a [`ReportQuerySet`]
//! 3. [`output`]: render a [`ReportTable`] or export CSV
//!
//! Around the engine sit an async [`client`] for the report API, a
//! [`builder`] that assembles queries from a column catalog, and a [`poll`]er
//! that waits for submitted queries to be approved.
//!
//! ## Example
//!
//! ```rust
//! use reportlib::data::Dataset;
//! use reportlib::output::export_csv;
//! use reportlib::query::{CompanySelection, ReportQuerySet};
//! use serde_json::json;
//!
//! let dataset = Dataset::from_json(json!([
//!     {"id": 1, "company": "A", "date": "2024-01-10", "close_price": 100},
//!     {"id": 2, "company": "B", "date": "2024-02-10", "close_price": 200},
//!     {"id": 3, "company": "C", "date": "2024-03-10", "close_price": 300}
//! ])).unwrap();
//!
//! let mut qs = ReportQuerySet::from_dataset(dataset);
//! qs.update(|s| s.with_companies(CompanySelection::from_names(["A", "B"])));
//! qs.toggle_column_visibility("close_price");
//!
//! let csv = export_csv(qs.items(), &qs.visible_columns());
//! assert_eq!(csv, "Company,Date\n\"A\",\"01/10/2024\"\n\"B\",\"02/10/2024\"");
//! ```

pub mod builder;
pub mod client;
pub mod data;
pub mod error;
pub mod output;
pub mod poll;
pub mod query;

pub use builder::{QueryBuilder, CATALOG};
pub use client::{ApiClient, ClientConfig, DeveloperQuery, QueryStatus, ReportType};
pub use data::{CellValue, Column, Dataset, FilterOperator, FilterType, Row};
pub use error::ReportError;
pub use output::{export_csv, ReportTable};
pub use poll::{wait_for_approval, PollPolicy, QuerySource};
pub use query::{OrderDirection, ReportQuerySet, SortState, ViewState};

/// Result type for reportlib operations
pub type Result<T> = std::result::Result<T, ReportError>;
