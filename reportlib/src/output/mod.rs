//! Output formatting: present report rows as tables and CSV.
//!
//! This module handles the final stage of the pipeline - formatting query
//! set results for display or export. It provides:
//!
//! - **ReportTable**: Table-ready headers, rows and footer
//! - **CSV**: Export of the visible projection
//!
//! Both are pure presentation layers - they only format data into strings.
//! All filtering and sorting happens in the query stage.
//!
//! ## Example
//!
//! ```rust
//! use reportlib::data::{Column, Row};
//! use reportlib::output::export_csv;
//!
//! let columns = vec![
//!     Column::new("company").with_label("Company"),
//!     Column::new("date").with_label("Date"),
//! ];
//! let rows = vec![Row::new(1).with("company", "A").with("date", "2024-01-10")];
//! assert_eq!(export_csv(&rows, &columns), "Company,Date\n\"A\",\"01/10/2024\"");
//! ```

pub mod csv;
pub mod table;

pub use csv::{csv_cell, export_csv, export_to_file, suggested_filename, write_csv};
pub use table::{ReportTable, TableRow};
