//! Table-ready data structures for report output.
//!
//! This module provides `ReportTable`, a presentation-ready data structure
//! that can be rendered directly or serialized to JSON.
//!
//! The data flow is:
//! 1. Dataset (rows and columns)
//! 2. ReportQuerySet (filtered, sorted)
//! 3. ReportTable (formatted strings for display)
//!
//! ReportTable is a pure presentation layer - it only formats data, no
//! filtering or sorting logic. All computation happens in the query set.

use serde::{Deserialize, Serialize};

use crate::data::column::{Column, FilterType};
use crate::data::date::display_value;
use crate::data::row::Row;
use crate::data::value::CellValue;
use crate::query::queryset::ReportQuerySet;

/// A single data row, values in visible-column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub id: i64,
    pub values: Vec<String>,
}

/// Table-ready report data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportTable {
    /// Optional title (report name)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Column keys, parallel to `headers`
    pub keys: Vec<String>,
    /// Column labels
    pub headers: Vec<String>,
    /// Which columns hold numbers, for right alignment
    pub numeric: Vec<bool>,
    pub rows: Vec<TableRow>,
    /// "<shown> of <total> rows"
    pub footer: String,
}

impl ReportTable {
    /// Build from the displayed rows and visible columns of a query set.
    pub fn from_queryset(qs: &ReportQuerySet) -> Self {
        Self::build(qs.items(), &qs.visible_columns(), qs.total_count())
    }

    /// Build from explicit rows and columns.
    pub fn build(rows: &[Row], columns: &[Column], total: usize) -> Self {
        let rows: Vec<TableRow> = rows
            .iter()
            .map(|row| TableRow {
                id: row.id,
                values: columns
                    .iter()
                    .map(|c| row.get(&c.key).map(|v| cell_text(v, c)).unwrap_or_default())
                    .collect(),
            })
            .collect();

        ReportTable {
            title: None,
            keys: columns.iter().map(|c| c.key.clone()).collect(),
            headers: columns.iter().map(|c| c.label.clone()).collect(),
            numeric: columns
                .iter()
                .map(|c| c.filter_type == FilterType::Number)
                .collect(),
            footer: build_footer_label(rows.len(), total),
            rows,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Numeric columns show the raw number; large values would otherwise be
/// picked up as millisecond timestamps.
fn cell_text(value: &CellValue, column: &Column) -> String {
    match column.filter_type {
        FilterType::Number => value.to_string(),
        _ => display_value(value),
    }
}

fn build_footer_label(shown: usize, total: usize) -> String {
    let unit = if total == 1 { "row" } else { "rows" };
    format!("{} of {} {}", shown, total, unit)
}
