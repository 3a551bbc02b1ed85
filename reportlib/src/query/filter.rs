//! Row filtering.
//!
//! [`apply_filters`] is a pure function of the base rows and the view state:
//! it always starts from the full row set, so filters never compound on a
//! previously filtered subset. A malformed cell makes its row fail the
//! filter in question and nothing more.

use std::collections::BTreeSet;

use crate::data::column::{resolve_company_field, Column, FilterOperator, FilterType, DATE_KEY};
use crate::data::date;
use crate::data::row::Row;
use crate::data::value::{parse_number, CellValue};

use super::options::{ColumnFilter, CompanySelection, DateRange, ViewState};

/// Separator between the two bounds of a `between` filter.
pub const BETWEEN_SEPARATOR: &str = "..";

/// Filter `rows` by the company selection, global search, date range and
/// column filters of `state`, in that order. Visibility is not an input.
pub fn apply_filters(
    rows: &[Row],
    columns: &[Column],
    available_companies: &[String],
    state: &ViewState,
) -> Vec<Row> {
    let company_field = resolve_company_field(columns);
    let narrow_companies = state.companies.constrains(available_companies);
    let search = state.search.trim().to_lowercase();

    let filtered: Vec<Row> = rows
        .iter()
        .filter(|row| {
            !narrow_companies || matches_company(row, &company_field, &state.companies)
        })
        .filter(|row| search.is_empty() || matches_search(row, &search))
        .filter(|row| !state.date_range.is_bounded() || matches_date_range(row, &state.date_range))
        .filter(|row| {
            columns.iter().all(|column| match state.column_filters.get(&column.key) {
                Some(filter) if filter.is_active() => matches_column_filter(row, column, filter),
                _ => true,
            })
        })
        .cloned()
        .collect();

    log::debug!(
        "filtered {} of {} rows (company field '{}')",
        filtered.len(),
        rows.len(),
        company_field
    );
    filtered
}

/// Distinct, sorted company names found in `rows`.
pub fn available_companies(rows: &[Row], columns: &[Column]) -> Vec<String> {
    let field = resolve_company_field(columns);
    rows.iter()
        .filter_map(|row| row.get(&field))
        .filter(|v| !v.is_null())
        .map(|v| v.to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn matches_company(row: &Row, field: &str, selection: &CompanySelection) -> bool {
    match row.get(field) {
        Some(value) if !value.is_null() => selection.contains(&value.to_string()),
        _ => false,
    }
}

/// `term` must already be lowercased.
fn matches_search(row: &Row, term: &str) -> bool {
    row.id.to_string().contains(term)
        || row
            .cells
            .values()
            .any(|v| v.to_string().to_lowercase().contains(term))
}

fn matches_date_range(row: &Row, range: &DateRange) -> bool {
    row.get(DATE_KEY)
        .and_then(date::as_datetime)
        .is_some_and(|dt| range.contains(dt.date()))
}

/// Whether `row` passes an active filter on `column`.
pub fn matches_column_filter(row: &Row, column: &Column, filter: &ColumnFilter) -> bool {
    let cell = match row.get(&column.key) {
        Some(value) if !value.is_null() => value,
        _ => return false,
    };
    let value = filter.value.trim();
    let operator = filter.operator_for(column);

    match column.filter_type {
        FilterType::Text => contains_ci(&cell.to_string(), value),
        FilterType::Number => matches_number(cell, value, operator),
        FilterType::Date => matches_date(cell, value, operator),
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn matches_number(cell: &CellValue, value: &str, operator: FilterOperator) -> bool {
    if operator == FilterOperator::Contains {
        return contains_ci(&cell.to_string(), value);
    }
    let Some(n) = cell.as_f64() else {
        return false;
    };
    if operator == FilterOperator::Between {
        return match split_between(value) {
            Some((low, high)) => match (parse_number(low), parse_number(high)) {
                (Some(low), Some(high)) => n >= low && n <= high,
                _ => false,
            },
            None => false,
        };
    }
    let Some(target) = parse_number(value) else {
        return false;
    };
    match operator {
        FilterOperator::Equals => n == target,
        FilterOperator::Greater => n > target,
        FilterOperator::Less => n < target,
        FilterOperator::Contains | FilterOperator::Between => false,
    }
}

fn matches_date(cell: &CellValue, value: &str, operator: FilterOperator) -> bool {
    if operator == FilterOperator::Contains {
        return contains_ci(&date::display_value(cell), value);
    }
    let Some(dt) = date::as_datetime(cell) else {
        return false;
    };
    if operator == FilterOperator::Between {
        return match split_between(value) {
            Some((low, high)) => match (date::parse_date(low), date::parse_date(high)) {
                (Some(low), Some(high)) => dt.date() >= low && dt.date() <= high,
                _ => false,
            },
            None => false,
        };
    }
    let Some(target) = date::parse_datetime(value) else {
        return false;
    };
    match operator {
        FilterOperator::Equals => dt.date() == target.date(),
        FilterOperator::Greater => dt > target,
        FilterOperator::Less => dt < target,
        FilterOperator::Contains | FilterOperator::Between => false,
    }
}

fn split_between(value: &str) -> Option<(&str, &str)> {
    value
        .split_once(BETWEEN_SEPARATOR)
        .map(|(low, high)| (low.trim(), high.trim()))
}
