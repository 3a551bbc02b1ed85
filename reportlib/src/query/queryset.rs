//! Query set: the live view over a dataset.
//!
//! A `ReportQuerySet` sits between the raw dataset and the rendered table.
//! It keeps the base rows untouched and derives the displayed rows from them
//! whenever the view state changes:
//! - Filtered by company, search term, date range and column filters
//! - Sorted according to the sort state
//! - Projected onto the visible columns when rendered
//!
//! The data pipeline is:
//! 1. Dataset (rows + columns from the API or a file)
//! 2. ReportQuerySet (filtered, sorted)
//! 3. ReportTable / CSV (formatted strings for output)

use std::collections::BTreeSet;

use crate::data::column::Column;
use crate::data::row::{Dataset, Row};
use crate::data::value::CellValue;

use super::filter::{apply_filters, available_companies};
use super::options::{OrderDirection, SortState, ViewState, VisibleColumns};

/// Base rows, view state and the rows currently displayed.
#[derive(Debug, Clone, Default)]
pub struct ReportQuerySet {
    dataset: Dataset,
    companies: Vec<String>,
    state: ViewState,
    items: Vec<Row>,
}

impl ReportQuerySet {
    /// Empty query set with no dataset loaded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Query set over `dataset` with default view state.
    pub fn from_dataset(dataset: Dataset) -> Self {
        let mut qs = Self::new();
        qs.ingest(dataset);
        qs
    }

    /// Replace the dataset wholesale.
    ///
    /// View state survives when the new dataset has the same column keys;
    /// a different column set resets it to defaults (all columns visible, no
    /// filters, no sort). An empty dataset simply displays nothing.
    pub fn ingest(&mut self, dataset: Dataset) {
        let same_columns = column_key_set(&self.dataset.columns) == column_key_set(&dataset.columns);

        if !same_columns {
            log::debug!(
                "column set changed ({} -> {} columns), resetting view state",
                self.dataset.columns.len(),
                dataset.columns.len()
            );
            self.state = ViewState::for_columns(&dataset.columns);
        } else if self.state.visible.is_empty() {
            self.state.visible = VisibleColumns::all(&dataset.columns);
        }

        self.companies = available_companies(&dataset.rows, &dataset.columns);
        self.dataset = dataset;
        self.apply_filters();
    }

    /// Re-derive the displayed rows from the base rows, then re-apply the
    /// current sort.
    pub fn apply_filters(&mut self) {
        self.items = apply_filters(
            &self.dataset.rows,
            &self.dataset.columns,
            &self.companies,
            &self.state,
        );
        self.apply_sort();
    }

    /// Sort the displayed rows by the current sort state.
    pub fn apply_sort(&mut self) {
        sort_rows(&mut self.items, &self.state.sort);
    }

    /// Replace the whole view state and refresh.
    ///
    /// An empty visible-column set in `state` is not accepted; the current
    /// visible columns are kept instead.
    pub fn set_state(&mut self, mut state: ViewState) {
        if state.visible.is_empty() && !self.dataset.columns.is_empty() {
            state.visible = self.state.visible.clone();
        }
        self.state = state;
        self.apply_filters();
    }

    /// Apply a state transition and refresh.
    pub fn update(&mut self, f: impl FnOnce(ViewState) -> ViewState) {
        let state = f(self.state.clone());
        self.set_state(state);
    }

    /// Sort by an explicit field and direction.
    pub fn sort(&mut self, field: &str, direction: OrderDirection) {
        self.state.sort = SortState {
            field: Some(field.to_string()),
            direction,
        };
        self.apply_sort();
    }

    /// Header-click sort: same field flips direction, new field starts
    /// ascending.
    pub fn toggle_sort(&mut self, field: &str) {
        self.state.sort = self.state.sort.toggle(field);
        self.apply_sort();
    }

    /// Show or hide a column. Returns `false` when nothing changed (unknown
    /// key, or hiding the last visible column).
    pub fn toggle_column_visibility(&mut self, key: &str) -> bool {
        let next = self.state.visible.toggle(key, &self.dataset.columns);
        let changed = next != self.state.visible;
        if !changed {
            log::debug!("column visibility toggle on '{}' rejected", key);
        }
        self.state.visible = next;
        changed
    }

    /// Hide a column if it is visible. Already hidden or unknown columns are
    /// left alone, so hiding twice never brings a column back.
    pub fn hide_column(&mut self, key: &str) -> bool {
        if !self.state.visible.contains(key) {
            return false;
        }
        self.toggle_column_visibility(key)
    }

    /// Show every column, or only the first when all are already shown.
    pub fn toggle_all_columns(&mut self) {
        self.state.visible = self.state.visible.toggle_all(&self.dataset.columns);
    }

    /// Drop every column filter and refresh.
    pub fn clear_column_filters(&mut self) {
        self.update(ViewState::clear_column_filters);
    }

    /// Rows currently displayed (filtered and sorted).
    pub fn items(&self) -> &[Row] {
        &self.items
    }

    /// All rows of the dataset, in source order.
    pub fn base_rows(&self) -> &[Row] {
        &self.dataset.rows
    }

    /// All columns of the dataset, in display order.
    pub fn columns(&self) -> &[Column] {
        &self.dataset.columns
    }

    /// Visible columns, in display order.
    pub fn visible_columns(&self) -> Vec<Column> {
        self.state.visible.project(&self.dataset.columns)
    }

    /// Distinct company names present in the dataset.
    pub fn available_companies(&self) -> &[String] {
        &self.companies
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn total_count(&self) -> usize {
        self.dataset.rows.len()
    }
}

fn column_key_set(columns: &[Column]) -> BTreeSet<&str> {
    columns.iter().map(|c| c.key.as_str()).collect()
}

/// Stable sort of `rows` on a single field.
///
/// Descending uses the reversed comparator rather than reversing the list,
/// so rows with equal keys keep their relative order in both directions.
/// Missing cells sort as nulls.
pub fn sort_rows(rows: &mut [Row], sort: &SortState) {
    let Some(field) = sort.field.as_deref() else {
        return;
    };
    let null = CellValue::Null;
    rows.sort_by(|a, b| {
        let key_a = a.get(field).unwrap_or(&null);
        let key_b = b.get(field).unwrap_or(&null);
        let ordering = key_a.natural_cmp(key_b);
        match sort.direction {
            OrderDirection::Ascending => ordering,
            OrderDirection::Descending => ordering.reverse(),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::column::{FilterOperator, FilterType};
    use crate::query::options::{ColumnFilter, CompanySelection};

    fn sample_dataset() -> Dataset {
        Dataset::new(
            vec![
                Column::new("company"),
                Column::new("date").with_filter_type(FilterType::Date),
                Column::new("close_price").with_filter_type(FilterType::Number),
            ],
            vec![
                Row::new(1)
                    .with("company", "A")
                    .with("date", "2024-01-10")
                    .with("close_price", 100),
                Row::new(2)
                    .with("company", "B")
                    .with("date", "2024-02-10")
                    .with("close_price", 200),
            ],
        )
    }

    fn ids(rows: &[Row]) -> Vec<i64> {
        rows.iter().map(|r| r.id).collect()
    }

    #[test]
    fn test_ingest_shows_all_rows_and_columns() {
        let qs = ReportQuerySet::from_dataset(sample_dataset());
        assert_eq!(ids(qs.items()), vec![1, 2]);
        assert_eq!(qs.visible_columns().len(), 3);
        assert_eq!(qs.available_companies(), &["A".to_string(), "B".to_string()]);
        assert_eq!(qs.total_count(), 2);
    }

    #[test]
    fn test_ingest_empty_dataset() {
        let qs = ReportQuerySet::from_dataset(Dataset::empty());
        assert!(qs.items().is_empty());
        assert!(qs.visible_columns().is_empty());
    }

    #[test]
    fn test_sort_desc_by_close_price() {
        let mut qs = ReportQuerySet::from_dataset(sample_dataset());
        qs.sort("close_price", OrderDirection::Descending);
        assert_eq!(ids(qs.items()), vec![2, 1]);
    }

    #[test]
    fn test_toggle_sort_flips_direction() {
        let mut qs = ReportQuerySet::from_dataset(sample_dataset());
        qs.toggle_sort("close_price");
        assert_eq!(ids(qs.items()), vec![1, 2]);
        qs.toggle_sort("close_price");
        assert_eq!(ids(qs.items()), vec![2, 1]);
        assert_eq!(qs.state().sort.direction, OrderDirection::Descending);
        qs.toggle_sort("company");
        assert_eq!(qs.state().sort.direction, OrderDirection::Ascending);
    }

    #[test]
    fn test_sort_reverse_with_stable_ties() {
        let rows = vec![
            Row::new(1).with("k", 1),
            Row::new(2).with("k", 2),
            Row::new(3).with("k", 1),
            Row::new(4).with("k", 3),
            Row::new(5).with("k", 2),
        ];
        let mut asc = rows.clone();
        sort_rows(&mut asc, &SortState::by("k"));
        assert_eq!(ids(&asc), vec![1, 3, 2, 5, 4]);

        let mut desc = rows;
        sort_rows(&mut desc, &SortState::by("k").descending());
        // Equal keys keep source order in both directions
        assert_eq!(ids(&desc), vec![4, 2, 5, 1, 3]);
    }

    #[test]
    fn test_sort_distinct_keys_exact_reverse() {
        let rows: Vec<Row> = [5, 3, 9, 1]
            .iter()
            .enumerate()
            .map(|(i, k)| Row::new(i as i64).with("k", *k))
            .collect();
        let mut asc = rows.clone();
        sort_rows(&mut asc, &SortState::by("k"));
        let mut desc = rows;
        sort_rows(&mut desc, &SortState::by("k").descending());
        let mut reversed = ids(&asc);
        reversed.reverse();
        assert_eq!(ids(&desc), reversed);
    }

    #[test]
    fn test_missing_sort_field_keeps_rows() {
        let mut rows = vec![Row::new(1).with("k", 2), Row::new(2)];
        sort_rows(&mut rows, &SortState::by("k"));
        assert_eq!(ids(&rows), vec![2, 1]);
    }

    #[test]
    fn test_filters_reapply_sort() {
        let mut qs = ReportQuerySet::from_dataset(sample_dataset());
        qs.sort("close_price", OrderDirection::Descending);
        qs.update(|s| s.with_search("2024"));
        assert_eq!(ids(qs.items()), vec![2, 1]);
    }

    #[test]
    fn test_filters_never_compound() {
        let mut qs = ReportQuerySet::from_dataset(sample_dataset());
        qs.update(|s| s.with_companies(CompanySelection::from_names(["A"])));
        assert_eq!(ids(qs.items()), vec![1]);
        qs.update(|s| s.with_companies(CompanySelection::from_names(["B"])));
        assert_eq!(ids(qs.items()), vec![2]);
        qs.update(|s| s.with_companies(CompanySelection::new()));
        assert_eq!(ids(qs.items()), vec![1, 2]);
    }

    #[test]
    fn test_apply_filters_idempotent() {
        let mut qs = ReportQuerySet::from_dataset(sample_dataset());
        qs.update(|s| {
            s.with_column_filter(
                "close_price",
                ColumnFilter::new("100").with_operator(FilterOperator::Greater),
            )
        });
        let first = ids(qs.items());
        qs.apply_filters();
        assert_eq!(ids(qs.items()), first);
        assert_eq!(first, vec![2]);
    }

    #[test]
    fn test_toggle_column_visibility_rejects_last() {
        let mut qs = ReportQuerySet::from_dataset(sample_dataset());
        assert!(qs.toggle_column_visibility("company"));
        assert!(qs.toggle_column_visibility("date"));
        assert!(!qs.toggle_column_visibility("close_price"));
        assert_eq!(qs.visible_columns().len(), 1);
        assert!(qs.toggle_column_visibility("date"));
        let keys: Vec<String> = qs.visible_columns().into_iter().map(|c| c.key).collect();
        assert_eq!(keys, vec!["date".to_string(), "close_price".to_string()]);
    }

    #[test]
    fn test_hide_column_is_not_a_toggle() {
        let mut qs = ReportQuerySet::from_dataset(sample_dataset());
        assert!(qs.hide_column("close_price"));
        assert!(!qs.hide_column("close_price"));
        assert!(!qs.hide_column("volume"));
        let keys: Vec<String> = qs.visible_columns().into_iter().map(|c| c.key).collect();
        assert_eq!(keys, vec!["company".to_string(), "date".to_string()]);

        assert!(qs.hide_column("company"));
        assert!(!qs.hide_column("date"));
        assert_eq!(qs.visible_columns().len(), 1);
    }

    #[test]
    fn test_visibility_does_not_affect_filtering() {
        let mut qs = ReportQuerySet::from_dataset(sample_dataset());
        qs.toggle_column_visibility("close_price");
        qs.update(|s| {
            s.with_column_filter(
                "close_price",
                ColumnFilter::new("200").with_operator(FilterOperator::Equals),
            )
        });
        assert_eq!(ids(qs.items()), vec![2]);
    }

    #[test]
    fn test_set_state_keeps_visible_columns_non_empty() {
        let mut qs = ReportQuerySet::from_dataset(sample_dataset());
        qs.set_state(ViewState::new());
        assert_eq!(qs.visible_columns().len(), 3);
    }

    #[test]
    fn test_reingest_same_columns_keeps_state() {
        let mut qs = ReportQuerySet::from_dataset(sample_dataset());
        qs.update(|s| s.with_search("B").with_sort(SortState::by("close_price")));
        qs.toggle_column_visibility("date");
        qs.ingest(sample_dataset());
        assert_eq!(qs.state().search, "B");
        assert_eq!(ids(qs.items()), vec![2]);
        assert_eq!(qs.visible_columns().len(), 2);
    }

    #[test]
    fn test_reingest_new_columns_resets_state() {
        let mut qs = ReportQuerySet::from_dataset(sample_dataset());
        qs.update(|s| s.with_search("B"));
        qs.toggle_column_visibility("date");

        let other = Dataset::new(
            vec![Column::new("symbol"), Column::new("pe_ratio")],
            vec![Row::new(1).with("symbol", "X").with("pe_ratio", 12.5)],
        );
        qs.ingest(other);
        assert_eq!(qs.state().search, "");
        assert_eq!(qs.visible_columns().len(), 2);
        assert_eq!(ids(qs.items()), vec![1]);
    }

    #[test]
    fn test_toggle_all_columns() {
        let mut qs = ReportQuerySet::from_dataset(sample_dataset());
        qs.toggle_all_columns();
        assert_eq!(qs.visible_columns().len(), 1);
        qs.toggle_all_columns();
        assert_eq!(qs.visible_columns().len(), 3);
    }

    #[test]
    fn test_clear_column_filters() {
        let mut qs = ReportQuerySet::from_dataset(sample_dataset());
        qs.update(|s| s.with_column_filter("company", ColumnFilter::new("a")));
        assert_eq!(qs.items().len(), 1);
        qs.clear_column_filters();
        assert_eq!(qs.items().len(), 2);
    }
}
