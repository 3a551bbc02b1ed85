//! View options: everything that decides which rows are shown and how.
//!
//! The pieces (company selection, search, date range, column filters, sort,
//! visible columns) are plain values gathered in [`ViewState`]. Every change
//! produces a new state through a consuming builder method, so invariants are
//! checked at each transition rather than by mutating flags in place.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::data::column::{Column, FilterOperator};
use crate::data::date;
use crate::error::ReportError;
use crate::Result;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrderDirection {
    /// Ascending (A-Z, smallest first)
    #[default]
    Ascending,
    /// Descending (Z-A, largest first)
    Descending,
}

impl OrderDirection {
    pub fn toggled(self) -> Self {
        match self {
            OrderDirection::Ascending => OrderDirection::Descending,
            OrderDirection::Descending => OrderDirection::Ascending,
        }
    }

    /// SQL keyword for this direction.
    pub fn as_sql(self) -> &'static str {
        match self {
            OrderDirection::Ascending => "ASC",
            OrderDirection::Descending => "DESC",
        }
    }
}

impl FromStr for OrderDirection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" | "ascending" => Ok(OrderDirection::Ascending),
            "desc" | "descending" => Ok(OrderDirection::Descending),
            _ => Err(format!("Unknown sort direction: {}", s)),
        }
    }
}

/// Single-column sort configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortState {
    /// Column key to sort by; `None` keeps source order
    pub field: Option<String>,
    /// Sort direction
    pub direction: OrderDirection,
}

impl SortState {
    /// No sorting (source order)
    pub fn none() -> Self {
        Self::default()
    }

    /// Sort by `field` ascending
    pub fn by(field: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            direction: OrderDirection::Ascending,
        }
    }

    /// Set sort direction to ascending
    pub fn ascending(mut self) -> Self {
        self.direction = OrderDirection::Ascending;
        self
    }

    /// Set sort direction to descending
    pub fn descending(mut self) -> Self {
        self.direction = OrderDirection::Descending;
        self
    }

    /// Clicking a column header: the same field flips direction, a new field
    /// starts ascending.
    pub fn toggle(&self, field: &str) -> Self {
        if self.field.as_deref() == Some(field) {
            Self {
                field: self.field.clone(),
                direction: self.direction.toggled(),
            }
        } else {
            Self::by(field)
        }
    }
}

/// Filter on a single column.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ColumnFilter {
    /// Raw filter input; blank means "no constraint"
    pub value: String,
    /// Comparison; `None` uses the column's default operator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<FilterOperator>,
}

impl ColumnFilter {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            operator: None,
        }
    }

    /// Builder: set the operator
    pub fn with_operator(mut self, operator: FilterOperator) -> Self {
        self.operator = Some(operator);
        self
    }

    pub fn is_active(&self) -> bool {
        !self.value.trim().is_empty()
    }

    /// Operator to apply for `column`.
    pub fn operator_for(&self, column: &Column) -> FilterOperator {
        self.operator.unwrap_or(column.filter_operator)
    }
}

/// A column filter as typed on the command line: `key:value` or
/// `key:operator:value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterExpr {
    pub key: String,
    pub filter: ColumnFilter,
}

impl FromStr for FilterExpr {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |message: &str| ReportError::InvalidFilter {
            filter: s.to_string(),
            message: message.to_string(),
        };

        let (key, rest) = s
            .split_once(':')
            .ok_or_else(|| invalid("expected KEY:VALUE or KEY:OPERATOR:VALUE"))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(invalid("missing column key"));
        }

        let filter = match rest.split_once(':') {
            Some((op, value)) => match op.parse::<FilterOperator>() {
                Ok(operator) => ColumnFilter::new(value).with_operator(operator),
                // Not an operator: the colon belongs to the value (e.g. a time)
                Err(_) => ColumnFilter::new(rest),
            },
            None => ColumnFilter::new(rest),
        };

        Ok(FilterExpr {
            key: key.to_string(),
            filter,
        })
    }
}

/// Inclusive calendar-date bounds on the `date` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateRange {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

impl DateRange {
    /// Range with optional bounds. A start after the end is rejected.
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Self> {
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(ReportError::InvalidDateRange { start, end });
            }
        }
        Ok(Self { start, end })
    }

    /// Range from user-typed bounds; blank bounds are open.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self> {
        let bound = |text: Option<&str>| -> Result<Option<NaiveDate>> {
            match text.map(str::trim).filter(|t| !t.is_empty()) {
                None => Ok(None),
                Some(t) => date::parse_date(t)
                    .map(Some)
                    .ok_or_else(|| ReportError::InvalidDate(t.to_string())),
            }
        };
        DateRange::new(bound(start)?, bound(end)?)
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn start(&self) -> Option<NaiveDate> {
        self.start
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.end
    }

    pub fn is_bounded(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }

    /// Whether `date` lies within the bounds (both ends inclusive).
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.is_none_or(|start| date >= start) && self.end.is_none_or(|end| date <= end)
    }
}

/// Selected company names. Empty and "everything selected" both mean
/// "no constraint".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompanySelection(BTreeSet<String>);

impl CompanySelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, company: &str) -> bool {
        self.0.contains(company)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Whether this selection actually narrows `available`.
    pub fn constrains(&self, available: &[String]) -> bool {
        if self.0.is_empty() {
            return false;
        }
        let all_selected =
            self.0.len() == available.len() && available.iter().all(|c| self.0.contains(c));
        !all_selected
    }

    /// Select or deselect one company.
    pub fn toggle(&self, company: &str) -> Self {
        let mut names = self.0.clone();
        if !names.remove(company) {
            names.insert(company.to_string());
        }
        Self(names)
    }

    /// Everything selected → nothing selected; otherwise select everything.
    pub fn toggle_all(&self, available: &[String]) -> Self {
        if self.0.len() == available.len() {
            Self::new()
        } else {
            Self::from_names(available.iter().cloned())
        }
    }
}

/// Keys of the columns being rendered, kept in display order.
///
/// Never empty once a dataset with columns is loaded: hiding the last
/// visible column is refused.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VisibleColumns(Vec<String>);

impl VisibleColumns {
    /// No columns (before any dataset is loaded)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Every column visible
    pub fn all(columns: &[Column]) -> Self {
        Self(columns.iter().map(|c| c.key.clone()).collect())
    }

    /// Only the given keys that exist in `columns`, in column order.
    /// `None` when none of them exist.
    pub fn only<S: AsRef<str>>(keys: &[S], columns: &[Column]) -> Option<Self> {
        let keys: Vec<String> = columns
            .iter()
            .filter(|c| keys.iter().any(|k| k.as_ref() == c.key))
            .map(|c| c.key.clone())
            .collect();
        if keys.is_empty() {
            None
        } else {
            Some(Self(keys))
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.iter().any(|k| k == key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> &[String] {
        &self.0
    }

    /// Show or hide `key`. Unknown keys and hiding the last visible column
    /// leave the set unchanged.
    pub fn toggle(&self, key: &str, columns: &[Column]) -> Self {
        if self.contains(key) {
            if self.0.len() <= 1 {
                return self.clone();
            }
            Self(self.0.iter().filter(|k| *k != key).cloned().collect())
        } else if columns.iter().any(|c| c.key == key) {
            Self(
                columns
                    .iter()
                    .filter(|c| c.key == key || self.contains(&c.key))
                    .map(|c| c.key.clone())
                    .collect(),
            )
        } else {
            self.clone()
        }
    }

    /// All visible → keep only the first column; otherwise show all.
    pub fn toggle_all(&self, columns: &[Column]) -> Self {
        if self.0.len() == columns.len() {
            match columns.first() {
                Some(first) => Self(vec![first.key.clone()]),
                None => Self::empty(),
            }
        } else {
            Self::all(columns)
        }
    }

    /// Columns to render, in column order.
    pub fn project(&self, columns: &[Column]) -> Vec<Column> {
        columns
            .iter()
            .filter(|c| self.contains(&c.key))
            .cloned()
            .collect()
    }
}

/// Complete view configuration applied to a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ViewState {
    pub companies: CompanySelection,
    /// Global search term; blank means "no constraint"
    pub search: String,
    pub date_range: DateRange,
    pub column_filters: BTreeMap<String, ColumnFilter>,
    pub sort: SortState,
    pub visible: VisibleColumns,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults for a freshly loaded column set: everything visible, no
    /// filters, no sort.
    pub fn for_columns(columns: &[Column]) -> Self {
        Self {
            visible: VisibleColumns::all(columns),
            ..Self::default()
        }
    }

    /// Builder: set the company selection
    pub fn with_companies(mut self, companies: CompanySelection) -> Self {
        self.companies = companies;
        self
    }

    /// Builder: set the global search term
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    /// Builder: set the date range
    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = range;
        self
    }

    /// Builder: set (or replace) the filter on `key`
    pub fn with_column_filter(mut self, key: impl Into<String>, filter: ColumnFilter) -> Self {
        self.column_filters.insert(key.into(), filter);
        self
    }

    /// Builder: drop the filter on `key`
    pub fn without_column_filter(mut self, key: &str) -> Self {
        self.column_filters.remove(key);
        self
    }

    /// Builder: drop all column filters
    pub fn clear_column_filters(mut self) -> Self {
        self.column_filters.clear();
        self
    }

    /// Builder: set the sort
    pub fn with_sort(mut self, sort: SortState) -> Self {
        self.sort = sort;
        self
    }

    /// Builder: header-click sort toggle on `field`
    pub fn toggle_sort(mut self, field: &str) -> Self {
        self.sort = self.sort.toggle(field);
        self
    }

    /// Builder: set visible columns. An empty set is ignored.
    pub fn with_visible(mut self, visible: VisibleColumns) -> Self {
        if !visible.is_empty() {
            self.visible = visible;
        }
        self
    }

    /// Builder: show/hide one column
    pub fn toggle_column(mut self, key: &str, columns: &[Column]) -> Self {
        self.visible = self.visible.toggle(key, columns);
        self
    }

    /// Whether any column filter has a value.
    pub fn has_active_filters(&self) -> bool {
        self.column_filters.values().any(ColumnFilter::is_active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> Vec<Column> {
        vec![
            Column::new("company"),
            Column::new("date"),
            Column::new("close_price"),
        ]
    }

    #[test]
    fn test_sort_toggle_same_field_flips() {
        let sort = SortState::by("close_price");
        let flipped = sort.toggle("close_price");
        assert_eq!(flipped.field.as_deref(), Some("close_price"));
        assert_eq!(flipped.direction, OrderDirection::Descending);
        assert_eq!(
            flipped.toggle("close_price").direction,
            OrderDirection::Ascending
        );
    }

    #[test]
    fn test_sort_toggle_new_field_resets_ascending() {
        let sort = SortState::by("close_price").descending();
        let other = sort.toggle("date");
        assert_eq!(other.field.as_deref(), Some("date"));
        assert_eq!(other.direction, OrderDirection::Ascending);
    }

    #[test]
    fn test_order_direction_from_str() {
        assert_eq!(
            OrderDirection::from_str("desc").unwrap(),
            OrderDirection::Descending
        );
        assert_eq!(
            OrderDirection::from_str("ASC").unwrap(),
            OrderDirection::Ascending
        );
        assert!(OrderDirection::from_str("up").is_err());
    }

    #[test]
    fn test_visible_columns_never_empty() {
        let cols = columns();
        let mut visible = VisibleColumns::all(&cols);
        visible = visible.toggle("company", &cols);
        visible = visible.toggle("date", &cols);
        assert_eq!(visible.keys(), &["close_price".to_string()]);
        visible = visible.toggle("close_price", &cols);
        assert_eq!(visible.len(), 1);
        assert!(visible.contains("close_price"));
    }

    #[test]
    fn test_visible_columns_show_keeps_column_order() {
        let cols = columns();
        let visible = VisibleColumns::only(&["close_price"], &cols).unwrap();
        let visible = visible.toggle("company", &cols);
        assert_eq!(
            visible.keys(),
            &["company".to_string(), "close_price".to_string()]
        );
    }

    #[test]
    fn test_visible_columns_unknown_key_is_noop() {
        let cols = columns();
        let visible = VisibleColumns::only(&["date"], &cols).unwrap();
        assert_eq!(visible.toggle("volume", &cols), visible);
        assert!(VisibleColumns::only(&["volume"], &cols).is_none());
    }

    #[test]
    fn test_visible_columns_toggle_all() {
        let cols = columns();
        let all = VisibleColumns::all(&cols);
        let first_only = all.toggle_all(&cols);
        assert_eq!(first_only.keys(), &["company".to_string()]);
        assert_eq!(first_only.toggle_all(&cols), all);
    }

    #[test]
    fn test_company_selection_noop_encodings() {
        let available = vec!["A".to_string(), "B".to_string()];
        assert!(!CompanySelection::new().constrains(&available));
        assert!(!CompanySelection::from_names(["A", "B"]).constrains(&available));
        assert!(CompanySelection::from_names(["A"]).constrains(&available));
    }

    #[test]
    fn test_company_selection_toggle_all() {
        let available = vec!["A".to_string(), "B".to_string()];
        let all = CompanySelection::new().toggle_all(&available);
        assert_eq!(all.len(), 2);
        assert!(all.toggle_all(&available).is_empty());
        assert!(!all.toggle("A").contains("A"));
    }

    #[test]
    fn test_date_range_inclusive() {
        let range = DateRange::parse(Some("2024-01-10"), Some("2024-02-10")).unwrap();
        assert!(range.contains(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()));
        assert!(range.contains(NaiveDate::from_ymd_opt(2024, 2, 10).unwrap()));
        assert!(!range.contains(NaiveDate::from_ymd_opt(2024, 2, 11).unwrap()));
    }

    #[test]
    fn test_date_range_open_ended() {
        let range = DateRange::parse(Some("2024-01-10"), None).unwrap();
        assert!(range.is_bounded());
        assert!(range.contains(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap()));
        assert!(!range.contains(NaiveDate::from_ymd_opt(2024, 1, 9).unwrap()));
        assert!(!DateRange::parse(Some(" "), None).unwrap().is_bounded());
    }

    #[test]
    fn test_date_range_rejects_inverted_bounds() {
        let err = DateRange::parse(Some("2024-03-01"), Some("2024-01-01")).unwrap_err();
        assert!(matches!(err, ReportError::InvalidDateRange { .. }));
        assert!(matches!(
            DateRange::parse(Some("soon"), None).unwrap_err(),
            ReportError::InvalidDate(_)
        ));
    }

    #[test]
    fn test_filter_expr_parsing() {
        let expr: FilterExpr = "close_price:greater:100".parse().unwrap();
        assert_eq!(expr.key, "close_price");
        assert_eq!(expr.filter.value, "100");
        assert_eq!(expr.filter.operator, Some(FilterOperator::Greater));

        let expr: FilterExpr = "company:Tata".parse().unwrap();
        assert_eq!(expr.filter.value, "Tata");
        assert_eq!(expr.filter.operator, None);

        let expr: FilterExpr = "time:10:30".parse().unwrap();
        assert_eq!(expr.filter.value, "10:30");
        assert_eq!(expr.filter.operator, None);

        assert!("novalue".parse::<FilterExpr>().is_err());
        assert!(":x".parse::<FilterExpr>().is_err());
    }

    #[test]
    fn test_view_state_builders() {
        let state = ViewState::for_columns(&columns())
            .with_search("tata")
            .with_column_filter("close_price", ColumnFilter::new("100"))
            .toggle_sort("close_price");
        assert_eq!(state.visible.len(), 3);
        assert!(state.has_active_filters());
        assert_eq!(state.sort.field.as_deref(), Some("close_price"));

        let cleared = state.clear_column_filters();
        assert!(!cleared.has_active_filters());
    }

    #[test]
    fn test_with_visible_ignores_empty() {
        let state = ViewState::for_columns(&columns()).with_visible(VisibleColumns::empty());
        assert_eq!(state.visible.len(), 3);
    }
}
