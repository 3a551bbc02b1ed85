//! Column descriptors.
//!
//! A column says how a field is labelled, which kind of filter applies to it
//! and which comparison that filter uses by default. Report types published by
//! the backend carry full descriptors; ad-hoc query results only carry keys,
//! in which case the filter type is inferred from the data.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::date;
use super::row::Row;
use super::value::CellValue;

/// Key of the column used by date-range filtering.
pub const DATE_KEY: &str = "date";

/// Fallback company key when no column looks like one.
pub const COMPANY_KEY: &str = "company";

/// Kind of filter input a column takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    /// Case-insensitive substring match
    #[default]
    Text,
    /// Numeric comparison
    Number,
    /// Date comparison
    Date,
}

impl FromStr for FilterType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "string" => Ok(FilterType::Text),
            "number" | "numeric" => Ok(FilterType::Number),
            "date" => Ok(FilterType::Date),
            _ => Err(format!("Unknown filter type: {}", s)),
        }
    }
}

/// Comparison a column filter applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    #[default]
    Equals,
    Contains,
    Greater,
    Less,
    /// Inclusive range written as `low..high`
    Between,
}

impl FromStr for FilterOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "equals" | "eq" | "=" => Ok(FilterOperator::Equals),
            "contains" | "like" | "~" => Ok(FilterOperator::Contains),
            "greater" | "gt" | ">" => Ok(FilterOperator::Greater),
            "less" | "lt" | "<" => Ok(FilterOperator::Less),
            "between" | "range" => Ok(FilterOperator::Between),
            _ => Err(format!("Unknown filter operator: {}", s)),
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FilterOperator::Equals => "equals",
            FilterOperator::Contains => "contains",
            FilterOperator::Greater => "greater",
            FilterOperator::Less => "less",
            FilterOperator::Between => "between",
        };
        f.write_str(name)
    }
}

/// Column descriptor as published by the backend. Everything but the key is
/// optional on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDescriptor {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_type: Option<FilterType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_operator: Option<FilterOperator>,
}

/// Either a bare key or a full descriptor; query results use the former,
/// report types the latter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnSpec {
    Key(String),
    Descriptor(ColumnDescriptor),
}

impl ColumnSpec {
    pub fn key(&self) -> &str {
        match self {
            ColumnSpec::Key(key) => key,
            ColumnSpec::Descriptor(desc) => &desc.key,
        }
    }
}

/// A resolved column: every attribute has a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub key: String,
    pub label: String,
    pub filter_type: FilterType,
    pub filter_operator: FilterOperator,
}

impl Column {
    /// Text column labelled from its key.
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            label: humanize_key(&key),
            key,
            filter_type: FilterType::Text,
            filter_operator: FilterOperator::Equals,
        }
    }

    /// Builder: set the label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Builder: set the filter type
    pub fn with_filter_type(mut self, filter_type: FilterType) -> Self {
        self.filter_type = filter_type;
        self
    }

    /// Builder: set the default filter operator
    pub fn with_operator(mut self, operator: FilterOperator) -> Self {
        self.filter_operator = operator;
        self
    }

    /// Resolve a wire column against the rows it describes.
    pub fn resolve(spec: &ColumnSpec, rows: &[Row]) -> Self {
        match spec {
            ColumnSpec::Key(key) => {
                Column::new(key.clone()).with_filter_type(infer_filter_type(key, rows))
            }
            ColumnSpec::Descriptor(desc) => {
                let mut column = Column::new(desc.key.clone());
                if let Some(label) = &desc.label {
                    column.label = label.clone();
                }
                column.filter_type = desc
                    .filter_type
                    .unwrap_or_else(|| infer_filter_type(&desc.key, rows));
                column.filter_operator = desc.filter_operator.unwrap_or_default();
                column
            }
        }
    }
}

/// `close_price` → `Close Price`.
pub fn humanize_key(key: &str) -> String {
    let mut label = String::with_capacity(key.len());
    let mut at_word_start = true;
    for ch in key.chars() {
        let ch = if ch == '_' { ' ' } else { ch };
        if ch.is_alphanumeric() {
            if at_word_start {
                label.extend(ch.to_uppercase());
            } else {
                label.push(ch);
            }
            at_word_start = false;
        } else {
            label.push(ch);
            at_word_start = true;
        }
    }
    label
}

/// Infer a filter type from the non-null values of a column.
///
/// All numeric → number, all date-like → date, otherwise text. A column with
/// no values at all is a date column only when its key says so.
pub fn infer_filter_type(key: &str, rows: &[Row]) -> FilterType {
    let values: Vec<&CellValue> = rows
        .iter()
        .filter_map(|row| row.get(key))
        .filter(|v| !v.is_null())
        .collect();

    if values.is_empty() {
        return if key.to_lowercase().contains(DATE_KEY) {
            FilterType::Date
        } else {
            FilterType::Text
        };
    }
    if values.iter().all(|v| v.as_f64().is_some()) {
        return FilterType::Number;
    }
    if values.iter().all(|v| looks_like_date(v)) {
        return FilterType::Date;
    }
    FilterType::Text
}

fn looks_like_date(value: &CellValue) -> bool {
    match value {
        CellValue::Date(_) => true,
        CellValue::Text(s) => date::parse_datetime(s).is_some(),
        _ => false,
    }
}

/// Find the key holding company names: `company`, then `company_name`, then
/// any key containing "company" (case-insensitive), falling back to `company`.
pub fn resolve_company_field(columns: &[Column]) -> String {
    let has = |key: &str| columns.iter().any(|c| c.key == key);
    if has(COMPANY_KEY) {
        return COMPANY_KEY.to_string();
    }
    if has("company_name") {
        return "company_name".to_string();
    }
    columns
        .iter()
        .find(|c| c.key.to_lowercase().contains(COMPANY_KEY))
        .map(|c| c.key.clone())
        .unwrap_or_else(|| COMPANY_KEY.to_string())
}

/// Pin the company column first and the date column second; everything else
/// keeps its original order.
pub fn order_columns(columns: Vec<Column>) -> Vec<Column> {
    let company_key = resolve_company_field(&columns);
    let mut company = None;
    let mut date_col = None;
    let mut rest = Vec::with_capacity(columns.len());

    for column in columns {
        if company.is_none() && column.key == company_key {
            company = Some(column);
        } else if date_col.is_none() && column.key == DATE_KEY {
            date_col = Some(column);
        } else {
            rest.push(column);
        }
    }

    company.into_iter().chain(date_col).chain(rest).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(columns: &[Column]) -> Vec<&str> {
        columns.iter().map(|c| c.key.as_str()).collect()
    }

    #[test]
    fn test_humanize_key() {
        assert_eq!(humanize_key("close_price"), "Close Price");
        assert_eq!(humanize_key("returns_1m"), "Returns 1m");
        assert_eq!(humanize_key("company"), "Company");
        assert_eq!(humanize_key("pe-ratio"), "Pe-Ratio");
    }

    #[test]
    fn test_order_columns_pins_company_and_date() {
        let columns = vec![
            Column::new("open_price"),
            Column::new("date"),
            Column::new("volume"),
            Column::new("company"),
        ];
        let ordered = order_columns(columns);
        assert_eq!(keys(&ordered), vec!["company", "date", "open_price", "volume"]);
    }

    #[test]
    fn test_order_columns_company_name() {
        let columns = vec![
            Column::new("symbol"),
            Column::new("company_name"),
            Column::new("net_profit"),
        ];
        let ordered = order_columns(columns);
        assert_eq!(keys(&ordered), vec!["company_name", "symbol", "net_profit"]);
    }

    #[test]
    fn test_resolve_company_field() {
        assert_eq!(resolve_company_field(&[Column::new("company")]), "company");
        assert_eq!(
            resolve_company_field(&[Column::new("company_name")]),
            "company_name"
        );
        assert_eq!(
            resolve_company_field(&[Column::new("ParentCompany")]),
            "ParentCompany"
        );
        assert_eq!(resolve_company_field(&[Column::new("symbol")]), "company");
    }

    #[test]
    fn test_infer_filter_type() {
        let rows = vec![
            Row::new(1)
                .with("close_price", 100)
                .with("date", "2024-01-10")
                .with("company", "A"),
            Row::new(2)
                .with("close_price", "200.5")
                .with("date", "2024-02-10")
                .with("company", "B"),
        ];
        assert_eq!(infer_filter_type("close_price", &rows), FilterType::Number);
        assert_eq!(infer_filter_type("date", &rows), FilterType::Date);
        assert_eq!(infer_filter_type("company", &rows), FilterType::Text);
        assert_eq!(infer_filter_type("missing", &rows), FilterType::Text);
        assert_eq!(infer_filter_type("to_date", &rows), FilterType::Date);
    }

    #[test]
    fn test_resolve_descriptor_keeps_declared_attributes() {
        let spec = ColumnSpec::Descriptor(ColumnDescriptor {
            key: "pe_ratio".into(),
            label: Some("P/E".into()),
            filter_type: Some(FilterType::Number),
            filter_operator: Some(FilterOperator::Greater),
        });
        let column = Column::resolve(&spec, &[]);
        assert_eq!(column.label, "P/E");
        assert_eq!(column.filter_type, FilterType::Number);
        assert_eq!(column.filter_operator, FilterOperator::Greater);
    }

    #[test]
    fn test_operator_from_str() {
        assert_eq!("gt".parse::<FilterOperator>().unwrap(), FilterOperator::Greater);
        assert_eq!("less".parse::<FilterOperator>().unwrap(), FilterOperator::Less);
        assert_eq!(
            "between".parse::<FilterOperator>().unwrap(),
            FilterOperator::Between
        );
        assert!("sideways".parse::<FilterOperator>().is_err());
    }
}
