//! Query builder: assemble a report query from catalog columns.
//!
//! End users pick a report and tick columns grouped by topic; the builder
//! turns the selection into a `SELECT` statement that is then submitted for
//! review as a pending query.

use std::collections::BTreeSet;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::client::NewQuery;
use crate::error::ReportError;
use crate::query::options::OrderDirection;
use crate::Result;

/// A named set of related columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnGroup {
    pub name: &'static str,
    pub columns: &'static [&'static str],
}

/// A report the builder can query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogReport {
    pub id: &'static str,
    pub name: &'static str,
    pub groups: &'static [ColumnGroup],
}

impl CatalogReport {
    /// All columns in group order.
    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.groups.iter().flat_map(|g| g.columns.iter().copied())
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns().any(|c| c == column)
    }
}

const META: ColumnGroup = ColumnGroup {
    name: "Meta",
    columns: &["date", "company"],
};

/// Every report the builder knows about.
pub const CATALOG: &[CatalogReport] = &[
    CatalogReport {
        id: "stock_prices",
        name: "Stock Prices",
        groups: &[
            ColumnGroup {
                name: "Price Data",
                columns: &["open_price", "high_price", "low_price", "close_price"],
            },
            ColumnGroup {
                name: "Volume Data",
                columns: &["volume"],
            },
            META,
        ],
    },
    CatalogReport {
        id: "financial_metrics",
        name: "Financial Metrics",
        groups: &[
            ColumnGroup {
                name: "Ratios",
                columns: &["pe_ratio", "debt_to_equity", "current_ratio", "roce"],
            },
            ColumnGroup {
                name: "Values",
                columns: &["market_cap", "book_value"],
            },
            META,
        ],
    },
    CatalogReport {
        id: "performance",
        name: "Performance",
        groups: &[
            ColumnGroup {
                name: "Returns",
                columns: &["returns_1m", "returns_3m", "returns_6m", "returns_1y"],
            },
            ColumnGroup {
                name: "Risk",
                columns: &["volatility", "beta"],
            },
            META,
        ],
    },
    CatalogReport {
        id: "dividend",
        name: "Dividend",
        groups: &[
            ColumnGroup {
                name: "Dividend Info",
                columns: &[
                    "dividend_yield",
                    "payout_ratio",
                    "dividend_per_share",
                    "dividend_growth",
                ],
            },
            ColumnGroup {
                name: "Eligibility",
                columns: &["is_eligible"],
            },
            META,
        ],
    },
    CatalogReport {
        id: "technical_indicators",
        name: "Technical Indicators",
        groups: &[
            ColumnGroup {
                name: "Momentum",
                columns: &["rsi_14", "macd", "macd_signal"],
            },
            ColumnGroup {
                name: "Moving Averages",
                columns: &["ma_20", "ma_50", "ma_200"],
            },
            ColumnGroup {
                name: "Bands",
                columns: &["bollinger_upper", "bollinger_middle", "bollinger_lower"],
            },
            ColumnGroup {
                name: "Other",
                columns: &["atr", "stochastic_k", "stochastic_d"],
            },
            META,
        ],
    },
    CatalogReport {
        id: "profit_report",
        name: "Profit Report",
        groups: &[
            ColumnGroup {
                name: "Company Info",
                columns: &["application_no", "symbol", "company_name"],
            },
            ColumnGroup {
                name: "Period",
                columns: &["period_type", "period_end_dt", "from_date", "to_date"],
            },
            ColumnGroup {
                name: "Financials",
                columns: &["net_profit_loss_for_t"],
            },
            ColumnGroup {
                name: "Audit",
                columns: &[
                    "audited_unaudited",
                    "consolidated",
                    "indasnonind",
                    "rf_result_format",
                ],
            },
        ],
    },
];

/// Look up a report by id.
pub fn find_report(id: &str) -> Option<&'static CatalogReport> {
    CATALOG.iter().find(|r| r.id == id)
}

/// Column selection for one report.
///
/// Selected columns are emitted in catalog order regardless of the order
/// they were picked in.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    report: Option<&'static CatalogReport>,
    selected: BTreeSet<&'static str>,
    order_by: Option<&'static str>,
    direction: OrderDirection,
    operation: Option<String>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch report; clears the column selection and ordering.
    pub fn report(mut self, id: &str) -> Result<Self> {
        let report = find_report(id).ok_or_else(|| ReportError::UnknownReport(id.to_string()))?;
        self.report = Some(report);
        self.selected.clear();
        self.order_by = None;
        Ok(self)
    }

    fn catalog_column(&self, column: &str) -> Result<&'static str> {
        let report = self.report.ok_or(ReportError::EmptySelection)?;
        report
            .columns()
            .find(|c| *c == column)
            .ok_or_else(|| ReportError::UnknownColumn {
                report: report.id.to_string(),
                column: column.to_string(),
            })
    }

    pub fn select(mut self, column: &str) -> Result<Self> {
        let column = self.catalog_column(column)?;
        self.selected.insert(column);
        Ok(self)
    }

    /// Select every column of a group by name.
    pub fn select_group(mut self, group: &str) -> Result<Self> {
        let report = self.report.ok_or(ReportError::EmptySelection)?;
        let found = report
            .groups
            .iter()
            .find(|g| g.name.eq_ignore_ascii_case(group))
            .ok_or_else(|| ReportError::UnknownColumn {
                report: report.id.to_string(),
                column: group.to_string(),
            })?;
        self.selected.extend(found.columns.iter().copied());
        Ok(self)
    }

    pub fn deselect(mut self, column: &str) -> Self {
        self.selected.remove(column);
        self
    }

    /// Order by any catalog column of the report, selected or not.
    pub fn order_by(mut self, column: &str, direction: OrderDirection) -> Result<Self> {
        let column = self.catalog_column(column)?;
        self.order_by = Some(column);
        self.direction = direction;
        Ok(self)
    }

    /// Trailing clause appended verbatim (e.g. `LIMIT 10`).
    pub fn operation(mut self, operation: impl Into<String>) -> Self {
        let operation = operation.into();
        let trimmed = operation.trim();
        self.operation = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    /// Selected columns in catalog order.
    pub fn selected_columns(&self) -> Vec<&'static str> {
        match self.report {
            Some(report) => report
                .columns()
                .filter(|c| self.selected.contains(c))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Build the SQL text.
    pub fn build(&self) -> Result<String> {
        let report = self.report.ok_or(ReportError::EmptySelection)?;
        let columns = self.selected_columns();
        if columns.is_empty() {
            return Err(ReportError::EmptySelection);
        }

        let mut sql = format!("SELECT {} FROM {}", columns.join(", "), report.id);
        if let Some(order_by) = self.order_by {
            sql.push_str(&format!(" ORDER BY {} {}", order_by, self.direction.as_sql()));
        }
        if let Some(operation) = &self.operation {
            sql.push(' ');
            sql.push_str(operation);
        }
        Ok(sql)
    }

    /// Build the SQL and wrap it as a pending query with a generated name.
    pub fn to_pending_query(&self) -> Result<NewQuery> {
        let sql = self.build()?;
        Ok(NewQuery::pending(generated_query_name(), sql))
    }
}

/// `user_query_<unix-millis>`
pub fn generated_query_name() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!("user_query_{}", millis)
}
