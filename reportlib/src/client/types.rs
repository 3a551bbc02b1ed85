//! Wire types for the report API.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::data::column::ColumnDescriptor;
use crate::error::ReportError;

/// A report the backend can serve, with its column descriptors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportType {
    /// Report identifier sent as `report_type`
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub columns: Vec<ColumnDescriptor>,
    /// Saved query backing this report, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_name: Option<String>,
}

/// Review status of a developer query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl QueryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            QueryStatus::Pending => "pending",
            QueryStatus::Approved => "approved",
            QueryStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryStatus {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(QueryStatus::Pending),
            "approved" => Ok(QueryStatus::Approved),
            "rejected" => Ok(QueryStatus::Rejected),
            other => Err(ReportError::InvalidFilter {
                filter: other.to_string(),
                message: "status must be pending, approved or rejected".to_string(),
            }),
        }
    }
}

/// A saved query as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeveloperQuery {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variation_name: Option<String>,
    pub query: String,
    pub status: QueryStatus,
    /// Creation timestamp as sent by the backend (ISO 8601)
    #[serde(default)]
    pub created_at: String,
}

impl DeveloperQuery {
    pub fn is_approved(&self) -> bool {
        self.status == QueryStatus::Approved
    }
}

/// Body of `POST /developer-queries`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewQuery {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variation_name: Option<String>,
    pub query: String,
    pub status: QueryStatus,
}

impl NewQuery {
    /// A query saved from the editor; trusted and stored as approved.
    pub fn approved(name: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variation_name: None,
            query: query.into(),
            status: QueryStatus::Approved,
        }
    }

    /// A query submitted for review.
    pub fn pending(name: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            status: QueryStatus::Pending,
            ..Self::approved(name, query)
        }
    }

    pub fn with_variation(mut self, variation: impl Into<String>) -> Self {
        self.variation_name = Some(variation.into());
        self
    }
}

/// Body of `PUT /developer-queries/{id}`; only set fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<QueryStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variation_name: Option<String>,
}

impl QueryUpdate {
    pub fn status(status: QueryStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

/// Query-string filters for `GET /developer-queries`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryListFilter {
    pub name: Option<String>,
    pub status: Option<QueryStatus>,
}

impl QueryListFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn status(mut self, status: QueryStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub(crate) fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            params.push(("name", name.to_string()));
        }
        if let Some(status) = self.status {
            params.push(("status", status.to_string()));
        }
        params
    }
}

/// Parameters of `GET /reports/search`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOptions {
    pub report_type: String,
    pub companies: Vec<String>,
    /// `YYYY-MM-DD`
    pub start_date: Option<String>,
    /// `YYYY-MM-DD`
    pub end_date: Option<String>,
    pub search_term: Option<String>,
}

impl SearchOptions {
    pub fn new(report_type: impl Into<String>) -> Self {
        Self {
            report_type: report_type.into(),
            ..Self::default()
        }
    }

    pub fn companies<I, S>(mut self, companies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.companies = companies.into_iter().map(Into::into).collect();
        self
    }

    pub fn start_date(mut self, date: impl Into<String>) -> Self {
        self.start_date = Some(date.into());
        self
    }

    pub fn end_date(mut self, date: impl Into<String>) -> Self {
        self.end_date = Some(date.into());
        self
    }

    pub fn search_term(mut self, term: impl Into<String>) -> Self {
        self.search_term = Some(term.into());
        self
    }

    /// Query pairs; `companies` repeats once per company, empty values are
    /// left out.
    pub(crate) fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("report_type", self.report_type.clone())];
        for company in &self.companies {
            params.push(("companies", company.clone()));
        }
        let optional = [
            ("start_date", &self.start_date),
            ("end_date", &self.end_date),
            ("search_term", &self.search_term),
        ];
        for (name, value) in optional {
            if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
                params.push((name, v.to_string()));
            }
        }
        params
    }
}

/// Body of `POST /link-query-to-report`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRequest {
    pub report_type_name: String,
    pub developer_query_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct RunQueryRequest<'a> {
    pub query: &'a str,
}

/// Error body FastAPI-style backends send with non-2xx responses.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub detail: serde_json::Value,
}

/// Newest variation among queries sharing a name, by `created_at`.
///
/// ISO 8601 timestamps order lexicographically, so the raw strings are
/// compared; ties keep the first one seen.
pub fn latest_variation(queries: &[DeveloperQuery]) -> Option<&DeveloperQuery> {
    queries.iter().fold(None, |best: Option<&DeveloperQuery>, q| match best {
        Some(b) if b.created_at >= q.created_at => Some(b),
        _ => Some(q),
    })
}
