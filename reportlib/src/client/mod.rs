//! HTTP client for the report API.
//!
//! The backend owns report data, saved queries and the approval workflow;
//! this client only moves JSON back and forth. Report payloads are turned
//! into [`Dataset`]s so they can go straight into a query set.
//!
//! ```rust,no_run
//! # async fn run() -> reportlib::Result<()> {
//! use reportlib::client::{ApiClient, SearchOptions};
//!
//! let client = ApiClient::new()?;
//! let dataset = client
//!     .search(&SearchOptions::new("stock_prices").companies(["INFY"]))
//!     .await?;
//! println!("{} rows", dataset.rows.len());
//! # Ok(())
//! # }
//! ```

pub mod types;

use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::data::row::{Dataset, QueryResult};
use crate::error::ReportError;
use crate::poll::QuerySource;
use crate::Result;

pub use types::{
    latest_variation, DeveloperQuery, LinkRequest, NewQuery, QueryListFilter, QueryStatus,
    QueryUpdate, ReportType, SearchOptions,
};

use types::{ErrorBody, RunQueryRequest};

/// Base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

/// Connection settings for [`ApiClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    /// Per-request timeout; `None` waits indefinitely
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Builder: set the request timeout
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Async client for every endpoint the report frontend talks to.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    /// Client for the default local backend.
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http: builder.build()?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = check_status(request.send().await?).await?;
        Ok(response.json::<T>().await?)
    }

    // Reports

    /// Company names available for filtering.
    pub async fn companies(&self) -> Result<Vec<String>> {
        log::debug!("GET /companies");
        self.send(self.http.get(self.url("companies"))).await
    }

    /// All report types with their column descriptors.
    pub async fn report_types(&self) -> Result<Vec<ReportType>> {
        log::debug!("GET /report-types");
        self.send(self.http.get(self.url("report-types"))).await
    }

    /// Report rows matching the search options.
    pub async fn search(&self, options: &SearchOptions) -> Result<Dataset> {
        log::debug!("GET /reports/search report_type={}", options.report_type);
        let request = self
            .http
            .get(self.url("reports/search"))
            .query(&options.to_params());
        let value: Value = self.send(request).await?;
        Dataset::from_json(value)
    }

    /// A single report row by id.
    pub async fn report(&self, id: i64) -> Result<Dataset> {
        let value: Value = self
            .send(self.http.get(self.url(&format!("reports/{}", id))))
            .await?;
        let rows = match value {
            Value::Null => Value::Null,
            Value::Array(items) => Value::Array(items),
            object => Value::Array(vec![object]),
        };
        Dataset::from_json(rows)
    }

    // Queries

    /// Run raw SQL and return its result set.
    pub async fn run_query(&self, sql: &str) -> Result<Dataset> {
        log::debug!("POST /run-query");
        let request = self
            .http
            .post(self.url("run-query"))
            .json(&RunQueryRequest { query: sql });
        let result: QueryResult = self.send(request).await?;
        Ok(Dataset::from_query_result(result))
    }

    /// Run a saved query by name.
    pub async fn run_saved_query_by_name(&self, name: &str) -> Result<Dataset> {
        let request = self
            .http
            .get(self.url("run-saved-query"))
            .query(&[("name", name)]);
        let value: Value = self.send(request).await?;
        Dataset::from_json(value)
    }

    /// Run a saved query by id.
    pub async fn run_saved_query_by_id(&self, id: i64) -> Result<Dataset> {
        let request = self
            .http
            .get(self.url("run-saved-query"))
            .query(&[("id", id.to_string())]);
        let value: Value = self.send(request).await?;
        Dataset::from_json(value)
    }

    pub async fn list_queries(&self, filter: &QueryListFilter) -> Result<Vec<DeveloperQuery>> {
        let request = self
            .http
            .get(self.url("developer-queries"))
            .query(&filter.to_params());
        self.send(request).await
    }

    pub async fn get_query(&self, id: i64) -> Result<DeveloperQuery> {
        self.send(self.http.get(self.url(&format!("developer-queries/{}", id))))
            .await
    }

    pub async fn create_query(&self, query: &NewQuery) -> Result<DeveloperQuery> {
        log::info!("saving query '{}' as {}", query.name, query.status);
        self.send(self.http.post(self.url("developer-queries")).json(query))
            .await
    }

    pub async fn update_query(&self, id: i64, update: &QueryUpdate) -> Result<DeveloperQuery> {
        let request = self
            .http
            .put(self.url(&format!("developer-queries/{}", id)))
            .json(update);
        self.send(request).await
    }

    pub async fn delete_query(&self, id: i64) -> Result<()> {
        log::info!("deleting query {}", id);
        let request = self
            .http
            .delete(self.url(&format!("developer-queries/{}", id)));
        check_status(request.send().await?).await?;
        Ok(())
    }

    /// Attach a saved query to a report type.
    pub async fn link_query_to_report(&self, report_type: &str, query_name: &str) -> Result<Value> {
        let body = LinkRequest {
            report_type_name: report_type.to_string(),
            developer_query_name: query_name.to_string(),
        };
        self.send(self.http.post(self.url("link-query-to-report")).json(&body))
            .await
    }

    pub async fn queries_for_report(&self, report_type: &str) -> Result<Vec<DeveloperQuery>> {
        self.send(
            self.http
                .get(self.url(&format!("queries-for-report/{}", report_type))),
        )
        .await
    }

    pub async fn report_type_for_query(&self, query_name: &str) -> Result<Value> {
        self.send(
            self.http
                .get(self.url(&format!("report-type-for-query/{}", query_name))),
        )
        .await
    }
}

impl QuerySource for ApiClient {
    async fn fetch_query(&self, id: i64) -> Result<DeveloperQuery> {
        self.get_query(id).await
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ReportError::Api {
        status: status.as_u16(),
        detail: error_detail(&body, status),
    })
}

/// The backend's `detail` message, the raw body, or the status reason.
fn error_detail(body: &str, status: StatusCode) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            detail: Value::String(detail),
        }) => detail,
        Ok(ErrorBody { detail }) => detail.to_string(),
        Err(_) if !body.trim().is_empty() => body.trim().to_string(),
        Err(_) => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
    }
}
