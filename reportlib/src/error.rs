//! Error types for reportlib

use chrono::NaiveDate;
use thiserror::Error;

/// Errors that can occur while loading, querying or exporting report data.
///
/// Malformed cell values never surface here: filters and date detection
/// resolve them to "does not match" / "not a date" instead.
#[derive(Error, Debug)]
pub enum ReportError {
    /// IO error (reading a dataset file, writing a CSV export)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON payload or dataset
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Transport-level HTTP failure (connection refused, timeout, bad body)
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status
    #[error("API error ({status}): {detail}")]
    Api { status: u16, detail: String },

    /// Start date lies after end date
    #[error("start date {start} cannot be after end date {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    /// A date bound could not be parsed
    #[error("invalid date '{0}'")]
    InvalidDate(String),

    /// A column filter expression could not be understood
    #[error("invalid filter '{filter}': {message}")]
    InvalidFilter { filter: String, message: String },

    /// Report id is not in the builder catalog
    #[error("unknown report '{0}'")]
    UnknownReport(String),

    /// Column is not known for the report
    #[error("unknown column '{column}' for report '{report}'")]
    UnknownColumn { report: String, column: String },

    /// A query was built without a report or without any column
    #[error("select a report and at least one column to build a query")]
    EmptySelection,

    /// The submitted query was rejected by a reviewer
    #[error("query {0} was rejected")]
    QueryRejected(i64),

    /// Polling was cancelled before the query was approved
    #[error("stopped waiting for approval of query {0}")]
    PollCancelled(i64),

    /// Polling ran out of attempts
    #[error("query {id} still not approved after {attempts} checks")]
    PollExhausted { id: i64, attempts: u32 },

    /// Polling ran out of time
    #[error("query {id} still not approved after {seconds}s")]
    PollTimeout { id: i64, seconds: u64 },
}
