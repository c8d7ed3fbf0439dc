//! Typed failures surfaced by the core.
//!
//! Filtering and rolling never fail; only decoding, fetching, snapshot
//! import, and group lookups do. Each of those is all-or-nothing, so an
//! `Err` always means no state was changed.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("input is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("input is not valid CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to decode text with encoding {0}")]
    Encoding(&'static str),
    #[error("unexpected input shape: {0}")]
    Shape(String),
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to read snapshot: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot is not a valid document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("snapshot is inconsistent: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {url} returned status {status}")]
    Status { url: String, status: u16 },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("no group named '{0}'")]
    UnknownGroup(String),
    #[error("no kept item with id '{0}'")]
    UnknownItem(String),
}
