//! Error types for the collector.
//!
//! Per-entry failures (`EntryFailure`) are contained by the orchestrator and
//! only logged; checkpoint, roster and config errors end the run.

use std::path::PathBuf;

use thiserror::Error;

/// Failure talking to the external stats source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP request to {endpoint} failed: {message}")]
    Http { endpoint: String, message: String },

    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: String, status: u16 },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Why a single roster entry could not be enriched this run.
///
/// None of these are fatal; the entry stays out of the checkpoint and is
/// retried by the next run.
#[derive(Debug, Error)]
pub enum EntryFailure {
    #[error("no directory match for {candidate} in {season}")]
    NotFound {
        candidate: String,
        season: String,
        #[source]
        cause: Option<SourceError>,
    },

    #[error("game log unavailable: {0}")]
    SourceUnavailable(#[source] SourceError),

    #[error("game log for {season} has no rows")]
    AggregationEmpty { season: String },
}

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("checkpoint CSV error at {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("checkpoint row {line} is invalid: {message}")]
    InvalidRow { line: u64, message: String },
}

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("cannot read roster {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("roster line {line}: bad season label {label:?}")]
    BadSeason { line: u64, label: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {}", .0.join("; "))]
    Invalid(Vec<String>),
}
