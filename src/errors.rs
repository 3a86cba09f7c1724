use thiserror::Error;

use crate::record::CanonicalField;

/// Problems with the static source/pattern configuration. Fatal for the
/// bank they concern, never for the whole run.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown bank id: {0}")]
    UnknownBank(String),
    #[error("bank {bank}: no pattern configured for field {field}")]
    MissingPattern { bank: String, field: CanonicalField },
    #[error("invalid regex template for label {label:?}: {source}")]
    InvalidTemplate {
        label: String,
        #[source]
        source: regex::Error,
    },
    #[error("bank {bank}: invalid region selector {selector:?}: {reason}")]
    InvalidSelector {
        bank: String,
        selector: String,
        reason: String,
    },
    #[error("bank {bank}: pattern for {field} does not apply to {mode} content")]
    PatternModeMismatch {
        bank: String,
        field: CanonicalField,
        mode: &'static str,
    },
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to build http client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    #[error("request to {url} failed after {attempts} attempt(s): {source}")]
    Request {
        url: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with status {status} after {attempts} attempt(s)")]
    Status {
        url: String,
        status: reqwest::StatusCode,
        attempts: u32,
    },
    #[error("no representative example block at {url}, tried selectors {selectors:?}")]
    RegionNotFound { url: String, selectors: Vec<String> },
}

#[derive(Debug, Error)]
pub enum ContentFormatError {
    #[error("json content is empty")]
    Empty,
    #[error("json content is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("json content is not an object")]
    NotAnObject,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("stored timestamp {0:?} could not be parsed")]
    BadTimestamp(String),
}

/// Failures of the export and render step.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

/// Everything that can make a single bank's run fail.
#[derive(Debug, Error)]
pub enum BankRunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    ContentFormat(#[from] ContentFormatError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failures of the final export or render step of a run.
#[derive(Debug, Error)]
pub enum OutputStepError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Output(#[from] OutputError),
}
