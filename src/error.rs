use std::path::PathBuf;

use thiserror::Error;

use crate::validate::Rejection;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("invalid database name '{0}'")]
    InvalidName(String),

    #[error("failed to create database directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to open database at {}: {source}", .path.display())]
    Connect {
        path: PathBuf,
        source: rusqlite::Error,
    },

    #[error("rejected record: {0}")]
    Validation(#[from] Rejection),

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("database connection is closed")]
    Closed,
}

impl StoreError {
    /// Whether the store itself is unusable, as opposed to one bad row.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StoreError::InvalidName(_)
                | StoreError::CreateDir { .. }
                | StoreError::Connect { .. }
                | StoreError::Closed
        )
    }
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned HTTP {status}: {body}")]
    Status { url: String, status: u16, body: String },

    #[error("could not resolve any employer ({queries} queries tried)")]
    NothingFetched { queries: usize },
}

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("catalog unavailable: {0}")]
    Catalog(#[from] CatalogError),

    #[error("store unavailable: {0}")]
    Store(#[from] StoreError),
}
