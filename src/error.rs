use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum SyncError {
    #[error("missing credential: environment variable {0} is not set")]
    #[diagnostic(help("export {0} or add it to a .env file in the working directory"))]
    MissingCredential(&'static str),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("failed to read species list at {0}")]
    SpeciesListRead(PathBuf),

    #[error("failed to parse species list: {0}")]
    SpeciesListParse(String),

    #[error("failed to read dataset at {0}")]
    DatasetRead(PathBuf),

    #[error("failed to parse dataset: {0}")]
    DatasetParse(String),

    #[error("registry request failed: {0}")]
    RegistryHttp(String),

    #[error("registry returned status {status}: {message}")]
    RegistryStatus { status: u16, message: String },

    #[error("archive request failed: {0}")]
    ArchiveHttp(String),

    #[error("archive returned status {status}: {message}")]
    ArchiveStatus { status: u16, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("species step aborted: {0}")]
    SpeciesAborted(String),
}

impl SyncError {
    /// Non-2xx answers from either upstream. Callers treat these as "no data".
    pub fn is_status(&self) -> bool {
        matches!(
            self,
            SyncError::RegistryStatus { .. } | SyncError::ArchiveStatus { .. }
        )
    }
}
