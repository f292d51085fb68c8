use std::path::PathBuf;

use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum CatalogError {
    #[error("catalog source request failed: {0}")]
    SourceHttp(String),

    #[error("catalog source returned status {status}: {message}")]
    SourceStatus { status: u16, message: String },

    #[error("catalog source payload could not be decoded: {0}")]
    SourceDecode(String),

    #[error("unexpected generation slug: {0}")]
    #[diagnostic(help("extend the roman numeral table if a new generation was released"))]
    InvalidGenerationSlug(String),

    #[error("expected generation slug to be a string, got {0}")]
    UnexpectedSlugType(String),

    #[error("no evolution chain id in reference: {0}")]
    MissingEvolutionChainId(String),

    #[error("species has no default variety: {0}")]
    MissingDefaultVariety(String),

    #[error("malformed catalog payload: {0}")]
    MalformedPayload(String),

    #[error("unknown type: {0}")]
    #[diagnostic(help("types must be seeded before species are ingested"))]
    UnknownType(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("refusing to truncate tables without confirmation")]
    #[diagnostic(help("pass --yes together with --truncate"))]
    TruncateNotConfirmed,

    #[error("ingestion cancelled")]
    Cancelled,
}

/// Coarse classification used by the run report and the CLI exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    SourceFetch,
    Parse,
    DataIntegrity,
    Storage,
    Config,
    Cancelled,
}

impl CatalogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::SourceHttp(_)
            | CatalogError::SourceStatus { .. }
            | CatalogError::SourceDecode(_) => ErrorKind::SourceFetch,
            CatalogError::InvalidGenerationSlug(_)
            | CatalogError::UnexpectedSlugType(_)
            | CatalogError::MissingEvolutionChainId(_)
            | CatalogError::MissingDefaultVariety(_)
            | CatalogError::MalformedPayload(_) => ErrorKind::Parse,
            CatalogError::UnknownType(_) => ErrorKind::DataIntegrity,
            CatalogError::Storage(_) => ErrorKind::Storage,
            CatalogError::ConfigRead(_)
            | CatalogError::ConfigParse(_)
            | CatalogError::Filesystem(_)
            | CatalogError::TruncateNotConfirmed => ErrorKind::Config,
            CatalogError::Cancelled => ErrorKind::Cancelled,
        }
    }
}

impl From<rusqlite::Error> for CatalogError {
    fn from(err: rusqlite::Error) -> Self {
        CatalogError::Storage(err.to_string())
    }
}
