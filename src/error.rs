use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("failed to read dataset {}", path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unknown text encoding label {0:?}")]
    UnknownEncoding(String),
    #[error("dataset {} is not valid {encoding}", path.display())]
    Encoding { path: PathBuf, encoding: &'static str },
    #[error("dataset is missing required column {column:?}")]
    MissingColumn { column: &'static str },
    #[error("malformed row at line {line}: {message}")]
    Malformed { line: u64, message: String },
    #[error("computation failed: {0}")]
    Computation(String),
}

pub type Result<T> = std::result::Result<T, DashboardError>;
