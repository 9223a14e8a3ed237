use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Expected a top-level JSON array in {path}")]
    NotAnArray { path: PathBuf },

    #[error("No records converted out of {total}")]
    NoRecords { total: usize },

    #[error("{count} record(s) skipped in strict mode")]
    RecordsSkipped { count: usize },

    #[error("Failed to serialize output: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl ConvertError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;
