use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("No hub token found: pass --token, set hub.token, or export HF_TOKEN")]
    MissingToken,

    #[error("Invalid repository id `{0}`: expected `owner/name`")]
    InvalidRepoId(String),

    #[error("Folder not found: {0}")]
    MissingFolder(PathBuf),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid hub response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Hub API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("LFS upload failed: {0}")]
    Lfs(String),
}

impl HubError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, HubError>;
