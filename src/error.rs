use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckerError {
    #[error("Min delay cannot be greater than Max delay.")]
    InvalidDelayRange,
    #[error("No usernames loaded. Please select a file.")]
    NoUsernames,
    #[error("No results to export.")]
    NoResults,
    #[error("session store: {0}")]
    Store(#[from] SessionStoreError),
    #[error("job runner: {0}")]
    Client(#[from] ClientError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("stored session is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("failed to access session file: {0}")]
    Io(#[from] std::io::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("job runner answered {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("unknown job {0}")]
    UnknownJob(String),
}
