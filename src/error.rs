use thiserror::Error;

/// Top-level error type for the entire application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Cursor store error: {0}")]
    Cursor(#[from] CursorError),

    #[error("Funding error: {0}")]
    Funding(#[from] FundingError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("External error: {0}")]
    ExternalError(String),
}

/// Horizon query errors
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Account not found on ledger: {0}")]
    AccountNotFound(String),

    #[error("Horizon returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Horizon request failed: {0}")]
    Request(String),

    #[error("Malformed paging token: {0}")]
    MalformedToken(String),
}

/// Cursor persistence errors
#[derive(Error, Debug)]
pub enum CursorError {
    #[error("Failed to read cursor at {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write cursor at {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Testnet funding errors
#[derive(Error, Debug)]
pub enum FundingError {
    #[error("Account {address} not funded: status {status}")]
    NotFunded { address: String, status: u16 },

    #[error("Friendbot request failed for {address}: {message}")]
    Request { address: String, message: String },
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        AppError::ExternalError(format!("HTTP request error: {:?}", error))
    }
}

/// Result type alias for the application
pub type AppResult<T> = Result<T, AppError>;
