use crate::domain::problem::Problem;
use thiserror::Error;

/// Failure reported by a [`Transport`](crate::domain::ports::Transport).
///
/// Non-2xx replies keep their status code and raw body so the executor can
/// look for a problem document in it.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct TransportError {
    pub status: Option<u16>,
    pub body: Option<String>,
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            body: None,
            message: message.into(),
        }
    }

    pub fn with_response(status: u16, body: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            body: Some(body.into()),
            message: format!("HTTP status {status}"),
        }
    }
}

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("{message}")]
    RemoteError {
        message: String,
        status: Option<u16>,
        problems: Vec<Problem>,
        body: Option<String>,
    },
    #[error("{0}")]
    ActionUnavailable(String),
    #[error("{0}")]
    PartialNotSupported(String),
    #[error("{0}")]
    OperationFailed(String),
    #[error("Error: Unknown type {0}")]
    UnknownTransactionType(String),
    #[error("{0}")]
    MissingReference(String),
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Adapter error: {0}")]
    Adapter(String),
}

impl PaymentError {
    /// A remote failure without structured details.
    pub fn remote(message: impl Into<String>) -> Self {
        Self::RemoteError {
            message: message.into(),
            status: None,
            problems: Vec::new(),
            body: None,
        }
    }

    pub fn problems(&self) -> &[Problem] {
        match self {
            Self::RemoteError { problems, .. } => problems,
            _ => &[],
        }
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for PaymentError {
    fn from(e: rocksdb::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PaymentError>;
