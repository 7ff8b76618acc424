//! Error types for text2sql.
//!
//! Defines the main error enum used throughout the service.

use thiserror::Error;

use crate::safety::Rejection;

/// Main error type for text2sql operations.
#[derive(Error, Debug)]
pub enum Text2SqlError {
    /// The incoming request is malformed (empty question, limit out of range).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Model output contained no recoverable SQL statement.
    #[error("SQL parsing error: {0}")]
    Extraction(String),

    /// The statement failed the read-only / single-statement gate.
    #[error("{0}")]
    Validation(Rejection),

    /// The data store rejected or failed to run the statement.
    #[error("SQL execution error: {0}")]
    Execution(String),

    /// Language model provider errors (rate limits, auth, bad responses, etc.)
    #[error("Model error: {0}")]
    Llm(String),

    /// A model call or query ran past its deadline.
    #[error("Timed out: {0}")]
    Timeout(String),

    /// The caller went away before the request finished.
    #[error("Request cancelled")]
    Cancelled,

    /// Data store unreachable (file missing, pool exhausted, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Configuration errors (invalid config file, missing required fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Text2SqlError {
    /// Creates an invalid request error with the given message.
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Creates an extraction error with the given message.
    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::Extraction(msg.into())
    }

    /// Creates an execution error with the given message.
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    /// Creates an LLM error with the given message.
    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    /// Creates a timeout error with the given message.
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "Invalid Request",
            Self::Extraction(_) => "Extraction Error",
            Self::Validation(_) => "Validation Error",
            Self::Execution(_) => "Execution Error",
            Self::Llm(_) => "Model Error",
            Self::Timeout(_) => "Timeout",
            Self::Cancelled => "Cancelled",
            Self::Connection(_) => "Connection Error",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// Returns a stable machine-readable kind, used in error response bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::Extraction(_) => "extraction_error",
            Self::Validation(_) => "validation_error",
            Self::Execution(_) => "execution_error",
            Self::Llm(_) => "model_error",
            Self::Timeout(_) => "timeout",
            Self::Cancelled => "cancelled",
            Self::Connection(_) => "connection_error",
            Self::Config(_) => "config_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Returns true if the failure is attributable to the caller's input
    /// (or to the SQL generated from it) rather than to the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidRequest(_) | Self::Extraction(_) | Self::Validation(_) | Self::Execution(_)
        )
    }
}

impl From<Rejection> for Text2SqlError {
    fn from(rejection: Rejection) -> Self {
        Self::Validation(rejection)
    }
}

/// Result type alias using Text2SqlError.
pub type Result<T> = std::result::Result<T, Text2SqlError>;
