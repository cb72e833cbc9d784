//! Error types for the editor

use querybar_document::DocumentError;
use querybar_validation::RuleError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Delimiter must be a single non-whitespace character other than '\"', got {0:?}")]
    InvalidDelimiter(String),

    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Invalid validation rule: {0}")]
    InvalidRule(#[from] RuleError),

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("No token is focused")]
    NoFocusedToken,

    #[error("Transaction was built against a different document state")]
    StaleTransaction,
}

pub type EditorResult<T> = Result<T, EditorError>;
