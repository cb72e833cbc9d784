use thiserror::Error;

pub type DocumentResult<T> = Result<T, DocumentError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("Position {pos} is outside the document (size {size})")]
    PositionOutOfRange { pos: usize, size: usize },

    #[error("Invalid range {from}..{to}")]
    InvalidRange { from: usize, to: usize },

    #[error("Token not found: {0}")]
    TokenNotFound(String),

    #[error("Segment is not a token: {0}")]
    NotAToken(String),
}

impl DocumentError {
    pub fn out_of_range(pos: usize, size: usize) -> Self {
        Self::PositionOutOfRange { pos, size }
    }

    pub fn invalid_range(from: usize, to: usize) -> Self {
        Self::InvalidRange { from, to }
    }
}
