use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Unknown piece type: {0}")]
    UnknownChannel(String),

    #[error("Limit must be a positive integer, got {0}")]
    InvalidLimit(i64),

    #[error("Invalid FEN: {0}")]
    InvalidFen(String),

    #[error("Invalid square list: {0:?}")]
    InvalidSquareList(String),
}
