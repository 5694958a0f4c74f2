use thiserror::Error;

use crate::matrix::Shape;

#[derive(Debug, Error)]
pub enum PrepError {
    #[error("column `{column}` of game {game_id} cannot be coerced: found {found}")]
    DataFormat {
        column: &'static str,
        game_id: i64,
        found: String,
    },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("dimension mismatch for {what}: expected {expected}, found {found}")]
    DimensionMismatch {
        what: String,
        expected: Shape,
        found: Shape,
    },

    #[error("missing bundle key `{0}`")]
    MissingKey(String),

    #[error("node `{0}` is already declared")]
    DuplicateNode(String),

    #[error("node `{0}` is not declared")]
    UnknownNode(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl PrepError {
    pub(crate) fn mismatch(what: impl Into<String>, expected: Shape, found: Shape) -> Self {
        PrepError::DimensionMismatch {
            what: what.into(),
            expected,
            found,
        }
    }
}

pub type Result<T> = std::result::Result<T, PrepError>;
