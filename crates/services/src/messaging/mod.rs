pub mod log;
pub mod read;
pub mod service;

use thiserror::Error;

use crate::dao::base::DaoError;

pub use service::ChatService;

/// Error taxonomy for chat operations. `Validation` and `InvalidOperation`
/// map to 400, `NotFound` to 404, `Forbidden` to 403 at the API layer.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    InvalidOperation(String),
    #[error(transparent)]
    Dao(DaoError),
}

impl From<DaoError> for ChatError {
    fn from(err: DaoError) -> Self {
        match err {
            DaoError::NotFound => ChatError::NotFound("Resource not found".to_string()),
            DaoError::Validation(msg) => ChatError::Validation(msg),
            other => ChatError::Dao(other),
        }
    }
}

pub type ChatResult<T> = Result<T, ChatError>;
