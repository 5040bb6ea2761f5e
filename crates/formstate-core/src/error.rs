use thiserror::Error;

pub type Result<T> = std::result::Result<T, FormError>;

/// Failure reported by a [`Validator`](crate::Validator) implementation.
///
/// This is an execution failure (the validator could not run), not a
/// validation message. Messages travel in the error map.
#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error("validator failed: {message}")]
    Failed { message: String },

    #[error("validator unavailable")]
    Unavailable,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ValidatorError {
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum FormError {
    #[error("form has been destroyed")]
    Destroyed,

    #[error(transparent)]
    Validator(#[from] ValidatorError),
}
