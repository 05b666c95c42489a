//! Client-side error type.

use groupwatch_shared::ApiError;

use crate::forms::ValidationError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClientError {
    #[error("{}", .0.message())]
    Api(#[from] ApiError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Not signed in")]
    Unauthenticated,
}

impl ClientError {
    /// Text to show next to the action that failed.
    pub fn message(&self) -> String {
        self.to_string()
    }

    pub fn is_unauthorized(&self) -> bool {
        match self {
            ClientError::Api(e) => e.is_unauthorized(),
            ClientError::Unauthenticated => true,
            ClientError::Validation(_) => false,
        }
    }
}
