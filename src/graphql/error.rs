use async_graphql::ErrorExtensions;
use tracing::error;

use crate::users::StoreError;

/// Errors that cross the API boundary. Anything else is wrapped as `Internal`
/// and reaches the caller only as a generic message.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Authentication(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn login_required() -> Self {
        ApiError::Authentication("You need to be logged in!".into())
    }

    pub fn invalid_credentials() -> Self {
        ApiError::Authentication("Invalid credentials".into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Authentication(_) => "UNAUTHENTICATED",
            ApiError::Validation(_) => "BAD_USER_INPUT",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Validation(msg) => ApiError::Validation(msg),
            StoreError::NotFound => ApiError::NotFound("Couldn't find user with this id!".into()),
            StoreError::Database(e) => ApiError::Internal(e.into()),
            StoreError::Internal(e) => ApiError::Internal(e),
        }
    }
}

impl ErrorExtensions for ApiError {
    fn extend(&self) -> async_graphql::Error {
        let message = match self {
            ApiError::Internal(e) => {
                error!(error = %e, "internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        let code = self.code();
        async_graphql::Error::new(message).extend_with(|_, ext| ext.set("code", code))
    }
}
