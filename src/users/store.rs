use async_trait::async_trait;
use uuid::Uuid;

use crate::auth::password;

use super::model::{Book, User};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0}")]
    Validation(String),
    #[error("user not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Persistence for users and their saved books.
///
/// `add_saved_book` and `remove_saved_book` must each be a single atomic
/// update of the owning user record.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Validates, hashes the password and inserts. Duplicate username or
    /// email is a `Validation` error.
    async fn create(&self, username: &str, email: &str, raw_password: &str)
        -> Result<User, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, StoreError>;

    /// Inserts or replaces the entry keyed by `book.book_id`.
    async fn add_saved_book(&self, user_id: Uuid, book: Book) -> Result<User, StoreError>;

    /// Removing an absent book is not an error.
    async fn remove_saved_book(&self, user_id: Uuid, book_id: &str) -> Result<User, StoreError>;

    fn verify_password(&self, user: &User, raw_password: &str) -> Result<bool, StoreError> {
        Ok(password::verify_password(raw_password, &user.password_hash)?)
    }
}
