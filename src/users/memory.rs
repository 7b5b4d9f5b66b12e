use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::instrument;
use uuid::Uuid;

use super::{
    model::{normalize_email, Book, NewUser, User},
    store::{StoreError, UserStore},
};

/// Process-local store. Each mutation holds the write lock for its whole
/// read-modify-write, which keeps per-user updates atomic.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<Vec<User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }

    async fn update<F>(&self, user_id: Uuid, f: F) -> Result<User, StoreError>
    where
        F: FnOnce(&mut User) + Send,
    {
        let mut users = self.users.write().await;
        let user = users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or(StoreError::NotFound)?;
        f(user);
        Ok(user.clone())
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    #[instrument(skip(self, raw_password))]
    async fn create(
        &self,
        username: &str,
        email: &str,
        raw_password: &str,
    ) -> Result<User, StoreError> {
        let new_user = NewUser::prepare(username, email, raw_password)?;
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.username == new_user.username) {
            return Err(StoreError::Validation("Username already taken".into()));
        }
        if users.iter().any(|u| u.email == new_user.email) {
            return Err(StoreError::Validation("Email already registered".into()));
        }
        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username,
            email: new_user.email,
            password_hash: new_user.password_hash,
            saved_books: Vec::new(),
            created_at: OffsetDateTime::now_utc(),
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let email = normalize_email(email);
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id == user_id).cloned())
    }

    #[instrument(skip(self, book), fields(book_id = %book.book_id))]
    async fn add_saved_book(&self, user_id: Uuid, book: Book) -> Result<User, StoreError> {
        let book = book.normalized()?;
        self.update(user_id, move |u| u.upsert_book(book)).await
    }

    #[instrument(skip(self))]
    async fn remove_saved_book(&self, user_id: Uuid, book_id: &str) -> Result<User, StoreError> {
        self.update(user_id, |u| u.remove_book(book_id)).await
    }
}
