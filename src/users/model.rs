use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::{
    claims::Identity,
    password::{hash_password, MIN_PASSWORD_LEN},
};

use super::store::StoreError;

/// Placeholder author used when the source lists none.
pub const NO_AUTHOR: &str = "No author to display";

/// A user's copy of external book metadata, keyed by `book_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub book_id: String,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl Book {
    /// Fills the author sentinel and drops blank optionals. `book_id` is an
    /// opaque key and is kept byte for byte.
    pub fn normalized(self) -> Result<Book, StoreError> {
        if self.book_id.trim().is_empty() {
            return Err(StoreError::Validation("bookId is required".into()));
        }
        let book_id = self.book_id;
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(StoreError::Validation("title is required".into()));
        }
        let mut authors: Vec<String> = self
            .authors
            .into_iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
        if authors.is_empty() {
            authors.push(NO_AUTHOR.to_string());
        }
        Ok(Book {
            book_id,
            title,
            authors,
            description: non_blank(self.description),
            image: non_blank(self.image),
            link: non_blank(self.link),
        })
    }
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 hash, not exposed
    pub saved_books: Vec<Book>,
    pub created_at: OffsetDateTime,
}

impl User {
    pub fn identity(&self) -> Identity {
        Identity {
            username: self.username.clone(),
            email: self.email.clone(),
            id: self.id,
        }
    }

    pub fn book_count(&self) -> usize {
        self.saved_books.len()
    }

    /// Replaces the entry with the same `book_id` in place, or appends.
    pub(crate) fn upsert_book(&mut self, book: Book) {
        match self.saved_books.iter_mut().find(|b| b.book_id == book.book_id) {
            Some(existing) => *existing = book,
            None => self.saved_books.push(book),
        }
    }

    pub(crate) fn remove_book(&mut self, book_id: &str) {
        self.saved_books.retain(|b| b.book_id != book_id);
    }
}

/// Row shape of the `users` table.
#[derive(Debug, FromRow)]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub saved_books: Json<Vec<Book>>,
    pub created_at: OffsetDateTime,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        Self {
            id: r.id,
            username: r.username,
            email: r.email,
            password_hash: r.password_hash,
            saved_books: r.saved_books.0,
            created_at: r.created_at,
        }
    }
}

/// Validated registration input with the password already hashed.
#[derive(Debug)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

impl NewUser {
    pub fn prepare(username: &str, email: &str, raw_password: &str) -> Result<Self, StoreError> {
        let username = username.trim().to_string();
        let email = normalize_email(email);

        if username.is_empty() {
            return Err(StoreError::Validation("Username is required".into()));
        }
        if !is_valid_email(&email) {
            return Err(StoreError::Validation("Must use a valid email address".into()));
        }
        if raw_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(StoreError::Validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let password_hash = hash_password(raw_password)?;
        Ok(Self {
            username,
            email,
            password_hash,
        })
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}
