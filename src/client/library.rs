use std::collections::HashSet;

use tracing::{info, warn};

use crate::users::Book;

use super::{api::BookApi, search::BookSearch, session::Session, ClientError};

/// Dismissible message shown after a failed action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
}

/// What the search and saved-books views render.
///
/// `saved` is whatever `me` last returned; the "already saved" flag on a
/// search result is only as fresh as that fetch.
pub struct Library<A, S> {
    api: A,
    search: S,
    session: Session,
    results: Vec<Book>,
    saved: Vec<Book>,
    notice: Option<Notice>,
}

impl<A: BookApi, S: BookSearch> Library<A, S> {
    pub fn new(api: A, search: S) -> Self {
        Self {
            api,
            search,
            session: Session::new(),
            results: Vec::new(),
            saved: Vec::new(),
            notice: None,
        }
    }

    pub fn with_session(mut self, session: Session) -> Self {
        self.session = session;
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn results(&self) -> &[Book] {
        &self.results
    }

    pub fn saved_books(&self) -> &[Book] {
        &self.saved
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    pub fn is_saved(&self, book_id: &str) -> bool {
        self.saved.iter().any(|b| b.book_id == book_id)
    }

    /// Search results paired with their "already saved" flag.
    pub fn results_with_saved_flags(&self) -> Vec<(&Book, bool)> {
        let saved: HashSet<&str> = self.saved.iter().map(|b| b.book_id.as_str()).collect();
        self.results
            .iter()
            .map(|b| (b, saved.contains(b.book_id.as_str())))
            .collect()
    }

    pub async fn sign_up(
        &mut self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<(), ClientError> {
        match self.api.add_user(username, email, password).await {
            Ok(auth) => {
                info!(username = %auth.user.username, "signed up");
                self.session.login(auth.token);
                self.refresh_saved().await
            }
            Err(e) => self.fail(e),
        }
    }

    pub async fn log_in(&mut self, email: &str, password: &str) -> Result<(), ClientError> {
        match self.api.login(email, password).await {
            Ok(auth) => {
                info!(username = %auth.user.username, "logged in");
                self.session.login(auth.token);
                self.refresh_saved().await
            }
            Err(e) => self.fail(e),
        }
    }

    pub fn log_out(&mut self) {
        self.session.logout();
        self.saved.clear();
    }

    /// Replaces the results wholesale. An empty query does nothing and
    /// returns `false`.
    pub async fn search(&mut self, query: &str) -> Result<bool, ClientError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(false);
        }
        match self.search.search(query).await {
            Ok(books) => {
                self.results = books;
                Ok(true)
            }
            Err(e) => self.fail(e),
        }
    }

    pub async fn refresh_saved(&mut self) -> Result<(), ClientError> {
        let result = match self.session.token() {
            Some(token) => self.api.me(token).await,
            None => Err(ClientError::NotLoggedIn),
        };
        match result {
            Ok(profile) => {
                self.saved = profile.saved_books;
                Ok(())
            }
            Err(e) => self.fail(e),
        }
    }

    pub async fn save(&mut self, book_id: &str) -> Result<(), ClientError> {
        let Some(book) = self.results.iter().find(|b| b.book_id == book_id).cloned() else {
            return self.fail(ClientError::UnknownBook(book_id.to_string()));
        };
        let result = match self.session.token() {
            Some(token) => self.api.save_book(token, &book).await,
            None => Err(ClientError::NotLoggedIn),
        };
        match result {
            Ok(_) => self.refresh_saved().await,
            Err(e) => self.fail(e),
        }
    }

    pub async fn remove(&mut self, book_id: &str) -> Result<(), ClientError> {
        let result = match self.session.token() {
            Some(token) => self.api.remove_book(token, book_id).await,
            None => Err(ClientError::NotLoggedIn),
        };
        match result {
            Ok(_) => self.refresh_saved().await,
            Err(e) => self.fail(e),
        }
    }

    fn fail<T>(&mut self, e: ClientError) -> Result<T, ClientError> {
        warn!(error = %e, "client action failed");
        self.notice = Some(Notice {
            message: e.to_string(),
        });
        Err(e)
    }
}
