//! Client side of the book app: talks to the GraphQL server and the book
//! catalogue, and keeps the state the search and saved-books views render.

pub mod api;
pub mod library;
pub mod search;
pub mod session;

pub use api::{AuthPayload, BookApi, GraphqlClient, Profile};
pub use library::{Library, Notice};
pub use search::{BookSearch, GoogleBooks};
pub use session::Session;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("{message}")]
    Api {
        message: String,
        code: Option<String>,
    },
    #[error("response carried no data")]
    EmptyResponse,
    #[error("You need to be logged in!")]
    NotLoggedIn,
    #[error("book {0} is not in the current results")]
    UnknownBook(String),
}

impl ClientError {
    pub fn is_unauthenticated(&self) -> bool {
        match self {
            ClientError::NotLoggedIn => true,
            ClientError::Api { code, .. } => code.as_deref() == Some("UNAUTHENTICATED"),
            _ => false,
        }
    }
}
