use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::debug;

use crate::users::{Book, NO_AUTHOR};

use super::ClientError;

pub const GOOGLE_BOOKS_URL: &str = "https://www.googleapis.com/books/v1/volumes";

/// External catalogue the search view queries.
#[async_trait]
pub trait BookSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<Book>, ClientError>;
}

pub struct GoogleBooks {
    endpoint: Url,
    client: Client,
}

impl GoogleBooks {
    pub fn new() -> Result<Self, ClientError> {
        Self::with_endpoint(Url::parse(GOOGLE_BOOKS_URL)?)
    }

    pub fn with_endpoint(endpoint: Url) -> Result<Self, ClientError> {
        Ok(Self {
            endpoint,
            client: Client::builder().build()?,
        })
    }
}

#[async_trait]
impl BookSearch for GoogleBooks {
    async fn search(&self, query: &str) -> Result<Vec<Book>, ClientError> {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("q", query);
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let books = parse_volumes(&body)?;
        debug!(query, results = books.len(), "book search");
        Ok(books)
    }
}

#[derive(Deserialize)]
struct VolumeList {
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Volume {
    id: String,
    #[serde(default)]
    volume_info: VolumeInfo,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumeInfo {
    #[serde(default)]
    title: String,
    authors: Option<Vec<String>>,
    description: Option<String>,
    image_links: Option<ImageLinks>,
    preview_link: Option<String>,
}

#[derive(Deserialize)]
struct ImageLinks {
    thumbnail: Option<String>,
}

impl From<Volume> for Book {
    fn from(v: Volume) -> Self {
        let info = v.volume_info;
        let authors = info
            .authors
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| vec![NO_AUTHOR.to_string()]);
        Book {
            book_id: v.id,
            title: info.title,
            authors,
            description: info.description,
            image: info
                .image_links
                .and_then(|l| l.thumbnail)
                .filter(|s| !s.is_empty()),
            link: info.preview_link.filter(|s| !s.is_empty()),
        }
    }
}

/// Maps a volumes response body to books. A body without `items` is no results.
pub fn parse_volumes(body: &str) -> Result<Vec<Book>, ClientError> {
    let list: VolumeList = serde_json::from_str(body)?;
    Ok(list.items.into_iter().map(Book::from).collect())
}
