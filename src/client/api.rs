use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};

use crate::users::Book;

use super::ClientError;

pub const ADD_USER: &str = r#"
mutation AddUser($username: String!, $email: String!, $password: String!) {
  addUser(username: $username, email: $email, password: $password) {
    token
    user { _id username email bookCount }
  }
}"#;

pub const LOGIN: &str = r#"
mutation Login($email: String!, $password: String!) {
  login(email: $email, password: $password) {
    token
    user { _id username email bookCount }
  }
}"#;

pub const ME: &str = r#"
query Me {
  me {
    _id username email bookCount
    savedBooks { bookId title authors description image link }
  }
}"#;

pub const SAVE_BOOK: &str = r#"
mutation SaveBook($book: BookInput!) {
  saveBook(book: $book) {
    _id username email bookCount
    savedBooks { bookId title authors description image link }
  }
}"#;

pub const REMOVE_BOOK: &str = r#"
mutation RemoveBook($bookId: String!) {
  removeBook(bookId: $bookId) {
    _id username email bookCount
    savedBooks { bookId title authors description image link }
  }
}"#;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub book_count: usize,
    #[serde(default)]
    pub saved_books: Vec<Book>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthPayload {
    pub token: String,
    pub user: Profile,
}

#[derive(Deserialize)]
struct Envelope {
    data: Option<Value>,
    errors: Option<Vec<WireError>>,
}

#[derive(Deserialize)]
struct WireError {
    message: String,
    extensions: Option<Value>,
}

/// Pulls `data.<field>` out of a GraphQL response, or its first error.
pub fn decode_field<T: DeserializeOwned>(body: Value, field: &str) -> Result<T, ClientError> {
    let envelope: Envelope = serde_json::from_value(body)?;
    if let Some(err) = envelope.errors.and_then(|errs| errs.into_iter().next()) {
        let code = err
            .extensions
            .as_ref()
            .and_then(|ext| ext.get("code"))
            .and_then(Value::as_str)
            .map(str::to_string);
        return Err(ClientError::Api {
            message: err.message,
            code,
        });
    }
    let value = envelope
        .data
        .and_then(|mut data| data.get_mut(field).map(Value::take))
        .filter(|v| !v.is_null())
        .ok_or(ClientError::EmptyResponse)?;
    Ok(serde_json::from_value(value)?)
}

/// The book server's GraphQL operations. Implementors only provide transport.
#[async_trait]
pub trait BookApi: Send + Sync {
    /// Sends one GraphQL document and returns the raw response body.
    async fn execute(
        &self,
        token: Option<&str>,
        query: &str,
        variables: Value,
    ) -> Result<Value, ClientError>;

    async fn add_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthPayload, ClientError> {
        let vars = json!({"username": username, "email": email, "password": password});
        decode_field(self.execute(None, ADD_USER, vars).await?, "addUser")
    }

    async fn login(&self, email: &str, password: &str) -> Result<AuthPayload, ClientError> {
        let vars = json!({"email": email, "password": password});
        decode_field(self.execute(None, LOGIN, vars).await?, "login")
    }

    async fn me(&self, token: &str) -> Result<Profile, ClientError> {
        decode_field(self.execute(Some(token), ME, json!({})).await?, "me")
    }

    async fn save_book(&self, token: &str, book: &Book) -> Result<Profile, ClientError> {
        let vars = json!({"book": book});
        decode_field(self.execute(Some(token), SAVE_BOOK, vars).await?, "saveBook")
    }

    async fn remove_book(&self, token: &str, book_id: &str) -> Result<Profile, ClientError> {
        let vars = json!({"bookId": book_id});
        decode_field(self.execute(Some(token), REMOVE_BOOK, vars).await?, "removeBook")
    }
}

/// HTTP transport against a running server.
#[derive(Clone)]
pub struct GraphqlClient {
    endpoint: Url,
    client: Client,
}

impl GraphqlClient {
    pub fn new(base_url: &Url) -> Result<Self, ClientError> {
        let endpoint = base_url.join(crate::graphql::GRAPHQL_PATH)?;
        let client = Client::builder().build()?;
        Ok(Self { endpoint, client })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl BookApi for GraphqlClient {
    async fn execute(
        &self,
        token: Option<&str>,
        query: &str,
        variables: Value,
    ) -> Result<Value, ClientError> {
        let mut request = self
            .client
            .post(self.endpoint.clone())
            .json(&json!({"query": query, "variables": variables}));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|_| ClientError::Api {
            message: format!("HTTP {status}: {text}"),
            code: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_field_reads_data() {
        let body = json!({"data": {"me": {
            "_id": "1", "username": "alice", "email": "alice@example.com", "bookCount": 1,
            "savedBooks": [{"bookId": "B1", "title": "T", "authors": ["A"], "description": null, "image": null, "link": null}]
        }}});
        let profile: Profile = decode_field(body, "me").unwrap();
        assert_eq!(profile.username, "alice");
        assert_eq!(profile.saved_books[0].book_id, "B1");
        assert_eq!(profile.saved_books[0].description, None);
    }

    #[test]
    fn decode_field_surfaces_first_error_with_code() {
        let body = json!({
            "data": null,
            "errors": [{"message": "You need to be logged in!", "extensions": {"code": "UNAUTHENTICATED"}}]
        });
        let err = decode_field::<Profile>(body, "me").unwrap_err();
        assert!(err.is_unauthenticated());
        assert_eq!(err.to_string(), "You need to be logged in!");
    }

    #[test]
    fn decode_field_without_data_is_empty() {
        let err = decode_field::<Profile>(json!({"data": {"me": null}}), "me").unwrap_err();
        assert!(matches!(err, ClientError::EmptyResponse));
    }

    #[test]
    fn endpoint_joins_graphql_path() {
        let client = GraphqlClient::new(&Url::parse("http://localhost:3001/app/").unwrap()).unwrap();
        assert_eq!(client.endpoint().as_str(), "http://localhost:3001/graphql");
    }

    #[tokio::test]
    async fn client_drives_a_live_server() {
        use crate::{app::build_app, state::AppState};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, build_app(AppState::fake())).await.unwrap();
        });
        let client = GraphqlClient::new(&Url::parse(&format!("http://{addr}/")).unwrap()).unwrap();

        let auth = client
            .add_user("alice", "alice@example.com", "secret123")
            .await
            .unwrap();
        assert_eq!(auth.user.username, "alice");

        let me = client.me(&auth.token).await.unwrap();
        assert_eq!(me.id, auth.user.id);
        assert!(me.saved_books.is_empty());

        let book = Book {
            book_id: "B1".into(),
            title: "T".into(),
            authors: vec![],
            description: None,
            image: None,
            link: None,
        };
        let saved = client.save_book(&auth.token, &book).await.unwrap();
        assert_eq!(saved.book_count, 1);
        assert_eq!(saved.saved_books[0].authors, vec![crate::users::NO_AUTHOR.to_string()]);

        let removed = client.remove_book(&auth.token, "B1").await.unwrap();
        assert_eq!(removed.book_count, 0);

        // a missing header reaches the server as an anonymous request
        let body = client.execute(None, ME, json!({})).await.unwrap();
        let err = decode_field::<Profile>(body, "me").unwrap_err();
        assert!(err.is_unauthenticated());

        let err = client.me("garbage").await.unwrap_err();
        assert!(err.is_unauthenticated());
    }
}
