use async_graphql::{InputObject, Object, SimpleObject, ID};

use crate::users::{Book, User};

#[derive(SimpleObject)]
#[graphql(name = "Book")]
pub struct BookView {
    pub book_id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub link: Option<String>,
}

impl From<Book> for BookView {
    fn from(b: Book) -> Self {
        Self {
            book_id: b.book_id,
            title: b.title,
            authors: b.authors,
            description: b.description,
            image: b.image,
            link: b.link,
        }
    }
}

/// Public view of a user. The password hash has no field here.
pub struct UserView(pub User);

#[Object(name = "User")]
impl UserView {
    #[graphql(name = "_id")]
    async fn id(&self) -> ID {
        ID(self.0.id.to_string())
    }

    async fn username(&self) -> &str {
        &self.0.username
    }

    async fn email(&self) -> &str {
        &self.0.email
    }

    async fn book_count(&self) -> i32 {
        self.0.book_count() as i32
    }

    async fn saved_books(&self) -> Vec<BookView> {
        self.0.saved_books.iter().cloned().map(BookView::from).collect()
    }
}

#[derive(SimpleObject)]
pub struct Auth {
    pub token: String,
    pub user: UserView,
}

#[derive(InputObject)]
pub struct BookInput {
    pub book_id: String,
    pub title: String,
    #[graphql(default)]
    pub authors: Vec<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub link: Option<String>,
}

impl From<BookInput> for Book {
    fn from(b: BookInput) -> Self {
        Book {
            book_id: b.book_id,
            title: b.title,
            authors: b.authors,
            description: b.description,
            image: b.image,
            link: b.link,
        }
    }
}
