use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use tracing::instrument;
use uuid::Uuid;

use super::{
    model::{normalize_email, Book, NewUser, User, UserRow},
    store::{StoreError, UserStore},
};

const USER_COLUMNS: &str = "id, username, email, password_hash, saved_books, created_at";

/// One row per user; saved books live in a JSONB array on that row so every
/// change is a single-row `UPDATE`.
#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn map_insert_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            let msg = match db.constraint() {
                Some("users_username_key") => "Username already taken",
                _ => "Email already registered",
            };
            return StoreError::Validation(msg.into());
        }
    }
    StoreError::Database(e)
}

#[async_trait]
impl UserStore for PgUserStore {
    #[instrument(skip(self, raw_password))]
    async fn create(
        &self,
        username: &str,
        email: &str,
        raw_password: &str,
    ) -> Result<User, StoreError> {
        let new_user = NewUser::prepare(username, email, raw_password)?;
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (id, username, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(map_insert_error)?;
        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(normalize_email(email))
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(User::from))
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(User::from))
    }

    #[instrument(skip(self, book), fields(book_id = %book.book_id))]
    async fn add_saved_book(&self, user_id: Uuid, book: Book) -> Result<User, StoreError> {
        let book = book.normalized()?;
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
            SET saved_books = CASE
                WHEN EXISTS (
                    SELECT 1 FROM jsonb_array_elements(saved_books) AS e(book)
                    WHERE e.book->>'bookId' = $2
                )
                THEN (
                    SELECT jsonb_agg(
                        CASE WHEN t.book->>'bookId' = $2 THEN $3::jsonb ELSE t.book END
                        ORDER BY t.ord
                    )
                    FROM jsonb_array_elements(saved_books) WITH ORDINALITY AS t(book, ord)
                )
                ELSE saved_books || jsonb_build_array($3::jsonb)
            END
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(&book.book_id)
        .bind(Json(&book))
        .fetch_optional(&self.db)
        .await?;
        row.map(User::from).ok_or(StoreError::NotFound)
    }

    #[instrument(skip(self))]
    async fn remove_saved_book(&self, user_id: Uuid, book_id: &str) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
            SET saved_books = COALESCE((
                SELECT jsonb_agg(t.book ORDER BY t.ord)
                FROM jsonb_array_elements(saved_books) WITH ORDINALITY AS t(book, ord)
                WHERE t.book->>'bookId' <> $2
            ), '[]'::jsonb)
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(book_id)
        .fetch_optional(&self.db)
        .await?;
        row.map(User::from).ok_or(StoreError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use sqlx::postgres::PgPoolOptions;

    use super::*;

    // Runs against the database in DATABASE_URL; without one the test is a no-op.
    async fn store() -> Option<PgUserStore> {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set; skipping Postgres store test");
            return None;
        };
        let db = PgPoolOptions::new()
            .max_connections(2)
            .connect(&url)
            .await
            .expect("connect to DATABASE_URL");
        sqlx::migrate!("./migrations")
            .run(&db)
            .await
            .expect("run migrations");
        Some(PgUserStore::new(db))
    }

    async fn fresh_user(store: &PgUserStore) -> User {
        let tag = Uuid::new_v4().simple().to_string();
        store
            .create(&format!("user-{tag}"), &format!("{tag}@example.com"), "secret123")
            .await
            .unwrap()
    }

    fn book(id: &str, title: &str) -> Book {
        Book {
            book_id: id.into(),
            title: title.into(),
            authors: vec!["A".into()],
            description: None,
            image: None,
            link: None,
        }
    }

    fn ids(user: &User) -> Vec<&str> {
        user.saved_books.iter().map(|b| b.book_id.as_str()).collect()
    }

    #[tokio::test]
    async fn create_and_find_normalizes_email() {
        let Some(store) = store().await else { return };
        let user = fresh_user(&store).await;

        let by_email = store
            .find_by_email(&user.email.to_uppercase())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_email.id, user.id);
        assert!(by_email.saved_books.is_empty());
        assert!(store.find_by_id(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicates_map_to_validation() {
        let Some(store) = store().await else { return };
        let user = fresh_user(&store).await;

        let err = store
            .create(&user.username, "someone-else@example.com", "secret123")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(ref m) if m == "Username already taken"));

        let err = store
            .create(&format!("{}-2", user.username), &user.email, "secret123")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(ref m) if m == "Email already registered"));
    }

    #[tokio::test]
    async fn upsert_keeps_position_and_latest_attributes() {
        let Some(store) = store().await else { return };
        let user = fresh_user(&store).await;

        store.add_saved_book(user.id, book("B1", "Old")).await.unwrap();
        store.add_saved_book(user.id, book("B2", "Two")).await.unwrap();
        let updated = store.add_saved_book(user.id, book("B1", "New")).await.unwrap();

        assert_eq!(ids(&updated), vec!["B1", "B2"]);
        assert_eq!(updated.saved_books[0].title, "New");
    }

    #[tokio::test]
    async fn remove_restores_previous_set_and_absent_is_noop() {
        let Some(store) = store().await else { return };
        let user = fresh_user(&store).await;

        let before = store.add_saved_book(user.id, book("B0", "Zero")).await.unwrap();
        store.add_saved_book(user.id, book(" B1 ", "One")).await.unwrap();
        let after = store.remove_saved_book(user.id, " B1 ").await.unwrap();
        assert_eq!(ids(&after), ids(&before));

        let again = store.remove_saved_book(user.id, " B1 ").await.unwrap();
        assert_eq!(ids(&again), ids(&before));

        let last = store.remove_saved_book(user.id, "B0").await.unwrap();
        assert!(last.saved_books.is_empty());
    }

    #[tokio::test]
    async fn missing_user_is_not_found() {
        let Some(store) = store().await else { return };
        let err = store
            .add_saved_book(Uuid::new_v4(), book("B1", "T"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
        let err = store.remove_saved_book(Uuid::new_v4(), "B1").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }
}
