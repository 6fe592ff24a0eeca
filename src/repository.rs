use crate::models::{BlogPost, Comment, PostForm, User};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::sync::Arc;

/// StoreError
///
/// The persistence-layer error taxonomy. Constraint violations are mapped to the
/// two domain-visible variants so handlers can recover with a user-visible message;
/// everything else surfaces as an opaque database error scoped to one request.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A registration attempted to reuse an existing email address.
    #[error("an account with that email already exists")]
    DuplicateEmail,
    /// A post create/update attempted to reuse an existing title.
    #[error("a post with that title already exists")]
    DuplicateTitle,
    /// The targeted row does not exist.
    #[error("record not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Maps a UNIQUE-constraint violation to the given domain conflict, passing every
/// other database failure through unchanged.
fn map_unique(err: sqlx::Error, conflict: StoreError) -> StoreError {
    match err.as_database_error() {
        Some(db_err) if db_err.is_unique_violation() => conflict,
        _ => StoreError::Database(err),
    }
}

/// Repository Trait
///
/// Defines the abstract contract for all persistence operations. This is the core
/// of the Repository Abstraction pattern, allowing the handlers to interact with
/// the data layer without knowing the specific implementation (SQLite, Mock, etc.).
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn Repository>`) safely shareable and usable across Axum's asynchronous
/// task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    // Fails with StoreError::DuplicateEmail when the email is already registered;
    // the UNIQUE constraint serializes concurrent conflicting registrations.
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        role: &str,
    ) -> Result<User, StoreError>;
    async fn find_user_by_email(&self, email: &str) -> Option<User>;
    async fn find_user_by_id(&self, id: i64) -> Option<User>;
    // Used by the registration handler to grant the bootstrap admin role.
    async fn count_users(&self) -> i64;

    // --- Posts ---
    // Insertion order (id order); author display name joined in.
    async fn list_posts(&self) -> Vec<BlogPost>;
    async fn get_post(&self, id: i64) -> Option<BlogPost>;
    // Fails with StoreError::DuplicateTitle on a title collision.
    async fn create_post(
        &self,
        form: PostForm,
        date: String,
        author_id: i64,
    ) -> Result<BlogPost, StoreError>;
    // Mutates title/subtitle/image/body only; the date stamp and author are immutable.
    async fn update_post(&self, id: i64, form: PostForm) -> Result<BlogPost, StoreError>;
    // Cascade-deletes the post's comments (schema-level ON DELETE CASCADE).
    async fn delete_post(&self, id: i64) -> Result<(), StoreError>;

    // --- Comments ---
    async fn list_comments_for_post(&self, post_id: i64) -> Vec<Comment>;
    async fn create_comment(
        &self,
        text: &str,
        post_id: i64,
        commenter_id: i64,
    ) -> Result<Comment, StoreError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer access across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// Embedded schema, applied idempotently at startup. UNIQUE constraints enforce
/// the email and title invariants inside the store itself, and comments are
/// declared ON DELETE CASCADE so removing a post removes its thread.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    name          TEXT NOT NULL,
    email         TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    role          TEXT NOT NULL DEFAULT 'member'
);

CREATE TABLE IF NOT EXISTS blog_posts (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    title     TEXT NOT NULL UNIQUE,
    subtitle  TEXT NOT NULL,
    body      TEXT NOT NULL,
    image_url TEXT NOT NULL,
    date      TEXT NOT NULL,
    author_id INTEGER NOT NULL REFERENCES users(id)
);

CREATE TABLE IF NOT EXISTS comments (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    text         TEXT NOT NULL,
    commenter_id INTEGER NOT NULL REFERENCES users(id),
    blog_id      INTEGER NOT NULL REFERENCES blog_posts(id) ON DELETE CASCADE
);
"#;

/// SqliteRepository
///
/// The concrete implementation of the `Repository` trait, backed by SQLite.
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Creates a new repository instance over an already-initialized pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// connect
    ///
    /// Opens (creating if missing) the database at `database_url`, enables foreign-key
    /// enforcement, and applies the embedded schema.
    ///
    /// In-memory databases exist per connection, so for `:memory:` URLs the pool is
    /// pinned to a single never-reaped connection; the store would otherwise vanish
    /// between checkouts.
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let in_memory =
            database_url.contains(":memory:") || database_url.contains("mode=memory");

        let pool = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?
        };

        sqlx::raw_sql(SCHEMA).execute(&pool).await?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl Repository for SqliteRepository {
    /// create_user
    ///
    /// Single-statement insert-and-return; the UNIQUE constraint on `email` is the
    /// sole arbiter of duplicates, so two simultaneous registrations with the same
    /// email cannot both succeed.
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        role: &str,
    ) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"INSERT INTO users (name, email, password_hash, role)
               VALUES (?, ?, ?, ?)
               RETURNING id, name, email, password_hash, role"#,
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique(e, StoreError::DuplicateEmail))
    }

    async fn find_user_by_email(&self, email: &str) -> Option<User> {
        sqlx::query_as::<_, User>(
            "SELECT id, name, email, password_hash, role FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("find_user_by_email error: {:?}", e);
            None
        })
    }

    async fn find_user_by_id(&self, id: i64) -> Option<User> {
        sqlx::query_as::<_, User>(
            "SELECT id, name, email, password_hash, role FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("find_user_by_id error: {:?}", e);
            None
        })
    }

    async fn count_users(&self) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("count_users error: {:?}", e);
                0
            })
    }

    /// list_posts
    ///
    /// Returns every post in insertion (id) order with the author's display name
    /// joined in for rendering. Unbounded by design; pagination is a documented
    /// non-goal at this scope.
    async fn list_posts(&self) -> Vec<BlogPost> {
        match sqlx::query_as::<_, BlogPost>(
            r#"SELECT p.id, p.title, p.subtitle, p.body, p.image_url, p.date,
                      p.author_id, u.name AS author_name
               FROM blog_posts p
               JOIN users u ON p.author_id = u.id
               ORDER BY p.id"#,
        )
        .fetch_all(&self.pool)
        .await
        {
            Ok(posts) => posts,
            Err(e) => {
                tracing::error!("list_posts error: {:?}", e);
                vec![]
            }
        }
    }

    async fn get_post(&self, id: i64) -> Option<BlogPost> {
        sqlx::query_as::<_, BlogPost>(
            r#"SELECT p.id, p.title, p.subtitle, p.body, p.image_url, p.date,
                      p.author_id, u.name AS author_name
               FROM blog_posts p
               JOIN users u ON p.author_id = u.id
               WHERE p.id = ?"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_post error: {:?}", e);
            None
        })
    }

    /// create_post
    ///
    /// The `date` stamp is supplied by the caller at creation time and never
    /// changes afterward. The returned row carries no joined author name.
    async fn create_post(
        &self,
        form: PostForm,
        date: String,
        author_id: i64,
    ) -> Result<BlogPost, StoreError> {
        sqlx::query_as::<_, BlogPost>(
            r#"INSERT INTO blog_posts (title, subtitle, body, image_url, date, author_id)
               VALUES (?, ?, ?, ?, ?, ?)
               RETURNING id, title, subtitle, body, image_url, date, author_id"#,
        )
        .bind(form.title)
        .bind(form.subtitle)
        .bind(form.body)
        .bind(form.image_url)
        .bind(date)
        .bind(author_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique(e, StoreError::DuplicateTitle))
    }

    /// update_post
    ///
    /// Mutates the editable columns only. `date` and `author_id` are deliberately
    /// absent from the SET clause.
    async fn update_post(&self, id: i64, form: PostForm) -> Result<BlogPost, StoreError> {
        sqlx::query_as::<_, BlogPost>(
            r#"UPDATE blog_posts
               SET title = ?, subtitle = ?, image_url = ?, body = ?
               WHERE id = ?
               RETURNING id, title, subtitle, body, image_url, date, author_id"#,
        )
        .bind(form.title)
        .bind(form.subtitle)
        .bind(form.image_url)
        .bind(form.body)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_unique(e, StoreError::DuplicateTitle))?
        .ok_or(StoreError::NotFound)
    }

    /// delete_post
    ///
    /// Zero rows affected means the post never existed. The comment thread goes
    /// with the post via the schema's cascade rule.
    async fn delete_post(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM blog_posts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() > 0 {
            Ok(())
        } else {
            Err(StoreError::NotFound)
        }
    }

    async fn list_comments_for_post(&self, post_id: i64) -> Vec<Comment> {
        match sqlx::query_as::<_, Comment>(
            r#"SELECT c.id, c.text, c.commenter_id, c.blog_id, u.name AS commenter_name
               FROM comments c
               JOIN users u ON c.commenter_id = u.id
               WHERE c.blog_id = ?
               ORDER BY c.id"#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
        {
            Ok(comments) => comments,
            Err(e) => {
                tracing::error!("list_comments_for_post error: {:?}", e);
                vec![]
            }
        }
    }

    async fn create_comment(
        &self,
        text: &str,
        post_id: i64,
        commenter_id: i64,
    ) -> Result<Comment, StoreError> {
        sqlx::query_as::<_, Comment>(
            r#"INSERT INTO comments (text, commenter_id, blog_id)
               VALUES (?, ?, ?)
               RETURNING id, text, commenter_id, blog_id"#,
        )
        .bind(text)
        .bind(commenter_id)
        .bind(post_id)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::from)
    }
}
