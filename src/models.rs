use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// --- Role Constants ---

/// Role granted to the bootstrap administrator account (the first registered user).
pub const ROLE_ADMIN: &str = "admin";
/// Role granted to every subsequently registered user.
pub const ROLE_MEMBER: &str = "member";

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// Represents a registered account stored in the `users` table. Created once at
/// registration; the application exposes no update or delete path for users.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct User {
    // Primary Key (SQLite rowid). Stable for the lifetime of the account.
    pub id: i64,
    // Display name shown next to posts and comments.
    pub name: String,
    // The user's login identifier. UNIQUE across all users.
    pub email: String,

    /// PHC-format password hash (PBKDF2-SHA256). The plaintext secret is hashed
    /// at registration and never stored, logged, or serialized back to a client.
    #[serde(skip_serializing)]
    pub password_hash: String,

    // The RBAC field: 'admin' or 'member'. Replaces the reference system's fragile
    // "first row id is the administrator" convention with an explicit attribute.
    pub role: String,
}

impl User {
    /// Whether this account holds the administrator role.
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

/// BlogPost
///
/// Represents a post record from the `blog_posts` table. This is the primary data
/// structure for the core business logic.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct BlogPost {
    pub id: i64,
    // UNIQUE across all posts.
    pub title: String,
    pub subtitle: String,
    // Rich text, stored as markup and rendered verbatim by the template layer.
    pub body: String,
    pub image_url: String,
    // Human-readable creation date (e.g. "August 30, 2026"). Immutable once set:
    // the edit path never touches this column.
    pub date: String,
    // FK to users.id (the post author). Immutable once set.
    pub author_id: i64,

    // Loaded via a JOIN with `users` in the repository queries; absent on bare rows.
    #[sqlx(default)]
    pub author_name: Option<String>,
}

/// Comment
///
/// Represents a comment record from the `comments` table, augmented with the
/// commenter's display name (a join operation). Comments are created through the
/// post page and never edited or deleted through any exposed route.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct Comment {
    pub id: i64,
    // Rich text, stored as markup.
    pub text: String,
    // FK to users.id.
    pub commenter_id: i64,
    // FK to blog_posts.id. Cascade-deleted with the parent post.
    pub blog_id: i64,

    // This field is loaded via a JOIN in the repository query.
    #[sqlx(default)]
    pub commenter_name: Option<String>,
}

// --- Form Payloads (Input Schemas) ---

/// ValidationError
///
/// Raised when a submitted form fails the required-field or URL-shape checks.
/// Handlers recover locally by re-presenting the form with this message; the
/// error never reaches the persistence layer.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

fn require(value: &str, label: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError(format!("{label} is required.")))
    } else {
        Ok(())
    }
}

/// RegisterForm
///
/// Input payload for the registration form (POST /register).
/// The password field is consumed by the hasher and never persisted as plaintext.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl RegisterForm {
    /// All three fields are mandatory.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require(&self.name, "Name")?;
        require(&self.email, "Email")?;
        require(&self.password, "Password")
    }
}

/// LoginForm
///
/// Input payload for the login form (POST /login).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require(&self.email, "Email")?;
        require(&self.password, "Password")
    }
}

/// PostForm
///
/// Input payload shared by the new-post and edit-post forms. The creation date and
/// author are supplied server-side, never by the form.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PostForm {
    pub title: String,
    pub subtitle: String,
    pub image_url: String,
    pub body: String,
}

impl PostForm {
    /// Required-field checks plus a URL-shape check on the header image.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require(&self.title, "Title")?;
        require(&self.subtitle, "Subtitle")?;
        require(&self.image_url, "Image URL")?;
        require(&self.body, "Body")?;

        // Shape check only: the image is fetched by the reader's browser, so a
        // scheme prefix is all the server can meaningfully verify.
        if !(self.image_url.starts_with("http://") || self.image_url.starts_with("https://")) {
            return Err(ValidationError(
                "Image URL must be an absolute http(s) URL.".to_string(),
            ));
        }
        Ok(())
    }
}

/// CommentForm
///
/// Input payload for the comment form on a post page.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CommentForm {
    pub text: String,
}

impl CommentForm {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require(&self.text, "Comment")
    }
}
