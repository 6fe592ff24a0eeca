use crate::{
    AppState,
    auth::{
        AdminUser, Identity, clear_session, flash_cookie, hash_password, session_cookie,
        take_flash, verify_password,
    },
    models::{CommentForm, LoginForm, PostForm, RegisterForm, ROLE_ADMIN, ROLE_MEMBER},
    repository::StoreError,
};
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use serde_json::{Value, json};

// --- Render Helpers ---

/// base_context
///
/// The context data every template expects: login state, the signed-in user's
/// display name, admin status for the nav links, and the pending flash message.
/// Page handlers layer their own data on top.
fn base_context(identity: &Identity, flash: Option<String>) -> Value {
    json!({
        "logged_in": identity.is_authenticated(),
        "user_name": identity.user().map(|u| u.name.clone()),
        "is_admin": identity.user().is_some_and(|u| u.is_admin()),
        "flash": flash,
        "error": Value::Null,
    })
}

/// render
///
/// Hands the render directive to the PageRenderer collaborator. A failed render
/// is a server fault, never a user-recoverable state.
fn render(state: &AppState, template: &str, context: Value) -> Response {
    match state.renderer.render_page(template, &context) {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("render failed for {}: {}", template, e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

// --- Public Handlers ---

/// index
///
/// [Public Route] The homepage: every post in insertion order with author names
/// joined in. Unbounded listing is an accepted non-goal at this scope.
pub async fn index(State(state): State<AppState>, identity: Identity, jar: CookieJar) -> Response {
    let (jar, flash) = take_flash(jar);
    let posts = state.repo.list_posts().await;

    let mut ctx = base_context(&identity, flash);
    ctx["posts"] = serde_json::to_value(&posts).unwrap_or_default();

    (jar, render(&state, "index.html", ctx)).into_response()
}

/// about
///
/// [Public Route] Static club page.
pub async fn about(State(state): State<AppState>, identity: Identity) -> Response {
    render(&state, "about.html", base_context(&identity, None))
}

/// contact
///
/// [Public Route] Static contact page.
pub async fn contact(State(state): State<AppState>, identity: Identity) -> Response {
    render(&state, "contact.html", base_context(&identity, None))
}

/// register_page
///
/// [Public Route] Presents the registration form.
pub async fn register_page(
    State(state): State<AppState>,
    identity: Identity,
    jar: CookieJar,
) -> Response {
    let (jar, flash) = take_flash(jar);
    (jar, render(&state, "register.html", base_context(&identity, flash))).into_response()
}

/// register
///
/// [Public Route] Creates a new account and establishes the session.
///
/// *Flow*: validate → hash the password (never stored in plaintext) → insert.
/// The very first account is granted the admin role (bootstrap); everyone after
/// is a member. A duplicate email is reported via flash and redirected to the
/// login page, leaving the user count unchanged.
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<RegisterForm>,
) -> Response {
    if let Err(e) = form.validate() {
        let mut ctx = base_context(&Identity::Anonymous, None);
        ctx["error"] = json!(e.to_string());
        return render(&state, "register.html", ctx);
    }

    let password_hash = match hash_password(&form.password) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::error!("password hashing failed: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    // Bootstrap rule: the first registered account administers the blog.
    let role = if state.repo.count_users().await == 0 {
        ROLE_ADMIN
    } else {
        ROLE_MEMBER
    };

    match state
        .repo
        .create_user(&form.name, &form.email, &password_hash, role)
        .await
    {
        Ok(user) => match session_cookie(&state.config.secret_key, user.id) {
            Ok(cookie) => (jar.add(cookie), Redirect::to("/")).into_response(),
            Err(e) => {
                tracing::error!("session token signing failed: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        },
        Err(StoreError::DuplicateEmail) => (
            jar.add(flash_cookie(
                "That email is already registered. Log in instead.",
            )),
            Redirect::to("/login"),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("register error: {:?}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// login_page
///
/// [Public Route] Presents the login form, surfacing any pending flash message
/// (wrong password, registration conflict, login-required prompt).
pub async fn login_page(
    State(state): State<AppState>,
    identity: Identity,
    jar: CookieJar,
) -> Response {
    let (jar, flash) = take_flash(jar);
    (jar, render(&state, "login.html", base_context(&identity, flash))).into_response()
}

/// login
///
/// [Public Route] Verifies credentials and establishes the session.
/// Unknown email and wrong password both recover locally with a flash message;
/// the session stays anonymous.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    if let Err(e) = form.validate() {
        let mut ctx = base_context(&Identity::Anonymous, None);
        ctx["error"] = json!(e.to_string());
        return render(&state, "login.html", ctx);
    }

    let Some(user) = state.repo.find_user_by_email(&form.email).await else {
        return (
            jar.add(flash_cookie("No account with that email.")),
            Redirect::to("/login"),
        )
            .into_response();
    };

    if !verify_password(&form.password, &user.password_hash) {
        return (
            jar.add(flash_cookie("Wrong password.")),
            Redirect::to("/login"),
        )
            .into_response();
    }

    match session_cookie(&state.config.secret_key, user.id) {
        Ok(cookie) => (jar.add(cookie), Redirect::to("/")).into_response(),
        Err(e) => {
            tracing::error!("session token signing failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// logout
///
/// [Public Route] Clears the session identity and returns to the homepage.
pub async fn logout(jar: CookieJar) -> Response {
    (clear_session(jar), Redirect::to("/")).into_response()
}

/// show_post
///
/// [Public Route] A single post with its comment thread and, for signed-in
/// readers, the comment form. Unknown ids are a 404.
pub async fn show_post(
    State(state): State<AppState>,
    identity: Identity,
    jar: CookieJar,
    Path(post_id): Path<i64>,
) -> Response {
    let Some(post) = state.repo.get_post(post_id).await else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let comments = state.repo.list_comments_for_post(post_id).await;

    let (jar, flash) = take_flash(jar);
    let mut ctx = base_context(&identity, flash);
    ctx["post"] = serde_json::to_value(&post).unwrap_or_default();
    ctx["comments"] = serde_json::to_value(&comments).unwrap_or_default();

    (jar, render(&state, "post.html", ctx)).into_response()
}

// --- Authenticated Handlers ---

/// submit_comment
///
/// [Identity-Gated Route] Attaches a comment to a post.
///
/// The gate is in-handler by contract: an anonymous submission is an expected
/// state recovered with a flash prompt and a redirect to the login page, not an
/// authentication error. No Comment row is created in that case.
pub async fn submit_comment(
    State(state): State<AppState>,
    identity: Identity,
    jar: CookieJar,
    Path(post_id): Path<i64>,
    Form(form): Form<CommentForm>,
) -> Response {
    let Identity::Authenticated(user) = identity else {
        return (
            jar.add(flash_cookie("You need to log in to comment.")),
            Redirect::to("/login"),
        )
            .into_response();
    };

    // An empty comment is silently dropped; the reader lands back on the post.
    if form.validate().is_err() {
        return Redirect::to(&format!("/post/{post_id}")).into_response();
    }

    if state.repo.get_post(post_id).await.is_none() {
        return StatusCode::NOT_FOUND.into_response();
    }

    match state.repo.create_comment(&form.text, post_id, user.id).await {
        Ok(_) => Redirect::to(&format!("/post/{post_id}")).into_response(),
        Err(e) => {
            tracing::error!("create_comment error: {:?}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

// --- Admin Handlers ---

/// Builds the make-post form context shared by the new and edit pages.
fn post_form_context(
    admin: &AdminUser,
    flash: Option<String>,
    heading: &str,
    action: &str,
    form: &PostForm,
) -> Value {
    let mut ctx = base_context(&Identity::Authenticated(admin.0.clone()), flash);
    ctx["heading"] = json!(heading);
    ctx["action"] = json!(action);
    ctx["form"] = serde_json::to_value(form).unwrap_or_default();
    ctx
}

/// new_post_page
///
/// [Admin Route] Presents an empty post form.
pub async fn new_post_page(
    admin: AdminUser,
    State(state): State<AppState>,
    jar: CookieJar,
) -> Response {
    let (jar, flash) = take_flash(jar);
    let ctx = post_form_context(&admin, flash, "New Post", "/new-post", &PostForm::default());
    (jar, render(&state, "make-post.html", ctx)).into_response()
}

/// create_post
///
/// [Admin Route] Creates a post stamped with today's date and the current admin
/// as author. A validation failure re-presents the form with the message and the
/// entered values; a duplicate title recovers via flash + redirect.
pub async fn create_post(
    admin: AdminUser,
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<PostForm>,
) -> Response {
    if let Err(e) = form.validate() {
        let mut ctx = post_form_context(&admin, None, "New Post", "/new-post", &form);
        ctx["error"] = json!(e.to_string());
        return render(&state, "make-post.html", ctx);
    }

    // Matches the reference date format, e.g. "August 30, 2026". Immutable once set.
    let date = Utc::now().format("%B %d, %Y").to_string();

    match state.repo.create_post(form, date, admin.0.id).await {
        Ok(_) => Redirect::to("/").into_response(),
        Err(StoreError::DuplicateTitle) => (
            jar.add(flash_cookie("A post with that title already exists.")),
            Redirect::to("/new-post"),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("create_post error: {:?}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// edit_post_page
///
/// [Admin Route] Presents the post form prefilled with the existing post.
pub async fn edit_post_page(
    admin: AdminUser,
    State(state): State<AppState>,
    jar: CookieJar,
    Path(post_id): Path<i64>,
) -> Response {
    let Some(post) = state.repo.get_post(post_id).await else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let form = PostForm {
        title: post.title,
        subtitle: post.subtitle,
        image_url: post.image_url,
        body: post.body,
    };

    let (jar, flash) = take_flash(jar);
    let action = format!("/edit-post/{post_id}");
    let ctx = post_form_context(&admin, flash, "Edit Post", &action, &form);
    (jar, render(&state, "make-post.html", ctx)).into_response()
}

/// update_post
///
/// [Admin Route] Mutates title/subtitle/image/body of an existing post; the date
/// stamp and author never change. Redirects to the post on success.
pub async fn update_post(
    admin: AdminUser,
    State(state): State<AppState>,
    jar: CookieJar,
    Path(post_id): Path<i64>,
    Form(form): Form<PostForm>,
) -> Response {
    if let Err(e) = form.validate() {
        let action = format!("/edit-post/{post_id}");
        let mut ctx = post_form_context(&admin, None, "Edit Post", &action, &form);
        ctx["error"] = json!(e.to_string());
        return render(&state, "make-post.html", ctx);
    }

    match state.repo.update_post(post_id, form).await {
        Ok(_) => Redirect::to(&format!("/post/{post_id}")).into_response(),
        Err(StoreError::NotFound) => StatusCode::NOT_FOUND.into_response(),
        Err(StoreError::DuplicateTitle) => (
            jar.add(flash_cookie("A post with that title already exists.")),
            Redirect::to(&format!("/edit-post/{post_id}")),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("update_post error: {:?}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// delete_post
///
/// [Admin Route] Deletes a post; the schema cascade removes its comment thread.
pub async fn delete_post(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Response {
    match state.repo.delete_post(post_id).await {
        Ok(()) => Redirect::to("/").into_response(),
        Err(StoreError::NotFound) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            tracing::error!("delete_post error: {:?}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
