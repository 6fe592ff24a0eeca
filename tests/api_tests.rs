use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;

use club_blog::{
    AppConfig, AppState, RendererState, RepositoryState, SqliteRepository, TeraRenderer,
    create_router,
};

// --- Application Setup ---

/// Builds the full router over a fresh in-memory database, exactly as main.rs
/// wires it minus the listener.
async fn spawn_app() -> Router {
    let repo = SqliteRepository::connect("sqlite::memory:")
        .await
        .expect("in-memory database must open");
    let renderer = TeraRenderer::new().expect("embedded templates must compile");

    let state = AppState {
        repo: Arc::new(repo) as RepositoryState,
        renderer: Arc::new(renderer) as RendererState,
        config: AppConfig::default(),
    };
    create_router(state)
}

// --- Request Helpers ---

fn get(uri: &str, session: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = session {
        builder = builder.header(header::COOKIE, cookie.to_string());
    }
    builder.body(Body::empty()).unwrap()
}

fn form_post(uri: &str, body: &str, session: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = session {
        builder = builder.header(header::COOKIE, cookie.to_string());
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn location_of(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .expect("redirect must carry a Location header")
        .to_str()
        .unwrap()
}

/// Pulls the `session=...` pair out of the response's Set-Cookie headers, ready
/// to be replayed as a Cookie header on follow-up requests.
fn session_of(response: &Response<Body>) -> String {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|c| c.starts_with("session="))
        .expect("response must set a session cookie")
        .split(';')
        .next()
        .unwrap()
        .to_string()
}

/// Registers an account through the public form and returns its session cookie.
/// The first account registered on a fresh app holds the admin role.
async fn register(app: &Router, name: &str, email: &str, password: &str) -> String {
    let body = format!("name={name}&email={email}&password={password}");
    let response = send(app, form_post("/register", &body, None)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location_of(&response), "/");
    session_of(&response)
}

const POST_BODY: &str =
    "title=Launch&subtitle=We-are-live&image_url=https://example.com/launch.jpg&body=Welcome";

// --- Basic Surfaces ---

#[tokio::test]
async fn test_health_check_works() {
    let app = spawn_app().await;

    let response = send(&app, get("/health", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn test_homepage_renders_for_anonymous_visitors() {
    let app = spawn_app().await;

    let response = send(&app, get("/", None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    assert!(html.contains("The Club Blog"));
    assert!(html.contains("No posts yet."));
    assert!(html.contains(r#"<a href="/login">Log In</a>"#));
}

#[tokio::test]
async fn test_responses_carry_a_request_id() {
    let app = spawn_app().await;

    let response = send(&app, get("/health", None)).await;
    assert!(response.headers().contains_key("x-request-id"));
}

// --- Registration and Login ---

#[tokio::test]
async fn test_registered_user_sees_a_personalized_nav() {
    let app = spawn_app().await;
    let session = register(&app, "Alice", "alice@example.com", "hunter22").await;

    let html = body_text(send(&app, get("/", Some(&session))).await).await;
    assert!(html.contains("Log Out (Alice)"));
    assert!(!html.contains("Register"));
}

#[tokio::test]
async fn test_duplicate_registration_bounces_to_login() {
    let app = spawn_app().await;
    register(&app, "Alice", "alice@example.com", "hunter22").await;

    let body = "name=Impostor&email=alice@example.com&password=other";
    let response = send(&app, form_post("/register", body, None)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location_of(&response), "/login");

    // The message surfaces on the login page render.
    let flash_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();
    let login_html = body_text(send(&app, get("/login", Some(&flash_cookie))).await).await;
    assert!(login_html.contains("already registered"));
}

#[tokio::test]
async fn test_login_round_trip() {
    let app = spawn_app().await;
    register(&app, "Alice", "alice@example.com", "hunter22").await;

    // Wrong password recovers locally.
    let response = send(
        &app,
        form_post("/login", "email=alice@example.com&password=wrong", None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location_of(&response), "/login");

    // Correct password establishes a session.
    let response = send(
        &app,
        form_post("/login", "email=alice@example.com&password=hunter22", None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location_of(&response), "/");
    let session = session_of(&response);

    let html = body_text(send(&app, get("/", Some(&session))).await).await;
    assert!(html.contains("Log Out (Alice)"));
}

#[tokio::test]
async fn test_logout_returns_to_anonymous() {
    let app = spawn_app().await;
    let session = register(&app, "Alice", "alice@example.com", "hunter22").await;

    let response = send(&app, get("/logout", Some(&session))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location_of(&response), "/");

    // Following the removal cookie, the nav reverts to the anonymous links.
    let html = body_text(send(&app, get("/", None)).await).await;
    assert!(html.contains("Log In"));
}

// --- Admin Gate ---

#[tokio::test]
async fn test_admin_routes_redirect_anonymous_visitors_to_login() {
    let app = spawn_app().await;

    for uri in ["/new-post", "/edit-post/1", "/delete/1"] {
        let response = send(&app, get(uri, None)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(location_of(&response), "/login", "{uri}");
    }
}

#[tokio::test]
async fn test_admin_routes_forbid_members() {
    let app = spawn_app().await;
    // First in is the admin; the second account is an ordinary member.
    register(&app, "Alice", "alice@example.com", "hunter22").await;
    let member = register(&app, "Bob", "bob@example.com", "hunter23").await;

    let response = send(&app, get("/new-post", Some(&member))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(&app, form_post("/new-post", POST_BODY, Some(&member))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_first_registered_account_can_publish() {
    let app = spawn_app().await;
    let admin = register(&app, "Alice", "alice@example.com", "hunter22").await;

    let form_page = send(&app, get("/new-post", Some(&admin))).await;
    assert_eq!(form_page.status(), StatusCode::OK);

    let response = send(&app, form_post("/new-post", POST_BODY, Some(&admin))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location_of(&response), "/");

    let html = body_text(send(&app, get("/", None)).await).await;
    assert!(html.contains("Launch"));
    assert!(html.contains("Posted by Alice"));
}

// --- Post Lifecycle ---

#[tokio::test]
async fn test_duplicate_title_bounces_back_to_the_form() {
    let app = spawn_app().await;
    let admin = register(&app, "Alice", "alice@example.com", "hunter22").await;
    send(&app, form_post("/new-post", POST_BODY, Some(&admin))).await;

    let response = send(&app, form_post("/new-post", POST_BODY, Some(&admin))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location_of(&response), "/new-post");

    // Exactly one post survives.
    let html = body_text(send(&app, get("/", None)).await).await;
    assert_eq!(html.matches("Launch").count(), 1);
}

#[tokio::test]
async fn test_edit_post_changes_content_but_not_the_date() {
    let app = spawn_app().await;
    let admin = register(&app, "Alice", "alice@example.com", "hunter22").await;
    send(&app, form_post("/new-post", POST_BODY, Some(&admin))).await;

    let before = body_text(send(&app, get("/post/1", None)).await).await;

    let edit = "title=Relaunch&subtitle=Still-live&image_url=https://example.com/launch.jpg&body=Welcome-back";
    let response = send(&app, form_post("/edit-post/1", edit, Some(&admin))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location_of(&response), "/post/1");

    let after = body_text(send(&app, get("/post/1", None)).await).await;
    assert!(after.contains("Relaunch"));
    assert!(after.contains("Welcome-back"));
    // The creation stamp printed on the page is unchanged by the edit.
    let stamp = |html: &str| {
        html.lines()
            .find(|l| l.contains("Posted by"))
            .map(str::to_string)
    };
    assert_eq!(stamp(&before), stamp(&after));
}

#[tokio::test]
async fn test_delete_removes_the_post_and_its_page() {
    let app = spawn_app().await;
    let admin = register(&app, "Alice", "alice@example.com", "hunter22").await;
    send(&app, form_post("/new-post", POST_BODY, Some(&admin))).await;

    let response = send(&app, get("/delete/1", Some(&admin))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location_of(&response), "/");

    let response = send(&app, get("/post/1", None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app, get("/delete/1", Some(&admin))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_post_pages_are_not_found() {
    let app = spawn_app().await;
    let admin = register(&app, "Alice", "alice@example.com", "hunter22").await;

    assert_eq!(
        send(&app, get("/post/42", None)).await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        send(&app, get("/edit-post/42", Some(&admin))).await.status(),
        StatusCode::NOT_FOUND
    );
}

// --- Comments ---

#[tokio::test]
async fn test_comment_flow() {
    let app = spawn_app().await;
    let admin = register(&app, "Alice", "alice@example.com", "hunter22").await;
    send(&app, form_post("/new-post", POST_BODY, Some(&admin))).await;

    // Anonymous submissions are turned away at the login page, leaving no trace.
    let response = send(&app, form_post("/post/1", "text=Sneaky", None)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location_of(&response), "/login");

    let html = body_text(send(&app, get("/post/1", None)).await).await;
    assert!(html.contains("No comments yet."));

    // A signed-in member's comment appears on the post page under their name.
    let member = register(&app, "Bob", "bob@example.com", "hunter23").await;
    let response = send(&app, form_post("/post/1", "text=First!", Some(&member))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location_of(&response), "/post/1");

    let html = body_text(send(&app, get("/post/1", None)).await).await;
    assert!(html.contains("First!"));
    assert!(html.contains("Bob"));
}
