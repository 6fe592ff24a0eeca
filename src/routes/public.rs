use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Defines endpoints that are accessible to any client (anonymous or logged-in):
/// all reading surfaces plus the identity flows themselves. Handlers resolve the
/// request `Identity` only to adjust what they render, never to refuse service.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // A simple, unauthenticated endpoint used for monitoring and load balancer checks.
        // Returns "ok" immediately to verify the service is running and responsive.
        .route("/health", get(|| async { "ok" }))
        // GET /
        // The homepage: lists every post with author context.
        .route("/", get(handlers::index))
        // GET /about, GET /contact
        // Static club pages.
        .route("/about", get(handlers::about))
        .route("/contact", get(handlers::contact))
        // GET+POST /register
        // Account creation. A successful submission establishes the session and
        // redirects home; a duplicate email bounces to the login page with a message.
        .route(
            "/register",
            get(handlers::register_page).post(handlers::register),
        )
        // GET+POST /login
        // Credential verification. Both failure modes (unknown email, wrong
        // password) recover locally with a flash message.
        .route("/login", get(handlers::login_page).post(handlers::login))
        // GET /logout
        // Clears the session cookie and returns to the homepage.
        .route("/logout", get(handlers::logout))
    // Note: GET /post/{id} lives in the authenticated module alongside the
    // comment submission POST; both methods must share one method router.
}
