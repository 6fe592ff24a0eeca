use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Defines the post page, the one surface with an identity-requiring write.
///
/// Access Control Strategy:
/// Unlike the admin routes, these are NOT guarded by a rejecting middleware
/// layer. The contract for an anonymous comment submission is a user-facing
/// recovery (flash message + redirect to the login page), so the handler
/// matches on the `Identity` sum type itself and no Comment row is ever
/// created for an anonymous request. The GET side of the route is public.
pub fn authenticated_routes() -> Router<AppState> {
    Router::new()
        // GET /post/{id}
        // A single post with its comment thread and, for signed-in readers,
        // the comment form. Unknown ids are a 404.
        // POST /post/{id}
        // Submits the comment form. Requires an authenticated identity; creates
        // exactly one Comment linked to the post and the commenter, then
        // redirects back to the same post.
        .route(
            "/post/{id}",
            get(handlers::show_post).post(handlers::submit_comment),
        )
}
