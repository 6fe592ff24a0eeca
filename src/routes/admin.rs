use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// Defines the routes exclusively accessible to the administrator account:
/// creating, editing, and deleting blog posts.
///
/// Access Control:
/// This entire router is wrapped (in `create_router`) in the `admin_gate`
/// route layer, which resolves the identity and checks the admin role before
/// any handler executes. The handlers additionally take the `AdminUser`
/// extractor to obtain the acting administrator for authorship.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET+POST /new-post
        // Presents and accepts the post creation form. The post is stamped with
        // today's date and the current administrator as author.
        .route(
            "/new-post",
            get(handlers::new_post_page).post(handlers::create_post),
        )
        // GET+POST /edit-post/{id}
        // Presents the form prefilled with the existing post, and applies edits
        // to title/subtitle/image/body only. The date stamp and author are immutable.
        .route(
            "/edit-post/{id}",
            get(handlers::edit_post_page).post(handlers::update_post),
        )
        // GET /delete/{id}
        // Deletes the post and, by way of the schema cascade, its comments.
        .route("/delete/{id}", get(handlers::delete_post))
}
