// src/routes.rs

use axum::{
    Router,
    http::{Method, header},
    middleware,
    routing::{delete, get, patch, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, comments, posts, users},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Reads are public; writes go through `auth_middleware`.
/// * Applies global middleware (Trace, CORS).
/// * Injects global state.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            "http://localhost:3000".parse().expect("static origin"),
            "http://127.0.0.1:3000".parse().expect("static origin"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let require_auth = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let user_routes = Router::new()
        .route("/me", get(users::get_me))
        .route("/me/password", patch(users::update_password))
        .route_layer(require_auth.clone());

    // Public and protected methods share paths, so auth is layered per method.
    let post_routes = Router::new()
        .route(
            "/",
            get(posts::list_posts).merge(post(posts::create_post).route_layer(require_auth.clone())),
        )
        .route(
            "/{post_id}",
            get(posts::get_post).merge(
                patch(posts::update_post)
                    .delete(posts::delete_post)
                    .route_layer(require_auth.clone()),
            ),
        )
        .route(
            "/{post_id}/toggle",
            patch(posts::toggle_auto_reply).route_layer(require_auth.clone()),
        )
        .route(
            "/{post_id}/comments",
            get(comments::list_comments)
                .merge(post(comments::create_comment).route_layer(require_auth.clone())),
        );

    let comment_routes = Router::new()
        .route("/daily-breakdown", get(comments::daily_breakdown))
        .route(
            "/{id}",
            patch(comments::edit_comment)
                .merge(delete(comments::delete_comment))
                .route_layer(require_auth),
        );

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/users", user_routes)
        .nest("/api/posts", post_routes)
        .nest("/api/comments", comment_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
