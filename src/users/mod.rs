use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{
    auth::middleware::{guard, AuthPolicy},
    state::AppState,
};

pub mod dto;
pub mod handlers;
pub mod repo;
pub mod validate;

/// Signup and signin take no token.
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/users/signup", post(handlers::signup))
        .route("/users/signin", post(handlers::signin))
}

/// Everything else requires a verified bearer token.
pub fn guarded_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/users",
            get(handlers::list)
                .put(handlers::update)
                .delete(handlers::delete),
        )
        .route("/user/profile", get(handlers::profile))
        .route_layer(middleware::from_fn_with_state(
            (state, AuthPolicy::Required),
            guard,
        ))
}
