use axum::{extract::FromRef, extract::State, routing::get, Json, Router};
use serde_json::{json, Value};
use tracing::instrument;

use crate::{error::ApiError, state::AppState};

pub mod jwt;
pub mod middleware;
pub mod password;

use jwt::JwtKeys;

pub fn router() -> Router<AppState> {
    Router::new().route("/get-token", get(get_token))
}

/// Hands out a short-lived anonymous token so API explorers can exercise the
/// guarded read endpoints without an account.
#[instrument(skip(state))]
pub async fn get_token(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign_demo()?;
    Ok(Json(json!({ "token": token })))
}
