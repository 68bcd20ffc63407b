use axum::{
    body::{to_bytes, Body},
    extract::{FromRef, Query, Request, State},
    http::{request::Parts, Method},
    middleware::Next,
    response::Response,
};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use crate::{
    auth::jwt::{AuthError, JwtKeys},
    error::ApiError,
    state::AppState,
};

/// Matches the body-parser limit of the surrounding app.
const BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Per-route authentication policy. `AllowAnonymousGet` is the narrow
/// read-only exception for public listings: a token-less GET passes through
/// with no subject, while a present-but-invalid token is still rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPolicy {
    Required,
    AllowAnonymousGet,
}

/// The authenticated subject, injected as a request extension by the guard.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub Uuid);

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Token transport precedence: JSON body field, then query parameter, then
/// the `x-access-token` header.
fn resolve_token(parts: &Parts, body: &[u8]) -> Option<String> {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("token").and_then(|t| t.as_str()).map(String::from))
        .or_else(|| {
            Query::<TokenQuery>::try_from_uri(&parts.uri)
                .ok()
                .and_then(|q| q.0.token)
        })
        .or_else(|| {
            parts
                .headers
                .get("x-access-token")
                .and_then(|v| v.to_str().ok())
                .map(String::from)
        })
}

fn anonymous_allowed(policy: AuthPolicy, method: &Method) -> bool {
    policy == AuthPolicy::AllowAnonymousGet && *method == Method::GET
}

/// Route-layer guard applied via `middleware::from_fn_with_state`. Buffers
/// the body to honor the body-field token transport, then reassembles the
/// request for the handler.
pub async fn guard(
    State((state, policy)): State<(AppState, AuthPolicy)>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (mut parts, body) = req.into_parts();
    let bytes = to_bytes(body, BODY_LIMIT)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e)))?;

    match resolve_token(&parts, &bytes) {
        Some(token) => {
            let keys = JwtKeys::from_ref(&state);
            let claims = keys.verify(&token).map_err(|e| {
                warn!("invalid or expired token");
                ApiError::Auth(e)
            })?;
            parts.extensions.insert(CurrentUser(claims.id));
        }
        None if anonymous_allowed(policy, &parts.method) => {}
        None => return Err(AuthError::MissingToken.into()),
    }

    let req = Request::from_parts(parts, Body::from(bytes));
    Ok(next.run(req).await)
}
