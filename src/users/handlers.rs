use axum::{
    extract::{FromRef, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        jwt::JwtKeys,
        middleware::CurrentUser,
        password::{hash_password_blocking, verify_password_blocking},
    },
    error::{ApiError, DbOp},
    shaper::{self, ShapeParams},
    state::AppState,
    users::{
        dto::{
            DeleteResponse, DeletedUser, ProfileData, SigninMessage, SigninRequest,
            SigninResponse, SignupRequest, SignupResponse, UpdateRequest, UpdateResponse,
        },
        repo::{self, UpdateFields},
        validate,
    },
};

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), ApiError> {
    let input = validate::validate_signup(payload)?;

    if let Some(existing) = repo::find_by_user_name(&state.db, &input.user_name)
        .await
        .map_err(|e| ApiError::db(DbOp::Find, e))?
    {
        warn!(user_name = %existing.user_name, "signup name collision");
        return Err(ApiError::Conflict(format!(
            "{} has already been taken",
            existing.user_name
        )));
    }
    if let Some(existing) = repo::find_by_email(&state.db, &input.email)
        .await
        .map_err(|e| ApiError::db(DbOp::Find, e))?
    {
        warn!(email = %existing.email, "signup email collision");
        return Err(ApiError::Conflict(format!(
            "An account has already been created for {}",
            existing.email
        )));
    }

    let hash =
        hash_password_blocking(input.password.trim().to_string(), state.config.bcrypt_cost).await?;

    // The UNIQUE constraints are the race-safe guarantee; a concurrent
    // signup that slipped past the pre-checks resolves to a 409 here.
    let user = repo::create(
        &state.db,
        &input.user_name,
        &input.email,
        &hash,
        &input.first_name,
        &input.last_name,
    )
    .await
    .map_err(|e| ApiError::from_write(DbOp::Create, e))?;

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign_session(user.id)?;
    let expires_in = state.config.jwt.session_ttl_seconds;

    info!(user_id = %user.id, user_name = %user.user_name, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: format!(
                "User {}'s account has successfully been created.",
                user.user_name
            ),
            user_name: user.user_name,
            token,
            expires_in,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn signin(
    State(state): State<AppState>,
    Json(payload): Json<SigninRequest>,
) -> Result<Json<SigninResponse>, ApiError> {
    let input = validate::validate_signin(payload)?;

    let user = repo::find_by_user_name(&state.db, &input.user_name)
        .await
        .map_err(|e| ApiError::db(DbOp::Find, e))?
        .ok_or_else(|| ApiError::NotFound("User Not Found".to_string()))?;

    let ok =
        verify_password_blocking(input.password.trim().to_string(), user.password_hash.clone())
            .await?;
    if !ok {
        warn!(user_id = %user.id, "signin password mismatch");
        return Err(ApiError::NotFound(
            "The username and password do not match our records.".to_string(),
        ));
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign_session(user.id)?;
    let expires_in = state.config.jwt.session_ttl_seconds;

    info!(user_id = %user.id, user_name = %user.user_name, "user signed in");
    Ok(Json(SigninResponse {
        success: SigninMessage {
            message: "User authenticated".to_string(),
        },
        user_name: user.user_name,
        image_url: user.image_url,
        token,
        expires_in,
    }))
}

#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ShapeParams>,
) -> Result<Json<Value>, ApiError> {
    let users = repo::list(&state.db)
        .await
        .map_err(|e| ApiError::db(DbOp::Find, e))?;
    if users.is_empty() {
        return Err(ApiError::NotFound("No Users Found".to_string()));
    }

    let records = users
        .into_iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ApiError::Internal(e.into()))?;
    let shaped = shaper::shape(&params, records)?;

    Ok(Json(json!({ "data": shaped })))
}

#[instrument(skip(state))]
pub async fn profile(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<Json<Value>, ApiError> {
    let data = repo::find_by_id(&state.db, user_id)
        .await
        .map_err(|e| ApiError::db(DbOp::Find, e))?
        .map(ProfileData::from);

    Ok(Json(json!({ "data": data })))
}

#[instrument(skip(state, payload))]
pub async fn update(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Json(payload): Json<UpdateRequest>,
) -> Result<(StatusCode, Json<UpdateResponse>), ApiError> {
    // Collision check excludes the caller's own record so a user can keep
    // (or resubmit) their current name.
    if let Some(new_name) = payload.user_name.as_deref().filter(|s| !s.trim().is_empty()) {
        if repo::user_name_taken_by_other(&state.db, new_name, user_id)
            .await
            .map_err(|e| ApiError::db(DbOp::Find, e))?
        {
            warn!(user_id = %user_id, user_name = %new_name, "update name collision");
            return Err(ApiError::Conflict(format!(
                "{new_name} has already been taken"
            )));
        }
    }

    let user = repo::find_by_id(&state.db, user_id)
        .await
        .map_err(|e| ApiError::db(DbOp::Find, e))?
        .ok_or_else(|| ApiError::NotFound("User Not Found".to_string()))?;

    let password_hash = match payload.password.filter(|p| !p.trim().is_empty()) {
        Some(p) => {
            Some(hash_password_blocking(p.trim().to_string(), state.config.bcrypt_cost).await?)
        }
        None => None,
    };

    let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
    let fields = UpdateFields {
        user_name: non_empty(payload.user_name).unwrap_or(user.user_name),
        first_name: non_empty(payload.first_name).unwrap_or(user.first_name),
        last_name: non_empty(payload.last_name).unwrap_or(user.last_name),
        image_url: non_empty(payload.image_url).or(user.image_url),
    };

    let updated = repo::update(&state.db, user_id, &fields, password_hash.as_deref())
        .await
        .map_err(|e| ApiError::from_write(DbOp::Update, e))?;

    info!(user_id = %updated.id, "user updated");
    Ok((
        StatusCode::ACCEPTED,
        Json(UpdateResponse {
            message: format!("{}'s account has successfully been updated.", updated.email),
            data: ProfileData::from(updated),
        }),
    ))
}

#[instrument(skip(state))]
pub async fn delete(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let user = repo::find_by_id(&state.db, user_id)
        .await
        .map_err(|e| ApiError::db(DbOp::Find, e))?
        .ok_or_else(|| ApiError::NotFound("User Not Found".to_string()))?;

    repo::delete(&state.db, user_id)
        .await
        .map_err(|e| ApiError::db(DbOp::Delete, e))?;

    info!(user_id = %user.id, user_name = %user.user_name, "user deleted");
    Ok(Json(DeleteResponse {
        message: "The user listed below has just been deleted".to_string(),
        data: DeletedUser {
            user_name: user.user_name,
            first_name: user.first_name,
            last_name: user.last_name,
        },
    }))
}
