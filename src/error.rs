use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::auth::jwt::AuthError;

/// Field-level validation messages, keyed by the offending request field.
#[derive(Debug, Default, Clone, Serialize, PartialEq)]
pub struct ValidationErrors(pub BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Ok when no rule failed, otherwise the collected messages as an error.
    pub fn into_result(self) -> Result<(), ApiError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self))
        }
    }
}

/// Which store operation a database failure happened in. Failures are
/// surfaced verbatim but labeled with the operation that triggered them.
#[derive(Debug, Clone, Copy)]
pub enum DbOp {
    Find,
    Create,
    Update,
    Delete,
}

impl DbOp {
    fn verb(self) -> &'static str {
        match self {
            DbOp::Find => "find",
            DbOp::Create => "create",
            DbOp::Update => "update",
            DbOp::Delete => "delete",
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed")]
    Validation(ValidationErrors),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("The database server could not {} the user", .op.verb())]
    Database {
        op: DbOp,
        #[source]
        source: sqlx::Error,
    },

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn db(op: DbOp, source: sqlx::Error) -> Self {
        Self::Database { op, source }
    }

    /// Maps an insert/update failure, turning a unique-constraint violation
    /// into the conflict the pre-checks would have reported. This is the
    /// race-safe path: two concurrent signups for the same name resolve here.
    pub fn from_write(op: DbOp, source: sqlx::Error) -> Self {
        if let Some(db_err) = source.as_database_error() {
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or_default();
                let message = match constraint {
                    "users_user_name_key" => "That user name has already been taken".to_string(),
                    "users_email_key" => {
                        "An account has already been created for that email".to_string()
                    }
                    _ => "A user with those details already exists".to_string(),
                };
                return Self::Conflict(message);
            }
        }
        Self::Database { op, source }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Validation(errors) => {
                (StatusCode::UNPROCESSABLE_ENTITY, json!(errors))
            }
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, json!(msg)),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, json!(msg)),
            ApiError::Auth(err) => (StatusCode::UNAUTHORIZED, json!(err.to_string())),
            ApiError::Database { source, .. } => {
                tracing::error!(error = %source, "database failure");
                (StatusCode::INTERNAL_SERVER_ERROR, json!(self.to_string()))
            }
            ApiError::Internal(err) => {
                tracing::error!(error = %err, "internal failure");
                (StatusCode::INTERNAL_SERVER_ERROR, json!("Internal server error"))
            }
        };

        (status, Json(json!({ "error": { "message": message } }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_collect_per_field() {
        let mut errors = ValidationErrors::default();
        errors.add("userName", "The userName field is required.");
        errors.add("password", "first");
        errors.add("password", "second");

        assert_eq!(errors.0["userName"].len(), 1);
        assert_eq!(errors.0["password"].len(), 2);
        assert!(errors.into_result().is_err());
    }

    #[test]
    fn empty_validation_is_ok() {
        assert!(ValidationErrors::default().into_result().is_ok());
    }

    #[test]
    fn validation_renders_422_with_field_map() {
        let mut errors = ValidationErrors::default();
        errors.add("email", "The email format is invalid.");
        let response = ApiError::Validation(errors).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn conflict_renders_409() {
        let response = ApiError::Conflict("taken".into()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn auth_errors_render_401() {
        let response = ApiError::Auth(AuthError::MissingToken).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let response = ApiError::Auth(AuthError::InvalidToken).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn database_errors_label_the_operation() {
        let err = ApiError::db(DbOp::Update, sqlx::Error::RowNotFound);
        assert!(err.to_string().contains("update"));
        let err = ApiError::db(DbOp::Find, sqlx::Error::RowNotFound);
        assert!(err.to_string().contains("find"));
    }
}
