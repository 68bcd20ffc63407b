use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database. The password hash never leaves the server.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub user_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub image_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Projection returned by the listing endpoint.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserListing {
    pub user_name: String,
    pub image_url: Option<String>,
}

/// Fields applied by update; already merged with the prior record, so every
/// field is final. Password arrives separately and only when it changes.
#[derive(Debug)]
pub struct UpdateFields {
    pub user_name: String,
    pub first_name: String,
    pub last_name: String,
    pub image_url: Option<String>,
}

const USER_COLUMNS: &str =
    "id, user_name, email, password_hash, first_name, last_name, image_url, created_at";

pub async fn find_by_user_name(db: &PgPool, user_name: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE user_name = $1"
    ))
    .bind(user_name)
    .fetch_optional(db)
    .await
}

pub async fn find_by_email(db: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
        .bind(email)
        .fetch_optional(db)
        .await
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await
}

/// Collision pre-check for update: does any *other* user hold this name?
pub async fn user_name_taken_by_other(
    db: &PgPool,
    user_name: &str,
    id: Uuid,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE user_name = $1 AND id <> $2)",
    )
    .bind(user_name)
    .bind(id)
    .fetch_one(db)
    .await
}

pub async fn create(
    db: &PgPool,
    user_name: &str,
    email: &str,
    password_hash: &str,
    first_name: &str,
    last_name: &str,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users (user_name, email, password_hash, first_name, last_name)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(user_name)
    .bind(email)
    .bind(password_hash)
    .bind(first_name)
    .bind(last_name)
    .fetch_one(db)
    .await
}

pub async fn update(
    db: &PgPool,
    id: Uuid,
    fields: &UpdateFields,
    password_hash: Option<&str>,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE users
        SET user_name = $1,
            first_name = $2,
            last_name = $3,
            image_url = $4,
            password_hash = COALESCE($5, password_hash)
        WHERE id = $6
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(&fields.user_name)
    .bind(&fields.first_name)
    .bind(&fields.last_name)
    .bind(&fields.image_url)
    .bind(password_hash)
    .bind(id)
    .fetch_one(db)
    .await
}

pub async fn delete(db: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected())
}

pub async fn list(db: &PgPool) -> Result<Vec<UserListing>, sqlx::Error> {
    sqlx::query_as::<_, UserListing>("SELECT user_name, image_url FROM users")
        .fetch_all(db)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_serializes_without_password_hash() {
        let user = User {
            id: Uuid::new_v4(),
            user_name: "chef".into(),
            email: "chef@example.com".into(),
            password_hash: "$2b$08$secret".into(),
            first_name: "Julia".into(),
            last_name: "Childs".into(),
            image_url: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret"));
        assert!(!json.contains("password"));
        assert!(json.contains("userName"));
    }

    #[test]
    fn listing_uses_camel_case_fields() {
        let listing = UserListing {
            user_name: "chef".into(),
            image_url: Some("https://img.example/1.png".into()),
        };
        let json = serde_json::to_value(&listing).unwrap();
        assert_eq!(json["userName"], "chef");
        assert_eq!(json["imageUrl"], "https://img.example/1.png");
    }
}
