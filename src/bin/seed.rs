//! Seeds the admin identity from the environment. Idempotent: an existing
//! admin (by email) is left alone.

use anyhow::Context;
use recipely::{auth::password::hash_password, state::AppState, users::repo};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "recipely=info".to_string()),
        )
        .init();

    let user_name = std::env::var("ADMIN_USER_NAME").context("ADMIN_USER_NAME")?;
    let email = std::env::var("ADMIN_EMAIL").context("ADMIN_EMAIL")?;
    let password = std::env::var("ADMIN_PASSWORD").context("ADMIN_PASSWORD")?;
    let first_name = std::env::var("ADMIN_FIRST_NAME").context("ADMIN_FIRST_NAME")?;
    let last_name = std::env::var("ADMIN_LAST_NAME").context("ADMIN_LAST_NAME")?;

    let state = AppState::init().await?;
    sqlx::migrate!("./migrations").run(&state.db).await?;

    if let Some(existing) = repo::find_by_email(&state.db, &email).await? {
        tracing::info!(user_id = %existing.id, "admin already seeded");
        return Ok(());
    }

    let hash = hash_password(password.trim(), state.config.bcrypt_cost)?;
    let admin = repo::create(
        &state.db,
        &user_name,
        &email,
        &hash,
        &first_name,
        &last_name,
    )
    .await?;

    tracing::info!(user_id = %admin.id, user_name = %admin.user_name, "admin seeded");
    Ok(())
}
