//! Database query functions for the `users` identity cache.

use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::models::User;

/// Profile fields taken from the identity provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserProfile<'a> {
    pub given_name: Option<&'a str>,
    pub family_name: Option<&'a str>,
    pub email: Option<&'a str>,
}

/// Insert the user, or refresh the cached profile when any field changed.
/// `updated_at` only moves when something actually differs.
pub async fn upsert_user(pool: &PgPool, id: &str, profile: &UserProfile<'_>) -> Result<User> {
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (id, given_name, family_name, email) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (id) DO UPDATE \
         SET given_name = EXCLUDED.given_name, \
             family_name = EXCLUDED.family_name, \
             email = EXCLUDED.email, \
             updated_at = CASE \
                 WHEN (users.given_name, users.family_name, users.email) \
                      IS DISTINCT FROM \
                      (EXCLUDED.given_name, EXCLUDED.family_name, EXCLUDED.email) \
                 THEN now() ELSE users.updated_at END \
         RETURNING *",
    )
    .bind(id)
    .bind(profile.given_name)
    .bind(profile.family_name)
    .bind(profile.email)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to cache user {id}"))?;

    Ok(user)
}

/// Fetch a cached user.
pub async fn get_user(pool: &PgPool, id: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch user")?;

    Ok(user)
}
