//! Database query functions for the `topics` table.

use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::models::{Difficulty, Topic};

/// Listing endpoints never return more than this many topics.
pub const LIST_LIMIT: i64 = 100;

/// Editable fields of a saved topic.
#[derive(Debug, Clone, Copy)]
pub struct TopicFields<'a> {
    pub axios_wing: &'a str,
    pub topic: &'a str,
    pub difficulty: Difficulty,
    pub mdx_content: &'a str,
    pub main_topic: Option<&'a str>,
    pub parent_topic: Option<&'a str>,
    pub is_subtopic: bool,
}

/// Insert a topic for `user_id`.
pub async fn insert_topic(pool: &PgPool, user_id: &str, fields: &TopicFields<'_>) -> Result<Topic> {
    let topic = sqlx::query_as::<_, Topic>(
        "INSERT INTO topics (user_id, axios_wing, topic, difficulty, mdx_content, \
         main_topic, parent_topic, is_subtopic) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING *",
    )
    .bind(user_id)
    .bind(fields.axios_wing)
    .bind(fields.topic)
    .bind(fields.difficulty)
    .bind(fields.mdx_content)
    .bind(fields.main_topic)
    .bind(fields.parent_topic)
    .bind(fields.is_subtopic)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to insert topic {:?}", fields.topic))?;

    Ok(topic)
}

/// Fetch a topic owned by `user_id`.
pub async fn get_topic_for_user(pool: &PgPool, id: i32, user_id: &str) -> Result<Option<Topic>> {
    let topic = sqlx::query_as::<_, Topic>("SELECT * FROM topics WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch topic")?;

    Ok(topic)
}

/// List a user's topics, newest first.
pub async fn list_topics_for_user(pool: &PgPool, user_id: &str) -> Result<Vec<Topic>> {
    let topics = sqlx::query_as::<_, Topic>(
        "SELECT * FROM topics WHERE user_id = $1 ORDER BY created_at DESC, id DESC LIMIT $2",
    )
    .bind(user_id)
    .bind(LIST_LIMIT)
    .fetch_all(pool)
    .await
    .context("failed to list topics")?;

    Ok(topics)
}

/// List a user's topics at one difficulty level, newest first.
pub async fn list_topics_by_difficulty(
    pool: &PgPool,
    user_id: &str,
    difficulty: Difficulty,
) -> Result<Vec<Topic>> {
    let topics = sqlx::query_as::<_, Topic>(
        "SELECT * FROM topics WHERE user_id = $1 AND difficulty = $2 \
         ORDER BY created_at DESC, id DESC",
    )
    .bind(user_id)
    .bind(difficulty)
    .fetch_all(pool)
    .await
    .context("failed to list topics by difficulty")?;

    Ok(topics)
}

/// List a user's topics filed under `wing`, newest first.
pub async fn list_topics_by_wing(pool: &PgPool, user_id: &str, wing: &str) -> Result<Vec<Topic>> {
    let topics = sqlx::query_as::<_, Topic>(
        "SELECT * FROM topics WHERE user_id = $1 AND axios_wing = $2 \
         ORDER BY created_at DESC, id DESC",
    )
    .bind(user_id)
    .bind(wing)
    .fetch_all(pool)
    .await
    .context("failed to list topics by wing")?;

    Ok(topics)
}

/// Most recently updated topic named `name` owned by `user_id`.
pub async fn find_topic_by_name(pool: &PgPool, user_id: &str, name: &str) -> Result<Option<Topic>> {
    let topic = sqlx::query_as::<_, Topic>(
        "SELECT * FROM topics WHERE user_id = $1 AND topic = $2 \
         ORDER BY updated_at DESC, id DESC LIMIT 1",
    )
    .bind(user_id)
    .bind(name)
    .fetch_optional(pool)
    .await
    .context("failed to look up topic by name")?;

    Ok(topic)
}

/// Overwrite a topic owned by `user_id`. Returns `None` if it does not exist.
pub async fn update_topic(
    pool: &PgPool,
    id: i32,
    user_id: &str,
    fields: &TopicFields<'_>,
) -> Result<Option<Topic>> {
    let topic = sqlx::query_as::<_, Topic>(
        "UPDATE topics \
         SET axios_wing = $3, topic = $4, difficulty = $5, mdx_content = $6, \
             main_topic = $7, parent_topic = $8, is_subtopic = $9, updated_at = now() \
         WHERE id = $1 AND user_id = $2 \
         RETURNING *",
    )
    .bind(id)
    .bind(user_id)
    .bind(fields.axios_wing)
    .bind(fields.topic)
    .bind(fields.difficulty)
    .bind(fields.mdx_content)
    .bind(fields.main_topic)
    .bind(fields.parent_topic)
    .bind(fields.is_subtopic)
    .fetch_optional(pool)
    .await
    .with_context(|| format!("failed to update topic {id}"))?;

    Ok(topic)
}

/// Delete a topic owned by `user_id`, returning the removed row.
pub async fn delete_topic(pool: &PgPool, id: i32, user_id: &str) -> Result<Option<Topic>> {
    let topic = sqlx::query_as::<_, Topic>(
        "DELETE FROM topics WHERE id = $1 AND user_id = $2 RETURNING *",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .with_context(|| format!("failed to delete topic {id}"))?;

    Ok(topic)
}
