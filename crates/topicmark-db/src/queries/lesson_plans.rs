//! Database query functions for the `lesson_plans` table.
//!
//! Owner-scoped functions take the caller's `user_id` and treat a plan owned
//! by someone else exactly like a missing one.

use anyhow::{Context, Result};
use sqlx::PgPool;
use sqlx::types::Json;

use crate::models::{FlatTopicRecord, LessonPlanRow};

/// Listing endpoints never return more than this many plans.
pub const LIST_LIMIT: i64 = 100;

/// Fields written on insert and update.
#[derive(Debug, Clone, Copy)]
pub struct LessonPlanFields<'a> {
    pub name: &'a str,
    pub main_topic: &'a str,
    pub topics: &'a [FlatTopicRecord],
    pub is_public: bool,
}

/// Insert a new lesson plan for `user_id`. Returns the row with
/// server-generated id and timestamps.
pub async fn insert_lesson_plan(
    pool: &PgPool,
    user_id: &str,
    fields: &LessonPlanFields<'_>,
) -> Result<LessonPlanRow> {
    let plan = sqlx::query_as::<_, LessonPlanRow>(
        "INSERT INTO lesson_plans (user_id, name, main_topic, topics, is_public) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING *",
    )
    .bind(user_id)
    .bind(fields.name)
    .bind(fields.main_topic)
    .bind(Json(fields.topics))
    .bind(fields.is_public)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to insert lesson plan {:?}", fields.name))?;

    Ok(plan)
}

/// Fetch a lesson plan by id regardless of owner.
pub async fn get_lesson_plan(pool: &PgPool, id: i32) -> Result<Option<LessonPlanRow>> {
    let plan = sqlx::query_as::<_, LessonPlanRow>("SELECT * FROM lesson_plans WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch lesson plan")?;

    Ok(plan)
}

/// Fetch a lesson plan owned by `user_id`.
pub async fn get_lesson_plan_for_user(
    pool: &PgPool,
    id: i32,
    user_id: &str,
) -> Result<Option<LessonPlanRow>> {
    let plan = sqlx::query_as::<_, LessonPlanRow>(
        "SELECT * FROM lesson_plans WHERE id = $1 AND user_id = $2",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .context("failed to fetch lesson plan")?;

    Ok(plan)
}

/// Fetch a lesson plan only if it is public.
pub async fn get_public_lesson_plan(pool: &PgPool, id: i32) -> Result<Option<LessonPlanRow>> {
    let plan = sqlx::query_as::<_, LessonPlanRow>(
        "SELECT * FROM lesson_plans WHERE id = $1 AND is_public",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("failed to fetch public lesson plan")?;

    Ok(plan)
}

/// Public flag of a plan, or `None` if the plan does not exist.
pub async fn get_public_flag(pool: &PgPool, id: i32) -> Result<Option<bool>> {
    let flag: Option<(bool,)> =
        sqlx::query_as("SELECT is_public FROM lesson_plans WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("failed to check lesson plan visibility")?;

    Ok(flag.map(|(is_public,)| is_public))
}

/// List the plans owned by `user_id`, newest first.
pub async fn list_lesson_plans_for_user(pool: &PgPool, user_id: &str) -> Result<Vec<LessonPlanRow>> {
    let plans = sqlx::query_as::<_, LessonPlanRow>(
        "SELECT * FROM lesson_plans WHERE user_id = $1 \
         ORDER BY created_at DESC, id DESC LIMIT $2",
    )
    .bind(user_id)
    .bind(LIST_LIMIT)
    .fetch_all(pool)
    .await
    .context("failed to list lesson plans")?;

    Ok(plans)
}

/// List public plans from every user, newest first.
pub async fn list_public_lesson_plans(pool: &PgPool) -> Result<Vec<LessonPlanRow>> {
    let plans = sqlx::query_as::<_, LessonPlanRow>(
        "SELECT * FROM lesson_plans WHERE is_public \
         ORDER BY created_at DESC, id DESC LIMIT $1",
    )
    .bind(LIST_LIMIT)
    .fetch_all(pool)
    .await
    .context("failed to list public lesson plans")?;

    Ok(plans)
}

/// List every plan regardless of owner, newest first. Operator use only.
pub async fn list_all_lesson_plans(pool: &PgPool) -> Result<Vec<LessonPlanRow>> {
    let plans = sqlx::query_as::<_, LessonPlanRow>(
        "SELECT * FROM lesson_plans ORDER BY created_at DESC, id DESC",
    )
    .fetch_all(pool)
    .await
    .context("failed to list lesson plans")?;

    Ok(plans)
}

/// Replace the editable fields of a plan owned by `user_id` and bump
/// `updated_at`. Returns `None` when no such plan exists for that owner.
pub async fn update_lesson_plan(
    pool: &PgPool,
    id: i32,
    user_id: &str,
    fields: &LessonPlanFields<'_>,
) -> Result<Option<LessonPlanRow>> {
    let plan = sqlx::query_as::<_, LessonPlanRow>(
        "UPDATE lesson_plans \
         SET name = $3, main_topic = $4, topics = $5, is_public = $6, updated_at = now() \
         WHERE id = $1 AND user_id = $2 \
         RETURNING *",
    )
    .bind(id)
    .bind(user_id)
    .bind(fields.name)
    .bind(fields.main_topic)
    .bind(Json(fields.topics))
    .bind(fields.is_public)
    .fetch_optional(pool)
    .await
    .with_context(|| format!("failed to update lesson plan {id}"))?;

    Ok(plan)
}

/// Delete a plan owned by `user_id`. Returns whether a row was removed.
pub async fn delete_lesson_plan(pool: &PgPool, id: i32, user_id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM lesson_plans WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await
        .with_context(|| format!("failed to delete lesson plan {id}"))?;

    Ok(result.rows_affected() > 0)
}
