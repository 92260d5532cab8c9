//! `topicmark lesson` subcommands: inspect stored lesson plans.

use std::fmt::Write as _;

use anyhow::{Context, Result};
use sqlx::PgPool;

use topicmark_core::hierarchy::reconstruct_hierarchy;
use topicmark_db::models::FlatTopicRecord;
use topicmark_db::queries::lesson_plans as plan_db;

use crate::LessonCommands;

pub async fn run_lesson_command(command: &LessonCommands, pool: &PgPool) -> Result<()> {
    match command {
        LessonCommands::List { user, public } => run_list(pool, user.as_deref(), *public).await,
        LessonCommands::Show { id, content } => run_show(pool, *id, *content).await,
    }
}

async fn run_list(pool: &PgPool, user: Option<&str>, public: bool) -> Result<()> {
    let plans = match (user, public) {
        (_, true) => plan_db::list_public_lesson_plans(pool).await?,
        (Some(user), false) => plan_db::list_lesson_plans_for_user(pool, user).await?,
        (None, false) => plan_db::list_all_lesson_plans(pool).await?,
    };

    if plans.is_empty() {
        println!("No lesson plans found.");
        return Ok(());
    }

    println!(
        "{:>6} {:<30} {:<24} {:<16} {:>6} {:<6}",
        "ID", "NAME", "MAIN TOPIC", "OWNER", "TOPICS", "PUBLIC"
    );
    println!("{}", "-".repeat(93));
    for plan in &plans {
        println!(
            "{:>6} {:<30} {:<24} {:<16} {:>6} {:<6}",
            plan.id,
            truncate(&plan.name, 28),
            truncate(&plan.main_topic, 22),
            truncate(&plan.user_id, 14),
            plan.topics.0.len(),
            if plan.is_public { "yes" } else { "no" },
        );
    }
    Ok(())
}

async fn run_show(pool: &PgPool, id: i32, with_content: bool) -> Result<()> {
    let plan = plan_db::get_lesson_plan(pool, id)
        .await?
        .with_context(|| format!("lesson plan {id} not found"))?;

    println!("Lesson plan: {} ({})", plan.name, plan.id);
    println!("Main topic: {}", plan.main_topic);
    println!("Owner: {}", plan.user_id);
    println!("Public: {}", if plan.is_public { "yes" } else { "no" });
    println!("Updated: {}", plan.updated_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!();
    print!("{}", render_tree(&plan.topics.0, with_content));
    Ok(())
}

/// Char-safe truncation with a trailing ellipsis.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_owned();
    }
    let head: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{head}...")
}

/// Render stored records as an indented tree. Topics with saved content are
/// marked `+`, empty ones `.`.
pub fn render_tree(records: &[FlatTopicRecord], with_content: bool) -> String {
    let hierarchy = reconstruct_hierarchy(records);
    if hierarchy.is_empty() {
        return "(no topics)\n".to_owned();
    }

    let mut out = String::new();
    for node in &hierarchy {
        render_node(&mut out, records, &node.name, 1, with_content);
        for sub in &node.subtopics {
            render_node(&mut out, records, sub, 2, with_content);
        }
    }
    out
}

fn render_node(out: &mut String, records: &[FlatTopicRecord], name: &str, depth: usize, with_content: bool) {
    let record = records.iter().find(|r| r.topic == name);
    let marker = if record.is_some_and(FlatTopicRecord::has_content) {
        '+'
    } else {
        '.'
    };
    let indent = "  ".repeat(depth);
    // Writing to a String cannot fail.
    let _ = writeln!(out, "{indent}[{marker}] {name}");

    if let (true, Some(record)) = (with_content, record) {
        for line in record.mdx_content.lines() {
            let _ = writeln!(out, "{indent}    | {line}");
        }
    }
}
