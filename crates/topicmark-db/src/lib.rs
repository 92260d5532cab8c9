//! PostgreSQL persistence for lesson plans, saved topics, and cached users.

pub mod config;
pub mod models;
pub mod pool;
pub mod queries;
