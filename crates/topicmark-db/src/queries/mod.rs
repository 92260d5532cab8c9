//! Query functions, one module per table.

pub mod lesson_plans;
pub mod topics;
pub mod users;
