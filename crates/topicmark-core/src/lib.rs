pub mod access;
pub mod gateway;
pub mod generation;
pub mod hierarchy;
pub mod identity;
pub mod plan;
pub mod session;
pub mod validate;
