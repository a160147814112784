//! CLI commands

pub mod info;
pub mod sign;
pub mod workflow;
