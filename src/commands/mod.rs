//! CLI commands

pub mod project;
pub mod replace;
