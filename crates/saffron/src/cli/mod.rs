//! Command implementations.

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod run;
mod summary;
pub mod types;
