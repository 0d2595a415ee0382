//! Command implementations for the vgenie CLI

pub mod admin;
pub mod config;
pub mod estimate;
pub mod industries;
pub mod migrate;
pub mod serve;

// Re-export dispatcher functions for flat access from main.rs
pub use admin::run_admin;
pub use config::run_config;
pub use estimate::run_estimate;
pub use industries::run_industries;
pub use migrate::run_migrate;
pub use serve::run_serve;
