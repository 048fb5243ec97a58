//! Side-effecting helpers: configuration, plan files, run artifacts.

pub mod config;
pub mod plan_store;
pub mod run_log;
