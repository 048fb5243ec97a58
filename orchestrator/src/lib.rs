//! Orchestration engine for a multi-stage code-modification pipeline.
//!
//! A run walks a fixed stage graph (index, plan, execute, audit, validate,
//! then apply / retry / skip / abort) over a dependency-ordered task tree,
//! driving external collaborators and recording every outcome in a single
//! [`core::state::PipelineState`]. The architecture enforces a strict
//! separation:
//!
//! - **[`core`]**: Pure, deterministic logic (state merge, task selection,
//!   decision policy, invariants). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (config files, plan files, run
//!   artifacts).
//!
//! [`graph`] and [`driver`] coordinate core logic with the
//! [`collaborators`] to execute a run; [`report`] turns the final state into a
//! review artifact.
//!
//! # Embedding
//!
//! A host installs the stderr subscriber from [`logging::init`] once, then
//! builds a [`driver::Pipeline`] over its own collaborators:
//!
//! ```no_run
//! use std::path::Path;
//!
//! use orchestrator::collaborators::Collaborators;
//! use orchestrator::driver::Pipeline;
//! use orchestrator::io::config::load_config;
//! use orchestrator::io::run_log::write_run_artifacts;
//!
//! fn refactor(collaborators: Collaborators<'_>, directive: &str, repo: &str) -> anyhow::Result<bool> {
//!     orchestrator::logging::init()?;
//!     let config = load_config(Path::new("orchestrator.toml"))?;
//!     let run = Pipeline::new(collaborators, &config).run(directive, repo);
//!     write_run_artifacts(Path::new("runs/latest"), &run)?;
//!     Ok(run.succeeded())
//! }
//! ```

pub mod collaborators;
pub mod core;
pub mod driver;
pub mod graph;
pub mod io;
pub mod logging;
pub mod report;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
