//! Engine configuration stored as TOML (e.g. `orchestrator.toml`).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::decision::{DecisionPolicy, ExhaustionPolicy, TEST_PASS_RATE_ABORT_THRESHOLD};
use crate::core::state::DEFAULT_MAX_RETRIES;
use crate::graph::GraphSettings;

/// Engine configuration (TOML).
///
/// This file is intended to be edited by humans. Missing fields default to
/// the values the pipeline has always used.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Retry budget per task. Clamped into `[1, 10]` when a run starts, so
    /// out-of-range values (including negatives) are accepted here.
    pub max_retries: i64,

    /// Stage invocations allowed before the driver gives up on a run.
    pub max_steps: u32,

    /// Test pass rate below which a failing task aborts the run immediately.
    pub pass_rate_abort_threshold: f64,

    /// What happens once a task has spent its retry budget.
    pub on_retry_exhaustion: ExhaustionPolicy,

    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Context hits fetched for the planner.
    pub plan_top_k: usize,
    /// Context hits fetched per executed task.
    pub execute_top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            plan_top_k: 10,
            execute_top_k: 5,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_retries: i64::from(DEFAULT_MAX_RETRIES),
            max_steps: 200,
            pass_rate_abort_threshold: TEST_PASS_RATE_ABORT_THRESHOLD,
            on_retry_exhaustion: ExhaustionPolicy::Abort,
            retrieval: RetrievalConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_steps == 0 {
            return Err(anyhow!("max_steps must be > 0"));
        }
        if !(self.pass_rate_abort_threshold > 0.0 && self.pass_rate_abort_threshold <= 1.0) {
            return Err(anyhow!("pass_rate_abort_threshold must be in (0, 1]"));
        }
        if self.retrieval.plan_top_k == 0 {
            return Err(anyhow!("retrieval.plan_top_k must be > 0"));
        }
        if self.retrieval.execute_top_k == 0 {
            return Err(anyhow!("retrieval.execute_top_k must be > 0"));
        }
        Ok(())
    }

    pub fn decision_policy(&self) -> DecisionPolicy {
        DecisionPolicy {
            pass_rate_threshold: self.pass_rate_abort_threshold,
            on_exhaustion: self.on_retry_exhaustion,
        }
    }

    pub fn graph_settings(&self) -> GraphSettings {
        GraphSettings {
            plan_top_k: self.retrieval.plan_top_k,
            execute_top_k: self.retrieval.execute_top_k,
            policy: self.decision_policy(),
        }
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `EngineConfig::default()`.
pub fn load_config(path: &Path) -> Result<EngineConfig> {
    if !path.exists() {
        let cfg = EngineConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: EngineConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &EngineConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
