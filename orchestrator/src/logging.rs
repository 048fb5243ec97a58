//! Stderr diagnostics for hosts embedding the engine.
//!
//! Stage spans (`stage = ...`), decisions and collaborator faults are emitted
//! through `tracing`. They are diagnostics only: the record of a run lives in
//! `PipelineState::errors` and the files written by `io::run_log`, and neither
//! depends on `RUST_LOG`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "orchestrator=info,warn";

/// Install the global stderr subscriber.
///
/// Call once at host startup, before [`crate::driver::Pipeline::run`]. A
/// second call fails because a global subscriber is already set.
///
/// ```bash
/// RUST_LOG=orchestrator::graph=debug my-host refactor "rename hooks"
/// ```
pub fn init() -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .compact(),
        )
        .try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }

    #[test]
    fn second_init_reports_error() {
        let _ = init();
        assert!(init().is_err());
    }
}
