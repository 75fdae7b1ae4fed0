//! `tracing` subscriber setup for the binary

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

/// Filter directive: `RUST_LOG`, else the configured filter, else `info`.
pub fn filter_directive(configured: Option<&str>) -> String {
    std::env::var(EnvFilter::DEFAULT_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(|| configured.map(str::to_string))
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}

/// Install the global subscriber. Logs go to stderr so command output on
/// stdout stays machine-readable.
pub fn init(configured: Option<&str>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(filter_directive(configured))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))?;
    Ok(())
}
