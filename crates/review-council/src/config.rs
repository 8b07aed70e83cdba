//! CLI configuration loading: TOML file, then environment, then flags.

use std::path::Path;

use anyhow::{Context, Result};
use consensus::EngineConfig;

/// Load engine settings from an optional TOML file and apply
/// `REVIEW_*` environment overrides.
pub fn load(path: Option<&Path>) -> Result<EngineConfig> {
    let mut config = match path {
        Some(path) => from_file(path)?,
        None => EngineConfig::default(),
    };
    apply_env(&mut config)?;
    Ok(config)
}

/// Parse an engine config from a TOML file.
pub fn from_file(path: &Path) -> Result<EngineConfig> {
    let content =
        std::fs::read_to_string(path).context(format!("Failed to read {}", path.display()))?;
    let config: EngineConfig =
        toml::from_str(&content).context("Failed to parse engine config TOML")?;
    Ok(config)
}

fn apply_env(config: &mut EngineConfig) -> Result<()> {
    if let Ok(raw) = std::env::var("REVIEW_THRESHOLD") {
        config.voting.threshold = raw
            .trim()
            .parse()
            .context(format!("REVIEW_THRESHOLD is not a number: {raw}"))?;
    }
    if let Ok(raw) = std::env::var("REVIEW_MAX_ROUNDS") {
        config.debate.max_rounds = raw
            .trim()
            .parse()
            .context(format!("REVIEW_MAX_ROUNDS is not an integer: {raw}"))?;
    }
    if let Ok(raw) = std::env::var("REVIEW_REQUEST_TIMEOUT_SECS") {
        config.debate.request_timeout_secs = raw
            .trim()
            .parse()
            .context(format!("REVIEW_REQUEST_TIMEOUT_SECS is not an integer: {raw}"))?;
    }
    Ok(())
}

/// Apply command-line overrides and validate the result.
pub fn finalize(
    mut config: EngineConfig,
    threshold: Option<f64>,
    max_rounds: Option<u32>,
) -> Result<EngineConfig> {
    if let Some(threshold) = threshold {
        config.voting.threshold = threshold;
    }
    if let Some(max_rounds) = max_rounds {
        config.debate.max_rounds = max_rounds;
    }
    config.validate()?;
    Ok(config)
}
