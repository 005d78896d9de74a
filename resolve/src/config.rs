use std::{fs, path::Path, time::Duration};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

/// Resolver settings: endpoint, batching, and pacing.
#[derive(Debug, Clone, Deserialize)]
pub struct ResolverConfig {
    /// TNRS match endpoint URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Maximum number of names per service call.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Pause between service calls, in milliseconds. Rate-limit courtesy,
    /// not a correctness requirement.
    #[serde(default = "default_pause_ms")]
    pub pause_ms: u64,
    /// Per-call request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            batch_size: default_batch_size(),
            pause_ms: default_pause_ms(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl ResolverConfig {
    /// Loads configuration from a TOML file, applying defaults for any
    /// omitted key.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading resolver config {}", path.display()))?;
        let config: Self =
            toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            bail!("batch_size must be at least 1");
        }
        if self.endpoint.trim().is_empty() {
            bail!("endpoint must not be empty");
        }
        Ok(())
    }

    /// Pause inserted after each service call.
    #[must_use]
    pub const fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_ms)
    }

    /// Per-call request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_endpoint() -> String {
    "https://api.opentreeoflife.org/v3/tnrs/match_names".into()
}

const fn default_batch_size() -> usize {
    200
}

const fn default_pause_ms() -> u64 {
    1_000
}

const fn default_timeout_ms() -> u64 {
    30_000
}
