//! warpscale.toml configuration parser.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ScaleError, ScaleResult};

/// Default sampling interval.
pub const DEFAULT_SAMPLING_INTERVAL: Duration = Duration::from_secs(10);

/// Default number of samples retained per monitor.
pub const DEFAULT_MAX_SAMPLES: usize = 5;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScaleConfig {
    pub sampling: Option<SamplingConfig>,
    pub store: Option<StoreConfig>,
    pub decision: Option<DecisionConfig>,
    pub host: Option<HostConfig>,
    #[serde(default)]
    pub monitors: Vec<MonitorConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Interval between sampling ticks ("10s", "500ms", "1m").
    pub interval: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub max_samples_per_monitor: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionConfig {
    pub vote_failure: Option<VoteFailurePolicy>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    pub primary: Option<bool>,
}

/// An HTTP gauge monitor declared in config.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitorConfig {
    pub id: String,
    /// `host:port` of the gauge endpoint.
    pub address: String,
    pub path: String,
    /// Desired gauge value per worker.
    pub target_per_worker: f64,
    pub timeout: Option<String>,
}

/// What the aggregator does when a monitor fails to vote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteFailurePolicy {
    /// Fail the whole aggregation pass.
    #[default]
    Propagate,
    /// Log the failure and leave the monitor out of the unanimity check.
    Abstain,
}

impl ScaleConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ScaleConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: ScaleConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Sampling interval, falling back to 10s when unset.
    pub fn sampling_interval(&self) -> ScaleResult<Duration> {
        match self.sampling.as_ref().and_then(|s| s.interval.as_deref()) {
            Some(raw) => {
                let interval = parse_duration(raw)
                    .ok_or_else(|| ScaleError::Config(format!("invalid sampling interval: {raw}")))?;
                if interval.is_zero() {
                    return Err(ScaleError::Config("sampling interval must be non-zero".to_string()));
                }
                Ok(interval)
            }
            None => Ok(DEFAULT_SAMPLING_INTERVAL),
        }
    }

    pub fn max_samples_per_monitor(&self) -> usize {
        self.store
            .as_ref()
            .and_then(|s| s.max_samples_per_monitor)
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_MAX_SAMPLES)
    }

    pub fn vote_failure_policy(&self) -> VoteFailurePolicy {
        self.decision
            .as_ref()
            .and_then(|d| d.vote_failure)
            .unwrap_or_default()
    }

    pub fn is_primary(&self) -> bool {
        self.host.as_ref().and_then(|h| h.primary).unwrap_or(false)
    }
}

impl MonitorConfig {
    /// Probe timeout, defaulting to 2s.
    pub fn timeout(&self) -> Duration {
        self.timeout
            .as_deref()
            .and_then(parse_duration)
            .unwrap_or(Duration::from_secs(2))
    }
}

/// Parse a duration like "500ms", "10s", "2m", or bare seconds.
///
/// Returns `None` for unknown units and for values that overflow.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    let unit_at = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (digits, unit) = s.split_at(unit_at);
    let value: u64 = digits.parse().ok()?;

    match unit {
        "ms" => Some(Duration::from_millis(value)),
        "" | "s" => Some(Duration::from_secs(value)),
        "m" => value.checked_mul(60).map(Duration::from_secs),
        _ => None,
    }
}
