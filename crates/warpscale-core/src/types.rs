//! Domain types for WarpScale.
//!
//! These types describe monitors, the metrics samples they produce, and
//! the votes they cast. Samples are JSON-serializable so the metrics store
//! can persist them.

use std::collections::BTreeMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Stable identifier for a scale monitor (e.g. `orders-queue`).
///
/// Issued by the monitor's descriptor and enforced unique by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MonitorId(String);

impl MonitorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MonitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MonitorId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for MonitorId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Describes a monitor to the registry and API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleMonitorDescriptor {
    pub id: MonitorId,
    /// Trigger kind this monitor observes: "queue", "http_gauge", "timer", etc.
    pub trigger: String,
}

impl ScaleMonitorDescriptor {
    pub fn new(id: impl Into<MonitorId>, trigger: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            trigger: trigger.into(),
        }
    }
}

// ── Metrics ────────────────────────────────────────────────────────

/// A point-in-time metrics sample taken from one monitor.
///
/// The value names are monitor-defined (e.g. `queue_length`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerMetrics {
    /// Unix timestamp (milliseconds) when the sample was taken.
    pub timestamp: u64,
    pub values: BTreeMap<String, f64>,
}

impl TriggerMetrics {
    /// Create a sample stamped with the current time.
    pub fn now(values: BTreeMap<String, f64>) -> Self {
        Self {
            timestamp: epoch_millis(),
            values,
        }
    }

    /// Create a sample holding a single named value.
    pub fn single(name: &str, value: f64) -> Self {
        let mut values = BTreeMap::new();
        values.insert(name.to_string(), value);
        Self::now(values)
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }
}

// ── Votes ──────────────────────────────────────────────────────────

/// A monitor's opinion on scale direction.
///
/// There is no ordering between votes; aggregation uses unanimity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleVote {
    ScaleOut,
    ScaleIn,
    None,
}

impl fmt::Display for ScaleVote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScaleVote::ScaleOut => "scale_out",
            ScaleVote::ScaleIn => "scale_in",
            ScaleVote::None => "none",
        };
        f.write_str(s)
    }
}

/// The result of asking one monitor for its scale status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleStatus {
    pub vote: ScaleVote,
}

impl From<ScaleVote> for ScaleStatus {
    fn from(vote: ScaleVote) -> Self {
        Self { vote }
    }
}

/// Input to a monitor's vote.
///
/// Callers fill in `worker_count`; the aggregator sets `metrics` to the
/// monitor's own samples (oldest first) before each vote.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScaleStatusContext {
    /// Current worker count for the whole pool.
    pub worker_count: u32,
    #[serde(default)]
    pub metrics: Vec<TriggerMetrics>,
}

impl ScaleStatusContext {
    pub fn new(worker_count: u32) -> Self {
        Self {
            worker_count,
            metrics: Vec::new(),
        }
    }

    /// Copy of this context carrying one monitor's samples.
    pub fn with_metrics(&self, metrics: Vec<TriggerMetrics>) -> Self {
        Self {
            worker_count: self.worker_count,
            metrics,
        }
    }

    /// Most recent sample, if any.
    pub fn latest(&self) -> Option<&TriggerMetrics> {
        self.metrics.last()
    }
}

pub fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
