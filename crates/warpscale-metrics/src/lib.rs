//! warpscale-metrics — periodic metrics sampling for WarpScale.
//!
//! The [`ScaleMonitorService`] runs one background task that wakes every
//! sampling interval and, only on the primary host, asks the metrics
//! repository to take and persist a sample for every active monitor.
//!
//! # Architecture
//!
//! ```text
//! ScaleMonitorService
//!   ├── start() → spawns the sampling task
//!   ├── sampling task (one per service, ticks never overlap)
//!   │   ├── sleep(interval) or shutdown
//!   │   ├── LeadershipOracle::is_primary()?
//!   │   │   └── MetricsRepository::sample(MonitorRegistry::get_monitors())
//!   │   └── non-fatal error → logged, loop continues
//!   ├── stop() / dispose() → signal shutdown (idempotent)
//!   └── wait() → Unrecoverable error that ended the loop, if any
//! ```

pub mod service;

pub use service::{ScaleMonitorService, ServiceState};
