//! warpscale-core — shared types and contracts for WarpScale.
//!
//! Defines the vocabulary the scale controller speaks: monitors, metrics
//! samples, votes, and the collaborator traits that the aggregation and
//! sampling loops are written against.
//!
//! # Architecture
//!
//! ```text
//! MonitorRegistry ──get_monitors()──┐
//!                                    ├─► ScaleManager (read path)
//! MetricsRepository ──read()────────┘
//!
//! LeadershipOracle ──is_primary()──┐
//! MonitorRegistry ──get_monitors()─┼─► ScaleMonitorService (write path)
//! MetricsRepository ──sample()─────┘
//! ```
//!
//! Monitors are identified by a stable [`MonitorId`] taken from their
//! descriptor. All mappings between monitors and samples are keyed by that
//! identifier.

pub mod config;
pub mod error;
pub mod leadership;
pub mod monitor;
pub mod registry;
pub mod types;

pub use config::{parse_duration, MonitorConfig, ScaleConfig, VoteFailurePolicy};
pub use error::{BoxError, ErrorKind, ScaleError, ScaleResult};
pub use leadership::{LeadershipOracle, PrimaryHostState};
pub use monitor::{BoxFuture, MetricsRepository, ScaleMonitor};
pub use registry::{MonitorProvider, MonitorRegistry};
pub use types::*;
