//! warpscale-trigger — concrete scale monitors for WarpScale.
//!
//! [`HttpGaugeMonitor`] samples a numeric gauge (queue depth, backlog size)
//! exposed over plain HTTP and votes by comparing the per-worker load with
//! a target.
//!
//! # Voting
//!
//! ```text
//! latest = newest retained gauge sample
//!
//! no samples                         → None
//! workers == 0 and latest > 0        → ScaleOut
//! every retained sample == 0         → ScaleIn
//! latest / workers > target * 1.1    → ScaleOut
//! latest / workers < target * 0.5    → ScaleIn
//! otherwise                          → None
//! ```

pub mod gauge;

pub use gauge::{gauge_vote, HttpGaugeMonitor, GAUGE_METRIC};
