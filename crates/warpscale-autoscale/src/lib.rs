//! warpscale-autoscale — vote aggregation for WarpScale.
//!
//! Reads the retained metrics of every active monitor, asks each monitor
//! to vote given its samples and the current worker count, and folds the
//! votes into a single decision.
//!
//! # Aggregation Rule
//!
//! ```text
//! if votes non-empty and every vote == ScaleOut:
//!     ScaleOut
//! elif worker_count > 0 and votes non-empty and every vote == ScaleIn:
//!     ScaleIn
//! else:
//!     None
//! ```
//!
//! Unanimity keeps disagreeing triggers from thrashing the pool; the
//! worker-count guard keeps an idle pool from scaling in below zero.

pub mod manager;

pub use manager::{aggregate_votes, MonitorVote, ScaleEvaluation, ScaleManager};
