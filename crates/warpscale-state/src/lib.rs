//! warpscale-state — persistent metrics store for WarpScale.
//!
//! Backed by [redb](https://docs.rs/redb), stores the recent metrics
//! samples of every scale monitor and implements the
//! [`MetricsRepository`](warpscale_core::MetricsRepository) contract used by
//! the sampling loop (write path) and the scale manager (read path).
//!
//! # Layout
//!
//! Samples are JSON-serialized into a single table keyed
//! `{monitor_id}:{sequence}` with a zero-padded sequence, so a key scan
//! yields each monitor's samples oldest-to-newest. Only the newest
//! `max_samples_per_monitor` samples are kept.
//!
//! The `MetricsStore` is `Clone` + `Send` + `Sync` (backed by
//! `Arc<Database>`) and can be shared across async tasks.

pub mod error;
pub mod store;
pub mod tables;

pub use error::{StateError, StateResult};
pub use store::MetricsStore;
