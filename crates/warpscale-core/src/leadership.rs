//! Leadership (primary host) contract.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::info;

/// Reports whether this process is the elected primary.
///
/// Must be cheap and side-effect free; it is queried once per tick.
pub trait LeadershipOracle: Send + Sync {
    fn is_primary(&self) -> bool;
}

/// Leadership flag owned by the host.
///
/// Election itself happens elsewhere; the host flips this flag when the
/// outcome changes.
#[derive(Debug, Default)]
pub struct PrimaryHostState {
    primary: AtomicBool,
}

impl PrimaryHostState {
    pub fn new(primary: bool) -> Self {
        Self {
            primary: AtomicBool::new(primary),
        }
    }

    pub fn set_primary(&self, primary: bool) {
        let previous = self.primary.swap(primary, Ordering::SeqCst);
        if previous != primary {
            info!(primary, "primary host state changed");
        }
    }
}

impl LeadershipOracle for PrimaryHostState {
    fn is_primary(&self) -> bool {
        self.primary.load(Ordering::SeqCst)
    }
}
