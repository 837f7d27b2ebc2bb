//! Monitor registry — the set of currently active scale monitors.

use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::error::{ScaleError, ScaleResult};
use crate::monitor::ScaleMonitor;
use crate::types::MonitorId;

/// Enumerates the currently active scale monitors.
///
/// The set may change between calls. An empty set is a valid result.
pub trait MonitorRegistry: Send + Sync {
    fn get_monitors(&self) -> ScaleResult<Vec<Arc<dyn ScaleMonitor>>>;
}

/// In-memory registry of scale monitors, keyed by [`MonitorId`].
///
/// Monitors are returned in registration order.
#[derive(Default)]
pub struct MonitorProvider {
    monitors: RwLock<Vec<Arc<dyn ScaleMonitor>>>,
}

impl MonitorProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a monitor. Fails if its id is already taken.
    pub fn register(&self, monitor: Arc<dyn ScaleMonitor>) -> ScaleResult<()> {
        let mut monitors = self
            .monitors
            .write()
            .map_err(|_| ScaleError::Registry("registry lock poisoned".to_string()))?;

        let id = monitor.id().clone();
        if monitors.iter().any(|m| m.id() == &id) {
            return Err(ScaleError::DuplicateMonitor(id));
        }

        monitors.push(monitor);
        debug!(monitor = %id, "scale monitor registered");
        Ok(())
    }

    /// Remove a monitor. Returns true if it was registered.
    pub fn unregister(&self, id: &MonitorId) -> ScaleResult<bool> {
        let mut monitors = self
            .monitors
            .write()
            .map_err(|_| ScaleError::Registry("registry lock poisoned".to_string()))?;

        let before = monitors.len();
        monitors.retain(|m| m.id() != id);
        let existed = monitors.len() != before;
        debug!(monitor = %id, existed, "scale monitor unregistered");
        Ok(existed)
    }

    /// Look up a single monitor by id.
    pub fn get(&self, id: &MonitorId) -> ScaleResult<Option<Arc<dyn ScaleMonitor>>> {
        let monitors = self
            .monitors
            .read()
            .map_err(|_| ScaleError::Registry("registry lock poisoned".to_string()))?;
        Ok(monitors.iter().find(|m| m.id() == id).cloned())
    }

    pub fn len(&self) -> usize {
        self.monitors.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MonitorRegistry for MonitorProvider {
    fn get_monitors(&self) -> ScaleResult<Vec<Arc<dyn ScaleMonitor>>> {
        let monitors = self
            .monitors
            .read()
            .map_err(|_| ScaleError::Registry("registry lock poisoned".to_string()))?;
        Ok(monitors.clone())
    }
}
