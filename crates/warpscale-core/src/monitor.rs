//! Scale monitor and metrics repository contracts.
//!
//! Both traits return boxed futures so they stay object-safe and can be
//! shared as `Arc<dyn ...>` between the aggregation and sampling loops.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::ScaleResult;
use crate::types::{MonitorId, ScaleMonitorDescriptor, ScaleStatus, ScaleStatusContext, TriggerMetrics};

/// Boxed future alias used by the async contracts.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The scale-observing counterpart of a trigger.
///
/// A monitor produces metrics samples and, given recent samples and the
/// current worker count, votes on scale direction.
pub trait ScaleMonitor: Send + Sync {
    fn descriptor(&self) -> &ScaleMonitorDescriptor;

    /// Take one metrics sample from the underlying event source.
    fn get_metrics(&self) -> BoxFuture<'_, ScaleResult<TriggerMetrics>>;

    /// Vote on scale direction. `context.metrics` holds this monitor's
    /// samples, oldest first.
    fn get_scale_status(&self, context: &ScaleStatusContext) -> ScaleResult<ScaleStatus>;

    fn id(&self) -> &MonitorId {
        &self.descriptor().id
    }
}

/// Reads and writes metrics samples for a set of monitors.
pub trait MetricsRepository: Send + Sync {
    /// Take a new sample from each monitor and persist it.
    ///
    /// A failing monitor must not corrupt samples already persisted for the
    /// others.
    fn sample<'a>(&'a self, monitors: &'a [Arc<dyn ScaleMonitor>]) -> BoxFuture<'a, ScaleResult<()>>;

    /// Read the retained samples for each monitor, oldest first.
    ///
    /// Every requested monitor appears in the result; monitors without
    /// samples map to an empty `Vec`.
    fn read<'a>(
        &'a self,
        monitors: &'a [Arc<dyn ScaleMonitor>],
    ) -> BoxFuture<'a, ScaleResult<HashMap<MonitorId, Vec<TriggerMetrics>>>>;
}
