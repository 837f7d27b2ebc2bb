//! MetricsStore — redb-backed sample persistence for scale monitors.
//!
//! Each `sample()` pass asks every monitor for a fresh `TriggerMetrics`
//! and appends it under the monitor's key prefix, pruning anything beyond
//! the retention limit in the same write transaction. Reads return the
//! retained samples per monitor, oldest first.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::{debug, warn};

use warpscale_core::config::DEFAULT_MAX_SAMPLES;
use warpscale_core::{
    BoxFuture, MetricsRepository, MonitorId, ScaleError, ScaleMonitor, ScaleResult, TriggerMetrics,
};

use crate::error::{StateError, StateResult};
use crate::tables::SAMPLES;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Thread-safe metrics store backed by redb.
#[derive(Clone)]
pub struct MetricsStore {
    db: Arc<Database>,
    max_samples: usize,
}

impl MetricsStore {
    /// Open (or create) a persistent metrics store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self {
            db: Arc::new(db),
            max_samples: DEFAULT_MAX_SAMPLES,
        };
        store.ensure_tables()?;
        debug!(?path, "metrics store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory metrics store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self {
            db: Arc::new(db),
            max_samples: DEFAULT_MAX_SAMPLES,
        };
        store.ensure_tables()?;
        debug!("in-memory metrics store opened");
        Ok(store)
    }

    /// Set how many samples are retained per monitor (minimum 1).
    pub fn with_max_samples(mut self, max_samples: usize) -> Self {
        self.max_samples = max_samples.max(1);
        self
    }

    pub fn max_samples(&self) -> usize {
        self.max_samples
    }

    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        txn.open_table(SAMPLES).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Append a sample for a monitor, pruning the oldest beyond retention.
    pub fn append_sample(&self, monitor: &MonitorId, sample: &TriggerMetrics) -> StateResult<()> {
        let value = serde_json::to_vec(sample).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let pruned;
        {
            let mut table = txn.open_table(SAMPLES).map_err(map_err!(Table))?;

            // Existing keys for this monitor, in ascending sequence order.
            let existing: Vec<(String, u64)> = {
                let mut keys = Vec::new();
                for entry in table.iter().map_err(map_err!(Read))? {
                    let (key, _) = entry.map_err(map_err!(Read))?;
                    if let Some(seq) = sequence_for(key.value(), monitor) {
                        keys.push((key.value().to_string(), seq));
                    }
                }
                keys
            };

            let next_seq = existing.last().map_or(0, |(_, seq)| seq + 1);
            let key = sample_key(monitor, next_seq);
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;

            let excess = (existing.len() + 1).saturating_sub(self.max_samples);
            for (old_key, _) in existing.iter().take(excess) {
                table.remove(old_key.as_str()).map_err(map_err!(Write))?;
            }
            pruned = excess;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%monitor, pruned, "metrics sample stored");
        Ok(())
    }

    /// Retained samples for one monitor, oldest first.
    pub fn list_samples(&self, monitor: &MonitorId) -> StateResult<Vec<TriggerMetrics>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(SAMPLES).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            if sequence_for(key.value(), monitor).is_some() {
                let sample: TriggerMetrics =
                    serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
                results.push(sample);
            }
        }
        Ok(results)
    }

    /// Retained samples for a set of monitors in one read transaction.
    ///
    /// Every requested monitor is present in the result.
    pub fn read_samples(
        &self,
        monitors: &[MonitorId],
    ) -> StateResult<HashMap<MonitorId, Vec<TriggerMetrics>>> {
        let mut results: HashMap<MonitorId, Vec<TriggerMetrics>> = monitors
            .iter()
            .map(|id| (id.clone(), Vec::new()))
            .collect();

        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(SAMPLES).map_err(map_err!(Table))?;
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            let Some((id, _)) = split_key(key.value()) else {
                continue;
            };
            if let Some(samples) = results.get_mut(&MonitorId::new(id)) {
                let sample: TriggerMetrics =
                    serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
                samples.push(sample);
            }
        }
        Ok(results)
    }

    /// Take and persist one sample per monitor.
    ///
    /// Monitors are sampled independently: a failing monitor is logged and
    /// skipped, and the failures are reported together once every other
    /// monitor's sample has been committed. Unrecoverable errors abort
    /// immediately.
    pub async fn sample_monitors(&self, monitors: &[Arc<dyn ScaleMonitor>]) -> ScaleResult<()> {
        let mut failed: Vec<String> = Vec::new();

        for monitor in monitors {
            let id = monitor.id();
            let result = match monitor.get_metrics().await {
                Ok(sample) => self.append_sample(id, &sample).map_err(ScaleError::from),
                Err(e) => Err(e),
            };

            match result {
                Ok(()) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(monitor = %id, error = %e, "failed to sample monitor");
                    failed.push(id.to_string());
                }
            }
        }

        if failed.is_empty() {
            debug!(monitors = monitors.len(), "metrics sampled");
            Ok(())
        } else {
            Err(ScaleError::Store(format!(
                "failed to sample {} of {} monitors: {}",
                failed.len(),
                monitors.len(),
                failed.join(", ")
            )))
        }
    }
}

impl MetricsRepository for MetricsStore {
    fn sample<'a>(&'a self, monitors: &'a [Arc<dyn ScaleMonitor>]) -> BoxFuture<'a, ScaleResult<()>> {
        Box::pin(self.sample_monitors(monitors))
    }

    fn read<'a>(
        &'a self,
        monitors: &'a [Arc<dyn ScaleMonitor>],
    ) -> BoxFuture<'a, ScaleResult<HashMap<MonitorId, Vec<TriggerMetrics>>>> {
        Box::pin(async move {
            let ids: Vec<MonitorId> = monitors.iter().map(|m| m.id().clone()).collect();
            Ok(self.read_samples(&ids)?)
        })
    }
}

fn sample_key(monitor: &MonitorId, seq: u64) -> String {
    format!("{monitor}:{seq:020}")
}

/// Split `{monitor_id}:{sequence}` on the last separator.
fn split_key(key: &str) -> Option<(&str, u64)> {
    let (id, seq) = key.rsplit_once(':')?;
    Some((id, seq.parse().ok()?))
}

/// Sequence number of `key` if it belongs to `monitor`.
fn sequence_for(key: &str, monitor: &MonitorId) -> Option<u64> {
    match split_key(key) {
        Some((id, seq)) if id == monitor.as_str() => Some(seq),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use warpscale_core::{ScaleMonitorDescriptor, ScaleStatus, ScaleStatusContext, ScaleVote};

    /// Monitor whose gauge increments on every sample.
    struct CountingMonitor {
        descriptor: ScaleMonitorDescriptor,
        calls: AtomicU32,
        fail: bool,
    }

    impl CountingMonitor {
        fn new(id: &str, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                descriptor: ScaleMonitorDescriptor::new(id, "queue"),
                calls: AtomicU32::new(0),
                fail,
            })
        }
    }

    impl ScaleMonitor for CountingMonitor {
        fn descriptor(&self) -> &ScaleMonitorDescriptor {
            &self.descriptor
        }

        fn get_metrics(&self) -> BoxFuture<'_, ScaleResult<TriggerMetrics>> {
            Box::pin(async move {
                let n = self.calls.fetch_add(1, Ordering::SeqCst);
                if self.fail {
                    return Err(ScaleError::monitor(self.id(), "queue unreachable"));
                }
                Ok(TriggerMetrics::single("queue_length", n as f64))
            })
        }

        fn get_scale_status(&self, _context: &ScaleStatusContext) -> ScaleResult<ScaleStatus> {
            Ok(ScaleVote::None.into())
        }
    }

    fn gauge(samples: &[TriggerMetrics]) -> Vec<f64> {
        samples.iter().filter_map(|s| s.get("queue_length")).collect()
    }

    #[test]
    fn append_and_list_in_order() {
        let store = MetricsStore::open_in_memory().unwrap();
        let id = MonitorId::new("orders");

        for n in [3.0, 1.0, 2.0] {
            store.append_sample(&id, &TriggerMetrics::single("queue_length", n)).unwrap();
        }

        assert_eq!(gauge(&store.list_samples(&id).unwrap()), vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn retention_keeps_newest() {
        let store = MetricsStore::open_in_memory().unwrap().with_max_samples(3);
        let id = MonitorId::new("orders");

        for n in 0..10 {
            store.append_sample(&id, &TriggerMetrics::single("queue_length", n as f64)).unwrap();
        }

        assert_eq!(gauge(&store.list_samples(&id).unwrap()), vec![7.0, 8.0, 9.0]);
    }

    #[test]
    fn prefix_does_not_leak_between_monitors() {
        let store = MetricsStore::open_in_memory().unwrap();
        let short = MonitorId::new("a");
        let nested = MonitorId::new("a:b");

        store.append_sample(&short, &TriggerMetrics::single("queue_length", 1.0)).unwrap();
        store.append_sample(&nested, &TriggerMetrics::single("queue_length", 2.0)).unwrap();

        assert_eq!(gauge(&store.list_samples(&short).unwrap()), vec![1.0]);
        assert_eq!(gauge(&store.list_samples(&nested).unwrap()), vec![2.0]);
    }

    #[test]
    fn read_includes_monitors_without_samples() {
        let store = MetricsStore::open_in_memory().unwrap();
        let a = MonitorId::new("a");
        let b = MonitorId::new("b");
        store.append_sample(&a, &TriggerMetrics::single("queue_length", 5.0)).unwrap();

        let map = store.read_samples(&[a.clone(), b.clone()]).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(gauge(&map[&a]), vec![5.0]);
        assert!(map[&b].is_empty());
    }

    #[tokio::test]
    async fn sample_persists_one_per_monitor() {
        let store = MetricsStore::open_in_memory().unwrap();
        let monitors: Vec<Arc<dyn ScaleMonitor>> =
            vec![CountingMonitor::new("a", false), CountingMonitor::new("b", false)];

        store.sample(&monitors).await.unwrap();
        store.sample(&monitors).await.unwrap();

        let map = store.read(&monitors).await.unwrap();
        assert_eq!(gauge(&map[&MonitorId::new("a")]), vec![0.0, 1.0]);
        assert_eq!(gauge(&map[&MonitorId::new("b")]), vec![0.0, 1.0]);
    }

    #[tokio::test]
    async fn partial_failure_keeps_successful_samples() {
        let store = MetricsStore::open_in_memory().unwrap();
        let monitors: Vec<Arc<dyn ScaleMonitor>> =
            vec![CountingMonitor::new("good", false), CountingMonitor::new("bad", true)];

        let err = store.sample(&monitors).await.unwrap_err();
        assert!(matches!(&err, ScaleError::Store(msg) if msg.contains("bad")));
        assert!(!err.is_fatal());

        assert_eq!(store.list_samples(&MonitorId::new("good")).unwrap().len(), 1);
        assert!(store.list_samples(&MonitorId::new("bad")).unwrap().is_empty());
    }

    #[tokio::test]
    async fn sample_with_no_monitors_is_noop() {
        let store = MetricsStore::open_in_memory().unwrap();
        store.sample(&[]).await.unwrap();
        assert!(store.read(&[]).await.unwrap().is_empty());
    }

    #[test]
    fn persistence_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("metrics.redb");
        let id = MonitorId::new("orders");

        {
            let store = MetricsStore::open(&db_path).unwrap();
            store.append_sample(&id, &TriggerMetrics::single("queue_length", 42.0)).unwrap();
        }

        let store = MetricsStore::open(&db_path).unwrap();
        assert_eq!(gauge(&store.list_samples(&id).unwrap()), vec![42.0]);
    }

    #[test]
    fn key_helpers() {
        let id = MonitorId::new("a:b");
        let key = sample_key(&id, 7);
        assert_eq!(key, "a:b:00000000000000000007");
        assert_eq!(split_key(&key), Some(("a:b", 7)));
        assert_eq!(sequence_for(&key, &MonitorId::new("a")), None);
        assert_eq!(split_key("garbage"), None);
    }
}
