//! redb table definitions for the metrics store.

use redb::TableDefinition;

/// Metrics samples keyed by `{monitor_id}:{sequence:020}`.
pub const SAMPLES: TableDefinition<&str, &[u8]> = TableDefinition::new("samples");
