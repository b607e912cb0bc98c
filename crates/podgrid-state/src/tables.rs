//! redb table definitions for the podgrid record store.
//!
//! Records and their owned rows use JSON-serialized `&[u8]` values. Owned
//! port/env rows are keyed by `(pod_id, position)` so a record's collection
//! is a contiguous range and keeps its insertion order.

use redb::TableDefinition;

/// Pod rows keyed by pod id.
pub const PODS: TableDefinition<i64, &[u8]> = TableDefinition::new("pods");

/// Unique name index: pod name → pod id.
pub const POD_NAMES: TableDefinition<&str, i64> = TableDefinition::new("pod_names");

/// Port bindings keyed by `(pod_id, position)`.
pub const POD_PORTS: TableDefinition<(i64, u32), &[u8]> = TableDefinition::new("pod_ports");

/// Environment bindings keyed by `(pod_id, position)`.
pub const POD_ENVS: TableDefinition<(i64, u32), &[u8]> = TableDefinition::new("pod_envs");

/// Id sequences keyed by the table they allocate for.
pub const SEQUENCES: TableDefinition<&str, i64> = TableDefinition::new("sequences");

/// Sequence name used for pod ids.
pub const POD_SEQUENCE: &str = "pods";
