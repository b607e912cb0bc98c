//! StateStore — redb-backed persistence for pod records.
//!
//! A pod record spans four tables: the pod row, the unique name index, and
//! the two owned collections (ports and environment). Every mutation runs in
//! a single write transaction through [`StateStore::write`], which commits
//! when the operation succeeds and aborts when it fails, so a record and its
//! owned rows are always written or removed together.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable, Table, WriteTransaction};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{StateError, StateResult};
use crate::rows::*;
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Owned-row table type shared by ports and env.
type ChildTable<'txn> = Table<'txn, (i64, u32), &'static [u8]>;

/// Steps of a pod delete, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeleteStep {
    Record,
    NameIndex,
    Ports,
    Env,
}

/// Thread-safe record store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "record store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory store (standalone mode and tests).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory record store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        self.write(|txn| {
            // Opening a table in a write transaction creates it if absent.
            txn.open_table(PODS).map_err(map_err!(Table))?;
            txn.open_table(POD_NAMES).map_err(map_err!(Table))?;
            txn.open_table(POD_PORTS).map_err(map_err!(Table))?;
            txn.open_table(POD_ENVS).map_err(map_err!(Table))?;
            txn.open_table(SEQUENCES).map_err(map_err!(Table))?;
            Ok(())
        })
    }

    /// Run `op` in a write transaction: commit on `Ok`, abort on `Err`.
    fn write<T>(&self, op: impl FnOnce(&WriteTransaction) -> StateResult<T>) -> StateResult<T> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        match op(&txn) {
            Ok(value) => {
                txn.commit().map_err(map_err!(Transaction))?;
                Ok(value)
            }
            Err(e) => {
                if let Err(abort) = txn.abort() {
                    warn!(error = %abort, "transaction abort failed");
                }
                Err(e)
            }
        }
    }

    // ── Pods ───────────────────────────────────────────────────────

    /// Persist a new pod record with its ports and env. Returns the assigned id.
    ///
    /// The record's own `id` is ignored. Fails with `Conflict` if a record
    /// with the same name exists.
    pub fn create_pod(&self, record: &PodRecord) -> StateResult<PodId> {
        let id = self.write(|txn| {
            let mut names = txn.open_table(POD_NAMES).map_err(map_err!(Table))?;
            if names
                .get(record.name.as_str())
                .map_err(map_err!(Read))?
                .is_some()
            {
                return Err(StateError::Conflict(format!(
                    "pod name {} already in use",
                    record.name
                )));
            }
            let id = next_id(txn)?;
            names
                .insert(record.name.as_str(), id)
                .map_err(map_err!(Write))?;
            put_pod_rows(txn, id, record)?;
            Ok(id)
        })?;
        debug!(id, name = %record.name, "pod record created");
        Ok(id)
    }

    /// Get a pod record by id, with its ports and env loaded.
    pub fn get_pod(&self, id: PodId) -> StateResult<PodRecord> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let pods = txn.open_table(PODS).map_err(map_err!(Table))?;
        let row: PodRow = match pods.get(id).map_err(map_err!(Read))? {
            Some(guard) => serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?,
            None => return Err(StateError::NotFound(format!("pod {id}"))),
        };
        let ports: Vec<PortRow> =
            read_children(&txn.open_table(POD_PORTS).map_err(map_err!(Table))?, id)?;
        let env: Vec<EnvRow> =
            read_children(&txn.open_table(POD_ENVS).map_err(map_err!(Table))?, id)?;
        Ok(row.into_record(ports, env))
    }

    /// Id of the record holding `name`, if any.
    pub fn find_pod_id(&self, name: &str) -> StateResult<Option<PodId>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let names = txn.open_table(POD_NAMES).map_err(map_err!(Table))?;
        Ok(names.get(name).map_err(map_err!(Read))?.map(|guard| guard.value()))
    }

    /// List all pod records in id order.
    ///
    /// Owned collections are not loaded: `ports` and `env` are empty on
    /// every returned record. Use [`StateStore::get_pod`] for the full record.
    pub fn list_pods(&self) -> StateResult<Vec<PodRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let pods = txn.open_table(PODS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in pods.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let row: PodRow =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(row.into_record(Vec::new(), Vec::new()));
        }
        Ok(results)
    }

    /// Replace a stored pod record, including both owned collections.
    ///
    /// Fails with `NotFound` if `record.id` is not stored and with
    /// `Immutable` if the name differs from the stored one.
    pub fn update_pod(&self, record: &PodRecord) -> StateResult<()> {
        let id = record.id;
        self.write(|txn| {
            let stored: PodRow = {
                let pods = txn.open_table(PODS).map_err(map_err!(Table))?;
                match pods.get(id).map_err(map_err!(Read))? {
                    Some(guard) => {
                        serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?
                    }
                    None => return Err(StateError::NotFound(format!("pod {id}"))),
                }
            };
            if stored.name != record.name {
                return Err(StateError::Immutable(format!(
                    "pod {id} is named {}, cannot rename to {}",
                    stored.name, record.name
                )));
            }
            remove_children(&mut txn.open_table(POD_PORTS).map_err(map_err!(Table))?, id)?;
            remove_children(&mut txn.open_table(POD_ENVS).map_err(map_err!(Table))?, id)?;
            put_pod_rows(txn, id, record)
        })?;
        debug!(id, name = %record.name, "pod record updated");
        Ok(())
    }

    /// Delete a pod record together with its name index entry, ports and env.
    ///
    /// All four removals happen in one transaction; if any of them fails
    /// nothing is removed.
    pub fn delete_pod(&self, id: PodId) -> StateResult<()> {
        self.delete_pod_with(id, |_| Ok(()))
    }

    /// [`StateStore::delete_pod`] with `before_step` invoked ahead of each
    /// removal. An error from the hook aborts the delete like a storage error.
    pub(crate) fn delete_pod_with(
        &self,
        id: PodId,
        mut before_step: impl FnMut(DeleteStep) -> StateResult<()>,
    ) -> StateResult<()> {
        let (name, ports, env) = self.write(|txn| {
            before_step(DeleteStep::Record)?;
            let row: PodRow = {
                let mut pods = txn.open_table(PODS).map_err(map_err!(Table))?;
                let removed = pods.remove(id).map_err(map_err!(Write))?;
                match removed {
                    Some(guard) => {
                        serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?
                    }
                    None => return Err(StateError::NotFound(format!("pod {id}"))),
                }
            };

            before_step(DeleteStep::NameIndex)?;
            txn.open_table(POD_NAMES)
                .map_err(map_err!(Table))?
                .remove(row.name.as_str())
                .map_err(map_err!(Write))?;

            before_step(DeleteStep::Ports)?;
            let ports =
                remove_children(&mut txn.open_table(POD_PORTS).map_err(map_err!(Table))?, id)?;

            before_step(DeleteStep::Env)?;
            let env =
                remove_children(&mut txn.open_table(POD_ENVS).map_err(map_err!(Table))?, id)?;

            Ok((row.name, ports, env))
        })?;
        debug!(id, %name, ports, env, "pod record deleted");
        Ok(())
    }
}

/// Allocate the next pod id from the sequence table.
fn next_id(txn: &WriteTransaction) -> StateResult<PodId> {
    let mut seq = txn.open_table(SEQUENCES).map_err(map_err!(Table))?;
    let last = seq
        .get(POD_SEQUENCE)
        .map_err(map_err!(Read))?
        .map(|guard| guard.value())
        .unwrap_or(0);
    let id = last + 1;
    seq.insert(POD_SEQUENCE, id).map_err(map_err!(Write))?;
    Ok(id)
}

/// Write the pod row and its owned rows under `id`.
fn put_pod_rows(txn: &WriteTransaction, id: PodId, record: &PodRecord) -> StateResult<()> {
    let row = PodRow::from_record(id, record);
    let value = serde_json::to_vec(&row).map_err(map_err!(Serialize))?;
    txn.open_table(PODS)
        .map_err(map_err!(Table))?
        .insert(id, value.as_slice())
        .map_err(map_err!(Write))?;

    let ports: Vec<PortRow> = record
        .ports
        .iter()
        .map(|binding| PortRow::from_binding(id, binding))
        .collect();
    insert_children(&mut txn.open_table(POD_PORTS).map_err(map_err!(Table))?, id, &ports)?;

    let env: Vec<EnvRow> = record
        .env
        .iter()
        .map(|binding| EnvRow::from_binding(id, binding))
        .collect();
    insert_children(&mut txn.open_table(POD_ENVS).map_err(map_err!(Table))?, id, &env)
}

fn insert_children<T: Serialize>(
    table: &mut ChildTable<'_>,
    pod_id: PodId,
    rows: &[T],
) -> StateResult<()> {
    for (position, row) in rows.iter().enumerate() {
        let value = serde_json::to_vec(row).map_err(map_err!(Serialize))?;
        table
            .insert((pod_id, position as u32), value.as_slice())
            .map_err(map_err!(Write))?;
    }
    Ok(())
}

fn read_children<T, R>(table: &R, pod_id: PodId) -> StateResult<Vec<T>>
where
    T: DeserializeOwned,
    R: ReadableTable<(i64, u32), &'static [u8]>,
{
    let mut rows = Vec::new();
    for entry in table
        .range((pod_id, 0)..=(pod_id, u32::MAX))
        .map_err(map_err!(Read))?
    {
        let (_, value) = entry.map_err(map_err!(Read))?;
        rows.push(serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?);
    }
    Ok(rows)
}

/// Remove every owned row of `pod_id`. Returns the number removed.
fn remove_children(table: &mut ChildTable<'_>, pod_id: PodId) -> StateResult<u32> {
    // Collect keys first; the range borrows the table.
    let keys: Vec<(i64, u32)> = table
        .range((pod_id, 0)..=(pod_id, u32::MAX))
        .map_err(map_err!(Read))?
        .map(|entry| entry.map(|(key, _)| key.value()))
        .collect::<Result<_, _>>()
        .map_err(map_err!(Read))?;
    for key in &keys {
        table.remove(key).map_err(map_err!(Write))?;
    }
    Ok(keys.len() as u32)
}
