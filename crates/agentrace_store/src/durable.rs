//! Durable state store on redb.
//!
//! Every record is JSON-encoded under its textual identifier. Checkpoint
//! state bytes live in their own table so the canonical bytes are stored
//! untouched. Checkpoint identifiers begin with the trace id, which makes
//! per-trace checkpoint listings a prefix range scan.
//!
//! redb is synchronous, so each call runs on the blocking pool.

use crate::error::{StoreError, StoreResult};
use crate::store::{StateStore, StoredCheckpoint, sort_checkpoints, sort_replays, sort_spans};
use agentrace_core::{
    AgentId, AgentRecord, CheckpointId, CheckpointRecord, ReplayId, ReplayRecord, SpanId,
    SpanRecord, TraceId,
};
use async_trait::async_trait;
use chrono::Utc;
use redb::{Database, ReadableTable, TableDefinition};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

type Table = TableDefinition<'static, &'static str, &'static [u8]>;

const SPANS: Table = TableDefinition::new("spans");
const AGENTS: Table = TableDefinition::new("agents");
const CHECKPOINTS: Table = TableDefinition::new("checkpoints");
const CHECKPOINT_STATE: Table = TableDefinition::new("checkpoint_state");
const REPLAYS: Table = TableDefinition::new("replays");

const ALL_TABLES: [Table; 5] = [SPANS, AGENTS, CHECKPOINTS, CHECKPOINT_STATE, REPLAYS];

/// Store backed by a single redb database file
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Open or create the database at `path`
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be opened or the tables created
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let db = Database::create(path)?;
        let txn = db.begin_write()?;
        for table in ALL_TABLES {
            txn.open_table(table)?;
        }
        txn.commit()?;
        debug!(path = %path.display(), "opened redb store");
        Ok(Self { db: Arc::new(db) })
    }

    async fn blocking<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> StoreResult<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || f(&db)).await?
    }
}

fn put_json<T: Serialize>(db: &Database, table: Table, key: &str, value: &T) -> StoreResult<()> {
    let bytes = serde_json::to_vec(value)?;
    let txn = db.begin_write()?;
    {
        let mut t = txn.open_table(table)?;
        t.insert(key, bytes.as_slice())?;
    }
    txn.commit()?;
    Ok(())
}

fn get_json<T: DeserializeOwned>(db: &Database, table: Table, key: &str) -> StoreResult<Option<T>> {
    let txn = db.begin_read()?;
    let t = txn.open_table(table)?;
    match t.get(key)? {
        Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
        None => Ok(None),
    }
}

fn scan_json<T, F>(db: &Database, table: Table, keep: F) -> StoreResult<Vec<T>>
where
    T: DeserializeOwned,
    F: Fn(&T) -> bool,
{
    let txn = db.begin_read()?;
    let t = txn.open_table(table)?;
    let mut out = Vec::new();
    for entry in t.iter()? {
        let (_, value) = entry?;
        let record: T = serde_json::from_slice(value.value())?;
        if keep(&record) {
            out.push(record);
        }
    }
    Ok(out)
}

/// Keys of `table` whose decoded record satisfies `matches`
fn matching_keys<T, F>(
    t: &impl ReadableTable<&'static str, &'static [u8]>,
    matches: F,
) -> StoreResult<Vec<String>>
where
    T: DeserializeOwned,
    F: Fn(&T) -> bool,
{
    let mut keys = Vec::new();
    for entry in t.iter()? {
        let (key, value) = entry?;
        let record: T = serde_json::from_slice(value.value())?;
        if matches(&record) {
            keys.push(key.value().to_string());
        }
    }
    Ok(keys)
}

fn checkpoint_prefix(trace_id: TraceId) -> String {
    format!("{trace_id}:")
}

#[async_trait]
impl StateStore for RedbStore {
    async fn put_span(&self, span: SpanRecord) -> StoreResult<()> {
        self.blocking(move |db| put_json(db, SPANS, &span.span_id.to_string(), &span))
            .await
    }

    async fn put_agent(&self, agent: AgentRecord) -> StoreResult<()> {
        self.blocking(move |db| put_json(db, AGENTS, &agent.agent_id.to_string(), &agent))
            .await
    }

    async fn get_span(&self, span_id: SpanId) -> StoreResult<Option<SpanRecord>> {
        self.blocking(move |db| get_json(db, SPANS, &span_id.to_string()))
            .await
    }

    async fn list_spans(&self, trace_id: TraceId) -> StoreResult<Vec<SpanRecord>> {
        let mut spans = self
            .blocking(move |db| scan_json(db, SPANS, |s: &SpanRecord| s.trace_id == trace_id))
            .await?;
        sort_spans(&mut spans);
        Ok(spans)
    }

    async fn get_agent(&self, agent_id: AgentId) -> StoreResult<Option<AgentRecord>> {
        self.blocking(move |db| get_json(db, AGENTS, &agent_id.to_string()))
            .await
    }

    async fn insert_checkpoint(
        &self,
        record: CheckpointRecord,
        state: Vec<u8>,
    ) -> StoreResult<bool> {
        self.blocking(move |db| {
            let key = record.checkpoint_id.to_string();
            let meta = serde_json::to_vec(&record)?;
            let txn = db.begin_write()?;
            {
                let mut checkpoints = txn.open_table(CHECKPOINTS)?;
                let exists = checkpoints.get(key.as_str())?.is_some();
                if exists {
                    return Ok(false);
                }
                checkpoints.insert(key.as_str(), meta.as_slice())?;
                let mut blobs = txn.open_table(CHECKPOINT_STATE)?;
                blobs.insert(key.as_str(), state.as_slice())?;
            }
            txn.commit()?;
            Ok(true)
        })
        .await
    }

    async fn get_checkpoint(&self, id: &CheckpointId) -> StoreResult<Option<StoredCheckpoint>> {
        let key = id.to_string();
        self.blocking(move |db| {
            let txn = db.begin_read()?;
            let checkpoints = txn.open_table(CHECKPOINTS)?;
            let Some(meta) = checkpoints.get(key.as_str())? else {
                return Ok(None);
            };
            let record: CheckpointRecord = serde_json::from_slice(meta.value())
                .map_err(|e| StoreError::corrupted(&key, format!("unreadable metadata: {e}")))?;
            let blobs = txn.open_table(CHECKPOINT_STATE)?;
            let Some(state) = blobs.get(key.as_str())? else {
                return Err(StoreError::corrupted(&key, "missing state blob"));
            };
            Ok(Some(StoredCheckpoint {
                record,
                state: state.value().to_vec(),
            }))
        })
        .await
    }

    async fn list_checkpoints(&self, trace_id: TraceId) -> StoreResult<Vec<CheckpointRecord>> {
        let mut records = self
            .blocking(move |db| {
                let prefix = checkpoint_prefix(trace_id);
                let txn = db.begin_read()?;
                let checkpoints = txn.open_table(CHECKPOINTS)?;
                let mut out = Vec::new();
                for entry in checkpoints.range(prefix.as_str()..)? {
                    let (key, value) = entry?;
                    if !key.value().starts_with(&prefix) {
                        break;
                    }
                    out.push(serde_json::from_slice::<CheckpointRecord>(value.value())?);
                }
                Ok(out)
            })
            .await?;
        sort_checkpoints(&mut records);
        Ok(records)
    }

    async fn delete_checkpoint(&self, id: &CheckpointId) -> StoreResult<usize> {
        let key = id.to_string();
        self.blocking(move |db| {
            let txn = db.begin_write()?;
            let removed = {
                let mut checkpoints = txn.open_table(CHECKPOINTS)?;
                let removed = checkpoints.remove(key.as_str())?.is_some();
                let mut blobs = txn.open_table(CHECKPOINT_STATE)?;
                blobs.remove(key.as_str())?;
                removed
            };
            txn.commit()?;
            Ok(usize::from(removed))
        })
        .await
    }

    async fn insert_replay(&self, record: ReplayRecord) -> StoreResult<()> {
        self.blocking(move |db| {
            put_json(db, REPLAYS, &record.result.replay_id.to_string(), &record)
        })
        .await
    }

    async fn get_replay(&self, id: ReplayId) -> StoreResult<Option<ReplayRecord>> {
        self.blocking(move |db| get_json(db, REPLAYS, &id.to_string()))
            .await
    }

    async fn list_replays(&self, trace_id: TraceId) -> StoreResult<Vec<ReplayRecord>> {
        let mut records = self
            .blocking(move |db| scan_json(db, REPLAYS, |r: &ReplayRecord| r.trace_id == trace_id))
            .await?;
        sort_replays(&mut records);
        Ok(records)
    }

    async fn increment_replay_stats(&self, id: &CheckpointId) -> StoreResult<()> {
        let key = id.to_string();
        self.blocking(move |db| {
            let txn = db.begin_write()?;
            {
                let mut checkpoints = txn.open_table(CHECKPOINTS)?;
                let current = checkpoints
                    .get(key.as_str())?
                    .map(|guard| serde_json::from_slice::<CheckpointRecord>(guard.value()))
                    .transpose()?;
                let Some(mut record) = current else {
                    return Err(StoreError::not_found("checkpoint", &key));
                };
                record.replay_count += 1;
                record.last_replayed = Some(Utc::now());
                let bytes = serde_json::to_vec(&record)?;
                checkpoints.insert(key.as_str(), bytes.as_slice())?;
            }
            txn.commit()?;
            Ok(())
        })
        .await
    }

    async fn delete_trace(&self, trace_id: TraceId) -> StoreResult<usize> {
        self.blocking(move |db| {
            let prefix = checkpoint_prefix(trace_id);
            let txn = db.begin_write()?;
            let mut removed = 0;
            {
                let mut spans = txn.open_table(SPANS)?;
                for key in matching_keys(&spans, |s: &SpanRecord| s.trace_id == trace_id)? {
                    spans.remove(key.as_str())?;
                    removed += 1;
                }

                let mut agents = txn.open_table(AGENTS)?;
                for key in matching_keys(&agents, |a: &AgentRecord| a.trace_id == trace_id)? {
                    agents.remove(key.as_str())?;
                    removed += 1;
                }

                let mut replays = txn.open_table(REPLAYS)?;
                for key in matching_keys(&replays, |r: &ReplayRecord| r.trace_id == trace_id)? {
                    replays.remove(key.as_str())?;
                    removed += 1;
                }

                let mut checkpoints = txn.open_table(CHECKPOINTS)?;
                let mut blobs = txn.open_table(CHECKPOINT_STATE)?;
                let mut keys = Vec::new();
                for entry in checkpoints.range(prefix.as_str()..)? {
                    let (key, _) = entry?;
                    if !key.value().starts_with(&prefix) {
                        break;
                    }
                    keys.push(key.value().to_string());
                }
                for key in keys {
                    checkpoints.remove(key.as_str())?;
                    blobs.remove(key.as_str())?;
                    removed += 1;
                }
            }
            txn.commit()?;
            debug!(%trace_id, removed, "deleted trace");
            Ok(removed)
        })
        .await
    }
}
