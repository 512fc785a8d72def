//! Persistent flat exact-KNN vector store with a payload index.
//!
//! Mirrors a FAISS-flat-index-plus-sidecar-JSON layout: two sibling files per
//! collection, `<collection>.index` (binary, vectors) and
//! `<collection>.payload.json` (JSON, `{id: payload}`). Every mutating call
//! flushes both files before returning; writes go to a temp file in the same
//! directory and are renamed into place so a crash never leaves a torn file.

use std::collections::HashMap;
use std::fs::File;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{MemoryError, Result};
use crate::types::{MemoryType, RecordPayload};

/// Similarity metric a collection is configured with at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Metric {
    /// Inner product. Cosine-like when callers supply unit-normalised vectors.
    Ip,
    /// Negative Euclidean distance (higher is closer, matching `Ip`'s sense).
    L2,
}

fn score(metric: Metric, a: &[f32], b: &[f32]) -> f32 {
    match metric {
        Metric::Ip => a.iter().zip(b).map(|(x, y)| x * y).sum(),
        Metric::L2 => {
            let sq: f32 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum();
            -sq.sqrt()
        }
    }
}

/// A predicate applied to the payload index, after the KNN scan.
#[derive(Debug, Clone, Default)]
pub struct Filters {
    /// Restrict to one user's records. `None` matches every user (used by
    /// maintenance paths only; ordinary callers always set this).
    pub user_id: Option<String>,
    /// Exclude records of this memory type (the reconciler excludes
    /// `Procedural` from its candidate set; see the design notes on why).
    pub exclude_memory_type: Option<MemoryType>,
}

impl Filters {
    /// The common case: every query is scoped to exactly one user.
    #[must_use]
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            exclude_memory_type: None,
        }
    }

    fn matches(&self, payload: &RecordPayload) -> bool {
        if let Some(user_id) = &self.user_id
            && payload.user_id != *user_id
        {
            return false;
        }
        if let Some(excluded) = self.exclude_memory_type
            && payload.memory_type == excluded
        {
            return false;
        }
        true
    }
}

struct Row {
    id: String,
    vector: Vec<f32>,
    seq: u64,
}

struct State {
    rows: Vec<Row>,
    id_to_index: HashMap<String, usize>,
    payloads: HashMap<String, RecordPayload>,
    next_seq: u64,
}

impl State {
    fn empty() -> Self {
        Self {
            rows: Vec::new(),
            id_to_index: HashMap::new(),
            payloads: HashMap::new(),
            next_seq: 0,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct PersistedRow {
    id: String,
    vector: Vec<f32>,
    seq: u64,
}

#[derive(Serialize, Deserialize)]
struct PersistedIndex {
    dimension: usize,
    metric: Metric,
    rows: Vec<PersistedRow>,
}

/// A persistent, exact-KNN, single collection of vectors + payloads.
pub struct VectorStore {
    dimension: usize,
    metric: Metric,
    index_path: PathBuf,
    payload_path: PathBuf,
    state: RwLock<State>,
}

impl std::fmt::Debug for VectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("VectorStore")
            .field("dimension", &self.dimension)
            .field("metric", &self.metric)
            .field("len", &state.rows.len())
            .finish_non_exhaustive()
    }
}

impl VectorStore {
    /// Opens (or creates) a collection at `root/<collection_name>.{index,payload.json}`.
    ///
    /// On corruption of either file this logs a warning and starts empty —
    /// it never fails construction.
    #[must_use]
    pub fn open(root: &Path, collection_name: &str, dimension: usize, metric: Metric) -> Self {
        let index_path = root.join(format!("{collection_name}.index"));
        let payload_path = root.join(format!("{collection_name}.payload.json"));
        let state = Self::try_load(&index_path, &payload_path, dimension).unwrap_or_else(|err| {
            tracing::warn!(error = %err, collection = collection_name, "vector store corrupt, starting empty");
            State::empty()
        });

        Self {
            dimension,
            metric,
            index_path,
            payload_path,
            state: RwLock::new(state),
        }
    }

    fn try_load(index_path: &Path, payload_path: &Path, dimension: usize) -> anyhow::Result<State> {
        if !index_path.exists() && !payload_path.exists() {
            return Ok(State::empty());
        }

        let index_bytes = std::fs::read(index_path)?;
        let persisted: PersistedIndex = if index_bytes.is_empty() {
            PersistedIndex {
                dimension,
                metric: Metric::Ip,
                rows: Vec::new(),
            }
        } else {
            bincode::serde::decode_from_slice(&index_bytes, bincode::config::standard())?.0
        };

        let payload_bytes = std::fs::read(payload_path)?;
        let payloads: HashMap<String, RecordPayload> = if payload_bytes.is_empty() {
            HashMap::new()
        } else {
            serde_json::from_slice(&payload_bytes)?
        };

        let mut id_to_index = HashMap::with_capacity(persisted.rows.len());
        let mut next_seq = 0;
        let rows = persisted
            .rows
            .into_iter()
            .enumerate()
            .map(|(idx, row)| {
                id_to_index.insert(row.id.clone(), idx);
                next_seq = next_seq.max(row.seq + 1);
                Row {
                    id: row.id,
                    vector: row.vector,
                    seq: row.seq,
                }
            })
            .collect();

        Ok(State {
            rows,
            id_to_index,
            payloads,
            next_seq,
        })
    }

    fn persist(&self, state: &State) -> Result<()> {
        let persisted = PersistedIndex {
            dimension: self.dimension,
            metric: self.metric,
            rows: state
                .rows
                .iter()
                .map(|r| PersistedRow {
                    id: r.id.clone(),
                    vector: r.vector.clone(),
                    seq: r.seq,
                })
                .collect(),
        };
        let index_bytes = bincode::serde::encode_to_vec(&persisted, bincode::config::standard())
            .map_err(|e| MemoryError::StoreIo(std::io::Error::other(e)))?;
        write_atomic(&self.index_path, &index_bytes)?;

        let payload_bytes = serde_json::to_vec(&state.payloads)
            .map_err(|e| MemoryError::StoreIo(std::io::Error::other(e)))?;
        write_atomic(&self.payload_path, &payload_bytes)?;

        Ok(())
    }

    /// Embedding dimension this collection was opened with.
    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    /// Atomically appends `n` rows (`ids.len() == vectors.len() == payloads.len()`).
    pub fn insert(&self, ids: Vec<String>, vectors: Vec<Vec<f32>>, payloads: Vec<RecordPayload>) -> Result<()> {
        let mut state = self.state.write();
        for ((id, vector), payload) in ids.into_iter().zip(vectors).zip(payloads) {
            let seq = state.next_seq;
            state.next_seq += 1;
            let idx = state.rows.len();
            state.id_to_index.insert(id.clone(), idx);
            state.payloads.insert(id.clone(), payload);
            state.rows.push(Row { id, vector, seq });
        }
        self.persist(&state)
    }

    /// Exact KNN over every row, truncated to `k`, with the payload filter
    /// applied only afterward — a caller may get fewer than `k` hits back;
    /// truncation never backfills from rows a filtered-out hit displaced.
    #[must_use]
    pub fn search(&self, vector: &[f32], k: usize, filters: &Filters) -> Vec<(String, f32, RecordPayload)> {
        let state = self.state.read();
        if k == 0 || vector.len() != self.dimension {
            return Vec::new();
        }

        let mut scored: Vec<(f32, u64, &Row)> = state
            .rows
            .iter()
            .map(|row| (score(self.metric, vector, &row.vector), row.seq, row))
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
        scored.truncate(k);

        scored
            .into_iter()
            .filter_map(|(s, _, row)| {
                state
                    .payloads
                    .get(&row.id)
                    .filter(|p| filters.matches(p))
                    .cloned()
                    .map(|payload| (row.id.clone(), s, payload))
            })
            .collect()
    }

    /// Replaces the vector and/or payload of an existing row. Returns `false`
    /// if `id` is unknown.
    pub fn update(&self, id: &str, vector: Option<Vec<f32>>, payload: Option<RecordPayload>) -> Result<bool> {
        let mut state = self.state.write();
        let Some(&idx) = state.id_to_index.get(id) else {
            return Ok(false);
        };
        if let Some(vector) = vector {
            state.rows[idx].vector = vector;
        }
        if let Some(payload) = payload {
            state.payloads.insert(id.to_string(), payload);
        }
        self.persist(&state)?;
        Ok(true)
    }

    /// Removes a row. Returns `false` if `id` is unknown.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let mut state = self.state.write();
        let Some(&idx) = state.id_to_index.get(id) else {
            return Ok(false);
        };

        let removed = state.rows.swap_remove(idx);
        state.id_to_index.remove(&removed.id);
        state.payloads.remove(&removed.id);
        if idx < state.rows.len() {
            let swapped_id = state.rows[idx].id.clone();
            state.id_to_index.insert(swapped_id, idx);
        }

        self.persist(&state)?;
        Ok(true)
    }

    /// Looks up a row's payload by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<RecordPayload> {
        self.state.read().payloads.get(id).cloned()
    }

    /// A payload scan matching `filters`, optionally capped at `limit` rows.
    #[must_use]
    pub fn list(&self, filters: &Filters, limit: Option<usize>) -> Vec<(String, RecordPayload)> {
        let state = self.state.read();
        let mut out: Vec<(String, RecordPayload)> = state
            .payloads
            .iter()
            .filter(|(_, payload)| filters.matches(payload))
            .map(|(id, payload)| (id.clone(), payload.clone()))
            .collect();
        if let Some(limit) = limit {
            out.truncate(limit);
        }
        out
    }

    /// Drops all rows, recreates an empty index, and persists it.
    pub fn reset(&self) -> Result<()> {
        let mut state = self.state.write();
        *state = State::empty();
        self.persist(&state)
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| MemoryError::StoreIo(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RecordPayload;
    use time::OffsetDateTime;

    fn payload(user_id: &str) -> RecordPayload {
        RecordPayload {
            data: "some fact".into(),
            hash: "deadbeef".into(),
            user_id: user_id.into(),
            created_at: OffsetDateTime::now_utc(),
            updated_at: None,
            memory_type: MemoryType::Semantic,
            metadata: Default::default(),
        }
    }

    #[test]
    fn insert_then_search_returns_hit() {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorStore::open(dir.path(), "mem", 3, Metric::Ip);

        store
            .insert(
                vec!["a".into()],
                vec![vec![1.0, 0.0, 0.0]],
                vec![payload("u1")],
            )
            .unwrap();

        let hits = store.search(&[1.0, 0.0, 0.0], 5, &Filters::for_user("u1"));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, "a");
    }

    #[test]
    fn search_filters_by_user() {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorStore::open(dir.path(), "mem", 2, Metric::Ip);
        store
            .insert(vec!["a".into()], vec![vec![1.0, 0.0]], vec![payload("u1")])
            .unwrap();

        let hits = store.search(&[1.0, 0.0], 5, &Filters::for_user("u2"));
        assert!(hits.is_empty());
    }

    #[test]
    fn filter_is_applied_after_truncation_with_no_backfill() {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorStore::open(dir.path(), "mem", 1, Metric::Ip);
        // "other" scores higher and takes the only slot at k=1; "u1"'s
        // matching row is truncated away and never backfilled.
        store
            .insert(vec!["other".into()], vec![vec![1.0]], vec![payload("u2")])
            .unwrap();
        store
            .insert(vec!["mine".into()], vec![vec![0.5]], vec![payload("u1")])
            .unwrap();

        let hits = store.search(&[1.0], 1, &Filters::for_user("u1"));
        assert!(hits.is_empty());
    }

    #[test]
    fn fewer_rows_than_k_returns_all() {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorStore::open(dir.path(), "mem", 2, Metric::Ip);
        store
            .insert(vec!["a".into()], vec![vec![1.0, 0.0]], vec![payload("u1")])
            .unwrap();
        let hits = store.search(&[1.0, 0.0], 50, &Filters::for_user("u1"));
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn update_and_delete_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorStore::open(dir.path(), "mem", 2, Metric::Ip);
        store
            .insert(vec!["a".into()], vec![vec![1.0, 0.0]], vec![payload("u1")])
            .unwrap();

        let mut updated = payload("u1");
        updated.data = "changed".into();
        store.update("a", Some(vec![0.0, 1.0]), Some(updated)).unwrap();
        assert_eq!(store.get("a").unwrap().data, "changed");

        assert!(store.delete("a").unwrap());
        assert!(store.get("a").is_none());
        assert!(!store.delete("a").unwrap());
    }

    #[test]
    fn restart_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = VectorStore::open(dir.path(), "mem", 2, Metric::Ip);
            store
                .insert(vec!["a".into()], vec![vec![1.0, 0.0]], vec![payload("u1")])
                .unwrap();
        }
        let reopened = VectorStore::open(dir.path(), "mem", 2, Metric::Ip);
        assert_eq!(reopened.get("a").unwrap().user_id, "u1");
    }

    #[test]
    fn corrupt_index_starts_empty_without_panicking() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("mem.index"), b"not a valid index").unwrap();
        let store = VectorStore::open(dir.path(), "mem", 2, Metric::Ip);
        assert!(store.list(&Filters::default(), None).is_empty());
    }
}
