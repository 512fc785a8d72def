//! Append-only audit trail for long-term memory mutations.
//!
//! Every `ADD`/`UPDATE`/`DELETE` the reconciler executes is appended here
//! before the call returns. This is a best-effort audit log, not the system
//! of record — [`crate::vector_store::VectorStore`] is authoritative for
//! current state, and a write failure here is logged, never propagated to
//! the caller of [`crate::engine::MemoryEngine::add`].

use std::path::Path;

use parking_lot::Mutex;
use redb::{Database, ReadableTable, TableDefinition};

use crate::error::Result;
use crate::types::HistoryEvent;

const EVENTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("history_events");

/// An embedded, append-only log of [`HistoryEvent`]s, one table keyed by
/// `event_id`.
pub struct HistoryLog {
    db: Mutex<Database>,
}

impl HistoryLog {
    /// Opens (or creates) the log at `path`, e.g. `<root>/history.db`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let db = Database::create(path).map_err(|e| std::io::Error::other(e))?;
        Ok(Self { db: Mutex::new(db) })
    }

    /// Appends one event. Synchronous: returns only once the write is
    /// committed.
    pub fn append(&self, event: &HistoryEvent) -> Result<()> {
        let bytes = bincode::serde::encode_to_vec(event, bincode::config::standard())
            .map_err(|e| std::io::Error::other(e))?;

        let db = self.db.lock();
        let txn = db.begin_write().map_err(|e| std::io::Error::other(e))?;
        {
            let mut table = txn.open_table(EVENTS_TABLE).map_err(|e| std::io::Error::other(e))?;
            table
                .insert(event.event_id.as_str(), bytes.as_slice())
                .map_err(|e| std::io::Error::other(e))?;
        }
        txn.commit().map_err(|e| std::io::Error::other(e))?;
        Ok(())
    }

    /// Returns every event for `memory_id`, in no particular order (callers
    /// that need chronological order should sort on `created_at`).
    pub fn events_for(&self, memory_id: &str) -> Result<Vec<HistoryEvent>> {
        let db = self.db.lock();
        let txn = db.begin_read().map_err(|e| std::io::Error::other(e))?;
        let table = match txn.open_table(EVENTS_TABLE) {
            Ok(table) => table,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(std::io::Error::other(e).into()),
        };

        let mut out = Vec::new();
        for entry in table.iter().map_err(|e| std::io::Error::other(e))? {
            let (_, value) = entry.map_err(|e| std::io::Error::other(e))?;
            let (event, _): (HistoryEvent, usize) =
                bincode::serde::decode_from_slice(value.value(), bincode::config::standard())
                    .map_err(|e| std::io::Error::other(e))?;
            if event.memory_id == memory_id {
                out.push(event);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Op;
    use time::OffsetDateTime;

    fn event(memory_id: &str, op: Op) -> HistoryEvent {
        HistoryEvent {
            event_id: uuid::Uuid::new_v4().to_string(),
            memory_id: memory_id.to_string(),
            prev_text: None,
            new_text: Some("a fact".into()),
            op,
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
            is_deleted: matches!(op, Op::Delete),
        }
    }

    #[test]
    fn append_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let log = HistoryLog::open(&dir.path().join("history.db")).unwrap();

        log.append(&event("m1", Op::Add)).unwrap();
        log.append(&event("m1", Op::Update)).unwrap();
        log.append(&event("m2", Op::Add)).unwrap();

        let events = log.events_for("m1").unwrap();
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn unknown_memory_id_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        let log = HistoryLog::open(&dir.path().join("history.db")).unwrap();
        assert!(log.events_for("missing").unwrap().is_empty());
    }

    #[test]
    fn empty_log_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        let log = HistoryLog::open(&dir.path().join("history.db")).unwrap();
        assert!(log.events_for("m1").unwrap().is_empty());
    }
}
