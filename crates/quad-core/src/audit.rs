//! Append-only transition history.
//!
//! # Table design
//!
//! The redb store keeps two tables:
//!
//! ```text
//! FLOWS:   flow id                                  -> number of records
//! RECORDS: [ flow id bytes | 0x00 | seq: u64 BE ]   -> JSON-encoded TransitionRecord
//! ```
//!
//! Flow ids never contain a NUL byte, so every record of a flow lives in the
//! contiguous key range `id ++ 0x00 ++ 0` ..= `id ++ 0x00 ++ u64::MAX`, and the
//! big-endian sequence makes byte order equal append order. A flow is
//! registered in `FLOWS` when it is created, which lets `history` tell a flow
//! with no transitions apart from one that never existed.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use redb::{Database, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};

use crate::adoption::AdoptionZone;
use crate::error::{QuadError, Result};
use crate::types::{FlowState, ParticipationLevel};

// ---------------------------------------------------------------------------
// TransitionRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub flow: String,
    pub from: FlowState,
    pub to: FlowState,
    pub participant: String,
    pub role: String,
    /// Level that authorized the action.
    pub level: ParticipationLevel,
    #[serde(default)]
    pub used_ai: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<AdoptionZone>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub endorsed_by: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// Snapshot of a flow's records taken when `history` was called.
///
/// Cheap to clone; every call to [`iter`](Self::iter) starts again from the
/// first record.
#[derive(Debug, Clone)]
pub struct History {
    records: Arc<[TransitionRecord]>,
}

impl History {
    pub fn iter(&self) -> std::slice::Iter<'_, TransitionRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last(&self) -> Option<&TransitionRecord> {
        self.records.last()
    }
}

impl From<Vec<TransitionRecord>> for History {
    fn from(records: Vec<TransitionRecord>) -> Self {
        Self {
            records: records.into(),
        }
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = &'a TransitionRecord;
    type IntoIter = std::slice::Iter<'a, TransitionRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Serialize for History {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.records.iter())
    }
}

// ---------------------------------------------------------------------------
// AuditLog
// ---------------------------------------------------------------------------

pub trait AuditLog: Send + Sync {
    /// Register a new flow with an empty history. Idempotent.
    fn open_flow(&self, flow: &str) -> Result<()>;

    /// Append one record. Any error here is a storage failure of the write.
    fn append(&self, record: &TransitionRecord) -> Result<()>;

    /// All records of `flow` in append order.
    fn history(&self, flow: &str) -> Result<History>;
}

fn storage<E: std::fmt::Display>(e: E) -> QuadError {
    QuadError::Storage(e.to_string())
}

// ---------------------------------------------------------------------------
// RedbAuditLog
// ---------------------------------------------------------------------------

const FLOWS: TableDefinition<&str, u64> = TableDefinition::new("flows");
const RECORDS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("records");

fn record_key(flow: &str, seq: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(flow.len() + 9);
    key.extend_from_slice(flow.as_bytes());
    key.push(0);
    key.extend_from_slice(&seq.to_be_bytes());
    key
}

pub struct RedbAuditLog {
    db: Database,
}

impl RedbAuditLog {
    /// Open or create the database at `path`, creating both tables.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path).map_err(storage)?;
        let wt = db.begin_write().map_err(storage)?;
        wt.open_table(FLOWS).map_err(storage)?;
        wt.open_table(RECORDS).map_err(storage)?;
        wt.commit().map_err(storage)?;
        Ok(Self { db })
    }
}

impl AuditLog for RedbAuditLog {
    fn open_flow(&self, flow: &str) -> Result<()> {
        let wt = self.db.begin_write().map_err(storage)?;
        {
            let mut flows = wt.open_table(FLOWS).map_err(storage)?;
            let known = flows.get(flow).map_err(storage)?.is_some();
            if !known {
                flows.insert(flow, 0u64).map_err(storage)?;
            }
        }
        wt.commit().map_err(storage)?;
        Ok(())
    }

    fn append(&self, record: &TransitionRecord) -> Result<()> {
        let value = serde_json::to_vec(record).map_err(storage)?;
        let wt = self.db.begin_write().map_err(storage)?;
        {
            let mut flows = wt.open_table(FLOWS).map_err(storage)?;
            let seq = flows
                .get(record.flow.as_str())
                .map_err(storage)?
                .map(|g| g.value())
                .ok_or_else(|| QuadError::UnknownFlow(record.flow.clone()))?;

            let mut records = wt.open_table(RECORDS).map_err(storage)?;
            let key = record_key(&record.flow, seq);
            records
                .insert(key.as_slice(), value.as_slice())
                .map_err(storage)?;
            flows
                .insert(record.flow.as_str(), seq + 1)
                .map_err(storage)?;
        }
        wt.commit().map_err(storage)?;
        Ok(())
    }

    fn history(&self, flow: &str) -> Result<History> {
        let rt = self.db.begin_read().map_err(storage)?;
        let flows = rt.open_table(FLOWS).map_err(storage)?;
        if flows.get(flow).map_err(storage)?.is_none() {
            return Err(QuadError::UnknownFlow(flow.to_string()));
        }

        let records = rt.open_table(RECORDS).map_err(storage)?;
        let lower = record_key(flow, 0);
        let upper = record_key(flow, u64::MAX);
        let mut result = Vec::new();
        for entry in records
            .range(lower.as_slice()..=upper.as_slice())
            .map_err(storage)?
        {
            let (_, v) = entry.map_err(storage)?;
            let record: TransitionRecord = serde_json::from_slice(v.value()).map_err(storage)?;
            result.push(record);
        }
        Ok(History::from(result))
    }
}

// ---------------------------------------------------------------------------
// MemoryAuditLog
// ---------------------------------------------------------------------------

/// In-process log for embedding and tests. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    flows: Mutex<HashMap<String, Vec<TransitionRecord>>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuditLog for MemoryAuditLog {
    fn open_flow(&self, flow: &str) -> Result<()> {
        let mut flows = self.flows.lock().unwrap_or_else(PoisonError::into_inner);
        flows.entry(flow.to_string()).or_default();
        Ok(())
    }

    fn append(&self, record: &TransitionRecord) -> Result<()> {
        let mut flows = self.flows.lock().unwrap_or_else(PoisonError::into_inner);
        let records = flows
            .get_mut(&record.flow)
            .ok_or_else(|| QuadError::UnknownFlow(record.flow.clone()))?;
        records.push(record.clone());
        Ok(())
    }

    fn history(&self, flow: &str) -> Result<History> {
        let flows = self.flows.lock().unwrap_or_else(PoisonError::into_inner);
        flows
            .get(flow)
            .map(|records| History::from(records.clone()))
            .ok_or_else(|| QuadError::UnknownFlow(flow.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
