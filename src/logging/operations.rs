//! Correlated operation records (start / progress / end keyed by an identifier).

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use uuid::Uuid;

use super::{Level, Logger};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationRecord {
    pub id: String,
    pub kind: String,
    pub target: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub status: Option<String>,
    pub bytes: u64,
    pub percentage: Option<f64>,
}

impl OperationRecord {
    /// Whole seconds between start and end (or now, while still running).
    pub fn duration_secs(&self) -> i64 {
        let end = self.ended_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_seconds().max(0)
    }
}

/// Active records plus the ids that have already ended.
#[derive(Debug, Default)]
pub(super) struct OperationBook {
    active: HashMap<String, OperationRecord>,
    finished: HashSet<String>,
}

impl OperationBook {
    fn in_use(&self, id: &str) -> bool {
        self.active.contains_key(id) || self.finished.contains(id)
    }
}

impl Logger {
    /// Begin an operation and return its identifier.
    ///
    /// A caller-supplied id is used as-is unless it is already active or has ended,
    /// in which case a fresh UUID is allocated and a warning logged.
    pub fn operation_start(&self, kind: &str, target: &str, id: Option<&str>) -> String {
        let now = Utc::now();
        let (id, rejected) = {
            let mut book = match self.operations.lock() {
                Ok(book) => book,
                Err(poisoned) => poisoned.into_inner(),
            };
            let (id, rejected) = match id {
                Some(requested) if book.in_use(requested) => {
                    (Uuid::new_v4().to_string(), Some(requested.to_string()))
                }
                Some(requested) => (requested.to_string(), None),
                None => (Uuid::new_v4().to_string(), None),
            };
            book.active.insert(
                id.clone(),
                OperationRecord {
                    id: id.clone(),
                    kind: kind.to_string(),
                    target: target.to_string(),
                    started_at: now,
                    ended_at: None,
                    status: None,
                    bytes: 0,
                    percentage: None,
                },
            );
            (id, rejected)
        };

        if let Some(requested) = rejected {
            self.warn(format!(
                "operation id {requested} already used, allocated {id} instead"
            ));
        }

        let mut fields = BTreeMap::new();
        fields.insert("operation_id".to_string(), id.clone());
        fields.insert("operation".to_string(), kind.to_string());
        fields.insert("target".to_string(), target.to_string());
        fields.insert("status".to_string(), "started".to_string());
        self.emit_json(Level::Info, "operation started", fields);
        id
    }

    /// Record progress for an active operation. Returns false for unknown ids.
    pub fn operation_progress(&self, id: &str, bytes: u64, percentage: Option<f64>) -> bool {
        let record = {
            let mut book = match self.operations.lock() {
                Ok(book) => book,
                Err(poisoned) => poisoned.into_inner(),
            };
            match book.active.get_mut(id) {
                Some(record) => {
                    record.bytes = bytes;
                    record.percentage = percentage;
                    Some(record.clone())
                }
                None => None,
            }
        };

        let Some(record) = record else {
            self.warn(format!("progress for unknown operation {id}"));
            return false;
        };

        let mut fields = base_fields(&record);
        fields.insert("bytes".to_string(), record.bytes.to_string());
        if let Some(pct) = record.percentage {
            fields.insert("percentage".to_string(), format!("{pct:.1}"));
        }
        self.emit_json(Level::Info, "operation progress", fields);
        true
    }

    /// Close an operation and return its final record. The id cannot be reused.
    pub fn operation_end(
        &self,
        id: &str,
        status: &str,
        bytes: Option<u64>,
    ) -> Option<OperationRecord> {
        let record = {
            let mut book = match self.operations.lock() {
                Ok(book) => book,
                Err(poisoned) => poisoned.into_inner(),
            };
            let record = book.active.remove(id).map(|mut record| {
                record.ended_at = Some(Utc::now());
                record.status = Some(status.to_string());
                if let Some(bytes) = bytes {
                    record.bytes = bytes;
                }
                record
            });
            if record.is_some() {
                book.finished.insert(id.to_string());
            }
            record
        };

        let Some(record) = record else {
            self.warn(format!("end for unknown or finished operation {id}"));
            return None;
        };

        let mut fields = base_fields(&record);
        fields.insert("status".to_string(), status.to_string());
        fields.insert("duration".to_string(), record.duration_secs().to_string());
        fields.insert("bytes".to_string(), record.bytes.to_string());
        self.emit_json(Level::Info, "operation finished", fields);
        Some(record)
    }

    /// Snapshot of an operation that has not ended yet.
    pub fn active_operation(&self, id: &str) -> Option<OperationRecord> {
        self.operations
            .lock()
            .ok()
            .and_then(|book| book.active.get(id).cloned())
    }
}

fn base_fields(record: &OperationRecord) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();
    fields.insert("operation_id".to_string(), record.id.clone());
    fields.insert("operation".to_string(), record.kind.clone());
    fields.insert("target".to_string(), record.target.clone());
    fields
}
