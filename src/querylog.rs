//! Query logging for offline relevance analysis.
//!
//! Every executed query produces one log entry, written synchronously at
//! query time. Entries are immutable once written, with one exception: click
//! tracking appends result ids after the fact, since user interaction happens
//! after results are shown. Click recording is best-effort: an unknown or
//! already-evicted entry id is a silent no-op, and nothing in this module is
//! allowed to fail a search call (the engine contains any error here).
//!
//! Retention is a bounded in-memory window: when the capacity is exceeded the
//! oldest entry is evicted. Long-term retention and purge policy belong to an
//! external analytics pipeline, which can drain entries via [`QueryLog::recent`].

use std::collections::VecDeque;

use ahash::AHashMap;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::content::ContentKey;
use crate::error::{Result, TesseraError};
use crate::filter::FieldFilter;

/// Which entry point served a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    /// Keyword-only search.
    Lexical,
    /// Vector-only search.
    Semantic,
    /// Fused search.
    Hybrid,
    /// Item-to-item recommendation.
    Similar,
}

/// Opaque identifier of a query-log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogEntryId(Uuid);

impl LogEntryId {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for LogEntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The facts recorded about one executed query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRecord {
    /// The member who issued the query, if not anonymous.
    pub issued_by: Option<String>,
    /// The query text (empty for pure vector queries).
    pub query_text: String,
    /// Which entry point served the query.
    pub kind: QueryKind,
    /// The filters the caller applied.
    pub applied_filters: Vec<FieldFilter>,
    /// How many results were returned.
    pub result_count: usize,
    /// The top result and its score, if any result was returned.
    pub top_result: Option<(ContentKey, f32)>,
    /// Wall-clock query latency in milliseconds.
    pub latency_ms: u64,
}

/// One persisted query-log row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryLogEntry {
    /// The entry's id, returned to the caller for click tracking.
    pub id: LogEntryId,
    /// When the query executed.
    pub recorded_at: DateTime<Utc>,
    /// The recorded query facts.
    #[serde(flatten)]
    pub record: QueryRecord,
    /// Result ids the user clicked, appended after the fact.
    pub clicked: Vec<String>,
}

#[derive(Debug, Default)]
struct LogInner {
    entries: AHashMap<LogEntryId, QueryLogEntry>,
    order: VecDeque<LogEntryId>,
}

#[derive(Debug)]
struct LogSink {
    storage: std::sync::Arc<dyn crate::storage::Storage>,
    blob: String,
}

/// The bounded in-memory query log, with an optional append-only sink.
#[derive(Debug)]
pub struct QueryLog {
    capacity: usize,
    inner: Mutex<LogInner>,
    sink: Option<LogSink>,
}

impl QueryLog {
    /// Create a log retaining at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(LogInner::default()),
            sink: None,
        }
    }

    /// Persist every recorded query as one JSON line appended to `blob`.
    ///
    /// The sink captures entries as issued; click enrichment happens on the
    /// in-memory window only and is drained through [`recent`](Self::recent)
    /// by the analytics pipeline.
    pub fn attach_sink<S: Into<String>>(
        &mut self,
        storage: std::sync::Arc<dyn crate::storage::Storage>,
        blob: S,
    ) {
        self.sink = Some(LogSink {
            storage,
            blob: blob.into(),
        });
    }

    /// Record one executed query, returning the entry id for click tracking.
    pub fn record_query(&self, record: QueryRecord) -> Result<LogEntryId> {
        if self.capacity == 0 {
            return Err(TesseraError::logging("query log capacity is zero"));
        }

        let entry = QueryLogEntry {
            id: LogEntryId::generate(),
            recorded_at: Utc::now(),
            record,
            clicked: Vec::new(),
        };
        let id = entry.id;

        if let Some(sink) = &self.sink {
            let mut line = serde_json::to_string(&entry)
                .map_err(|e| TesseraError::logging(format!("encode log entry: {e}")))?;
            line.push('\n');
            sink.storage
                .append(&sink.blob, line.as_bytes())
                .map_err(|e| TesseraError::logging(format!("append log entry: {e}")))?;
        }

        let mut inner = self.inner.lock();
        if inner.order.len() >= self.capacity
            && let Some(oldest) = inner.order.pop_front()
        {
            inner.entries.remove(&oldest);
        }
        inner.order.push_back(id);
        inner.entries.insert(id, entry);
        Ok(id)
    }

    /// Append a clicked result to an entry.
    ///
    /// A no-op if the entry does not exist or has been evicted; click
    /// tracking is best-effort and must never surface an error to the caller.
    pub fn record_click<S: Into<String>>(&self, id: LogEntryId, clicked_content_id: S) {
        let mut inner = self.inner.lock();
        if let Some(entry) = inner.entries.get_mut(&id) {
            entry.clicked.push(clicked_content_id.into());
        }
    }

    /// Fetch a copy of one entry.
    pub fn get(&self, id: LogEntryId) -> Option<QueryLogEntry> {
        self.inner.lock().entries.get(&id).cloned()
    }

    /// The retained entries, oldest first.
    pub fn recent(&self) -> Vec<QueryLogEntry> {
        let inner = self.inner.lock();
        inner
            .order
            .iter()
            .filter_map(|id| inner.entries.get(id).cloned())
            .collect()
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.inner.lock().order.len()
    }

    /// True when nothing has been recorded (or everything was evicted).
    pub fn is_empty(&self) -> bool {
        self.inner.lock().order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentType;

    fn record(kind: QueryKind, text: &str) -> QueryRecord {
        QueryRecord {
            issued_by: None,
            query_text: text.to_string(),
            kind,
            applied_filters: Vec::new(),
            result_count: 3,
            top_result: Some((ContentKey::new(ContentType::Faq, "f1"), 0.9)),
            latency_ms: 4,
        }
    }

    #[test]
    fn test_record_and_fetch() {
        let log = QueryLog::new(10);
        let id = log.record_query(record(QueryKind::Hybrid, "medicare")).unwrap();

        let entry = log.get(id).unwrap();
        assert_eq!(entry.record.query_text, "medicare");
        assert_eq!(entry.record.result_count, 3);
        assert!(entry.clicked.is_empty());
    }

    #[test]
    fn test_click_appends() {
        let log = QueryLog::new(10);
        let id = log.record_query(record(QueryKind::Lexical, "gala")).unwrap();

        log.record_click(id, "e1");
        log.record_click(id, "e2");
        let entry = log.get(id).unwrap();
        assert_eq!(entry.clicked, vec!["e1", "e2"]);
    }

    #[test]
    fn test_click_on_unknown_id_is_a_noop() {
        let log = QueryLog::new(10);
        // Must not panic or error.
        log.record_click(LogEntryId::generate(), "anything");
        assert!(log.is_empty());
    }

    #[test]
    fn test_retention_evicts_oldest() {
        let log = QueryLog::new(2);
        let first = log.record_query(record(QueryKind::Lexical, "one")).unwrap();
        let second = log.record_query(record(QueryKind::Lexical, "two")).unwrap();
        let third = log.record_query(record(QueryKind::Lexical, "three")).unwrap();

        assert_eq!(log.len(), 2);
        assert!(log.get(first).is_none());
        assert!(log.get(second).is_some());
        assert!(log.get(third).is_some());

        // Clicking the evicted entry stays a no-op.
        log.record_click(first, "x");
    }

    #[test]
    fn test_recent_is_oldest_first() {
        let log = QueryLog::new(10);
        log.record_query(record(QueryKind::Lexical, "one")).unwrap();
        log.record_query(record(QueryKind::Semantic, "two")).unwrap();

        let entries = log.recent();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].record.query_text, "one");
        assert_eq!(entries[1].record.query_text, "two");
    }

    #[test]
    fn test_zero_capacity_errors_on_record() {
        let log = QueryLog::new(0);
        assert!(log.record_query(record(QueryKind::Lexical, "x")).is_err());
    }

    #[test]
    fn test_sink_appends_one_json_line_per_query() {
        use crate::storage::{MemoryStorage, Storage};
        use std::sync::Arc;

        let storage = Arc::new(MemoryStorage::new());
        let mut log = QueryLog::new(10);
        log.attach_sink(storage.clone(), "queries.jsonl");

        log.record_query(record(QueryKind::Hybrid, "one")).unwrap();
        log.record_query(record(QueryKind::Lexical, "two")).unwrap();

        let blob = storage.read("queries.jsonl").unwrap();
        let text = String::from_utf8(blob).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["query_text"], "one");
        assert_eq!(first["kind"], "hybrid");
    }
}
