//! Request ledger — which request id booked which engine, for what.
//!
//! Purely in-memory; a record lives from booking until release or cancel.
//! Request ids come from a monotonically increasing counter, so an id is
//! never reused for the coordinator's lifetime.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use mlgrid_core::{Endpoint, RequestId};

/// One booked request: the action it was booked for and the engine
/// reserved for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRecord {
    pub request_id: RequestId,
    pub action: String,
    pub endpoint: Endpoint,
}

#[derive(Debug, Default)]
pub struct RequestLedger {
    next_id: AtomicU64,
    records: Mutex<HashMap<RequestId, RequestRecord>>,
}

impl RequestLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh request id and store its record. Never fails.
    pub fn register(&self, action: &str, endpoint: Endpoint) -> RequestId {
        let request_id = RequestId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let record = RequestRecord {
            request_id,
            action: action.to_string(),
            endpoint,
        };
        self.records.lock().unwrap().insert(request_id, record);
        request_id
    }

    pub fn get(&self, request_id: RequestId) -> Option<RequestRecord> {
        self.records.lock().unwrap().get(&request_id).cloned()
    }

    /// Delete and return the record, if present.
    pub fn remove(&self, request_id: RequestId) -> Option<RequestRecord> {
        self.records.lock().unwrap().remove(&request_id)
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of all live records, for the admin surface.
    pub fn snapshot(&self) -> Vec<RequestRecord> {
        let mut records: Vec<_> = self.records.lock().unwrap().values().cloned().collect();
        records.sort_by_key(|record| record.request_id);
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_monotone() {
        let ledger = RequestLedger::new();
        let a = ledger.register("forecast", Endpoint::new("h", 1));
        let b = ledger.register("predict", Endpoint::new("h", 2));
        assert!(b > a);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn get_returns_the_stored_record() {
        let ledger = RequestLedger::new();
        let endpoint = Endpoint::new("127.0.0.1", 6766);
        let id = ledger.register("decision-tree-start", endpoint.clone());

        let record = ledger.get(id).unwrap();
        assert_eq!(record.request_id, id);
        assert_eq!(record.action, "decision-tree-start");
        assert_eq!(record.endpoint, endpoint);
    }

    #[test]
    fn remove_deletes_exactly_once() {
        let ledger = RequestLedger::new();
        let id = ledger.register("forecast", Endpoint::new("h", 1));

        assert!(ledger.remove(id).is_some());
        assert!(ledger.remove(id).is_none());
        assert!(ledger.get(id).is_none());
        assert!(ledger.is_empty());
    }

    #[test]
    fn snapshot_is_ordered_by_id() {
        let ledger = RequestLedger::new();
        let a = ledger.register("one", Endpoint::new("h", 1));
        let b = ledger.register("two", Endpoint::new("h", 2));

        let snapshot = ledger.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].request_id, a);
        assert_eq!(snapshot[1].request_id, b);
    }
}
