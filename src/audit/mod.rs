//! Request log
//!
//! Narrow append/query collaborator written by the trigger layer after
//! each request. The core pipeline never touches this; agents stay
//! stateless across requests.

use crate::error::FailureKind;
use crate::models::Request;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Terminal outcome of one handled request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RequestOutcome {
    Answered,
    Failed { kind: FailureKind },
}

/// One appended entry. The query text itself is not stored, only its
/// hash, so the log never becomes a second copy of user input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestRecord {
    pub audit_id: Uuid,
    pub requester_id: String,
    pub conversation_id: String,
    pub request_hash: String,
    pub outcome: RequestOutcome,
    pub created_at: DateTime<Utc>,
}

impl RequestRecord {
    pub fn for_request(request: &Request, outcome: RequestOutcome) -> Self {
        Self {
            audit_id: Uuid::new_v4(),
            requester_id: request.requester_id.clone(),
            conversation_id: request.conversation_id.clone(),
            request_hash: compute_request_hash(request),
            outcome,
            created_at: Utc::now(),
        }
    }
}

/// In-memory append/query log.
pub struct RequestLog {
    records: Arc<RwLock<HashMap<Uuid, RequestRecord>>>,
}

impl RequestLog {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Append a record, returning its audit id.
    pub async fn append(&self, record: RequestRecord) -> Uuid {
        let audit_id = record.audit_id;
        let mut records = self.records.write().await;
        records.insert(audit_id, record);
        audit_id
    }

    pub async fn get(&self, audit_id: Uuid) -> Option<RequestRecord> {
        let records = self.records.read().await;
        records.get(&audit_id).cloned()
    }

    /// All audit ids for a requester, oldest first.
    pub async fn list_for_requester(&self, requester_id: &str) -> Vec<Uuid> {
        let records = self.records.read().await;

        let mut items: Vec<_> = records
            .iter()
            .filter(|(_, record)| record.requester_id == requester_id)
            .map(|(id, record)| (*id, record.created_at))
            .collect();

        items.sort_by_key(|(_, created_at)| *created_at);

        items.into_iter().map(|(id, _)| id).collect()
    }

    /// Re-hash a request against a stored record.
    pub async fn verify_integrity(&self, audit_id: Uuid, request: &Request) -> bool {
        let records = self.records.read().await;

        match records.get(&audit_id) {
            Some(record) => compute_request_hash(request) == record.request_hash,
            None => false,
        }
    }
}

impl Default for RequestLog {
    fn default() -> Self {
        Self::new()
    }
}

/// SHA256 of the serialized request, streamed straight into the hasher.
pub fn compute_request_hash(request: &Request) -> String {
    let mut hasher = Sha256::new();

    if serde_json::to_writer(&mut HashWriter(&mut hasher), request).is_err() {
        return String::new();
    }

    hex::encode(hasher.finalize())
}

/// Adapter to allow writing into Sha256 via std::io::Write
struct HashWriter<'a, H: Digest>(&'a mut H);

impl<'a, H: Digest> Write for HashWriter<'a, H> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
