//! Core data models used throughout Complaint Desk.
//!
//! These types represent the complaint records that flow between the HTTP
//! API, the record store, and the chat front-ends, plus the knowledge
//! chunks used by the retrieval pipeline.

use serde::{Deserialize, Serialize};

/// A filed complaint as persisted in the record store.
///
/// All fields are immutable after creation; `complaint_id` is the sole
/// lookup key. Field names match the wire format of the HTTP API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Complaint {
    pub complaint_id: String,
    pub name: String,
    pub phone_number: String,
    pub email: String,
    pub complaint_details: String,
    /// UTC creation timestamp, `%Y-%m-%dT%H:%M:%SZ`.
    pub created_at: String,
}

/// Complaint fields supplied by the filer, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewComplaint {
    pub name: String,
    pub phone_number: String,
    pub email: String,
    pub complaint_details: String,
}

/// Acknowledgment returned by a successful create.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAck {
    pub complaint_id: String,
    pub message: String,
}

/// A bounded slice of the knowledge document used as the unit of retrieval.
#[derive(Debug, Clone)]
pub struct KnowledgeChunk {
    pub index: usize,
    pub text: String,
}
