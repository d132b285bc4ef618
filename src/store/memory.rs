//! In-memory [`ComplaintStore`] implementation for testing.
//!
//! Uses a `HashMap` behind `std::sync::RwLock` for thread safety.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::models::Complaint;

use super::{ComplaintStore, StoreError};

/// In-memory store for tests.
#[derive(Default)]
pub struct InMemoryComplaintStore {
    records: RwLock<HashMap<String, Complaint>>,
}

impl InMemoryComplaintStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ComplaintStore for InMemoryComplaintStore {
    async fn insert(&self, complaint: &Complaint) -> Result<(), StoreError> {
        let mut records = self.records.write().unwrap();
        if records.contains_key(&complaint.complaint_id) {
            return Err(StoreError::DuplicateId(complaint.complaint_id.clone()));
        }
        records.insert(complaint.complaint_id.clone(), complaint.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Complaint, StoreError> {
        let records = self.records.read().unwrap();
        records
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}
