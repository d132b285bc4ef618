//! Complaint creation and lookup.
//!
//! Validates filer input, assigns identifiers and timestamps, and talks
//! to the record store. Storage failures are logged in full here and
//! surfaced to callers only as a generic internal error; the public
//! contract never leaks storage details.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

use crate::controller::{ComplaintsGateway, GatewayError};
use crate::models::{Complaint, CreateAck, NewComplaint};
use crate::store::{ComplaintStore, StoreError};

/// Digits only, 10 to 12 of them.
static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{10,12}$").unwrap());

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").unwrap());

/// Attempts at regenerating an id after a duplicate-key rejection.
const MAX_ID_ATTEMPTS: u32 = 3;

pub const CREATED_MESSAGE: &str = "Complaint created successfully";

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },
    #[error("complaint not found: {0}")]
    NotFound(String),
    /// Store or unexpected failure. The cause is logged server-side;
    /// callers only see a generic message.
    #[error("internal service error")]
    Internal(#[source] anyhow::Error),
}

pub struct ComplaintService {
    store: Arc<dyn ComplaintStore>,
}

impl ComplaintService {
    pub fn new(store: Arc<dyn ComplaintStore>) -> Self {
        Self { store }
    }

    /// Validate, assign id and timestamp, and persist a complaint.
    ///
    /// On a duplicate-id rejection the id is regenerated, up to
    /// [`MAX_ID_ATTEMPTS`] times; the store's unique constraint remains
    /// the authoritative backstop.
    pub async fn create(&self, new: &NewComplaint) -> Result<CreateAck, ServiceError> {
        validate(new)?;

        let created_at = Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();

        for attempt in 1..=MAX_ID_ATTEMPTS {
            let complaint = Complaint {
                complaint_id: generate_id(),
                name: new.name.clone(),
                phone_number: new.phone_number.clone(),
                email: new.email.clone(),
                complaint_details: new.complaint_details.clone(),
                created_at: created_at.clone(),
            };

            match self.store.insert(&complaint).await {
                Ok(()) => {
                    return Ok(CreateAck {
                        complaint_id: complaint.complaint_id,
                        message: CREATED_MESSAGE.to_string(),
                    })
                }
                Err(StoreError::DuplicateId(id)) => {
                    warn!(%id, attempt, "complaint id collision, regenerating");
                    continue;
                }
                Err(e) => {
                    error!(error = %e, "complaint insert failed");
                    return Err(ServiceError::Internal(e.into()));
                }
            }
        }

        error!("complaint id generation exhausted after {MAX_ID_ATTEMPTS} attempts");
        Err(ServiceError::Internal(anyhow::anyhow!(
            "id generation exhausted"
        )))
    }

    /// Fetch a complaint by id.
    ///
    /// Ids are stored uppercase and compared case-insensitively: the
    /// argument is uppercased before the store lookup.
    pub async fn get(&self, id: &str) -> Result<Complaint, ServiceError> {
        let id = id.trim().to_uppercase();
        match self.store.get(&id).await {
            Ok(c) => Ok(c),
            Err(StoreError::NotFound(_)) => Err(ServiceError::NotFound(id)),
            Err(e) => {
                error!(error = %e, "complaint lookup failed");
                Err(ServiceError::Internal(e.into()))
            }
        }
    }
}

/// In-process gateway: the server's chat endpoint drives the service
/// directly, without a network hop.
#[async_trait]
impl ComplaintsGateway for ComplaintService {
    async fn create(&self, new: &NewComplaint) -> Result<CreateAck, GatewayError> {
        ComplaintService::create(self, new).await.map_err(|e| match e {
            ServiceError::Validation { field, message } => GatewayError::Validation {
                field: field.to_string(),
                message,
            },
            ServiceError::NotFound(_) => GatewayError::NotFound,
            ServiceError::Internal(_) => GatewayError::Failed("internal service error".to_string()),
        })
    }

    async fn fetch(&self, id: &str) -> Result<Complaint, GatewayError> {
        ComplaintService::get(self, id).await.map_err(|e| match e {
            ServiceError::NotFound(_) => GatewayError::NotFound,
            other => GatewayError::Failed(other.to_string()),
        })
    }
}

fn validate(new: &NewComplaint) -> Result<(), ServiceError> {
    if !PHONE_RE.is_match(&new.phone_number) {
        return Err(ServiceError::Validation {
            field: "phone_number",
            message: "must be 10 to 12 digits".to_string(),
        });
    }
    if !EMAIL_RE.is_match(&new.email) {
        return Err(ServiceError::Validation {
            field: "email",
            message: "must be a well-formed email address".to_string(),
        });
    }
    Ok(())
}

/// Short human-readable identifier: the first 8 hex chars of a v4 UUID,
/// uppercased. Collisions are improbable at this volume; the store's
/// duplicate rejection is the backstop.
fn generate_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryComplaintStore;
    use chrono::NaiveDateTime;

    fn service() -> ComplaintService {
        ComplaintService::new(Arc::new(InMemoryComplaintStore::new()))
    }

    fn valid_input() -> NewComplaint {
        NewComplaint {
            name: "Jane Doe".to_string(),
            phone_number: "5551234567".to_string(),
            email: "jane@example.com".to_string(),
            complaint_details: "broken widget".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_then_get_roundtrip() {
        let svc = service();
        let before = Utc::now().naive_utc() - chrono::Duration::seconds(1);

        let ack = svc.create(&valid_input()).await.unwrap();
        assert_eq!(ack.message, CREATED_MESSAGE);
        assert_eq!(ack.complaint_id.len(), 8);

        let got = svc.get(&ack.complaint_id).await.unwrap();
        assert_eq!(got.name, "Jane Doe");
        assert_eq!(got.phone_number, "5551234567");
        assert_eq!(got.email, "jane@example.com");
        assert_eq!(got.complaint_details, "broken widget");

        let created =
            NaiveDateTime::parse_from_str(&got.created_at, "%Y-%m-%dT%H:%M:%SZ").unwrap();
        assert!(created >= before);
    }

    #[tokio::test]
    async fn test_lookup_is_case_insensitive() {
        let svc = service();
        let ack = svc.create(&valid_input()).await.unwrap();

        let got = svc.get(&ack.complaint_id.to_lowercase()).await.unwrap();
        assert_eq!(got.complaint_id, ack.complaint_id);
    }

    #[tokio::test]
    async fn test_phone_validation() {
        let svc = service();
        for phone in ["555123456", "5551234567890", "555123456a", "555-1234567", ""] {
            let mut input = valid_input();
            input.phone_number = phone.to_string();
            let err = svc.create(&input).await.unwrap_err();
            assert!(
                matches!(err, ServiceError::Validation { field, .. } if field == "phone_number"),
                "phone {:?} should be rejected",
                phone
            );
        }
        // Boundary lengths all pass.
        for phone in ["5551234567", "55512345678", "555123456789"] {
            let mut input = valid_input();
            input.phone_number = phone.to_string();
            svc.create(&input).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_email_validation() {
        let svc = service();
        for email in ["not-an-email", "jane@", "@example.com", "jane@example", ""] {
            let mut input = valid_input();
            input.email = email.to_string();
            let err = svc.create(&input).await.unwrap_err();
            assert!(
                matches!(err, ServiceError::Validation { field, .. } if field == "email"),
                "email {:?} should be rejected",
                email
            );
        }
    }

    #[tokio::test]
    async fn test_invalid_input_persists_nothing() {
        let store = Arc::new(InMemoryComplaintStore::new());
        let svc = ComplaintService::new(store.clone());

        let mut input = valid_input();
        input.phone_number = "abc".to_string();
        svc.create(&input).await.unwrap_err();

        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_get_unknown_id() {
        let svc = service();
        let err = svc.get("FFFFFFFF").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_identical_inputs_get_distinct_ids() {
        let svc = service();
        let a = svc.create(&valid_input()).await.unwrap();
        let b = svc.create(&valid_input()).await.unwrap();
        assert_ne!(a.complaint_id, b.complaint_id);
    }

    #[test]
    fn test_generated_ids_are_uppercase_alphanumeric() {
        for _ in 0..100 {
            let id = generate_id();
            assert_eq!(id.len(), 8);
            assert!(id
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        }
    }
}
