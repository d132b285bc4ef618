//! SQLite-backed [`ComplaintStore`] implementation.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::models::Complaint;

use super::{ComplaintStore, StoreError};

/// SQLite implementation of the [`ComplaintStore`] trait.
///
/// Wraps a [`SqlitePool`] and maps each operation onto the `complaints`
/// table. Inserts are synchronous single statements; the primary-key
/// constraint is the duplicate-id backstop.
pub struct SqliteComplaintStore {
    pool: SqlitePool,
}

impl SqliteComplaintStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ComplaintStore for SqliteComplaintStore {
    async fn insert(&self, complaint: &Complaint) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO complaints (complaint_id, name, phone_number, email,
                                    complaint_details, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&complaint.complaint_id)
        .bind(&complaint.name)
        .bind(&complaint.phone_number)
        .bind(&complaint.email)
        .bind(&complaint.complaint_details)
        .bind(&complaint.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::DuplicateId(complaint.complaint_id.clone())
            }
            _ => StoreError::Other(e.into()),
        })?;

        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Complaint, StoreError> {
        let row = sqlx::query(
            "SELECT complaint_id, name, phone_number, email, complaint_details, created_at \
             FROM complaints WHERE complaint_id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Other(e.into()))?;

        match row {
            Some(row) => Ok(Complaint {
                complaint_id: row.get("complaint_id"),
                name: row.get("name"),
                phone_number: row.get("phone_number"),
                email: row.get("email"),
                complaint_details: row.get("complaint_details"),
                created_at: row.get("created_at"),
            }),
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }
}
