use thiserror::Error;

use crate::db_types::{BalanceEntry, HistoryEntry, ModeratorReview, NewBalanceEntry, NewHistoryEntry};

#[derive(Debug, Clone, Error)]
pub enum AuditError {
    #[error("Audit database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for AuditError {
    fn from(e: sqlx::Error) -> Self {
        AuditError::DatabaseError(e.to_string())
    }
}

/// The append-only audit trail and balance ledger.
///
/// The engine treats appends as best-effort: a failed audit write is logged and never promoted into
/// the caller's error path. The fetch methods exist for reporting and tests.
#[allow(async_fn_in_trait)]
pub trait AuditManagement {
    async fn append_history(&self, entry: NewHistoryEntry) -> Result<(), AuditError>;

    async fn append_balance_entry(&self, entry: NewBalanceEntry) -> Result<(), AuditError>;

    /// History rows touching the given user (as subject or actor), oldest first.
    async fn fetch_history_for_user(&self, user_id: i64) -> Result<Vec<HistoryEntry>, AuditError>;

    /// History rows for one order, oldest first.
    async fn fetch_history_for_order(&self, order_id: i64) -> Result<Vec<HistoryEntry>, AuditError>;

    /// Balance ledger rows for a seller, oldest first.
    async fn fetch_balance_entries(&self, user_id: i64) -> Result<Vec<BalanceEntry>, AuditError>;

    /// Moderation decisions recorded against a product, oldest first.
    async fn fetch_reviews_for_product(&self, product_id: i64) -> Result<Vec<ModeratorReview>, AuditError>;
}
