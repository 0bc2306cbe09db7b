//! Request-scoped transactions that cannot commit without an audit entry.
//!
//! # Usage
//!
//! ```ignore
//! use coreops_db::AuditedTransaction;
//!
//! let mut tx = AuditedTransaction::begin(&db, &request_id).await?;
//! projects::ActiveModel { .. }.insert(tx.transaction()).await?;
//! tx.audit(entry).await?;
//! tx.commit().await?;
//! ```

use coreops_core::audit::NewAuditEntry;
use coreops_shared::types::AuditLogId;
use sea_orm::{DatabaseConnection, DatabaseTransaction, DbErr, TransactionTrait};

use crate::audit::{AuditError, AuditWriter};

/// One database transaction per mutating request, paired with its audit trail.
///
/// Dropping the value without calling [`AuditedTransaction::commit`] rolls
/// the transaction back.
pub struct AuditedTransaction {
    txn: DatabaseTransaction,
    request_id: String,
    audited: usize,
}

impl std::fmt::Debug for AuditedTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditedTransaction")
            .field("request_id", &self.request_id)
            .field("audited", &self.audited)
            .finish_non_exhaustive()
    }
}

impl AuditedTransaction {
    /// Begins a transaction for the request identified by `request_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction cannot be started.
    pub async fn begin(
        db: &DatabaseConnection,
        request_id: impl Into<String>,
    ) -> Result<Self, DbErr> {
        let txn = db.begin().await?;
        Ok(Self {
            txn,
            request_id: request_id.into(),
            audited: 0,
        })
    }

    /// The underlying transaction, for the business writes.
    #[must_use]
    pub fn transaction(&self) -> &DatabaseTransaction {
        &self.txn
    }

    /// Request this transaction belongs to.
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Number of audit entries written so far.
    #[must_use]
    pub const fn audited(&self) -> usize {
        self.audited
    }

    /// Writes `entry` inside this transaction.
    ///
    /// # Errors
    ///
    /// Returns `RequestIdMismatch` if the entry belongs to another request,
    /// or any error from [`AuditWriter::write`].
    pub async fn audit(&mut self, entry: NewAuditEntry) -> Result<AuditLogId, AuditError> {
        if entry.request_id != self.request_id {
            return Err(AuditError::RequestIdMismatch {
                entry: entry.request_id,
                transaction: self.request_id.clone(),
            });
        }
        let id = AuditWriter::write(&self.txn, entry).await?;
        self.audited += 1;
        Ok(id)
    }

    /// Commits the business writes together with their audit entries.
    ///
    /// # Errors
    ///
    /// Returns `AuditError::Unaudited` (after rolling back) if nothing was
    /// audited, or a database error if the commit fails.
    pub async fn commit(self) -> Result<(), AuditError> {
        if self.audited == 0 {
            tracing::error!(
                request_id = %self.request_id,
                "rolling back unaudited transaction"
            );
            self.txn.rollback().await?;
            return Err(AuditError::Unaudited);
        }
        self.txn.commit().await?;
        Ok(())
    }

    /// Rolls back the transaction, discarding all changes.
    ///
    /// # Errors
    ///
    /// Returns an error if the rollback fails.
    pub async fn rollback(self) -> Result<(), DbErr> {
        self.txn.rollback().await
    }
}

#[cfg(test)]
#[path = "transaction_tests.rs"]
mod tests;
