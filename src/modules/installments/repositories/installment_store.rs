use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use crate::core::Result;
use crate::modules::installments::models::{InstallmentSchedule, InstallmentStatus};

/// Persistence seam for installment schedules.
///
/// The persisted row is the only shared mutable state in the system, and the
/// only coordination point between overlapping job runs. Implementations must
/// make `claim_attempt` and `transition` atomic compare-and-swap operations
/// so that exactly one run advances a given entry.
#[async_trait]
pub trait InstallmentStore: Send + Sync {
    /// Persist a full schedule in one atomic operation. A partially created
    /// schedule must never become visible.
    async fn create_schedule(&self, entries: &[InstallmentSchedule]) -> Result<()>;

    /// All entries of one order, ordered by sequence number
    async fn find_by_order(&self, order_reference: &str) -> Result<Vec<InstallmentSchedule>>;

    async fn find_entry(
        &self,
        order_reference: &str,
        sequence_number: i32,
    ) -> Result<Option<InstallmentSchedule>>;

    /// Scheduled entries with `due_date <= today`, ordered by order reference
    /// and sequence number so earlier installments are attempted first
    async fn find_due(&self, today: NaiveDate) -> Result<Vec<InstallmentSchedule>>;

    /// Failed entries whose first failure is more recent than `cutoff`
    async fn find_failed_since(&self, cutoff: NaiveDateTime) -> Result<Vec<InstallmentSchedule>>;

    /// Failed entries whose first failure is at or before `cutoff`
    async fn find_failed_until(&self, cutoff: NaiveDateTime) -> Result<Vec<InstallmentSchedule>>;

    /// Atomically increment `attempt_count` if the entry still has the
    /// expected status and attempt count. Returns false when another run got
    /// there first, in which case the caller must not charge.
    async fn claim_attempt(
        &self,
        id: &str,
        expected_status: InstallmentStatus,
        expected_attempts: i32,
    ) -> Result<bool>;

    /// Write back an entry owned by the current run (after a won claim)
    async fn update(&self, entry: &InstallmentSchedule) -> Result<()>;

    /// Guarded status write: persists the entry only if the stored row still
    /// has `expected_status`. Returns false when the row moved on.
    async fn transition(
        &self,
        entry: &InstallmentSchedule,
        expected_status: InstallmentStatus,
    ) -> Result<bool>;
}
