use chrono::{Duration, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

use crate::core::Result;
use crate::modules::installments::models::{
    CancellationReason, InstallmentSchedule, InstallmentStatus, GRACE_PERIOD_DAYS,
};
use crate::modules::installments::repositories::InstallmentStore;
use crate::modules::installments::services::charging_engine::{ChargeResult, ChargingEngine};
use crate::modules::notifications::{NotificationDispatcher, NotificationKind};

/// Per-outcome counts of one `retry_failed_installments` run
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct RetryRunSummary {
    pub processed: usize,
    pub paid: usize,
    pub still_failed: usize,
    pub skipped: usize,
}

/// Per-outcome counts of one `cancel_expired_grace_periods` run
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct CancelRunSummary {
    /// Failed entries whose grace period elapsed
    pub cancelled: usize,
    /// Later scheduled entries cancelled alongside them
    pub cascaded: usize,
}

/// Drives failed entries through the grace window: retries within it,
/// cancellation (with cascade) past it.
pub struct GraceController {
    store: Arc<dyn InstallmentStore>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    engine: Arc<ChargingEngine>,
}

impl GraceController {
    pub fn new(
        store: Arc<dyn InstallmentStore>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        engine: Arc<ChargingEngine>,
    ) -> Self {
        Self {
            store,
            dispatcher,
            engine,
        }
    }

    /// Re-attempt every failed installment still inside its grace window.
    pub async fn retry_failed_installments(&self) -> Result<RetryRunSummary> {
        self.retry_failed_at(Utc::now().naive_utc()).await
    }

    pub async fn retry_failed_at(&self, now: NaiveDateTime) -> Result<RetryRunSummary> {
        let cutoff = now - Duration::days(GRACE_PERIOD_DAYS);
        let failed = self.store.find_failed_since(cutoff).await?;
        info!(count = failed.len(), "Retrying failed installments");

        let mut summary = RetryRunSummary::default();

        for entry in failed {
            let order_reference = entry.order_reference.clone();
            let sequence_number = entry.sequence_number;
            match self.engine.attempt_charge(entry, now, true).await {
                Ok(ChargeResult::Paid) => {
                    summary.processed += 1;
                    summary.paid += 1;
                }
                Ok(ChargeResult::Failed) => {
                    summary.processed += 1;
                    summary.still_failed += 1;
                }
                Ok(ChargeResult::Lost) => summary.skipped += 1,
                Err(e) => {
                    error!(
                        order_reference = order_reference.as_str(),
                        sequence_number = sequence_number,
                        error = %e,
                        "Unexpected error retrying installment"
                    );
                    summary.skipped += 1;
                }
            }
        }

        info!(
            processed = summary.processed,
            paid = summary.paid,
            still_failed = summary.still_failed,
            skipped = summary.skipped,
            "Completed retry run"
        );

        Ok(summary)
    }

    /// Cancel failed installments whose grace period elapsed, cascading to
    /// all later scheduled entries of the same order: an order cannot skip a
    /// failed installment and resume later.
    pub async fn cancel_expired_grace_periods(&self) -> Result<CancelRunSummary> {
        self.cancel_expired_at(Utc::now().naive_utc()).await
    }

    pub async fn cancel_expired_at(&self, now: NaiveDateTime) -> Result<CancelRunSummary> {
        let cutoff = now - Duration::days(GRACE_PERIOD_DAYS);
        let expired = self.store.find_failed_until(cutoff).await?;
        info!(count = expired.len(), "Cancelling expired grace periods");

        let mut summary = CancelRunSummary::default();

        for entry in expired {
            match self.cancel_entry_and_cascade(entry, now, &mut summary).await {
                Ok(()) => {}
                Err(e) => {
                    error!(error = %e, "Unexpected error cancelling installment");
                }
            }
        }

        info!(
            cancelled = summary.cancelled,
            cascaded = summary.cascaded,
            "Completed cancellation run"
        );

        Ok(summary)
    }

    async fn cancel_entry_and_cascade(
        &self,
        entry: InstallmentSchedule,
        now: NaiveDateTime,
        summary: &mut CancelRunSummary,
    ) -> Result<()> {
        let mut cancelled = entry.clone();
        cancelled.mark_cancelled(CancellationReason::GracePeriodExpired, now)?;

        // Guarded write; the row may have been paid by a concurrent retry run
        // between the fetch and this transition.
        if !self
            .store
            .transition(&cancelled, InstallmentStatus::Failed)
            .await?
        {
            return Ok(());
        }
        summary.cancelled += 1;

        self.dispatcher
            .notify(
                &cancelled.order_reference,
                NotificationKind::InstallmentCancelled,
                json!({
                    "sequence_number": cancelled.sequence_number,
                    "amount": cancelled.amount,
                    "currency": cancelled.currency,
                    "reason": CancellationReason::GracePeriodExpired.as_str(),
                }),
            )
            .await;

        let siblings = self.store.find_by_order(&cancelled.order_reference).await?;
        let mut cascade_count = 0usize;

        for sibling in siblings {
            if sibling.sequence_number <= cancelled.sequence_number
                || sibling.status != InstallmentStatus::Scheduled
            {
                continue;
            }

            let mut cascaded = sibling.clone();
            cascaded.mark_cancelled(CancellationReason::PriorInstallmentFailed, now)?;

            if self
                .store
                .transition(&cascaded, InstallmentStatus::Scheduled)
                .await?
            {
                cascade_count += 1;
                self.dispatcher
                    .notify(
                        &cascaded.order_reference,
                        NotificationKind::InstallmentCancelled,
                        json!({
                            "sequence_number": cascaded.sequence_number,
                            "amount": cascaded.amount,
                            "currency": cascaded.currency,
                            "reason": CancellationReason::PriorInstallmentFailed.as_str(),
                        }),
                    )
                    .await;
            }
        }

        summary.cascaded += cascade_count;

        self.dispatcher
            .notify(
                &cancelled.order_reference,
                NotificationKind::ScheduleCancelled,
                json!({
                    "failed_sequence_number": cancelled.sequence_number,
                    "cascaded_count": cascade_count,
                }),
            )
            .await;

        Ok(())
    }
}
