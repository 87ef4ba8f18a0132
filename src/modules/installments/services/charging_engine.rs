use chrono::{NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::core::{AppError, Result};
use crate::modules::gateway::services::PaymentGateway;
use crate::modules::installments::models::{merchant_reference, InstallmentSchedule};
use crate::modules::installments::repositories::InstallmentStore;
use crate::modules::notifications::{NotificationDispatcher, NotificationKind};

/// Per-outcome counts of one `process_due_installments` run
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct DueRunSummary {
    /// Entries for which a charge was attempted
    pub processed: usize,
    pub paid: usize,
    pub failed: usize,
    /// Entries left alone: blocked by an earlier unresolved installment, or
    /// claimed by a concurrently overlapping run
    pub skipped: usize,
}

/// Outcome of a single charge attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChargeResult {
    Paid,
    Failed,
    /// Another run won the claim; nothing was charged
    Lost,
}

/// Charges due installments against their saved tokens.
///
/// Runs to completion as a batch job under an external periodic trigger. An
/// entry leaves `scheduled` only through the store's compare-and-swap claim,
/// so two overlapping runs never double-charge.
pub struct ChargingEngine {
    store: Arc<dyn InstallmentStore>,
    gateway: Arc<dyn PaymentGateway>,
    dispatcher: Arc<dyn NotificationDispatcher>,
}

impl ChargingEngine {
    pub fn new(
        store: Arc<dyn InstallmentStore>,
        gateway: Arc<dyn PaymentGateway>,
        dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self {
            store,
            gateway,
            dispatcher,
        }
    }

    /// Charge every scheduled installment whose due date has arrived.
    pub async fn process_due_installments(&self) -> Result<DueRunSummary> {
        self.process_due_at(Utc::now().naive_utc()).await
    }

    /// Clock-injected variant backing `process_due_installments`.
    pub async fn process_due_at(&self, now: NaiveDateTime) -> Result<DueRunSummary> {
        let due = self.store.find_due(now.date()).await?;
        info!(count = due.len(), "Processing due installments");

        let mut summary = DueRunSummary::default();

        for entry in due {
            // Charges must happen in sequence order: an order with an earlier
            // entry still pending or still inside its grace window is skipped
            // entirely this cycle.
            match self.prior_entry_unresolved(&entry, now).await {
                Ok(true) => {
                    summary.skipped += 1;
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    error!(
                        order_reference = entry.order_reference.as_str(),
                        sequence_number = entry.sequence_number,
                        error = %e,
                        "Could not resolve order sequencing, skipping entry"
                    );
                    summary.skipped += 1;
                    continue;
                }
            }

            let order_reference = entry.order_reference.clone();
            let sequence_number = entry.sequence_number;
            match self.attempt_charge(entry, now, false).await {
                Ok(ChargeResult::Paid) => {
                    summary.processed += 1;
                    summary.paid += 1;
                }
                Ok(ChargeResult::Failed) => {
                    summary.processed += 1;
                    summary.failed += 1;
                }
                Ok(ChargeResult::Lost) => summary.skipped += 1,
                // One entry's persistence error must not abort the rest of
                // the run; the entry will be picked up again next cycle.
                Err(e) => {
                    error!(
                        order_reference = order_reference.as_str(),
                        sequence_number = sequence_number,
                        error = %e,
                        "Unexpected error processing installment"
                    );
                    summary.skipped += 1;
                }
            }
        }

        info!(
            processed = summary.processed,
            paid = summary.paid,
            failed = summary.failed,
            skipped = summary.skipped,
            "Completed due installment run"
        );

        Ok(summary)
    }

    async fn prior_entry_unresolved(
        &self,
        entry: &InstallmentSchedule,
        now: NaiveDateTime,
    ) -> Result<bool> {
        if entry.sequence_number <= 1 {
            return Ok(false);
        }

        let siblings = self.store.find_by_order(&entry.order_reference).await?;
        Ok(siblings.iter().any(|sibling| {
            sibling.sequence_number < entry.sequence_number && sibling.blocks_successors(now)
        }))
    }

    /// Claim an entry and run one charge attempt against the gateway.
    ///
    /// The claim increments `attempt_count` behind a status+count guard; a
    /// lost claim means a concurrent run owns this attempt and we back off.
    /// Gateway declines and transport errors both land in `failed` (transport
    /// errors are logged separately for diagnosis); only non-gateway errors
    /// propagate to the caller.
    pub(crate) async fn attempt_charge(
        &self,
        mut entry: InstallmentSchedule,
        now: NaiveDateTime,
        retry: bool,
    ) -> Result<ChargeResult> {
        let claimed = self
            .store
            .claim_attempt(&entry.id, entry.status, entry.attempt_count)
            .await?;
        if !claimed {
            warn!(
                order_reference = entry.order_reference.as_str(),
                sequence_number = entry.sequence_number,
                "Lost claim on installment, another run is processing it"
            );
            return Ok(ChargeResult::Lost);
        }
        entry.attempt_count += 1;

        let reference = merchant_reference(
            &entry.order_reference,
            entry.sequence_number,
            entry.attempt_count,
        );
        let first_failure = entry.failed_at.is_none();

        let charge = self
            .gateway
            .charge_token(
                &entry.token_reference,
                entry.amount,
                entry.currency,
                &reference,
            )
            .await;

        match charge {
            Ok(outcome) if outcome.is_successful() => {
                entry.mark_paid(outcome.transaction_reference(), now)?;
                self.store.update(&entry).await?;

                info!(
                    order_reference = entry.order_reference.as_str(),
                    sequence_number = entry.sequence_number,
                    transaction_reference = outcome.transaction_reference().as_str(),
                    retry = retry,
                    "Installment charged successfully"
                );

                self.dispatcher
                    .notify(
                        &entry.order_reference,
                        NotificationKind::InstallmentSuccess,
                        json!({
                            "sequence_number": entry.sequence_number,
                            "amount": entry.amount,
                            "currency": entry.currency,
                            "transaction_reference": entry.transaction_reference,
                            "retry": retry,
                        }),
                    )
                    .await;

                Ok(ChargeResult::Paid)
            }
            Ok(outcome) => {
                let reason = format!("Transaction state: {}", outcome.state);
                self.record_failure(entry, reason, first_failure, now, retry)
                    .await
            }
            Err(e) if e.is_charge_failure() => {
                if matches!(e, AppError::Transient(_)) {
                    warn!(
                        order_reference = entry.order_reference.as_str(),
                        sequence_number = entry.sequence_number,
                        error = %e,
                        "Transient gateway error, treating charge as failed"
                    );
                }
                self.record_failure(entry, e.to_string(), first_failure, now, retry)
                    .await
            }
            Err(e) => Err(e),
        }
    }

    async fn record_failure(
        &self,
        mut entry: InstallmentSchedule,
        reason: String,
        first_failure: bool,
        now: NaiveDateTime,
        retry: bool,
    ) -> Result<ChargeResult> {
        entry.mark_failed(reason.clone(), now)?;
        self.store.update(&entry).await?;

        warn!(
            order_reference = entry.order_reference.as_str(),
            sequence_number = entry.sequence_number,
            attempt_count = entry.attempt_count,
            reason = reason.as_str(),
            "Installment charge failed"
        );

        // `first_failure` drives the immediate organizer alert; retries only
        // re-notify the customer.
        self.dispatcher
            .notify(
                &entry.order_reference,
                NotificationKind::InstallmentFailure,
                json!({
                    "sequence_number": entry.sequence_number,
                    "amount": entry.amount,
                    "currency": entry.currency,
                    "reason": reason,
                    "first_failure": first_failure,
                    "grace_deadline": entry.grace_deadline(),
                    "retry": retry,
                }),
            )
            .await;

        Ok(ChargeResult::Failed)
    }
}
