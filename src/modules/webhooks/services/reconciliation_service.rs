use chrono::{NaiveDateTime, Utc};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::core::Result;
use crate::modules::gateway::services::PaymentGateway;
use crate::modules::installments::models::{parse_merchant_reference, InstallmentStatus};
use crate::modules::installments::repositories::InstallmentStore;
use crate::modules::notifications::{NotificationDispatcher, NotificationKind};

/// What a webhook callback did to local state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconciliationOutcome {
    /// A charge we had recorded as failed (or still in flight) actually
    /// succeeded at the gateway; the entry is now paid
    Reconciled,
    /// The entry already reflects the gateway state
    AlreadyResolved,
    /// Transaction does not belong to an installment charge, or reports a
    /// non-success state the batch jobs handle themselves
    Ignored,
}

/// Applies asynchronous gateway state updates to installment entries.
///
/// A charge request that times out locally is recorded as failed, but the
/// gateway may still complete it. The transaction webhook closes that gap:
/// when the gateway reports success for an entry that is not yet paid, the
/// entry is reconciled to `paid` instead of being retried into a double
/// charge.
pub struct ReconciliationService {
    store: Arc<dyn InstallmentStore>,
    gateway: Arc<dyn PaymentGateway>,
    dispatcher: Arc<dyn NotificationDispatcher>,
}

impl ReconciliationService {
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

    pub async fn reconcile_transaction(&self, transaction_id: i64) -> Result<ReconciliationOutcome> {
        self.reconcile_transaction_at(transaction_id, Utc::now().naive_utc())
            .await
    }

    pub async fn reconcile_transaction_at(
        &self,
        transaction_id: i64,
        now: NaiveDateTime,
    ) -> Result<ReconciliationOutcome> {
        let outcome = self.gateway.read_transaction(transaction_id).await?;

        let Some(reference) = outcome.merchant_reference.as_deref() else {
            return Ok(ReconciliationOutcome::Ignored);
        };
        let Some((order_reference, sequence_number)) = parse_merchant_reference(reference) else {
            return Ok(ReconciliationOutcome::Ignored);
        };

        if !outcome.is_successful() {
            // Failures reach us through the charge call itself; the webhook
            // only needs to repair false negatives.
            return Ok(ReconciliationOutcome::Ignored);
        }

        let Some(entry) = self
            .store
            .find_entry(&order_reference, sequence_number)
            .await?
        else {
            warn!(
                merchant_reference = reference,
                "Webhook references an unknown installment entry"
            );
            return Ok(ReconciliationOutcome::Ignored);
        };

        match entry.status {
            InstallmentStatus::Paid | InstallmentStatus::Cancelled => {
                Ok(ReconciliationOutcome::AlreadyResolved)
            }
            status @ (InstallmentStatus::Scheduled | InstallmentStatus::Failed) => {
                let mut reconciled = entry.clone();
                reconciled.mark_paid(outcome.transaction_reference(), now)?;

                if !self.store.transition(&reconciled, status).await? {
                    // Raced with a batch run that resolved the entry itself
                    return Ok(ReconciliationOutcome::AlreadyResolved);
                }

                info!(
                    order_reference = order_reference.as_str(),
                    sequence_number = sequence_number,
                    transaction_id = transaction_id,
                    "Reconciled installment from gateway webhook"
                );

                self.dispatcher
                    .notify(
                        &reconciled.order_reference,
                        NotificationKind::InstallmentSuccess,
                        json!({
                            "sequence_number": reconciled.sequence_number,
                            "amount": reconciled.amount,
                            "currency": reconciled.currency,
                            "transaction_reference": reconciled.transaction_reference,
                            "reconciled": true,
                        }),
                    )
                    .await;

                Ok(ReconciliationOutcome::Reconciled)
            }
        }
    }
}
