use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;

use crate::core::{AppError, Currency, Result};
use crate::modules::installments::models::{
    InstallmentSchedule, EVENT_CUTOFF_DAYS, INSTALLMENT_INTERVAL_DAYS,
};
use crate::modules::installments::repositories::InstallmentStore;
use crate::modules::installments::services::money;

/// Everything the builder needs to lay out one order's schedule.
///
/// Built at checkout time, immediately after the first charge succeeded: the
/// first installment is already paid, and its transaction created the token
/// used for all later charges.
#[derive(Debug, Clone)]
pub struct NewSchedule {
    pub order_reference: String,
    pub total: Decimal,
    pub installment_count: i32,
    pub currency: Currency,
    /// Date of the already-completed first payment
    pub first_payment_date: NaiveDate,
    pub event_date: NaiveDate,
    pub token_reference: String,
    /// Gateway transaction of the completed first charge
    pub first_transaction_reference: String,
}

/// Builds and persists installment schedules
pub struct ScheduleBuilder {
    store: Arc<dyn InstallmentStore>,
}

impl ScheduleBuilder {
    pub fn new(store: Arc<dyn InstallmentStore>) -> Self {
        Self { store }
    }

    /// Create and persist a full schedule, all-or-nothing.
    pub async fn create_schedule(&self, request: NewSchedule) -> Result<Vec<InstallmentSchedule>> {
        let entries = build_entries(&request, Utc::now().naive_utc())?;

        self.store.create_schedule(&entries).await?;

        info!(
            order_reference = request.order_reference.as_str(),
            installment_count = request.installment_count,
            total = %request.total,
            "Installment schedule created"
        );

        Ok(entries)
    }

    pub async fn get_schedule(&self, order_reference: &str) -> Result<Vec<InstallmentSchedule>> {
        self.store.find_by_order(order_reference).await
    }
}

/// Lay out the entries for one order without persisting anything.
///
/// Due dates are spaced 30 days apart starting at the first-payment date.
/// Entry 1 is created already `paid` (it mirrors the completed checkout
/// charge); entries 2..N are `scheduled`. Fails with `ScheduleTooLate` when
/// the last due date lands inside the 30-day pre-event window.
pub fn build_entries(
    request: &NewSchedule,
    now: NaiveDateTime,
) -> Result<Vec<InstallmentSchedule>> {
    let amounts = money::split_total(request.total, request.installment_count, request.currency)?;

    let last_due = request.first_payment_date
        + Duration::days(INSTALLMENT_INTERVAL_DAYS * (request.installment_count as i64 - 1));
    let latest_allowed = request.event_date - Duration::days(EVENT_CUTOFF_DAYS);
    if last_due > latest_allowed {
        return Err(AppError::ScheduleTooLate(format!(
            "Last installment would be due {} but must be on or before {} \
             ({} days before the event on {})",
            last_due, latest_allowed, EVENT_CUTOFF_DAYS, request.event_date
        )));
    }

    let mut entries = Vec::with_capacity(amounts.len());
    for (i, amount) in amounts.iter().enumerate() {
        let sequence_number = (i + 1) as i32;
        let due_date = request.first_payment_date
            + Duration::days(INSTALLMENT_INTERVAL_DAYS * i as i64);

        let mut entry = InstallmentSchedule::new(
            request.order_reference.clone(),
            sequence_number,
            request.installment_count,
            *amount,
            request.currency,
            due_date,
            request.token_reference.clone(),
            now,
        )?;

        if sequence_number == 1 {
            entry.mark_paid(request.first_transaction_reference.clone(), now)?;
        }

        entries.push(entry);
    }

    Ok(entries)
}
