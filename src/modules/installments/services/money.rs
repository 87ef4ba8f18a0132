use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;

use crate::core::{AppError, Currency, Result};
use crate::modules::installments::models::{
    EVENT_CUTOFF_DAYS, INSTALLMENT_INTERVAL_DAYS, MAX_INSTALLMENTS, MIN_INSTALLMENTS,
};

/// Split a total into N per-installment amounts that sum exactly to the total.
///
/// `base = round_half_up(total / N)` at the currency's minor-unit scale;
/// installments 2..N receive `base` and the first installment absorbs the
/// remainder, so the sum never drifts. The remainder is bounded by
/// N times the currency's smallest unit.
pub fn split_total(total: Decimal, count: i32, currency: Currency) -> Result<Vec<Decimal>> {
    if !(MIN_INSTALLMENTS..=MAX_INSTALLMENTS).contains(&count) {
        return Err(AppError::InvalidInstallmentCount(count));
    }

    if total <= Decimal::ZERO {
        return Err(AppError::InvalidAmount(format!(
            "Total must be positive, got {}",
            total
        )));
    }

    let base = currency.round_half_up(total / Decimal::from(count));
    let first = total - base * Decimal::from(count - 1);

    // Every entry must carry at least one minor unit; a base that rounds to
    // zero would produce zero-amount installments.
    if base < currency.smallest_unit() || first <= Decimal::ZERO {
        return Err(AppError::InvalidAmount(format!(
            "Total {} is too small to split into {} installments",
            total, count
        )));
    }

    let mut amounts = Vec::with_capacity(count as usize);
    amounts.push(first);
    amounts.resize(count as usize, base);

    Ok(amounts)
}

/// Maximum number of installments that fit between `start_date` and the
/// event's 30-day cutoff.
///
/// Installments are spaced 30 days apart with the first one on `start_date`,
/// and the last one must land at least 30 days before the event. An optional
/// organizer-configured maximum lowers the result further.
pub fn max_installments(
    event_date: NaiveDate,
    start_date: NaiveDate,
    organizer_max: Option<i32>,
) -> i32 {
    let latest_payment_date = event_date - Duration::days(EVENT_CUTOFF_DAYS);
    let days_available = (latest_payment_date - start_date).num_days();

    let fitting = if days_available < 0 {
        1
    } else {
        ((days_available - 1) / INSTALLMENT_INTERVAL_DAYS + 1).max(1) as i32
    };

    let mut max = fitting.min(MAX_INSTALLMENTS);
    if let Some(organizer_max) = organizer_max {
        max = max.min(organizer_max);
    }
    max
}
