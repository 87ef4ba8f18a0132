use chrono::{Duration, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{AppError, Currency, Result};

/// Minimum number of installments per order
pub const MIN_INSTALLMENTS: i32 = 2;
/// Maximum number of installments per order
pub const MAX_INSTALLMENTS: i32 = 12;
/// Spacing between installment due dates
pub const INSTALLMENT_INTERVAL_DAYS: i64 = 30;
/// The last installment must be due at least this many days before the event
pub const EVENT_CUTOFF_DAYS: i64 = 30;
/// Window after a failed charge during which retries are attempted
pub const GRACE_PERIOD_DAYS: i64 = 3;

/// One planned charge attempt within an order's installment schedule.
///
/// Rows are created in bulk by the schedule builder, mutated only by the
/// charging engine and grace controller, and never deleted (cancelled rows
/// remain as an audit trail).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallmentSchedule {
    pub id: String,
    /// Opaque identifier of the owning order (owned by the host platform)
    pub order_reference: String,
    /// 1-based position within the schedule, unique per order
    pub sequence_number: i32,
    /// Total number of installments for this order
    pub num_installments: i32,
    pub amount: Decimal,
    pub currency: Currency,
    /// Date on which the charge should be attempted
    pub due_date: NaiveDate,
    pub status: InstallmentStatus,
    /// Incremented on every charge attempt, never reset
    pub attempt_count: i32,
    /// Saved payment method handle used for recurring charges
    pub token_reference: String,
    /// Set on the first failure of this entry, cleared if a retry succeeds
    pub failed_at: Option<NaiveDateTime>,
    pub failure_reason: Option<String>,
    /// Gateway transaction id of the successful charge
    pub transaction_reference: Option<String>,
    pub paid_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Installment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallmentStatus {
    /// Waiting for its due date
    Scheduled,
    /// Charge succeeded (terminal)
    Paid,
    /// Charge failed, retryable within the grace period
    Failed,
    /// Abandoned after grace expiry or a prior installment's failure (terminal)
    Cancelled,
}

impl InstallmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Terminal states admit no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Paid | Self::Cancelled)
    }
}

impl std::fmt::Display for InstallmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for InstallmentStatus {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        match value.as_str() {
            "scheduled" => Ok(Self::Scheduled),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("Invalid installment status: {}", value)),
        }
    }
}

/// Why an entry was cancelled, surfaced in notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CancellationReason {
    /// This entry failed and its grace period elapsed without a successful retry
    GracePeriodExpired,
    /// An earlier installment of the same order was abandoned
    PriorInstallmentFailed,
}

impl CancellationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GracePeriodExpired => "grace_period_expired",
            Self::PriorInstallmentFailed => "prior_installment_failed",
        }
    }
}

impl InstallmentSchedule {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        order_reference: String,
        sequence_number: i32,
        num_installments: i32,
        amount: Decimal,
        currency: Currency,
        due_date: NaiveDate,
        token_reference: String,
        now: NaiveDateTime,
    ) -> Result<Self> {
        if !(1..=MAX_INSTALLMENTS).contains(&sequence_number) {
            return Err(AppError::validation(format!(
                "Sequence number must be between 1 and {}, got {}",
                MAX_INSTALLMENTS, sequence_number
            )));
        }

        if amount <= Decimal::ZERO {
            return Err(AppError::InvalidAmount(format!(
                "Installment amount must be positive, got {}",
                amount
            )));
        }

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            order_reference,
            sequence_number,
            num_installments,
            amount,
            currency,
            due_date,
            status: InstallmentStatus::Scheduled,
            attempt_count: 0,
            token_reference,
            failed_at: None,
            failure_reason: None,
            transaction_reference: None,
            paid_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Transition to `paid`, recording the gateway transaction reference.
    ///
    /// Allowed from `scheduled` (first attempt) and `failed` (successful
    /// retry). Clears `failed_at` so the entry no longer counts as failing.
    pub fn mark_paid(&mut self, transaction_reference: String, now: NaiveDateTime) -> Result<()> {
        if self.status.is_terminal() {
            return Err(AppError::validation(format!(
                "Installment {} of order {} is {} and cannot be marked paid",
                self.sequence_number, self.order_reference, self.status
            )));
        }

        self.status = InstallmentStatus::Paid;
        self.transaction_reference = Some(transaction_reference);
        self.failed_at = None;
        self.failure_reason = None;
        self.paid_at = Some(now);
        self.updated_at = now;

        Ok(())
    }

    /// Transition to `failed`.
    ///
    /// The first failure timestamp is authoritative: a failed retry updates
    /// the reason but never moves `failed_at`, so the grace window is always
    /// measured from the original failure.
    pub fn mark_failed(&mut self, reason: String, now: NaiveDateTime) -> Result<()> {
        if self.status.is_terminal() {
            return Err(AppError::validation(format!(
                "Installment {} of order {} is {} and cannot be marked failed",
                self.sequence_number, self.order_reference, self.status
            )));
        }

        self.status = InstallmentStatus::Failed;
        self.failed_at = Some(self.failed_at.unwrap_or(now));
        self.failure_reason = Some(reason);
        self.updated_at = now;

        Ok(())
    }

    /// Transition to `cancelled`. Allowed from `scheduled` and `failed`.
    pub fn mark_cancelled(&mut self, reason: CancellationReason, now: NaiveDateTime) -> Result<()> {
        if self.status.is_terminal() {
            return Err(AppError::validation(format!(
                "Installment {} of order {} is {} and cannot be cancelled",
                self.sequence_number, self.order_reference, self.status
            )));
        }

        self.status = InstallmentStatus::Cancelled;
        self.failure_reason = Some(reason.as_str().to_string());
        self.updated_at = now;

        Ok(())
    }

    /// End of the retry window, defined only for failed entries
    pub fn grace_deadline(&self) -> Option<NaiveDateTime> {
        self.failed_at
            .map(|failed_at| failed_at + Duration::days(GRACE_PERIOD_DAYS))
    }

    /// Whether a retry is still permitted at `now`
    pub fn is_within_grace(&self, now: NaiveDateTime) -> bool {
        matches!(self.status, InstallmentStatus::Failed)
            && self.grace_deadline().is_some_and(|deadline| now < deadline)
    }

    /// Whether this entry blocks later entries of the same order from being
    /// charged: it is still waiting its turn, or failed but may yet recover.
    pub fn blocks_successors(&self, now: NaiveDateTime) -> bool {
        match self.status {
            InstallmentStatus::Scheduled => true,
            InstallmentStatus::Failed => self.is_within_grace(now),
            InstallmentStatus::Paid | InstallmentStatus::Cancelled => false,
        }
    }
}

/// Build the gateway merchant reference for one charge attempt.
///
/// Embedding the attempt count makes the reference unique per attempt and
/// usable as an idempotency key on the gateway side.
pub fn merchant_reference(order_reference: &str, sequence_number: i32, attempt: i32) -> String {
    format!(
        "ticketpay-{}-installment-{}-attempt-{}",
        order_reference, sequence_number, attempt
    )
}

/// Parse a merchant reference back into (order_reference, sequence_number).
///
/// Order references may themselves contain dashes, so parsing anchors on the
/// `-installment-` and `-attempt-` markers from the right.
pub fn parse_merchant_reference(reference: &str) -> Option<(String, i32)> {
    let rest = reference.strip_prefix("ticketpay-")?;
    let (rest, attempt_part) = rest.rsplit_once("-attempt-")?;
    attempt_part.parse::<i32>().ok()?;
    let (order_reference, sequence_part) = rest.rsplit_once("-installment-")?;
    let sequence_number = sequence_part.parse::<i32>().ok()?;
    Some((order_reference.to_string(), sequence_number))
}
