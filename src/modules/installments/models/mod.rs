pub mod installment_schedule;

pub use installment_schedule::{
    merchant_reference, parse_merchant_reference, CancellationReason, InstallmentSchedule,
    InstallmentStatus, EVENT_CUTOFF_DAYS, GRACE_PERIOD_DAYS, INSTALLMENT_INTERVAL_DAYS,
    MAX_INSTALLMENTS, MIN_INSTALLMENTS,
};
