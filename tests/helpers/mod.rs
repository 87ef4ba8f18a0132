#![allow(dead_code)]

pub mod memory_store;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rust_decimal_macros::dec;
use std::sync::Arc;

use ticketpay::core::Currency;
use ticketpay::modules::installments::models::InstallmentSchedule;
use ticketpay::modules::installments::services::{build_entries, NewSchedule};

#[allow(unused_imports)]
pub use fake_gateway::{ChargeCall, GatewayScript, ScriptedGateway};
#[allow(unused_imports)]
pub use memory_store::MemoryStore;
#[allow(unused_imports)]
pub use recording_dispatcher::RecordingDispatcher;

/// A fixed "today" so scheduling tests are independent of the wall clock
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
}

pub fn now() -> NaiveDateTime {
    today().and_hms_opt(9, 0, 0).unwrap()
}

/// Build a 3-installment schedule of 100.00 CHF each starting `today`, with
/// the event comfortably far out and entry 1 already paid.
pub fn three_part_schedule(order_reference: &str) -> Vec<InstallmentSchedule> {
    build_entries(
        &NewSchedule {
            order_reference: order_reference.to_string(),
            total: dec!(300.00),
            installment_count: 3,
            currency: Currency::CHF,
            first_payment_date: today(),
            event_date: today() + Duration::days(365),
            token_reference: format!("tok-{}", order_reference),
            first_transaction_reference: "tx-checkout".to_string(),
        },
        now(),
    )
    .unwrap()
}

/// Store pre-seeded with one order's schedule
pub async fn seeded_store(order_reference: &str) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store
        .seed(three_part_schedule(order_reference))
        .await;
    store
}
