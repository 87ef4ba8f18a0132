use chrono::{Duration, NaiveDate, NaiveDateTime};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use ticketpay::core::{AppError, Currency};
use ticketpay::modules::installments::models::InstallmentStatus;
use ticketpay::modules::installments::services::{build_entries, NewSchedule};

fn first_payment_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 15).unwrap()
}

fn now() -> NaiveDateTime {
    first_payment_date().and_hms_opt(10, 30, 0).unwrap()
}

fn request(total: Decimal, count: i32, event_offset_days: i64) -> NewSchedule {
    NewSchedule {
        order_reference: "FEST-2026-00017".to_string(),
        total,
        installment_count: count,
        currency: Currency::CHF,
        first_payment_date: first_payment_date(),
        event_date: first_payment_date() + Duration::days(event_offset_days),
        token_reference: "tok-abc".to_string(),
        first_transaction_reference: "tx-checkout-1".to_string(),
    }
}

#[test]
fn entries_carry_order_metadata() {
    let entries = build_entries(&request(dec!(900.00), 3, 365), now()).unwrap();

    assert_eq!(entries.len(), 3);
    for (i, entry) in entries.iter().enumerate() {
        assert_eq!(entry.order_reference, "FEST-2026-00017");
        assert_eq!(entry.sequence_number, (i + 1) as i32);
        assert_eq!(entry.num_installments, 3);
        assert_eq!(entry.token_reference, "tok-abc");
        assert_eq!(entry.attempt_count, 0);
    }
}

#[test]
fn first_entry_mirrors_completed_checkout_charge() {
    let entries = build_entries(&request(dec!(900.00), 3, 365), now()).unwrap();

    assert_eq!(entries[0].status, InstallmentStatus::Paid);
    assert_eq!(
        entries[0].transaction_reference,
        Some("tx-checkout-1".to_string())
    );
    assert_eq!(entries[0].paid_at, Some(now()));
    assert!(entries[1..]
        .iter()
        .all(|e| e.status == InstallmentStatus::Scheduled
            && e.transaction_reference.is_none()));
}

#[test]
fn due_dates_run_in_thirty_day_steps() {
    let entries = build_entries(&request(dec!(400.00), 4, 365), now()).unwrap();

    assert_eq!(entries[0].due_date, first_payment_date());
    assert_eq!(entries[1].due_date, first_payment_date() + Duration::days(30));
    assert_eq!(entries[2].due_date, first_payment_date() + Duration::days(60));
    assert_eq!(entries[3].due_date, first_payment_date() + Duration::days(90));
}

#[test]
fn last_due_date_inside_pre_event_window_is_rejected() {
    // 4 installments land on days 0/30/60/90; an event 100 days out puts the
    // cutoff at day 70, so the schedule must be rejected.
    let result = build_entries(&request(dec!(400.00), 4, 100), now());
    assert!(matches!(result, Err(AppError::ScheduleTooLate(_))));
}

#[test]
fn last_due_date_exactly_on_cutoff_is_accepted() {
    // Days 0/30/60 against an event 90 days out: the last installment falls
    // exactly 30 days before the event, which is allowed.
    let entries = build_entries(&request(dec!(300.00), 3, 90), now()).unwrap();
    assert_eq!(entries.len(), 3);
}

#[test]
fn one_day_past_cutoff_is_rejected() {
    let result = build_entries(&request(dec!(300.00), 3, 89), now());
    assert!(matches!(result, Err(AppError::ScheduleTooLate(_))));
}

#[test]
fn invalid_amounts_build_nothing() {
    assert!(build_entries(&request(dec!(0.00), 3, 365), now()).is_err());
    assert!(matches!(
        build_entries(&request(dec!(300.00), 13, 365), now()),
        Err(AppError::InvalidInstallmentCount(13))
    ));
}

proptest! {
    /// For any valid request, entry amounts sum to the total and due dates
    /// stay outside the 30-day pre-event window.
    #[test]
    fn valid_schedules_hold_invariants(
        cents in 10_00i64..=1_000_000i64,
        count in 2i32..=12i32,
    ) {
        // Event far enough out that any count in range fits
        let entries = build_entries(
            &request(Decimal::new(cents, 2), count, 500),
            now(),
        )
        .unwrap();

        let sum: Decimal = entries.iter().map(|e| e.amount).sum();
        prop_assert_eq!(sum, Decimal::new(cents, 2));

        let latest_allowed = first_payment_date() + Duration::days(500 - 30);
        for entry in &entries {
            prop_assert!(entry.due_date <= latest_allowed);
        }
    }
}
