#[path = "../helpers/mod.rs"]
mod helpers;

use chrono::Duration;
use rust_decimal_macros::dec;
use std::sync::Arc;

use helpers::{GatewayScript, RecordingDispatcher, ScriptedGateway};
use ticketpay::core::Currency;
use ticketpay::modules::installments::models::InstallmentStatus;
use ticketpay::modules::installments::services::ChargingEngine;
use ticketpay::modules::notifications::NotificationKind;

#[tokio::test]
async fn charges_due_installment_and_marks_it_paid() {
    let store = helpers::seeded_store("ORD-100").await;
    let gateway = Arc::new(ScriptedGateway::always_succeeding());
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let engine = ChargingEngine::new(store.clone(), gateway.clone(), dispatcher.clone());

    // Entry 2 falls due 30 days after checkout
    let run_time = helpers::now() + Duration::days(30);
    let summary = engine.process_due_at(run_time).await.unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.paid, 1);
    assert_eq!(summary.failed, 0);

    let entry = store.get("ORD-100", 2);
    assert_eq!(entry.status, InstallmentStatus::Paid);
    assert_eq!(entry.attempt_count, 1);
    assert!(entry.transaction_reference.is_some());
    assert_eq!(entry.paid_at, Some(run_time));

    let calls = gateway.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].token_reference, "tok-ORD-100");
    assert_eq!(calls[0].amount, dec!(100.00));
    assert_eq!(calls[0].currency, Currency::CHF);
    assert_eq!(
        calls[0].merchant_reference,
        "ticketpay-ORD-100-installment-2-attempt-1"
    );

    let successes = dispatcher.of_kind(NotificationKind::InstallmentSuccess);
    assert_eq!(successes.len(), 1);
    assert_eq!(successes[0].order_reference, "ORD-100");
    assert_eq!(successes[0].payload["sequence_number"], 2);
}

#[tokio::test]
async fn declined_charge_marks_entry_failed() {
    let store = helpers::seeded_store("ORD-101").await;
    let gateway = Arc::new(ScriptedGateway::new(vec![GatewayScript::Decline]));
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let engine = ChargingEngine::new(store.clone(), gateway.clone(), dispatcher.clone());

    let run_time = helpers::now() + Duration::days(30);
    let summary = engine.process_due_at(run_time).await.unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.failed, 1);

    let entry = store.get("ORD-101", 2);
    assert_eq!(entry.status, InstallmentStatus::Failed);
    assert_eq!(entry.failed_at, Some(run_time));
    assert!(entry.failure_reason.is_some());
    assert_eq!(entry.attempt_count, 1);

    let failures = dispatcher.of_kind(NotificationKind::InstallmentFailure);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].payload["first_failure"], true);
    assert_eq!(failures[0].payload["retry"], false);
}

#[tokio::test]
async fn transient_gateway_error_marks_entry_failed() {
    let store = helpers::seeded_store("ORD-102").await;
    let gateway = Arc::new(ScriptedGateway::new(vec![GatewayScript::Transient]));
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let engine = ChargingEngine::new(store.clone(), gateway.clone(), dispatcher.clone());

    let run_time = helpers::now() + Duration::days(30);
    let summary = engine.process_due_at(run_time).await.unwrap();

    assert_eq!(summary.failed, 1);

    let entry = store.get("ORD-102", 2);
    assert_eq!(entry.status, InstallmentStatus::Failed);
    assert_eq!(entry.failed_at, Some(run_time));
}

#[tokio::test]
async fn running_twice_never_double_charges() {
    let store = helpers::seeded_store("ORD-103").await;
    let gateway = Arc::new(ScriptedGateway::always_succeeding());
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let engine = ChargingEngine::new(store.clone(), gateway.clone(), dispatcher.clone());

    let run_time = helpers::now() + Duration::days(30);
    let first = engine.process_due_at(run_time).await.unwrap();
    let second = engine.process_due_at(run_time).await.unwrap();

    assert_eq!(first.paid, 1);
    assert_eq!(second.processed, 0);
    assert_eq!(gateway.call_count(), 1);

    let entry = store.get("ORD-103", 2);
    assert_eq!(entry.attempt_count, 1);
}

#[tokio::test]
async fn later_installment_waits_for_failed_predecessor() {
    let store = helpers::seeded_store("ORD-104").await;
    // Entry 2 declines; entry 3 must then be skipped, not charged
    let gateway = Arc::new(ScriptedGateway::new(vec![GatewayScript::Decline]));
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let engine = ChargingEngine::new(store.clone(), gateway.clone(), dispatcher.clone());

    // Both entry 2 and entry 3 are due by day 60
    let run_time = helpers::now() + Duration::days(60);
    let summary = engine.process_due_at(run_time).await.unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(gateway.call_count(), 1);

    assert_eq!(store.get("ORD-104", 2).status, InstallmentStatus::Failed);
    assert_eq!(store.get("ORD-104", 3).status, InstallmentStatus::Scheduled);
}

#[tokio::test]
async fn catches_up_in_sequence_when_all_charges_succeed() {
    let store = helpers::seeded_store("ORD-105").await;
    let gateway = Arc::new(ScriptedGateway::always_succeeding());
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let engine = ChargingEngine::new(store.clone(), gateway.clone(), dispatcher.clone());

    let run_time = helpers::now() + Duration::days(60);
    let summary = engine.process_due_at(run_time).await.unwrap();

    assert_eq!(summary.paid, 2);
    assert_eq!(summary.skipped, 0);

    let calls = gateway.calls();
    assert_eq!(calls.len(), 2);
    // Entry 2 is charged before entry 3
    assert_eq!(
        calls[0].merchant_reference,
        "ticketpay-ORD-105-installment-2-attempt-1"
    );
    assert_eq!(
        calls[1].merchant_reference,
        "ticketpay-ORD-105-installment-3-attempt-1"
    );
}

#[tokio::test]
async fn entries_not_yet_due_are_left_alone() {
    let store = helpers::seeded_store("ORD-106").await;
    let gateway = Arc::new(ScriptedGateway::always_succeeding());
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let engine = ChargingEngine::new(store.clone(), gateway.clone(), dispatcher.clone());

    // Day 29: entry 2 is due on day 30
    let run_time = helpers::now() + Duration::days(29);
    let summary = engine.process_due_at(run_time).await.unwrap();

    assert_eq!(summary.processed, 0);
    assert_eq!(gateway.call_count(), 0);
}
