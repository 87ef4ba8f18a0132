// HTTP handlers for installment schedules
//
// Endpoints:
// - POST /orders/{order_reference}/installments - Create a schedule at checkout
// - GET  /orders/{order_reference}/installments - List an order's schedule

use actix_web::{web, HttpResponse};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::{Currency, Result};
use crate::modules::installments::{
    models::InstallmentSchedule,
    services::{NewSchedule, ScheduleBuilder},
};

/// Response for a single installment
#[derive(Debug, Serialize)]
pub struct InstallmentResponse {
    pub id: String,
    pub sequence_number: i32,
    pub amount: String,
    pub currency: String,
    pub due_date: String,
    pub status: String,
    pub attempt_count: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<String>,
}

impl From<InstallmentSchedule> for InstallmentResponse {
    fn from(entry: InstallmentSchedule) -> Self {
        Self {
            id: entry.id,
            sequence_number: entry.sequence_number,
            amount: entry.amount.to_string(),
            currency: entry.currency.to_string(),
            due_date: entry.due_date.to_string(),
            status: entry.status.to_string(),
            attempt_count: entry.attempt_count,
            failed_at: entry.failed_at.map(|dt| dt.to_string()),
            transaction_reference: entry.transaction_reference,
            paid_at: entry.paid_at.map(|dt| dt.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ScheduleResponse {
    pub order_reference: String,
    pub installments: Vec<InstallmentResponse>,
}

/// Request for POST /orders/{order_reference}/installments
#[derive(Debug, Deserialize)]
pub struct CreateScheduleRequest {
    pub total: Decimal,
    pub installment_count: i32,
    pub currency: Currency,
    pub first_payment_date: NaiveDate,
    pub event_date: NaiveDate,
    pub token_reference: String,
    pub first_transaction_reference: String,
}

/// POST /orders/{order_reference}/installments
///
/// Creates the full installment schedule right after the checkout charge
/// succeeded. Validation errors (count, amount, 30-day constraint) surface
/// synchronously so the checkout can reject the installment option.
pub async fn create_schedule(
    path: web::Path<String>,
    request: web::Json<CreateScheduleRequest>,
    builder: web::Data<Arc<ScheduleBuilder>>,
) -> Result<HttpResponse> {
    let order_reference = path.into_inner();
    let request = request.into_inner();

    let entries = builder
        .create_schedule(NewSchedule {
            order_reference: order_reference.clone(),
            total: request.total,
            installment_count: request.installment_count,
            currency: request.currency,
            first_payment_date: request.first_payment_date,
            event_date: request.event_date,
            token_reference: request.token_reference,
            first_transaction_reference: request.first_transaction_reference,
        })
        .await?;

    Ok(HttpResponse::Created().json(ScheduleResponse {
        order_reference,
        installments: entries.into_iter().map(Into::into).collect(),
    }))
}

/// GET /orders/{order_reference}/installments
pub async fn get_schedule(
    path: web::Path<String>,
    builder: web::Data<Arc<ScheduleBuilder>>,
) -> Result<HttpResponse> {
    let order_reference = path.into_inner();
    let entries = builder.get_schedule(&order_reference).await?;

    Ok(HttpResponse::Ok().json(ScheduleResponse {
        order_reference,
        installments: entries.into_iter().map(Into::into).collect(),
    }))
}

/// Configure installment routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/orders/{order_reference}/installments")
            .route(web::post().to(create_schedule))
            .route(web::get().to(get_schedule)),
    );
}
