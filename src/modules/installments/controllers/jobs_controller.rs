// Cron-facing job triggers
//
// The host platform's scheduler calls these once a day (or more often); each
// job is safe to re-run and returns its per-outcome summary counts.

use actix_web::{web, HttpResponse};
use std::sync::Arc;

use crate::core::Result;
use crate::modules::installments::services::{ChargingEngine, GraceController};

/// POST /jobs/process-due
pub async fn process_due(engine: web::Data<Arc<ChargingEngine>>) -> Result<HttpResponse> {
    let summary = engine.process_due_installments().await?;
    Ok(HttpResponse::Ok().json(summary))
}

/// POST /jobs/retry-failed
pub async fn retry_failed(controller: web::Data<Arc<GraceController>>) -> Result<HttpResponse> {
    let summary = controller.retry_failed_installments().await?;
    Ok(HttpResponse::Ok().json(summary))
}

/// POST /jobs/cancel-expired
pub async fn cancel_expired(controller: web::Data<Arc<GraceController>>) -> Result<HttpResponse> {
    let summary = controller.cancel_expired_grace_periods().await?;
    Ok(HttpResponse::Ok().json(summary))
}

/// Configure job routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/jobs")
            .route("/process-due", web::post().to(process_due))
            .route("/retry-failed", web::post().to(retry_failed))
            .route("/cancel-expired", web::post().to(cancel_expired)),
    );
}
