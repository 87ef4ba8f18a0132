// Webhook intake for PostFinance Checkout
//
// PostFinance sends entity-change callbacks with an entity id; the actual
// state is fetched back from the API. Signature verification of the callback
// is handled by the fronting host platform.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::core::Result;
use crate::modules::webhooks::services::{ReconciliationOutcome, ReconciliationService};

/// PostFinance webhook callback body
#[derive(Debug, Deserialize)]
pub struct WebhookRequest {
    #[serde(rename = "entityId")]
    pub entity_id: i64,
    #[serde(rename = "listenerEntityTechnicalName")]
    pub entity_technical_name: String,
    #[serde(rename = "spaceId")]
    pub space_id: u64,
}

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub outcome: &'static str,
}

/// POST /webhooks/postfinance
pub async fn handle_webhook(
    request: web::Json<WebhookRequest>,
    service: web::Data<Arc<ReconciliationService>>,
) -> Result<HttpResponse> {
    let request = request.into_inner();
    debug!(
        entity_id = request.entity_id,
        entity = request.entity_technical_name.as_str(),
        space_id = request.space_id,
        "Received PostFinance webhook"
    );

    if request.entity_technical_name != "Transaction" {
        return Ok(HttpResponse::Ok().json(WebhookResponse { outcome: "ignored" }));
    }

    let outcome = service.reconcile_transaction(request.entity_id).await?;
    let outcome = match outcome {
        ReconciliationOutcome::Reconciled => "reconciled",
        ReconciliationOutcome::AlreadyResolved => "already_resolved",
        ReconciliationOutcome::Ignored => "ignored",
    };

    Ok(HttpResponse::Ok().json(WebhookResponse { outcome }))
}

/// Configure webhook routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/webhooks/postfinance").route(web::post().to(handle_webhook)));
}
