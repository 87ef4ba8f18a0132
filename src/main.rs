use std::sync::Arc;

use actix_web::{web, App, HttpResponse, HttpServer};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ticketpay::config::Config;
use ticketpay::modules::gateway::services::{PaymentGateway, PostFinanceClient};
use ticketpay::modules::installments::controllers::{installment_controller, jobs_controller};
use ticketpay::modules::installments::repositories::{InstallmentRepository, InstallmentStore};
use ticketpay::modules::installments::services::{ChargingEngine, GraceController, ScheduleBuilder};
use ticketpay::modules::notifications::{LogDispatcher, NotificationDispatcher};
use ticketpay::modules::webhooks::controllers::webhook_controller;
use ticketpay::modules::webhooks::services::ReconciliationService;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ticketpay=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().expect("Failed to load configuration");
    config.validate().expect("Configuration validation failed");

    tracing::info!("Starting ticketpay installment payment service");
    tracing::info!("Environment: {}", config.app.env);
    tracing::info!("Server binding to: {}", config.server.bind_address());

    // Create database connection pool
    let db_pool = config
        .database
        .create_pool()
        .await
        .expect("Failed to create database pool");

    tracing::info!(
        "Database pool initialized ({} connections)",
        config.database.pool_size
    );

    // Wire the core services against their trait seams
    let store: Arc<dyn InstallmentStore> = Arc::new(InstallmentRepository::new(db_pool));
    let gateway: Arc<dyn PaymentGateway> = Arc::new(
        PostFinanceClient::new(config.postfinance.clone())
            .expect("Failed to construct PostFinance client"),
    );
    let dispatcher: Arc<dyn NotificationDispatcher> = Arc::new(LogDispatcher);

    let builder = Arc::new(ScheduleBuilder::new(store.clone()));
    let engine = Arc::new(ChargingEngine::new(
        store.clone(),
        gateway.clone(),
        dispatcher.clone(),
    ));
    let grace = Arc::new(GraceController::new(
        store.clone(),
        dispatcher.clone(),
        engine.clone(),
    ));
    let reconciliation = Arc::new(ReconciliationService::new(
        store.clone(),
        gateway.clone(),
        dispatcher.clone(),
    ));

    // Start HTTP server
    let bind_address = config.server.bind_address();
    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(builder.clone()))
            .app_data(web::Data::new(engine.clone()))
            .app_data(web::Data::new(grace.clone()))
            .app_data(web::Data::new(reconciliation.clone()))
            .configure(installment_controller::configure)
            .configure(jobs_controller::configure)
            .configure(webhook_controller::configure)
            .route("/health", web::get().to(health_check))
    })
    .bind(&bind_address)?
    .run();

    tracing::info!("Server started at http://{}", bind_address);

    server.await
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "ticketpay"
    }))
}
