use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use market_payment_engine::{
    fees::FeeSchedule,
    traits::{LedgerStore, PaymentGateway},
    OrderFlowApi,
    SqliteLedger,
};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    integrations::stripe::StripeGateway,
    routes,
    webhook_routes,
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteLedger::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let gateway =
        StripeGateway::new(config.stripe.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let srv = create_server_instance(config, db, gateway)?;
    srv.await.map_err(|e| ServerError::BackendError(e.to_string()))
}

pub fn create_server_instance<B, G>(config: ServerConfig, db: B, gateway: G) -> Result<Server, ServerError>
where
    B: LedgerStore + 'static,
    G: PaymentGateway + 'static,
{
    let host = config.host.clone();
    let port = config.port;
    info!("🚀️ Starting server on {host}:{port}");
    let srv = HttpServer::new(move || {
        let api = OrderFlowApi::new(
            db.clone(),
            gateway.clone(),
            FeeSchedule::new(config.fee_rate),
            config.currency.clone(),
        );
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("mpg::access_log"))
            .app_data(web::Data::new(api))
            .app_data(web::Data::new(config.stripe.clone()))
            .service(routes::health)
            .service(
                web::scope("/api")
                    .route("/orders", web::post().to(routes::create_order::<B, G>))
                    .route("/orders/{id}", web::get().to(routes::order_details::<B, G>))
                    .route("/orders/{id}/payment", web::post().to(routes::initiate_payment::<B, G>))
                    .route("/orders/{id}/cancel", web::post().to(routes::cancel_order::<B, G>))
                    .route("/orders/{id}/status", web::post().to(routes::update_status::<B, G>)),
            )
            .service(web::scope("/stripe").route("/webhook", web::post().to(webhook_routes::stripe_webhook::<B, G>)))
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
