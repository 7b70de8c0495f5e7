use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use checkout_payment_engine::{
    events::{EventHandlers, EventProducers},
    provider_types::StatusMapping,
    OrderFlowApi,
    SqliteDatabase,
};
use xendit_tools::XenditApi;

use crate::{
    auth::TokenIssuer,
    config::ServerConfig,
    errors::ServerError,
    integrations::whatsapp::notification_hooks,
    middleware::CallbackTokenMiddlewareFactory,
    routes::{health, AuthRoute, CheckoutRoute, OrderStatusRoute, UpdateOrderStatusRoute},
    webhook_routes::XenditWebhookRoute,
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = EventHandlers::new(128, notification_hooks(&config.notifier));
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let xendit_api =
        XenditApi::new(config.xendit.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let (host, port) = (config.host.clone(), config.port);
    let srv = HttpServer::new(move || {
        let mut mapping = StatusMapping::default();
        if let Some(overrides) = config.status_map_overrides.as_deref() {
            mapping.apply_overrides(overrides);
        }
        let orders_api = OrderFlowApi::new(db.clone(), mapping, producers.clone());
        let jwt_signer = TokenIssuer::new(&config.auth);
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("cpg::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(xendit_api.clone()))
            .app_data(web::Data::new(jwt_signer))
            .app_data(web::Data::new(config.clone()));
        let api_scope = web::scope("/api")
            .service(CheckoutRoute::<SqliteDatabase>::new())
            .service(OrderStatusRoute::<SqliteDatabase>::new())
            .service(UpdateOrderStatusRoute::<SqliteDatabase>::new());
        // The callback-token check wraps the whole provider-facing scope, so no webhook handler ever runs for an
        // unauthenticated delivery.
        let webhook_scope = web::scope("/webhook")
            .wrap(CallbackTokenMiddlewareFactory::new("x-callback-token", config.callback_token.clone()))
            .service(XenditWebhookRoute::<SqliteDatabase>::new());
        app.service(health).service(AuthRoute::new()).service(api_scope).service(webhook_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
