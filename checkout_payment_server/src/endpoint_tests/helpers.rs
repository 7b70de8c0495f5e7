use actix_web::{http::StatusCode, test, test::TestRequest, web, App};
use checkout_payment_engine::{
    db_types::NewProduct,
    events::EventProducers,
    provider_types::StatusMapping,
    OrderFlowApi,
    PaymentGatewayDatabase,
    SqliteDatabase,
};
use chrono::Duration;
use cpg_common::{Rupiah, Secret};
use sqlx::{migrate::MigrateDatabase, Sqlite};
use xendit_tools::{XenditApi, XenditConfig};

use crate::{
    auth::TokenIssuer,
    config::{AuthConfig, ServerConfig},
    middleware::CallbackTokenMiddlewareFactory,
    routes::{health, AuthRoute, CheckoutRoute, OrderStatusRoute, UpdateOrderStatusRoute},
    webhook_routes::XenditWebhookRoute,
};

pub const TEST_API_KEY: &str = "test-admin-key";
pub const TEST_CALLBACK_TOKEN: &str = "test-callback-token";

// A test `ServerConfig` with fixed secrets. DO NOT re-use these anywhere.
pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::new("127.0.0.1", 0);
    config.auth = AuthConfig {
        jwt_secret: Secret::new("endpoint-test-signing-secret".to_string()),
        api_key: Secret::new(TEST_API_KEY.to_string()),
        token_lifetime: Duration::hours(1),
    };
    config.callback_token = Secret::new(TEST_CALLBACK_TOKEN.to_string());
    config
}

pub async fn prepare_database() -> SqliteDatabase {
    let _ = env_logger::try_init();
    let path = std::env::temp_dir().join(format!("cpg_server_test_{}.db", rand::random::<u64>()));
    let url = format!("sqlite://{}", path.display());
    let _ = Sqlite::drop_database(&url).await;
    Sqlite::create_database(&url).await.expect("Error creating database");
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database connection");
    db.migrate().await.expect("Error running migrations");
    seed_catalog(&db).await;
    db
}

async fn seed_catalog(db: &SqliteDatabase) {
    db.upsert_product(NewProduct::new("prodA", "Kopi Gayo", Rupiah::from(100_000))).await.unwrap();
    db.upsert_product(NewProduct::new("prodB", "Teh Melati", Rupiah::from(50_000))).await.unwrap();
}

pub fn orders_api(db: SqliteDatabase) -> OrderFlowApi<SqliteDatabase> {
    OrderFlowApi::new(db, StatusMapping::default(), EventProducers::default())
}

/// Builds the same app the server runs (minus the notifier) and sends one request through it. The provider client
/// points at a dead local port, so any invoice call fails fast instead of reaching the network.
pub async fn send_request(db: SqliteDatabase, config: ServerConfig, req: TestRequest) -> (StatusCode, String) {
    let xendit_config = XenditConfig {
        base_url: "http://127.0.0.1:9".to_string(),
        secret_key: Secret::new("xnd_test_00000000".to_string()),
        invoice_duration_secs: 3600,
    };
    let app = App::new()
        .app_data(web::Data::new(orders_api(db)))
        .app_data(web::Data::new(XenditApi::new(xendit_config).unwrap()))
        .app_data(web::Data::new(TokenIssuer::new(&config.auth)))
        .app_data(web::Data::new(config.clone()))
        .service(health)
        .service(AuthRoute::new())
        .service(
            web::scope("/api")
                .service(CheckoutRoute::<SqliteDatabase>::new())
                .service(OrderStatusRoute::<SqliteDatabase>::new())
                .service(UpdateOrderStatusRoute::<SqliteDatabase>::new()),
        )
        .service(
            web::scope("/webhook")
                .wrap(CallbackTokenMiddlewareFactory::new("x-callback-token", config.callback_token.clone()))
                .service(XenditWebhookRoute::<SqliteDatabase>::new()),
        );
    let service = test::init_service(app).await;
    match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => {
            let status = res.status();
            let body = test::read_body(res).await;
            (status, String::from_utf8_lossy(&body).into_owned())
        },
        Err(e) => {
            let res = e.error_response();
            let status = res.status();
            let body = actix_web::body::to_bytes(res.into_body()).await.unwrap();
            (status, String::from_utf8_lossy(&body).into_owned())
        },
    }
}

/// Exchanges the test API key for an access token through the real `/auth` route.
pub async fn obtain_token(db: SqliteDatabase, config: ServerConfig, operator: &str) -> String {
    let req = TestRequest::post()
        .uri("/auth")
        .set_json(serde_json::json!({ "api_key": TEST_API_KEY, "operator": operator }));
    let (status, body) = send_request(db, config, req).await;
    assert_eq!(status, StatusCode::OK, "auth failed: {body}");
    let value: serde_json::Value = serde_json::from_str(&body).unwrap();
    value["token"].as_str().unwrap().to_string()
}
