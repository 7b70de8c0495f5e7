pub mod prepare_env;

use checkout_payment_engine::{
    events::EventProducers, provider_types::StatusMapping, OrderFlowApi, PaymentGatewayDatabase,
    SqliteDatabase,
};
use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

use crate::support::prepare_env::{prepare_test_env, random_db_path};

pub async fn setup() -> OrderFlowApi<SqliteDatabase> {
    let url = random_db_path();
    let db = prepare_test_env(&url).await;
    OrderFlowApi::new(db, StatusMapping::default(), EventProducers::default())
}

pub async fn tear_down(mut api: OrderFlowApi<SqliteDatabase>) {
    let url = api.db().url().to_string();
    if let Err(e) = api.db_mut().close().await {
        error!("🚀️ Failed to close database: {e}");
    }
    Sqlite::drop_database(&url).await.unwrap();
}
