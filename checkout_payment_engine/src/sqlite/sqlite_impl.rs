//! `SqliteDatabase` is a concrete implementation of a checkout payment engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements the [`PaymentGatewayDatabase`] trait. The schema is
//! initialised explicitly via [`SqliteDatabase::migrate`]; nothing in the engine creates tables on demand.
use std::fmt::Debug;

use log::debug;
use serde_json::Value;
use sqlx::SqlitePool;

use super::db::{db_url, new_pool, orders, payments, products};
use crate::{
    db_types::{NewOrder, NewProduct, Order, OrderId, PaymentRecord, Product},
    traits::{PaymentGatewayDatabase, PaymentGatewayError, StatusUpdate, TransitionOutcome},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Connects to the database named by `CPG_DATABASE_URL`, or the default store path when unset.
    pub async fn new(max_connections: u32) -> Result<Self, PaymentGatewayError> {
        let url = db_url();
        Self::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, PaymentGatewayError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    /// Runs the schema migrations. Call once at startup, before serving any traffic.
    pub async fn migrate(&self) -> Result<(), PaymentGatewayError> {
        sqlx::migrate!("./src/sqlite/db/migrations")
            .run(&self.pool)
            .await
            .map_err(|e| PaymentGatewayError::DatabaseError(e.to_string()))?;
        debug!("🗃️ Database migrations complete");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl PaymentGatewayDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn fetch_products(&self, ids: &[String]) -> Result<Vec<Product>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        products::fetch_products(ids, &mut conn).await
    }

    async fn upsert_product(&self, product: NewProduct) -> Result<Product, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        products::upsert_product(product, &mut conn).await
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::insert_order(order, &mut conn).await?;
        debug!("🗃️ Order {} has been saved in the DB", order.id);
        Ok(order)
    }

    async fn fetch_order_by_id(&self, id: &OrderId) -> Result<Option<Order>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_id(id, &mut conn).await?)
    }

    async fn fetch_order_by_external_id(&self, external_id: &str) -> Result<Option<Order>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_external_id(external_id, &mut conn).await?)
    }

    async fn fetch_order_by_invoice_id(&self, invoice_id: &str) -> Result<Option<Order>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_invoice_id(invoice_id, &mut conn).await?)
    }

    async fn attach_invoice(
        &self,
        id: &OrderId,
        invoice_id: &str,
        invoice_url: &str,
    ) -> Result<Option<Order>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        orders::attach_invoice(id, invoice_id, invoice_url, &mut conn).await
    }

    async fn payment_record_exists(&self, id: &OrderId, event_id: &str) -> Result<bool, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        payments::record_exists(id, event_id, &mut conn).await
    }

    /// Applies the transition in a single transaction: the CAS on the order row, then the ledger append. If either
    /// half refuses (stale status, or a duplicate event id that slipped past the caller's check), the whole
    /// transaction rolls back and nothing is persisted.
    async fn commit_transition(&self, update: StatusUpdate) -> Result<TransitionOutcome, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        let order = match orders::try_update_status(&update, &mut tx).await? {
            Some(order) => order,
            None => {
                tx.rollback().await?;
                return Ok(TransitionOutcome::StaleStatus);
            },
        };
        if !payments::ledger_insert(&update, &mut tx).await? {
            tx.rollback().await?;
            return Ok(TransitionOutcome::DuplicateEvent);
        }
        tx.commit().await?;
        debug!("🗃️ Order {} transitioned to {} (event [{}])", order.id, order.status, update.event_id);
        Ok(TransitionOutcome::Applied(order))
    }

    async fn archive_event_payload(&self, id: &OrderId, payload: &Value) -> Result<(), PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        orders::archive_event_payload(id, payload, &mut conn).await
    }

    async fn fetch_payment_records(&self, id: &OrderId) -> Result<Vec<PaymentRecord>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        payments::fetch_for_order(id, &mut conn).await
    }

    async fn close(&mut self) -> Result<(), PaymentGatewayError> {
        self.pool.close().await;
        Ok(())
    }
}
