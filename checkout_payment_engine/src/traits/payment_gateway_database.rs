use chrono::{DateTime, Utc};
use cpg_common::Rupiah;
use serde_json::Value;
use thiserror::Error;

use crate::db_types::{NewOrder, NewProduct, Order, OrderId, OrderStatus, PaymentRecord, PaymentType, Product};

/// One atomic status transition, expressed as a compare-and-swap against the status read before the write was
/// decided. Backends apply the whole struct in a single transaction: the order row update, the ledger append, and
/// the raw-payload overwrite either all land or none do.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub order_id: OrderId,
    /// The status the order had when the transition was decided. The write only succeeds if the stored status
    /// still matches.
    pub expected: OrderStatus,
    pub new_status: OrderStatus,
    /// Keys the idempotency ledger together with `order_id`.
    pub event_id: String,
    pub amount: Rupiah,
    /// Applied only on a transition into `Paid`, and only if `paid_at` has never been set before.
    pub paid_at: DateTime<Utc>,
    pub payment_type: PaymentType,
    pub raw_payload: Value,
}

/// The result of attempting to commit a [`StatusUpdate`].
#[derive(Debug, Clone)]
pub enum TransitionOutcome {
    /// The compare-and-swap succeeded and a ledger record was appended. Carries the updated order.
    Applied(Order),
    /// Another writer changed the order's status between the read and the write. Nothing was persisted.
    StaleStatus,
    /// A ledger record for this `(order_id, event_id)` pair already exists. Nothing was persisted.
    DuplicateEvent,
}

/// The highest level of behaviour a backend must expose to support the payment engine: catalog reads for price
/// snapshots, order persistence, the invoice linkage write, and the transition/ledger primitives the reconciler is
/// built on.
#[allow(async_fn_in_trait)]
pub trait PaymentGatewayDatabase: Clone {
    /// The URL of the database.
    fn url(&self) -> &str;

    /// Fetches the catalog entries for the given product ids. Ids with no catalog entry are simply absent from the
    /// result; the order builder decides what to do about them.
    async fn fetch_products(&self, ids: &[String]) -> Result<Vec<Product>, PaymentGatewayError>;

    /// Inserts or replaces a catalog entry. Used for seeding and ops tooling; catalog management proper is not this
    /// engine's concern.
    async fn upsert_product(&self, product: NewProduct) -> Result<Product, PaymentGatewayError>;

    /// Persists a new order in `Pending` state and returns the stored record.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, PaymentGatewayError>;

    async fn fetch_order_by_id(&self, id: &OrderId) -> Result<Option<Order>, PaymentGatewayError>;

    /// Resolves an order by the correlation id that was sent to the provider.
    async fn fetch_order_by_external_id(&self, external_id: &str) -> Result<Option<Order>, PaymentGatewayError>;

    /// Resolves an order by the provider's invoice id. Covers races where an event arrives keyed on the invoice
    /// before the correlation id round-trips.
    async fn fetch_order_by_invoice_id(&self, invoice_id: &str) -> Result<Option<Order>, PaymentGatewayError>;

    /// Stores the provider invoice id and URL against the order, guarded by the issuer precondition: the order must
    /// still be `Pending` with no invoice attached. Returns the updated order, or `None` if another actor already
    /// attached an invoice (the write is then a no-op; last-writer-wins would mint duplicate invoices).
    async fn attach_invoice(
        &self,
        id: &OrderId,
        invoice_id: &str,
        invoice_url: &str,
    ) -> Result<Option<Order>, PaymentGatewayError>;

    /// Returns true if the idempotency ledger already holds a record for this `(order_id, event_id)` pair.
    async fn payment_record_exists(&self, id: &OrderId, event_id: &str) -> Result<bool, PaymentGatewayError>;

    /// Applies a [`StatusUpdate`] atomically. See [`TransitionOutcome`] for the three possible results; only
    /// `Applied` mutates the store.
    async fn commit_transition(&self, update: StatusUpdate) -> Result<TransitionOutcome, PaymentGatewayError>;

    /// Overwrites the order's raw provider payload without touching anything else. Used for events that do not
    /// cause a transition but must still be kept for audit completeness.
    async fn archive_event_payload(&self, id: &OrderId, payload: &Value) -> Result<(), PaymentGatewayError>;

    /// The full, append-only ledger for an order, oldest first.
    async fn fetch_payment_records(&self, id: &OrderId) -> Result<Vec<PaymentRecord>, PaymentGatewayError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), PaymentGatewayError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum PaymentGatewayError {
    #[error("We have an internal database engine error (configuration/uptime etc.): {0}")]
    DatabaseError(String),
    #[error("Cannot create order. {0}")]
    InvalidOrder(String),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("No order matches the provider event with correlation id '{0}'")]
    UnmatchedEvent(String),
    #[error("The requested order change would result in a no-op.")]
    OrderModificationNoOp,
    #[error("Order {0} was modified concurrently and the transition could not be applied")]
    StaleOrderState(OrderId),
}

impl From<sqlx::Error> for PaymentGatewayError {
    fn from(e: sqlx::Error) -> Self {
        PaymentGatewayError::DatabaseError(e.to_string())
    }
}
