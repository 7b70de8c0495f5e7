use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use cpg_common::Rupiah;
use log::error;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{types::Json, FromRow, Type};
use thiserror::Error;

//--------------------------------------        OrderId        -------------------------------------------------------
/// An opaque, unique order identifier. Assigned once by the order builder and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    /// Generates a fresh 24-character hex id.
    pub fn new_random() -> Self {
        let bytes: [u8; 12] = rand::thread_rng().gen();
        Self(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//--------------------------------------      OrderStatus      -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// The order has been created; no settled payment has been matched to it yet.
    Pending,
    /// The provider reported the payment as received in full.
    Paid,
    /// The provider declared the hosted invoice expired before payment.
    Expired,
    /// The order was explicitly cancelled.
    Cancelled,
}

impl OrderStatus {
    /// Terminal states never change again through automated provider events. Only an administrative override may
    /// move an order out of a terminal state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "Pending"),
            OrderStatus::Paid => write!(f, "Paid"),
            OrderStatus::Expired => write!(f, "Expired"),
            OrderStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid order status: {0}")]
pub struct ConversionError(String);

impl FromStr for OrderStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" | "PENDING" => Ok(Self::Pending),
            "Paid" | "PAID" => Ok(Self::Paid),
            "Expired" | "EXPIRED" => Ok(Self::Expired),
            "Cancelled" | "CANCELLED" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl From<String> for OrderStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to Pending");
            OrderStatus::Pending
        })
    }
}

//--------------------------------------       LineItem        -------------------------------------------------------
/// A single order line. Name and unit price are snapshots taken from the catalog at order-creation time; they are
/// never re-read afterwards, so an order's total stays reproducible from its own items even when the catalog
/// changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: String,
    pub name: String,
    pub price: Rupiah,
    pub qty: i64,
}

impl LineItem {
    /// `None` when `price * qty` does not fit in the money type. Quantities come straight from the shopper's cart,
    /// so this is reachable from consumer input and must not wrap.
    pub fn subtotal(&self) -> Option<Rupiah> {
        self.price.checked_mul(self.qty)
    }
}

//--------------------------------------       CartItem        -------------------------------------------------------
/// An unresolved cart entry as submitted by a shopper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: String,
    #[serde(default)]
    pub qty: Option<i64>,
}

impl CartItem {
    pub fn new<S: Into<String>>(product_id: S, qty: i64) -> Self {
        Self { product_id: product_id.into(), qty: Some(qty) }
    }
}

//--------------------------------------        Order          -------------------------------------------------------
/// The checkout aggregate. Immutable after creation apart from status, invoice linkage, `paid_at` and the raw
/// provider payload kept for audit.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub items: Json<Vec<LineItem>>,
    pub total: Rupiah,
    pub status: OrderStatus,
    /// The correlation id sent to the provider at invoice creation, `checkout_<order-id>`.
    pub external_id: String,
    pub invoice_id: Option<String>,
    pub invoice_url: Option<String>,
    pub payer_email: Option<String>,
    /// Set exactly once, on the first transition into `Paid`.
    pub paid_at: Option<DateTime<Utc>>,
    /// The last raw provider payload processed for this order. Overwritten on every processed event.
    pub raw_provider_payload: Option<Json<Value>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn items(&self) -> &[LineItem] {
        &self.items.0
    }
}

//--------------------------------------       NewOrder        -------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: OrderId,
    pub items: Vec<LineItem>,
    /// The order total. Computed here, once, from the item snapshots, and never recomputed anywhere else.
    pub total: Rupiah,
    pub external_id: String,
    pub payer_email: Option<String>,
}

/// The order's item subtotals, or their sum, exceed what the money type can hold.
#[derive(Debug, Clone, Error)]
#[error("The order total overflows the money type")]
pub struct TotalOverflow;

impl NewOrder {
    /// Builds a new order from resolved line items. This is the sole place the total is computed; the arithmetic
    /// is checked, so an absurd quantity is an error here rather than a wrapped total in the store.
    pub fn new(items: Vec<LineItem>, payer_email: Option<String>) -> Result<Self, TotalOverflow> {
        let id = OrderId::new_random();
        let external_id = format!("checkout_{}", id.as_str());
        let total = items
            .iter()
            .try_fold(Rupiah::default(), |acc, item| item.subtotal().and_then(|s| acc.checked_add(s)))
            .ok_or(TotalOverflow)?;
        Ok(Self { id, items, total, external_id, payer_email })
    }
}

//--------------------------------------      PaymentType      -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentType {
    /// The record was produced by an automated provider event.
    Provider,
    /// The record was produced by an administrative override.
    Manual,
}

impl Display for PaymentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentType::Provider => write!(f, "Provider"),
            PaymentType::Manual => write!(f, "Manual"),
        }
    }
}

//--------------------------------------     PaymentRecord     -------------------------------------------------------
/// One row of the append-only idempotency ledger. A record exists for every committed money event, state-changing
/// or not, keyed uniquely on `(order_id, event_id)`, and doubles as the audit trail. Never updated or deleted.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PaymentRecord {
    pub id: i64,
    pub order_id: OrderId,
    /// The provider's event id, or a `manual_<operator>_<timestamp>` marker for overrides.
    pub event_id: String,
    pub amount: Rupiah,
    /// The order status that resulted from this transition.
    pub status: OrderStatus,
    pub payment_type: PaymentType,
    pub raw_payload: Json<Value>,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------       Product         -------------------------------------------------------
/// A catalog entry. Catalog management proper lives outside this core; the engine only reads products to snapshot
/// prices, plus an upsert used for seeding.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price: Rupiah,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub id: String,
    pub name: String,
    pub price: Rupiah,
}

impl NewProduct {
    pub fn new<S: Into<String>>(id: S, name: S, price: Rupiah) -> Self {
        Self { id: id.into(), name: name.into(), price }
    }
}
