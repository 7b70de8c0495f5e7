use chrono::{DateTime, Utc};
use cpg_common::Rupiah;
use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderId, OrderStatus};

/// The consumer-facing view of an order. Deliberately excludes the raw provider payload: that blob is for the audit
/// trail, never for payers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResult {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub total: Rupiah,
    pub invoice_url: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Order> for OrderResult {
    fn from(order: Order) -> Self {
        Self {
            order_id: order.id,
            status: order.status,
            total: order.total,
            invoice_url: order.invoice_url,
            paid_at: order.paid_at,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}
