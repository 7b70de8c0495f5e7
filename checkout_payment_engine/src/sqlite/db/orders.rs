use log::{debug, trace};
use serde_json::Value;
use sqlx::{types::Json, SqliteConnection};

use crate::{
    db_types::{NewOrder, Order, OrderId},
    traits::{PaymentGatewayError, StatusUpdate},
};

/// Inserts a new order in `Pending` state using the given connection. This is not atomic on its own. You can embed
/// this call inside a transaction if you need atomicity, and pass `&mut *tx` as the connection argument.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, PaymentGatewayError> {
    let inserted = sqlx::query_as(
        r#"
            INSERT INTO orders (
                id,
                items,
                total,
                external_id,
                payer_email
            ) VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(order.id)
    .bind(Json(order.items))
    .bind(order.total.value())
    .bind(order.external_id)
    .bind(order.payer_email)
    .fetch_one(conn)
    .await?;
    Ok(inserted)
}

pub async fn fetch_order_by_id(id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

/// Resolves an order by the correlation id handed to the provider (`checkout_<order-id>`).
pub async fn fetch_order_by_external_id(
    external_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order =
        sqlx::query_as("SELECT * FROM orders WHERE external_id = $1").bind(external_id).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_by_invoice_id(
    invoice_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order =
        sqlx::query_as("SELECT * FROM orders WHERE invoice_id = $1").bind(invoice_id).fetch_optional(conn).await?;
    Ok(order)
}

/// Writes the provider invoice linkage, guarded by the issuer precondition. The `WHERE` clause is the guard: the
/// write only lands while the order is still `Pending` with no invoice attached, so a racing second issuer becomes
/// a no-op (`None`) instead of a duplicate invoice.
pub async fn attach_invoice(
    id: &OrderId,
    invoice_id: &str,
    invoice_url: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, PaymentGatewayError> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders
            SET invoice_id = $1, invoice_url = $2, updated_at = CURRENT_TIMESTAMP
            WHERE id = $3 AND status = 'Pending' AND invoice_id IS NULL
            RETURNING *;
        "#,
    )
    .bind(invoice_id)
    .bind(invoice_url)
    .bind(id.as_str())
    .fetch_optional(conn)
    .await?;
    trace!("📝️ attach_invoice for {id}: {}", if order.is_some() { "written" } else { "skipped" });
    Ok(order)
}

/// The compare-and-swap half of a [`StatusUpdate`]. The status predicate in the `WHERE` clause makes concurrent
/// writers race-safe: whoever ran second sees zero rows and gets `None` back. `paid_at` is written through
/// `COALESCE` so the first transition into `Paid` sets it exactly once and later transitions never overwrite it.
pub async fn try_update_status(
    update: &StatusUpdate,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, PaymentGatewayError> {
    let order: Option<Order> = sqlx::query_as(
        r#"
            UPDATE orders
            SET status = $1,
                paid_at = CASE WHEN $1 = 'Paid' THEN COALESCE(paid_at, $2) ELSE paid_at END,
                raw_provider_payload = $3,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $4 AND status = $5
            RETURNING *;
        "#,
    )
    .bind(update.new_status.to_string())
    .bind(update.paid_at)
    .bind(Json(update.raw_payload.clone()))
    .bind(update.order_id.as_str())
    .bind(update.expected.to_string())
    .fetch_optional(conn)
    .await?;
    if order.is_none() {
        debug!(
            "📝️ CAS miss on order {}: expected status {} was gone by write time",
            update.order_id, update.expected
        );
    }
    Ok(order)
}

/// Overwrites the order's raw provider payload for audit completeness, leaving everything else untouched.
pub async fn archive_event_payload(
    id: &OrderId,
    payload: &Value,
    conn: &mut SqliteConnection,
) -> Result<(), PaymentGatewayError> {
    sqlx::query("UPDATE orders SET raw_provider_payload = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2")
        .bind(Json(payload.clone()))
        .bind(id.as_str())
        .execute(conn)
        .await?;
    Ok(())
}
