use sqlx::{types::Json, SqliteConnection};

use crate::{
    db_types::{OrderId, PaymentRecord},
    traits::{PaymentGatewayError, StatusUpdate},
};

/// Appends a ledger record for the given transition. Returns `false` when the unique `(order_id, event_id)` index
/// already holds a record, i.e. the transition raced a duplicate of itself.
pub async fn ledger_insert(update: &StatusUpdate, conn: &mut SqliteConnection) -> Result<bool, PaymentGatewayError> {
    let result = sqlx::query(
        r#"
            INSERT INTO payments (order_id, event_id, amount, status, payment_type, raw_payload)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (order_id, event_id) DO NOTHING;
        "#,
    )
    .bind(update.order_id.as_str())
    .bind(&update.event_id)
    .bind(update.amount.value())
    .bind(update.new_status.to_string())
    .bind(update.payment_type.to_string())
    .bind(Json(update.raw_payload.clone()))
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn record_exists(
    order_id: &OrderId,
    event_id: &str,
    conn: &mut SqliteConnection,
) -> Result<bool, PaymentGatewayError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE order_id = $1 AND event_id = $2")
        .bind(order_id.as_str())
        .bind(event_id)
        .fetch_one(conn)
        .await?;
    Ok(count > 0)
}

/// The full ledger for an order, oldest first.
pub async fn fetch_for_order(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<PaymentRecord>, PaymentGatewayError> {
    let records = sqlx::query_as("SELECT * FROM payments WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(records)
}
