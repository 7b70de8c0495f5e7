use std::fmt::Debug;

use chrono::Utc;
use log::*;
use serde_json::json;

use crate::{
    db_types::{CartItem, LineItem, NewOrder, Order, OrderId, OrderStatus, PaymentType},
    events::{EventProducers, OrderPaidEvent},
    provider_types::{ProviderEvent, StatusMapping},
    traits::{PaymentGatewayDatabase, PaymentGatewayError, StatusUpdate, TransitionOutcome},
};

/// The result of feeding one provider event through the reconciler.
#[derive(Debug, Clone)]
pub enum ReconcileOutcome {
    /// The event caused a state transition. `previous` is the status the order held before it.
    Reconciled { order: Order, previous: OrderStatus },
    /// The ledger already held a record for this event id; nothing was mutated.
    Duplicate { order: Order },
    /// The event caused no status transition. Mapped events (a recognized money status landing on an order that is
    /// already there, or terminal) are still appended to the ledger; unmapped statuses only have their raw payload
    /// archived against the order for audit completeness.
    Archived { order: Order },
}

/// `OrderFlowApi` is the primary API for the order lifecycle: building orders from carts, linking provider
/// invoices, reconciling provider events against order state, serving status queries, and applying audited
/// administrative overrides.
pub struct OrderFlowApi<B> {
    db: B,
    mapping: StatusMapping,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, mapping: StatusMapping, producers: EventProducers) -> Self {
        Self { db, mapping, producers }
    }
}

impl<B> OrderFlowApi<B>
where B: PaymentGatewayDatabase
{
    /// Builds and persists a new order from a shopper's cart.
    ///
    /// Each cart entry is resolved against the catalog. Entries that do not resolve are dropped (with a warning),
    /// not treated as errors; a missing or non-positive quantity defaults to 1. Name and unit price are snapshotted
    /// into the order's line items, and the total is computed here, once, with checked arithmetic. If nothing in
    /// the cart resolves to a positive total, or a quantity pushes the total past what the money type can hold, no
    /// order is persisted and `InvalidOrder` is returned.
    pub async fn create_order(
        &self,
        cart: Vec<CartItem>,
        payer_email: Option<String>,
    ) -> Result<Order, PaymentGatewayError> {
        let ids = cart.iter().map(|i| i.product_id.clone()).collect::<Vec<_>>();
        let products = self.db.fetch_products(&ids).await?;
        let mut items = Vec::with_capacity(cart.len());
        for entry in cart {
            match products.iter().find(|p| p.id == entry.product_id) {
                Some(product) => {
                    let qty = entry.qty.filter(|q| *q > 0).unwrap_or(1);
                    items.push(LineItem {
                        product_id: product.id.clone(),
                        name: product.name.clone(),
                        price: product.price,
                        qty,
                    });
                },
                None => {
                    warn!("🧾️ Dropping unknown product '{}' from cart", entry.product_id);
                },
            }
        }
        let order =
            NewOrder::new(items, payer_email).map_err(|e| PaymentGatewayError::InvalidOrder(e.to_string()))?;
        if !order.total.is_positive() {
            return Err(PaymentGatewayError::InvalidOrder("No valid items to process".to_string()));
        }
        let order = self.db.insert_order(order).await?;
        info!("🧾️ Order {} created with total {} ({} items)", order.id, order.total, order.items().len());
        Ok(order)
    }

    /// Stores the provider invoice id and URL for an order, guarded by the issuer precondition (`Pending`, no
    /// invoice attached yet). Losing that race is a logged no-op: issuing a second invoice for the same order is
    /// exactly what the guard exists to prevent.
    pub async fn attach_invoice(
        &self,
        id: &OrderId,
        invoice_id: &str,
        invoice_url: &str,
    ) -> Result<Order, PaymentGatewayError> {
        match self.db.attach_invoice(id, invoice_id, invoice_url).await? {
            Some(order) => {
                debug!("🧾️ Invoice {invoice_id} attached to order {id}");
                Ok(order)
            },
            None => {
                warn!("🧾️ Order {id} already has an invoice (or is no longer pending). Skipping invoice write.");
                self.db.fetch_order_by_id(id).await?.ok_or_else(|| PaymentGatewayError::OrderNotFound(id.clone()))
            },
        }
    }

    /// Reconciles one normalized provider event against order state. This is the core state machine.
    ///
    /// 1. Resolve the order by correlation id, falling back to the provider invoice id. No match is
    ///    [`PaymentGatewayError::UnmatchedEvent`]; the webhook route still acknowledges the delivery so the
    ///    provider does not retry an event that can never be applied.
    /// 2. Consult the idempotency ledger for `(order, event_id)`; a hit means a duplicate delivery, which returns
    ///    without touching anything.
    /// 3. Map the provider status through the configured [`StatusMapping`]. Unmapped statuses only archive the raw
    ///    payload. Mapped statuses that cannot move the order (terminal order, or the order is already there) are
    ///    committed as record-only updates: the status stays put, but a ledger record is still appended so every
    ///    money event leaves an audit entry and a redelivery of it dedupes in step 2.
    /// 4. Apply the update with a compare-and-swap on the status read in step 1. Losing the race retries the
    ///    whole algorithm once from step 1; losing again surfaces [`PaymentGatewayError::StaleOrderState`] and the
    ///    provider's redelivery acts as the outer retry.
    /// 5. A committed update sets `paid_at` exactly once (first arrival in `Paid`, never overwritten), appends a
    ///    ledger record, and overwrites the raw payload. The paid hook fires only on an actual transition into
    ///    `Paid`, after the transaction commits.
    pub async fn process_provider_event(&self, event: ProviderEvent) -> Result<ReconcileOutcome, PaymentGatewayError> {
        let mut last_seen = None;
        for attempt in 0..2 {
            let order = self.resolve_order(&event).await?;
            trace!(
                "🔄️ Event [{}] resolved to order {} (status {}, attempt {attempt})",
                event.event_id,
                order.id,
                order.status
            );
            if self.db.payment_record_exists(&order.id, &event.event_id).await? {
                debug!("🔄️ Event [{}] for order {} is a duplicate delivery. No-op.", event.event_id, order.id);
                return Ok(ReconcileOutcome::Duplicate { order });
            }
            let target = match self.mapping.target_for(&event.provider_status) {
                Some(t) => t,
                None => {
                    debug!(
                        "🔄️ Provider status '{}' does not map to a transition. Archiving event [{}] against order \
                         {}.",
                        event.provider_status, event.event_id, order.id
                    );
                    return self.archive(order, &event).await;
                },
            };
            // A mapped event that cannot move the order still commits as a record-only update so the ledger stays
            // a complete audit of money events.
            let effective = if order.status.is_terminal() || target == order.status { order.status } else { target };
            let update = StatusUpdate {
                order_id: order.id.clone(),
                expected: order.status,
                new_status: effective,
                event_id: event.event_id.clone(),
                amount: event.amount,
                paid_at: event.paid_at.unwrap_or_else(Utc::now),
                payment_type: PaymentType::Provider,
                raw_payload: event.raw.clone(),
            };
            match self.db.commit_transition(update).await? {
                TransitionOutcome::Applied(updated) => {
                    if updated.status == order.status {
                        debug!(
                            "🔄️ Order {} is {} and event [{}] targets {target:?}. Recorded without transition.",
                            updated.id, updated.status, event.event_id
                        );
                        return Ok(ReconcileOutcome::Archived { order: updated });
                    }
                    info!(
                        "🔄️ Order {} reconciled: {} -> {} (event [{}])",
                        updated.id, order.status, updated.status, event.event_id
                    );
                    if updated.status == OrderStatus::Paid {
                        self.call_order_paid_hook(&updated).await;
                    }
                    return Ok(ReconcileOutcome::Reconciled { order: updated, previous: order.status });
                },
                TransitionOutcome::DuplicateEvent => {
                    debug!("🔄️ Event [{}] raced its own duplicate on order {}. No-op.", event.event_id, order.id);
                    return Ok(ReconcileOutcome::Duplicate { order });
                },
                TransitionOutcome::StaleStatus => {
                    debug!(
                        "🔄️ Lost the status race on order {} (event [{}]). Re-reading.",
                        order.id, event.event_id
                    );
                    last_seen = Some(order.id.clone());
                },
            }
        }
        // Two CAS losses in a row. The provider's redelivery will self-heal this.
        let id = last_seen.unwrap_or_else(|| OrderId::from(event.external_id.clone()));
        Err(PaymentGatewayError::StaleOrderState(id))
    }

    /// Pure read of the current order record. Used by payer polling and admin tooling; reflects the latest
    /// committed write because reads and writes share the same store.
    pub async fn fetch_order(&self, id: &OrderId) -> Result<Order, PaymentGatewayError> {
        self.db.fetch_order_by_id(id).await?.ok_or_else(|| PaymentGatewayError::OrderNotFound(id.clone()))
    }

    /// Moves an order to an arbitrary status on behalf of an authenticated operator.
    ///
    /// Unlike automated reconciliation, an override may leave a terminal state. Every state change is written to
    /// the ledger as a `Manual` record whose event id names the operator, so the audit trail is complete. A
    /// transition to the order's current status is rejected as a no-op. The first manual transition into `Paid`
    /// sets `paid_at` (and never overwrites an earlier value) and fires the paid hook.
    pub async fn override_order_status(
        &self,
        id: &OrderId,
        new_status: OrderStatus,
        operator: &str,
    ) -> Result<Order, PaymentGatewayError> {
        let order = self.fetch_order(id).await?;
        if order.status == new_status {
            return Err(PaymentGatewayError::OrderModificationNoOp);
        }
        let event_id = format!("manual_{operator}_{}", Utc::now().timestamp_micros());
        let update = StatusUpdate {
            order_id: order.id.clone(),
            expected: order.status,
            new_status,
            event_id,
            amount: order.total,
            paid_at: Utc::now(),
            payment_type: PaymentType::Manual,
            raw_payload: json!({
                "manual_override": true,
                "operator": operator,
                "from": order.status,
                "to": new_status,
            }),
        };
        match self.db.commit_transition(update).await? {
            TransitionOutcome::Applied(updated) => {
                info!(
                    "🛠️ Operator '{operator}' moved order {} from {} to {}",
                    updated.id, order.status, updated.status
                );
                if updated.status == OrderStatus::Paid {
                    self.call_order_paid_hook(&updated).await;
                }
                Ok(updated)
            },
            _ => Err(PaymentGatewayError::StaleOrderState(order.id)),
        }
    }

    async fn resolve_order(&self, event: &ProviderEvent) -> Result<Order, PaymentGatewayError> {
        if let Some(order) = self.db.fetch_order_by_external_id(&event.external_id).await? {
            return Ok(order);
        }
        if let Some(invoice_id) = event.invoice_id.as_deref() {
            if let Some(order) = self.db.fetch_order_by_invoice_id(invoice_id).await? {
                return Ok(order);
            }
        }
        Err(PaymentGatewayError::UnmatchedEvent(event.external_id.clone()))
    }

    async fn archive(&self, order: Order, event: &ProviderEvent) -> Result<ReconcileOutcome, PaymentGatewayError> {
        self.db.archive_event_payload(&order.id, &event.raw).await?;
        Ok(ReconcileOutcome::Archived { order })
    }

    async fn call_order_paid_hook(&self, order: &Order) {
        for emitter in &self.producers.order_paid_producer {
            debug!("🔄️📬️ Notifying order paid hook subscribers for {}", order.id);
            let event = OrderPaidEvent::new(order.clone());
            emitter.publish_event(event).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}
