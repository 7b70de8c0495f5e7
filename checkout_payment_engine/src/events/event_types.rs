use crate::db_types::Order;

/// Emitted after a reconciliation (automated or manual) lands an order in `Paid`. Subscribers receive a snapshot of
/// the order as it was at the moment of the transition.
#[derive(Debug, Clone)]
pub struct OrderPaidEvent {
    pub order: Order,
}

impl OrderPaidEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}
