use std::sync::{atomic::AtomicI32, Arc};

use checkout_payment_engine::{
    db_types::{CartItem, NewProduct, OrderStatus},
    events::{EventHandlers, EventHooks},
    provider_types::{ProviderEvent, StatusMapping},
    OrderFlowApi,
    PaymentGatewayDatabase,
};
use cpg_common::Rupiah;
use futures_util::FutureExt;
use log::*;
use serde_json::json;
use tokio::runtime::Runtime;

mod support;

use support::{
    prepare_env::{prepare_test_env, random_db_path},
    tear_down,
};

#[derive(Default, Clone)]
struct HookCalled {
    called: Arc<AtomicI32>,
}

impl HookCalled {
    pub fn called(&self) {
        let _ = self.called.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    }

    pub fn count(&self) -> i32 {
        self.called.load(std::sync::atomic::Ordering::Relaxed)
    }
}

#[test]
fn on_order_paid() {
    let event = HookCalled::default();
    let event_copy = event.clone();
    let rt = Runtime::new().unwrap();
    rt.block_on(async move {
        let url = random_db_path();
        let db = prepare_test_env(&url).await;

        let mut hooks = EventHooks::default();
        hooks.on_order_paid(move |ev| {
            info!("🪝️ Order {} was paid", ev.order.id);
            event_copy.called();
            async {}.boxed()
        });
        let handlers = EventHandlers::new(10, hooks);
        let producers = handlers.producers();
        handlers.start_handlers().await;

        let api = OrderFlowApi::new(db, StatusMapping::default(), producers);
        api.db().upsert_product(NewProduct::new("prodA", "Kopi Gayo", Rupiah::from(100_000))).await.unwrap();
        let order = api.create_order(vec![CartItem::new("prodA", 1)], None).await.unwrap();

        // An archived event must not fire the hook; a paid transition must.
        let pending = json!({"id": "evt0", "external_id": order.external_id, "status": "AWAITING_CAPTURE"});
        api.process_provider_event(ProviderEvent::from_payload(pending).unwrap()).await.unwrap();
        let paid = json!({"id": "evt1", "external_id": order.external_id, "status": "PAID", "amount": 100_000});
        api.process_provider_event(ProviderEvent::from_payload(paid).unwrap()).await.unwrap();

        // A manual override into Paid from a non-paid state fires it too.
        api.override_order_status(&order.id, OrderStatus::Cancelled, "budi").await.unwrap();
        api.override_order_status(&order.id, OrderStatus::Paid, "budi").await.unwrap();

        // Delivery is asynchronous; give the handler tasks a moment to drain.
        for _ in 0..50 {
            if event.count() >= 2 {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
        }
        assert_eq!(event.count(), 2);

        tear_down(api).await;
    });
    info!("🪝️ test complete");
}
