use actix_web::{http::StatusCode, test::TestRequest};
use checkout_payment_engine::db_types::{CartItem, Order, OrderStatus};
use checkout_payment_engine::{PaymentGatewayDatabase, SqliteDatabase};
use serde_json::json;

use crate::endpoint_tests::helpers::{orders_api, prepare_database, send_request, test_config, TEST_CALLBACK_TOKEN};

async fn pending_order(db: &SqliteDatabase) -> Order {
    let api = orders_api(db.clone());
    api.create_order(vec![CartItem::new("prodA", 2), CartItem::new("prodB", 1)], None).await.unwrap()
}

fn paid_payload(order: &Order) -> serde_json::Value {
    json!({
        "id": "evt1",
        "external_id": order.external_id,
        "status": "PAID",
        "amount": 250_000,
        "paid_at": "2024-06-01T10:00:00Z",
    })
}

#[actix_web::test]
async fn deliveries_without_the_token_touch_nothing() {
    let db = prepare_database().await;
    let order = pending_order(&db).await;

    let req = TestRequest::post().uri("/webhook/xendit").set_json(paid_payload(&order));
    let (status, _) = send_request(db.clone(), test_config(), req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let req = TestRequest::post()
        .uri("/webhook/xendit")
        .insert_header(("x-callback-token", "wrong-token"))
        .set_json(paid_payload(&order));
    let (status, _) = send_request(db.clone(), test_config(), req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Rejected before any lookup: no state change, no ledger record.
    let stored = db.fetch_order_by_id(&order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Pending);
    assert!(db.fetch_payment_records(&order.id).await.unwrap().is_empty());
}

#[actix_web::test]
async fn an_authenticated_paid_event_reconciles_the_order() {
    let db = prepare_database().await;
    let order = pending_order(&db).await;

    let req = TestRequest::post()
        .uri("/webhook/xendit")
        .insert_header(("x-callback-token", TEST_CALLBACK_TOKEN))
        .set_json(paid_payload(&order));
    let (status, body) = send_request(db.clone(), test_config(), req).await;
    assert_eq!(status, StatusCode::OK, "webhook failed: {body}");

    let stored = db.fetch_order_by_id(&order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Paid);
    assert!(stored.paid_at.is_some());
    assert_eq!(db.fetch_payment_records(&order.id).await.unwrap().len(), 1);

    // Redelivery is acknowledged and changes nothing.
    let req = TestRequest::post()
        .uri("/webhook/xendit")
        .insert_header(("x-callback-token", TEST_CALLBACK_TOKEN))
        .set_json(paid_payload(&order));
    let (status, _) = send_request(db.clone(), test_config(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(db.fetch_payment_records(&order.id).await.unwrap().len(), 1);
}

#[actix_web::test]
async fn malformed_bodies_are_a_bad_request() {
    let db = prepare_database().await;

    let req = TestRequest::post()
        .uri("/webhook/xendit")
        .insert_header(("x-callback-token", TEST_CALLBACK_TOKEN))
        .set_payload("this is not json");
    let (status, body) = send_request(db.clone(), test_config(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("malformed_event"), "unexpected body: {body}");

    // Parseable JSON that lacks the fields needed for matching and deduplication is just as unusable.
    let req = TestRequest::post()
        .uri("/webhook/xendit")
        .insert_header(("x-callback-token", TEST_CALLBACK_TOKEN))
        .set_json(json!({ "status": "PAID" }));
    let (status, body) = send_request(db, test_config(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("malformed_event"), "unexpected body: {body}");
}

#[actix_web::test]
async fn unmatched_events_are_acknowledged_without_mutation() {
    let db = prepare_database().await;
    let order = pending_order(&db).await;

    let req = TestRequest::post().uri("/webhook/xendit").insert_header(("x-callback-token", TEST_CALLBACK_TOKEN)).set_json(
        json!({
            "id": "evt9",
            "external_id": "checkout_we_never_issued_this",
            "status": "PAID",
            "amount": 250_000,
        }),
    );
    let (status, _) = send_request(db.clone(), test_config(), req).await;
    assert_eq!(status, StatusCode::OK);

    let stored = db.fetch_order_by_id(&order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Pending);
    assert!(db.fetch_payment_records(&order.id).await.unwrap().is_empty());
}
