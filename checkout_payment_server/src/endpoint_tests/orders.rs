use actix_web::{http::StatusCode, test::TestRequest};
use checkout_payment_engine::db_types::{CartItem, PaymentType};
use checkout_payment_engine::PaymentGatewayDatabase;
use serde_json::json;

use crate::endpoint_tests::helpers::{obtain_token, orders_api, prepare_database, send_request, test_config};

#[actix_web::test]
async fn status_queries_reflect_the_stored_order() {
    let db = prepare_database().await;
    let api = orders_api(db.clone());
    let order = api.create_order(vec![CartItem::new("prodA", 2), CartItem::new("prodB", 1)], None).await.unwrap();

    let req = TestRequest::get().uri(&format!("/api/checkout/{}", order.id.as_str()));
    let (status, body) = send_request(db, test_config(), req).await;
    assert_eq!(status, StatusCode::OK);
    let value: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value["status"], "PENDING");
    assert_eq!(value["total"], 250_000);
    // The raw provider payload never leaves the store through this route.
    assert!(value.get("raw_provider_payload").is_none());
}

#[actix_web::test]
async fn unknown_orders_are_not_found() {
    let db = prepare_database().await;
    let req = TestRequest::get().uri("/api/checkout/ffffffffffffffffffffffff");
    let (status, body) = send_request(db, test_config(), req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("not_found"), "unexpected body: {body}");
}

#[actix_web::test]
async fn overrides_require_an_access_token() {
    let db = prepare_database().await;
    let api = orders_api(db.clone());
    let order = api.create_order(vec![CartItem::new("prodA", 1)], None).await.unwrap();

    let req = TestRequest::post()
        .uri(&format!("/api/admin/orders/{}/status", order.id.as_str()))
        .set_json(json!({ "status": "PAID" }));
    let (status, _) = send_request(db.clone(), test_config(), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A garbage token is just as useless.
    let req = TestRequest::post()
        .uri(&format!("/api/admin/orders/{}/status", order.id.as_str()))
        .insert_header(("Authorization", "Bearer not-a-real-token"))
        .set_json(json!({ "status": "PAID" }));
    let (status, _) = send_request(db.clone(), test_config(), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // And nothing was mutated along the way.
    let stored = api.fetch_order(&order.id).await.unwrap();
    assert_eq!(stored.status.to_string(), "Pending");
    assert!(db.fetch_payment_records(&order.id).await.unwrap().is_empty());
}

#[actix_web::test]
async fn a_wrong_api_key_cannot_obtain_a_token() {
    let db = prepare_database().await;
    let req = TestRequest::post().uri("/auth").set_json(json!({ "api_key": "wrong-key", "operator": "mallory" }));
    let (status, _) = send_request(db, test_config(), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn an_authenticated_override_is_applied_and_audited() {
    let db = prepare_database().await;
    let config = test_config();
    let api = orders_api(db.clone());
    let order = api.create_order(vec![CartItem::new("prodA", 1)], None).await.unwrap();

    let token = obtain_token(db.clone(), config.clone(), "budi").await;
    let req = TestRequest::post()
        .uri(&format!("/api/admin/orders/{}/status", order.id.as_str()))
        .insert_header(("Authorization", format!("Bearer {token}")))
        .set_json(json!({ "status": "PAID" }));
    let (status, body) = send_request(db.clone(), config, req).await;
    assert_eq!(status, StatusCode::OK, "override failed: {body}");
    let value: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value["status"], "PAID");

    let records = db.fetch_payment_records(&order.id).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].payment_type, PaymentType::Manual);
    assert!(records[0].event_id.starts_with("manual_budi_"));
}
