use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json;

use crate::endpoint_tests::helpers::{prepare_database, send_request, test_config};

#[actix_web::test]
async fn health_check() {
    let db = prepare_database().await;
    let (status, body) = send_request(db, test_config(), TestRequest::get().uri("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}

#[actix_web::test]
async fn empty_carts_are_rejected() {
    let db = prepare_database().await;
    let req = TestRequest::post().uri("/api/checkout").set_json(json!({ "items": [] }));
    let (status, body) = send_request(db, test_config(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("empty_cart"), "unexpected body: {body}");
}

#[actix_web::test]
async fn carts_with_no_valid_items_are_rejected() {
    let db = prepare_database().await;
    let req = TestRequest::post()
        .uri("/api/checkout")
        .set_json(json!({ "items": [{ "product_id": "no-such-product", "qty": 2 }] }));
    let (status, body) = send_request(db, test_config(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("invalid_items"), "unexpected body: {body}");
}

#[actix_web::test]
async fn absurd_quantities_are_rejected_not_wrapped() {
    let db = prepare_database().await;
    let req = TestRequest::post()
        .uri("/api/checkout")
        .set_json(json!({ "items": [{ "product_id": "prodA", "qty": 300_000_000_000_000i64 }] }));
    let (status, body) = send_request(db, test_config(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("invalid_items"), "unexpected body: {body}");
}

#[actix_web::test]
async fn provider_failure_is_a_bad_gateway() {
    let db = prepare_database().await;
    let req = TestRequest::post().uri("/api/checkout").set_json(json!({
        "items": [{ "product_id": "prodA", "qty": 2 }, { "product_id": "prodB", "qty": 1 }],
        "payer_email": "alice@example.com",
    }));
    // The test provider endpoint is unreachable, so invoice creation fails. The checkout must surface that as a
    // retryable 502 rather than a success without an invoice.
    let (status, body) = send_request(db, test_config(), req).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body.contains("provider_unavailable"), "unexpected body: {body}");
}
