//! # Checkout payment server
//! This crate hosts the HTTP surface of the checkout payment gateway. It is responsible for:
//! Accepting checkout requests and turning them into orders with hosted provider invoices.
//! Listening for incoming webhook callbacks from the payment provider and feeding them to the reconciler.
//! Serving order status queries and the audited administrative override.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/auth`: Exchanges the admin API key for a short-lived access token.
//! * `/api/checkout`: Creates an order and its hosted invoice.
//! * `/api/checkout/{order_id}`: The status polling route.
//! * `/api/admin/orders/{order_id}/status`: The administrative status override.
//! * `/webhook/xendit`: The provider callback route, guarded by the shared callback token.

pub mod auth;
pub mod config;
pub mod data_objects;
pub mod errors;

pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod webhook_routes;

#[cfg(test)]
mod endpoint_tests;
