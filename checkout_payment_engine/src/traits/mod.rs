//! Database backend contracts.
//!
//! The durable store is abstract: a document store with per-document atomic compare-and-swap and a native
//! "insert if absent" on the idempotency ledger key. [`PaymentGatewayDatabase`] is the whole of that contract;
//! backends implement it and everything above (the order flow, the server routes) is backend-agnostic.
mod payment_gateway_database;

pub use payment_gateway_database::{PaymentGatewayDatabase, PaymentGatewayError, StatusUpdate, TransitionOutcome};
