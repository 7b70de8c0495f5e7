//! Checkout Payment Engine
//!
//! The engine turns a cart of catalog items into an immutable order record and reconciles that order against
//! asynchronous payment-provider callbacks that may arrive late, out of order, duplicated, or not at all. It is the
//! single source of truth for "has this order been paid".
//!
//! The library is divided into two main sections:
//! 1. Database management and control ([`mod@sqlite`]). The durable store is abstracted behind the
//!    [`traits::PaymentGatewayDatabase`] trait; SQLite is the supported backend. You should never need to access the
//!    database directly. The exception is the data types used in the database, which are defined in the
//!    [`db_types`] module and are public.
//! 2. The order flow API ([`OrderFlowApi`]). This is the public-facing functionality of the engine: building orders,
//!    reconciling provider events, querying order status, and the audited administrative override.
//!
//! The engine also provides a set of events that can be subscribed to. When an order transitions into `Paid`, an
//! `OrderPaidEvent` is emitted. A simple actor framework lets you hook into these events for best-effort side
//! effects (operator notifications and the like) without ever blocking the reconciliation path.
pub mod db_types;
pub mod events;
mod flow_api;
pub mod provider_types;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;

pub use flow_api::{order_objects, OrderFlowApi, ReconcileOutcome};
pub use traits::{PaymentGatewayDatabase, PaymentGatewayError, StatusUpdate, TransitionOutcome};
