//! A thin client for the Xendit invoice API.
//!
//! The payment server uses exactly one provider capability: creating a hosted invoice for an order. This crate
//! wraps that call (and the configuration it needs) so the server never speaks HTTP to the provider directly.
mod api;
mod config;
mod error;

mod data_objects;

pub use api::XenditApi;
pub use config::XenditConfig;
pub use data_objects::{Invoice, InvoiceItem, InvoiceRequest};
pub use error::XenditApiError;
