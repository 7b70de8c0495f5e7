//! Best-effort WhatsApp notifications via the Fonnte gateway.
//!
//! The notifier subscribes to the engine's paid-order event and sends the operator a WhatsApp message for every
//! order that lands in `Paid`. It runs on the event-handler task, off the webhook-response path, and every failure
//! is swallowed and logged: a down notification gateway must never delay or fail a webhook response, because that
//! would trigger needless provider retries of an already-reconciled event.
use std::sync::Arc;

use checkout_payment_engine::events::EventHooks;
use cpg_common::Secret;
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};
use serde_json::json;
use thiserror::Error;

use crate::config::NotifierConfig;

const FONNTE_SEND_URL: &str = "https://api.fonnte.com/send";

#[derive(Debug, Error)]
pub enum FonnteError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Could not send message: {0}")]
    SendError(String),
    #[error("Message delivery failed. Error {status}. {message}")]
    DeliveryError { status: u16, message: String },
}

#[derive(Clone)]
pub struct FonnteClient {
    client: Arc<Client>,
}

impl FonnteClient {
    pub fn new(token: &Secret<String>) -> Result<Self, FonnteError> {
        let mut headers = HeaderMap::with_capacity(1);
        let val = HeaderValue::from_str(token.reveal().as_str())
            .map_err(|e| FonnteError::Initialization(e.to_string()))?;
        headers.insert("Authorization", val);
        let client =
            Client::builder().default_headers(headers).build().map_err(|e| FonnteError::Initialization(e.to_string()))?;
        Ok(Self { client: Arc::new(client) })
    }

    pub async fn send_message(&self, target: &str, message: &str) -> Result<(), FonnteError> {
        let body = json!({ "target": target, "message": message });
        let response = self
            .client
            .post(FONNTE_SEND_URL)
            .json(&body)
            .send()
            .await
            .map_err(|e| FonnteError::SendError(e.to_string()))?;
        if response.status().is_success() {
            trace!("📱️ WhatsApp message delivered to {target}");
            Ok(())
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| FonnteError::SendError(e.to_string()))?;
            Err(FonnteError::DeliveryError { status, message })
        }
    }
}

/// Normalizes an Indonesian phone number into the international form Fonnte expects: separators stripped, a
/// leading `0` replaced with `62`, and any `+` dropped.
pub fn normalize_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '+')).collect();
    if let Some(rest) = digits.strip_prefix('0') {
        format!("62{rest}")
    } else {
        digits
    }
}

/// Builds the event hooks for the configured notification channel. With an incomplete configuration (or a client
/// that fails to initialize) this returns empty hooks and the gateway runs without notifications.
pub fn notification_hooks(config: &NotifierConfig) -> EventHooks {
    let mut hooks = EventHooks::default();
    let (Some(token), Some(phone)) = (&config.fonnte_token, &config.operator_phone) else {
        return hooks;
    };
    let client = match FonnteClient::new(token) {
        Ok(c) => c,
        Err(e) => {
            warn!("📱️ Could not initialize the WhatsApp client. Notifications are disabled. {e}");
            return hooks;
        },
    };
    let phone = normalize_phone(phone);
    hooks.on_order_paid(move |event| {
        let client = client.clone();
        let phone = phone.clone();
        Box::pin(async move {
            let order = event.order;
            let payer = order.payer_email.as_deref().unwrap_or("unknown payer");
            let message = format!("Order {} has been paid. Total: {}. Payer: {payer}.", order.id, order.total);
            if let Err(e) = client.send_message(&phone, &message).await {
                warn!("📱️ Could not deliver the paid-order notification for {}. {e}", order.id);
            }
        }) as std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>>
    });
    info!("📱️ Paid-order WhatsApp notifications are enabled");
    hooks
}
