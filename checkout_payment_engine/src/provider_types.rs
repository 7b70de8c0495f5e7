//! Normalized provider event types.
//!
//! The provider's callback vocabulary has drifted over time (`PAID`, `INVOICE_PAID`, even the Indonesian `LUNAS`
//! have all been observed in the wild), so the mapping from provider status to the canonical [`OrderStatus`] enum
//! lives in one configurable table rather than being hardcoded per deployment.
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use cpg_common::Rupiah;
use log::warn;
use serde_json::Value;
use thiserror::Error;

use crate::db_types::OrderStatus;

#[derive(Debug, Clone, Error)]
#[error("Could not normalize provider event. {0}")]
pub struct EventConversionError(pub String);

//--------------------------------------     ProviderEvent     -------------------------------------------------------
/// A provider callback, normalized. Carries the raw payload alongside the extracted fields so the store can keep a
/// byte-faithful audit copy.
#[derive(Debug, Clone)]
pub struct ProviderEvent {
    /// The provider's unique id for this delivery. Keys the idempotency ledger.
    pub event_id: String,
    /// The correlation id we handed to the provider at invoice creation (`checkout_<order-id>`).
    pub external_id: String,
    /// The provider's invoice id, when the payload carries one. Used as a fallback for order resolution.
    pub invoice_id: Option<String>,
    /// The provider's status vocabulary, verbatim.
    pub provider_status: String,
    pub amount: Rupiah,
    pub paid_at: Option<DateTime<Utc>>,
    pub raw: Value,
}

impl ProviderEvent {
    /// Normalizes a parsed webhook body.
    ///
    /// A missing `external_id` or `id` makes the event unusable (it can be matched to nothing, and cannot be
    /// deduplicated), so both are conversion errors. The caller answers the provider with a non-2xx in that case so
    /// the failure stays visible through the provider's own retries instead of being silently swallowed.
    pub fn from_payload(raw: Value) -> Result<Self, EventConversionError> {
        let external_id = raw
            .get("external_id")
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| EventConversionError("Missing external_id".into()))?;
        let event_id = raw
            .get("id")
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| EventConversionError("Missing event id".into()))?;
        // Invoice callbacks put the invoice id in `id`; payment callbacks carry a separate `invoice_id` field.
        let invoice_id = raw
            .get("invoice_id")
            .or_else(|| raw.get("id"))
            .and_then(Value::as_str)
            .map(String::from);
        let provider_status = raw.get("status").and_then(Value::as_str).unwrap_or_default().to_string();
        let amount = Rupiah::from(raw.get("amount").and_then(Value::as_i64).unwrap_or(0));
        let paid_at = raw
            .get("paid_at")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));
        Ok(Self { event_id, external_id, invoice_id, provider_status, amount, paid_at, raw })
    }
}

//--------------------------------------     StatusMapping     -------------------------------------------------------
/// The single mapping table from provider vocabulary to the canonical status enum.
///
/// Provider statuses with no entry do not cause a transition; the event is merely archived against the order.
#[derive(Debug, Clone)]
pub struct StatusMapping {
    map: HashMap<String, OrderStatus>,
}

impl Default for StatusMapping {
    fn default() -> Self {
        let map = [
            ("PAID", OrderStatus::Paid),
            ("INVOICE_PAID", OrderStatus::Paid),
            ("SETTLED", OrderStatus::Paid),
            ("LUNAS", OrderStatus::Paid),
            ("EXPIRED", OrderStatus::Expired),
            ("INVOICE_EXPIRED", OrderStatus::Expired),
            ("PENDING_TIMEOUT", OrderStatus::Expired),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        Self { map }
    }
}

impl StatusMapping {
    /// The canonical status a provider status maps to, if any. Lookup is case-insensitive.
    pub fn target_for(&self, provider_status: &str) -> Option<OrderStatus> {
        self.map.get(provider_status.trim().to_ascii_uppercase().as_str()).copied()
    }

    /// Applies deployment overrides in `PROVIDER_STATUS=CanonicalStatus` comma-separated form, e.g.
    /// `LUNAS=PAID,KADALUARSA=EXPIRED`. Unparseable entries are logged and skipped.
    pub fn apply_overrides(&mut self, overrides: &str) {
        for entry in overrides.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            match entry.split_once('=') {
                Some((provider, canonical)) => match canonical.trim().parse::<OrderStatus>() {
                    Ok(status) => {
                        self.map.insert(provider.trim().to_ascii_uppercase(), status);
                    },
                    Err(e) => warn!("🪛️ Ignoring status mapping override '{entry}'. {e}"),
                },
                None => warn!("🪛️ Ignoring malformed status mapping override '{entry}'"),
            }
        }
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn normalizes_a_well_formed_event() {
        let raw = json!({
            "id": "evt1",
            "external_id": "checkout_abc123",
            "status": "PAID",
            "amount": 250_000,
            "paid_at": "2024-06-01T10:00:00Z",
            "payment_method": "QRIS",
        });
        let ev = ProviderEvent::from_payload(raw).unwrap();
        assert_eq!(ev.event_id, "evt1");
        assert_eq!(ev.external_id, "checkout_abc123");
        assert_eq!(ev.provider_status, "PAID");
        assert_eq!(ev.amount, Rupiah::from(250_000));
        assert!(ev.paid_at.is_some());
    }

    #[test]
    fn missing_external_id_is_a_conversion_error() {
        let raw = json!({"id": "evt1", "status": "PAID"});
        assert!(ProviderEvent::from_payload(raw).is_err());
        let raw = json!({"external_id": "checkout_abc", "status": "PAID"});
        assert!(ProviderEvent::from_payload(raw).is_err());
    }

    #[test]
    fn default_mapping_covers_the_observed_vocabularies() {
        let mapping = StatusMapping::default();
        assert_eq!(mapping.target_for("PAID"), Some(OrderStatus::Paid));
        assert_eq!(mapping.target_for("lunas"), Some(OrderStatus::Paid));
        assert_eq!(mapping.target_for("INVOICE_EXPIRED"), Some(OrderStatus::Expired));
        assert_eq!(mapping.target_for("PENDING"), None);
        assert_eq!(mapping.target_for("somethingelse"), None);
    }

    #[test]
    fn overrides_extend_the_table() {
        let mut mapping = StatusMapping::default();
        mapping.apply_overrides("KADALUARSA=EXPIRED, lunas=CANCELLED, garbage, BAD=NOPE");
        assert_eq!(mapping.target_for("KADALUARSA"), Some(OrderStatus::Expired));
        assert_eq!(mapping.target_for("LUNAS"), Some(OrderStatus::Cancelled));
        assert_eq!(mapping.target_for("BAD"), None);
    }
}
