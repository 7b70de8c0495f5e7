//! The provider-facing webhook route.
//!
//! The callback-token check happens in [`crate::middleware::CallbackTokenMiddlewareFactory`], before this handler
//! runs. The handler reads the raw body itself so a payload that fails framework-level JSON parsing still produces
//! a deliberate 400 rather than an opaque framework error: the provider keeps redelivering non-2xx responses, and
//! a malformed event should stay visible through those retries instead of being silently dropped.
use actix_web::{web, HttpResponse};
use checkout_payment_engine::{
    provider_types::ProviderEvent,
    traits::{PaymentGatewayDatabase, PaymentGatewayError},
    OrderFlowApi,
    ReconcileOutcome,
};
use log::*;
use serde_json::Value;

use crate::{data_objects::JsonResponse, errors::ServerError, route};

route!(xendit_webhook => Post "/xendit" impl PaymentGatewayDatabase);
/// Accepts one provider callback and feeds it to the reconciler.
///
/// Everything the reconciler can absorb is answered with a 200, including duplicates and events that match no
/// order; the provider's retry machinery should only be engaged when retrying could help (signature failure,
/// malformed payload, or a transient store error).
pub async fn xendit_webhook<B: PaymentGatewayDatabase>(
    body: web::Bytes,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("🔔️ Received webhook delivery");
    let payload: Value = serde_json::from_slice(&body).map_err(|e| {
        warn!("🔔️ Webhook body is not valid JSON. {e}");
        ServerError::MalformedEvent(e.to_string())
    })?;
    let event = ProviderEvent::from_payload(payload).map_err(|e| {
        warn!("🔔️ Webhook body could not be normalized. {e}");
        ServerError::MalformedEvent(e.to_string())
    })?;
    let event_id = event.event_id.clone();
    match api.process_provider_event(event).await {
        Ok(ReconcileOutcome::Reconciled { order, previous }) => {
            info!("🔔️ Event [{event_id}] moved order {} from {previous} to {}", order.id, order.status);
        },
        Ok(ReconcileOutcome::Duplicate { order }) => {
            debug!("🔔️ Event [{event_id}] is a duplicate delivery for order {}. Acknowledged.", order.id);
        },
        Ok(ReconcileOutcome::Archived { order }) => {
            debug!("🔔️ Event [{event_id}] caused no transition on order {}. Archived.", order.id);
        },
        Err(PaymentGatewayError::UnmatchedEvent(ext)) => {
            // Acknowledge so the provider stops retrying an event that can never be applied. Needs operator
            // attention, hence the warning.
            warn!("🔔️ Event [{event_id}] matches no order (correlation id '{ext}'). Acknowledged without applying.");
        },
        Err(e) => {
            warn!("🔔️ Event [{event_id}] could not be processed. {e}");
            return Err(e.into());
        },
    }
    Ok(HttpResponse::Ok().json(JsonResponse::success("received")))
}
