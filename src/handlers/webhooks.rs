use axum::{Json, body::Body, extract::State, http::HeaderMap};
use dashmap::mapref::entry::Entry;
use std::sync::Arc;

use crate::admission::admit_text;
use crate::client_ip::{ClientIp, limit_key};
use crate::error::AdmissionResult;
use crate::metrics::HANDLER_LATENCY;
use crate::models::{WebhookAck, WebhookEnvelope, WebhookEvent};
use crate::state::AppState;

pub const NAMESPACE: &str = "webhooks:stripe";

// The raw text is kept as received so a signature check over the exact
// bytes stays possible downstream.
pub async fn stripe_webhook(
    State(state): State<Arc<AppState>>,
    ClientIp(ip): ClientIp,
    headers: HeaderMap,
    body: Body,
) -> AdmissionResult<Json<WebhookAck>> {
    let _timer = HANDLER_LATENCY.start_timer();
    let key = limit_key(NAMESPACE, &ip);
    let limit = state.config.limits.webhooks;
    let raw = admit_text(&state.limiter, &key, limit, &headers, body).await?;
    let envelope: WebhookEnvelope = serde_json::from_str(&raw)?;

    let ack = match state.content.webhook_events.entry(envelope.id.clone()) {
        Entry::Occupied(entry) => {
            let first = entry.get();
            if first.raw != raw {
                tracing::warn!(event_id = %envelope.id, "event id reused with a different payload");
            }
            WebhookAck {
                received: true,
                duplicate: true,
                event_type: first.event_type.clone(),
                first_received_at: first.received_at,
            }
        }
        Entry::Vacant(slot) => {
            let event = slot.insert(WebhookEvent {
                event_type: envelope.event_type,
                raw,
                received_at: chrono::Utc::now(),
            });
            WebhookAck {
                received: true,
                duplicate: false,
                event_type: event.event_type.clone(),
                first_received_at: event.received_at,
            }
        }
    };
    tracing::debug!(
        event_id = %envelope.id,
        event_type = %ack.event_type,
        duplicate = ack.duplicate,
        "webhook received"
    );

    Ok(Json(ack))
}
