use axum::{
    Json,
    body::Body,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use std::sync::Arc;

use crate::admission::admit_json;
use crate::client_ip::{ClientIp, limit_key};
use crate::error::{AdmissionError, AdmissionResult};
use crate::metrics::HANDLER_LATENCY;
use crate::models::{ViewCount, ViewEvent};
use crate::state::AppState;

pub const NAMESPACE: &str = "views:POST";

pub async fn record_view(
    State(state): State<Arc<AppState>>,
    ClientIp(ip): ClientIp,
    headers: HeaderMap,
    body: Body,
) -> AdmissionResult<(StatusCode, Json<ViewCount>)> {
    let _timer = HANDLER_LATENCY.start_timer();
    let key = limit_key(NAMESPACE, &ip);
    let event: ViewEvent =
        admit_json(&state.limiter, &key, state.config.limits.views, &headers, body).await?;
    if event.slug.is_empty() {
        return Err(AdmissionError::MalformedBody("slug is required".to_string()));
    }

    let views = {
        let mut count = state.content.views.entry(event.slug.clone()).or_insert(0);
        *count += 1;
        *count
    };
    tracing::debug!(slug = %event.slug, views, "view recorded");

    Ok((
        StatusCode::ACCEPTED,
        Json(ViewCount {
            slug: event.slug,
            views,
        }),
    ))
}
