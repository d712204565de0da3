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
use crate::models::{NewSubscription, Subscription};
use crate::state::AppState;

pub const NAMESPACE: &str = "subscriptions:POST";

pub async fn create_subscription(
    State(state): State<Arc<AppState>>,
    ClientIp(ip): ClientIp,
    headers: HeaderMap,
    body: Body,
) -> AdmissionResult<(StatusCode, Json<Subscription>)> {
    let _timer = HANDLER_LATENCY.start_timer();
    let key = limit_key(NAMESPACE, &ip);
    let new: NewSubscription =
        admit_json(&state.limiter, &key, state.config.limits.subscriptions, &headers, body).await?;

    let email = new.email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(AdmissionError::MalformedBody("a valid email is required".to_string()));
    }

    let subscription = Subscription {
        email: email.clone(),
        topics: new.topics,
        created_at: chrono::Utc::now(),
    };
    // re-subscribing replaces the topic list
    state.content.subscriptions.insert(email, subscription.clone());

    Ok((StatusCode::CREATED, Json(subscription)))
}
