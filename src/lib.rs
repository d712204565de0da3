//! Admission control for public write endpoints: a per-key fixed-window
//! rate limiter and a request body-size guard, composed in front of the
//! routes they protect.

pub mod admission;
pub mod body_limit;
pub mod client_ip;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod rate_limit;
pub mod state;
pub mod store;
pub mod sweeper;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

use crate::state::AppState;

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/metrics", get(handlers::metrics_handler))
        .route("/api/artifacts", post(handlers::create_artifact))
        .route("/api/comments", post(handlers::create_comment))
        .route("/api/comments/{id}/upvote", post(handlers::upvote_comment))
        .route("/api/webhooks/stripe", post(handlers::stripe_webhook))
        .route("/api/views", post(handlers::record_view))
        .route("/api/subscriptions", post(handlers::create_subscription))
        .with_state(state)
}
