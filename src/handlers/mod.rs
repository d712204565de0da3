mod artifacts;
mod comments;
mod health;
mod metrics;
mod subscriptions;
mod views;
mod webhooks;

pub use artifacts::create_artifact;
pub use comments::{create_comment, upvote_comment};
pub use health::health_handler;
pub use metrics::metrics_handler;
pub use subscriptions::create_subscription;
pub use views::record_view;
pub use webhooks::stripe_webhook;
