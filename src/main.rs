use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use admission_gate::config::Args;
use admission_gate::state::AppState;
use admission_gate::sweeper::limiter_sweeper;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("admission_gate=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // parse cli arguments
    let args = Args::parse();
    let config = args.gate_config().context("loading configuration")?;
    let state = Arc::new(AppState::new(config));

    if args.sweep_interval > 0 {
        let limiter = Arc::clone(&state.limiter);
        let every = Duration::from_secs(args.sweep_interval);
        tokio::spawn(async move {
            limiter_sweeper(limiter, every).await;
        });
    }

    let limits = &state.config.limits;
    tracing::info!(
        trust_forwarded = state.config.trust_forwarded,
        prune_high_water = state.config.prune_high_water,
        "admission gate configured"
    );
    tracing::info!(
        artifacts = ?limits.artifacts,
        comments = ?limits.comments,
        comment_upvotes = ?limits.comment_upvotes,
        webhooks = ?limits.webhooks,
        views = ?limits.views,
        subscriptions = ?limits.subscriptions,
        "route limits"
    );

    let app = admission_gate::app(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!("listening on http://localhost:{}", args.port);

    // ConnectInfo gives handlers the peer address when no proxy header is set
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server error")?;
    Ok(())
}
