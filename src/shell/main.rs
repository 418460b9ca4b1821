use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, fmt};

use outbox_relay::modules::outbox::adapters::outbound::publishers::TracingPublisher;
use outbox_relay::modules::outbox::core::publisher::PublisherRegistry;
use outbox_relay::shared::core::primitives::{Clock, SystemClock};
use outbox_relay::shell::config::OutboxConfig;
use outbox_relay::shell::http::router;
use outbox_relay::shell::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = OutboxConfig::from_env()?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // In-memory store for now
    let publishers = PublisherRegistry::new().with(Arc::new(TracingPublisher::new(
        config.log_publisher_types.clone(),
    )));
    let state = AppState::in_memory(&config, clock, publishers);

    let shutdown = CancellationToken::new();
    let worker = state.scheduler.clone().spawn(shutdown.clone());

    let app = router(state).layer(TraceLayer::new_for_http());
    let listener = tokio::net::TcpListener::bind(config.http_addr).await?;
    tracing::info!("Outbox relay listening on http://{}", config.http_addr);

    let on_signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => on_signal.cancel(),
                _ = on_signal.cancelled() => {}
            }
        })
        .await?;

    shutdown.cancel();
    worker.await?;
    tracing::info!("Outbox relay stopped");
    Ok(())
}
