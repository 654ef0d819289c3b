//! Leaderboard Live
//!
//! Follows the backend leaderboard and logs every view it would render.

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use leaderboard_live::{
    FeedConfig, HttpSnapshotSource, LeaderboardService, RenderedView, WebSocketPushChannel, VERSION,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = FeedConfig::from_env().context("invalid leaderboard configuration")?;
    info!("Leaderboard Live v{}", VERSION);
    info!("Backend: {}", config.base_url);
    info!("Push channel: {} (event {:?})", config.push_url, config.push_event);

    let source = HttpSnapshotSource::new(&config).context("failed to build HTTP client")?;
    let channel = WebSocketPushChannel::from_config(&config);

    let (service, handle) = LeaderboardService::new(source, config.event_queue);
    let service_task = tokio::spawn(service.run(channel));

    let mut views = handle.views();
    loop {
        tokio::select! {
            changed = views.changed() => {
                if changed.is_err() {
                    warn!("Service stopped unexpectedly");
                    break;
                }
                let view = views.borrow_and_update().clone();
                log_view(&view);
            }
            result = tokio::signal::ctrl_c() => {
                result.context("failed to listen for Ctrl-C")?;
                info!("Ctrl-C received, shutting down");
                handle.shutdown();
                break;
            }
        }
    }

    service_task.await.context("service task panicked")?;
    Ok(())
}

fn log_view(view: &RenderedView) {
    info!(
        generation = view.generation,
        rows = view.row_count(),
        sections = view.sections.len(),
        mode = ?view.mode,
        "Leaderboard updated"
    );

    for row in view.rows().take(10) {
        info!(
            "#{:<3} {:>8}  {:<24} {:<16} {:>14}  {}",
            row.rank, row.player_id, row.name, row.country, row.wealth, row.score
        );
    }

    if tracing::enabled!(tracing::Level::DEBUG) {
        match serde_json::to_string(view) {
            Ok(json) => tracing::debug!(%json, "Rendered view"),
            Err(e) => warn!(error = %e, "Failed to serialize view"),
        }
    }
}
