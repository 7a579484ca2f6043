use std::sync::Arc;
use std::time::Duration;
use timelock_client::services::{
    CountdownScheduler, EngineEvent, HttpGateway, LifecycleEngine, Notifier, Rendering,
};
use timelock_client::{Config, SystemClock};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting timelock client");

    let config = Config::from_env()
        .map_err(|e| anyhow::anyhow!("failed to load configuration: {e}"))?;

    let gateway = Arc::new(HttpGateway::new(&config.api)?);
    let clock = Arc::new(SystemClock);

    let (scheduler, scheduler_events) = CountdownScheduler::new(
        clock.clone(),
        Duration::from_secs(config.engine.tick_interval_secs),
    );
    let notifier = Notifier::new(
        clock.clone(),
        chrono::Duration::seconds(config.engine.notice_ttl_secs as i64),
    );
    let (engine, mut engine_events) = LifecycleEngine::new(
        gateway.clone(),
        scheduler,
        notifier,
        config.engine.download_dir.clone(),
    );

    // Seed the live set from the server snapshot
    let summaries = gateway.list_messages().await?;
    let messages = summaries.into_iter().map(|s| s.into_message()).collect();
    engine.load_snapshot(messages).await;

    let stats = engine.stats().await;
    tracing::info!(
        total = stats.total,
        locked = stats.locked,
        unlocked = stats.unlocked,
        revealed = stats.revealed,
        "tracking messages"
    );

    let runner = tokio::spawn(Arc::clone(&engine).run(scheduler_events));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
            event = engine_events.recv() => {
                match event {
                    Some(event) => display(event),
                    None => break,
                }
            }
        }
    }

    engine.shutdown().await;
    runner.abort();

    Ok(())
}

/// Print one engine event; display is a projection of engine state
fn display(event: EngineEvent) {
    match event {
        EngineEvent::Countdown {
            message_id,
            countdown,
        } => {
            tracing::debug!(%message_id, %countdown, "locked");
        }
        EngineEvent::Unlocked { message_id } => {
            tracing::info!(%message_id, "unlocked, ready to reveal");
        }
        EngineEvent::Revealed {
            message_id,
            rendering,
        } => match rendering {
            Rendering::Text { html } => {
                tracing::info!(%message_id, content = %html, "message revealed");
            }
            Rendering::Image { data_uri } => {
                tracing::info!(%message_id, encoded_len = data_uri.len(), "image revealed");
            }
            Rendering::Download { note, .. } => {
                tracing::info!(%message_id, %note, "document revealed");
            }
        },
        EngineEvent::RevealFailed { message_id, error } => {
            tracing::warn!(%message_id, %error, "reveal failed");
        }
        EngineEvent::Deleted { message_id } => {
            tracing::info!(%message_id, "message deleted");
        }
        EngineEvent::DeleteFailed { message_id, error } => {
            tracing::warn!(%message_id, %error, "delete failed");
        }
    }
}
