// Framework bootstrap for the client session runtime.

use crate::domain::ports::SystemClock;
use crate::domain::tuning::Tuning;
use crate::frameworks::config::{self, ConfigError};
use crate::interface_adapters::clients::store::StoreClient;
use crate::interface_adapters::net::spawn_feed;
use crate::interface_adapters::render::TraceRenderer;
use crate::use_cases::{Session, session_task};

use rand::SeedableRng;
use rand::rngs::StdRng;
use std::io::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, mpsc};

/// Everything `run` needs, resolved from the environment by `run_with_config`.
#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub store_url: String,
    pub realtime_url: String,
    pub api_key: String,
    pub session_id: String,
    pub tuning: Tuning,
    pub frame_interval: Duration,
}

impl RuntimeSettings {
    pub fn from_env() -> std::result::Result<Self, ConfigError> {
        Ok(Self {
            store_url: config::store_url(),
            realtime_url: config::realtime_url(),
            api_key: config::store_api_key(),
            session_id: config::session_id().ok_or(ConfigError::MissingSessionId)?,
            tuning: config::load_tuning()?,
            frame_interval: config::frame_interval(),
        })
    }
}

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

/// Runs a session until `shutdown` is notified, then tears it down.
pub async fn run(settings: RuntimeSettings, shutdown: Arc<Notify>) -> Result<()> {
    let (events_tx, events_rx) = mpsc::channel(config::EVENT_CHANNEL_CAPACITY);

    let store = Arc::new(
        StoreClient::new(
            settings.store_url.clone(),
            settings.api_key.clone(),
            settings.session_id.clone(),
            events_tx.clone(),
        )
        .map_err(|e| std::io::Error::other(format!("failed to initialize store client: {e}")))?,
    );
    tracing::debug!(store_url = %settings.store_url, "store client configured");

    let mut session = Session::new(
        settings.session_id.clone(),
        settings.tuning,
        config::VIEWPORT,
        store.clone(),
        Arc::new(SystemClock),
        Box::new(TraceRenderer::default()),
        StdRng::from_entropy(),
    );
    session.bootstrap();
    session
        .load(store.as_ref())
        .await
        .inspect_err(|e| tracing::error!(error = %e, "initial snapshot failed"))
        .map_err(std::io::Error::other)?;

    let feed = spawn_feed(settings.realtime_url.clone(), events_tx);
    let stats = tokio::spawn(session_task(
        session,
        events_rx,
        settings.frame_interval,
        shutdown,
    ))
    .await
    .map_err(std::io::Error::other)?;

    feed.abort();
    tracing::info!(ticks = stats.ticks, "session ended");

    // The process may exit right after this; wait briefly so the row is removed.
    match tokio::time::timeout(config::TEARDOWN_GRACE, store.delete_own_entity()).await {
        Ok(Ok(())) => tracing::info!("own entity deleted"),
        Ok(Err(e)) => tracing::warn!(error = %e, "failed to delete own entity"),
        Err(_) => tracing::warn!("timed out deleting own entity"),
    }
    Ok(())
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let settings = RuntimeSettings::from_env()
        .inspect_err(|e| tracing::error!(error = %e, "invalid configuration"))
        .map_err(std::io::Error::other)?;
    tracing::info!(session_id = %settings.session_id, "starting session");

    let shutdown = Arc::new(Notify::new());
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
        tracing::info!("shutdown requested");
        // Stores a permit, so the loop sees it even between polls.
        signal.notify_one();
    });

    run(settings, shutdown).await
}
