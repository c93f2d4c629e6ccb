use pp_watcher::cli::Cli;
use pp_watcher::client::osu::OsuClient;
use pp_watcher::client::ranking::RankingFetcher;
use pp_watcher::config::Settings;
use pp_watcher::core::events::Event;
use pp_watcher::messaging::client::{initialize_messaging, MessagingConfig};
use pp_watcher::messaging::sink::ChannelSink;
use pp_watcher::storage::MemoryCache;
use pp_watcher::watcher::{Watcher, WatcherConfig};

use clap::Parser;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = Settings::new(Cli::parse())?;

    // HTTP clients are chatty, keep them to warnings.
    let filter = EnvFilter::new(format!(
        "{},hyper=warn,reqwest=warn,rustls=warn,slack_morphism=warn",
        settings.get_trace_level()
    ));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Nothing useful can run without working credentials, so unavailability is fatal here.
    let osu = Arc::new(OsuClient::from_settings(&settings)?);
    if let Err(e) = osu.check_reachable().await {
        error!("The osu! API was deemed unavailable at startup. {e}");
        return Err(e.into());
    }
    info!("osu! API is reachable.");

    // Capacity of 64 should be more than plenty to handle all the messages
    let (tx, rx) = mpsc::channel::<Event>(64);
    let messaging = tokio::spawn(initialize_messaging(
        rx,
        MessagingConfig::from_settings(&settings),
    ));

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown requested."),
            Err(e) => error!("Could not listen for the shutdown signal. {e}"),
        }
        shutdown.cancel();
    });

    let mut watcher = Watcher::new(
        RankingFetcher::new(osu, settings.ranking_mode),
        ChannelSink::new(tx),
        MemoryCache::new(settings.pp_change_threshold),
        WatcherConfig::from_settings(&settings),
    );
    watcher.run(cancel).await;

    // Dropping the watcher closes the channel, letting the messaging engine drain and stop.
    drop(watcher);
    messaging.await?;

    Ok(())
}
