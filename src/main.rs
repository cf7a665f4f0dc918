//! picsum-cache - Cached access to the Picsum image API
//!
//! Serves image listings, lookups and the random feed from a disk cache,
//! falling back to the upstream API on a miss, and exposes the cache's
//! maintenance operations.

use std::time::Duration;

use clap::Parser;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use picsum_cache::cache::{CacheStore, FetchCoordinator};
use picsum_cache::cli::{descriptor_from_args, parse_key_arg, Cli, Command};
use picsum_cache::data::PicsumClient;
use picsum_cache::images::ImagesService;
use picsum_cache::sweep::{SweepConfig, SweepHandle, SweepMessage};

/// Logs go to stderr so stdout carries only JSON
fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "picsum_cache=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Prints a value as pretty JSON on stdout
fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Sourced<'a, T> {
    data: &'a T,
    from_cache: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let cli = Cli::parse();
    let config = cli.cache_config()?;
    info!(dir = %config.cache_dir.display(), ttl_hours = config.ttl.num_hours(), "using cache");

    let store = CacheStore::new(config);
    let mut client = PicsumClient::new();
    if let Some(base_url) = &cli.base_url {
        client = client.with_base_url(base_url.as_str());
    }
    let service = ImagesService::new(FetchCoordinator::new(store.clone()), client);

    match cli.command {
        Command::List { page, limit } => {
            print_json(&service.list_images(page, limit).await?)?;
        }
        Command::Image { id } => {
            let fetched = service.image_by_id(&id).await?;
            print_json(&Sourced {
                data: &fetched.data,
                from_cache: fetched.from_cache,
            })?;
        }
        Command::Random { count } => {
            let fetched = service.random_images(count).await?;
            print_json(&Sourced {
                data: &fetched.data,
                from_cache: fetched.from_cache,
            })?;
        }
        Command::Url { id, width, height } => {
            print_json(&serde_json::json!({ "url": service.image_url(&id, width, height) }))?;
        }
        Command::Stats => {
            print_json(&service.cache_stats())?;
        }
        Command::Sweep => {
            let removed = service.clean_cache();
            print_json(&serde_json::json!({ "removed": removed }))?;
        }
        Command::Invalidate { key } => {
            let key = parse_key_arg(&key)?;
            service.invalidate(&key);
            print_json(&serde_json::json!({ "invalidated": key.as_str() }))?;
        }
        Command::Key { params } => {
            let descriptor = descriptor_from_args(&params)?;
            print_json(&serde_json::json!({
                "descriptor": descriptor.canonical(),
                "key": descriptor.key().as_str(),
            }))?;
        }
        Command::Watch { interval_secs } => {
            let config = SweepConfig {
                interval: Duration::from_secs(interval_secs),
                enabled: true,
            };
            let mut handle = SweepHandle::spawn(store, config);
            // First sweep at startup rather than one interval in
            handle.request_sweep();
            info!(interval_secs, "watching cache; press Ctrl-C to stop");

            loop {
                tokio::select! {
                    message = handle.receiver.recv() => match message {
                        Some(SweepMessage::SweepCompleted { removed }) => {
                            info!(removed, "sweep completed");
                        }
                        Some(SweepMessage::SweepFailed(e)) => {
                            tracing::warn!(error = %e, "sweep failed");
                        }
                        None => break,
                    },
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
            handle.shutdown().await;
        }
    }

    Ok(())
}
