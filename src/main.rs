use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::Result;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use avatar_cache::application::LoadAvatarsUseCase;
use avatar_cache::infrastructure::{AppConfig, CliArgs, DiskImageCache, ImageFetcher, StorageManager};

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if let Some(log_path) = config.effective_log_path() {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

fn load_config(args: &CliArgs) -> Result<AppConfig> {
    let storage = match &args.config {
        Some(path) => StorageManager::with_dir(
            path.parent()
                .map(std::path::Path::to_path_buf)
                .unwrap_or_default(),
        ),
        None => StorageManager::new()?,
    };
    let mut config = storage.load_config(args.config.as_deref())?;
    config.merge_with_args(args);
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = CliArgs::parse();
    let config = load_config(&args)?;

    init_logging(&config)?;

    info!(version = avatar_cache::VERSION, "Starting avatar-cache");

    let disk_cache = DiskImageCache::new(config.effective_cache_dir()).await?;
    info!(cache_dir = %disk_cache.cache_dir().display(), "Using avatar cache");

    let fetcher = Arc::new(ImageFetcher::new(config.fetch.fetcher_config(), disk_cache)?);
    let use_case = LoadAvatarsUseCase::new(fetcher, config.fetch.max_concurrent_fetches);

    for loaded in use_case.load_urls(&args.urls).await {
        let (width, height) = loaded.dimensions();
        println!(
            "{} {}x{} {} {}",
            loaded.key, width, height, loaded.source, loaded.url
        );
    }

    Ok(())
}
