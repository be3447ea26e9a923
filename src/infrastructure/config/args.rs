use super::app_config::LogLevel;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "avatar-cache",
    version,
    about = "Fetch timeline avatars through the local image cache",
    long_about = None
)]
pub struct CliArgs {
    /// Configuration file path.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Avatar cache directory.
    #[arg(long, value_name = "DIR", env = "AVATAR_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Request timeout in seconds.
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Maximum downloads running at once.
    #[arg(long)]
    pub max_concurrent_fetches: Option<usize>,

    /// Image URLs to fetch.
    #[arg(required = true, value_name = "URL")]
    pub urls: Vec<String>,
}
