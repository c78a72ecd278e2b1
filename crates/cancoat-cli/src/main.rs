mod config;
mod pipeline;

use clap::Parser;
use tracing::{debug, info, warn};

use crate::config::Args;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Before parsing, so .env values feed the env-backed flags.
    let dotenv = dotenv::dotenv();
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level.as_tracing())
        .init();

    match dotenv {
        Ok(path) => debug!(path = %path.display(), "loaded .env"),
        Err(_) => warn!("no .env file found; relying on process environment"),
    }

    info!(
        started_at = %chrono::Utc::now().to_rfc3339(),
        "cancoat v{}",
        env!("CARGO_PKG_VERSION")
    );
    if let Ok(cwd) = std::env::current_dir() {
        debug!(cwd = %cwd.display(), "working directory");
    }

    pipeline::run(&args).await
}
