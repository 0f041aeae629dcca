mod api;
mod config;
mod edit;
mod error;
mod export;
mod grid;
mod models;
mod ui;

use anyhow::{Context, Result};
use config::Config;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;
use ui::App;

const LOG_FILE: &str = "gradebook-grid.log";

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load().context("Failed to load configuration")?;

    setup_tracing(&config.log_dir);

    let client = api::SisClient::new(config.base_url.clone(), config.api_token.clone())
        .context("Failed to build HTTP client")?;
    info!(
        base_url = %config.base_url,
        section = %config.course_section_id,
        authenticated = client.has_token(),
        "Starting gradebook grid"
    );

    // Start TUI application
    let mut app = App::new(client, config.course_section_id);
    app.run().await?;

    Ok(())
}

/// The terminal belongs to the TUI, so events go to a file (or nowhere).
fn setup_tracing(log_dir: &Path) {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("gradebook_grid=debug,info"));

    let log_path = log_dir.join(LOG_FILE);
    let file = std::fs::create_dir_all(log_dir)
        .and_then(|_| OpenOptions::new().create(true).append(true).open(&log_path));

    match file {
        Ok(file) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(Mutex::new(file))
                        .with_ansi(false)
                        .with_target(true),
                )
                .init();
            info!(path = ?log_path, "Tracing initialized");
        }
        Err(_) => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::sink)
                .init();
        }
    }
}
