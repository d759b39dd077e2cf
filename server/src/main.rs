use std::env;
use std::path::{Path, PathBuf};

use strife::prelude::*;

const CONFIG_DIR: &str = "config";
const DATA_DIR: &str = "data";
const DEFAULT_CONFIG_FILE: &str = "server.json";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let root = env::current_dir()?;
    let (config_dir, data_dir) = prepare_dirs(&root).await?;

    let config_path = config_dir.join(
        env::var("SERVER_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string()),
    );
    let config = ServerConfig::load_or_create(&config_path).await?;
    tracing::info!(path = %config_path.display(), name = %config.server_name, "loaded config");

    let rooms = RoomRegistry::bootstrap(&data_dir, &config.room_data).await?;

    let server = StrifeServer::builder()
        .config(config)
        .rooms(rooms)
        .build()
        .await?;

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "could not listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await?;
    Ok(())
}

/// Creates the config and data directories under `root` if missing.
async fn prepare_dirs(root: &Path) -> std::io::Result<(PathBuf, PathBuf)> {
    let config_dir = root.join(CONFIG_DIR);
    let data_dir = root.join(DATA_DIR);
    for dir in [&config_dir, &data_dir] {
        tokio::fs::create_dir_all(dir).await?;
    }
    Ok((config_dir, data_dir))
}
