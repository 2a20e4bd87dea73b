use std::error::Error;
use std::fs::File;
use std::time::Instant;
use tracing::info;

use azure_blob_vfs::storage::config::{parse_bool_setting, HTTP_STATS};
use azure_blob_vfs::{AzureStorageFileSystem, OpenFlags, Session, Settings};

const USAGE: &str = "usage: azure-blob-vfs <az://[account.endpoint/]container/pattern> [settings.json]";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let pattern = args.next().ok_or(USAGE)?;

    // Environment first, the settings file overrides it
    let mut settings = Settings::from_env();
    if let Some(settings_path) = args.next() {
        let from_file: Settings = serde_json::from_reader(File::open(&settings_path)?)?;
        info!("Loaded settings from {}", settings_path);
        settings = settings.with_options(from_file.options);
    }
    let stats_enabled =
        parse_bool_setting(HTTP_STATS, settings.get_option(HTTP_STATS).map(String::as_str))?
            .unwrap_or(false);

    let session = Session::new(settings);
    let fs = AzureStorageFileSystem::new();

    let start = Instant::now();
    let paths = fs.glob(&pattern, &session).await?;
    for path in &paths {
        let handle = fs.open_file(path, OpenFlags::READ, &session).await?;
        println!(
            "{}\t{}\t{}",
            path,
            handle.file_size(),
            handle
                .last_modified()
                .map(|t| t.to_rfc3339())
                .unwrap_or_default()
        );
    }
    info!(
        "Listed count={} paths in duration_ms={}",
        paths.len(),
        start.elapsed().as_millis()
    );

    if stats_enabled {
        println!("{}", serde_json::to_string_pretty(&session.stats().snapshot())?);
    }

    session.end();
    Ok(())
}
