use anyhow::Result;

mod sync_logic;
use sync_logic::{config, logger, service};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = config::load_config()?;
    logger::setup_logging(&settings.log_dir, &settings.log_level)?;

    match &settings.config_file {
        Some(path) => log::info!("Loaded config file {}", path.display()),
        None => log::info!("No config file found. Using defaults and environment/CLI variables."),
    }

    log::info!(
        "sheet_sync {} starting. Sheet:{} Interval:{}s Targets:{:?}",
        env!("CARGO_PKG_VERSION"),
        settings.sheet_id,
        settings.interval.as_secs(),
        settings.targets
    );

    if let Err(e) = service::run(settings).await {
        log::error!("{:#}", e);
        return Err(e);
    }

    log::info!("Shutdown complete.");
    Ok(())
}
