use letterbot::config::Config;

#[tokio::main]
async fn main() -> letterbot::error::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load()?;
    letterbot::logging::init(config.log_file.as_deref())?;
    log::info!("Starting letterbot Telegram bot");

    match &config.secrets_file {
        Some(path) => log::info!("Merged configuration with {}", path.display()),
        None => log::info!("No secrets file found, using flags and environment only"),
    }

    match letterbot::run(config).await {
        Ok(()) => {
            log::info!("Bot shut down successfully");
            Ok(())
        }
        Err(e) => {
            log::error!("Bot encountered an error: {e}");
            Err(e)
        }
    }
}
