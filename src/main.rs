use dotenvy::dotenv;
use mao::{
    bot,
    config::{database, settings},
    core::Economy,
    errors::{Error, Result},
};
use std::{env, sync::Arc};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, non-fatal since env vars can be set externally
    dotenv().ok();

    // 3. Load application settings
    let settings = settings::load_default_settings()
        .inspect_err(|e| error!("Failed to load settings: {}", e))?;

    // 4. Connect and warm-start every cache
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    let economy = Arc::new(
        Economy::bootstrap(db, &settings.economy)
            .await
            .inspect_err(|e| error!("Warm start failed: {}", e))?,
    );

    // 5. Run the bot. DISCORD_BOT_TOKEN is read directly before use.
    let token = env::var("DISCORD_BOT_TOKEN")
        .inspect_err(|e| error!("DISCORD_BOT_TOKEN not found: {}", e))
        .map_err(Error::EnvVar)?;
    economy.start_background_tasks().await;

    let outcome = tokio::select! {
        result = bot::run_bot(token, Arc::clone(&economy), settings) => result,
        signal = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
            signal.map_err(Error::from)
        }
    };

    // 6. Flush pending XP and close the pool whatever the outcome
    economy.shutdown().await?;
    outcome
}
