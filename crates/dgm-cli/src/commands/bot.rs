use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use dgm_bot::{Bot, ConsoleTransport, DiscordTransport, Dispatcher, LocalCatalog, Transport};
use dgm_core::schema::Database;
use dgm_etl::Config;
use dgm_search::FtsIndex;

pub async fn run_bot(config: &Config, console: bool) -> Result<()> {
    // Store and index failures are fatal here, before anything is served
    let db = Database::open(&config.database_path)
        .with_context(|| format!("Failed to open catalog {}", config.database_path.display()))?;
    let index = FtsIndex::open(&config.index_path)
        .with_context(|| format!("Failed to open index {}", config.index_path.display()))?;
    if index.is_empty()? {
        log::warn!("Search index is empty; run `dgm scrape` or `dgm index` first");
    }

    let dispatcher = Dispatcher::new(
        LocalCatalog::new(db, index),
        config.prefix.clone(),
        config.base_url.clone(),
    );

    if console {
        println!("Type commands such as `{}search london`, Ctrl-D to quit\n", config.prefix);
        return serve(dispatcher, Arc::new(ConsoleTransport::stdio()), config).await;
    }

    let token = config
        .bot_token
        .clone()
        .context("No bot token configured; set bot_token or DGM_BOT_TOKEN, or use --console")?;
    if config.channels.is_empty() {
        anyhow::bail!("No channels configured; run `dgm config set channels <id,id>`");
    }
    let transport = DiscordTransport::new(
        token,
        config.channels.clone(),
        Duration::from_secs(config.poll_interval_secs),
    )?;
    serve(dispatcher, Arc::new(transport), config).await
}

async fn serve<T: Transport + 'static>(
    dispatcher: Dispatcher<LocalCatalog>,
    transport: Arc<T>,
    config: &Config,
) -> Result<()> {
    let mut bot = Bot::new(dispatcher, transport)
        .with_notice_ttl(Duration::from_secs(config.notice_ttl_secs))
        .with_session_idle(Duration::from_secs(config.session_idle_secs));

    bot.run().await?;
    Ok(())
}
