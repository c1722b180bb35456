use anyhow::Result;
use serenity::all::Http;
use std::sync::Arc;
use std::time::{Duration, Instant};
use ticket_checkout_bot::bot::{self, DiscordSink, FlowController, Handler};
use ticket_checkout_bot::catalog::WooCommerceClient;
use ticket_checkout_bot::config::AppConfig;
use ticket_checkout_bot::observability::{self, GatewayStatus, ReadinessInputs};
use ticket_checkout_bot::selection::{self, SelectionStore};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let startup = Instant::now();

    // Load environment variables from .env file first
    dotenvy::dotenv().ok();

    // Load and validate configuration before anything connects
    let config = AppConfig::from_env()?;
    config.validate()?;

    let gateway = GatewayStatus::new();
    let readiness = ReadinessInputs {
        bot_token: Some(config.bot.token.clone()),
        catalog: Some(config.catalog.clone()),
        gateway: Some(gateway.clone()),
    };
    let observability_guard =
        observability::init_observability_with_config(&config.observability, readiness).await?;

    info!("{}", config.summary());

    let catalog = Arc::new(WooCommerceClient::new(&config.catalog)?);
    info!(
        timeout_secs = config.catalog.http_timeout_secs,
        "Catalog client initialized"
    );

    let store = Arc::new(SelectionStore::in_memory(Duration::from_secs(
        config.selection.ttl_secs,
    )));
    let _sweeper = selection::spawn_sweeper(
        Arc::clone(&store),
        Duration::from_secs(config.selection.sweep_interval_secs),
    );

    let http = Arc::new(Http::new(&config.bot.token));
    let sink = Arc::new(DiscordSink::new(http));

    let flow = Arc::new(FlowController::new(
        catalog,
        store,
        sink,
        config.bot.ticket_category_id,
    ));
    let commands = Arc::new(bot::default_registry(Arc::clone(&flow)));

    let handler = Handler::new(flow, commands, config.bot.register_commands, gateway);

    observability::record_startup_metrics(startup.elapsed());
    info!(
        ticket_category_id = config.bot.ticket_category_id,
        "Bot initialized, connecting to Discord"
    );

    let result = bot::run_bot(&config.bot, handler).await;
    observability_guard.shutdown();
    result?;

    Ok(())
}
