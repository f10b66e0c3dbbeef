use std::sync::Arc;

use tracing::info;

use herald_discord::{
    ConnectionSupervisor, DiscordAdapter, DiscordGateway, DiscordSink, ExitReason, GatewaySignal,
};
use herald_scheduler::{GuildJobLoader, JobRegistry};
use herald_store::GuildStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "herald_daemon=info,herald_discord=info,herald_scheduler=info,herald_store=info"
                    .into()
            }),
        )
        .init();

    // load config: explicit HERALD_CONFIG env > ~/.herald/herald.toml
    let config_path = std::env::var("HERALD_CONFIG").ok();
    let config =
        herald_core::HeraldConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
            tracing::warn!("Config load failed ({}), using defaults", e);
            herald_core::HeraldConfig::default()
        });
    if config.discord.bot_token.is_empty() {
        anyhow::bail!("discord.bot_token is not configured, set it in herald.toml");
    }

    let db_path = &config.database.path;
    ensure_parent_dir(db_path);
    info!(path = %db_path, "opening SQLite database");
    let db = rusqlite::Connection::open(db_path)?;
    db.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    herald_store::db::init_db(&db)?;

    let store = Arc::new(GuildStore::new(db));
    let registry = Arc::new(JobRegistry::new());

    // Lifecycle signals: handler/adapter produce, supervisor consumes.
    let (signal_tx, signal_rx) = tokio::sync::mpsc::channel::<GatewaySignal>(64);

    let adapter = DiscordAdapter::new(&config.discord, signal_tx.clone());
    let client = adapter.build_client().await?;

    let sink = Arc::new(DiscordSink::new(
        Arc::clone(&client.http),
        Arc::clone(&client.cache),
    ));
    let loader = Arc::new(GuildJobLoader::new(
        Arc::clone(&store),
        Arc::clone(&registry),
        sink,
    ));
    let gateway = DiscordGateway::new(Arc::clone(&client.http));

    let supervisor = ConnectionSupervisor::new(
        gateway,
        loader,
        Arc::clone(&registry),
        Arc::clone(&store),
        config.discord.default_prefix.clone(),
        config.discord.disconnect_warn_threshold,
    );

    // Ctrl-C becomes a shutdown signal so the supervisor can drain tasks.
    let shutdown_tx = signal_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(GatewaySignal::Shutdown).await;
        }
    });

    tokio::spawn(adapter.run(client));

    match supervisor.run(signal_rx).await {
        ExitReason::CleanClose | ExitReason::Shutdown | ExitReason::ChannelClosed => {
            info!("herald stopped");
            Ok(())
        }
        ExitReason::LoginFailed => anyhow::bail!("could not re-authenticate after disconnect"),
    }
}

/// Ensure the parent directory for a file path exists.
fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}
