//! Process entry point: CLI parsing, tracing bootstrap, store open, Discord
//! client startup.

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context as _, Result};
use clap::Parser;
use quill_discord_runtime::DiscordHandler;
use quill_session::SessionManager;
use quill_store::RegistryStore;
use quill_tracker::TrackerClient;
use serenity::all::GatewayIntents;
use serenity::Client;
use tracing::info;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

#[derive(Debug, Parser)]
#[command(name = "quill-bot", about = "Discord bot that files issues on GitHub and GitLab repos", version)]
struct Cli {
    #[arg(long, env = "DISCORD_TOKEN", hide_env_values = true, help = "Discord bot token.")]
    discord_token: String,

    #[arg(
        long,
        env = "QUILL_DB_PATH",
        default_value = "quill.db",
        help = "Path of the registration database file."
    )]
    db_path: PathBuf,

    #[arg(
        long,
        env = "QUILL_LOG",
        help = "Log filter for this session, e.g. 'debug' or 'quill_store=trace'."
    )]
    log_level: Option<String>,

    #[arg(long, help = "Recreates the Discord application commands. Requires user re-install.")]
    reset_commands: bool,

    #[arg(long, help = "Prints all registrations as JSON and exits.")]
    export: bool,
}

fn init_tracing(directives: Option<&str>) {
    let builder = EnvFilter::builder().with_default_directive(LevelFilter::INFO.into());
    let filter = match directives {
        Some(directives) => builder.parse_lossy(directives),
        None => builder.from_env_lossy(),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn export_registrations(store: &RegistryStore) -> Result<String> {
    let mut registrations = store.list_all()?;
    registrations.sort_by_key(|registration| registration.id);
    let rows: Vec<serde_json::Value> = registrations
        .iter()
        .map(|registration| {
            serde_json::json!({
                "id": registration.id,
                "user_id": registration.user_id,
                "vendor": registration.vendor.to_string(),
                "owner": registration.owner,
                "repo": registration.repo,
                "token": registration.token,
            })
        })
        .collect();
    serde_json::to_string_pretty(&rows).context("failed to encode registrations")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    let store = Arc::new(
        RegistryStore::open(&cli.db_path)
            .with_context(|| format!("failed to open database {}", cli.db_path.display()))?,
    );

    if cli.export {
        println!("{}", export_registrations(&store)?);
        return Ok(());
    }

    let handler = DiscordHandler::new(
        Arc::clone(&store),
        SessionManager::new(),
        TrackerClient::new().context("failed to build tracker client")?,
        cli.reset_commands,
    );

    let mut client = Client::builder(&cli.discord_token, GatewayIntents::MESSAGE_CONTENT)
        .event_handler(handler)
        .await
        .context("failed to create discord client")?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(%error, "failed to listen for shutdown signal");
            return;
        }
        info!("graceful shutdown");
        shard_manager.shutdown_all().await;
    });

    client.start().await.context("discord client stopped")?;
    Ok(())
}
