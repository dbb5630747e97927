mod config;
mod cursor;
mod error;
mod funding;
mod keys;
mod ledger;
mod notify;
mod vanity;
mod watcher;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    config::{Settings, WatchArgs, WatcherConfig},
    cursor::FileCursorStore,
    funding::FriendbotClient,
    ledger::horizon::{HorizonClient, HorizonConfig},
    notify::{DryRunNotifier, Notifier, WebhookConfig, WebhookNotifier},
    watcher::{default_filters, Watcher},
};

#[derive(Parser)]
#[command(author, version, about = "Stellar payment watcher and account tools", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Notifies new payments to/from an account (one cycle, or every --interval seconds)
    Watch(WatchArgs),
    /// Searches for a keypair whose address ends with SUFFIX
    Vanity {
        suffix: String,
    },
    /// Creates and funds testnet accounts, writing them to OUTPUT as JSON
    Fund {
        num_accounts: usize,
        output: PathBuf,
        #[arg(long)]
        friendbot_url: Option<String>,
    },
}

// Initialize logging and tracing
fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,stargazer=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let settings = Settings::new().context("Failed to load stargazer settings")?;

    match cli.command {
        Commands::Watch(args) => run_watch(settings, args).await,
        Commands::Vanity { suffix } => run_vanity(&suffix),
        Commands::Fund {
            num_accounts,
            output,
            friendbot_url,
        } => run_fund(settings, num_accounts, output, friendbot_url).await,
    }
}

async fn run_watch(settings: Settings, args: WatchArgs) -> anyhow::Result<()> {
    let config = WatcherConfig::resolve(settings, args)?;

    let notifier: Arc<dyn Notifier> = match (&config.webhook_url, config.dry_run) {
        (Some(url), false) => Arc::new(WebhookNotifier::new(WebhookConfig {
            timeout: config.notify_timeout,
            ..WebhookConfig::new(url.clone())
        })?),
        (url, _) => Arc::new(DryRunNotifier::new(
            url.clone().unwrap_or_else(|| "stdout".to_string()),
        )),
    };

    let source = Arc::new(HorizonClient::new(HorizonConfig {
        horizon_url: config.horizon_url.clone(),
        page_size: config.page_size,
        ..Default::default()
    })?);
    let store = Arc::new(FileCursorStore::new(config.data_dir.clone()));

    info!(
        "🚀 Watching {} via {} (cursors in {}, minimum amount {}{})",
        config.account,
        config.horizon_url,
        store.data_dir().display(),
        config.minimum_amount,
        if config.dry_run { ", dry run" } else { "" }
    );

    let watcher = Watcher::new(
        config.account.clone(),
        config.explorer_url.clone(),
        source,
        store,
        notifier,
        default_filters(config.minimum_amount),
    );

    match config.poll_interval {
        Some(every) => watcher.run(every).await?,
        None => {
            let outcome = watcher.poll().await?;
            if let Some(cursor) = outcome.cursor {
                info!("Cursor for {} advanced to {}", config.account, cursor);
            }
        }
    }

    Ok(())
}

fn run_vanity(suffix: &str) -> anyhow::Result<()> {
    let found = vanity::find_suffix(suffix)?;

    println!("Found one ending with '{}' in {} tries", found.suffix, found.tries);
    println!("Public Key = {}", found.keypair.address);
    println!("Secret Key = {}", found.keypair.secret);
    println!();
    println!("#########################################################");
    println!("# If you want it, save BOTH the secret AND public keys! #");
    println!("#########################################################");

    Ok(())
}

async fn run_fund(
    settings: Settings,
    num_accounts: usize,
    output: PathBuf,
    friendbot_url: Option<String>,
) -> anyhow::Result<()> {
    let client = FriendbotClient::new(friendbot_url.unwrap_or(settings.friendbot_url))?;

    let funded = client.create_funded_accounts(num_accounts).await;
    funded
        .write_to(&output)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;

    info!(
        "✓ Wrote {} funded accounts to {}",
        funded.accounts.len(),
        output.display()
    );
    Ok(())
}
