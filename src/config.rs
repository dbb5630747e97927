use clap::Args;
use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{AppError, AppResult};
use crate::funding::DEFAULT_FRIENDBOT_URL;
use crate::keys::validate_account;
use crate::watcher::message::DEFAULT_EXPLORER_URL;

/// Raw settings, layered from defaults, an optional `stargazer.{toml,yaml,json}`
/// file and `STARGAZER_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_minimum_amount")]
    pub minimum_amount: String,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default = "default_horizon_url")]
    pub horizon_url: String,
    #[serde(default = "default_explorer_url")]
    pub explorer_url: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_notify_timeout_secs")]
    pub notify_timeout_secs: u64,
    #[serde(default)]
    pub poll_interval_secs: Option<u64>,
    #[serde(default = "default_friendbot_url")]
    pub friendbot_url: String,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("/var/lib/stargazer")
}

fn default_minimum_amount() -> String {
    "0".to_string()
}

fn default_horizon_url() -> String {
    "https://horizon.stellar.org".to_string()
}

fn default_explorer_url() -> String {
    DEFAULT_EXPLORER_URL.to_string()
}

fn default_page_size() -> u32 {
    10
}

fn default_notify_timeout_secs() -> u64 {
    5
}

fn default_friendbot_url() -> String {
    DEFAULT_FRIENDBOT_URL.to_string()
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_config(
            Config::builder()
                .add_source(File::with_name("stargazer").required(false))
                .add_source(Environment::with_prefix("STARGAZER").try_parsing(true)),
        )
    }

    fn from_config(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        builder.build()?.try_deserialize()
    }
}

/// `watch` command line flags; each one overrides the matching setting
#[derive(Debug, Clone, Default, Args)]
pub struct WatchArgs {
    /// Stellar account (G...) to watch
    #[arg(long)]
    pub account: Option<String>,
    /// Incoming webhook receiving {"text": ...} notifications
    #[arg(long)]
    pub webhook_url: Option<String>,
    /// Print notifications instead of sending them
    #[arg(long)]
    pub dry_run: bool,
    /// Directory holding one cursor file per account
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
    /// Payments below this amount are skipped silently
    #[arg(long)]
    pub minimum_amount: Option<String>,
    #[arg(long)]
    pub horizon_url: Option<String>,
    /// Keep polling every N seconds instead of running a single cycle
    #[arg(long)]
    pub interval: Option<u64>,
}

/// Validated watcher configuration
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    pub account: String,
    pub webhook_url: Option<String>,
    pub data_dir: PathBuf,
    pub minimum_amount: Decimal,
    pub dry_run: bool,
    pub horizon_url: String,
    pub explorer_url: String,
    pub page_size: u32,
    pub notify_timeout: Duration,
    pub poll_interval: Option<Duration>,
}

impl WatcherConfig {
    pub fn resolve(settings: Settings, args: WatchArgs) -> AppResult<Self> {
        let account = args
            .account
            .or(settings.account)
            .filter(|a| !a.trim().is_empty())
            .ok_or_else(|| {
                AppError::Config(
                    "Please provide the account to watch (--account or STARGAZER_ACCOUNT)"
                        .to_string(),
                )
            })?;
        validate_account(&account)?;

        let dry_run = args.dry_run || settings.dry_run;
        let webhook_url = args.webhook_url.or(settings.webhook_url);
        if !dry_run && webhook_url.is_none() {
            return Err(AppError::Config(
                "Please provide a webhook URL (--webhook-url or STARGAZER_WEBHOOK_URL) or use --dry-run"
                    .to_string(),
            ));
        }

        let raw_minimum = args.minimum_amount.unwrap_or(settings.minimum_amount);
        let minimum_amount = Decimal::from_str(raw_minimum.trim()).map_err(|e| {
            AppError::Config(format!("Invalid minimum amount {:?}: {}", raw_minimum, e))
        })?;
        if minimum_amount.is_sign_negative() {
            return Err(AppError::Config(format!(
                "Minimum amount must not be negative: {}",
                minimum_amount
            )));
        }

        if settings.page_size == 0 || settings.page_size > 200 {
            return Err(AppError::Config(format!(
                "Page size must be between 1 and 200, got {}",
                settings.page_size
            )));
        }

        let poll_interval = match args.interval.or(settings.poll_interval_secs) {
            Some(0) => {
                return Err(AppError::Config(
                    "Poll interval must be at least one second".to_string(),
                ))
            }
            other => other.map(Duration::from_secs),
        };

        Ok(Self {
            account,
            webhook_url,
            data_dir: args.data_dir.unwrap_or(settings.data_dir),
            minimum_amount,
            dry_run,
            horizon_url: args.horizon_url.unwrap_or(settings.horizon_url),
            explorer_url: settings.explorer_url,
            page_size: settings.page_size,
            notify_timeout: Duration::from_secs(settings.notify_timeout_secs),
            poll_interval,
        })
    }
}
