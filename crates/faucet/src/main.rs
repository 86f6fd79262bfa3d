//! Faucet service binary

use ae_faucet::api::{self, AppState, PageContext};
use ae_faucet::encoding::format_ae;
use ae_faucet::logging::init_logging;
use ae_faucet::metrics::MetricsCollector;
use ae_faucet::notify::{NoopNotifier, Notifier, TelegramNotifier};
use ae_faucet::{
    AeternityNode, Clock, FaucetConfig, FaucetService, Graylist, SystemClock, TopUpSettings, TransferService,
};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

/// Faucet service CLI. Every flag overrides the matching environment variable.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Faucet account private key (hex)
    #[arg(long)]
    faucet_account_priv_key: Option<String>,

    /// Top-up amount in AE
    #[arg(long)]
    topup_amount: Option<String>,

    /// Payload attached to spend transactions
    #[arg(long)]
    spend_tx_payload: Option<String>,

    /// Node URL
    #[arg(long)]
    node_url: Option<String>,

    /// Explorer URL
    #[arg(long)]
    explorer_url: Option<String>,

    /// Support contact shown on failed top-ups
    #[arg(long)]
    support_email: Option<String>,

    /// Graylist size
    #[arg(long)]
    cache_max_size: Option<u64>,

    /// Graylist TTL (seconds)
    #[arg(long)]
    cache_max_age: Option<u64>,

    /// Graylist sweep interval (seconds)
    #[arg(long)]
    cache_check_period: Option<u64>,

    /// Log level
    #[arg(long)]
    log_level: Option<String>,

    /// Log format (pretty, compact, json)
    #[arg(long)]
    log_format: Option<String>,

    /// Listen address
    #[arg(long)]
    listen_address: Option<String>,

    /// Listen port
    #[arg(long)]
    listen_port: Option<u16>,

    /// Static assets directory
    #[arg(long)]
    assets_dir: Option<PathBuf>,

    /// Spend transaction TTL (0 means none)
    #[arg(long)]
    tx_ttl: Option<u64>,

    /// Node request timeout (seconds)
    #[arg(long)]
    node_timeout_secs: Option<u64>,

    /// Telegram bot token
    #[arg(long)]
    telegram_api_token: Option<String>,

    /// Telegram chat id
    #[arg(long)]
    telegram_chat_id: Option<String>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

impl Args {
    /// Override with CLI arguments
    fn apply(self, config: &mut FaucetConfig) {
        if let Some(key) = self.faucet_account_priv_key {
            config.private_key = Some(key);
        }
        if let Some(amount) = self.topup_amount {
            config.topup_amount = amount;
        }
        if let Some(payload) = self.spend_tx_payload {
            config.spend_tx_payload = payload;
        }
        if let Some(url) = self.node_url {
            config.node_url = url;
        }
        if let Some(url) = self.explorer_url {
            config.explorer_url = url;
        }
        if let Some(email) = self.support_email {
            config.support_email = email;
        }
        if let Some(size) = self.cache_max_size {
            config.cache_max_size = size;
        }
        if let Some(ttl) = self.cache_max_age {
            config.cache_max_age_secs = ttl;
        }
        if let Some(period) = self.cache_check_period {
            config.cache_check_period_secs = period;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        if let Some(addr) = self.listen_address {
            config.listen_address = addr;
        }
        if let Some(port) = self.listen_port {
            config.listen_port = port;
        }
        if let Some(dir) = self.assets_dir {
            config.assets_dir = dir;
        }
        if let Some(ttl) = self.tx_ttl {
            config.tx_ttl = ttl;
        }
        if let Some(secs) = self.node_timeout_secs {
            config.node_timeout_secs = secs;
        }
        if let Some(token) = self.telegram_api_token {
            config.telegram_api_token = Some(token);
        }
        if let Some(chat_id) = self.telegram_chat_id {
            config.telegram_chat_id = Some(chat_id);
        }
        if self.debug {
            config.log_level = "debug".to_string();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = FaucetConfig::from_env()?;
    args.apply(&mut config);

    init_logging(&config.logging())?;

    // Everything below must be valid before the first request is served
    let account = config.faucet_account()?;
    let amount = config.topup_aettos()?;
    let display_amount = config.display_amount()?;
    let addr = config.listen_addr()?;

    info!("Starting faucet service v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Node URL: {}", config.node_url);
    info!("  Top-up amount: {}", display_amount);
    info!(
        "  Graylist: {} entries, {}s cooldown",
        config.cache_max_size, config.cache_max_age_secs
    );

    let faucet_id = account.id();
    let node = Arc::new(AeternityNode::new(&config.node_url, account, config.tx_ttl, config.node_timeout())?);
    info!("Faucet address: {}", faucet_id);
    match node.balance(&faucet_id).await {
        Ok(balance) => info!("Faucet balance: {} AE", format_ae(balance)),
        Err(e) => warn!("Could not read faucet balance: {}", e),
    }

    let notifier: Arc<dyn Notifier> = match (config.telegram_api_token.clone(), config.telegram_chat_id.clone()) {
        (Some(token), Some(chat_id)) => {
            info!("Telegram notifications enabled");
            Arc::new(TelegramNotifier::new(token, chat_id)?)
        }
        (Some(_), None) => {
            warn!("TELEGRAM_API_TOKEN is set but TELEGRAM_CHAT_ID is missing, notifications disabled");
            Arc::new(NoopNotifier)
        }
        _ => Arc::new(NoopNotifier),
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let graylist_config = config.graylist();
    let graylist = Arc::new(Graylist::new(&graylist_config, clock.clone()));
    let sweeper = graylist.spawn_sweeper(graylist_config.sweep_interval);

    let settings = TopUpSettings {
        amount,
        display_amount: display_amount.clone(),
        memo: config.spend_tx_payload.clone(),
        node_host: config.node_host().to_string(),
    };
    let transfer: Arc<dyn TransferService> = node;
    let service = FaucetService::new(settings, graylist, transfer, notifier, clock);

    let state = Arc::new(AppState {
        service,
        page: PageContext {
            amount: display_amount,
            node_url: config.node_url.clone(),
            explorer_url: config.explorer_url.clone(),
        },
        support_email: config.support_email.clone(),
        metrics: MetricsCollector::new()?,
    });
    let app = api::router(state, config.assets_dir.clone());

    info!("Faucet listening at http://{}", addr);
    info!("Log-level: {}", config.log_level);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    info!("Shutting down gracefully");
    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }
}
