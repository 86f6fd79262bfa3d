//! Faucet configuration

use crate::account::{FaucetAccount, KeyError};
use crate::encoding::{format_ae, parse_ae, AmountError};
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("ENV-variable missing: {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {name}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("invalid faucet private key: {0}")]
    Key(#[from] KeyError),

    #[error("invalid top-up amount: {0}")]
    Amount(#[from] AmountError),
}

/// Faucet service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaucetConfig {
    /// Faucet account private key (hex). Required.
    #[serde(skip_serializing)]
    pub private_key: Option<String>,

    /// Amount sent per top-up, in AE
    pub topup_amount: String,

    /// Payload attached to every spend transaction
    pub spend_tx_payload: String,

    /// Node HTTP endpoint
    pub node_url: String,

    /// Explorer linked from the landing page
    pub explorer_url: String,

    /// Contact shown when a top-up fails
    pub support_email: String,

    /// Maximum number of graylisted addresses
    pub cache_max_size: u64,

    /// Graylist TTL (seconds)
    pub cache_max_age_secs: u64,

    /// Graylist sweep interval (seconds)
    pub cache_check_period_secs: u64,

    /// Log level / filter directive
    pub log_level: String,

    /// Log format (pretty, compact, json)
    pub log_format: String,

    pub listen_address: String,

    pub listen_port: u16,

    /// Directory served under `/assets`
    pub assets_dir: PathBuf,

    /// Spend transaction TTL (0 means no TTL)
    pub tx_ttl: u64,

    /// Timeout for node HTTP calls (seconds)
    pub node_timeout_secs: u64,

    pub telegram_api_token: Option<String>,

    pub telegram_chat_id: Option<String>,
}

/// Graylist settings derived from [`FaucetConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraylistConfig {
    pub max_size: u64,
    pub ttl: Duration,
    pub sweep_interval: Duration,
}

impl Default for FaucetConfig {
    fn default() -> Self {
        Self {
            private_key: None,
            topup_amount: "5".to_string(),
            spend_tx_payload: "Faucet Tx".to_string(),
            node_url: "https://testnet.aeternity.io".to_string(),
            explorer_url: "https://explorer.testnet.aeternity.io".to_string(),
            support_email: "aepp-dev@aeternity.com".to_string(),
            cache_max_size: 6000,
            cache_max_age_secs: 3600 * 4, // 4 hours
            cache_check_period_secs: 60,
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            listen_address: "0.0.0.0".to_string(),
            listen_port: 5000,
            assets_dir: PathBuf::from("assets"),
            tx_ttl: 0,
            node_timeout_secs: 30,
            telegram_api_token: None,
            telegram_chat_id: None,
        }
    }
}

impl FaucetConfig {
    /// Load from environment variables with defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        config.private_key = get("FAUCET_ACCOUNT_PRIV_KEY");

        if let Some(amount) = get("TOPUP_AMOUNT") {
            config.topup_amount = amount;
        }
        if let Some(payload) = get("SPEND_TX_PAYLOAD") {
            config.spend_tx_payload = payload;
        }
        if let Some(url) = get("NODE_URL") {
            config.node_url = url;
        }
        if let Some(url) = get("EXPLORER_URL") {
            config.explorer_url = url;
        }
        if let Some(email) = get("SUPPORT_EMAIL") {
            config.support_email = email;
        }
        if let Some(level) = get("FAUCET_LOG_LEVEL") {
            config.log_level = level;
        }
        if let Some(format) = get("FAUCET_LOG_FORMAT") {
            config.log_format = format;
        }
        if let Some(addr) = get("SERVER_LISTEN_ADDRESS") {
            config.listen_address = addr;
        }
        if let Some(dir) = get("FAUCET_ASSETS_DIR") {
            config.assets_dir = PathBuf::from(dir);
        }

        config.cache_max_size = parse_var("CACHE_MAX_SIZE", get("CACHE_MAX_SIZE"), config.cache_max_size)?;
        config.cache_max_age_secs = parse_var("CACHE_MAX_AGE", get("CACHE_MAX_AGE"), config.cache_max_age_secs)?;
        config.cache_check_period_secs = parse_var(
            "CACHE_CHECK_PERIOD",
            get("CACHE_CHECK_PERIOD"),
            config.cache_check_period_secs,
        )?;
        config.listen_port = parse_var("SERVER_LISTEN_PORT", get("SERVER_LISTEN_PORT"), config.listen_port)?;
        config.tx_ttl = parse_var("TX_TTL", get("TX_TTL"), config.tx_ttl)?;
        config.node_timeout_secs = parse_var("NODE_TIMEOUT_SECS", get("NODE_TIMEOUT_SECS"), config.node_timeout_secs)?;

        config.telegram_api_token = get("TELEGRAM_API_TOKEN");
        config.telegram_chat_id = get("TELEGRAM_CHAT_ID");

        Ok(config)
    }

    /// Build the custodial account; fails when the key is absent or malformed.
    pub fn faucet_account(&self) -> Result<FaucetAccount, ConfigError> {
        let key = self
            .private_key
            .as_deref()
            .ok_or(ConfigError::Missing("FAUCET_ACCOUNT_PRIV_KEY"))?;
        Ok(FaucetAccount::from_hex(key)?)
    }

    /// Top-up amount in aettos
    pub fn topup_aettos(&self) -> Result<u128, ConfigError> {
        Ok(parse_ae(&self.topup_amount)?)
    }

    /// Amount as shown to users, e.g. `5 AE`
    pub fn display_amount(&self) -> Result<String, ConfigError> {
        Ok(format!("{} AE", format_ae(self.topup_aettos()?)))
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip = IpAddr::from_str(&self.listen_address).map_err(|e| ConfigError::Invalid {
            name: "SERVER_LISTEN_ADDRESS",
            value: self.listen_address.clone(),
            reason: e.to_string(),
        })?;
        Ok(SocketAddr::new(ip, self.listen_port))
    }

    pub fn graylist(&self) -> GraylistConfig {
        GraylistConfig {
            max_size: self.cache_max_size,
            ttl: Duration::from_secs(self.cache_max_age_secs),
            sweep_interval: Duration::from_secs(self.cache_check_period_secs.max(1)),
        }
    }

    pub fn logging(&self) -> LoggingConfig {
        LoggingConfig {
            level: self.log_level.clone(),
            format: self.log_format.clone(),
            ..Default::default()
        }
    }

    pub fn node_timeout(&self) -> Duration {
        Duration::from_secs(self.node_timeout_secs)
    }

    /// Node host without scheme, as used in notifications
    pub fn node_host(&self) -> &str {
        self.node_url
            .trim_start_matches("https://")
            .trim_start_matches("http://")
    }
}

fn parse_var<T>(name: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SEED: &str = "0101010101010101010101010101010101010101010101010101010101010101";

    fn load(vars: &[(&str, &str)]) -> Result<FaucetConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        FaucetConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.topup_amount, "5");
        assert_eq!(config.spend_tx_payload, "Faucet Tx");
        assert_eq!(config.cache_max_size, 6000);
        assert_eq!(config.cache_max_age_secs, 14400);
        assert_eq!(config.listen_addr().unwrap(), "0.0.0.0:5000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.display_amount().unwrap(), "5 AE");
        assert_eq!(config.node_host(), "testnet.aeternity.io");

        let graylist = config.graylist();
        assert_eq!(graylist.ttl, Duration::from_secs(14400));
        assert_eq!(graylist.sweep_interval, Duration::from_secs(60));
    }

    #[test]
    fn test_private_key_is_required() {
        let config = load(&[]).unwrap();
        assert!(matches!(
            config.faucet_account(),
            Err(ConfigError::Missing("FAUCET_ACCOUNT_PRIV_KEY"))
        ));

        let config = load(&[("FAUCET_ACCOUNT_PRIV_KEY", "  ")]).unwrap();
        assert!(config.faucet_account().is_err());

        let config = load(&[("FAUCET_ACCOUNT_PRIV_KEY", SEED)]).unwrap();
        assert!(config.faucet_account().is_ok());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("TOPUP_AMOUNT", "0.5"),
            ("CACHE_MAX_SIZE", "10"),
            ("CACHE_MAX_AGE", "60"),
            ("SERVER_LISTEN_ADDRESS", "127.0.0.1"),
            ("SERVER_LISTEN_PORT", "8080"),
            ("NODE_URL", "http://localhost:3013"),
            ("TELEGRAM_API_TOKEN", "token"),
        ])
        .unwrap();

        assert_eq!(config.display_amount().unwrap(), "0.5 AE");
        assert_eq!(config.graylist().max_size, 10);
        assert_eq!(config.graylist().ttl, Duration::from_secs(60));
        assert_eq!(config.listen_addr().unwrap(), "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.node_host(), "localhost:3013");
        assert_eq!(config.telegram_api_token.as_deref(), Some("token"));
        assert!(config.telegram_chat_id.is_none());
    }

    #[test]
    fn test_rejects_unparsable_numbers() {
        let err = load(&[("CACHE_MAX_AGE", "four hours")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "CACHE_MAX_AGE", .. }));

        let config = load(&[("TOPUP_AMOUNT", "lots")]).unwrap();
        assert!(matches!(config.topup_aettos(), Err(ConfigError::Amount(_))));

        let config = load(&[("SERVER_LISTEN_ADDRESS", "localhost")]).unwrap();
        assert!(config.listen_addr().is_err());
    }
}
