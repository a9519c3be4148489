//! Runtime configuration from environment variables.

use crate::domain::services::fee_collector::FeeConfig;
use crate::domain::services::limits::{DailyResetPolicy, TradeLimits};
use crate::infrastructure::retry::RetryPolicy;
use std::env;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value}")]
    Invalid { var: String, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub rpc_url: String,
    /// Override for the swap aggregator base URL; `None` uses the default.
    pub aggregator_url: Option<String>,
    /// Override for the market data base URL; `None` uses the default.
    pub market_data_url: Option<String>,
    pub data_dir: PathBuf,
    pub limits: TradeLimits,
    pub fee: FeeConfig,
    pub notifier_sends_per_minute: u32,
    pub retry: RetryPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let limits = TradeLimits {
            max_trades_per_day: parse_var("MINTWATCH_MAX_TRADES_PER_DAY", 10)?,
            daily_reset: parse_reset_policy()?,
            ..TradeLimits::default()
        };

        let fee = FeeConfig {
            collection_address: env::var("MINTWATCH_FEE_ADDRESS").ok().filter(|s| !s.is_empty()),
            ..FeeConfig::default()
        };

        Ok(Self {
            rpc_url: env::var("MINTWATCH_RPC_URL")
                .unwrap_or_else(|_| "https://api.mainnet-beta.solana.com".to_string()),
            aggregator_url: env::var("MINTWATCH_AGGREGATOR_URL").ok(),
            market_data_url: env::var("MINTWATCH_MARKET_DATA_URL").ok(),
            data_dir: env::var("MINTWATCH_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data")),
            limits,
            fee,
            notifier_sends_per_minute: parse_var("MINTWATCH_SENDS_PER_MINUTE", 60)?,
            retry: RetryPolicy::default(),
        })
    }
}

fn parse_var<T: std::str::FromStr>(var: &str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
            var: var.to_string(),
            value: raw,
        }),
        Err(_) => Ok(default),
    }
}

fn parse_reset_policy() -> Result<DailyResetPolicy, ConfigError> {
    let var = "MINTWATCH_DAILY_RESET";
    match env::var(var) {
        Ok(raw) => match raw.to_ascii_lowercase().as_str() {
            "calendar" => Ok(DailyResetPolicy::CalendarDayUtc),
            "rolling" => Ok(DailyResetPolicy::Rolling24h),
            "never" => Ok(DailyResetPolicy::Never),
            _ => Err(ConfigError::Invalid {
                var: var.to_string(),
                value: raw,
            }),
        },
        Err(_) => Ok(DailyResetPolicy::default()),
    }
}
