//! Scanner configuration: TOML file with environment overrides for secrets.
//!
//! Detection thresholds are deliberately configurable rather than hard-coded:
//! the slot-model buyer-count rule and the account-model fan-out rule use
//! independently chosen thresholds with no assumed equivalence.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Main configuration for the scanner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub providers: ProviderConfig,
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
    #[serde(default)]
    pub tracer: TracerConfig,
}

/// Upstream provider endpoints and credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// DEX Screener base URL (pair resolution)
    #[serde(default = "default_dex_screener_url")]
    pub dex_screener_url: String,
    /// GoPlus-style security audit base URL
    #[serde(default = "default_security_url")]
    pub security_url: String,
    /// Solana enhanced-transaction API base URL (Helius-flavored)
    #[serde(default = "default_solana_api_url")]
    pub solana_api_url: String,
    /// Solana JSON-RPC URL (holder and supply lookups)
    #[serde(default = "default_solana_rpc_url")]
    pub solana_rpc_url: String,
    /// Solana provider API key; absence skips Solana forensics and tracing
    #[serde(default)]
    pub solana_api_key: Option<String>,
    /// EVM explorer API key; absence skips EVM forensics and tracing
    #[serde(default)]
    pub evm_api_key: Option<String>,
    /// HTTP timeout per request (seconds)
    #[serde(default = "default_api_timeout_secs")]
    pub api_timeout_secs: u64,
    /// Rate limit for provider APIs (requests per minute)
    #[serde(default = "default_rate_limit_per_minute")]
    pub rate_limit_per_minute: u32,
}

/// Thresholds for the launch-window bundle-cluster verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Slot-model: distinct launch-window buyers that flag a cluster
    #[serde(default = "default_min_launch_buyers")]
    pub min_launch_buyers: usize,
    /// Slot-model fallback: distinct early-window buyers that flag a cluster
    #[serde(default = "default_min_early_buyers")]
    pub min_early_buyers: usize,
    /// Account-model: distinct recipients a single seller must fan out to
    #[serde(default = "default_min_fanout_recipients")]
    pub min_fanout_recipients: usize,
    /// Top holders considered for concentration (cap)
    #[serde(default = "default_max_holders")]
    pub max_holders: usize,
}

/// Bounds and pacing for the distribution-tree trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TracerConfig {
    /// Hard cap on total traced wallets across all hop levels
    #[serde(default = "default_max_total_wallets")]
    pub max_total_wallets: usize,
    /// Delay between sequential per-wallet fetches within a level (ms)
    #[serde(default = "default_inter_call_delay_ms")]
    pub inter_call_delay_ms: u64,
    /// Concurrent group size for terminal-hop balance lookups
    #[serde(default = "default_balance_batch_size")]
    pub balance_batch_size: usize,
    /// Delay between terminal-hop balance groups (ms)
    #[serde(default = "default_balance_batch_delay_ms")]
    pub balance_batch_delay_ms: u64,
    /// Native-asset inflows below this value are ignored for funding inference
    #[serde(default = "default_funding_dust_threshold")]
    pub funding_dust_threshold: f64,
    /// Funding inference lookback before the wallet's first buy (hours)
    #[serde(default = "default_funding_lookback_hours")]
    pub funding_lookback_hours: i64,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_dex_screener_url() -> String {
    "https://api.dexscreener.com/latest".to_string()
}
fn default_security_url() -> String {
    "https://api.gopluslabs.io/api/v1".to_string()
}
fn default_solana_api_url() -> String {
    "https://api.helius.xyz".to_string()
}
fn default_solana_rpc_url() -> String {
    "https://mainnet.helius-rpc.com".to_string()
}
fn default_api_timeout_secs() -> u64 {
    10
}
fn default_rate_limit_per_minute() -> u32 {
    60
}
fn default_min_launch_buyers() -> usize {
    3
}
fn default_min_early_buyers() -> usize {
    5
}
fn default_min_fanout_recipients() -> usize {
    3
}
fn default_max_holders() -> usize {
    20
}
fn default_max_total_wallets() -> usize {
    400
}
fn default_inter_call_delay_ms() -> u64 {
    200
}
fn default_balance_batch_size() -> usize {
    5
}
fn default_balance_batch_delay_ms() -> u64 {
    500
}
fn default_funding_dust_threshold() -> f64 {
    0.001
}
fn default_funding_lookback_hours() -> i64 {
    24
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            dex_screener_url: default_dex_screener_url(),
            security_url: default_security_url(),
            solana_api_url: default_solana_api_url(),
            solana_rpc_url: default_solana_rpc_url(),
            solana_api_key: None,
            evm_api_key: None,
            api_timeout_secs: default_api_timeout_secs(),
            rate_limit_per_minute: default_rate_limit_per_minute(),
        }
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            min_launch_buyers: default_min_launch_buyers(),
            min_early_buyers: default_min_early_buyers(),
            min_fanout_recipients: default_min_fanout_recipients(),
            max_holders: default_max_holders(),
        }
    }
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            max_total_wallets: default_max_total_wallets(),
            inter_call_delay_ms: default_inter_call_delay_ms(),
            balance_batch_size: default_balance_batch_size(),
            balance_batch_delay_ms: default_balance_batch_delay_ms(),
            funding_dust_threshold: default_funding_dust_threshold(),
            funding_lookback_hours: default_funding_lookback_hours(),
        }
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            providers: ProviderConfig::default(),
            analyzer: AnalyzerConfig::default(),
            tracer: TracerConfig::default(),
        }
    }
}

impl ScannerConfig {
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: ScannerConfig = toml::from_str(&contents)?;

        // Override with environment variables if present (for secrets)
        if let Ok(key) = std::env::var("SOLANA_API_KEY") {
            if !key.is_empty() {
                config.providers.solana_api_key = Some(key);
            }
        }
        if let Ok(key) = std::env::var("EVM_API_KEY") {
            if !key.is_empty() {
                config.providers.evm_api_key = Some(key);
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Build a default config with secrets pulled from the environment.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(key) = std::env::var("SOLANA_API_KEY") {
            if !key.is_empty() {
                config.providers.solana_api_key = Some(key);
            }
        }
        if let Ok(key) = std::env::var("EVM_API_KEY") {
            if !key.is_empty() {
                config.providers.evm_api_key = Some(key);
            }
        }
        config
    }

    pub fn validate(&self) -> Result<()> {
        crate::security::validate_api_url(&self.providers.dex_screener_url)?;
        crate::security::validate_api_url(&self.providers.security_url)?;
        crate::security::validate_api_url(&self.providers.solana_api_url)?;
        crate::security::validate_api_url(&self.providers.solana_rpc_url)?;
        if self.tracer.max_total_wallets == 0 {
            anyhow::bail!("tracer.max_total_wallets must be at least 1");
        }
        if self.tracer.balance_batch_size == 0 {
            anyhow::bail!("tracer.balance_batch_size must be at least 1");
        }
        Ok(())
    }

    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.log_level.clone()));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}
