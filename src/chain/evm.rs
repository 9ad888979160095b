//! EVM-flavored chain adapter backed by Etherscan-style explorer APIs.
//!
//! Supported chains live in an immutable registry mapping the DEX-screener
//! chain identifier to the explorer host and numeric chain id. A chain
//! missing from the registry is an explicit `UnsupportedChain`, never a
//! silent default.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::{ChainAdapter, NativeInflow, TokenMovement, WalletActivity};
use crate::config::ProviderConfig;
use crate::types::{ForensicSnapshot, NormalizedHolder, NormalizedTransfer, TransferKind};
use crate::utils::retry::call_api_with_retry;

/// Launch window: creation block plus this many blocks.
const LAUNCH_WINDOW_BLOCKS: u64 = 3;
/// Early window: creation block plus this many blocks.
const EARLY_WINDOW_BLOCKS: u64 = 30;
/// Transfer records fetched for the forensic windows.
const FORENSIC_FETCH_LIMIT: usize = 300;
/// Wallet activity records fetched per address.
const ACTIVITY_FETCH_LIMIT: usize = 100;

/// One supported account-model chain.
#[derive(Debug, Clone, Copy)]
pub struct ChainInfo {
    /// DEX-screener chain identifier
    pub chain_id: &'static str,
    /// Numeric chain id (EIP-155)
    pub numeric_id: u64,
    /// Explorer API host
    pub explorer_host: &'static str,
}

/// Immutable chain registry. Extend here to support a new chain.
pub const CHAIN_REGISTRY: &[ChainInfo] = &[
    ChainInfo {
        chain_id: "ethereum",
        numeric_id: 1,
        explorer_host: "api.etherscan.io",
    },
    ChainInfo {
        chain_id: "bsc",
        numeric_id: 56,
        explorer_host: "api.bscscan.com",
    },
    ChainInfo {
        chain_id: "base",
        numeric_id: 8453,
        explorer_host: "api.basescan.org",
    },
    ChainInfo {
        chain_id: "polygon",
        numeric_id: 137,
        explorer_host: "api.polygonscan.com",
    },
    ChainInfo {
        chain_id: "arbitrum",
        numeric_id: 42161,
        explorer_host: "api.arbiscan.io",
    },
    ChainInfo {
        chain_id: "avalanche",
        numeric_id: 43114,
        explorer_host: "api.snowscan.xyz",
    },
];

/// Look up a chain by DEX-screener identifier.
pub fn lookup_chain(chain_id: &str) -> Option<&'static ChainInfo> {
    CHAIN_REGISTRY.iter().find(|c| c.chain_id == chain_id)
}

/// Zero and burn addresses; transfers from these are mint-like noise.
pub const ZERO_ADDRESSES: &[&str] = &[
    "0x0000000000000000000000000000000000000000",
    "0x000000000000000000000000000000000000dead",
];

/// Whether an address is the zero/burn address (or absent entirely).
pub fn is_zero_or_burn(address: &str) -> bool {
    address.is_empty() || ZERO_ADDRESSES.contains(&address.to_lowercase().as_str())
}

/// DEX routers and burn sinks; infrastructure, not holders.
const EXCLUDED_INFRA: &[&str] = &[
    "0x0000000000000000000000000000000000000000", // zero
    "0x000000000000000000000000000000000000dead", // burn
    "0x7a250d5630b4cf539739df2c5dacb4c659f2488d", // Uniswap V2 router
    "0xe592427a0aece92de3edee1f18e0157c05861564", // Uniswap V3 router
    "0x68b3465833fb72a70ecdf485e0e4c7bd8665fc45", // Uniswap V3 router 2
    "0x3fc91a3afd70395cd496c647d5a6cc9d4b2b7fad", // Uniswap universal router
    "0x10ed43c718714eb63d5aa57b78b54704e256024e", // PancakeSwap router
    "0x1111111254eeb25477b68fb85ed929f73a960582", // 1inch aggregator
];

/// Etherscan-style envelope; `result` is a list on success and an error
/// string otherwise, so it stays untyped until the status is checked.
#[derive(Debug, Deserialize)]
struct ExplorerResponse {
    status: String,
    message: String,
    result: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenTxRecord {
    block_number: String,
    time_stamp: String,
    hash: String,
    from: String,
    to: String,
    value: String,
    token_decimal: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NativeTxRecord {
    time_stamp: String,
    hash: String,
    from: String,
    to: String,
    value: String,
    #[serde(default)]
    is_error: String,
}

impl TokenTxRecord {
    fn block(&self) -> u64 {
        self.block_number.parse().unwrap_or(0)
    }

    fn amount(&self) -> f64 {
        let raw: f64 = self.value.parse().unwrap_or(0.0);
        let decimals: u32 = self.token_decimal.parse().unwrap_or(18);
        raw / 10f64.powi(decimals as i32)
    }

    fn timestamp(&self) -> DateTime<Utc> {
        let secs: i64 = self.time_stamp.parse().unwrap_or(0);
        DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now)
    }
}

/// Etherscan-flavored adapter for one account-model chain.
pub struct EvmAdapter {
    chain: &'static ChainInfo,
    api_key: String,
    http_client: Client,
    rate_limiter: Arc<
        RateLimiter<
            governor::state::direct::NotKeyed,
            governor::state::InMemoryState,
            governor::clock::DefaultClock,
        >,
    >,
    /// Token decimals observed in transfer records, keyed by lowercase
    /// contract address. `tokenbalance` returns raw units with no decimal
    /// hint of its own.
    token_decimals: RwLock<HashMap<String, u32>>,
}

impl EvmAdapter {
    pub fn new(config: &ProviderConfig, chain: &'static ChainInfo, api_key: String) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        let rate_limit = NonZeroU32::new(config.rate_limit_per_minute)
            .ok_or_else(|| anyhow!("rate_limit_per_minute must be non-zero"))?;
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_minute(rate_limit)));

        Ok(Self {
            chain,
            api_key,
            http_client,
            rate_limiter,
            token_decimals: RwLock::new(HashMap::new()),
        })
    }

    /// Record a token's decimal count from fetched transfer records.
    fn remember_decimals(&self, token: &str, records: &[TokenTxRecord]) {
        let Some(decimals) = records
            .iter()
            .find_map(|r| r.token_decimal.parse::<u32>().ok())
        else {
            return;
        };
        if let Ok(mut cache) = self.token_decimals.write() {
            cache.insert(token.to_lowercase(), decimals);
        }
    }

    /// Decimals seen for this token, or the ERC-20 default of 18.
    fn cached_decimals(&self, token: &str) -> u32 {
        self.token_decimals
            .read()
            .ok()
            .and_then(|cache| cache.get(&token.to_lowercase()).copied())
            .unwrap_or(18)
    }

    async fn explorer_get(&self, query: &str) -> Result<ExplorerResponse> {
        self.rate_limiter.until_ready().await;

        let url = format!(
            "https://{}/api?{}&apikey={}",
            self.chain.explorer_host, query, self.api_key
        );
        debug!(url = %crate::security::sanitize_for_logging(&url), "explorer request");

        call_api_with_retry(|| async {
            let response = self
                .http_client
                .get(&url)
                .send()
                .await
                .context("Failed to send request to explorer")?;

            if !response.status().is_success() {
                return Err(anyhow!("Explorer API error: {}", response.status()));
            }

            response
                .json::<ExplorerResponse>()
                .await
                .context("Failed to parse explorer response")
        })
        .await
    }

    /// Parse a success result list; "No transactions found" is an empty list.
    fn parse_records<T: serde::de::DeserializeOwned>(response: ExplorerResponse) -> Result<Vec<T>> {
        if response.status == "1" {
            serde_json::from_value(response.result).context("Unexpected explorer record shape")
        } else if response.message.contains("No transactions found") {
            Ok(Vec::new())
        } else {
            Err(anyhow!("Explorer error: {}", response.message))
        }
    }

    async fn token_transfers(&self, wallet: Option<&str>, token: &str, limit: usize) -> Result<Vec<TokenTxRecord>> {
        let query = match wallet {
            Some(w) => format!(
                "module=account&action=tokentx&contractaddress={}&address={}&page=1&offset={}&sort=asc",
                token, w, limit
            ),
            None => format!(
                "module=account&action=tokentx&contractaddress={}&page=1&offset={}&sort=asc",
                token, limit
            ),
        };
        let response = self.explorer_get(&query).await?;
        Self::parse_records(response)
    }

    async fn native_transactions(&self, wallet: &str) -> Result<Vec<NativeTxRecord>> {
        let query = format!(
            "module=account&action=txlist&address={}&page=1&offset={}&sort=desc",
            wallet, ACTIVITY_FETCH_LIMIT
        );
        let response = self.explorer_get(&query).await?;
        Self::parse_records(response)
    }

    fn classify(&self, wallet: &str, records: Vec<TokenTxRecord>) -> WalletActivity {
        let wallet_lower = wallet.to_lowercase();
        let mut activity = WalletActivity::default();

        for record in records {
            let from = record.from.to_lowercase();
            let to = record.to.to_lowercase();
            if from == to {
                continue; // self-transfer
            }
            if is_zero_or_burn(&from) || is_zero_or_burn(&to) {
                continue; // mint/burn noise, not trading activity
            }

            let movement = |counterparty: &str| TokenMovement {
                tx_hash: record.hash.clone(),
                counterparty: counterparty.to_string(),
                amount: record.amount(),
                timestamp: record.timestamp(),
            };

            if to == wallet_lower {
                if self.is_excluded(&from) {
                    // incoming from a router is a swap fill
                    activity.buys.push(movement(&from));
                } else {
                    activity.incoming_transfers.push(movement(&from));
                }
            } else if from == wallet_lower {
                if self.is_excluded(&to) {
                    activity.sells.push(movement(&to));
                } else {
                    activity.outgoing_transfers.push(movement(&to));
                }
            }
        }

        activity
    }
}

#[async_trait]
impl ChainAdapter for EvmAdapter {
    fn is_excluded(&self, address: &str) -> bool {
        EXCLUDED_INFRA.contains(&address.to_lowercase().as_str())
    }

    #[instrument(skip(self), fields(chain = self.chain.chain_id))]
    async fn fetch_activity(&self, wallet: &str, token: &str) -> Result<WalletActivity> {
        crate::security::validate_evm_address(wallet)?;

        let records = self
            .token_transfers(Some(wallet), token, ACTIVITY_FETCH_LIMIT)
            .await?;
        self.remember_decimals(token, &records);
        let mut activity = self.classify(wallet, records);

        // Native history feeds funding-source inference; its failure must
        // not cost us the token movements we already have.
        match self.native_transactions(wallet).await {
            Ok(txs) => {
                let wallet_lower = wallet.to_lowercase();
                activity.native_inflows = txs
                    .into_iter()
                    .filter(|t| t.to.to_lowercase() == wallet_lower && t.is_error != "1")
                    .filter_map(|t| {
                        let amount: f64 = t.value.parse().ok()?;
                        if amount <= 0.0 {
                            return None;
                        }
                        let secs: i64 = t.time_stamp.parse().ok()?;
                        Some(NativeInflow {
                            tx_hash: t.hash,
                            sender: t.from,
                            amount: amount / 1e18,
                            timestamp: DateTime::from_timestamp(secs, 0)?,
                        })
                    })
                    .collect();
            }
            Err(e) => {
                warn!(wallet, error = %e, "Native transaction fetch failed, funding inference degraded");
            }
        }

        Ok(activity)
    }

    async fn fetch_balance(&self, wallet: &str, token: &str) -> Result<f64> {
        let query = format!(
            "module=account&action=tokenbalance&contractaddress={}&address={}&tag=latest",
            token, wallet
        );
        let response = self.explorer_get(&query).await?;
        if response.status != "1" {
            return Err(anyhow!("Explorer error: {}", response.message));
        }
        let raw: f64 = response
            .result
            .as_str()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.0);
        Ok(raw / 10f64.powi(self.cached_decimals(token) as i32))
    }

    #[instrument(skip(self), fields(chain = self.chain.chain_id))]
    async fn fetch_forensics(&self, token: &str) -> Result<ForensicSnapshot> {
        let records = self
            .token_transfers(None, token, FORENSIC_FETCH_LIMIT)
            .await?;
        self.remember_decimals(token, &records);

        if records.is_empty() {
            debug!(token, "No transfer history for token");
            return Ok(ForensicSnapshot::default());
        }

        let creation_block = records.iter().map(TokenTxRecord::block).min().unwrap_or(0);
        let launch_end = creation_block + LAUNCH_WINDOW_BLOCKS;
        let early_end = creation_block + EARLY_WINDOW_BLOCKS;

        let normalize = |r: &TokenTxRecord| NormalizedTransfer {
            tx_hash: r.hash.clone(),
            block: r.block(),
            buyer_address: r.to.to_lowercase(),
            seller_address: r.from.to_lowercase(),
            token_amount: r.amount(),
            usd_value: 0.0, // explorer carries no valuation; computed from price downstream
            kind: if is_zero_or_burn(&r.from) {
                TransferKind::Mint
            } else {
                TransferKind::Transfer
            },
        };

        let launch_transfers: Vec<NormalizedTransfer> = records
            .iter()
            .filter(|r| r.block() <= launch_end)
            .map(normalize)
            .collect();
        let early_transfers: Vec<NormalizedTransfer> = records
            .iter()
            .filter(|r| r.block() <= early_end)
            .map(normalize)
            .collect();

        // Explorer APIs expose no top-holder endpoint on the free tier; the
        // holder list stays empty and concentration scoring degrades to its
        // neutral branch.
        Ok(ForensicSnapshot {
            launch_transfers,
            early_transfers,
            top_holders: Vec::<NormalizedHolder>::new(),
            creation_block,
            total_supply: 0.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_lookup() {
        assert_eq!(lookup_chain("ethereum").unwrap().numeric_id, 1);
        assert_eq!(lookup_chain("base").unwrap().numeric_id, 8453);
        assert!(lookup_chain("tron").is_none());
        assert!(lookup_chain("").is_none());
    }

    #[test]
    fn test_zero_or_burn() {
        assert!(is_zero_or_burn("0x0000000000000000000000000000000000000000"));
        assert!(is_zero_or_burn("0x000000000000000000000000000000000000dEaD"));
        assert!(is_zero_or_burn(""));
        assert!(!is_zero_or_burn("0x7a250d5630b4cf539739df2c5dacb4c659f2488d"));
    }

    #[test]
    fn test_token_record_parsing() {
        let record = TokenTxRecord {
            block_number: "100".to_string(),
            time_stamp: "1700000000".to_string(),
            hash: "0xabc".to_string(),
            from: "0xfrom".to_string(),
            to: "0xto".to_string(),
            value: "5000000000000000000".to_string(),
            token_decimal: "18".to_string(),
        };
        assert_eq!(record.block(), 100);
        assert!((record.amount() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_balance_uses_observed_decimals() {
        let config = ProviderConfig::default();
        let adapter =
            EvmAdapter::new(&config, lookup_chain("ethereum").unwrap(), "k".into()).unwrap();
        let usdc = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";

        // Nothing observed yet: ERC-20 default
        assert_eq!(adapter.cached_decimals(usdc), 18);

        let record = TokenTxRecord {
            block_number: "1".to_string(),
            time_stamp: "1700000000".to_string(),
            hash: "0xabc".to_string(),
            from: "0xfrom".to_string(),
            to: "0xto".to_string(),
            value: "1000000".to_string(),
            token_decimal: "6".to_string(),
        };
        adapter.remember_decimals(usdc, std::slice::from_ref(&record));

        // Case-insensitive on the contract address
        assert_eq!(adapter.cached_decimals(usdc), 6);
        assert_eq!(adapter.cached_decimals(&usdc.to_lowercase()), 6);
        // Other tokens keep the default
        assert_eq!(
            adapter.cached_decimals("0x1111111111111111111111111111111111111111"),
            18
        );

        // Unparseable decimal fields never overwrite a cached value
        let bad = TokenTxRecord {
            token_decimal: "".to_string(),
            ..record
        };
        adapter.remember_decimals(usdc, &[bad]);
        assert_eq!(adapter.cached_decimals(usdc), 6);
    }

    #[test]
    fn test_classification() {
        let config = ProviderConfig::default();
        let adapter = EvmAdapter::new(&config, lookup_chain("ethereum").unwrap(), "k".into()).unwrap();

        let wallet = "0x1111111111111111111111111111111111111111";
        let router = "0x7a250d5630b4cf539739df2c5dacb4c659f2488d";
        let friend = "0x2222222222222222222222222222222222222222";
        let mk = |from: &str, to: &str| TokenTxRecord {
            block_number: "1".to_string(),
            time_stamp: "1700000000".to_string(),
            hash: "0xabc".to_string(),
            from: from.to_string(),
            to: to.to_string(),
            value: "1000000000000000000".to_string(),
            token_decimal: "18".to_string(),
        };

        let activity = adapter.classify(
            wallet,
            vec![
                mk(router, wallet), // buy
                mk(wallet, router), // sell
                mk(friend, wallet), // plain incoming
                mk(wallet, friend), // plain outgoing
                mk(wallet, wallet), // self-transfer, dropped
            ],
        );

        assert_eq!(activity.buys.len(), 1);
        assert_eq!(activity.sells.len(), 1);
        assert_eq!(activity.incoming_transfers.len(), 1);
        assert_eq!(activity.outgoing_transfers.len(), 1);
    }
}
