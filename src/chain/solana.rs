//! Solana-flavored chain adapter backed by a Helius-style enhanced
//! transaction API plus standard JSON-RPC for holder and supply lookups.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::{ChainAdapter, NativeInflow, TokenMovement, WalletActivity};
use crate::config::ProviderConfig;
use crate::types::{ForensicSnapshot, NormalizedHolder, NormalizedTransfer, TransferKind};
use crate::utils::retry::call_api_with_retry;

/// Launch window: creation slot plus this many slots (~2s).
const LAUNCH_WINDOW_SLOTS: u64 = 5;
/// Early window: creation slot plus this many slots (~48s).
const EARLY_WINDOW_SLOTS: u64 = 120;
/// Enhanced transactions fetched per address.
const ACTIVITY_FETCH_LIMIT: usize = 100;
/// Lamports per SOL.
const LAMPORTS_PER_SOL: f64 = 1e9;

/// System programs, DEX programs and AMM authorities; infrastructure, not
/// holders.
const EXCLUDED_INFRA: &[&str] = &[
    "11111111111111111111111111111111",             // System Program
    "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA",  // Token Program
    "ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL", // Associated Token Program
    "1nc1nerator11111111111111111111111111111111",  // Incinerator
    "675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8", // Raydium AMM v4
    "5Q544fKrFoe6tsEbD7S8EmxGTJYAKtTVhAW5Q5pge4j1", // Raydium authority
    "JUP6LkbZbjS1jKKwapdHNy74zcZ3tLUZoi5QNyVTaV4",  // Jupiter v6
    "whirLbMiicVdio4qvUfM5KAg6Ct8VwpYzGff3uctyCc",  // Orca Whirlpools
    "6EF8rrecthR5Dkzon8Nwu78hRvfCKubJ14M5uBEwF6P",  // Pump.fun
    "pAMMBay6oceH9fJKBRHGP5D4bD4sWpmSwMn52FMfXEA",  // Pump.fun AMM
];

/// Transaction sources that mark a record as swap-like.
const SWAP_SOURCES: &[&str] = &[
    "RAYDIUM",
    "JUPITER",
    "ORCA",
    "PUMP_FUN",
    "PUMP_AMM",
    "METEORA",
    "PHOENIX",
];

/// Enhanced transaction, as returned by the provider.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnhancedTransaction {
    signature: String,
    slot: u64,
    /// Unix seconds
    timestamp: i64,
    #[serde(rename = "type", default)]
    tx_type: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    token_transfers: Vec<EnhancedTokenTransfer>,
    #[serde(default)]
    native_transfers: Vec<EnhancedNativeTransfer>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnhancedTokenTransfer {
    #[serde(default)]
    from_user_account: String,
    #[serde(default)]
    to_user_account: String,
    #[serde(default)]
    mint: String,
    /// Already in human units
    #[serde(default)]
    token_amount: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnhancedNativeTransfer {
    #[serde(default)]
    from_user_account: String,
    #[serde(default)]
    to_user_account: String,
    /// Lamports
    #[serde(default)]
    amount: u64,
}

impl EnhancedTransaction {
    fn is_swap_like(&self) -> bool {
        self.tx_type == "SWAP" || SWAP_SOURCES.contains(&self.source.as_str())
    }

    fn datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.timestamp, 0).unwrap_or_else(Utc::now)
    }
}

/// Token balance entry from the balances endpoint.
#[derive(Debug, Clone, Deserialize)]
struct BalanceEntry {
    #[serde(default)]
    mint: String,
    /// Raw units
    #[serde(default)]
    amount: u64,
    #[serde(default)]
    decimals: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct BalancesResponse {
    #[serde(default)]
    tokens: Vec<BalanceEntry>,
}

/// Minimal JSON-RPC envelope for the holder/supply lookups.
#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<RpcResult<T>>,
}

#[derive(Debug, Deserialize)]
struct RpcResult<T> {
    value: T,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenAccountAmount {
    #[serde(default)]
    address: String,
    #[serde(default)]
    ui_amount: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SupplyAmount {
    #[serde(default)]
    ui_amount: Option<f64>,
}

/// jsonParsed account envelope. `data` stays untyped because the RPC falls
/// back to a base64 array for accounts it cannot parse.
#[derive(Debug, Clone, Deserialize)]
struct ParsedAccount {
    #[serde(default)]
    data: serde_json::Value,
}

/// Owner wallet of a parsed token account, when the RPC returned one.
fn account_owner(account: &Option<ParsedAccount>) -> Option<String> {
    account
        .as_ref()?
        .data
        .pointer("/parsed/info/owner")?
        .as_str()
        .map(str::to_string)
}

/// Helius-flavored adapter for Solana.
pub struct SolanaAdapter {
    api_base: String,
    rpc_base: String,
    api_key: String,
    http_client: Client,
    rate_limiter: Arc<
        RateLimiter<
            governor::state::direct::NotKeyed,
            governor::state::InMemoryState,
            governor::clock::DefaultClock,
        >,
    >,
}

impl SolanaAdapter {
    pub fn new(config: &ProviderConfig, api_key: String) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        let rate_limit = NonZeroU32::new(config.rate_limit_per_minute)
            .ok_or_else(|| anyhow!("rate_limit_per_minute must be non-zero"))?;
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_minute(rate_limit)));

        Ok(Self {
            api_base: config.solana_api_url.clone(),
            rpc_base: config.solana_rpc_url.clone(),
            api_key,
            http_client,
            rate_limiter,
        })
    }

    async fn enhanced_transactions(&self, address: &str) -> Result<Vec<EnhancedTransaction>> {
        self.rate_limiter.until_ready().await;

        let url = format!(
            "{}/v0/addresses/{}/transactions?api-key={}&limit={}",
            self.api_base, address, self.api_key, ACTIVITY_FETCH_LIMIT
        );
        debug!(url = %crate::security::sanitize_for_logging(&url), "enhanced transaction request");

        call_api_with_retry(|| async {
            let response = self
                .http_client
                .get(&url)
                .send()
                .await
                .context("Failed to send request to Solana provider")?;

            if !response.status().is_success() {
                return Err(anyhow!("Solana provider API error: {}", response.status()));
            }

            response
                .json::<Vec<EnhancedTransaction>>()
                .await
                .context("Failed to parse enhanced transactions")
        })
        .await
    }

    async fn rpc_call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}/?api-key={}", self.rpc_base, self.api_key);
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        call_api_with_retry(|| async {
            let response = self
                .http_client
                .post(&url)
                .json(&body)
                .send()
                .await
                .context("Failed to send RPC request")?;

            if !response.status().is_success() {
                return Err(anyhow!("Solana RPC error: {}", response.status()));
            }

            let parsed: RpcResponse<T> = response
                .json()
                .await
                .context("Failed to parse RPC response")?;
            parsed
                .result
                .map(|r| r.value)
                .ok_or_else(|| anyhow!("RPC returned no result for {}", method))
        })
        .await
    }

    async fn top_holders(&self, mint: &str) -> Result<Vec<NormalizedHolder>> {
        let accounts: Vec<TokenAccountAmount> = self
            .rpc_call("getTokenLargestAccounts", json!([mint]))
            .await?;
        let supply: SupplyAmount = self.rpc_call("getTokenSupply", json!([mint])).await?;
        let total = supply.ui_amount.unwrap_or(0.0);

        let accounts: Vec<TokenAccountAmount> = accounts.into_iter().take(20).collect();

        // getTokenLargestAccounts returns token-account pubkeys; resolve
        // each to its owner wallet so holders share a namespace with the
        // transaction-level buyer addresses.
        let account_keys: Vec<&str> = accounts.iter().map(|a| a.address.as_str()).collect();
        let owners: Vec<Option<ParsedAccount>> = match self
            .rpc_call(
                "getMultipleAccounts",
                json!([account_keys, {"encoding": "jsonParsed"}]),
            )
            .await
        {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(mint, error = %e, "Owner resolution failed, keeping token-account addresses");
                vec![None; accounts.len()]
            }
        };

        Ok(accounts
            .into_iter()
            .enumerate()
            .map(|(i, a)| {
                let balance = a.ui_amount.unwrap_or(0.0);
                let address = owners
                    .get(i)
                    .and_then(account_owner)
                    .unwrap_or(a.address);
                NormalizedHolder {
                    address,
                    balance,
                    percentage: if total > 0.0 {
                        balance / total * 100.0
                    } else {
                        0.0
                    },
                    usd_value: 0.0, // filled from pair price downstream
                }
            })
            .collect())
    }

    async fn total_supply(&self, mint: &str) -> f64 {
        match self
            .rpc_call::<SupplyAmount>("getTokenSupply", json!([mint]))
            .await
        {
            Ok(s) => s.ui_amount.unwrap_or(0.0),
            Err(e) => {
                warn!(mint, error = %e, "Supply lookup failed");
                0.0
            }
        }
    }
}

#[async_trait]
impl ChainAdapter for SolanaAdapter {
    fn is_excluded(&self, address: &str) -> bool {
        EXCLUDED_INFRA.contains(&address)
    }

    #[instrument(skip(self))]
    async fn fetch_activity(&self, wallet: &str, token: &str) -> Result<WalletActivity> {
        crate::security::validate_solana_pubkey(wallet)?;

        let transactions = self.enhanced_transactions(wallet).await?;
        let mut activity = WalletActivity::default();

        for tx in &transactions {
            let swap_like = tx.is_swap_like();
            let timestamp = tx.datetime();

            for transfer in &tx.token_transfers {
                if transfer.mint != token || transfer.token_amount <= 0.0 {
                    continue;
                }
                if transfer.from_user_account == transfer.to_user_account {
                    continue; // self-transfer
                }

                let incoming = transfer.to_user_account == wallet;
                let outgoing = transfer.from_user_account == wallet;
                let counterparty = if incoming {
                    transfer.from_user_account.clone()
                } else {
                    transfer.to_user_account.clone()
                };

                let movement = TokenMovement {
                    tx_hash: tx.signature.clone(),
                    counterparty: counterparty.clone(),
                    amount: transfer.token_amount,
                    timestamp,
                };

                if incoming && swap_like {
                    activity.buys.push(movement);
                } else if outgoing && swap_like {
                    activity.sells.push(movement);
                } else if incoming && !self.is_excluded(&counterparty) {
                    activity.incoming_transfers.push(movement);
                } else if outgoing && !self.is_excluded(&counterparty) {
                    activity.outgoing_transfers.push(movement);
                }
            }

            for native in &tx.native_transfers {
                if native.to_user_account == wallet && native.amount > 0 {
                    activity.native_inflows.push(NativeInflow {
                        tx_hash: tx.signature.clone(),
                        sender: native.from_user_account.clone(),
                        amount: native.amount as f64 / LAMPORTS_PER_SOL,
                        timestamp,
                    });
                }
            }
        }

        Ok(activity)
    }

    async fn fetch_balance(&self, wallet: &str, token: &str) -> Result<f64> {
        self.rate_limiter.until_ready().await;

        let url = format!(
            "{}/v0/addresses/{}/balances?api-key={}",
            self.api_base, wallet, self.api_key
        );

        let balances = call_api_with_retry(|| async {
            let response = self
                .http_client
                .get(&url)
                .send()
                .await
                .context("Failed to send balance request")?;

            if !response.status().is_success() {
                return Err(anyhow!("Solana provider API error: {}", response.status()));
            }

            response
                .json::<BalancesResponse>()
                .await
                .context("Failed to parse balances")
        })
        .await?;

        Ok(balances
            .tokens
            .iter()
            .find(|t| t.mint == token)
            .map(|t| t.amount as f64 / 10f64.powi(t.decimals as i32))
            .unwrap_or(0.0))
    }

    #[instrument(skip(self))]
    async fn fetch_forensics(&self, token: &str) -> Result<ForensicSnapshot> {
        crate::security::validate_solana_pubkey(token)?;

        let transactions = self.enhanced_transactions(token).await?;
        if transactions.is_empty() {
            debug!(token, "No transaction history for mint");
            return Ok(ForensicSnapshot::default());
        }

        // Oldest fetched slot stands in for the creation slot; for a token
        // minutes old the fetch window reaches back to the mint itself.
        let creation_slot = transactions.iter().map(|t| t.slot).min().unwrap_or(0);
        let launch_end = creation_slot + LAUNCH_WINDOW_SLOTS;
        let early_end = creation_slot + EARLY_WINDOW_SLOTS;

        let mut launch_transfers = Vec::new();
        let mut early_transfers = Vec::new();

        for tx in &transactions {
            if tx.slot > early_end {
                continue;
            }
            let swap_like = tx.is_swap_like();

            for transfer in &tx.token_transfers {
                if transfer.mint != token || transfer.token_amount <= 0.0 {
                    continue;
                }
                let normalized = NormalizedTransfer {
                    tx_hash: tx.signature.clone(),
                    block: tx.slot,
                    buyer_address: transfer.to_user_account.clone(),
                    // swap records carry no meaningful seller on Solana
                    seller_address: if swap_like {
                        String::new()
                    } else {
                        transfer.from_user_account.clone()
                    },
                    token_amount: transfer.token_amount,
                    usd_value: 0.0,
                    kind: if tx.tx_type == "TOKEN_MINT" {
                        TransferKind::Mint
                    } else if swap_like {
                        TransferKind::Swap
                    } else {
                        TransferKind::Transfer
                    },
                };

                if tx.slot <= launch_end {
                    launch_transfers.push(normalized.clone());
                }
                early_transfers.push(normalized);
            }
        }

        let top_holders = match self.top_holders(token).await {
            Ok(holders) => holders,
            Err(e) => {
                warn!(token, error = %e, "Holder lookup failed, continuing without");
                Vec::new()
            }
        };
        let total_supply = self.total_supply(token).await;

        Ok(ForensicSnapshot {
            launch_transfers,
            early_transfers,
            top_holders,
            creation_block: creation_slot,
            total_supply,
        })
    }
}
