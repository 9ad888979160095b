//! Pair Resolver backed by the DEX Screener search API.
//!
//! Resolves a token symbol or address to its trading pairs with price,
//! liquidity and FDV, sorted by liquidity descending. An empty result means
//! the token has no tradeable pair and the scan short-circuits.

use anyhow::{anyhow, Context, Result};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::Deserialize;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::config::ProviderConfig;
use crate::types::Pair;
use crate::utils::retry::call_api_with_retry;

/// DEX Screener search response
#[derive(Debug, Clone, Deserialize)]
struct DexScreenerSearchResponse {
    pairs: Option<Vec<DexScreenerPair>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DexScreenerPair {
    chain_id: String,
    pair_address: String,
    base_token: DexScreenerToken,
    price_usd: Option<String>,
    liquidity: Option<DexScreenerLiquidity>,
    fdv: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
struct DexScreenerToken {
    address: String,
    name: String,
    symbol: String,
}

#[derive(Debug, Clone, Deserialize)]
struct DexScreenerLiquidity {
    usd: Option<f64>,
}

/// Pair resolution client.
pub struct PairResolver {
    base_url: String,
    http_client: Client,
    rate_limiter: Arc<
        RateLimiter<
            governor::state::direct::NotKeyed,
            governor::state::InMemoryState,
            governor::clock::DefaultClock,
        >,
    >,
}

impl PairResolver {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        let rate_limit = NonZeroU32::new(config.rate_limit_per_minute)
            .ok_or_else(|| anyhow!("rate_limit_per_minute must be non-zero"))?;
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_minute(rate_limit)));

        Ok(Self {
            base_url: config.dex_screener_url.clone(),
            http_client,
            rate_limiter,
        })
    }

    /// Resolve a token query (symbol or address) to pairs, best pool first.
    #[instrument(skip(self))]
    pub async fn resolve(&self, query: &str) -> Result<Vec<Pair>> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}/dex/search?q={}", self.base_url, query);
        let response = call_api_with_retry(|| async {
            let response = self
                .http_client
                .get(&url)
                .send()
                .await
                .context("Failed to send request to DEX Screener")?;

            if !response.status().is_success() {
                return Err(anyhow!("DEX Screener API error: {}", response.status()));
            }

            response
                .json::<DexScreenerSearchResponse>()
                .await
                .context("Failed to parse DEX Screener response")
        })
        .await?;

        let mut pairs: Vec<Pair> = response
            .pairs
            .unwrap_or_default()
            .into_iter()
            .map(|p| {
                let price_usd = p
                    .price_usd
                    .as_deref()
                    .and_then(|s| s.parse::<f64>().ok())
                    .unwrap_or(0.0);
                Pair {
                    chain_id: p.chain_id,
                    pair_address: p.pair_address,
                    token_address: p.base_token.address,
                    token_symbol: p.base_token.symbol,
                    token_name: p.base_token.name,
                    price_usd,
                    liquidity_usd: p.liquidity.and_then(|l| l.usd).unwrap_or(0.0),
                    fdv: p.fdv.unwrap_or(0.0),
                }
            })
            .collect();

        pairs.sort_by(|a, b| {
            b.liquidity_usd
                .partial_cmp(&a.liquidity_usd)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        debug!(query, count = pairs.len(), "Resolved pairs");
        Ok(pairs)
    }
}
