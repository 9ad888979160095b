//! Security Oracle backed by a GoPlus-flavored token security API.
//!
//! Best-effort collaborator: any failure (network, unsupported chain, token
//! not yet indexed) yields `None` and the scan proceeds without an audit.

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::chain::evm::lookup_chain;
use crate::config::ProviderConfig;
use crate::types::SecurityFlags;
use crate::utils::retry::call_api_with_retry;

/// GoPlus-style envelope: `result` maps lowercase contract address to flags.
#[derive(Debug, Clone, Deserialize)]
struct SecurityResponse {
    result: Option<HashMap<String, SecurityEntry>>,
}

/// Flags arrive string-encoded ("1"/"0", taxes as decimal strings).
#[derive(Debug, Clone, Default, Deserialize)]
struct SecurityEntry {
    #[serde(default)]
    is_honeypot: Option<String>,
    #[serde(default)]
    is_mintable: Option<String>,
    #[serde(default)]
    is_open_source: Option<String>,
    #[serde(default)]
    buy_tax: Option<String>,
    #[serde(default)]
    sell_tax: Option<String>,
    #[serde(default)]
    cannot_sell_all: Option<String>,
    #[serde(default)]
    is_proxy: Option<String>,
    #[serde(default)]
    slippage_modifiable: Option<String>,
}

fn parse_flag(value: &Option<String>) -> bool {
    value.as_deref() == Some("1")
}

fn parse_tax(value: &Option<String>) -> f64 {
    value
        .as_deref()
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0)
}

impl SecurityEntry {
    fn into_flags(self) -> SecurityFlags {
        SecurityFlags {
            is_honeypot: parse_flag(&self.is_honeypot),
            is_mintable: parse_flag(&self.is_mintable),
            is_open_source: parse_flag(&self.is_open_source),
            buy_tax: parse_tax(&self.buy_tax),
            sell_tax: parse_tax(&self.sell_tax),
            cannot_sell_all: parse_flag(&self.cannot_sell_all),
            is_proxy: parse_flag(&self.is_proxy),
            slippage_modifiable: parse_flag(&self.slippage_modifiable),
        }
    }
}

/// Token security audit client.
pub struct SecurityOracle {
    base_url: String,
    http_client: Client,
}

impl SecurityOracle {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: config.security_url.clone(),
            http_client,
        })
    }

    /// Fetch the security audit for a token. `None` means no audit available.
    #[instrument(skip(self))]
    pub async fn check(&self, chain_id: &str, address: &str) -> Option<SecurityFlags> {
        match self.check_inner(chain_id, address).await {
            Ok(flags) => flags,
            Err(e) => {
                warn!(chain = chain_id, error = %e, "Security audit unavailable, continuing without");
                None
            }
        }
    }

    async fn check_inner(&self, chain_id: &str, address: &str) -> Result<Option<SecurityFlags>> {
        let url = if chain_id == "solana" {
            format!(
                "{}/solana/token_security?contract_addresses={}",
                self.base_url, address
            )
        } else {
            let chain = match lookup_chain(chain_id) {
                Some(info) => info,
                None => {
                    debug!(chain = chain_id, "No security audit source for chain");
                    return Ok(None);
                }
            };
            format!(
                "{}/token_security/{}?contract_addresses={}",
                self.base_url, chain.numeric_id, address
            )
        };

        let response = call_api_with_retry(|| async {
            let response = self
                .http_client
                .get(&url)
                .send()
                .await
                .context("Failed to send request to security oracle")?;

            if !response.status().is_success() {
                return Err(anyhow!("Security oracle API error: {}", response.status()));
            }

            response
                .json::<SecurityResponse>()
                .await
                .context("Failed to parse security oracle response")
        })
        .await?;

        // EVM results are keyed by lowercase address, Solana ones verbatim
        let entry = response.result.and_then(|mut map| {
            map.remove(&address.to_lowercase())
                .or_else(|| map.remove(address))
        });

        Ok(entry.map(SecurityEntry::into_flags))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_parsing() {
        assert!(parse_flag(&Some("1".to_string())));
        assert!(!parse_flag(&Some("0".to_string())));
        assert!(!parse_flag(&None));
        assert_eq!(parse_tax(&Some("0.05".to_string())), 0.05);
        assert_eq!(parse_tax(&Some("".to_string())), 0.0);
        assert_eq!(parse_tax(&None), 0.0);
    }

    #[test]
    fn test_entry_into_flags() {
        let body = r#"{
            "result": {
                "0xabc": {
                    "is_honeypot": "1",
                    "is_mintable": "0",
                    "buy_tax": "0.12",
                    "sell_tax": "0.03",
                    "cannot_sell_all": "1"
                }
            }
        }"#;
        let parsed: SecurityResponse = serde_json::from_str(body).unwrap();
        let entry = parsed.result.unwrap().remove("0xabc").unwrap();
        let flags = entry.into_flags();
        assert!(flags.is_honeypot);
        assert!(!flags.is_mintable);
        assert!(flags.cannot_sell_all);
        assert_eq!(flags.buy_tax, 0.12);
        assert_eq!(flags.sell_tax, 0.03);
    }
}
