//! Chain adapters: uniform wallet-activity and balance access over
//! chain-specific provider APIs.
//!
//! The tracer and the forensic fetch are written against [`ChainAdapter`];
//! the Solana and EVM implementations hide RPC and explorer differences.

pub mod evm;
pub mod solana;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::ProviderConfig;
use crate::providers::ProviderError;
use crate::types::ForensicSnapshot;

/// One classified token movement seen from a wallet's perspective.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenMovement {
    pub tx_hash: String,
    /// The other side of the movement (swap program, sender, or recipient)
    pub counterparty: String,
    /// Token amount in human units
    pub amount: f64,
    pub timestamp: DateTime<Utc>,
}

/// An incoming native-asset transfer, input to funding-source inference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NativeInflow {
    pub tx_hash: String,
    pub sender: String,
    /// Native amount in human units (SOL or the chain's gas asset)
    pub amount: f64,
    pub timestamp: DateTime<Utc>,
}

/// A wallet's recent activity for one target token.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WalletActivity {
    /// Incoming token via a swap-like source
    pub buys: Vec<TokenMovement>,
    /// Outgoing token via a swap-like source
    pub sells: Vec<TokenMovement>,
    /// Plain incoming transfers (non-swap, non-infrastructure, non-self)
    pub incoming_transfers: Vec<TokenMovement>,
    /// Plain outgoing transfers (non-swap, non-infrastructure, non-self)
    pub outgoing_transfers: Vec<TokenMovement>,
    /// Incoming native-asset transfers, for funding inference
    pub native_inflows: Vec<NativeInflow>,
}

/// Uniform access to one chain family's data provider.
#[async_trait]
pub trait ChainAdapter: Send + Sync {
    /// Whether an address is known DEX/router/program/LP infrastructure.
    /// Infrastructure is never traced as a holder.
    fn is_excluded(&self, address: &str) -> bool;

    /// Fetch a wallet's recent, classified activity for the target token.
    async fn fetch_activity(&self, wallet: &str, token: &str) -> Result<WalletActivity>;

    /// Fetch a wallet's current balance of the target token (human units).
    async fn fetch_balance(&self, wallet: &str, token: &str) -> Result<f64>;

    /// Fetch the launch/early-windowed forensic snapshot for the token.
    async fn fetch_forensics(&self, token: &str) -> Result<ForensicSnapshot>;
}

/// Build the adapter for a chain, or report precisely why one cannot exist.
pub fn adapter_for_chain(
    chain_id: &str,
    config: &ProviderConfig,
) -> std::result::Result<Arc<dyn ChainAdapter>, ProviderError> {
    if chain_id == "solana" {
        let api_key = config
            .solana_api_key
            .clone()
            .ok_or(ProviderError::MissingCredential("SOLANA_API_KEY"))?;
        let adapter = solana::SolanaAdapter::new(config, api_key)
            .map_err(ProviderError::Upstream)?;
        return Ok(Arc::new(adapter));
    }

    let chain = evm::lookup_chain(chain_id)
        .ok_or_else(|| ProviderError::UnsupportedChain(chain_id.to_string()))?;
    let api_key = config
        .evm_api_key
        .clone()
        .ok_or(ProviderError::MissingCredential("EVM_API_KEY"))?;
    let adapter = evm::EvmAdapter::new(config, chain, api_key).map_err(ProviderError::Upstream)?;
    Ok(Arc::new(adapter))
}

/// Centralized exchange hot wallets, both chain families.
///
/// Used to tag an inferred funding source: a wallet funded straight from an
/// exchange looks organic, one funded from a fresh intermediate does not.
const KNOWN_EXCHANGE_WALLETS: &[&str] = &[
    // Solana
    "H8sMJSCQxfKiFTCfDR3DUMLPwcRbM61LGFJ8N4dK3WjS", // Coinbase
    "2AQdpHJ2JpcEgPiATUXjQxA8QmafFegfQwSLWSprPicm", // Coinbase 2
    "5tzFkiKscXHK5ZXCGbXZxdw7gTjjD1mBwuoFbhUvuAi9", // Binance
    "FWznbcNXWQuHTawe9RxvQ2LdCENssh12dsznf4RiouN5", // Kraken
    "AC5RDfQFmDS1deWZos921JfqscXdByf8BKHs5ACWjtW2", // Bybit
    "5VCwKtCXgCJ6kit5FybXjvriW3xELsFDhYrPSqtJNmcD", // OKX
    // EVM
    "0x3f5ce5fbfe3e9af3971dd833d26ba9b5c936f0be", // Binance
    "0x28c6c06298d514db089934071355e5743bf21d60", // Binance 14
    "0xd551234ae421e3bcba99a0da6d736074f22192ff", // Binance 2
    "0x71660c4005ba85c37ccec55d0c4493e66fe775d3", // Coinbase
    "0x503828976d22510aad0201ac7ec88293211d23da", // Coinbase 2
    "0x2910543af39aba0cd09dbb2d50200b3e800a63d2", // Kraken
];

/// Whether an address is a known centralized-exchange hot wallet.
pub fn is_known_exchange(address: &str) -> bool {
    let lower = address.to_lowercase();
    KNOWN_EXCHANGE_WALLETS
        .iter()
        .any(|w| *w == address || w.to_lowercase() == lower)
}
