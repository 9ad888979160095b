//! Shared types for token scanning and forensic analysis.
//!
//! These are the chain-agnostic shapes exchanged between the providers,
//! the analyzer, the tracer and the scoring engine.

use serde::{Deserialize, Serialize};

/// Chain family a token lives on.
///
/// Slot-model (Solana-style) swap records carry no seller field, so several
/// analyzer heuristics differ between the two families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainKind {
    /// Slot-model chain (Solana and flavors)
    Solana,
    /// Account-model chain (Ethereum, BSC, Base, ...)
    Evm,
}

impl ChainKind {
    /// Map a DEX-screener style chain identifier to its family.
    pub fn from_chain_id(chain_id: &str) -> Self {
        match chain_id {
            "solana" => ChainKind::Solana,
            _ => ChainKind::Evm,
        }
    }
}

/// A resolved trading pair for the scanned token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pair {
    /// Chain identifier ("solana", "ethereum", "bsc", ...)
    pub chain_id: String,
    /// DEX pair address
    pub pair_address: String,
    /// Base token mint/contract address
    pub token_address: String,
    /// Base token symbol
    pub token_symbol: String,
    /// Base token name
    pub token_name: String,
    /// USD price of the base token
    pub price_usd: f64,
    /// USD liquidity in the pool
    pub liquidity_usd: f64,
    /// Fully diluted value in USD
    pub fdv: f64,
}

/// Contract security audit flags, as reported by the security oracle.
///
/// All fields default to the non-penalizing value so a partial audit
/// degrades gracefully.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecurityFlags {
    pub is_honeypot: bool,
    pub is_mintable: bool,
    pub is_open_source: bool,
    /// Buy tax as a fraction (0.10 = 10%)
    pub buy_tax: f64,
    /// Sell tax as a fraction (0.10 = 10%)
    pub sell_tax: f64,
    pub cannot_sell_all: bool,
    pub is_proxy: bool,
    pub slippage_modifiable: bool,
}

/// One token movement, already normalized by the forensic provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedTransfer {
    pub tx_hash: String,
    /// Block number (account-model) or slot (slot-model)
    pub block: u64,
    /// Receiving address; empty means unknown
    pub buyer_address: String,
    /// Sending address; empty on slot-model swap records
    pub seller_address: String,
    /// Token amount in human units
    pub token_amount: f64,
    /// USD value; 0 means "compute from price"
    pub usd_value: f64,
    pub kind: TransferKind,
}

/// Provider classification of a normalized transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferKind {
    Swap,
    Transfer,
    Mint,
}

/// A top-holder snapshot row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedHolder {
    pub address: String,
    /// Balance in human units
    pub balance: f64,
    /// Percentage of total supply (0-100)
    pub percentage: f64,
    /// USD value of the holding; 0 when the provider omits it
    pub usd_value: f64,
}

/// Chain-specific forensic fetch result, windowed by the provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForensicSnapshot {
    /// Transfers inside the launch window (creation block/slot + small offset)
    pub launch_transfers: Vec<NormalizedTransfer>,
    /// Transfers inside the wider early window
    pub early_transfers: Vec<NormalizedTransfer>,
    /// Top holders, at most 20
    pub top_holders: Vec<NormalizedHolder>,
    /// Creation block or slot of the token
    pub creation_block: u64,
    /// Total token supply in human units, when known
    pub total_supply: f64,
}

/// Outcome of the best-effort forensic enrichment, surfaced unchanged in
/// the final result so the consumer can distinguish "safe" from "unknown".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForensicsStatus {
    /// Forensic snapshot fetched and analyzed
    Enriched,
    /// Required provider credential absent; enrichment skipped
    MissingCredential,
    /// No provider implementation for this chain
    UnsupportedChain,
    /// Provider or network error; evaluation proceeded without enrichment
    ProviderError,
    /// Evaluation ended before forensics could run (no pair resolved)
    EmptyResult,
}

/// Risk band derived from the numeric score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Safe,
    Caution,
    Danger,
    Critical,
}

impl RiskLevel {
    /// Band a 0-100 score.
    pub fn from_score(score: u8) -> Self {
        match score {
            80..=100 => RiskLevel::Safe,
            50..=79 => RiskLevel::Caution,
            20..=49 => RiskLevel::Danger,
            _ => RiskLevel::Critical,
        }
    }
}

/// Coarse classification of what phase the suspected operation is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatType {
    /// Token cannot be sold; holders are exit liquidity
    DistributionPhase,
    /// Coordinated wallets are still accumulating
    AccumulationPhase,
    /// No coordination signal detected
    OrganicGrowth,
}
