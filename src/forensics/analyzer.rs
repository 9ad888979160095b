//! Forensic analyzer: turns a windowed transfer snapshot into launch
//! statistics and a binary bundle-cluster verdict.
//!
//! Pure and deterministic: identical inputs always yield an identical
//! [`LaunchSnapshot`]. The launch/early window boundaries are chosen by the
//! forensic provider, never here.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

use crate::chain::evm::is_zero_or_burn;
use crate::config::AnalyzerConfig;
use crate::types::{ChainKind, ForensicSnapshot, NormalizedTransfer};

/// Derived launch-window statistics for one evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LaunchSnapshot {
    /// Distinct addresses that bought inside the launch window
    pub seed_buyers: BTreeSet<String>,
    pub launch_volume_usd: f64,
    pub early_volume_usd: f64,
    /// Volume attributed to the suspected bundle; the early-window volume
    /// when the verdict came from the early-window fallback rule
    pub bundle_volume_usd: f64,
    /// `launch_volume_usd / fdv * 100`, 0 when FDV is unknown
    pub bundle_percent_of_fdv: f64,
    /// Sum of supply percentage across the supplied top holders
    pub holder_concentration_percent: f64,
    /// Distinct sellers (account-model) or distinct early buyers (slot-model)
    pub unique_funding_sources: usize,
    pub has_bundle_cluster: bool,
}

/// Whether a transfer survives mint-noise filtering for its chain family.
fn is_accepted(transfer: &NormalizedTransfer, chain_kind: ChainKind) -> bool {
    // A missing or zero-address buyer is noise on both families
    if is_zero_or_burn(&transfer.buyer_address) {
        return false;
    }
    // Slot-model swap records carry no seller field, so no seller filter
    if chain_kind == ChainKind::Evm && !transfer.seller_address.is_empty() {
        if is_zero_or_burn(&transfer.seller_address) {
            return false;
        }
    }
    true
}

/// USD volume of one transfer: its own valuation when present, otherwise
/// computed from the pair price.
fn transfer_volume(transfer: &NormalizedTransfer, price_usd: f64) -> f64 {
    if transfer.usd_value > 0.0 {
        transfer.usd_value
    } else {
        transfer.token_amount * price_usd
    }
}

/// Compute launch-window statistics and the bundle-cluster verdict.
pub fn analyze(
    snapshot: Option<&ForensicSnapshot>,
    price_usd: f64,
    fdv: f64,
    chain_kind: ChainKind,
    config: &AnalyzerConfig,
) -> LaunchSnapshot {
    let snapshot = match snapshot {
        Some(s) => s,
        None => return LaunchSnapshot::default(),
    };

    let launch: Vec<&NormalizedTransfer> = snapshot
        .launch_transfers
        .iter()
        .filter(|t| is_accepted(t, chain_kind))
        .collect();
    let early: Vec<&NormalizedTransfer> = snapshot
        .early_transfers
        .iter()
        .filter(|t| is_accepted(t, chain_kind))
        .collect();

    let launch_volume_usd: f64 = launch.iter().map(|t| transfer_volume(t, price_usd)).sum();
    let early_volume_usd: f64 = early.iter().map(|t| transfer_volume(t, price_usd)).sum();

    let seed_buyers: BTreeSet<String> = launch
        .iter()
        .map(|t| t.buyer_address.clone())
        .collect();
    let early_buyers: HashSet<&str> = early.iter().map(|t| t.buyer_address.as_str()).collect();

    let unique_funding_sources = match chain_kind {
        ChainKind::Evm => early
            .iter()
            .filter(|t| !is_zero_or_burn(&t.seller_address))
            .map(|t| t.seller_address.as_str())
            .collect::<HashSet<_>>()
            .len(),
        // No seller field on slot-model swaps; distinct early buyers are
        // the closest available proxy
        ChainKind::Solana => early_buyers.len(),
    };

    let mut bundle_volume_usd = launch_volume_usd;
    let has_bundle_cluster = match chain_kind {
        ChainKind::Solana => {
            if seed_buyers.len() >= config.min_launch_buyers {
                true
            } else if early_buyers.len() >= config.min_early_buyers {
                bundle_volume_usd = early_volume_usd;
                true
            } else {
                false
            }
        }
        ChainKind::Evm => {
            // One seller fanning out to several recipients in the early
            // window is the account-model coordination signature
            let mut fanout: HashMap<&str, HashSet<&str>> = HashMap::new();
            for t in &early {
                if !is_zero_or_burn(&t.seller_address) {
                    fanout
                        .entry(t.seller_address.as_str())
                        .or_default()
                        .insert(t.buyer_address.as_str());
                }
            }
            fanout
                .values()
                .any(|recipients| recipients.len() >= config.min_fanout_recipients)
        }
    };

    let holder_concentration_percent: f64 = snapshot
        .top_holders
        .iter()
        .take(config.max_holders)
        .map(|h| h.percentage)
        .sum();

    let bundle_percent_of_fdv = if fdv > 0.0 {
        launch_volume_usd / fdv * 100.0
    } else {
        0.0
    };

    LaunchSnapshot {
        seed_buyers,
        launch_volume_usd,
        early_volume_usd,
        bundle_volume_usd,
        bundle_percent_of_fdv,
        holder_concentration_percent,
        unique_funding_sources,
        has_bundle_cluster,
    }
}
