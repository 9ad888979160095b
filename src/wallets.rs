//! Wallet display list: cross-references the top holders against the
//! launch-window seed buyers for presentation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::types::{ChainKind, NormalizedHolder};

/// Cap on holders rendered in the display list.
const MAX_DISPLAY_ROWS: usize = 20;

/// One holder row in the final result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletDisplayRow {
    pub address: String,
    /// Whether the holder bought inside the launch window
    pub is_bundler: bool,
    pub holding_amount_usd: f64,
    /// Coarse label: "deployer", "bundle buyer" or "unknown"
    pub funding_label: String,
}

/// Build the display list from the top holders.
///
/// Slot-model providers supply per-holder USD values; account-model
/// providers supply only balances, so USD is computed from the pair price.
/// The first-ranked holder is assumed to be the deployer. Returns an empty
/// list when no holder data exists upstream; the caller substitutes a
/// placeholder row.
pub fn build_list(
    top_holders: &[NormalizedHolder],
    seed_buyers: &BTreeSet<String>,
    price_usd: f64,
    chain_kind: ChainKind,
) -> Vec<WalletDisplayRow> {
    top_holders
        .iter()
        .take(MAX_DISPLAY_ROWS)
        .enumerate()
        .map(|(rank, holder)| {
            let is_bundler = seed_buyers.contains(&holder.address);
            let holding_amount_usd = match chain_kind {
                ChainKind::Solana if holder.usd_value > 0.0 => holder.usd_value,
                _ => holder.balance * price_usd,
            };
            let funding_label = if rank == 0 {
                "deployer"
            } else if is_bundler {
                "bundle buyer"
            } else {
                "unknown"
            };
            WalletDisplayRow {
                address: holder.address.clone(),
                is_bundler,
                holding_amount_usd,
                funding_label: funding_label.to_string(),
            }
        })
        .collect()
}
