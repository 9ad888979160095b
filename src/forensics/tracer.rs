//! Distribution-tree tracer: bounded breadth-first expansion from the
//! launch-window seed buyers through the wallets their tokens moved to.
//!
//! The trace is capped at four hop levels and a global wallet count, and it
//! never raises: per-wallet fetch failures degrade to empty activity and a
//! zero balance so one flaky lookup cannot sink the whole evaluation.

use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::chain::{is_known_exchange, ChainAdapter, WalletActivity};
use crate::config::TracerConfig;

/// Terminal hop: wallets discovered here get a balance lookup only.
const MAX_HOP_DEPTH: u8 = 3;

/// Best-guess native-asset funder of a traced wallet.
///
/// This is an inference, not a verified edge: a wallet fed by many small
/// transfers with no dominant one can be attributed to the wrong sender, and
/// a funder outside the fetched history window is missed entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundingSource {
    pub address: String,
    /// Native amount in human units
    pub amount: f64,
    pub timestamp: DateTime<Utc>,
    pub is_known_exchange: bool,
}

/// One wallet visited during the trace. Unique per address; the hop depth is
/// the depth at first discovery and never changes afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletTraceNode {
    pub address: String,
    pub buys: Vec<crate::chain::TokenMovement>,
    pub sells: Vec<crate::chain::TokenMovement>,
    pub incoming_transfers: Vec<crate::chain::TokenMovement>,
    pub outgoing_transfers: Vec<crate::chain::TokenMovement>,
    /// Current balance of the target token, human units
    pub current_balance: f64,
    pub is_seed_wallet: bool,
    pub hop_depth: u8,
    pub funding_source: Option<FundingSource>,
}

/// Breadth-first, depth- and size-bounded wallet trace over a chain adapter.
pub struct DistributionTracer {
    config: TracerConfig,
}

impl DistributionTracer {
    pub fn new(config: TracerConfig) -> Self {
        Self { config }
    }

    /// Trace token distribution from the seed buyers.
    ///
    /// Hops 0..=2 fetch full activity plus balance per wallet; hop 3 is
    /// balance-only to bound cost on the long tail of end holders. The
    /// global wallet cap is checked before every fetch, so it holds across
    /// levels, not per level.
    #[instrument(skip(self, adapter), fields(seeds = seeds.len()))]
    pub async fn trace(
        &self,
        seeds: &[String],
        token: &str,
        adapter: &Arc<dyn ChainAdapter>,
    ) -> Vec<WalletTraceNode> {
        let mut visited: HashSet<String> = HashSet::new();
        let mut nodes: Vec<WalletTraceNode> = Vec::new();

        let mut worklist: Vec<String> = Vec::new();
        for seed in seeds {
            if adapter.is_excluded(seed) || !visited.insert(seed.clone()) {
                continue;
            }
            worklist.push(seed.clone());
        }

        for hop in 0..MAX_HOP_DEPTH {
            if worklist.is_empty() {
                break;
            }
            let mut next_level: Vec<String> = Vec::new();

            for address in worklist.drain(..) {
                if nodes.len() >= self.config.max_total_wallets {
                    debug!(cap = self.config.max_total_wallets, "wallet cap reached");
                    return nodes;
                }

                let node = self.visit_wallet(&address, token, hop, adapter).await;
                for out in &node.outgoing_transfers {
                    let recipient = &out.counterparty;
                    if adapter.is_excluded(recipient) || visited.contains(recipient) {
                        continue;
                    }
                    visited.insert(recipient.clone());
                    next_level.push(recipient.clone());
                }
                nodes.push(node);

                tokio::time::sleep(std::time::Duration::from_millis(
                    self.config.inter_call_delay_ms,
                ))
                .await;
            }

            worklist = next_level;
        }

        // Terminal hop: balance-only, in small concurrent groups
        for group in worklist.chunks(self.config.balance_batch_size) {
            let remaining = self.config.max_total_wallets.saturating_sub(nodes.len());
            if remaining == 0 {
                break;
            }
            let group = &group[..group.len().min(remaining)];

            let balances = join_all(group.iter().map(|address| {
                let adapter = Arc::clone(adapter);
                let address = address.clone();
                let token = token.to_string();
                async move {
                    match adapter.fetch_balance(&address, &token).await {
                        Ok(balance) => balance,
                        Err(e) => {
                            warn!(wallet = %address, error = %e, "balance lookup failed");
                            0.0
                        }
                    }
                }
            }))
            .await;

            for (address, balance) in group.iter().zip(balances) {
                nodes.push(WalletTraceNode {
                    address: address.clone(),
                    buys: Vec::new(),
                    sells: Vec::new(),
                    incoming_transfers: Vec::new(),
                    outgoing_transfers: Vec::new(),
                    current_balance: balance,
                    is_seed_wallet: false,
                    hop_depth: MAX_HOP_DEPTH,
                    funding_source: None,
                });
            }

            tokio::time::sleep(std::time::Duration::from_millis(
                self.config.balance_batch_delay_ms,
            ))
            .await;
        }

        debug!(total = nodes.len(), "trace complete");
        nodes
    }

    /// Fetch activity and balance for one wallet in parallel, degrading each
    /// side independently on failure.
    async fn visit_wallet(
        &self,
        address: &str,
        token: &str,
        hop: u8,
        adapter: &Arc<dyn ChainAdapter>,
    ) -> WalletTraceNode {
        let (activity, balance) = tokio::join!(
            adapter.fetch_activity(address, token),
            adapter.fetch_balance(address, token),
        );

        let activity = match activity {
            Ok(a) => a,
            Err(e) => {
                warn!(wallet = %address, error = %e, "activity fetch failed");
                WalletActivity::default()
            }
        };
        let balance = match balance {
            Ok(b) => b,
            Err(e) => {
                warn!(wallet = %address, error = %e, "balance fetch failed");
                0.0
            }
        };

        let funding_source = self.infer_funding(&activity);

        WalletTraceNode {
            address: address.to_string(),
            buys: activity.buys,
            sells: activity.sells,
            incoming_transfers: activity.incoming_transfers,
            outgoing_transfers: activity.outgoing_transfers,
            current_balance: balance,
            is_seed_wallet: hop == 0,
            hop_depth: hop,
            funding_source,
        }
    }

    /// Pick the wallet's likely funder from its native-asset inflows.
    ///
    /// Above-dust inflows only. Prefer the most recent one that landed
    /// strictly before the wallet's first buy and inside the lookback
    /// window; otherwise fall back to the earliest known inflow, treated as
    /// the wallet's funding at creation.
    fn infer_funding(&self, activity: &WalletActivity) -> Option<FundingSource> {
        let mut inflows: Vec<_> = activity
            .native_inflows
            .iter()
            .filter(|inflow| inflow.amount > self.config.funding_dust_threshold)
            .collect();
        if inflows.is_empty() {
            return None;
        }
        inflows.sort_by_key(|inflow| inflow.timestamp);

        let first_buy = activity.buys.iter().map(|b| b.timestamp).min();
        let chosen = match first_buy {
            Some(first_buy) => {
                let lookback_start =
                    first_buy - Duration::hours(self.config.funding_lookback_hours);
                inflows
                    .iter()
                    .rev()
                    .find(|inflow| {
                        inflow.timestamp < first_buy && inflow.timestamp >= lookback_start
                    })
                    .copied()
                    .unwrap_or(inflows[0])
            }
            None => inflows[0],
        };

        Some(FundingSource {
            address: chosen.sender.clone(),
            amount: chosen.amount,
            timestamp: chosen.timestamp,
            is_known_exchange: is_known_exchange(&chosen.sender),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{NativeInflow, TokenMovement};
    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::collections::HashMap;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn movement(counterparty: &str, amount: f64, secs: i64) -> TokenMovement {
        TokenMovement {
            tx_hash: format!("tx_{}_{}", counterparty, secs),
            counterparty: counterparty.to_string(),
            amount,
            timestamp: ts(secs),
        }
    }

    fn inflow(sender: &str, amount: f64, secs: i64) -> NativeInflow {
        NativeInflow {
            tx_hash: format!("fund_{}_{}", sender, secs),
            sender: sender.to_string(),
            amount,
            timestamp: ts(secs),
        }
    }

    /// In-memory adapter: scripted activity per wallet, fixed balances.
    struct ScriptedAdapter {
        activity: HashMap<String, WalletActivity>,
        excluded: HashSet<String>,
        failing: HashSet<String>,
    }

    impl ScriptedAdapter {
        fn new() -> Self {
            Self {
                activity: HashMap::new(),
                excluded: HashSet::new(),
                failing: HashSet::new(),
            }
        }

        fn with_outgoing(mut self, wallet: &str, recipients: &[&str]) -> Self {
            let entry = self.activity.entry(wallet.to_string()).or_default();
            for (i, r) in recipients.iter().enumerate() {
                entry.outgoing_transfers.push(movement(r, 10.0, i as i64));
            }
            self
        }
    }

    #[async_trait]
    impl ChainAdapter for ScriptedAdapter {
        fn is_excluded(&self, address: &str) -> bool {
            self.excluded.contains(address)
        }

        async fn fetch_activity(&self, wallet: &str, _token: &str) -> Result<WalletActivity> {
            if self.failing.contains(wallet) {
                anyhow::bail!("scripted failure for {wallet}");
            }
            Ok(self.activity.get(wallet).cloned().unwrap_or_default())
        }

        async fn fetch_balance(&self, wallet: &str, _token: &str) -> Result<f64> {
            if self.failing.contains(wallet) {
                anyhow::bail!("scripted failure for {wallet}");
            }
            Ok(1.5)
        }

        async fn fetch_forensics(&self, _token: &str) -> Result<crate::types::ForensicSnapshot> {
            Ok(Default::default())
        }
    }

    fn fast_config() -> TracerConfig {
        TracerConfig {
            inter_call_delay_ms: 0,
            balance_batch_delay_ms: 0,
            ..TracerConfig::default()
        }
    }

    #[tokio::test]
    async fn test_empty_seeds_yield_empty_trace() {
        let adapter: Arc<dyn ChainAdapter> = Arc::new(ScriptedAdapter::new());
        let tracer = DistributionTracer::new(fast_config());
        let nodes = tracer.trace(&[], "mint", &adapter).await;
        assert!(nodes.is_empty());
    }

    #[tokio::test]
    async fn test_hop_depth_follows_transfer_chain() {
        // seed -> mid -> tail -> end: hop depths 0/1/2/3, hop 3 balance-only
        let adapter: Arc<dyn ChainAdapter> = Arc::new(
            ScriptedAdapter::new()
                .with_outgoing("seed", &["mid"])
                .with_outgoing("mid", &["tail"])
                .with_outgoing("tail", &["end"]),
        );
        let tracer = DistributionTracer::new(fast_config());
        let nodes = tracer
            .trace(&["seed".to_string()], "mint", &adapter)
            .await;

        assert_eq!(nodes.len(), 4);
        let depth_of = |addr: &str| {
            nodes
                .iter()
                .find(|n| n.address == addr)
                .map(|n| n.hop_depth)
                .unwrap()
        };
        assert_eq!(depth_of("seed"), 0);
        assert_eq!(depth_of("mid"), 1);
        assert_eq!(depth_of("tail"), 2);
        assert_eq!(depth_of("end"), 3);

        let seed = nodes.iter().find(|n| n.address == "seed").unwrap();
        assert!(seed.is_seed_wallet);
        let end = nodes.iter().find(|n| n.address == "end").unwrap();
        assert!(!end.is_seed_wallet);
        assert!(end.outgoing_transfers.is_empty());
        assert_eq!(end.current_balance, 1.5);
    }

    #[tokio::test]
    async fn test_revisited_address_keeps_first_depth() {
        // Both seeds transfer to the same recipient; it must appear once
        let adapter: Arc<dyn ChainAdapter> = Arc::new(
            ScriptedAdapter::new()
                .with_outgoing("seed_a", &["shared"])
                .with_outgoing("seed_b", &["shared", "seed_a"]),
        );
        let tracer = DistributionTracer::new(fast_config());
        let nodes = tracer
            .trace(&["seed_a".to_string(), "seed_b".to_string()], "mint", &adapter)
            .await;

        let shared: Vec<_> = nodes.iter().filter(|n| n.address == "shared").collect();
        assert_eq!(shared.len(), 1);
        assert_eq!(shared[0].hop_depth, 1);
        // seed_a was visited at hop 0 and never re-added
        assert_eq!(nodes.iter().filter(|n| n.address == "seed_a").count(), 1);
    }

    #[tokio::test]
    async fn test_excluded_addresses_never_become_nodes() {
        let mut adapter = ScriptedAdapter::new()
            .with_outgoing("seed", &["router", "holder"]);
        adapter.excluded.insert("router".to_string());
        adapter.excluded.insert("bad_seed".to_string());
        let adapter: Arc<dyn ChainAdapter> = Arc::new(adapter);

        let tracer = DistributionTracer::new(fast_config());
        let nodes = tracer
            .trace(&["seed".to_string(), "bad_seed".to_string()], "mint", &adapter)
            .await;

        assert!(nodes.iter().all(|n| n.address != "router"));
        assert!(nodes.iter().all(|n| n.address != "bad_seed"));
        assert!(nodes.iter().any(|n| n.address == "holder"));
    }

    #[tokio::test]
    async fn test_global_cap_holds_across_levels() {
        // One seed fanning out to many recipients, cap of 5 wallets total
        let recipients: Vec<String> = (0..30).map(|i| format!("r{}", i)).collect();
        let refs: Vec<&str> = recipients.iter().map(String::as_str).collect();
        let adapter: Arc<dyn ChainAdapter> =
            Arc::new(ScriptedAdapter::new().with_outgoing("seed", &refs));

        let config = TracerConfig {
            max_total_wallets: 5,
            ..fast_config()
        };
        let tracer = DistributionTracer::new(config);
        let nodes = tracer
            .trace(&["seed".to_string()], "mint", &adapter)
            .await;

        assert!(nodes.len() <= 5);
    }

    #[tokio::test]
    async fn test_wallet_failure_degrades_to_empty_node() {
        let mut adapter = ScriptedAdapter::new().with_outgoing("seed", &["broken"]);
        adapter.failing.insert("broken".to_string());
        let adapter: Arc<dyn ChainAdapter> = Arc::new(adapter);

        let tracer = DistributionTracer::new(fast_config());
        let nodes = tracer
            .trace(&["seed".to_string()], "mint", &adapter)
            .await;

        let broken = nodes.iter().find(|n| n.address == "broken").unwrap();
        assert!(broken.buys.is_empty());
        assert_eq!(broken.current_balance, 0.0);
        assert_eq!(broken.hop_depth, 1);
    }

    #[test]
    fn test_funding_prefers_latest_inflow_before_first_buy() {
        let tracer = DistributionTracer::new(TracerConfig::default());
        let activity = WalletActivity {
            buys: vec![movement("amm", 100.0, 1000)],
            native_inflows: vec![
                inflow("early_funder", 1.0, 100),
                inflow("late_funder", 2.0, 900),
                inflow("after_buy", 3.0, 1100),
            ],
            ..Default::default()
        };

        let funding = tracer.infer_funding(&activity).unwrap();
        assert_eq!(funding.address, "late_funder");
        assert_eq!(funding.amount, 2.0);
        assert!(!funding.is_known_exchange);
    }

    #[test]
    fn test_funding_ignores_dust_and_falls_back_to_earliest() {
        let tracer = DistributionTracer::new(TracerConfig::default());
        // No buys at all: earliest above-dust inflow wins
        let activity = WalletActivity {
            native_inflows: vec![
                inflow("dust_sender", 0.0001, 50),
                inflow("creator", 5.0, 200),
                inflow("topup", 1.0, 400),
            ],
            ..Default::default()
        };

        let funding = tracer.infer_funding(&activity).unwrap();
        assert_eq!(funding.address, "creator");
    }

    #[test]
    fn test_funding_none_when_only_dust() {
        let tracer = DistributionTracer::new(TracerConfig::default());
        let activity = WalletActivity {
            native_inflows: vec![inflow("dust", 0.0001, 50)],
            ..Default::default()
        };
        assert!(tracer.infer_funding(&activity).is_none());
    }

    #[test]
    fn test_funding_tags_known_exchange() {
        let tracer = DistributionTracer::new(TracerConfig::default());
        let activity = WalletActivity {
            native_inflows: vec![inflow(
                "5tzFkiKscXHK5ZXCGbXZxdw7gTjjD1mBwuoFbhUvuAi9",
                10.0,
                50,
            )],
            ..Default::default()
        };
        let funding = tracer.infer_funding(&activity).unwrap();
        assert!(funding.is_known_exchange);
    }
}
