//! One-shot token scan orchestration.
//!
//! Pipeline: resolve the pair, fetch the security audit, fetch and analyze
//! the forensic snapshot, trace distribution from the seed buyers, label
//! clusters when a labeller is wired in, then fold everything into the
//! scored result. Every upstream step is best-effort; a degraded step is
//! reported in the result, never raised.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::chain::adapter_for_chain;
use crate::cluster::{ClusterContext, ClusterControlResult, ClusterLabeller};
use crate::config::ScannerConfig;
use crate::forensics::{analyze, DistributionTracer, LaunchSnapshot, WalletTraceNode};
use crate::providers::{dex_screener::PairResolver, goplus::SecurityOracle};
use crate::scoring::{score, ScoreFactor};
use crate::types::{ChainKind, ForensicSnapshot, ForensicsStatus, Pair, RiskLevel, SecurityFlags, ThreatType};
use crate::wallets::{build_list, WalletDisplayRow};

/// Final aggregate answer for one scan query. Assembled once; no field is
/// mutated after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub query: String,
    pub scanned_at: DateTime<Utc>,
    /// Highest-liquidity pair the query resolved to, if any
    pub pair: Option<Pair>,
    /// Security audit flags; absent when the oracle had no data
    pub security: Option<SecurityFlags>,
    pub forensics_status: ForensicsStatus,
    pub launch: LaunchSnapshot,
    pub trace: Vec<WalletTraceNode>,
    pub cluster: Option<ClusterControlResult>,
    pub wallets: Vec<WalletDisplayRow>,
    pub score: u8,
    pub risk_level: RiskLevel,
    pub threat_type: ThreatType,
    pub factors: Vec<ScoreFactor>,
}

impl ScanResult {
    /// Zero-valued result for a query that resolved to no pair.
    fn not_found(query: &str) -> Self {
        Self {
            query: query.to_string(),
            scanned_at: Utc::now(),
            pair: None,
            security: None,
            forensics_status: ForensicsStatus::EmptyResult,
            launch: LaunchSnapshot::default(),
            trace: Vec::new(),
            cluster: None,
            wallets: Vec::new(),
            score: 0,
            risk_level: RiskLevel::Critical,
            threat_type: ThreatType::OrganicGrowth,
            factors: vec![ScoreFactor {
                label: "Token lookup".to_string(),
                impact: 0,
                status: crate::scoring::FactorStatus::Info,
                detail: "no trading pair found for query".to_string(),
            }],
        }
    }
}

/// Orchestrates one full evaluation per call. Stateless between scans.
pub struct TokenScanner {
    config: ScannerConfig,
    pair_resolver: PairResolver,
    security_oracle: SecurityOracle,
    tracer: DistributionTracer,
    cluster_labeller: Option<Arc<dyn ClusterLabeller>>,
}

impl TokenScanner {
    pub fn new(config: ScannerConfig) -> Result<Self> {
        let pair_resolver =
            PairResolver::new(&config.providers).context("building pair resolver")?;
        let security_oracle =
            SecurityOracle::new(&config.providers).context("building security oracle")?;
        let tracer = DistributionTracer::new(config.tracer.clone());
        Ok(Self {
            config,
            pair_resolver,
            security_oracle,
            tracer,
            cluster_labeller: None,
        })
    }

    /// Wire in an external cluster-labelling component.
    pub fn with_cluster_labeller(mut self, labeller: Arc<dyn ClusterLabeller>) -> Self {
        self.cluster_labeller = Some(labeller);
        self
    }

    /// Run the full evaluation for one token query (address or symbol).
    #[instrument(skip(self))]
    pub async fn scan(&self, query: &str) -> Result<ScanResult> {
        // The resolver retries internally; no second retry layer here
        let pairs = self
            .pair_resolver
            .resolve(query)
            .await
            .context("resolving trading pair")?;

        let pair = match pairs.into_iter().next() {
            Some(pair) => pair,
            None => {
                info!(query, "no trading pair found");
                return Ok(ScanResult::not_found(query));
            }
        };
        let chain_kind = ChainKind::from_chain_id(&pair.chain_id);
        info!(
            token = %pair.token_address,
            chain = %pair.chain_id,
            liquidity = pair.liquidity_usd,
            "pair resolved"
        );

        let security = self
            .security_oracle
            .check(&pair.chain_id, &pair.token_address)
            .await;

        let (adapter, snapshot, forensics_status) =
            match adapter_for_chain(&pair.chain_id, &self.config.providers) {
                Ok(adapter) => match adapter.fetch_forensics(&pair.token_address).await {
                    Ok(snapshot) => (Some(adapter), Some(snapshot), ForensicsStatus::Enriched),
                    Err(e) => {
                        warn!(error = %e, "forensic fetch failed");
                        (Some(adapter), None, ForensicsStatus::ProviderError)
                    }
                },
                Err(e) => {
                    info!(reason = %e, "forensic enrichment unavailable");
                    (None, None, e.forensics_status())
                }
            };

        let launch = analyze(
            snapshot.as_ref(),
            pair.price_usd,
            pair.fdv,
            chain_kind,
            &self.config.analyzer,
        );
        info!(
            seed_buyers = launch.seed_buyers.len(),
            launch_volume = launch.launch_volume_usd,
            bundle_cluster = launch.has_bundle_cluster,
            "launch window analyzed"
        );

        let trace = match &adapter {
            Some(adapter) if !launch.seed_buyers.is_empty() => {
                let seeds: Vec<String> = launch.seed_buyers.iter().cloned().collect();
                self.tracer.trace(&seeds, &pair.token_address, adapter).await
            }
            _ => Vec::new(),
        };

        let cluster = match (&self.cluster_labeller, trace.is_empty()) {
            (Some(labeller), false) => {
                let context = self.cluster_context(&pair, &launch, snapshot.as_ref());
                Some(labeller.label(&trace, &context).await)
            }
            _ => None,
        };

        let mut wallets = build_list(
            snapshot
                .as_ref()
                .map(|s| s.top_holders.as_slice())
                .unwrap_or(&[]),
            &launch.seed_buyers,
            pair.price_usd,
            chain_kind,
        );
        if wallets.is_empty() {
            wallets.push(WalletDisplayRow {
                address: "-".to_string(),
                is_bundler: false,
                holding_amount_usd: 0.0,
                funding_label: "no holder data".to_string(),
            });
        }

        let report = score(pair.liquidity_usd, security.as_ref(), &launch, cluster.as_ref());
        info!(score = report.score, risk = ?report.risk_level, "scan complete");

        Ok(ScanResult {
            query: query.to_string(),
            scanned_at: Utc::now(),
            pair: Some(pair),
            security,
            forensics_status,
            launch,
            trace,
            cluster,
            wallets,
            score: report.score,
            risk_level: report.risk_level,
            threat_type: report.threat_type,
            factors: report.factors,
        })
    }

    /// Assemble the labeller's input from what the scan already computed.
    fn cluster_context(
        &self,
        pair: &Pair,
        launch: &LaunchSnapshot,
        snapshot: Option<&ForensicSnapshot>,
    ) -> ClusterContext {
        let mut launch_buy_map: HashMap<String, f64> = HashMap::new();
        if let Some(snapshot) = snapshot {
            for transfer in &snapshot.launch_transfers {
                if launch.seed_buyers.contains(&transfer.buyer_address) {
                    let volume = if transfer.usd_value > 0.0 {
                        transfer.usd_value
                    } else {
                        transfer.token_amount * pair.price_usd
                    };
                    *launch_buy_map
                        .entry(transfer.buyer_address.clone())
                        .or_insert(0.0) += volume;
                }
            }
        }

        ClusterContext {
            total_supply: snapshot.map(|s| s.total_supply).unwrap_or(0.0),
            price_usd: pair.price_usd,
            liquidity_usd: pair.liquidity_usd,
            seed_addresses: launch.seed_buyers.iter().cloned().collect(),
            holders: snapshot.map(|s| s.top_holders.clone()).unwrap_or_default(),
            launch_buy_map,
        }
    }
}
