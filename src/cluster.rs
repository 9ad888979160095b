//! Cluster-labelling interface.
//!
//! Converting a raw wallet trace into labelled risk clusters is an external
//! concern; the scanner consumes the result opaquely and the scoring engine
//! degrades its cluster rules to the zero-impact branch when no labeller is
//! wired in or the labeller returns nothing.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::forensics::WalletTraceNode;
use crate::types::NormalizedHolder;

/// Lifecycle status of a labelled cluster's holdings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterStatus {
    /// Tokens locked in a vesting or locker contract
    Locked,
    /// Tokens sent to a burn address
    Burned,
    /// No movement for an extended period
    Dormant,
    /// Recently moving tokens
    Active,
}

/// Qualitative risk the labeller assigned to one cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterRisk {
    Low,
    Medium,
    High,
}

/// One labelled group of coordinated wallets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskCluster {
    pub id: String,
    pub member_wallets: Vec<String>,
    /// Share of total supply the cluster controls (0-100)
    pub supply_percent: f64,
    pub usd_value: f64,
    pub status: ClusterStatus,
    /// Cluster USD value divided by pool liquidity; >1 means the cluster
    /// could value-drain the pool
    pub lp_impact_ratio: f64,
    pub risk: ClusterRisk,
}

/// Aggregate output of the cluster-labelling component.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterControlResult {
    pub clusters: Vec<RiskCluster>,
    /// Combined cluster USD value divided by pool liquidity
    pub aggregate_lp_impact_ratio: f64,
    /// Combined supply share across all clusters (0-100)
    pub bundled_supply_percent: f64,
    /// Cluster count per lifecycle status
    pub status_distribution: HashMap<ClusterStatus, usize>,
}

/// Inputs handed to the labeller, bundled so the contract can grow without
/// touching every call site.
#[derive(Debug, Clone, Default)]
pub struct ClusterContext {
    pub total_supply: f64,
    pub price_usd: f64,
    pub liquidity_usd: f64,
    pub seed_addresses: Vec<String>,
    pub holders: Vec<NormalizedHolder>,
    /// Launch-window buy volume in USD per buyer address
    pub launch_buy_map: HashMap<String, f64>,
}

/// External component that groups traced wallets into risk clusters.
#[async_trait]
pub trait ClusterLabeller: Send + Sync {
    async fn label(
        &self,
        trace_nodes: &[WalletTraceNode],
        context: &ClusterContext,
    ) -> ClusterControlResult;
}
