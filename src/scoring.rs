//! Scoring engine: folds security flags, liquidity, launch statistics and
//! optional cluster metrics into a 0-100 score with an ordered breakdown.
//!
//! Pure and deterministic. Rule order is fixed; every rule appends exactly
//! one factor, except the honeypot short-circuit which ends the evaluation
//! with a single entry.

use serde::{Deserialize, Serialize};

use crate::cluster::ClusterControlResult;
use crate::forensics::LaunchSnapshot;
use crate::types::{RiskLevel, SecurityFlags, ThreatType};

/// Verdict class of one scoring rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorStatus {
    Pass,
    Warn,
    Fail,
    /// Rule could not evaluate (missing upstream data); zero impact
    Info,
}

/// One scoring rule's verdict, in evaluation order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreFactor {
    pub label: String,
    /// Signed impact on the score, always <= 0
    pub impact: i32,
    pub status: FactorStatus,
    pub detail: String,
}

impl ScoreFactor {
    fn new(label: &str, impact: i32, status: FactorStatus, detail: String) -> Self {
        Self {
            label: label.to_string(),
            impact,
            status,
            detail,
        }
    }
}

/// Final scoring output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreReport {
    pub score: u8,
    pub risk_level: RiskLevel,
    pub threat_type: ThreatType,
    pub factors: Vec<ScoreFactor>,
}

/// Security rule outcome helper: flags absent means "no audit", zero impact.
fn security_rule<F>(
    factors: &mut Vec<ScoreFactor>,
    security: Option<&SecurityFlags>,
    label: &str,
    rule: F,
) -> i32
where
    F: Fn(&SecurityFlags) -> Option<(i32, String)>,
{
    match security {
        None => {
            factors.push(ScoreFactor::new(
                label,
                0,
                FactorStatus::Info,
                "no security audit available".to_string(),
            ));
            0
        }
        Some(flags) => match rule(flags) {
            Some((impact, detail)) => {
                factors.push(ScoreFactor::new(label, impact, FactorStatus::Fail, detail));
                impact
            }
            None => {
                factors.push(ScoreFactor::new(
                    label,
                    0,
                    FactorStatus::Pass,
                    "not flagged".to_string(),
                ));
                0
            }
        },
    }
}

/// Evaluate the full rule pipeline.
pub fn score(
    liquidity_usd: f64,
    security: Option<&SecurityFlags>,
    launch: &LaunchSnapshot,
    cluster: Option<&ClusterControlResult>,
) -> ScoreReport {
    let mut factors: Vec<ScoreFactor> = Vec::new();
    let mut total: i32 = 100;

    // Honeypot short-circuit: nothing else matters if holders cannot sell
    if security.map(|s| s.is_honeypot).unwrap_or(false) {
        factors.push(ScoreFactor::new(
            "Honeypot",
            -100,
            FactorStatus::Fail,
            "token cannot be sold; holders are exit liquidity".to_string(),
        ));
        return ScoreReport {
            score: 0,
            risk_level: RiskLevel::from_score(0),
            threat_type: ThreatType::DistributionPhase,
            factors,
        };
    }

    total += security_rule(&mut factors, security, "Mintable supply", |flags| {
        flags
            .is_mintable
            .then(|| (-25, "supply can be inflated by the owner".to_string()))
    });
    total += security_rule(&mut factors, security, "Buy tax", |flags| {
        (flags.buy_tax > 0.10).then(|| {
            (
                -15,
                format!("buy tax {:.1}% exceeds 10%", flags.buy_tax * 100.0),
            )
        })
    });
    total += security_rule(&mut factors, security, "Sell tax", |flags| {
        (flags.sell_tax > 0.10).then(|| {
            (
                -15,
                format!("sell tax {:.1}% exceeds 10%", flags.sell_tax * 100.0),
            )
        })
    });
    total += security_rule(&mut factors, security, "Sell restriction", |flags| {
        flags
            .cannot_sell_all
            .then(|| (-30, "holders cannot sell their full balance".to_string()))
    });

    // Liquidity depth, tiered; exactly one tier applies
    let (impact, status, detail) = if liquidity_usd < 1_000.0 {
        (
            -40,
            FactorStatus::Fail,
            format!("liquidity ${:.0} is near-zero", liquidity_usd),
        )
    } else if liquidity_usd < 5_000.0 {
        (
            -25,
            FactorStatus::Warn,
            format!("liquidity ${:.0} is very thin", liquidity_usd),
        )
    } else if liquidity_usd < 20_000.0 {
        (
            -10,
            FactorStatus::Warn,
            format!("liquidity ${:.0} is thin", liquidity_usd),
        )
    } else {
        (
            0,
            FactorStatus::Pass,
            format!("liquidity ${:.0} is adequate", liquidity_usd),
        )
    };
    factors.push(ScoreFactor::new("Liquidity depth", impact, status, detail));
    total += impact;

    // Bundle wallet count
    let seed_count = launch.seed_buyers.len();
    let (impact, status, detail) = if seed_count > 10 {
        (
            -30,
            FactorStatus::Fail,
            format!("{} wallets bought in the launch window", seed_count),
        )
    } else if seed_count > 5 {
        (
            -15,
            FactorStatus::Warn,
            format!("{} wallets bought in the launch window", seed_count),
        )
    } else if seed_count > 2 {
        (
            -5,
            FactorStatus::Warn,
            format!("{} wallets bought in the launch window", seed_count),
        )
    } else if seed_count == 0 {
        (
            0,
            FactorStatus::Pass,
            "no launch-window buyers detected".to_string(),
        )
    } else {
        (
            0,
            FactorStatus::Pass,
            format!("only {} launch-window buyer(s)", seed_count),
        )
    };
    factors.push(ScoreFactor::new("Bundle wallets", impact, status, detail));
    total += impact;

    // Launch-window volume
    let volume = launch.launch_volume_usd;
    let (impact, status) = if volume > 50_000.0 {
        (-25, FactorStatus::Fail)
    } else if volume > 10_000.0 {
        (-15, FactorStatus::Warn)
    } else if volume > 5_000.0 {
        (-10, FactorStatus::Warn)
    } else {
        (0, FactorStatus::Pass)
    };
    factors.push(ScoreFactor::new(
        "Launch volume",
        impact,
        status,
        format!("${:.0} bought in the launch window", volume),
    ));
    total += impact;

    // Holder concentration
    let concentration = launch.holder_concentration_percent;
    let (impact, status) = if concentration > 80.0 {
        (-20, FactorStatus::Fail)
    } else if concentration > 60.0 {
        (-10, FactorStatus::Warn)
    } else {
        (0, FactorStatus::Pass)
    };
    factors.push(ScoreFactor::new(
        "Holder concentration",
        impact,
        status,
        format!("top holders control {:.1}% of supply", concentration),
    ));
    total += impact;

    // Cluster rules only apply when the labeller produced actual clusters
    if let Some(cluster) = cluster.filter(|c| !c.clusters.is_empty()) {
        let ratio = cluster.aggregate_lp_impact_ratio;
        let (impact, status) = if ratio > 1.5 {
            (-20, FactorStatus::Fail)
        } else if ratio > 1.0 {
            (-15, FactorStatus::Warn)
        } else if ratio > 0.5 {
            (-10, FactorStatus::Warn)
        } else {
            (0, FactorStatus::Pass)
        };
        factors.push(ScoreFactor::new(
            "LP impact",
            impact,
            status,
            format!("bundled value is {:.2}x pool liquidity", ratio),
        ));
        total += impact;

        let bundled = cluster.bundled_supply_percent;
        if bundled > 0.0 {
            let (impact, status) = if bundled > 30.0 {
                (-15, FactorStatus::Fail)
            } else if bundled > 10.0 {
                (-8, FactorStatus::Warn)
            } else {
                (0, FactorStatus::Pass)
            };
            factors.push(ScoreFactor::new(
                "Bundled supply",
                impact,
                status,
                format!("clusters control {:.1}% of supply", bundled),
            ));
            total += impact;
        }
    }

    let score = total.clamp(0, 100) as u8;
    ScoreReport {
        score,
        risk_level: RiskLevel::from_score(score),
        threat_type: classify_threat(launch),
        factors,
    }
}

/// Threat phase, derived from the launch statistics (never from the score).
fn classify_threat(launch: &LaunchSnapshot) -> ThreatType {
    let seed_count = launch.seed_buyers.len();
    if launch.has_bundle_cluster
        || (seed_count > 5 && launch.launch_volume_usd > 5_000.0)
        || seed_count > 3
    {
        ThreatType::AccumulationPhase
    } else {
        ThreatType::OrganicGrowth
    }
}
