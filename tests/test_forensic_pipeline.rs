//! End-to-end checks of the analyze-then-score pipeline on fixed inputs.

use std::collections::BTreeSet;

use bundlescope::config::AnalyzerConfig;
use bundlescope::forensics::{analyze, LaunchSnapshot};
use bundlescope::scoring::{score, FactorStatus};
use bundlescope::types::{
    ChainKind, ForensicSnapshot, NormalizedHolder, NormalizedTransfer, RiskLevel, SecurityFlags,
    ThreatType, TransferKind,
};
use bundlescope::wallets::build_list;

fn swap(buyer: &str, seller: &str, amount: f64, usd: f64, block: u64) -> NormalizedTransfer {
    NormalizedTransfer {
        tx_hash: format!("tx_{buyer}_{block}"),
        block,
        buyer_address: buyer.to_string(),
        seller_address: seller.to_string(),
        token_amount: amount,
        usd_value: usd,
        kind: TransferKind::Swap,
    }
}

#[test]
fn test_bundled_launch_scores_to_zero() {
    // Worst case short of a honeypot: 12 coordinated launch buyers, heavy
    // volume, near-zero liquidity, extreme concentration, mintable supply.
    // 100 - 25 - 40 - 30 - 25 - 20 = -40, clamped to 0.
    let launch_transfers: Vec<NormalizedTransfer> = (0..12)
        .map(|i| swap(&format!("buyer{i}"), "", 5_000.0, 5_000.0, 1))
        .collect();
    let snapshot = ForensicSnapshot {
        launch_transfers: launch_transfers.clone(),
        early_transfers: launch_transfers,
        top_holders: (0..10)
            .map(|i| NormalizedHolder {
                address: format!("buyer{i}"),
                balance: 5_000.0,
                percentage: 8.5,
                usd_value: 0.0,
            })
            .collect(),
        creation_block: 1,
        total_supply: 1_000_000.0,
    };

    let launch = analyze(
        Some(&snapshot),
        1.0,
        1_000_000.0,
        ChainKind::Solana,
        &AnalyzerConfig::default(),
    );
    assert_eq!(launch.seed_buyers.len(), 12);
    assert!((launch.launch_volume_usd - 60_000.0).abs() < 1e-6);
    assert!((launch.holder_concentration_percent - 85.0).abs() < 1e-6);
    assert!(launch.has_bundle_cluster);

    let flags = SecurityFlags {
        is_mintable: true,
        ..Default::default()
    };
    let report = score(500.0, Some(&flags), &launch, None);
    assert_eq!(report.score, 0);
    assert_eq!(report.risk_level, RiskLevel::Critical);
    assert_eq!(report.threat_type, ThreatType::AccumulationPhase);
    // The clamp hides nothing from the breakdown
    let raw: i32 = report.factors.iter().map(|f| f.impact).sum();
    assert_eq!(raw, -140);
}

#[test]
fn test_missing_snapshot_degrades_rules_not_score() {
    // No forensic data: the bundle, launch-volume and concentration rules
    // all take their zero-impact branch, so only liquidity can penalize.
    let launch = analyze(
        None,
        1.0,
        1_000_000.0,
        ChainKind::Evm,
        &AnalyzerConfig::default(),
    );
    assert_eq!(launch, LaunchSnapshot::default());

    let report = score(
        50_000.0,
        Some(&SecurityFlags::default()),
        &launch,
        None,
    );
    assert_eq!(report.score, 100);
    assert_eq!(report.threat_type, ThreatType::OrganicGrowth);
    for label in ["Bundle wallets", "Launch volume", "Holder concentration"] {
        let factor = report.factors.iter().find(|f| f.label == label).unwrap();
        assert_eq!(factor.impact, 0, "{label} should not penalize");
    }
}

#[test]
fn test_honeypot_dominates_everything_else() {
    let launch_transfers: Vec<NormalizedTransfer> = (0..20)
        .map(|i| swap(&format!("buyer{i}"), "", 10_000.0, 10_000.0, 1))
        .collect();
    let snapshot = ForensicSnapshot {
        launch_transfers: launch_transfers.clone(),
        early_transfers: launch_transfers,
        ..Default::default()
    };
    let launch = analyze(
        Some(&snapshot),
        1.0,
        0.0,
        ChainKind::Solana,
        &AnalyzerConfig::default(),
    );

    let flags = SecurityFlags {
        is_honeypot: true,
        is_mintable: true,
        buy_tax: 0.99,
        sell_tax: 0.99,
        cannot_sell_all: true,
        ..Default::default()
    };
    let report = score(10.0, Some(&flags), &launch, None);
    assert_eq!(report.score, 0);
    assert_eq!(report.factors.len(), 1);
    assert_eq!(report.factors[0].status, FactorStatus::Fail);
    assert_eq!(report.threat_type, ThreatType::DistributionPhase);
}

#[test]
fn test_wallet_list_flags_launch_buyers_in_holder_set() {
    let snapshot = ForensicSnapshot {
        launch_transfers: vec![
            swap("sniper_a", "", 100.0, 50.0, 1),
            swap("sniper_b", "", 100.0, 50.0, 1),
            swap("sniper_c", "", 100.0, 50.0, 2),
        ],
        early_transfers: vec![],
        top_holders: vec![
            NormalizedHolder {
                address: "creator".to_string(),
                balance: 10_000.0,
                percentage: 10.0,
                usd_value: 0.0,
            },
            NormalizedHolder {
                address: "sniper_b".to_string(),
                balance: 100.0,
                percentage: 1.0,
                usd_value: 55.0,
            },
            NormalizedHolder {
                address: "organic".to_string(),
                balance: 50.0,
                percentage: 0.5,
                usd_value: 0.0,
            },
        ],
        creation_block: 1,
        total_supply: 100_000.0,
    };
    let launch = analyze(
        Some(&snapshot),
        0.5,
        0.0,
        ChainKind::Solana,
        &AnalyzerConfig::default(),
    );
    assert!(launch.has_bundle_cluster);

    let rows = build_list(
        &snapshot.top_holders,
        &launch.seed_buyers,
        0.5,
        ChainKind::Solana,
    );
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].funding_label, "deployer");
    assert_eq!(rows[1].funding_label, "bundle buyer");
    assert!(rows[1].is_bundler);
    // Slot-model: provider valuation wins over balance * price
    assert_eq!(rows[1].holding_amount_usd, 55.0);
    assert_eq!(rows[2].funding_label, "unknown");
}

#[test]
fn test_evm_mint_noise_never_reaches_scoring() {
    // A huge mint from the zero address must not inflate launch volume or
    // the seed-buyer count.
    let transfers = vec![
        swap(
            "0x1111111111111111111111111111111111111111",
            "0x0000000000000000000000000000000000000000",
            1_000_000.0,
            1_000_000.0,
            1,
        ),
        swap(
            "0x1111111111111111111111111111111111111111",
            "0xdddddddddddddddddddddddddddddddddddddddd",
            100.0,
            100.0,
            2,
        ),
    ];
    let snapshot = ForensicSnapshot {
        launch_transfers: transfers.clone(),
        early_transfers: transfers,
        ..Default::default()
    };
    let launch = analyze(
        Some(&snapshot),
        1.0,
        0.0,
        ChainKind::Evm,
        &AnalyzerConfig::default(),
    );
    assert_eq!(launch.seed_buyers.len(), 1);
    assert!((launch.launch_volume_usd - 100.0).abs() < 1e-9);

    let report = score(100_000.0, Some(&SecurityFlags::default()), &launch, None);
    let volume_factor = report
        .factors
        .iter()
        .find(|f| f.label == "Launch volume")
        .unwrap();
    assert_eq!(volume_factor.impact, 0);
}

#[test]
fn test_seed_buyers_come_from_launch_window_only() {
    let snapshot = ForensicSnapshot {
        launch_transfers: vec![swap("early_bird", "", 10.0, 10.0, 1)],
        early_transfers: vec![
            swap("early_bird", "", 10.0, 10.0, 1),
            swap("latecomer", "", 10.0, 10.0, 50),
        ],
        ..Default::default()
    };
    let launch = analyze(
        Some(&snapshot),
        1.0,
        0.0,
        ChainKind::Solana,
        &AnalyzerConfig::default(),
    );
    let expected: BTreeSet<String> = ["early_bird".to_string()].into_iter().collect();
    assert_eq!(launch.seed_buyers, expected);
}
