//! bundlescope: forensic bundle-detection engine for freshly launched
//! tokens.
//!
//! One scan resolves a token's trading pair, pulls its security audit,
//! reconstructs the launch-window buying pattern, traces where those tokens
//! moved afterward, and folds everything into a 0-100 insider-bundling
//! score with an ordered factor breakdown.

pub mod chain;
pub mod cluster;
pub mod config;
pub mod forensics;
pub mod providers;
pub mod scanner;
pub mod scoring;
pub mod security;
pub mod types;
pub mod utils;
pub mod wallets;

pub use config::ScannerConfig;
pub use scanner::{ScanResult, TokenScanner};
