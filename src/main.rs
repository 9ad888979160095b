//! bundlescope CLI: scan one token and print the scored result as JSON.
//!
//! Usage: `bundlescope <token-address-or-symbol> [config.toml]`
//! Provider credentials come from SOLANA_API_KEY / EVM_API_KEY or the
//! config file; without them the scan still runs, minus forensics.

use anyhow::{Context, Result};

use bundlescope::{ScannerConfig, TokenScanner};

#[tokio::main]
async fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let query = match args.next() {
        Some(q) => q,
        None => {
            eprintln!("usage: bundlescope <token-address-or-symbol> [config.toml]");
            std::process::exit(2);
        }
    };

    let config = match args.next() {
        Some(path) => ScannerConfig::from_toml_file(&path)
            .with_context(|| format!("loading config from {path}"))?,
        None => ScannerConfig::from_env(),
    };
    config.validate().context("validating config")?;
    config.init_logging();

    let scanner = TokenScanner::new(config)?;
    let result = scanner.scan(&query).await?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
