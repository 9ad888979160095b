//! Input validation helpers for addresses, provider URLs, and log output.

use anyhow::{anyhow, Result};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use url::Url;

/// Validate a Solana public key string.
pub fn validate_solana_pubkey(pubkey_str: &str) -> Result<Pubkey> {
    Pubkey::from_str(pubkey_str).map_err(|e| anyhow!("Invalid Solana public key: {}", e))
}

/// Validate an EVM address: 0x prefix plus 40 hex characters.
pub fn validate_evm_address(address: &str) -> Result<()> {
    let hex = address
        .strip_prefix("0x")
        .ok_or_else(|| anyhow!("EVM address must start with 0x"))?;
    if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(anyhow!("Invalid EVM address: {}", address));
    }
    Ok(())
}

/// Validate an upstream API base URL.
///
/// HTTPS is required except for localhost, so a misconfigured endpoint is
/// rejected at startup rather than on the first provider call.
pub fn validate_api_url(url_str: &str) -> Result<String> {
    let url = Url::parse(url_str).map_err(|e| anyhow!("Invalid URL format: {}", e))?;

    if url.scheme() != "https"
        && !url.host_str().unwrap_or("").contains("localhost")
        && !url.host_str().unwrap_or("").starts_with("127.0.0.1")
    {
        return Err(anyhow!("Provider URL must use HTTPS"));
    }

    Ok(url.to_string())
}

/// Sanitize log output so provider credentials never leak into logs.
pub fn sanitize_for_logging(input: &str) -> String {
    let patterns = [
        (r"api-key=[a-zA-Z0-9\-._~]+", "api-key=[REDACTED]"),
        (r"apikey=[a-zA-Z0-9\-._~]+", "apikey=[REDACTED]"),
        (r"[a-zA-Z0-9]{64,}", "[REDACTED-KEY]"),
    ];

    let mut output = input.to_string();
    for (pattern, replacement) in patterns {
        if let Ok(re) = regex::Regex::new(pattern) {
            output = re.replace_all(&output, replacement).to_string();
        }
    }
    output
}
