//! Upstream provider clients: pair resolution and security audits.
//!
//! Chain-specific forensic fetching lives with the chain adapters in
//! [`crate::chain`]; this module owns the shared provider error taxonomy.

pub mod dex_screener;
pub mod goplus;

use crate::types::ForensicsStatus;
use thiserror::Error;

/// Why a provider-backed step could not run.
///
/// The three variants are deliberately distinct: the final result reports
/// missing-credential, unsupported-chain, and upstream-error separately so
/// the consumer can tell a skipped enrichment from a failed one.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider credential missing: {0}")]
    MissingCredential(&'static str),
    #[error("no provider implementation for chain {0}")]
    UnsupportedChain(String),
    #[error("upstream provider unavailable: {0}")]
    Upstream(#[from] anyhow::Error),
}

impl ProviderError {
    /// The status surfaced unchanged into the final scan result.
    pub fn forensics_status(&self) -> ForensicsStatus {
        match self {
            ProviderError::MissingCredential(_) => ForensicsStatus::MissingCredential,
            ProviderError::UnsupportedChain(_) => ForensicsStatus::UnsupportedChain,
            ProviderError::Upstream(_) => ForensicsStatus::ProviderError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_to_status_mapping() {
        assert_eq!(
            ProviderError::MissingCredential("SOLANA_API_KEY").forensics_status(),
            ForensicsStatus::MissingCredential
        );
        assert_eq!(
            ProviderError::UnsupportedChain("tron".into()).forensics_status(),
            ForensicsStatus::UnsupportedChain
        );
        assert_eq!(
            ProviderError::Upstream(anyhow::anyhow!("503")).forensics_status(),
            ForensicsStatus::ProviderError
        );
    }
}
