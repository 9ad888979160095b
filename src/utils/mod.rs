//! Reusable helpers shared across the scanner.

pub mod retry;

pub use retry::{call_api_with_retry, API_MAX_RETRIES, API_TIMEOUT_MS};
