//! Launch forensics: window statistics and the distribution-tree trace.

pub mod analyzer;
pub mod tracer;

pub use analyzer::{analyze, LaunchSnapshot};
pub use tracer::{DistributionTracer, FundingSource, WalletTraceNode};
