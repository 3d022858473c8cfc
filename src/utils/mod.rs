//! Utility module: errors, logging, metrics.

pub mod errors;
pub mod logging;
pub mod metrics;

pub use errors::{ProxyError, Result};
pub use logging::init_logging;
pub use metrics::ProxyMetrics;
