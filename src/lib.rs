//! Workload Flux - Behavioral analytics over work activity intervals
//!
//! Flux turns per-user idle and work intervals into daily summaries through a
//! deterministic pipeline: daily aggregation → feature normalization →
//! productivity scoring. Windows of daily summaries feed burnout analysis and
//! anomaly detection.
//!
//! ## Modules
//!
//! - **Daily pipeline**: `aggregator`, `normalizer`, `scorer`
//! - **Trend analysis**: `burnout`, `anomaly`
//! - **Ingestion**: `adapter` (JSON / NDJSON records) and `source` (interval store)
//!
//! ## Example
//! ```ignore
//! let records = IntervalAdapter::parse_ndjson(&input)?;
//! let source = InMemoryIntervalSource::from_records(records)?;
//! let pipeline = AnalyticsPipeline::new(source, AnalyticsConfig::default());
//! let summary = pipeline.daily_summary("user-1", date)?;
//! ```

pub mod adapter;
pub mod aggregator;
pub mod anomaly;
pub mod burnout;
pub mod config;
pub mod error;
pub mod normalizer;
pub mod numeric;
pub mod pipeline;
pub mod scorer;
pub mod source;
pub mod types;

pub use adapter::{InputFormat, IntervalAdapter, IntervalValidator, ValidationResult};
pub use aggregator::{DailyAggregator, DayWindow};
pub use anomaly::{AnomalyDetector, AnomalyStrategy};
pub use burnout::BurnoutAnalyzer;
pub use config::AnalyticsConfig;
pub use error::{AnalyticsError, ValidationError};
pub use normalizer::FeatureNormalizer;
pub use pipeline::AnalyticsPipeline;
pub use scorer::ProductivityScorer;
pub use source::{InMemoryIntervalSource, IntervalSet, IntervalSource, TimeRange};

/// Flux version reported by the CLI
pub const FLUX_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by the CLI
pub const PRODUCER_NAME: &str = "workload-flux";
