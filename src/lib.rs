//! # Pharma Dashboard Metrics
//!
//! Turns monthly per-domain records (sales, stock, stock breaks, pricing) fetched for a
//! filter selection into the figures a pharmaceutical dashboard shows: year-to-date totals,
//! a like-for-like prior-year comparison, a full-year forecast with a user growth
//! percentage, derived ratios, and percentage-change badges.
//!
//! ## Core Concepts
//!
//! - **Reference date**: the injected "now". The current year runs January through the
//!   reference month; the prior year is the comparison baseline.
//! - **Buckets**: records keyed by month number within the current and prior year.
//! - **Forecast series**: twelve current-year months, each actual, borrowed from the prior
//!   year, or empty. Summed and scaled by the growth percentage.
//! - **Ratios**: computed from aggregated totals across all domains, never averaged.
//! - **Evolution**: `N/A`, `+100%`, or a signed one-decimal percentage change.
//!
//! ## Example
//!
//! ```rust,ignore
//! use pharma_dashboard_metrics::*;
//! use serde_json::json;
//!
//! let engine = MetricsEngine::new(ReferenceDate::new(2024, 1)?);
//! let payloads = vec![(
//!     MetricDomain::Sales,
//!     json!([
//!         { "month": "2024-01", "revenue": 100, "margin": 30, "quantity": 10 },
//!         { "month": "2023-01", "revenue": 80, "margin": 20, "quantity": 8 },
//!     ]),
//! )];
//!
//! let metrics = engine.compute_from_json(&payloads, ForecastPercentage::new(10.0))?;
//! let sales = metrics.domain(MetricDomain::Sales).unwrap();
//! println!("{}", sales.evolution.year_over_year["revenue"]); // +25.0%
//!
//! // Moving the slider never refetches.
//! let updated = engine.reforecast(&metrics, ForecastPercentage::new(-20.0));
//! ```

pub mod aggregation;
pub mod bucket;
pub mod config;
pub mod engine;
pub mod error;
pub mod evolution;
pub mod forecast;
pub mod gap_fill;
pub mod ingestion;
pub mod month;
pub mod ratios;
pub mod request;
pub mod schema;
pub mod view;

#[cfg(feature = "fetch")]
pub mod fetch;

pub use aggregation::{aggregate_periods, aggregate_records, PeriodTotals};
pub use bucket::{bucketize, YearBucket, YearBuckets};
pub use config::{DashboardConfig, FetchSettings};
pub use engine::{
    DashboardMetrics, DomainMetrics, EvolutionBadges, MetricSnapshot, MetricsEngine, SeriesPoint,
};
pub use error::{DashboardError, Result};
pub use evolution::{evolution, Evolution};
pub use forecast::{project, raw_totals, ForecastPercentage, ForecastState};
pub use gap_fill::{fill_gaps, ForecastSeries, SeriesEntry};
pub use ingestion::*;
pub use month::{first_day_of_month, last_day_of_month, MonthKey, ReferenceDate};
pub use ratios::{safe_ratio, DerivedRatios, RatioMetric};
pub use request::{DateRange, FilterSelection};
pub use schema::*;
pub use view::{MetricsView, RequestToken};

#[cfg(feature = "fetch")]
pub use fetch::{MetricsClient, FETCH_FAILED_MESSAGE};

use log::info;
use serde_json::Value;

/// Computes a dashboard from raw per-domain payloads using the config's reference date and
/// initial forecast percentage.
pub fn compute_dashboard(
    config: &DashboardConfig,
    payloads: &[(MetricDomain, Value)],
) -> Result<DashboardMetrics> {
    config.validate()?;
    let engine = config.engine();
    let metrics = engine.compute_from_json(payloads, config.forecast_percentage())?;

    let dropped: usize = metrics.ingestion.values().map(|s| s.dropped).sum();
    if dropped > 0 {
        info!("Dropped {} malformed record(s) during ingestion", dropped);
    }

    Ok(metrics)
}

/// Loads the config from a JSON file and computes a dashboard from raw payloads.
pub fn compute_dashboard_from_path(
    config_path: impl AsRef<std::path::Path>,
    payloads: &[(MetricDomain, Value)],
) -> Result<DashboardMetrics> {
    let config = DashboardConfig::from_path(config_path)?;
    compute_dashboard(&config, payloads)
}
