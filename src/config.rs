use crate::engine::MetricsEngine;
use crate::error::{DashboardError, Result};
use crate::forecast::ForecastPercentage;
use crate::month::ReferenceDate;
use crate::schema::MetricDomain;
use chrono::NaiveDate;
use log::warn;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

fn default_base_url() -> String {
    "http://localhost:3000/api".to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_endpoints() -> BTreeMap<MetricDomain, String> {
    BTreeMap::from([
        (MetricDomain::Sales, "/sales".to_string()),
        (MetricDomain::Stock, "/stock".to_string()),
        (MetricDomain::StockBreak, "/stock-breaks".to_string()),
        (MetricDomain::Pricing, "/pricing".to_string()),
    ])
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FetchSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_ms")]
    #[schemars(description = "Per-request deadline in milliseconds. A request that exceeds it fails.")]
    pub timeout_ms: u64,

    #[serde(default = "default_endpoints")]
    pub endpoints: BTreeMap<MetricDomain, String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
            endpoints: default_endpoints(),
        }
    }
}

impl FetchSettings {
    /// Full URL for a domain. Domains without a configured path use the default one.
    pub fn url_for(&self, domain: MetricDomain) -> String {
        let path = self
            .endpoints
            .get(&domain)
            .cloned()
            .or_else(|| default_endpoints().remove(&domain))
            .unwrap_or_default();
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardConfig {
    #[serde(default)]
    #[schemars(description = "Pins \"now\" for reproducible runs. Defaults to today's date.")]
    pub reference_date: Option<NaiveDate>,

    #[serde(default)]
    #[schemars(description = "Initial growth percentage for the forecast, clamped to [-100, 100]")]
    pub forecast_percentage: f64,

    #[serde(default)]
    pub fetch: FetchSettings,
}

impl DashboardConfig {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: DashboardConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.forecast_percentage.is_finite() {
            return Err(DashboardError::Config(
                "forecastPercentage must be a finite number".to_string(),
            ));
        }
        if !(ForecastPercentage::MIN..=ForecastPercentage::MAX).contains(&self.forecast_percentage)
        {
            warn!(
                "forecastPercentage {} is outside [{}, {}] and will be clamped",
                self.forecast_percentage,
                ForecastPercentage::MIN,
                ForecastPercentage::MAX
            );
        }
        if self.fetch.timeout_ms == 0 {
            return Err(DashboardError::Config(
                "fetch.timeoutMs must be greater than zero".to_string(),
            ));
        }
        if !(self.fetch.base_url.starts_with("http://") || self.fetch.base_url.starts_with("https://"))
        {
            return Err(DashboardError::Config(format!(
                "fetch.baseUrl '{}' must be an http(s) URL",
                self.fetch.base_url
            )));
        }
        Ok(())
    }

    /// The single place the clock is read when no date is pinned.
    pub fn reference(&self) -> ReferenceDate {
        self.reference_date
            .map(ReferenceDate::from_date)
            .unwrap_or_else(ReferenceDate::today)
    }

    pub fn forecast_percentage(&self) -> ForecastPercentage {
        ForecastPercentage::new(self.forecast_percentage)
    }

    pub fn engine(&self) -> MetricsEngine {
        MetricsEngine::new(self.reference())
    }
}
