use crate::config::FetchSettings;
use crate::engine::{DashboardMetrics, MetricsEngine};
use crate::error::{DashboardError, Result};
use crate::forecast::ForecastPercentage;
use crate::ingestion::{parse_domain_records, IngestionReport};
use crate::request::FilterSelection;
use crate::schema::MetricDomain;
use futures::future::try_join_all;
use log::{debug, warn};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tokio::time::timeout;

/// Shown to the user for every fetch failure, whatever the cause.
pub const FETCH_FAILED_MESSAGE: &str = "Unable to load metrics. Please try again.";

fn fetch_failed(domain: MetricDomain, detail: impl std::fmt::Display) -> DashboardError {
    warn!("Fetching {:?} metrics failed: {}", domain, detail);
    DashboardError::FetchFailed(FETCH_FAILED_MESSAGE.to_string())
}

/// Posts the filter selection to each domain endpoint. No retries; every request is bounded
/// by the configured timeout.
#[derive(Clone)]
pub struct MetricsClient {
    client: Client,
    settings: FetchSettings,
    timeout: Duration,
}

impl MetricsClient {
    pub fn new(settings: FetchSettings) -> Self {
        Self {
            client: Client::new(),
            timeout: Duration::from_millis(settings.timeout_ms),
            settings,
        }
    }

    pub async fn fetch_domain(
        &self,
        domain: MetricDomain,
        filters: &FilterSelection,
    ) -> Result<IngestionReport> {
        let url = self.settings.url_for(domain);
        debug!("Fetching {:?} metrics from {}", domain, url);

        let payload = match timeout(self.timeout, self.request(&url, filters)).await {
            Ok(Ok(payload)) => payload,
            Ok(Err(detail)) => return Err(fetch_failed(domain, detail)),
            Err(_) => {
                return Err(fetch_failed(
                    domain,
                    format!("timed out after {} ms", self.timeout.as_millis()),
                ))
            }
        };

        parse_domain_records(domain, &payload).map_err(|e| fetch_failed(domain, e))
    }

    async fn request(
        &self,
        url: &str,
        filters: &FilterSelection,
    ) -> std::result::Result<Value, String> {
        let res = self
            .client
            .post(url)
            .json(filters)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(format!("status {}: {}", status, body));
        }

        res.json::<Value>().await.map_err(|e| e.to_string())
    }

    /// Fetches every domain concurrently. Any single failure fails the whole load.
    pub async fn fetch_all(
        &self,
        domains: &[MetricDomain],
        filters: &FilterSelection,
    ) -> Result<Vec<IngestionReport>> {
        try_join_all(
            domains
                .iter()
                .map(|domain| self.fetch_domain(*domain, filters)),
        )
        .await
    }

    pub async fn load_dashboard(
        &self,
        engine: &MetricsEngine,
        filters: &FilterSelection,
        percentage: ForecastPercentage,
    ) -> Result<DashboardMetrics> {
        let reports = self.fetch_all(&MetricDomain::ALL, filters).await?;
        Ok(engine.compute(&reports, percentage))
    }
}
