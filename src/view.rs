use crate::engine::{DashboardMetrics, MetricsEngine};
use crate::forecast::ForecastPercentage;
use log::debug;

/// Identifies one fetch. Only the most recently issued token may update the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestToken(u64);

/// State behind one dashboard component.
///
/// Each filter change calls [`MetricsView::begin_request`]; responses are applied through
/// [`MetricsView::complete_success`] or [`MetricsView::complete_failure`] with the token they
/// were issued. Responses carrying an older token are discarded, so a slow stale request can
/// never overwrite newer data. A failure keeps the last good metrics and only sets an error
/// message.
#[derive(Debug, Clone)]
pub struct MetricsView {
    engine: MetricsEngine,
    percentage: ForecastPercentage,
    generation: u64,
    loading: bool,
    error: Option<String>,
    metrics: Option<DashboardMetrics>,
}

impl MetricsView {
    pub fn new(engine: MetricsEngine, percentage: ForecastPercentage) -> Self {
        Self {
            engine,
            percentage,
            generation: 0,
            loading: false,
            error: None,
            metrics: None,
        }
    }

    pub fn begin_request(&mut self) -> RequestToken {
        self.generation += 1;
        self.loading = true;
        RequestToken(self.generation)
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        token.0 == self.generation
    }

    /// Returns `false` if the token is stale and the metrics were ignored.
    pub fn complete_success(&mut self, token: RequestToken, metrics: DashboardMetrics) -> bool {
        if !self.is_current(token) {
            debug!(
                "Discarding stale response #{} (latest #{})",
                token.0, self.generation
            );
            return false;
        }

        let metrics = if metrics.forecast_percentage == self.percentage {
            metrics
        } else {
            self.engine.reforecast(&metrics, self.percentage)
        };

        self.metrics = Some(metrics);
        self.error = None;
        self.loading = false;
        true
    }

    /// Returns `false` if the token is stale and the failure was ignored.
    pub fn complete_failure(&mut self, token: RequestToken, message: impl Into<String>) -> bool {
        if !self.is_current(token) {
            debug!(
                "Discarding stale failure #{} (latest #{})",
                token.0, self.generation
            );
            return false;
        }

        self.error = Some(message.into());
        self.loading = false;
        true
    }

    /// Recomputes the forecast from the held metrics. Never triggers a fetch.
    pub fn set_forecast_percentage(&mut self, percentage: f64) {
        self.percentage = ForecastPercentage::new(percentage);
        self.metrics = self
            .metrics
            .as_ref()
            .map(|metrics| self.engine.reforecast(metrics, self.percentage));
    }

    pub fn percentage(&self) -> ForecastPercentage {
        self.percentage
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn metrics(&self) -> Option<&DashboardMetrics> {
        self.metrics.as_ref()
    }
}
