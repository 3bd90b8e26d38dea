use crate::aggregation::{aggregate_periods, PeriodTotals};
use crate::bucket::bucketize;
use crate::error::Result;
use crate::evolution::Evolution;
use crate::forecast::{project, ForecastPercentage};
use crate::gap_fill::{fill_gaps, ForecastSeries};
use crate::ingestion::{parse_domain_records, IngestionReport, IngestionSummary};
use crate::month::{MonthKey, ReferenceDate};
use crate::ratios::{DerivedRatios, RatioMetric};
use crate::schema::{MetricDomain, MetricField, MetricValues, MonthlyRecord, Provenance};
use log::{debug, info};
use schemars::JsonSchema;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// One window's values for a domain plus the ratios derived across all domains.
#[derive(Debug, Clone, PartialEq, Default, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetricSnapshot {
    pub values: BTreeMap<MetricField, f64>,
    pub ratios: DerivedRatios,
}

impl MetricSnapshot {
    fn new(domain: MetricDomain, values: &MetricValues, combined: &MetricValues) -> Self {
        Self {
            values: values.domain_map(domain),
            ratios: DerivedRatios::from_values(combined),
        }
    }

    pub fn value(&self, field: MetricField) -> f64 {
        self.values.get(&field).copied().unwrap_or(0.0)
    }
}

/// Delta badges keyed by field or ratio name.
#[derive(Debug, Clone, PartialEq, Default, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EvolutionBadges {
    #[schemars(description = "Current year-to-date versus the same elapsed months of the prior year")]
    pub year_over_year: BTreeMap<String, Evolution>,

    #[schemars(description = "Full-year forecast versus the full prior year")]
    pub forecast_vs_prior_year: BTreeMap<String, Evolution>,
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPoint {
    pub month: MonthKey,
    pub provenance: Provenance,
    pub values: BTreeMap<MetricField, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DomainMetrics {
    pub current: MetricSnapshot,
    pub adjusted: MetricSnapshot,
    pub global: MetricSnapshot,
    pub forecast: MetricSnapshot,
    pub evolution: EvolutionBadges,
    /// The gap-filled current-year series, for charting.
    pub series: Vec<SeriesPoint>,

    #[serde(skip)]
    #[schemars(skip)]
    totals: PeriodTotals,
    #[serde(skip)]
    #[schemars(skip)]
    forecast_input: ForecastSeries,
}

impl DomainMetrics {
    pub fn totals(&self) -> &PeriodTotals {
        &self.totals
    }

    pub fn forecast_series(&self) -> &ForecastSeries {
        &self.forecast_input
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub reference: ReferenceDate,
    pub forecast_percentage: ForecastPercentage,
    pub domains: BTreeMap<MetricDomain, DomainMetrics>,
    pub ingestion: BTreeMap<MetricDomain, IngestionSummary>,
}

impl DashboardMetrics {
    pub fn domain(&self, domain: MetricDomain) -> Option<&DomainMetrics> {
        self.domains.get(&domain)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(DashboardMetrics)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

/// Runs bucketing, gap filling, aggregation, ratios, forecasting and badges for a set of
/// domains. Holds nothing but the injected reference date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsEngine {
    reference: ReferenceDate,
}

impl MetricsEngine {
    pub fn new(reference: ReferenceDate) -> Self {
        Self { reference }
    }

    pub fn reference(&self) -> ReferenceDate {
        self.reference
    }

    pub fn compute(
        &self,
        reports: &[IngestionReport],
        percentage: ForecastPercentage,
    ) -> DashboardMetrics {
        let mut grouped: BTreeMap<MetricDomain, (Vec<MonthlyRecord>, IngestionSummary)> =
            BTreeMap::new();
        for report in reports {
            let (records, summary) = grouped.entry(report.domain).or_default();
            records.extend(report.records.iter().cloned());
            summary.accepted += report.records.len();
            summary.dropped += report.dropped.len();
        }

        info!(
            "Computing dashboard metrics for {} domain(s), reference {}-{:02}",
            grouped.len(),
            self.reference.current_year(),
            self.reference.current_month()
        );

        let mut computed = Vec::with_capacity(grouped.len());
        let mut ingestion = BTreeMap::new();
        for (domain, (records, summary)) in grouped {
            let buckets = bucketize(&records, &self.reference);
            let totals = aggregate_periods(&buckets, &self.reference);
            let series = fill_gaps(&buckets, &self.reference, domain);
            debug!(
                "{:?}: {} current month(s), {} comparable, {} prior-year",
                domain, totals.current_months, totals.comparison_months, totals.global_months
            );
            computed.push((domain, totals, series));
            ingestion.insert(domain, summary);
        }

        let combined_current = combine(computed.iter().map(|(_, t, _)| t.current));
        let combined_comparison = combine(computed.iter().map(|(_, t, _)| t.comparison));
        let combined_global = combine(computed.iter().map(|(_, t, _)| t.global));
        let comparison_months: BTreeMap<MetricDomain, usize> = computed
            .iter()
            .map(|(domain, t, _)| (*domain, t.comparison_months))
            .collect();

        let domains = computed
            .into_iter()
            .map(|(domain, totals, series)| {
                let current = MetricSnapshot::new(domain, &totals.current, &combined_current);
                let adjusted =
                    MetricSnapshot::new(domain, &totals.comparison, &combined_comparison);
                let global = MetricSnapshot::new(domain, &totals.global, &combined_global);

                let year_over_year = badges(domain, &comparison_months, &adjusted, &current);

                let metrics = DomainMetrics {
                    current,
                    adjusted,
                    global,
                    forecast: MetricSnapshot::default(),
                    evolution: EvolutionBadges {
                        year_over_year,
                        forecast_vs_prior_year: BTreeMap::new(),
                    },
                    series: series_points(&series),
                    totals,
                    forecast_input: series,
                };
                (domain, metrics)
            })
            .collect();

        let mut dashboard = DashboardMetrics {
            reference: self.reference,
            forecast_percentage: percentage,
            domains,
            ingestion,
        };
        apply_forecast(&mut dashboard, percentage);
        dashboard
    }

    /// Parses raw payloads, then computes. Malformed rows are dropped, not returned as errors.
    pub fn compute_from_json(
        &self,
        payloads: &[(MetricDomain, Value)],
        percentage: ForecastPercentage,
    ) -> Result<DashboardMetrics> {
        let reports = payloads
            .iter()
            .map(|(domain, payload)| parse_domain_records(*domain, payload))
            .collect::<Result<Vec<_>>>()?;
        Ok(self.compute(&reports, percentage))
    }

    /// Recomputes only the forecast side for a new percentage. Actuals are left untouched.
    pub fn reforecast(
        &self,
        metrics: &DashboardMetrics,
        percentage: ForecastPercentage,
    ) -> DashboardMetrics {
        let mut updated = metrics.clone();
        apply_forecast(&mut updated, percentage);
        updated
    }
}

fn combine<I>(values: I) -> MetricValues
where
    I: IntoIterator<Item = MetricValues>,
{
    values
        .into_iter()
        .fold(MetricValues::default(), |acc, v| acc + v)
}

fn apply_forecast(dashboard: &mut DashboardMetrics, percentage: ForecastPercentage) {
    let states: BTreeMap<MetricDomain, _> = dashboard
        .domains
        .iter()
        .map(|(domain, metrics)| (*domain, project(&metrics.forecast_input, percentage)))
        .collect();

    let combined_projected = combine(states.values().map(|s| s.projected_totals));
    let global_months: BTreeMap<MetricDomain, usize> = dashboard
        .domains
        .iter()
        .map(|(domain, metrics)| (*domain, metrics.totals.global_months))
        .collect();

    for (domain, metrics) in dashboard.domains.iter_mut() {
        let Some(state) = states.get(domain) else {
            continue;
        };
        metrics.forecast =
            MetricSnapshot::new(*domain, &state.projected_totals, &combined_projected);
        metrics.evolution.forecast_vs_prior_year =
            badges(*domain, &global_months, &metrics.global, &metrics.forecast);
    }

    debug!("Applied forecast at {:+}%", percentage.value());
    dashboard.forecast_percentage = percentage;
}

/// Badges for the domain's own fields and the ratios its cards show. A badge is unavailable
/// when any domain feeding it has no records in the baseline window.
fn badges(
    domain: MetricDomain,
    baseline_months: &BTreeMap<MetricDomain, usize>,
    baseline: &MetricSnapshot,
    value: &MetricSnapshot,
) -> BTreeMap<String, Evolution> {
    let has_baseline = |d: &MetricDomain| baseline_months.get(d).is_some_and(|n| *n > 0);
    let mut out = BTreeMap::new();

    let baseline_available = has_baseline(&domain);
    for field in domain.fields() {
        let previous = baseline_available.then(|| baseline.value(field));
        out.insert(
            field.key().to_string(),
            Evolution::between(previous, value.value(field)),
        );
    }

    for metric in RatioMetric::for_domain(domain) {
        let previous = metric
            .inputs()
            .iter()
            .all(|d| has_baseline(d))
            .then(|| baseline.ratios.get(metric));
        out.insert(
            metric.key().to_string(),
            Evolution::between(previous, value.ratios.get(metric)),
        );
    }

    out
}

fn series_points(series: &ForecastSeries) -> Vec<SeriesPoint> {
    series
        .entries()
        .iter()
        .map(|entry| SeriesPoint {
            month: entry.record.month,
            provenance: entry.provenance,
            values: entry.record.values.domain_map(series.domain()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reference() -> ReferenceDate {
        ReferenceDate::new(2024, 1).unwrap()
    }

    fn sales_payload() -> Value {
        let mut rows = vec![json!({
            "month": "2024-01",
            "revenue": 100,
            "margin": 30,
            "quantity": 10
        })];
        let prior = [80, 90, 100, 110, 120, 130, 140, 150, 160, 170, 180, 70];
        for (i, revenue) in prior.iter().enumerate() {
            rows.push(json!({
                "month": format!("2023-{:02}", i + 1),
                "revenue": revenue.to_string(),
                "margin": revenue / 5,
                "quantity": 5
            }));
        }
        Value::Array(rows)
    }

    #[test]
    fn test_scenario_january_only() {
        let engine = MetricsEngine::new(reference());
        let metrics = engine
            .compute_from_json(
                &[(MetricDomain::Sales, sales_payload())],
                ForecastPercentage::new(0.0),
            )
            .unwrap();

        let sales = metrics.domain(MetricDomain::Sales).unwrap();
        assert_eq!(sales.current.value(MetricField::Revenue), 100.0);
        assert_eq!(sales.adjusted.value(MetricField::Revenue), 80.0);
        assert_eq!(sales.global.value(MetricField::Revenue), 1500.0);
        assert_eq!(
            sales.evolution.year_over_year["revenue"].to_string(),
            "+25.0%"
        );

        // Forecast = January actual + February..December fallback.
        assert_eq!(sales.forecast.value(MetricField::Revenue), 100.0 + 1500.0 - 80.0);
        assert_eq!(sales.series.len(), 12);
        assert_eq!(sales.series[0].provenance, Provenance::Actual);
        assert!(sales.series[1..]
            .iter()
            .all(|p| p.provenance == Provenance::PriorYearFallback));
    }

    #[test]
    fn test_margin_ratio_uses_aggregated_values() {
        let engine = MetricsEngine::new(reference());
        let metrics = engine
            .compute_from_json(
                &[(MetricDomain::Sales, sales_payload())],
                ForecastPercentage::new(0.0),
            )
            .unwrap();

        let sales = metrics.domain(MetricDomain::Sales).unwrap();
        assert!((sales.current.ratios.margin_percentage - 30.0).abs() < 1e-9);
        assert!((sales.adjusted.ratios.margin_percentage - 20.0).abs() < 1e-9);
        assert!(sales.evolution.year_over_year.contains_key("marginPercentage"));
    }

    #[test]
    fn test_reforecast_only_touches_forecast() {
        let engine = MetricsEngine::new(reference());
        let base = engine
            .compute_from_json(
                &[(MetricDomain::Sales, sales_payload())],
                ForecastPercentage::new(0.0),
            )
            .unwrap();
        let grown = engine.reforecast(&base, ForecastPercentage::new(10.0));

        let before = base.domain(MetricDomain::Sales).unwrap();
        let after = grown.domain(MetricDomain::Sales).unwrap();
        assert_eq!(before.current, after.current);
        assert_eq!(before.adjusted, after.adjusted);
        assert_eq!(before.global, after.global);
        assert_eq!(before.evolution.year_over_year, after.evolution.year_over_year);
        assert!(
            (after.forecast.value(MetricField::Revenue)
                - before.forecast.value(MetricField::Revenue) * 1.1)
                .abs()
                < 1e-9
        );
        assert_eq!(grown.forecast_percentage.value(), 10.0);

        // Same percentage twice gives identical output.
        assert_eq!(grown, engine.reforecast(&grown, ForecastPercentage::new(10.0)));
        assert_eq!(
            engine.reforecast(&grown, ForecastPercentage::new(0.0)),
            base
        );
    }

    #[test]
    fn test_no_prior_year_makes_badges_unavailable() {
        let engine = MetricsEngine::new(reference());
        let payload = json!([{ "month": "2024-01", "revenue": 100 }]);
        let metrics = engine
            .compute_from_json(
                &[(MetricDomain::Sales, payload)],
                ForecastPercentage::new(0.0),
            )
            .unwrap();

        let sales = metrics.domain(MetricDomain::Sales).unwrap();
        assert!(sales
            .evolution
            .year_over_year
            .values()
            .all(|e| *e == Evolution::Unavailable));
        assert!(sales
            .evolution
            .forecast_vs_prior_year
            .values()
            .all(|e| *e == Evolution::Unavailable));
    }

    #[test]
    fn test_cross_domain_months_of_stock() {
        let engine = MetricsEngine::new(ReferenceDate::new(2024, 2).unwrap());
        let sales = json!([
            { "month": "2024-01", "revenue": 600 },
            { "month": "2024-02", "revenue": 600 }
        ]);
        let stock = json!([
            { "month": "2024-01", "stockValue": 200 },
            { "month": "2024-02", "stockValue": 400 }
        ]);

        let metrics = engine
            .compute_from_json(
                &[(MetricDomain::Sales, sales), (MetricDomain::Stock, stock)],
                ForecastPercentage::new(0.0),
            )
            .unwrap();

        let stock = metrics.domain(MetricDomain::Stock).unwrap();
        // Mean stock value 300 against 1200 / 12 = 100 revenue per month.
        assert_eq!(stock.current.value(MetricField::StockValue), 300.0);
        assert!((stock.current.ratios.months_of_stock - 3.0).abs() < 1e-9);
        assert!((stock.current.ratios.stock_value_percentage - 25.0).abs() < 1e-9);
        assert!(stock.evolution.year_over_year.contains_key("monthsOfStock"));
    }

    #[test]
    fn test_cross_domain_badges_need_every_baseline() {
        let engine = MetricsEngine::new(ReferenceDate::new(2024, 1).unwrap());
        let sales = json!([{ "month": "2024-01", "revenue": 1200 }]);
        let stock = json!([
            { "month": "2024-01", "stockValue": 300 },
            { "month": "2023-01", "stockValue": 200 }
        ]);

        let metrics = engine
            .compute_from_json(
                &[(MetricDomain::Sales, sales), (MetricDomain::Stock, stock)],
                ForecastPercentage::new(0.0),
            )
            .unwrap();
        let stock = metrics.domain(MetricDomain::Stock).unwrap();

        assert_eq!(stock.evolution.year_over_year["stockValue"].to_string(), "+50.0%");
        assert_eq!(
            stock.evolution.year_over_year["monthsOfStock"],
            Evolution::Unavailable
        );
        assert_eq!(
            stock.evolution.year_over_year["stockValuePercentage"],
            Evolution::Unavailable
        );
        assert_eq!(
            stock.evolution.forecast_vs_prior_year["monthsOfStock"],
            Evolution::Unavailable
        );
    }

    #[test]
    fn test_ingestion_summary_and_duplicate_reports_merge() {
        let engine = MetricsEngine::new(reference());
        let first = parse_domain_records(
            MetricDomain::StockBreak,
            &json!([{ "month": "2024-01", "breakQuantity": 2, "productsOrdered": 40 }, { "bad": 1 }]),
        )
        .unwrap();
        let second = parse_domain_records(
            MetricDomain::StockBreak,
            &json!([{ "month": "2023-01", "breakQuantity": 1, "productsOrdered": 50 }]),
        )
        .unwrap();

        let metrics = engine.compute(&[first, second], ForecastPercentage::new(0.0));
        let summary = metrics.ingestion[&MetricDomain::StockBreak];
        assert_eq!(summary.accepted, 2);
        assert_eq!(summary.dropped, 1);

        let breaks = metrics.domain(MetricDomain::StockBreak).unwrap();
        assert!((breaks.current.ratios.stock_break_rate - 5.0).abs() < 1e-9);
        assert!((breaks.adjusted.ratios.stock_break_rate - 2.0).abs() < 1e-9);
        assert_eq!(
            breaks.evolution.year_over_year["breakQuantity"].to_string(),
            "+100.0%"
        );
    }

    #[test]
    fn test_serialized_shape() {
        let engine = MetricsEngine::new(reference());
        let metrics = engine
            .compute_from_json(
                &[(MetricDomain::Sales, sales_payload())],
                ForecastPercentage::new(5.0),
            )
            .unwrap();

        let json: Value = serde_json::from_str(&metrics.to_json_pretty().unwrap()).unwrap();
        let sales = &json["domains"]["sales"];
        for window in ["current", "adjusted", "global", "forecast"] {
            assert!(sales[window]["values"]["revenue"].is_number());
            assert!(sales[window]["ratios"]["marginPercentage"].is_number());
        }
        assert_eq!(sales["evolution"]["yearOverYear"]["revenue"], "+25.0%");
        assert_eq!(sales["series"][1]["month"], "2024-02");
        assert_eq!(sales["series"][1]["provenance"], "priorYearFallback");
        assert_eq!(json["forecastPercentage"], 5.0);
        assert_eq!(json["reference"]["currentYear"], 2024);
        assert!(sales.get("totals").is_none());
    }

    #[test]
    fn test_schema_generation() {
        let schema_json = DashboardMetrics::schema_as_json().unwrap();
        assert!(schema_json.contains("forecastPercentage"));
        assert!(schema_json.contains("yearOverYear"));
        assert!(schema_json.contains("priorYearFallback"));
    }
}
