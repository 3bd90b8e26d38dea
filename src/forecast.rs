use crate::aggregation::aggregate_records;
use crate::gap_fill::ForecastSeries;
use crate::ratios::DerivedRatios;
use crate::schema::MetricValues;
use schemars::gen::SchemaGenerator;
use schemars::schema::Schema;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// User-controlled growth, clamped to [-100, 100]. NaN is treated as 0.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct ForecastPercentage(f64);

impl ForecastPercentage {
    pub const MIN: f64 = -100.0;
    pub const MAX: f64 = 100.0;

    pub fn new(percentage: f64) -> Self {
        if percentage.is_nan() {
            return Self(0.0);
        }
        Self(percentage.clamp(Self::MIN, Self::MAX))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Multiplier applied to every projected field: `1 + p / 100`.
    pub fn factor(&self) -> f64 {
        1.0 + self.0 / 100.0
    }
}

impl From<f64> for ForecastPercentage {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl From<ForecastPercentage> for f64 {
    fn from(value: ForecastPercentage) -> Self {
        value.0
    }
}

impl JsonSchema for ForecastPercentage {
    fn schema_name() -> String {
        "ForecastPercentage".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        f64::json_schema(gen)
    }
}

/// Full-year projection for one series at one percentage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastState {
    pub percentage: ForecastPercentage,
    /// Aggregate of the gap-filled series before growth is applied.
    pub raw_totals: MetricValues,
    pub projected_totals: MetricValues,
}

impl ForecastState {
    /// Ratios from the projected values, never from scaled ratios.
    pub fn ratios(&self) -> DerivedRatios {
        DerivedRatios::from_values(&self.projected_totals)
    }
}

/// Aggregate of the series: sums over all twelve months, means over populated months.
pub fn raw_totals(series: &ForecastSeries) -> MetricValues {
    aggregate_records(series.populated().map(|entry| &entry.record))
}

/// Pure: the same `(series, percentage)` always yields the same state.
pub fn project(series: &ForecastSeries, percentage: ForecastPercentage) -> ForecastState {
    let raw = raw_totals(series);
    ForecastState {
        percentage,
        raw_totals: raw,
        projected_totals: raw.scaled(percentage.factor()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::bucketize;
    use crate::gap_fill::fill_gaps;
    use crate::month::{MonthKey, ReferenceDate};
    use crate::schema::{MetricDomain, MetricField, MonthlyRecord};

    fn break_record(year: i32, month: u32, ordered: f64, broken: f64) -> MonthlyRecord {
        MonthlyRecord::new(
            MonthKey::new(year, month).unwrap(),
            MetricDomain::StockBreak,
            MetricValues::default()
                .with(MetricField::ProductsOrdered, ordered)
                .with(MetricField::BreakQuantity, broken)
                .with(MetricField::BreakAmount, broken * 3.0),
        )
    }

    fn series() -> ForecastSeries {
        let reference = ReferenceDate::new(2024, 1).unwrap();
        let mut records = vec![break_record(2024, 1, 100.0, 10.0)];
        records.extend((2..=12).map(|m| break_record(2023, m, 50.0, 2.0)));
        fill_gaps(&bucketize(&records, &reference), &reference, MetricDomain::StockBreak)
    }

    #[test]
    fn test_percentage_clamping() {
        assert_eq!(ForecastPercentage::new(150.0).value(), 100.0);
        assert_eq!(ForecastPercentage::new(-250.0).value(), -100.0);
        assert_eq!(ForecastPercentage::new(f64::NAN).value(), 0.0);
        assert_eq!(ForecastPercentage::new(12.5).value(), 12.5);
        assert_eq!(ForecastPercentage::new(10.0).factor(), 1.1);

        let parsed: ForecastPercentage = serde_json::from_str("400").unwrap();
        assert_eq!(parsed.value(), 100.0);
    }

    #[test]
    fn test_zero_percentage_equals_raw_totals() {
        let state = project(&series(), ForecastPercentage::new(0.0));
        assert_eq!(state.projected_totals, state.raw_totals);
        assert_eq!(state.raw_totals.get(MetricField::ProductsOrdered), 100.0 + 11.0 * 50.0);
    }

    #[test]
    fn test_projection_is_idempotent() {
        let series = series();
        let p = ForecastPercentage::new(7.3);
        assert_eq!(project(&series, p), project(&series, p));
    }

    #[test]
    fn test_ratio_recomputed_from_projected_totals() {
        let state = project(&series(), ForecastPercentage::new(10.0));

        let ordered = (100.0 + 550.0) * 1.1;
        let broken = (10.0 + 22.0) * 1.1;
        assert!((state.projected_totals.get(MetricField::ProductsOrdered) - ordered).abs() < 1e-9);
        assert!((state.projected_totals.get(MetricField::BreakQuantity) - broken).abs() < 1e-9);

        let ratios = state.ratios();
        let expected = state.projected_totals.get(MetricField::BreakQuantity)
            / state.projected_totals.get(MetricField::ProductsOrdered)
            * 100.0;
        assert!((ratios.stock_break_rate - expected).abs() < 1e-9);

        let raw_rate = DerivedRatios::from_values(&state.raw_totals).stock_break_rate;
        assert!((ratios.stock_break_rate - raw_rate * 1.1).abs() > 1e-6);
    }

    #[test]
    fn test_minus_hundred_zeroes_everything() {
        let state = project(&series(), ForecastPercentage::new(-100.0));
        assert_eq!(state.projected_totals.get(MetricField::BreakQuantity), 0.0);
        assert_eq!(state.ratios(), DerivedRatios::default());
    }
}
