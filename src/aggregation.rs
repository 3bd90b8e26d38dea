use crate::bucket::{YearBucket, YearBuckets};
use crate::month::ReferenceDate;
use crate::schema::{AggregationKind, MetricField, MetricValues, MonthlyRecord};

/// Aggregated values for the three windows a dashboard compares.
///
/// `current` and `comparison` are a like-for-like pair (same elapsed months). `global` is
/// the full prior year and only pairs with a full-year forecast.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PeriodTotals {
    /// Every month present in the current year.
    pub current: MetricValues,
    /// Prior year, months `1..=current_month` only.
    pub comparison: MetricValues,
    /// Prior year, all twelve months.
    pub global: MetricValues,
    /// Number of records that fed each window. Zero means the window has no data at all.
    pub current_months: usize,
    pub comparison_months: usize,
    pub global_months: usize,
}

impl PeriodTotals {
    /// The comparable prior-year window, under the name the dashboard cards use.
    pub fn adjusted(&self) -> &MetricValues {
        &self.comparison
    }
}

/// Sums `Sum` fields and averages `Mean` fields over the given records.
/// An empty input aggregates to all zeros.
pub fn aggregate_records<'a, I>(records: I) -> MetricValues
where
    I: IntoIterator<Item = &'a MonthlyRecord>,
{
    let mut totals = MetricValues::default();
    let mut count = 0usize;

    for record in records {
        totals += record.values;
        count += 1;
    }

    if count > 0 {
        for field in MetricField::ALL {
            if field.aggregation() == AggregationKind::Mean {
                totals.set(field, totals.get(field) / count as f64);
            }
        }
    }

    totals
}

fn aggregate_window(bucket: &YearBucket, last_month: u32) -> (MetricValues, usize) {
    let window = bucket.range(1..=last_month);
    let count = window.clone().count();
    (aggregate_records(window.map(|(_, record)| record)), count)
}

pub fn aggregate_periods(buckets: &YearBuckets, reference: &ReferenceDate) -> PeriodTotals {
    let (comparison, comparison_months) =
        aggregate_window(&buckets.prior, reference.current_month());

    PeriodTotals {
        current: aggregate_records(buckets.current.values()),
        comparison,
        global: aggregate_records(buckets.prior.values()),
        current_months: buckets.current.len(),
        comparison_months,
        global_months: buckets.prior.len(),
    }
}
