use crate::bucket::YearBuckets;
use crate::month::{MonthKey, ReferenceDate};
use crate::schema::{MetricDomain, MonthlyRecord, Provenance};
use log::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesEntry {
    pub record: MonthlyRecord,
    pub provenance: Provenance,
}

/// Twelve entries, January to December of the current year. Only [`fill_gaps`] builds one,
/// so the length and ordering always hold.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastSeries {
    domain: MetricDomain,
    entries: Vec<SeriesEntry>,
}

impl ForecastSeries {
    pub fn domain(&self) -> MetricDomain {
        self.domain
    }

    pub fn entries(&self) -> &[SeriesEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, provenance: Provenance) -> usize {
        self.entries
            .iter()
            .filter(|e| e.provenance == provenance)
            .count()
    }

    /// Entries that carry data (actual or fallback); zero-filled months are excluded.
    pub fn populated(&self) -> impl Iterator<Item = &SeriesEntry> {
        self.entries
            .iter()
            .filter(|e| e.provenance != Provenance::Empty)
    }
}

/// Builds the current-year series used as forecast input.
///
/// Each month takes the current-year record if present, else the prior-year record relabeled
/// to the current year with its values untouched, else a zero record.
pub fn fill_gaps(
    buckets: &YearBuckets,
    reference: &ReferenceDate,
    domain: MetricDomain,
) -> ForecastSeries {
    let entries: Vec<SeriesEntry> = MonthKey::months_of_year(reference.current_year())
        .map(|key| {
            if let Some(actual) = buckets.current.get(&key.month()) {
                SeriesEntry {
                    record: actual.clone(),
                    provenance: Provenance::Actual,
                }
            } else if let Some(prior) = buckets.prior.get(&key.month()) {
                let mut relabeled = prior.clone();
                relabeled.month = key;
                SeriesEntry {
                    record: relabeled,
                    provenance: Provenance::PriorYearFallback,
                }
            } else {
                SeriesEntry {
                    record: MonthlyRecord::empty(key, domain),
                    provenance: Provenance::Empty,
                }
            }
        })
        .collect();

    let series = ForecastSeries { domain, entries };
    debug!(
        "{:?} forecast series: {} actual, {} fallback, {} empty",
        domain,
        series.count(Provenance::Actual),
        series.count(Provenance::PriorYearFallback),
        series.count(Provenance::Empty)
    );
    series
}
