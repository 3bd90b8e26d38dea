use crate::month::ReferenceDate;
use crate::schema::{MonthlyRecord, PeriodTag};
use log::{debug, warn};
use std::collections::BTreeMap;

/// One calendar year of a single domain, keyed by month number (1..=12).
pub type YearBucket = BTreeMap<u32, MonthlyRecord>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct YearBuckets {
    pub current: YearBucket,
    pub prior: YearBucket,
}

/// Partitions one domain's records into current-year and prior-year buckets.
///
/// Records from any other year are discarded. If a month appears twice, the later
/// record replaces the earlier one.
pub fn bucketize(records: &[MonthlyRecord], reference: &ReferenceDate) -> YearBuckets {
    let mut buckets = YearBuckets::default();
    let mut out_of_window = 0usize;

    for record in records {
        let year = record.month.year();
        let (bucket, expected_tag) = if year == reference.current_year() {
            (&mut buckets.current, PeriodTag::Current)
        } else if year == reference.prior_year() {
            (&mut buckets.prior, PeriodTag::Comparison)
        } else {
            out_of_window += 1;
            continue;
        };

        if let Some(tag) = record.tag {
            if tag != expected_tag {
                debug!(
                    "{:?} record for {} is tagged {:?}; using its month's year",
                    record.domain, record.month, tag
                );
            }
        }

        if bucket
            .insert(record.month.month(), record.clone())
            .is_some()
        {
            warn!(
                "Duplicate {:?} record for {}; keeping the later one",
                record.domain, record.month
            );
        }
    }

    if out_of_window > 0 {
        debug!(
            "Discarded {} records outside {}..={}",
            out_of_window,
            reference.prior_year(),
            reference.current_year()
        );
    }

    buckets
}
