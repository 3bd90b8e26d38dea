use crate::error::{DashboardError, Result};
use crate::month::{first_day_of_month, last_day_of_month, ReferenceDate};
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(DashboardError::InvalidDateRange(format!(
                "end {} is before start {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Active filter selection sent with every fetch. Empty sets mean "no restriction".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FilterSelection {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub distributors: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[schemars(description = "Laboratory / brand identifiers")]
    pub brands: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub universes: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub families: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub specificities: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pharmacies: Vec<String>,

    pub date_range: DateRange,

    #[schemars(description = "Prior-year window; covers the full prior year so forecasts can fall back on it")]
    pub comparison_date_range: DateRange,
}

impl FilterSelection {
    /// Current range is January 1 through the end of the reference month. The comparison
    /// range is the whole prior year, since gap filling and the global baseline need every
    /// prior-year month.
    pub fn for_reference(reference: &ReferenceDate) -> Result<Self> {
        let current_year = reference.current_year();
        let prior_year = reference.prior_year();

        Ok(Self {
            distributors: Vec::new(),
            brands: Vec::new(),
            universes: Vec::new(),
            categories: Vec::new(),
            families: Vec::new(),
            specificities: Vec::new(),
            pharmacies: Vec::new(),
            date_range: DateRange::new(
                first_day_of_month(current_year, 1)?,
                last_day_of_month(current_year, reference.current_month())?,
            )?,
            comparison_date_range: DateRange::new(
                first_day_of_month(prior_year, 1)?,
                last_day_of_month(prior_year, 12)?,
            )?,
        })
    }

    pub fn with_brands<I, S>(mut self, brands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.brands = brands.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_distributors<I, S>(mut self, distributors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.distributors = distributors.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_pharmacies<I, S>(mut self, pharmacies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pharmacies = pharmacies.into_iter().map(Into::into).collect();
        self
    }
}
