use crate::error::{DashboardError, Result};
use chrono::{Datelike, Local, Months, NaiveDate};
use schemars::gen::SchemaGenerator;
use schemars::schema::Schema;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical `YYYY-MM` identifier. Orders by year, then month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(DashboardError::InvalidMonthKey(format!(
                "{:04}-{:02}",
                year, month
            )));
        }
        Ok(Self { year, month })
    }

    /// Parses `"YYYY-MM"`. A full `"YYYY-MM-DD"` date is accepted and truncated to its month.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DashboardError::InvalidMonthKey(raw.to_string()));
        }

        let date = NaiveDate::parse_from_str(&format!("{}-01", trimmed), "%Y-%m-%d")
            .or_else(|_| NaiveDate::parse_from_str(trimmed, "%Y-%m-%d"))
            .map_err(|_| DashboardError::InvalidMonthKey(raw.to_string()))?;

        Ok(Self {
            year: date.year(),
            month: date.month(),
        })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// Calendar month, 1..=12.
    pub fn month(&self) -> u32 {
        self.month
    }

    /// January through December of `year`, in order.
    pub fn months_of_year(year: i32) -> impl Iterator<Item = MonthKey> {
        (1..=12).map(move |month| MonthKey { year, month })
    }

    /// Same calendar month in another year.
    pub fn with_year(&self, year: i32) -> Self {
        Self {
            year,
            month: self.month,
        }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for MonthKey {
    type Error = DashboardError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<MonthKey> for String {
    fn from(key: MonthKey) -> Self {
        key.to_string()
    }
}

impl JsonSchema for MonthKey {
    fn schema_name() -> String {
        "MonthKey".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        String::json_schema(gen)
    }
}

pub fn first_day_of_month(year: i32, month: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| DashboardError::InvalidMonthKey(format!("{:04}-{:02}", year, month)))
}

pub fn last_day_of_month(year: i32, month: u32) -> Result<NaiveDate> {
    first_day_of_month(year, month)?
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .ok_or_else(|| DashboardError::InvalidMonthKey(format!("{:04}-{:02}", year, month)))
}

/// The injected "now". Every engine call takes one of these instead of reading the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceDate {
    current_year: i32,
    current_month: u32,
}

impl ReferenceDate {
    pub fn new(current_year: i32, current_month: u32) -> Result<Self> {
        if !(1..=12).contains(&current_month) {
            return Err(DashboardError::InvalidReferenceMonth(current_month));
        }
        Ok(Self {
            current_year,
            current_month,
        })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            current_year: date.year(),
            current_month: date.month(),
        }
    }

    /// Reads the local clock. Call this once at the outermost call site.
    pub fn today() -> Self {
        Self::from_date(Local::now().date_naive())
    }

    pub fn current_year(&self) -> i32 {
        self.current_year
    }

    pub fn prior_year(&self) -> i32 {
        self.current_year - 1
    }

    /// Number of elapsed months in the current year, 1..=12.
    pub fn current_month(&self) -> u32 {
        self.current_month
    }
}
