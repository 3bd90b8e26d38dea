use crate::month::MonthKey;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::{Add, AddAssign};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum MetricDomain {
    #[schemars(description = "Sell-out volumes, revenue and margin, plus purchases")]
    Sales,

    #[schemars(description = "Average stock level and stock value")]
    Stock,

    #[schemars(description = "Ordered products versus quantities that could not be delivered")]
    StockBreak,

    #[schemars(description = "Average prices, margins and distribution breadth")]
    Pricing,
}

impl MetricDomain {
    pub const ALL: [MetricDomain; 4] = [
        MetricDomain::Sales,
        MetricDomain::Stock,
        MetricDomain::StockBreak,
        MetricDomain::Pricing,
    ];

    pub fn fields(&self) -> impl Iterator<Item = MetricField> + '_ {
        MetricField::ALL
            .into_iter()
            .filter(move |field| field.domain() == *self)
    }
}

/// How a field combines across months.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationKind {
    /// Flows: the period value is the sum of the monthly values.
    Sum,
    /// Levels and per-month averages: the period value is the mean over months that had a record.
    Mean,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum MetricField {
    Quantity,
    Revenue,
    Margin,
    PurchaseQuantity,
    PurchaseAmount,
    AvgStock,
    StockValue,
    ProductsOrdered,
    BreakQuantity,
    BreakAmount,
    AvgSalePrice,
    AvgPurchasePrice,
    AvgMargin,
    UniqueProductsSold,
    UniquePharmacies,
}

impl MetricField {
    pub const COUNT: usize = 15;

    pub const ALL: [MetricField; MetricField::COUNT] = [
        MetricField::Quantity,
        MetricField::Revenue,
        MetricField::Margin,
        MetricField::PurchaseQuantity,
        MetricField::PurchaseAmount,
        MetricField::AvgStock,
        MetricField::StockValue,
        MetricField::ProductsOrdered,
        MetricField::BreakQuantity,
        MetricField::BreakAmount,
        MetricField::AvgSalePrice,
        MetricField::AvgPurchasePrice,
        MetricField::AvgMargin,
        MetricField::UniqueProductsSold,
        MetricField::UniquePharmacies,
    ];

    /// Key used in raw payloads and serialized output.
    pub fn key(&self) -> &'static str {
        match self {
            MetricField::Quantity => "quantity",
            MetricField::Revenue => "revenue",
            MetricField::Margin => "margin",
            MetricField::PurchaseQuantity => "purchaseQuantity",
            MetricField::PurchaseAmount => "purchaseAmount",
            MetricField::AvgStock => "avgStock",
            MetricField::StockValue => "stockValue",
            MetricField::ProductsOrdered => "productsOrdered",
            MetricField::BreakQuantity => "breakQuantity",
            MetricField::BreakAmount => "breakAmount",
            MetricField::AvgSalePrice => "avgSalePrice",
            MetricField::AvgPurchasePrice => "avgPurchasePrice",
            MetricField::AvgMargin => "avgMargin",
            MetricField::UniqueProductsSold => "uniqueProductsSold",
            MetricField::UniquePharmacies => "uniquePharmacies",
        }
    }

    pub fn domain(&self) -> MetricDomain {
        match self {
            MetricField::Quantity
            | MetricField::Revenue
            | MetricField::Margin
            | MetricField::PurchaseQuantity
            | MetricField::PurchaseAmount => MetricDomain::Sales,
            MetricField::AvgStock | MetricField::StockValue => MetricDomain::Stock,
            MetricField::ProductsOrdered | MetricField::BreakQuantity | MetricField::BreakAmount => {
                MetricDomain::StockBreak
            }
            MetricField::AvgSalePrice
            | MetricField::AvgPurchasePrice
            | MetricField::AvgMargin
            | MetricField::UniqueProductsSold
            | MetricField::UniquePharmacies => MetricDomain::Pricing,
        }
    }

    pub fn aggregation(&self) -> AggregationKind {
        match self.domain() {
            MetricDomain::Sales | MetricDomain::StockBreak => AggregationKind::Sum,
            MetricDomain::Stock | MetricDomain::Pricing => AggregationKind::Mean,
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

/// Dense vector of every numeric field. Fields a domain does not carry stay at zero.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MetricValues([f64; MetricField::COUNT]);

impl MetricValues {
    pub fn get(&self, field: MetricField) -> f64 {
        self.0[field.index()]
    }

    pub fn set(&mut self, field: MetricField, value: f64) {
        self.0[field.index()] = value;
    }

    pub fn with(mut self, field: MetricField, value: f64) -> Self {
        self.set(field, value);
        self
    }

    pub fn scaled(&self, factor: f64) -> Self {
        let mut out = *self;
        for value in out.0.iter_mut() {
            *value *= factor;
        }
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = (MetricField, f64)> + '_ {
        MetricField::ALL.into_iter().map(|field| (field, self.get(field)))
    }

    /// Restricts to one domain's fields, keyed for serialization.
    pub fn domain_map(&self, domain: MetricDomain) -> BTreeMap<MetricField, f64> {
        domain.fields().map(|field| (field, self.get(field))).collect()
    }
}

impl Add for MetricValues {
    type Output = MetricValues;

    fn add(mut self, rhs: MetricValues) -> MetricValues {
        self += rhs;
        self
    }
}

impl AddAssign for MetricValues {
    fn add_assign(&mut self, rhs: MetricValues) {
        for (lhs, rhs) in self.0.iter_mut().zip(rhs.0.iter()) {
            *lhs += rhs;
        }
    }
}

/// Optional `type` tag carried by fetched rows.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum PeriodTag {
    Current,
    Comparison,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyRecord {
    pub month: MonthKey,
    pub domain: MetricDomain,
    pub tag: Option<PeriodTag>,
    pub values: MetricValues,
}

impl MonthlyRecord {
    pub fn new(month: MonthKey, domain: MetricDomain, values: MetricValues) -> Self {
        Self {
            month,
            domain,
            tag: None,
            values,
        }
    }

    /// Zero-valued record for a month with no data at all.
    pub fn empty(month: MonthKey, domain: MetricDomain) -> Self {
        Self::new(month, domain, MetricValues::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum Provenance {
    #[schemars(description = "Observed in the current year's data")]
    Actual,

    #[schemars(description = "Copied from the same month of the prior year, relabeled to the current year")]
    PriorYearFallback,

    #[schemars(description = "No data in either year; zero-filled")]
    Empty,
}
