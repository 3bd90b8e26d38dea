use crate::schema::{MetricDomain, MetricField, MetricValues};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// `numerator / denominator`, or 0 when the denominator is 0 or the result is not finite.
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    let ratio = numerator / denominator;
    if ratio.is_finite() {
        ratio
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum RatioMetric {
    MarginPercentage,
    StockBreakRate,
    MonthsOfStock,
    StockValuePercentage,
    BreakCostPerUnit,
}

impl RatioMetric {
    pub const ALL: [RatioMetric; 5] = [
        RatioMetric::MarginPercentage,
        RatioMetric::StockBreakRate,
        RatioMetric::MonthsOfStock,
        RatioMetric::StockValuePercentage,
        RatioMetric::BreakCostPerUnit,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            RatioMetric::MarginPercentage => "marginPercentage",
            RatioMetric::StockBreakRate => "stockBreakRate",
            RatioMetric::MonthsOfStock => "monthsOfStock",
            RatioMetric::StockValuePercentage => "stockValuePercentage",
            RatioMetric::BreakCostPerUnit => "breakCostPerUnit",
        }
    }

    /// The domain whose cards carry this ratio's badge.
    pub fn domain(&self) -> MetricDomain {
        match self {
            RatioMetric::MarginPercentage => MetricDomain::Sales,
            RatioMetric::MonthsOfStock | RatioMetric::StockValuePercentage => MetricDomain::Stock,
            RatioMetric::StockBreakRate | RatioMetric::BreakCostPerUnit => MetricDomain::StockBreak,
        }
    }

    pub fn for_domain(domain: MetricDomain) -> impl Iterator<Item = RatioMetric> {
        RatioMetric::ALL
            .into_iter()
            .filter(move |metric| metric.domain() == domain)
    }

    /// Every domain whose fields feed the numerator or denominator.
    pub fn inputs(&self) -> &'static [MetricDomain] {
        match self {
            RatioMetric::MarginPercentage => &[MetricDomain::Sales],
            RatioMetric::MonthsOfStock | RatioMetric::StockValuePercentage => {
                &[MetricDomain::Stock, MetricDomain::Sales]
            }
            RatioMetric::StockBreakRate | RatioMetric::BreakCostPerUnit => {
                &[MetricDomain::StockBreak]
            }
        }
    }
}

/// Ratios derived from aggregated values. Never summed, scaled or averaged themselves.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DerivedRatios {
    #[schemars(description = "margin / revenue * 100")]
    pub margin_percentage: f64,

    #[schemars(description = "breakQuantity / productsOrdered * 100")]
    pub stock_break_rate: f64,

    #[schemars(description = "stockValue / (revenue / 12): stock expressed in months of sales")]
    pub months_of_stock: f64,

    #[schemars(description = "stockValue / revenue * 100")]
    pub stock_value_percentage: f64,

    #[schemars(description = "breakAmount / breakQuantity")]
    pub break_cost_per_unit: f64,
}

impl DerivedRatios {
    pub fn from_values(values: &MetricValues) -> Self {
        let revenue = values.get(MetricField::Revenue);
        let stock_value = values.get(MetricField::StockValue);
        let break_quantity = values.get(MetricField::BreakQuantity);

        Self {
            margin_percentage: safe_ratio(values.get(MetricField::Margin), revenue) * 100.0,
            stock_break_rate: safe_ratio(
                break_quantity,
                values.get(MetricField::ProductsOrdered),
            ) * 100.0,
            months_of_stock: safe_ratio(stock_value, revenue / 12.0),
            stock_value_percentage: safe_ratio(stock_value, revenue) * 100.0,
            break_cost_per_unit: safe_ratio(values.get(MetricField::BreakAmount), break_quantity),
        }
    }

    pub fn get(&self, metric: RatioMetric) -> f64 {
        match metric {
            RatioMetric::MarginPercentage => self.margin_percentage,
            RatioMetric::StockBreakRate => self.stock_break_rate,
            RatioMetric::MonthsOfStock => self.months_of_stock,
            RatioMetric::StockValuePercentage => self.stock_value_percentage,
            RatioMetric::BreakCostPerUnit => self.break_cost_per_unit,
        }
    }
}
