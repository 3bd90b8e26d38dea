use crate::error::{DashboardError, Result};
use crate::month::MonthKey;
use crate::schema::{MetricDomain, MetricValues, MonthlyRecord, PeriodTag};
use log::{debug, warn};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Numbers pass through, numeric strings are parsed, anything else is 0.
pub fn coerce_number(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(Value::Bool(_)) | Some(Value::Null) | Some(Value::Array(_)) | Some(Value::Object(_)) => {
            None
        }
        None => None,
    };

    match parsed {
        Some(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    NotAnObject,
    MissingMonth,
    UnparseableMonth(String),
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DropReason::NotAnObject => write!(f, "row is not an object"),
            DropReason::MissingMonth => write!(f, "missing month"),
            DropReason::UnparseableMonth(raw) => write!(f, "unparseable month '{}'", raw),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DroppedRecord {
    /// Position of the row in the payload array.
    pub index: usize,
    pub domain: MetricDomain,
    pub reason: DropReason,
}

#[derive(Debug, Clone)]
pub struct IngestionReport {
    pub domain: MetricDomain,
    pub records: Vec<MonthlyRecord>,
    pub dropped: Vec<DroppedRecord>,
}

impl IngestionReport {
    pub fn summary(&self) -> IngestionSummary {
        IngestionSummary {
            accepted: self.records.len(),
            dropped: self.dropped.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngestionSummary {
    pub accepted: usize,
    pub dropped: usize,
}

/// Accepts either a bare array of rows or an object wrapping one under `data` or `records`.
pub fn parse_domain_records(domain: MetricDomain, payload: &Value) -> Result<IngestionReport> {
    let rows = match payload {
        Value::Array(rows) => rows,
        Value::Object(obj) => obj
            .get("data")
            .or_else(|| obj.get("records"))
            .and_then(Value::as_array)
            .ok_or_else(|| {
                DashboardError::InvalidPayload(format!(
                    "{:?} payload object has no 'data' or 'records' array",
                    domain
                ))
            })?,
        _ => {
            return Err(DashboardError::InvalidPayload(format!(
                "{:?} payload must be an array of records",
                domain
            )))
        }
    };

    let mut records = Vec::with_capacity(rows.len());
    let mut dropped = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        match parse_row(domain, row) {
            Ok(record) => records.push(record),
            Err(reason) => {
                warn!(
                    "Dropping {:?} record #{}: {}",
                    domain, index, reason
                );
                dropped.push(DroppedRecord {
                    index,
                    domain,
                    reason,
                });
            }
        }
    }

    debug!(
        "Ingested {} {:?} records ({} dropped)",
        records.len(),
        domain,
        dropped.len()
    );

    Ok(IngestionReport {
        domain,
        records,
        dropped,
    })
}

pub fn parse_domain_json(domain: MetricDomain, raw: &str) -> Result<IngestionReport> {
    let payload: Value = serde_json::from_str(raw)?;
    parse_domain_records(domain, &payload)
}

fn parse_row(domain: MetricDomain, row: &Value) -> std::result::Result<MonthlyRecord, DropReason> {
    let obj = row.as_object().ok_or(DropReason::NotAnObject)?;

    let raw_month = match obj.get("month") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => return Err(DropReason::MissingMonth),
        Some(other) => other.to_string(),
    };
    let month =
        MonthKey::parse(&raw_month).map_err(|_| DropReason::UnparseableMonth(raw_month.clone()))?;

    let mut values = MetricValues::default();
    for field in domain.fields() {
        values.set(field, coerce_number(obj.get(field.key())));
    }

    let tag = obj
        .get("type")
        .and_then(Value::as_str)
        .and_then(|t| match t.trim().to_ascii_lowercase().as_str() {
            "current" => Some(PeriodTag::Current),
            "comparison" => Some(PeriodTag::Comparison),
            _ => None,
        });

    Ok(MonthlyRecord {
        month,
        domain,
        tag,
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::MetricField;
    use serde_json::json;

    #[test]
    fn test_coerce_number() {
        assert_eq!(coerce_number(Some(&json!(12.5))), 12.5);
        assert_eq!(coerce_number(Some(&json!("42"))), 42.0);
        assert_eq!(coerce_number(Some(&json!(" 3.25 "))), 3.25);
        assert_eq!(coerce_number(Some(&json!(""))), 0.0);
        assert_eq!(coerce_number(Some(&json!("abc"))), 0.0);
        assert_eq!(coerce_number(Some(&json!("NaN"))), 0.0);
        assert_eq!(coerce_number(Some(&json!("inf"))), 0.0);
        assert_eq!(coerce_number(Some(&json!(null))), 0.0);
        assert_eq!(coerce_number(Some(&json!(true))), 0.0);
        assert_eq!(coerce_number(None), 0.0);
    }

    #[test]
    fn test_parse_sales_rows_with_string_numbers() {
        let payload = json!([
            { "month": "2024-01", "quantity": "10", "revenue": "1500.50", "margin": 300, "type": "current" },
            { "month": "2023-01", "quantity": 8, "revenue": "", "margin": "n/a", "type": "comparison" }
        ]);

        let report = parse_domain_records(MetricDomain::Sales, &payload).unwrap();
        assert_eq!(report.records.len(), 2);
        assert!(report.dropped.is_empty());

        let first = &report.records[0];
        assert_eq!(first.month.to_string(), "2024-01");
        assert_eq!(first.tag, Some(PeriodTag::Current));
        assert_eq!(first.values.get(MetricField::Quantity), 10.0);
        assert_eq!(first.values.get(MetricField::Revenue), 1500.5);
        assert_eq!(first.values.get(MetricField::Margin), 300.0);

        let second = &report.records[1];
        assert_eq!(second.tag, Some(PeriodTag::Comparison));
        assert_eq!(second.values.get(MetricField::Revenue), 0.0);
        assert_eq!(second.values.get(MetricField::Margin), 0.0);
    }

    #[test]
    fn test_fields_outside_domain_are_ignored() {
        let payload = json!([{ "month": "2024-02", "stockValue": 900, "revenue": 100 }]);
        let report = parse_domain_records(MetricDomain::Stock, &payload).unwrap();
        let values = report.records[0].values;
        assert_eq!(values.get(MetricField::StockValue), 900.0);
        assert_eq!(values.get(MetricField::Revenue), 0.0);
    }

    #[test]
    fn test_malformed_rows_are_dropped_and_reported() {
        let payload = json!([
            { "month": "2024-01", "revenue": 1 },
            { "revenue": 2 },
            { "month": "not-a-month", "revenue": 3 },
            "garbage",
            { "month": null, "revenue": 4 }
        ]);

        let report = parse_domain_records(MetricDomain::Sales, &payload).unwrap();
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.dropped.len(), 4);
        assert_eq!(report.dropped[0].index, 1);
        assert_eq!(report.dropped[0].reason, DropReason::MissingMonth);
        assert_eq!(
            report.dropped[1].reason,
            DropReason::UnparseableMonth("not-a-month".to_string())
        );
        assert_eq!(report.dropped[2].reason, DropReason::NotAnObject);
        assert_eq!(report.dropped[3].reason, DropReason::MissingMonth);

        let summary = report.summary();
        assert_eq!(summary.accepted, 1);
        assert_eq!(summary.dropped, 4);
    }

    #[test]
    fn test_wrapped_payload() {
        let payload = json!({ "data": [{ "month": "2024-03", "breakQuantity": "5" }] });
        let report = parse_domain_records(MetricDomain::StockBreak, &payload).unwrap();
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].values.get(MetricField::BreakQuantity), 5.0);

        let payload = json!({ "records": [] });
        assert!(parse_domain_records(MetricDomain::StockBreak, &payload).is_ok());
    }

    #[test]
    fn test_invalid_payload_shape() {
        assert!(parse_domain_records(MetricDomain::Sales, &json!("nope")).is_err());
        assert!(parse_domain_records(MetricDomain::Sales, &json!({ "rows": [] })).is_err());
        assert!(parse_domain_json(MetricDomain::Sales, "{ not json").is_err());
    }
}
