use pharma_dashboard_metrics::*;
use serde_json::{json, Value};

fn sales_payload() -> Value {
    let mut rows = vec![
        json!({ "month": "2024-01", "type": "current", "revenue": 12_400, "margin": 3_100, "quantity": 820 }),
        json!({ "month": "2024-02", "type": "current", "revenue": 11_900, "margin": 2_950, "quantity": 790 }),
        json!({ "month": "2024-03", "type": "current", "revenue": 13_250, "margin": 3_400, "quantity": 870 }),
    ];
    let prior = [
        10_800, 10_200, 11_500, 11_900, 12_300, 12_100, 9_800, 8_900, 12_700, 13_100, 13_600, 14_200,
    ];
    for (i, revenue) in prior.iter().enumerate() {
        rows.push(json!({
            "month": format!("2023-{:02}", i + 1),
            "type": "comparison",
            "revenue": revenue,
            "margin": revenue / 4,
            "quantity": revenue / 15
        }));
    }
    Value::Array(rows)
}

fn stock_payload() -> Value {
    json!([
        { "month": "2024-01", "avgStock": 1_450, "stockValue": 21_000 },
        { "month": "2024-02", "avgStock": 1_380, "stockValue": 19_800 },
        { "month": "2024-03", "avgStock": 1_510, "stockValue": 22_300 },
        { "month": "2023-01", "avgStock": 1_300, "stockValue": 18_500 },
        { "month": "2023-02", "avgStock": 1_280, "stockValue": 18_100 },
        { "month": "2023-03", "avgStock": 1_350, "stockValue": 19_200 }
    ])
}

fn stock_break_payload() -> Value {
    json!({
        "data": [
            { "month": "2024-01", "productsOrdered": 640, "breakQuantity": 32, "breakAmount": 480 },
            { "month": "2024-02", "productsOrdered": 610, "breakQuantity": 45, "breakAmount": 690 },
            { "month": "2024-03", "productsOrdered": "not a number", "breakQuantity": 20 },
            { "month": "March", "productsOrdered": 1 },
            { "month": "2023-01", "productsOrdered": 600, "breakQuantity": 40, "breakAmount": 560 }
        ]
    })
}

fn print_domain(metrics: &DashboardMetrics, domain: MetricDomain) {
    let Some(d) = metrics.domain(domain) else {
        return;
    };
    println!("\n== {:?} ==", domain);
    for field in domain.fields() {
        let key = field.key();
        println!(
            "  {:<20} current {:>12.2}  adjusted {:>12.2}  forecast {:>12.2}  yoy {:>8}  fcst/py {:>8}",
            key,
            d.current.value(field),
            d.adjusted.value(field),
            d.forecast.value(field),
            d.evolution.year_over_year[key],
            d.evolution.forecast_vs_prior_year[key],
        );
    }
    for ratio in RatioMetric::for_domain(domain) {
        println!(
            "  {:<20} current {:>12.2}  adjusted {:>12.2}  forecast {:>12.2}",
            ratio.key(),
            d.current.ratios.get(ratio),
            d.adjusted.ratios.get(ratio),
            d.forecast.ratios.get(ratio),
        );
    }
}

fn main() -> Result<()> {
    let config = DashboardConfig::from_json_str(
        r#"{ "referenceDate": "2024-03-18", "forecastPercentage": 5 }"#,
    )?;
    let filters = FilterSelection::for_reference(&config.reference())?.with_brands(["LAB-014"]);
    println!("Request filters:\n{}", serde_json::to_string_pretty(&filters)?);

    let payloads = vec![
        (MetricDomain::Sales, sales_payload()),
        (MetricDomain::Stock, stock_payload()),
        (MetricDomain::StockBreak, stock_break_payload()),
    ];

    let mut view = MetricsView::new(config.engine(), config.forecast_percentage());
    let token = view.begin_request();
    view.complete_success(token, compute_dashboard(&config, &payloads)?);

    if let Some(metrics) = view.metrics() {
        println!("\nForecast at {:+}%", metrics.forecast_percentage.value());
        for domain in MetricDomain::ALL {
            print_domain(metrics, domain);
        }
        for (domain, summary) in &metrics.ingestion {
            println!("{:?}: {} accepted, {} dropped", domain, summary.accepted, summary.dropped);
        }
    }

    view.set_forecast_percentage(-15.0);
    if let Some(metrics) = view.metrics() {
        println!("\nForecast at {:+}%", metrics.forecast_percentage.value());
        print_domain(metrics, MetricDomain::Sales);
    }

    Ok(())
}
