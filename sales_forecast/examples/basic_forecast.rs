use chrono::{Datelike, Duration, NaiveDate};
use sales_forecast::{ForecastPipeline, PipelineConfig};
use std::io::Write;
use std::path::PathBuf;

const CATEGORIES: [&str; 3] = ["Furniture", "Office Supplies", "Technology"];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Sales Forecast: Basic Pipeline Example");
    println!("======================================\n");

    // Use a CSV given on the command line, or write a sample one
    let sample_dir = tempfile::tempdir()?;
    let input = match std::env::args().nth(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let path = sample_dir.path().join("sales.csv");
            write_sample_csv(&path)?;
            println!("No input given, wrote sample data to {}\n", path.display());
            path
        }
    };

    let config = PipelineConfig {
        forecast_horizon: 30,
        ..PipelineConfig::default()
    };
    let report = ForecastPipeline::new(config)?.run_csv(&input)?;

    println!("{}", report.quality);
    println!(
        "Series: {} days from {} to {}\n",
        report.series.len(),
        report.series.first_date(),
        report.series.last_date()
    );
    println!("{}", report.comparison);

    println!("Forecast with {} (first 7 days):", report.forecast_model);
    let dates = report.forecast.dates().unwrap_or(&[]);
    for (date, value) in dates.iter().zip(report.forecast.values()).take(7) {
        println!("  {}: {:.2}", date, value);
    }

    if let Some(importance) = &report.feature_importance {
        println!("\nTop random forest features:");
        for (name, weight) in importance.iter().take(5) {
            println!("  {:<20} {:.3}", name, weight);
        }
    }

    let out = sample_dir.path().join("output");
    report.write_tables(&out)?;
    println!("\nTables written to {}", out.display());

    Ok(())
}

/// Half a year of orders with a weekly rhythm and a slow upward trend
fn write_sample_csv(path: &std::path::Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut file = std::fs::File::create(path)?;
    writeln!(file, "Order Date,Category,Region,Sales")?;

    let start = NaiveDate::from_ymd_opt(2023, 1, 1).ok_or("invalid start date")?;
    for day in 0..180 {
        let date = start + Duration::days(day);
        let weekend = date.weekday().number_from_monday() >= 6;
        let base = 80.0 + day as f64 * 0.25 + if weekend { 40.0 } else { 0.0 };

        for (i, category) in CATEGORIES.iter().enumerate() {
            let sales = base * (1.0 + i as f64 * 0.5) + ((day * 7 + i as i64) % 11) as f64;
            writeln!(
                file,
                "{},{},West,{:.2}",
                date.format("%m/%d/%Y"),
                category,
                sales
            )?;
        }
    }

    Ok(())
}
