// Terminal rendering of detection results

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};
use metrisight_anomaly::{AnnotatedPoint, AnnotatedSeries, DetectionMethod, PointDetail, Summary};
use metrisight_source::{ErrorKind, SourceError};
use serde::Serialize;

// machine-readable output for --json
#[derive(Serialize)]
pub struct Report<'a> {
    pub source: &'a str,
    pub method: DetectionMethod,
    pub summary: &'a Summary,
    pub points: &'a [AnnotatedPoint],
}

pub fn print_header(title: &str, source: &str) {
    println!("\n{} {}", title.cyan().bold(), source.dimmed());
    println!("{}", "─".repeat(60).dimmed());
}

pub fn print_summary(summary: &Summary, method: &DetectionMethod) {
    let parameters = match method {
        DetectionMethod::ZScore { threshold } => format!("threshold={}", threshold),
        DetectionMethod::MovingAverage { window, threshold } => {
            format!("window={} threshold={}", window, threshold)
        }
    };
    println!("  {} {} ({})", "Method:".dimmed(), method.name().cyan(), parameters);
    println!(
        "  {} {} → {}",
        "Range:".dimmed(),
        summary.time_range_start.format("%Y-%m-%d %H:%M:%S"),
        summary.time_range_end.format("%Y-%m-%d %H:%M:%S")
    );
    println!("  {} {}", "Points:".dimmed(), summary.total_points);
    println!("  {} {:.2} ± {:.2}", "Mean:".dimmed(), summary.mean, summary.std);
    if let Some(z) = summary.max_z_score {
        println!("  {} {:.2}", "Max |z|:".dimmed(), z);
    }

    let count = format!("{} ({:.2}%)", summary.anomaly_count, summary.anomaly_pct);
    let count = if summary.anomaly_count == 0 {
        count.green()
    } else {
        count.red().bold()
    };
    println!("  {} {}", "Anomalies:".dimmed(), count);
}

pub fn print_anomalies(annotated: &AnnotatedSeries, limit: usize) {
    let flagged: Vec<&AnnotatedPoint> = annotated.anomalies().collect();
    if flagged.is_empty() {
        println!("\n  {} No anomalies detected", "✓".green());
        return;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Time", "Value", "Lower", "Upper", "Detail"]);

    for p in flagged.iter().take(limit) {
        let detail = match p.detail {
            PointDetail::ZScore { z_score } => format!("z={:.2}", z_score),
            PointDetail::MovingAverage {
                rolling_mean: Some(mean),
                ..
            } => format!("mean={:.2}", mean),
            PointDetail::MovingAverage { .. } => "warming up".to_string(),
        };
        let direction = if p.value > p.upper_bound {
            format!("{:.2}", p.value).red().to_string()
        } else {
            format!("{:.2}", p.value).yellow().to_string()
        };
        table.add_row(vec![
            p.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            direction,
            format!("{:.2}", p.lower_bound),
            format!("{:.2}", p.upper_bound),
            detail,
        ]);
    }

    println!("\n{table}");
    if flagged.len() > limit {
        println!(
            "  {} {} more not shown",
            "…".dimmed(),
            (flagged.len() - limit).to_string().yellow()
        );
    }
}

pub fn print_json(report: &Report<'_>) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

/// What the user should do about a remote failure.
pub fn guidance(err: &SourceError) -> &'static str {
    match err.kind() {
        ErrorKind::EmptyResult => {
            "No data yet: the query matched no samples in this range. Check the metric name or widen --lookback-hours."
        }
        ErrorKind::Network => {
            "Cannot reach the metrics source. Check the URL and that Prometheus is running."
        }
        ErrorKind::Auth => {
            "Bad credentials. Check --token or --user/--password (or the METRISIGHT_* environment variables)."
        }
        ErrorKind::Query => "The source rejected the query. Check the PromQL expression.",
        ErrorKind::InvalidData => "The source returned data that could not be decoded.",
        ErrorKind::InvalidArgument => "Check the command arguments.",
    }
}

pub fn print_error(err: &(dyn std::error::Error + 'static)) {
    eprintln!("{} {}", "Error:".red().bold(), err);
    if let Some(source_err) = err.downcast_ref::<SourceError>() {
        eprintln!("  {} {}", "→".dimmed(), guidance(source_err));
    }
}
