// Live refresh loop: query, detect, print, repeat

use std::time::Duration;

use chrono::Utc;
use colored::Colorize;
use metrisight_anomaly::{summarize, AnnotatedSeries, DetectionMethod, Summary};
use metrisight_source::{PrometheusClient, SourceConfig};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::config::MetrisightConfig;
use crate::output;

pub struct Watcher {
    source: SourceConfig,
    detection: DetectionMethod,
    refresh: Duration,
    client: PrometheusClient,
}

impl Watcher {
    pub fn new(config: MetrisightConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let source = config
            .source
            .ok_or("watch needs a [source] section in the config file")?;
        if config.refresh_interval_seconds == 0 {
            return Err("refresh_interval_seconds must be greater than 0".into());
        }
        let client = PrometheusClient::new().with_retry_policy(source.retry);
        Ok(Self {
            source,
            detection: config.detection,
            refresh: Duration::from_secs(config.refresh_interval_seconds),
            client,
        })
    }

    // one refresh: fetch the lookback window and run detection over it
    pub async fn check_once(
        &self,
    ) -> Result<(AnnotatedSeries, Summary), Box<dyn std::error::Error>> {
        let spec = self.source.to_query_spec()?;
        let series = self.client.query_range(&spec).await?;
        let annotated = self.detection.detect(&series)?;
        let summary = summarize(&annotated)?;
        Ok((annotated, summary))
    }

    /// Run until `max_iterations` refreshes have happened, or forever.
    pub async fn run(&self, max_iterations: Option<u64>) -> Result<(), Box<dyn std::error::Error>> {
        let mut ticker = interval(self.refresh);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            query = %self.source.query,
            interval_secs = self.refresh.as_secs(),
            method = self.detection.name(),
            "Starting watch loop"
        );
        println!(
            "{} {} every {}s {}",
            "Watching".cyan().bold(),
            self.source.query,
            self.refresh.as_secs(),
            "(Ctrl+C to stop)".dimmed()
        );

        let mut iteration = 0;
        loop {
            ticker.tick().await;
            iteration += 1;

            let now = Utc::now().format("%H:%M:%S").to_string();
            match self.check_once().await {
                Ok((annotated, summary)) => {
                    let marker = if summary.anomaly_count > 0 {
                        format!("{} anomalies", summary.anomaly_count).red().bold()
                    } else {
                        "ok".green()
                    };
                    println!(
                        "{} {} points={} mean={:.2} std={:.2} pct={:.2}%",
                        now.dimmed(),
                        marker,
                        summary.total_points,
                        summary.mean,
                        summary.std,
                        summary.anomaly_pct
                    );
                    if let Some(latest) = annotated.anomalies().last() {
                        println!(
                            "         latest at {} value={:.2}",
                            latest.timestamp.format("%H:%M:%S"),
                            latest.value
                        );
                    }
                }
                Err(e) => {
                    // keep watching, the source may come back
                    warn!(error = %e, "Refresh failed");
                    output::print_error(e.as_ref());
                }
            }

            if max_iterations.is_some_and(|max| iteration >= max) {
                return Ok(());
            }
        }
    }
}
