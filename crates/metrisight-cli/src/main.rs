// MetriSight CLI - anomaly detection for time-series metrics

mod config;
mod output;
mod simulate;
mod watch;

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use metrisight_anomaly::config::{DEFAULT_MOVING_AVG_THRESHOLD, DEFAULT_WINDOW, DEFAULT_ZSCORE_THRESHOLD};
use metrisight_anomaly::{summarize, DetectionMethod};
use metrisight_core::Series;
use metrisight_source::{Auth, PrometheusClient, SourceConfig};
use tracing_subscriber::EnvFilter;

use crate::config::{load_config, MetrisightConfig};
use crate::output::Report;
use crate::simulate::{MetricKind, SimulationConfig};
use crate::watch::Watcher;

#[derive(Parser)]
#[command(name = "metrisight")]
#[command(version)]
#[command(about = "Time-series anomaly detection for Prometheus metrics", long_about = None)]
struct Cli {
    /// TOML file with source and detection defaults
    #[arg(short, long, global = true, env = "METRISIGHT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect anomalies in a CSV file or simulated data
    Detect {
        #[command(flatten)]
        input: InputArgs,

        /// Hours of simulated data
        #[arg(long, default_value = "24")]
        hours: f64,

        /// Seed for simulated data
        #[arg(long)]
        seed: Option<u64>,

        #[command(flatten)]
        detection: DetectionArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Query a Prometheus server and detect anomalies
    Query {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        detection: DetectionArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Check that a Prometheus server is reachable
    Check {
        /// Prometheus base URL
        #[arg(long)]
        url: Option<String>,

        #[command(flatten)]
        auth: AuthArgs,

        /// Probe timeout in seconds
        #[arg(long, default_value = "5")]
        timeout: u64,
    },

    /// Write simulated metrics to CSV
    Simulate {
        #[arg(short, long, value_enum, default_value = "cpu")]
        metric: MetricKind,

        /// Hours of data to generate
        #[arg(long, default_value = "24")]
        hours: f64,

        /// Seconds between points
        #[arg(short, long, default_value = "60")]
        interval: u64,

        #[arg(long)]
        seed: Option<u64>,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Re-run a live query on an interval (needs --config with a [source] section)
    Watch {
        /// Stop after this many refreshes
        #[arg(long)]
        count: Option<u64>,
    },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct InputArgs {
    /// CSV file with `timestamp` and `value` columns
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Generate a simulated metric instead of reading a file
    #[arg(long, value_enum)]
    simulate: Option<MetricKind>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum MethodArg {
    Zscore,
    MovingAvg,
}

#[derive(Args)]
struct DetectionArgs {
    /// Detection method (default from config, else zscore)
    #[arg(long, value_enum)]
    method: Option<MethodArg>,

    /// Band width in standard deviations
    #[arg(short, long)]
    threshold: Option<f64>,

    /// Rolling window size for moving-avg
    #[arg(short, long)]
    window: Option<usize>,
}

impl DetectionArgs {
    // flags win over the config file, which wins over built-in defaults
    fn resolve(&self, base: DetectionMethod) -> DetectionMethod {
        let method = self.method.unwrap_or(match base {
            DetectionMethod::ZScore { .. } => MethodArg::Zscore,
            DetectionMethod::MovingAverage { .. } => MethodArg::MovingAvg,
        });
        match (method, base) {
            (MethodArg::Zscore, DetectionMethod::ZScore { threshold }) => {
                DetectionMethod::zscore(self.threshold.unwrap_or(threshold))
            }
            (MethodArg::Zscore, _) => {
                DetectionMethod::zscore(self.threshold.unwrap_or(DEFAULT_ZSCORE_THRESHOLD))
            }
            (MethodArg::MovingAvg, DetectionMethod::MovingAverage { window, threshold }) => {
                DetectionMethod::moving_average(
                    self.window.unwrap_or(window),
                    self.threshold.unwrap_or(threshold),
                )
            }
            (MethodArg::MovingAvg, _) => DetectionMethod::moving_average(
                self.window.unwrap_or(DEFAULT_WINDOW),
                self.threshold.unwrap_or(DEFAULT_MOVING_AVG_THRESHOLD),
            ),
        }
    }
}

#[derive(Args)]
struct OutputArgs {
    /// Print the full annotated series as JSON
    #[arg(long)]
    json: bool,

    /// List flagged points in a table
    #[arg(long)]
    show_anomalies: bool,

    /// Maximum rows in the anomaly table
    #[arg(long, default_value = "25")]
    limit: usize,
}

#[derive(Args)]
struct AuthArgs {
    /// Bearer token
    #[arg(long, env = "METRISIGHT_BEARER_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Basic auth username
    #[arg(long, env = "METRISIGHT_BASIC_USER")]
    user: Option<String>,

    /// Basic auth password
    #[arg(long, env = "METRISIGHT_BASIC_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

impl AuthArgs {
    fn resolve(&self, fallback: &Auth) -> Result<Auth, Box<dyn std::error::Error>> {
        match (&self.token, &self.user, &self.password) {
            (Some(_), Some(_), _) => Err("use either --token or --user/--password, not both".into()),
            (Some(token), None, _) => Ok(Auth::bearer(token.clone())),
            (None, Some(user), Some(password)) => Ok(Auth::basic(user.clone(), password.clone())),
            (None, Some(_), None) => Err("--user needs --password".into()),
            (None, None, _) => Ok(fallback.clone()),
        }
    }
}

#[derive(Args)]
struct SourceArgs {
    /// Prometheus base URL
    #[arg(long)]
    url: Option<String>,

    /// PromQL expression
    #[arg(short, long)]
    query: Option<String>,

    /// Hours of history to fetch
    #[arg(long)]
    lookback_hours: Option<f64>,

    /// Step between samples in seconds
    #[arg(long)]
    step: Option<u64>,

    /// Deadline for the whole query in seconds
    #[arg(long)]
    timeout: Option<u64>,

    #[command(flatten)]
    auth: AuthArgs,
}

impl SourceArgs {
    fn resolve(&self, base: Option<&SourceConfig>) -> Result<SourceConfig, Box<dyn std::error::Error>> {
        let mut source = match (base, &self.url, &self.query) {
            (Some(base), _, _) => base.clone(),
            (None, Some(url), Some(query)) => SourceConfig::new(url.clone(), query.clone()),
            (None, _, _) => {
                return Err("--url and --query are required without a [source] config".into())
            }
        };
        if let Some(url) = &self.url {
            source.url = url.clone();
        }
        if let Some(query) = &self.query {
            source.query = query.clone();
        }
        if let Some(hours) = self.lookback_hours {
            source.lookback_hours = hours;
        }
        if let Some(step) = self.step {
            source.step_seconds = step;
        }
        if let Some(timeout) = self.timeout {
            source.timeout_seconds = timeout;
        }
        source.auth = self.auth.resolve(&source.auth)?;
        Ok(source)
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        output::print_error(e.as_ref());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => MetrisightConfig::default(),
    };

    match cli.command {
        Commands::Detect {
            input,
            hours,
            seed,
            detection,
            output,
        } => {
            let method = detection.resolve(config.detection);
            let (label, series) = match (input.csv, input.simulate) {
                (Some(path), _) => (path.display().to_string(), read_csv(&path)?),
                (None, Some(metric)) => {
                    let sim = simulate::generate(
                        &SimulationConfig::new(metric).with_hours(hours).with_seed(seed),
                        Utc::now(),
                    )?;
                    let label = format!("simulated {} (seed {})", metric.label(), sim.seed);
                    (label, sim.series)
                }
                (None, None) => return Err("pass --csv or --simulate".into()),
            };
            detect_and_report(&label, &series, method, &output)?;
        }
        Commands::Query {
            source,
            detection,
            output,
        } => {
            let method = detection.resolve(config.detection);
            let source = source.resolve(config.source.as_ref())?;
            let spec = source.to_query_spec()?;
            let client = PrometheusClient::new().with_retry_policy(source.retry);
            let series = client.query_range(&spec).await?;
            detect_and_report(&source.query, &series, method, &output)?;
        }
        Commands::Check { url, auth, timeout } => {
            let base = config.source.as_ref();
            let url = url
                .or_else(|| base.map(|s| s.url.clone()))
                .ok_or("--url is required without a [source] config")?;
            let auth = auth.resolve(base.map(|s| &s.auth).unwrap_or(&Auth::None))?;
            check_connection(&url, &auth, Duration::from_secs(timeout)).await?;
        }
        Commands::Simulate {
            metric,
            hours,
            interval,
            seed,
            output,
        } => {
            let config = SimulationConfig::new(metric)
                .with_hours(hours)
                .with_interval(interval)
                .with_seed(seed);
            let sim = simulate::generate(&config, Utc::now())?;
            match output {
                Some(path) => {
                    sim.series.write_csv(File::create(&path)?)?;
                    eprintln!(
                        "{} Wrote {} points ({} injected anomalies, seed {}) to {}",
                        "✓".green(),
                        sim.series.len(),
                        sim.injected_count(),
                        sim.seed,
                        path.display()
                    );
                }
                None => sim.series.write_csv(io::stdout().lock())?,
            }
        }
        Commands::Watch { count } => {
            let watcher = Watcher::new(config)?;
            watcher.run(count).await?;
        }
    }

    Ok(())
}

fn read_csv(path: &Path) -> Result<Series, Box<dyn std::error::Error>> {
    let file = File::open(path).map_err(|e| format!("cannot open {}: {}", path.display(), e))?;
    Ok(Series::from_csv_reader(file)?)
}

fn detect_and_report(
    label: &str,
    series: &Series,
    method: DetectionMethod,
    output: &OutputArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let annotated = method.detect(series)?;
    let summary = summarize(&annotated)?;

    if output.json {
        output::print_json(&Report {
            source: label,
            method,
            summary: &summary,
            points: &annotated.points,
        })?;
        return Ok(());
    }

    output::print_header("Anomaly Detection", label);
    output::print_summary(&summary, &method);
    if output.show_anomalies {
        output::print_anomalies(&annotated, output.limit);
    }
    println!();
    Ok(())
}

async fn check_connection(
    url: &str,
    auth: &Auth,
    timeout: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    output::print_header("Connection Check", url);
    let status = PrometheusClient::new().test_connection(url, auth, timeout).await;

    if status.ok {
        println!("  {} {}", "✓".green(), status.message);
        println!();
        return Ok(());
    }

    println!("  {} {}", "✗".red(), status.message);
    if let Some(kind) = status.error {
        println!("  {} {:?}", "Kind:".dimmed(), kind);
    }
    println!();
    Err("connection check failed".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(method: Option<MethodArg>, threshold: Option<f64>, window: Option<usize>) -> DetectionArgs {
        DetectionArgs {
            method,
            threshold,
            window,
        }
    }

    #[test]
    fn test_detection_defaults_follow_config() {
        let base = DetectionMethod::moving_average(30, 2.5);
        assert_eq!(detection(None, None, None).resolve(base), base);
        assert_eq!(
            detection(None, Some(1.5), None).resolve(base),
            DetectionMethod::moving_average(30, 1.5)
        );
    }

    #[test]
    fn test_switching_method_uses_builtin_defaults() {
        let base = DetectionMethod::zscore(2.0);
        assert_eq!(
            detection(Some(MethodArg::MovingAvg), None, None).resolve(base),
            DetectionMethod::moving_average(20, 2.0)
        );
        assert_eq!(
            detection(Some(MethodArg::Zscore), None, None).resolve(DetectionMethod::moving_average(5, 1.0)),
            DetectionMethod::zscore(3.0)
        );
    }

    #[test]
    fn test_auth_resolution() {
        let none = AuthArgs {
            token: None,
            user: None,
            password: None,
        };
        assert_eq!(none.resolve(&Auth::bearer("cfg")).unwrap(), Auth::bearer("cfg"));

        let basic = AuthArgs {
            token: None,
            user: Some("admin".to_string()),
            password: Some("pw".to_string()),
        };
        assert_eq!(basic.resolve(&Auth::None).unwrap(), Auth::basic("admin", "pw"));

        let half = AuthArgs {
            token: None,
            user: Some("admin".to_string()),
            password: None,
        };
        assert!(half.resolve(&Auth::None).is_err());
    }

    #[test]
    fn test_source_args_override_config() {
        let args = SourceArgs {
            url: None,
            query: Some("node_load5".to_string()),
            lookback_hours: Some(2.0),
            step: None,
            timeout: None,
            auth: AuthArgs {
                token: None,
                user: None,
                password: None,
            },
        };
        let base = SourceConfig::new("http://prom:9090", "node_load1");
        let resolved = args.resolve(Some(&base)).unwrap();
        assert_eq!(resolved.url, "http://prom:9090");
        assert_eq!(resolved.query, "node_load5");
        assert_eq!(resolved.lookback_hours, 2.0);

        assert!(args.resolve(None).is_err());
    }

    #[test]
    fn test_cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();

        let cli = Cli::try_parse_from([
            "metrisight",
            "detect",
            "--simulate",
            "cpu",
            "--method",
            "moving-avg",
            "--window",
            "10",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Detect { .. }));

        assert!(Cli::try_parse_from(["metrisight", "detect"]).is_err());
    }
}
