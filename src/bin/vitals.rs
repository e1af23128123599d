//! Vitals CLI - Command-line interface for Vitals KPI
//!
//! Commands:
//! - extract: Flatten an export into a record table
//! - kpi: Compute daily/weekly/monthly KPIs of one metric
//! - scores: Classify metric averages into health-status bands
//! - forecast: Forecast the held-out hourly heart-rate horizon
//! - ecg: Load an ECG recording
//! - doctor: Diagnose configuration and environment

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use vitals_kpi::ecg::load_ecg;
use vitals_kpi::schema::{read_csv_table, CachedValue};
use vitals_kpi::{
    compute_kpis_with, extract_xml, forecast, KpiConfig, KpiEncoder, KpiError, Metric,
    SeasonalNaiveModel, Table, PRODUCER_NAME, VERSION,
};

/// Vitals - KPI engine for wearable health exports
#[derive(Parser)]
#[command(name = "vitals")]
#[command(version = VERSION)]
#[command(about = "Compute health KPIs from wearable exports", long_about = None)]
struct Cli {
    /// Configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Flatten an export into a record table
    Extract {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "xml")]
        input_format: InputFormat,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Compute KPIs of one metric
    Kpi {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "xml")]
        input_format: InputFormat,

        /// Metric name (e.g. heart_rate, spo2) or full type identifier
        #[arg(short, long)]
        metric: String,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Score activity, heart rate, energy and oxygen
    Scores {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "xml")]
        input_format: InputFormat,
    },

    /// Forecast hourly heart rate with a seasonal-naive model
    Forecast {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "xml")]
        input_format: InputFormat,

        /// Held-out hours (overrides config)
        #[arg(long)]
        horizon: Option<usize>,

        /// Context hours (overrides config)
        #[arg(long)]
        context_length: Option<usize>,

        /// Season length in hours (overrides config)
        #[arg(long)]
        season: Option<usize>,
    },

    /// Load an ECG recording
    Ecg {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum InputFormat {
    /// Health export XML
    Xml,
    /// CSV record dump with a header row
    Csv,
    /// Cached JSON value (records, columns or table)
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), VitalsCliError> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Extract {
            input,
            output,
            input_format,
            pretty,
        } => {
            let config = load_config(config_path)?;
            let table = read_table(&input, input_format, &config)?;
            tracing::info!(rows = table.len(), columns = table.columns().len(), "extracted table");
            write_json(&output, &KpiEncoder::encode_table(&table), pretty)
        }

        Commands::Kpi {
            input,
            output,
            input_format,
            metric,
            pretty,
        } => {
            let config = load_config(config_path)?;
            let metric_id = resolve_metric(&metric)?;
            let table = read_table(&input, input_format, &config)?;
            let result = compute_kpis_with(&table, &metric_id, &config)?;
            write_json(&output, &KpiEncoder::encode(&result), pretty)
        }

        Commands::Scores {
            input,
            output,
            input_format,
        } => {
            let config = load_config(config_path)?;
            let table = read_table(&input, input_format, &config)?;
            if table.is_empty() {
                return Err(VitalsCliError::NoRecords);
            }
            let report = vitals_kpi::HealthScorer::score(&table);
            write_json(&output, &serde_json::to_value(&report)?, true)
        }

        Commands::Forecast {
            input,
            output,
            input_format,
            horizon,
            context_length,
            season,
        } => {
            let mut config = load_config(config_path)?;
            if let Some(horizon) = horizon {
                config.forecast.horizon = horizon;
            }
            if let Some(context_length) = context_length {
                config.forecast.context_length = context_length;
            }
            if let Some(season) = season {
                config.forecast.season = season;
            }

            let table = read_table(&input, input_format, &config)?;
            let model = SeasonalNaiveModel::new(config.forecast.season);
            let result = forecast::forecast_heart_rate(&table, &model, &config.forecast)?;
            tracing::info!(mape = result.mape, "forecast complete");
            write_json(&output, &serde_json::to_value(&result)?, true)
        }

        Commands::Ecg { input, output } => {
            let config = load_config(config_path)?;
            let recording = load_ecg(open_input(&input)?, &config.ecg)?;
            write_json(&output, &serde_json::to_value(&recording)?, false)
        }

        Commands::Doctor { json } => cmd_doctor(config_path, json),
    }
}

fn load_config(path: Option<&Path>) -> Result<KpiConfig, VitalsCliError> {
    match path {
        Some(path) => {
            let json = fs::read_to_string(path)?;
            Ok(KpiConfig::from_json(&json)?)
        }
        None => Ok(KpiConfig::default()),
    }
}

fn resolve_metric(name: &str) -> Result<String, VitalsCliError> {
    match name.parse::<Metric>() {
        Ok(metric) => Ok(metric.identifier().to_string()),
        // Unknown identifiers are still valid record types
        Err(_) if name.starts_with("HK") => Ok(name.to_string()),
        Err(message) => Err(VitalsCliError::UnknownMetric(message)),
    }
}

fn open_input(path: &Path) -> Result<Box<dyn BufRead>, VitalsCliError> {
    if path.to_string_lossy() == "-" {
        Ok(Box::new(BufReader::new(io::stdin())))
    } else {
        Ok(Box::new(BufReader::new(fs::File::open(path)?)))
    }
}

fn read_table(path: &Path, format: InputFormat, config: &KpiConfig) -> Result<Table, VitalsCliError> {
    let mut input = open_input(path)?;

    let table = match format {
        InputFormat::Xml => extract_xml(input, config)?,
        InputFormat::Csv => read_csv_table(input)?,
        InputFormat::Json => {
            let mut buffer = String::new();
            input.read_to_string(&mut buffer)?;
            CachedValue::from_json_str(&buffer)?.into_table()?
        }
    };

    Ok(table)
}

fn write_json(path: &Path, value: &serde_json::Value, pretty: bool) -> Result<(), VitalsCliError> {
    let mut data = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    data.push('\n');

    if path.to_string_lossy() == "-" {
        let mut stdout = io::stdout();
        stdout.write_all(data.as_bytes())?;
        stdout.flush()?;
    } else {
        fs::write(path, data)?;
    }

    Ok(())
}

fn cmd_doctor(config_path: Option<&Path>, json: bool) -> Result<(), VitalsCliError> {
    let mut checks = vec![DoctorCheck::ok(
        "version",
        format!("Vitals KPI version {}", VERSION),
    )];

    let config = match config_path {
        None => KpiConfig::default(),
        Some(path) if !path.exists() => {
            checks.push(DoctorCheck::warning("config", "Config file does not exist, using defaults"));
            KpiConfig::default()
        }
        Some(path) => match load_config(Some(path)) {
            Ok(config) => {
                checks.push(DoctorCheck::ok("config", format!("Loaded {}", path.display())));
                config
            }
            Err(e) => {
                checks.push(DoctorCheck::error("config", CliError::from(e).message));
                KpiConfig::default()
            }
        },
    };

    checks.push(check_reader(&config));
    checks.push(check_forecast(&config));

    checks.push(if atty::is(atty::Stream::Stdin) {
        DoctorCheck::ok("stdin", "stdin is a TTY (pass --input <file>)")
    } else {
        DoctorCheck::ok("stdin", "stdin is a pipe (--input - ready)")
    });

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Vitals Doctor Report");
        println!("====================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    if report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error)) {
        Err(VitalsCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

/// Run a two-record export built with the configured record tag through extraction and KPIs
fn check_reader(config: &KpiConfig) -> DoctorCheck {
    let tag = &config.record_tag;
    let heart_rate = Metric::HeartRate.identifier();
    let sample = format!(
        r#"<HealthData><{tag} type="{heart_rate}" startDate="2024-01-15 08:00:00 +0000" value="60"/><{tag} type="{heart_rate}" startDate="2024-01-16 08:00:00 +0000" value="90"/></HealthData>"#
    );

    let outcome = extract_xml(sample.as_bytes(), config).and_then(|table| {
        let rows = table.len();
        compute_kpis_with(&table, heart_rate, config).map(|kpis| (rows, kpis))
    });

    match outcome {
        Ok((2, kpis)) => {
            let evolution = kpis
                .daily_avg
                .rows
                .last()
                .and_then(|row| row.evolution)
                .unwrap_or(0.0);
            DoctorCheck::ok(
                "reader",
                format!("<{tag}> sample extracted, heart-rate evolution {evolution:.1}%"),
            )
        }
        Ok((rows, _)) => DoctorCheck::warning(
            "reader",
            format!("<{tag}> sample yielded {rows} records, expected 2"),
        ),
        Err(e) => DoctorCheck::error("reader", format!("<{tag}> sample failed: {e}")),
    }
}

fn check_forecast(config: &KpiConfig) -> DoctorCheck {
    let forecast = &config.forecast;
    let needed = forecast.horizon + 1;

    if forecast.horizon == 0 {
        DoctorCheck::warning("forecast", "horizon is 0 hours, forecasts will be empty")
    } else if needed > forecast.max_span_hours {
        DoctorCheck::warning(
            "forecast",
            format!(
                "horizon needs {needed} hours but the span limit is {} hours",
                forecast.max_span_hours
            ),
        )
    } else {
        DoctorCheck::ok(
            "forecast",
            format!(
                "{}h context, {}h horizon, {}h season",
                forecast.context_length, forecast.horizon, forecast.season
            ),
        )
    }
}

// Error types

#[derive(Debug)]
enum VitalsCliError {
    Io(io::Error),
    Kpi(KpiError),
    Json(serde_json::Error),
    UnknownMetric(String),
    NoRecords,
    DoctorFailed,
}

impl From<io::Error> for VitalsCliError {
    fn from(e: io::Error) -> Self {
        VitalsCliError::Io(e)
    }
}

impl From<KpiError> for VitalsCliError {
    fn from(e: KpiError) -> Self {
        VitalsCliError::Kpi(e)
    }
}

impl From<serde_json::Error> for VitalsCliError {
    fn from(e: serde_json::Error) -> Self {
        VitalsCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<VitalsCliError> for CliError {
    fn from(e: VitalsCliError) -> Self {
        match e {
            VitalsCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            VitalsCliError::Kpi(e) => {
                let hint = match &e {
                    KpiError::ParseError(_) => "Ensure the input is a well-formed export and --input-format matches",
                    KpiError::EmptyResult(_) => "Check that the export contains records of the requested metric",
                    KpiError::InsufficientData(_) => "Provide a longer recording or lower --horizon",
                    KpiError::ConversionError(_) => "Cached values must be records, columns or a table",
                    _ => "Check input format",
                };
                CliError {
                    code: e.code().to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            VitalsCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            VitalsCliError::UnknownMetric(message) => CliError {
                code: "UNKNOWN_METRIC".to_string(),
                message,
                hint: Some("Run 'vitals doctor' to list known metrics".to_string()),
            },
            VitalsCliError::NoRecords => CliError {
                code: "NO_RECORDS".to_string(),
                message: "No records found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            VitalsCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

impl DoctorCheck {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
        }
    }

    fn ok(name: &str, message: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Ok, message)
    }

    fn warning(name: &str, message: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Warning, message)
    }

    fn error(name: &str, message: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Error, message)
    }
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
