//! Flux CLI - Command-line interface for Workload Flux
//!
//! Commands:
//! - summary: Daily summaries for a user
//! - burnout: Burnout risk over a lookback window
//! - anomaly: Anomaly check for a day against its lookback window
//! - validate: Validate interval records
//! - doctor: Diagnose configuration and model availability
//! - config: Print the effective configuration

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use workload_flux::adapter::{InputFormat as RecordFormat, IntervalAdapter, IntervalValidator};
use workload_flux::pipeline::{DEFAULT_ANOMALY_LOOKBACK_DAYS, DEFAULT_BURNOUT_LOOKBACK_DAYS};
use workload_flux::{
    AnalyticsConfig, AnalyticsError, AnalyticsPipeline, AnomalyDetector, InMemoryIntervalSource,
    FLUX_VERSION, PRODUCER_NAME,
};

/// Flux - Behavioral analytics over work activity intervals
#[derive(Parser)]
#[command(name = "flux")]
#[command(version = FLUX_VERSION)]
#[command(about = "Daily summaries, burnout risk and anomaly signals from work intervals", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Daily summaries for the days ending at --date
    Summary {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        query: QueryArgs,

        /// Number of days to summarize, ending at --date (1-120)
        #[arg(long, default_value = "1")]
        days: u32,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,
    },

    /// Burnout risk over the window ending at --date
    Burnout {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        query: QueryArgs,

        /// Days of history to analyze (2-90)
        #[arg(long, default_value_t = DEFAULT_BURNOUT_LOOKBACK_DAYS)]
        lookback_days: u32,

        /// Output format
        #[arg(long, default_value = "json")]
        output_format: OutputFormat,
    },

    /// Anomaly check for --date against its lookback window
    Anomaly {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        query: QueryArgs,

        /// Days of history to analyze, including --date (3-120)
        #[arg(long, default_value_t = DEFAULT_ANOMALY_LOOKBACK_DAYS)]
        lookback_days: u32,

        /// Output format
        #[arg(long, default_value = "json")]
        output_format: OutputFormat,
    },

    /// Validate interval records
    Validate {
        #[command(flatten)]
        input: InputArgs,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and model availability
    Doctor {
        /// Configuration file to check
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration as TOML
    Config {
        /// Configuration file (defaults apply when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args)]
struct InputArgs {
    /// Input file path (use - for stdin)
    #[arg(short, long)]
    input: PathBuf,

    /// Input format
    #[arg(long, default_value = "ndjson")]
    input_format: InputFormat,

    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Drop invalid records instead of failing
    #[arg(long)]
    skip_invalid: bool,
}

#[derive(Args)]
struct QueryArgs {
    /// User to report on
    #[arg(short, long)]
    user: String,

    /// Report date (YYYY-MM-DD)
    #[arg(short, long)]
    date: NaiveDate,
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// JSON array of records
    Json,
}

impl From<InputFormat> for RecordFormat {
    fn from(format: InputFormat) -> Self {
        match format {
            InputFormat::Ndjson => RecordFormat::Ndjson,
            InputFormat::Json => RecordFormat::JsonArray,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one document per line)
    Ndjson,
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("workload_flux={0},flux={0}", default_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), FluxCliError> {
    match cli.command {
        Commands::Summary {
            input,
            query,
            days,
            output_format,
        } => cmd_summary(&input, &query, days, &output_format),

        Commands::Burnout {
            input,
            query,
            lookback_days,
            output_format,
        } => {
            let pipeline = build_pipeline(&input)?;
            let report = pipeline.burnout_report(&query.user, query.date, lookback_days)?;
            print!("{}", format_output(&[report], &output_format)?);
            Ok(())
        }

        Commands::Anomaly {
            input,
            query,
            lookback_days,
            output_format,
        } => {
            let pipeline = build_pipeline(&input)?;
            let report = pipeline.anomaly_report(&query.user, query.date, lookback_days)?;
            print!("{}", format_output(&[report], &output_format)?);
            Ok(())
        }

        Commands::Validate { input, json } => cmd_validate(&input, json),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),

        Commands::Config { config } => {
            let config = load_config(config.as_deref())?;
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

fn cmd_summary(
    input: &InputArgs,
    query: &QueryArgs,
    days: u32,
    output_format: &OutputFormat,
) -> Result<(), FluxCliError> {
    let pipeline = build_pipeline(input)?;
    let summaries = if days == 1 {
        vec![pipeline.daily_summary(&query.user, query.date)?]
    } else {
        pipeline.history(&query.user, query.date, days)?
    };
    debug!(days = summaries.len(), user_id = %query.user, "Summarized window");

    print!("{}", format_output(&summaries, output_format)?);
    Ok(())
}

fn cmd_validate(input: &InputArgs, json: bool) -> Result<(), FluxCliError> {
    let config = load_config(input.config.as_deref())?;
    let input_data = read_input(&input.input)?;
    let records = IntervalAdapter::parse(&input_data, input.input_format.clone().into())?;

    let failures = IntervalValidator::validate_records(&records, &config.targets);

    let report = ValidationReport {
        total_records: records.len(),
        valid_records: records.len() - failures.len(),
        invalid_records: failures.len(),
        errors: failures,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total records:   {}", report.total_records);
        println!("Valid records:   {}", report.valid_records);
        println!("Invalid records: {}", report.invalid_records);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!(
                    "  - {} interval for {} (index {}): {}",
                    err.kind, err.user_id, err.index, err.error
                );
            }
        }
    }

    if report.invalid_records > 0 {
        Err(FluxCliError::ValidationFailed(report.invalid_records))
    } else {
        Ok(())
    }
}

/// Load the configuration doctor would use and report on it as one check
fn check_config(config_path: Option<&Path>) -> (Option<AnalyticsConfig>, DoctorCheck) {
    let missing_file = config_path.filter(|path| !path.exists());
    let config = match config_path {
        Some(path) if missing_file.is_none() => {
            AnalyticsConfig::load(path).and_then(AnalyticsConfig::with_env_overrides)
        }
        _ => AnalyticsConfig::default().with_env_overrides(),
    };

    match config {
        Ok(config) => {
            let summary = format!(
                "deep work target {} min, switch target {}",
                config.targets.deep_work_target_minutes, config.targets.context_switch_target
            );
            let check = match missing_file {
                Some(path) => DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Warning,
                    message: format!(
                        "Config file {} does not exist; using defaults ({})",
                        path.display(),
                        summary
                    ),
                },
                None => DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Ok,
                    message: format!("Config valid ({})", summary),
                },
            };
            (Some(config), check)
        }
        Err(e) => (
            None,
            DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Error,
                message: e.to_string(),
            },
        ),
    }
}

fn cmd_doctor(config_path: Option<&Path>, json: bool) -> Result<(), FluxCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "flux_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Flux version {}", FLUX_VERSION),
    });

    let (config, config_check) = check_config(config_path);
    checks.push(config_check);

    let model_check = match config {
        Some(config) if AnomalyDetector::new(&config.anomaly).model_available() => DoctorCheck {
            name: "anomaly_model".to_string(),
            status: CheckStatus::Ok,
            message: "Outlier model available (used with 7+ days of history)".to_string(),
        },
        Some(config) if config.anomaly.model_enabled => DoctorCheck {
            name: "anomaly_model".to_string(),
            status: CheckStatus::Warning,
            message: "Outlier model not compiled in; anomaly reports use the z-score fallback"
                .to_string(),
        },
        Some(_) => DoctorCheck {
            name: "anomaly_model".to_string(),
            status: CheckStatus::Ok,
            message: "Outlier model disabled by configuration".to_string(),
        },
        None => DoctorCheck {
            name: "anomaly_model".to_string(),
            status: CheckStatus::Warning,
            message: "Skipped: configuration is invalid".to_string(),
        },
    };
    checks.push(model_check);

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (pass records with --input <file>)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (ready for --input -)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: FLUX_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Flux Doctor Report");
        println!("==================");
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

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(FluxCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn load_config(path: Option<&Path>) -> Result<AnalyticsConfig, FluxCliError> {
    let config = match path {
        Some(path) => AnalyticsConfig::load(path)?,
        None => AnalyticsConfig::default(),
    };
    Ok(config.with_env_overrides()?)
}

fn read_input(input: &Path) -> Result<String, FluxCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn build_pipeline(
    input: &InputArgs,
) -> Result<AnalyticsPipeline<InMemoryIntervalSource>, FluxCliError> {
    let config = load_config(input.config.as_deref())?;
    let input_data = read_input(&input.input)?;
    let records = IntervalAdapter::parse(&input_data, input.input_format.clone().into())?;

    if records.is_empty() {
        return Err(FluxCliError::NoRecords);
    }

    let (valid, failures) = IntervalValidator::partition(records, &config.targets);
    if !failures.is_empty() {
        if !input.skip_invalid {
            return Err(FluxCliError::ValidationFailed(failures.len()));
        }
        for failure in &failures {
            warn!(
                index = failure.index,
                user_id = %failure.user_id,
                error = %failure.error,
                "Skipping invalid record"
            );
        }
    }

    let source = InMemoryIntervalSource::from_records(valid)?;
    debug!(records = source.len(), users = source.users().len(), "Loaded intervals");
    Ok(AnalyticsPipeline::new(source, config))
}

fn format_output<T: Serialize>(
    documents: &[T],
    format: &OutputFormat,
) -> Result<String, FluxCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for document in documents {
                lines.push(serde_json::to_string(document)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => match documents {
            [single] => Ok(serde_json::to_string(single)? + "\n"),
            _ => Ok(serde_json::to_string(documents)? + "\n"),
        },
        OutputFormat::JsonPretty => match documents {
            [single] => Ok(serde_json::to_string_pretty(single)? + "\n"),
            _ => Ok(serde_json::to_string_pretty(documents)? + "\n"),
        },
    }
}

#[derive(Debug)]
enum FluxCliError {
    Io(io::Error),
    Analytics(AnalyticsError),
    Json(serde_json::Error),
    NoRecords,
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for FluxCliError {
    fn from(e: io::Error) -> Self {
        FluxCliError::Io(e)
    }
}

impl From<AnalyticsError> for FluxCliError {
    fn from(e: AnalyticsError) -> Self {
        match e {
            AnalyticsError::Io(e) => FluxCliError::Io(e),
            other => FluxCliError::Analytics(other),
        }
    }
}

impl From<serde_json::Error> for FluxCliError {
    fn from(e: serde_json::Error) -> Self {
        FluxCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<FluxCliError> for CliError {
    fn from(e: FluxCliError) -> Self {
        match e {
            FluxCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            FluxCliError::Analytics(e) => analytics_error(e),
            FluxCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            FluxCliError::NoRecords => CliError {
                code: "NO_RECORDS".to_string(),
                message: "No interval records found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            FluxCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} records failed validation", count),
                hint: Some("Run 'flux validate' for details or pass --skip-invalid".to_string()),
            },
            FluxCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

fn analytics_error(e: AnalyticsError) -> CliError {
    let (code, hint) = match &e {
        AnalyticsError::Parse(_) | AnalyticsError::Json(_) => (
            "PARSE_ERROR",
            Some("Each record needs user_id, kind (idle|work), start and end"),
        ),
        AnalyticsError::Validation(_) => (
            "VALIDATION_ERROR",
            Some("Run 'flux validate' for details"),
        ),
        AnalyticsError::InvalidLookback { .. } => ("INVALID_LOOKBACK", None),
        AnalyticsError::DateOutOfRange(_) => ("INVALID_DATE", None),
        AnalyticsError::Config(_) | AnalyticsError::TomlDe(_) => (
            "CONFIG_ERROR",
            Some("Run 'flux doctor --config <file>' to check configuration"),
        ),
        AnalyticsError::Io(_) => ("IO_ERROR", Some("Check file paths and permissions")),
        AnalyticsError::Source(_) => ("SOURCE_ERROR", None),
    };
    CliError {
        code: code.to_string(),
        message: e.to_string(),
        hint: hint.map(str::to_string),
    }
}

#[derive(Serialize)]
struct ValidationReport {
    total_records: usize,
    valid_records: usize,
    invalid_records: usize,
    errors: Vec<workload_flux::ValidationResult>,
}

#[derive(Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(Debug, PartialEq, Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doctor_missing_config_is_one_warning() {
        let path = std::env::temp_dir().join("flux-doctor-missing-config.toml");
        let (config, check) = check_config(Some(path.as_path()));

        assert!(config.is_some());
        assert_eq!(check.name, "config");
        assert_eq!(check.status, CheckStatus::Warning);
        assert!(check.message.contains("does not exist"));
        assert!(check.message.contains("deep work target"));
    }

    #[test]
    fn test_doctor_default_config_is_ok() {
        let (config, check) = check_config(None);
        assert!(config.is_some());
        assert_eq!(check.status, CheckStatus::Ok);
    }

    #[test]
    fn test_doctor_invalid_config_is_error() {
        let path = std::env::temp_dir().join(format!("flux-doctor-{}.toml", std::process::id()));
        fs::write(&path, "targets = 3\n").unwrap();

        let (config, check) = check_config(Some(path.as_path()));
        fs::remove_file(&path).unwrap();

        assert!(config.is_none());
        assert_eq!(check.status, CheckStatus::Error);
    }
}
