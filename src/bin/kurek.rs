//! Kurek CLI - Command-line interface for Kurek Core
//!
//! Commands:
//! - replay: Run a recorded session through the engine and report metrics
//! - validate: Validate track event recordings
//! - doctor: Diagnose configuration and environment
//! - config: Print or check session configuration

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::Utc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use kurek_core::format::{format_duration, format_pace};
use kurek_core::schema::{ReplayReport, TrackEvent, TrackReader, SCHEMA_VERSION};
use kurek_core::splits::SplitSummary;
use kurek_core::types::{FilterDiagnostics, LapRecord, LiveMetrics, SplitRecord};
use kurek_core::{SessionConfig, SessionEngine, TrackError, KUREK_VERSION, PRODUCER_NAME};

/// Kurek - On-device rowing metrics engine
#[derive(Parser)]
#[command(name = "kurek")]
#[command(author = "KurekTrack")]
#[command(version = KUREK_VERSION)]
#[command(about = "Replay and inspect rowing sessions recorded as GPS track events", long_about = None)]
struct Cli {
    /// Enable debug logging (per-fix diagnostics)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded session and print metrics
    Replay {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "auto")]
        input_format: InputFormat,

        /// Session configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write the session summary to this file
        #[arg(long)]
        save_summary: Option<PathBuf>,

        /// Output report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate track event recordings
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "auto")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Check a session configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the default configuration, or check a configuration file
    Config {
        /// Configuration file to check
        #[arg(long)]
        check: Option<PathBuf>,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Detect from the first character
    Auto,
    /// Newline-delimited JSON (one event per line)
    Ndjson,
    /// JSON array of events
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli.command) {
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

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn run(command: Commands) -> Result<(), KurekCliError> {
    match command {
        Commands::Replay {
            input,
            input_format,
            config,
            save_summary,
            json,
        } => cmd_replay(
            &input,
            input_format,
            config.as_deref(),
            save_summary.as_deref(),
            json,
        ),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),

        Commands::Config { check } => cmd_config(check.as_deref()),
    }
}

fn read_input(input: &Path) -> Result<String, KurekCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn parse_events(data: &str, format: InputFormat) -> Result<Vec<TrackEvent>, KurekCliError> {
    let events = match format {
        InputFormat::Auto => TrackReader::parse(data)?,
        InputFormat::Ndjson => TrackReader::parse_ndjson(data)?,
        InputFormat::Json => TrackReader::parse_array(data)?,
    };
    if events.is_empty() {
        return Err(KurekCliError::NoEvents);
    }
    Ok(events)
}

fn load_config(path: Option<&Path>) -> Result<SessionConfig, KurekCliError> {
    match path {
        Some(path) => {
            debug!(path = %path.display(), "loading configuration");
            Ok(SessionConfig::from_json(&fs::read_to_string(path)?)?)
        }
        None => Ok(SessionConfig::default()),
    }
}

fn cmd_replay(
    input: &Path,
    input_format: InputFormat,
    config: Option<&Path>,
    save_summary: Option<&Path>,
    json: bool,
) -> Result<(), KurekCliError> {
    let events = parse_events(&read_input(input)?, input_format)?;
    let mut engine = SessionEngine::new(load_config(config)?)?;

    let replay = TrackReader::replay(&mut engine, &events)?;
    info!(
        events = replay.events,
        fixes_accepted = replay.fixes_accepted,
        splits = replay.splits_emitted,
        "replay finished"
    );

    // The summary is stamped with the last recorded instant so replays are reproducible
    let recorded_at = events.last().map(TrackEvent::at).unwrap_or_else(Utc::now);
    let summary = engine.summary(recorded_at);
    if let Some(path) = save_summary {
        fs::write(path, summary.to_json()?)?;
    }

    let report = ReplayOutput {
        replay,
        metrics: engine.metrics(),
        diagnostics: engine.diagnostics().clone(),
        splits: engine.splits().to_vec(),
        split_summary: engine.split_summary(),
        laps: engine.laps().to_vec(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_replay(&report);
    }
    Ok(())
}

fn print_replay(report: &ReplayOutput) {
    let m = &report.metrics;
    println!("Session Replay");
    println!("==============");
    println!("Events:        {}", report.replay.events);
    println!(
        "Fixes:         {} accepted, {} rejected",
        report.diagnostics.accepted,
        report.diagnostics.rejected()
    );
    println!("Phase:         {}", m.phase.as_str());
    println!("Duration:      {}", format_duration(m.elapsed_secs));
    println!("Distance:      {:.0} m", m.total_distance_m);
    println!("Avg speed:     {:.1} km/h", m.average_speed_kmh);
    println!("Max speed:     {:.1} km/h", m.max_speed_kmh);
    println!("Avg pace:      {} /500m", format_pace(m.pace_500m_secs));
    println!("Strokes:       {:.0}", m.total_strokes);
    println!("Calories:      {:.0} kcal", m.calories);

    if !report.splits.is_empty() {
        println!("\nSplits:");
        for split in &report.splits {
            println!(
                "  #{:<3} {:>5.0} m  {}  {} /500m  {:.0} spm",
                split.sequence,
                split.interval_distance_m,
                format_duration(split.elapsed_secs),
                format_pace(Some(split.pace_500m_secs())),
                split.stroke_rate_spm
            );
        }
    }
    if let Some(summary) = &report.split_summary {
        println!(
            "  best {}  worst {}  rating: {}",
            format_pace(Some(summary.best_pace_secs)),
            format_pace(Some(summary.worst_pace_secs)),
            summary.rating().as_str()
        );
    }

    if !report.laps.is_empty() {
        println!("\nLaps:");
        for lap in &report.laps {
            println!(
                "  Lap {:<3} {:>6.0} m  {}  {:.1} km/h",
                lap.number,
                lap.distance_m,
                format_duration(lap.elapsed_secs),
                lap.average_speed_kmh
            );
        }
    }
}

fn cmd_validate(input: &Path, input_format: InputFormat, json: bool) -> Result<(), KurekCliError> {
    let events = parse_events(&read_input(input)?, input_format)?;
    let issues = TrackReader::check_events(&events);

    let report = ValidationReport {
        total_events: events.len(),
        valid_events: events.len() - issues.len(),
        invalid_events: issues.len(),
        errors: issues
            .iter()
            .map(|issue| ValidationErrorDetail {
                index: issue.index,
                kind: issue.kind.to_string(),
                error: issue.error.to_string(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total events:   {}", report.total_events);
        println!("Valid events:   {}", report.valid_events);
        println!("Invalid events: {}", report.invalid_events);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - {} event (index {}): {}", err.kind, err.index, err.error);
            }
        }
    }

    if report.invalid_events > 0 {
        Err(KurekCliError::ValidationFailed(report.invalid_events))
    } else {
        Ok(())
    }
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), KurekCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "kurek_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Kurek version {}", KUREK_VERSION),
    });

    checks.push(DoctorCheck {
        name: "schema_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Input schema: {}", SCHEMA_VERSION),
    });

    if let Some(config_path) = config {
        let check = if !config_path.exists() {
            DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Warning,
                message: "Configuration file does not exist".to_string(),
            }
        } else {
            match fs::read_to_string(config_path) {
                Ok(content) => match SessionConfig::from_json(&content) {
                    Ok(config) => DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Ok,
                        message: format!(
                            "Configuration valid (accuracy <= {} m, {} m splits)",
                            config.filter.max_allowed_accuracy_m, config.split_interval_m
                        ),
                    },
                    Err(e) => DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Error,
                        message: e.to_string(),
                    },
                },
                Err(e) => DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Cannot read configuration file: {}", e),
                },
            }
        };
        checks.push(check);
    }

    // Recordings can be piped in with `--input -`
    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (replay input ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: KUREK_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Kurek Doctor Report");
        println!("===================");
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
        Err(KurekCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn cmd_config(check: Option<&Path>) -> Result<(), KurekCliError> {
    let config = load_config(check)?;
    if check.is_some() {
        eprintln!("Configuration OK");
    }
    println!("{}", config.to_json_pretty()?);
    Ok(())
}

// Error types

#[derive(Debug)]
enum KurekCliError {
    Io(io::Error),
    Track(TrackError),
    Json(serde_json::Error),
    NoEvents,
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for KurekCliError {
    fn from(e: io::Error) -> Self {
        KurekCliError::Io(e)
    }
}

impl From<TrackError> for KurekCliError {
    fn from(e: TrackError) -> Self {
        KurekCliError::Track(e)
    }
}

impl From<serde_json::Error> for KurekCliError {
    fn from(e: serde_json::Error) -> Self {
        KurekCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<KurekCliError> for CliError {
    fn from(e: KurekCliError) -> Self {
        match e {
            KurekCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            KurekCliError::Track(e) => {
                let (code, hint) = match &e {
                    TrackError::InvalidConfig(_) => {
                        ("CONFIG_ERROR", "Run 'kurek config' to see a valid configuration")
                    }
                    TrackError::JsonError(_) => ("JSON_ERROR", "Check JSON syntax"),
                    TrackError::ParseError(_) => {
                        ("PARSE_ERROR", "Ensure input matches kurek.track_event.v1 schema")
                    }
                    TrackError::InvalidEvent(_) => {
                        ("VALIDATION_ERROR", "Run 'kurek validate' for details")
                    }
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            KurekCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            KurekCliError::NoEvents => CliError {
                code: "NO_EVENTS".to_string(),
                message: "No events found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            KurekCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} events failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            KurekCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ReplayOutput {
    replay: ReplayReport,
    metrics: LiveMetrics,
    diagnostics: FilterDiagnostics,
    splits: Vec<SplitRecord>,
    split_summary: Option<SplitSummary>,
    laps: Vec<LapRecord>,
}

#[derive(serde::Serialize)]
struct ValidationReport {
    total_events: usize,
    valid_events: usize,
    invalid_events: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    kind: String,
    error: String,
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

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
