// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use std::io::Write;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::{error, info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

use kalque::app_config::Config;
use kalque::app_controller::{Controller, SubmitOptions};
use kalque::events::ProgressEvent;
use kalque::translation::blueprint::UserGlossaryEntry;

/// CLI wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LevelFilter {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LevelFilter::Error,
            CliLogLevel::Warn => LevelFilter::Warn,
            CliLogLevel::Info => LevelFilter::Info,
            CliLogLevel::Debug => LevelFilter::Debug,
            CliLogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Submit a subtitle file for translation and follow its progress
    #[command(alias = "run")]
    Translate(TranslateArgs),

    /// List persisted jobs and their status
    Jobs {
        /// Maximum number of jobs to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// Input subtitle file (SRT)
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    /// Desired tone of the translation
    #[arg(short, long, default_value = "Neutral")]
    tone: String,

    /// Route every line to the deep model tier
    #[arg(long)]
    thinking: bool,

    /// JSON file with mandated term translations: [{"term": ..., "translation": ...}]
    #[arg(short, long)]
    glossary: Option<PathBuf>,

    /// Output file path (defaults to <input>.translated.srt)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Culturally-adaptive subtitle translation with live progress")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// Minimal stderr logger with level colors
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S%.3f");
            let mut stderr = std::io::stderr();

            let _ = match record.level() {
                Level::Error => writeln!(stderr, "\x1B[1;31m{} ERROR {}\x1B[0m", now, record.args()),
                Level::Warn => writeln!(stderr, "\x1B[1;33m{} WARN  {}\x1B[0m", now, record.args()),
                Level::Info => writeln!(stderr, "{} INFO  {}", now, record.args()),
                Level::Debug => writeln!(stderr, "\x1B[2m{} DEBUG {}\x1B[0m", now, record.args()),
                Level::Trace => writeln!(stderr, "\x1B[2m{} TRACE {}\x1B[0m", now, record.args()),
            };
        }
    }

    fn flush(&self) {}
}

#[tokio::main]
async fn main() -> Result<()> {
    let options = CommandLineOptions::parse();

    let config = Config::from_file_or_default(&options.config_path)?;

    let log_level = options
        .log_level
        .map(LevelFilter::from)
        .unwrap_or_else(|| config.log_level.to_level_filter());
    CustomLogger::init(log_level).map_err(|e| anyhow!("Failed to initialize logger: {}", e))?;

    match options.command {
        Commands::Translate(args) => run_translate(&config, args).await,
        Commands::Jobs { limit } => run_jobs(&config, limit).await,
    }
}

/// Submit one file, follow its event stream, and write the result
async fn run_translate(config: &Config, args: TranslateArgs) -> Result<()> {
    let subtitle_content = std::fs::read_to_string(&args.input_path)
        .with_context(|| format!("Failed to read input file {}", args.input_path.display()))?;

    let user_glossary = match &args.glossary {
        Some(path) => load_glossary(path)?,
        None => Vec::new(),
    };

    let mut controller = Controller::new(config)?;

    // Submit and subscribe before the workers start so no event can be missed
    let job_id = controller
        .submit(
            subtitle_content,
            SubmitOptions {
                tone: args.tone.clone(),
                thinking_mode: args.thinking,
                user_glossary,
            },
        )
        .await?;

    info!("Submitted job {}", job_id);
    let mut subscription = controller.subscribe(&job_id);

    controller.start().await?;

    let output_path = args.output.clone().unwrap_or_else(|| {
        let mut path = args.input_path.clone();
        path.set_extension("translated.srt");
        path
    });

    while let Some(event) = subscription.recv().await {
        match event {
            ProgressEvent::Progress { stage } => info!("{}", stage),
            ProgressEvent::BlueprintReady(blueprint) => {
                info!(
                    "Blueprint ready: {} glossary term(s), {} character profile(s)",
                    blueprint.glossary.len(),
                    blueprint.character_profiles.len()
                );
            }
            ProgressEvent::Completed { result } => {
                std::fs::write(&output_path, result).with_context(|| {
                    format!("Failed to write output file {}", output_path.display())
                })?;
                info!("Translation written to {}", output_path.display());
                break;
            }
            ProgressEvent::Failed { error: message } => {
                error!("Job failed: {}", message);
                controller.shutdown().await?;
                return Err(anyhow!("translation failed: {message}"));
            }
        }
    }

    controller.shutdown().await?;
    Ok(())
}

/// Print the persisted job list
async fn run_jobs(config: &Config, limit: usize) -> Result<()> {
    let controller = Controller::new(config)?;
    let jobs = controller.list_jobs(limit).await?;

    if jobs.is_empty() {
        info!("No jobs found");
        return Ok(());
    }

    for job in jobs {
        println!(
            "{}  {:10}  attempts={}  {}  {}",
            job.id,
            job.status.to_string(),
            job.attempts,
            job.created_at.format("%Y-%m-%d %H:%M:%S"),
            job.progress,
        );
        if let Some(err) = &job.last_error {
            println!("    last error: {err}");
        }
    }

    Ok(())
}

/// Load a user glossary file: a JSON array of {"term", "translation"}
fn load_glossary(path: &PathBuf) -> Result<Vec<UserGlossaryEntry>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read glossary file {}", path.display()))?;

    let entries: Vec<UserGlossaryEntry> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse glossary file {}", path.display()))?;

    if entries.is_empty() {
        warn!("Glossary file {} contains no entries", path.display());
    }

    Ok(entries)
}
