//! HeartWise: Cardiovascular risk estimation
//!
//! Reads one localized form as JSON (file or stdin), prints the prediction
//! response as JSON on stdout.
//!
//! ```bash
//! heartwise [--variant <multi-step|weekly|simplified>] [--no-persist] [<input.json>]
//! heartwise --recent <n>
//! ```

use std::io::{IsTerminal, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use heartwise::adapters::sanitize::SanitizingMakeWriter;
use heartwise::adapters::{JsonModelLoader, SqliteRepository};
use heartwise::application::{CalibratedEngine, PredictionService, ResultPersister};
use heartwise::config::{AppConfig, DatabaseConfig, LogMode, LoggingConfig};
use heartwise::domain::{FormVariant, Normalizer};
use heartwise::ports::ModelLoader;
use heartwise::RawInput;

#[derive(Debug, Default)]
struct Args {
    variant: Option<FormVariant>,
    no_persist: bool,
    recent: Option<usize>,
    input: Option<PathBuf>,
}

fn usage() -> &'static str {
    "Usage: heartwise [--variant <multi-step|weekly|simplified>] [--no-persist] [--recent <n>] [<input.json>]"
}

fn parse_args() -> Result<Args> {
    let mut args = std::env::args().skip(1);
    let mut parsed = Args::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--variant" => {
                let v = args.next().context(usage())?;
                parsed.variant = Some(v.parse().map_err(anyhow::Error::msg)?);
            }
            "--no-persist" => parsed.no_persist = true,
            "--recent" => {
                let v = args.next().context(usage())?;
                parsed.recent = Some(v.trim().parse().context("--recent must be a number")?);
            }
            "-h" | "--help" => bail!(usage()),
            _ if parsed.input.is_none() && !arg.starts_with("--") => {
                parsed.input = Some(PathBuf::from(arg));
            }
            _ => bail!(usage()),
        }
    }
    Ok(parsed)
}

/// Install the tracing subscriber. The returned guard flushes on drop.
fn init_logging(config: &LoggingConfig) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    // stdout carries the JSON response, so logs never go there.
    let use_file = match config.mode {
        LogMode::File => true,
        LogMode::Stderr => false,
        LogMode::Auto => std::io::stdout().is_terminal(),
    };

    let (writer, guard) = if use_file {
        if let Some(parent) = config.file.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
            }
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.file)
            .with_context(|| format!("Failed to open log file {}", config.file.display()))?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stderr())
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(SanitizingMakeWriter::new(writer)),
        )
        .init();

    Ok(guard)
}

fn read_input(path: Option<&PathBuf>) -> Result<RawInput> {
    let text = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };
    RawInput::from_json(&text).context("Input must be a JSON object")
}

fn main() -> Result<ExitCode> {
    let args = parse_args()?;
    let config = AppConfig::from_env().context("Invalid configuration")?;
    let _guard = init_logging(&config.logging)?;

    tracing::info!("Starting HeartWise...");

    if let Some(limit) = args.recent {
        let repo = SqliteRepository::open(&config.database).context("Failed to open database")?;
        let persister = ResultPersister::new(Arc::new(repo));
        let recent = persister.recent(limit).context("Failed to load history")?;
        println!("{}", serde_json::to_string_pretty(&recent)?);
        return Ok(ExitCode::SUCCESS);
    }

    // The model loads before any input is read; a bad artifact aborts here.
    let model = JsonModelLoader::new(&config.model)
        .load()
        .context("Failed to load classifier")?;
    let engine = Arc::new(CalibratedEngine::new(model));
    let features_used = engine.schema().columns().to_vec();

    // Scratch database when persistence is off; nothing outlives the process.
    let database = if args.no_persist {
        DatabaseConfig::in_memory()
    } else {
        config.database.clone()
    };
    let repo = SqliteRepository::open(&database).context("Failed to open database")?;

    let variant = args.variant.unwrap_or(config.form_variant);
    let service = PredictionService::new(
        Normalizer::new(variant),
        engine,
        ResultPersister::new(Arc::new(repo)),
    );

    let raw = read_input(args.input.as_ref())?;
    let outcome = if args.no_persist {
        service.predict(&raw)
    } else {
        service.submit(&raw).map(|submission| {
            if let Err(e) = &submission.persistence {
                eprintln!("warning: {}", e.user_message());
            }
            submission.result
        })
    };

    match outcome {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result.to_response(&features_used))?);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{}", e.user_message());
            Ok(if e.is_user_correctable() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            })
        }
    }
}
