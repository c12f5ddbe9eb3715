use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use std::io::Read;
use std::path::PathBuf;
use tfetch::api::PlaceholderClient;
use tfetch::config::Config;
use tfetch::resource::{classify_record, fetch_many, Phase, Records, ResourceFetcher, ResourceKind};
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Fetch typed todo and post collections
#[derive(Parser, Debug)]
#[command(name = "tfetch", version, about, long_about = None)]
struct Args {
    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch a collection and print one JSON object per line
    Fetch {
        /// Collection to fetch
        #[arg(short, long, value_enum)]
        kind: Option<ResourceKind>,

        /// Fetch every collection concurrently
        #[arg(long, conflicts_with = "kind")]
        all: bool,

        /// Base URL of the API host
        #[arg(long)]
        base_url: Option<String>,

        /// Request timeout in seconds (0 disables)
        #[arg(long)]
        timeout: Option<u64>,

        /// Store the chosen kind as the default
        #[arg(long)]
        remember: bool,
    },
    /// Report the record kind of a JSON object or of each item of an array
    Classify {
        /// Input file; reads stdin when omitted
        file: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Failed to open log file {:?}: {}", log_path, e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("tfetch started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("tfetch").join("tfetch.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".tfetch").join("tfetch.log");
    }
    PathBuf::from("tfetch.log")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level);

    match args.command {
        Command::Fetch {
            kind,
            all,
            base_url,
            timeout,
            remember,
        } => {
            let mut config = Config::load();
            let base_url = config.effective_base_url(base_url.as_deref());
            let client = PlaceholderClient::new(&base_url, config.effective_timeout(timeout))
                .context("Failed to create API client")?;

            tracing::info!("Using base URL: {}", client.base_url());

            if all {
                return fetch_all(&client).await;
            }

            let kind = config.effective_kind(kind);
            if remember {
                config.set_default_kind(kind).context("Failed to save config")?;
            }

            fetch_one(client, kind).await
        }
        Command::Classify { file } => classify_input(file),
    }
}

async fn fetch_one(client: PlaceholderClient, kind: ResourceKind) -> Result<()> {
    let mut fetcher = ResourceFetcher::new(client, kind);
    let state = fetcher.settled().await;

    if state.phase == Phase::Failed {
        let reason = state
            .last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string());
        bail!("Failed to fetch {}: {}", kind, reason);
    }

    print_records(&fetcher.observe(kind))
}

async fn fetch_all(client: &PlaceholderClient) -> Result<()> {
    let mut failures = 0;

    for (kind, result) in fetch_many(client, &ResourceKind::ALL).await {
        match result {
            Ok(records) => print_records(&records)?,
            Err(e) => {
                failures += 1;
                eprintln!("Failed to fetch {}: {}", kind, e);
            }
        }
    }

    if failures == ResourceKind::ALL.len() {
        bail!("All fetches failed");
    }
    Ok(())
}

fn print_records(records: &Records) -> Result<()> {
    for line in records.to_json_lines().context("Failed to serialize records")? {
        println!("{line}");
    }
    Ok(())
}

fn classify_input(file: Option<PathBuf>) -> Result<()> {
    let input = match file {
        Some(path) => std::fs::read_to_string(&path).with_context(|| format!("Failed to read {:?}", path))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };

    let value: Value = serde_json::from_str(&input).context("Input is not valid JSON")?;

    match value {
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                match classify_record(item) {
                    Ok(kind) => println!("{index}: {kind}"),
                    Err(e) => println!("{index}: error: {e}"),
                }
            }
        }
        other => {
            let kind = classify_record(&other)?;
            println!("{kind}");
        }
    }

    Ok(())
}
