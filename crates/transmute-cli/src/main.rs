//! Transmute CLI: command-line client for the Transmute file conversion API.
//!
//! Reads TRANSMUTE_API_URL (or API_URL) and the other TRANSMUTE_* settings,
//! optionally from a `.env` file.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use transmute_api_client::ApiClient;
use transmute_cli::{file_rows, history_rows, init_tracing};
use transmute_core::models::{ConversionRequest, FilePayload};
use transmute_core::ClientConfig;
use transmute_tracker::{ConversionTracker, DownloadedArtifact, RefreshOutcome};

#[derive(Parser)]
#[command(name = "transmute", about = "Transmute file conversion CLI")]
struct Cli {
    /// Override the API base URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Table,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file for conversion
    Upload {
        /// Path to the file to upload
        file: PathBuf,
    },
    /// Show files with a completed conversion, newest first
    History {
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// Download a converted artifact
    Download {
        /// Conversion ID
        conversion_id: String,
        /// Directory to save into (defaults to TRANSMUTE_DOWNLOAD_DIR)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Delete a file and all of its conversions
    Delete {
        /// File ID
        file_id: String,
    },
    /// Ask the processor to convert a stored file
    Convert {
        /// File ID
        file_id: String,
        /// Target format, e.g. pdf
        output_format: String,
        /// Source format, if the processor cannot infer it
        #[arg(long)]
        input_format: Option<String>,
    },
    /// List every upload regardless of conversion state
    Files {
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// Refresh the history periodically and report changes
    Watch {
        /// Seconds between refreshes (defaults to TRANSMUTE_POLL_INTERVAL_SECS)
        #[arg(long)]
        interval: Option<u64>,
        /// Stop after this many refreshes
        #[arg(long)]
        count: Option<u64>,
    },
    /// Service info, liveness and readiness
    Health,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

async fn save_artifact(dir: &Path, artifact: &DownloadedArtifact) -> anyhow::Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    let path = dir.join(&artifact.filename);
    tokio::fs::write(&path, &artifact.bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

async fn watch(
    tracker: &ConversionTracker<ApiClient>,
    every: Duration,
    count: Option<u64>,
) -> anyhow::Result<()> {
    let mut ticker = tokio::time::interval(every);
    let mut seen: Option<usize> = None;
    let mut done = 0u64;

    loop {
        ticker.tick().await;
        match tracker.refresh().await {
            Ok(RefreshOutcome::Applied { len, .. }) => {
                if seen != Some(len) {
                    let newest = tracker
                        .records()
                        .first()
                        .map(|r| r.original_filename.clone())
                        .unwrap_or_else(|| "-".to_string());
                    println!("{} completed file(s), newest: {}", len, newest);
                    seen = Some(len);
                }
            }
            Ok(RefreshOutcome::Superseded { .. }) => {}
            Err(e) => eprintln!("Refresh failed: {}", e.client_message()),
        }

        done += 1;
        if count.is_some_and(|n| done >= n) {
            return Ok(());
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    let mut config = ClientConfig::from_env().context(
        "Invalid configuration. Check TRANSMUTE_API_URL (or API_URL) and TRANSMUTE_* settings",
    )?;
    if let Some(url) = cli.api_url {
        config = config.with_api_url(url);
        config.validate()?;
    }

    let client = ApiClient::new(&config).context("Failed to create API client")?;
    let tracker = ConversionTracker::new(client);

    match cli.command {
        Commands::Upload { file } => {
            let payload = FilePayload::from_path(&file)?;
            match tracker.upload(Some(payload)).await? {
                Some(receipt) => print_json(&receipt)?,
                None => println!("{} is empty, nothing uploaded", file.display()),
            }
        }
        Commands::History { format } => {
            tracker.refresh().await?;
            let records = tracker.records();
            match format {
                OutputFormat::Json => print_json(&records.to_vec())?,
                OutputFormat::Table => {
                    if records.is_empty() {
                        println!("No completed conversions.");
                    } else {
                        history_rows(&records).iter().for_each(|row| println!("{}", row));
                    }
                }
            }
        }
        Commands::Download { conversion_id, out } => {
            // The listing supplies the original filename for the saved file.
            tracker.refresh().await?;
            if tracker.find_conversion(&conversion_id).is_none() {
                tracing::warn!(
                    conversion_id = %conversion_id,
                    "Conversion not in completed history; using fallback filename"
                );
            }
            let artifact = tracker.download(&conversion_id).await?;
            let dir = out.unwrap_or_else(|| config.download_dir.clone());
            let path = save_artifact(&dir, &artifact).await?;
            println!("Saved {} ({} bytes)", path.display(), artifact.bytes.len());
        }
        Commands::Delete { file_id } => {
            tracker.delete(&file_id).await?;
            print_json(
                &serde_json::json!({ "success": true, "message": format!("File {} deleted", file_id) }),
            )?;
        }
        Commands::Convert {
            file_id,
            output_format,
            input_format,
        } => {
            let request = ConversionRequest {
                id: file_id,
                input_format,
                output_format,
            };
            let response = tracker.api().request_conversion(&request).await?;
            print_json(&response)?;
        }
        Commands::Files { format } => {
            let files = tracker.api().list_files().await?;
            match format {
                OutputFormat::Json => print_json(&files)?,
                OutputFormat::Table => file_rows(&files).iter().for_each(|row| println!("{}", row)),
            }
        }
        Commands::Watch { interval, count } => {
            let every = interval
                .map(Duration::from_secs)
                .unwrap_or_else(|| config.poll_interval());
            if every.is_zero() {
                anyhow::bail!("--interval must be greater than 0");
            }
            watch(&tracker, every, count).await?;
        }
        Commands::Health => {
            let api = tracker.api();
            let info = api.app_info().await?;
            let live = api.liveness().await?;
            let ready = api.readiness().await?;
            print_json(&serde_json::json!({
                "info": info,
                "live": live,
                "ready": ready,
                "failing_checks": ready.failing_checks(),
            }))?;
            if !ready.is_ready() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
