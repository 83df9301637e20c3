//! `video-ai-analysis` CLI entry-point.
//!
//! Available sub-commands:
//! - `analyze`  — analyse a single video given on the command line.
//! - `batch`    — analyse every item of a JSON file, in order.
//! - `validate` — check every item's parameters without calling any API.
//!
//! Results are printed to stdout as a JSON array of `{json, pairedItem}`;
//! logs go to stderr.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use engine::{BatchConfig, BatchRunner, FailurePolicy};
use nodes::generator::DEFAULT_BASE_URL;
use nodes::{
    FetcherConfig, GeminiClient, GeminiConfig, IngestMode, VideoAnalysisNode, VideoAnalysisParams,
    VideoFetcher,
};

#[derive(Parser)]
#[command(
    name = "video-ai-analysis",
    about = "Analyse videos with Google Gemini",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyse one video.
    Analyze {
        /// URL of the video to analyse.
        #[arg(long)]
        video_url: String,
        /// Prompt sent alongside the video.
        #[arg(long)]
        prompt: String,
        /// Gemini model; defaults depend on --mode.
        #[arg(long)]
        model: Option<String>,
        /// Sampling temperature in [0, 1].
        #[arg(long)]
        temperature: Option<f64>,
        /// Largest video to download in inline mode, in MB.
        #[arg(long)]
        max_video_size_mb: Option<f64>,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Analyse every item of a JSON file (an array of items, or one item).
    Batch {
        /// Path to the items JSON file.
        path: PathBuf,
        /// Record failed items as `{"error": ...}` instead of aborting.
        #[arg(long)]
        continue_on_fail: bool,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Validate the items of a JSON file without contacting any service.
    Validate {
        /// Path to the items JSON file.
        path: PathBuf,
        #[arg(long, value_enum, default_value_t = Mode::Uri)]
        mode: Mode,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    /// Let Gemini fetch the video from its URL.
    Uri,
    /// Download the video and send it inline as base64.
    Inline,
}

impl From<Mode> for IngestMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Uri => IngestMode::UriReference,
            Mode::Inline => IngestMode::InlineBytes,
        }
    }
}

#[derive(Args)]
struct RunArgs {
    #[arg(long, value_enum, default_value_t = Mode::Uri)]
    mode: Mode,
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: String,
    #[arg(long, env = "GEMINI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,
    /// Timeout for each download and each generation call, in seconds.
    #[arg(long, default_value_t = 300)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Analyze {
            video_url,
            prompt,
            model,
            temperature,
            max_video_size_mb,
            run,
        } => {
            let mut options = serde_json::Map::new();
            if let Some(t) = temperature {
                options.insert("temperature".into(), json!(t));
            }
            if let Some(m) = max_video_size_mb {
                options.insert("maxVideoSizeMB".into(), json!(m));
            }
            let mut item = json!({
                "videoUrl": video_url,
                "customPrompt": prompt,
                "options": options,
            });
            if let Some(model) = model {
                item["model"] = json!(model);
            }
            run_batch(vec![item], &run, FailurePolicy::FailFast).await
        }
        Command::Batch {
            path,
            continue_on_fail,
            run,
        } => {
            let items = read_items(&path)?;
            let policy = if continue_on_fail {
                FailurePolicy::ContinueOnFailure
            } else {
                FailurePolicy::FailFast
            };
            run_batch(items, &run, policy).await
        }
        Command::Validate { path, mode } => {
            let items = read_items(&path)?;
            let mut invalid = 0usize;
            for (i, item) in items.iter().enumerate() {
                match VideoAnalysisParams::resolve(item, mode.into()) {
                    Ok(params) => println!("✅ item {i}: {} with {}", params.video_url, params.model),
                    Err(e) => {
                        eprintln!("❌ item {i}: {e}");
                        invalid += 1;
                    }
                }
            }
            if invalid > 0 {
                eprintln!("{invalid} of {} items invalid", items.len());
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

async fn run_batch(items: Vec<Value>, run: &RunArgs, policy: FailurePolicy) -> anyhow::Result<()> {
    let timeout = Duration::from_secs(run.timeout_secs);

    // One client for the whole run, shared by every item.
    let client = GeminiClient::new(
        &run.api_key,
        GeminiConfig {
            base_url: run.base_url.clone(),
            timeout,
        },
    )?;
    let fetcher = VideoFetcher::new(FetcherConfig { timeout })?;
    let node = VideoAnalysisNode::new(Arc::new(client), fetcher, run.mode.into());
    let runner = BatchRunner::new(
        Arc::new(node),
        BatchConfig {
            failure_policy: policy,
        },
    );

    let token = CancellationToken::new();
    let on_signal = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the current item");
            on_signal.cancel();
        }
    });

    info!("Analyzing {} item(s) in {:?} mode", items.len(), run.mode);
    let outcome = runner.run(items, &token).await?;
    if outcome.cancelled {
        warn!("run cancelled; printing {} completed item(s)", outcome.items.len());
    }

    println!("{}", serde_json::to_string_pretty(&outcome.items)?);
    Ok(())
}

fn read_items(path: &Path) -> anyhow::Result<Vec<Value>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read file {}", path.display()))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("invalid JSON in {}", path.display()))?;

    Ok(match value {
        Value::Array(items) => items,
        single => vec![single],
    })
}
