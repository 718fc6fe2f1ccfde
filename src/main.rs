#![forbid(unsafe_code)]

//! `redteam-console` — headless supervisor binary.
//!
//! Stands in for the browser page: starts a run against the configured
//! backend, prints the transcript as it grows, answers pending
//! human-action requests from stdin, and dumps the final authoritative
//! snapshot when the run ends.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use redteam_console::models::message::{ActivityStatus, Message, Role};
use redteam_console::models::session::RunParams;
use redteam_console::state::RunShared;
use redteam_console::{AppError, ClientConfig, Result, RunSupervisor};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "redteam-console", about = "Supervise a remote pentest agent run", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. Overrides --backend.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Backend base URL used when no config file is given.
    #[arg(long, default_value = "http://127.0.0.1:8000")]
    backend: String,

    /// Target URL or host to assess.
    #[arg(long)]
    target: String,

    /// Natural-language objective for the agent.
    #[arg(long)]
    goal: String,

    /// Model identifier the backend should run.
    #[arg(long)]
    model: String,

    /// Optional URL the agent uses to verify success.
    #[arg(long, default_value = "")]
    verify_url: String,

    /// Optional string the agent looks for at the verification URL.
    #[arg(long, default_value = "")]
    verify_str: String,

    /// Optional login username for authenticated targets.
    #[arg(long, default_value = "")]
    username: String,

    /// Optional login password for authenticated targets.
    #[arg(long, default_value = "")]
    password: String,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    let config = match &args.config {
        Some(path) => ClientConfig::load_from_path(path)?,
        None => ClientConfig::new(args.backend.clone())?,
    };
    info!(backend = %config.backend_url, "configuration loaded");

    let supervisor = RunSupervisor::new(config)?;
    let shared = supervisor.shared();

    supervisor
        .start_run(RunParams {
            target: args.target,
            goal: args.goal,
            model: args.model,
            verify_url: args.verify_url,
            verify_str: args.verify_str,
            username: args.username,
            password: args.password,
        })
        .await?;

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut printed = 0usize;
    let mut answered_action: Option<String> = None;

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if result.is_ok() {
                    supervisor.stop_run().await?;
                }
                break;
            }

            () = tokio::time::sleep(Duration::from_millis(200)) => {
                printed = print_new_messages(&shared, printed).await;

                if let Some(pending) = shared.pending_action() {
                    if answered_action.as_deref() != Some(pending.action_id.as_str()) {
                        answered_action = Some(pending.action_id.clone());
                        println!("[action required] {}", pending.prompt);
                        if let Some(secs) = pending.remaining_seconds() {
                            println!("[action expires in {secs}s]");
                        }

                        let wait = pending
                            .remaining_seconds()
                            .map_or(Duration::from_secs(86_400), |secs| {
                                Duration::from_secs(secs.unsigned_abs())
                            });
                        tokio::select! {
                            line = stdin.next_line() => {
                                if let Ok(Some(text)) = line {
                                    supervisor.submit_action_response(text.trim());
                                }
                            }
                            () = tokio::time::sleep(wait) => {
                                println!("[action expired]");
                            }
                        }
                    }
                }

                if !shared.is_streaming() {
                    break;
                }
            }
        }
    }

    let _ = print_new_messages(&shared, printed).await;

    if let Some(snapshot) = shared.snapshot().await {
        let rendered = serde_json::to_string_pretty(&snapshot)
            .map_err(|err| AppError::Io(format!("failed to render snapshot: {err}")))?;
        println!("--- final state ---\n{rendered}");
    }
    Ok(())
}

/// Print transcript entries not yet shown; returns the new high-water
/// mark.
async fn print_new_messages(shared: &Arc<RunShared>, printed: usize) -> usize {
    let messages = shared.transcript_messages().await;
    for message in &messages[printed.min(messages.len())..] {
        println!("{}", render_message(message));
    }
    messages.len()
}

fn render_message(message: &Message) -> String {
    let role = match message.role {
        Role::User => "user",
        Role::Assistant => "agent",
        Role::System => "system",
        Role::Tool => "tool",
        Role::Diagnostic => "diag",
    };
    let status = match message.status {
        Some(ActivityStatus::Running) => " [running]",
        Some(ActivityStatus::Completed) => " [completed]",
        Some(ActivityStatus::Failed) => " [failed]",
        None => "",
    };
    let error = if message.is_error { " [error]" } else { "" };
    format!("{role}{status}{error}: {}", message.text)
}

fn init_tracing(format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    let result = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))
}
