//! Request Arbiter CLI
//!
//! Inspect configuration and replay wallet requests against an in-memory wallet.

use clap::{Parser, Subcommand, ValueEnum};
use request_arbiter::interceptors::AuditLogInterceptor;
use request_arbiter::memory::{Fixture, MemoryWallet};
use request_arbiter::{Config, Decision, Error, Request, RequestArbiter, Result};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "arbiter")]
#[command(about = "Approval-gated wallet request arbiter")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show current configuration
    Config,

    /// Run one request through the pipeline against an in-memory wallet
    Replay {
        /// Wallet fixture (accounts, links, keys, chain behaviour) as JSON
        #[arg(short, long)]
        fixture: PathBuf,

        /// Request to replay as JSON
        #[arg(short, long)]
        request: PathBuf,

        /// How to answer the approval prompt
        #[arg(short, long, value_enum, default_value_t = DecisionArg::Approve)]
        decision: DecisionArg,

        /// Decision payload as JSON
        #[arg(short, long)]
        payload: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DecisionArg {
    Approve,
    Reject,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    let fmt_layer = if cli.log_json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer().with_writer(std::io::stderr).boxed()
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .init();

    let config = Config::load(cli.config.as_deref())?.with_env_overrides()?;

    match cli.command {
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Replay {
            fixture,
            request,
            decision,
            payload,
        } => {
            run_replay(&config, &fixture, &request, decision, payload).await?;
        }
    }

    Ok(())
}

/// Read a request file, assigning a fresh id when it has none.
fn load_request(path: &Path) -> Result<Request> {
    let content = std::fs::read_to_string(path)?;
    let mut value: Value = serde_json::from_str(&content)?;
    if let Value::Object(fields) = &mut value {
        fields
            .entry("id")
            .or_insert_with(|| json!(uuid::Uuid::new_v4().to_string()));
    }
    serde_json::from_value(value)
        .map_err(|e| Error::InvalidArgument(format!("request {}: {}", path.display(), e)))
}

fn decision_from(arg: DecisionArg, payload: Option<String>) -> Result<Decision> {
    let payload = payload
        .map(|raw| serde_json::from_str::<Value>(&raw))
        .transpose()
        .map_err(|e| Error::InvalidArgument(format!("--payload is not JSON: {}", e)))?;

    Ok(match arg {
        DecisionArg::Approve => Decision::approve(payload.unwrap_or_else(|| json!({}))),
        DecisionArg::Reject => Decision::reject(payload.unwrap_or_else(|| json!("User rejected"))),
    })
}

async fn run_replay(
    config: &Config,
    fixture_path: &Path,
    request_path: &Path,
    decision: DecisionArg,
    payload: Option<String>,
) -> Result<()> {
    let fixture = Fixture::load(fixture_path)?;
    let request = load_request(request_path)?;
    let decision = decision_from(decision, payload)?;

    let (wallet, mut prompts) = MemoryWallet::from_fixture(&fixture, config);
    let mut arbiter = RequestArbiter::new(wallet.collaborators(), config);
    if let Some(path) = &config.audit_log_path {
        tracing::info!(path = %path, "Writing audit log");
        arbiter = arbiter.with_interceptor(Arc::new(AuditLogInterceptor::new(path)));
    }

    tracing::debug!(
        chains = ?wallet.registry.identifiers().collect::<Vec<_>>(),
        "Registered in-memory chains"
    );
    tracing::info!(
        request_id = %request.id,
        kind = %request.kind,
        chain = %request.chain,
        "Replaying request"
    );

    let handle = arbiter.handle(request);
    tokio::pin!(handle);
    let envelope = tokio::select! {
        envelope = &mut handle => envelope,
        Some(prompt) = prompts.recv() => {
            println!("{}", serde_json::to_string_pretty(&json!({ "prompt": prompt }))?);
            let outcome = arbiter.decide(&prompt.request.id, decision);
            tracing::debug!(?outcome, "Decision delivered");
            handle.await
        }
    };

    println!("{}", serde_json::to_string_pretty(&envelope)?);
    for message in wallet.notifier.messages() {
        tracing::info!(message = %message, "Notification");
    }
    Ok(())
}
