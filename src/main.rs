//! veracity: claim verification service and CLI
//!
//! Usage:
//!   veracity serve [--bind 127.0.0.1:5000]
//!   veracity check "The earth is flat" [--source URL] [--json]

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use veracity::clients::build_collaborators;
use veracity::config::{Config, RuntimeConfig};
use veracity::http::{FactCheckResponse, start_http_server};
use veracity::pipeline::StageOrchestrator;

#[derive(Parser)]
#[command(name = "veracity")]
#[command(about = "Evidence-backed claim verification", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API (POST /fact-check, GET /health)
    Serve {
        /// Address to listen on; overrides VERACITY_HTTP_BIND
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Verify a single claim and print the result
    Check {
        claim: String,
        /// URL of the page the claim came from
        #[arg(long)]
        source: Option<String>,
        /// Print the response as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging comes up before the config so load warnings are visible.
    let _ = dotenvy::dotenv();
    let runtime = RuntimeConfig::load_from_env();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&runtime.log_level))
        .with_ansi(!runtime.no_ansi)
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    if let Commands::Serve { bind: Some(bind) } = &cli.command {
        config.runtime.http_bind = *bind;
    }
    let config = Arc::new(config);

    let collaborators = build_collaborators(&config).await?;
    let orchestrator = Arc::new(StageOrchestrator::new(config.clone(), collaborators));

    match cli.command {
        Commands::Serve { .. } => serve(&config, orchestrator).await,
        Commands::Check {
            claim,
            source,
            json,
        } => check(&orchestrator, &claim, source.as_deref(), json).await,
    }
}

async fn serve(config: &Config, orchestrator: Arc<StageOrchestrator>) -> Result<()> {
    info!("veracity {} starting", env!("CARGO_PKG_VERSION"));
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
        info!("shutting down");
    };
    start_http_server(config, orchestrator, shutdown).await
}

async fn check(
    orchestrator: &StageOrchestrator,
    claim: &str,
    source: Option<&str>,
    json: bool,
) -> Result<()> {
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted; finishing with what has been gathered");
            on_signal.cancel();
        }
    });

    let state = orchestrator.run_with_cancel(claim, source, cancel).await?;
    let response = FactCheckResponse::from_state(&state)
        .ok_or_else(|| anyhow::anyhow!("pipeline finished without a summary"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    println!(
        "Verdict: {} (confidence {:.2})",
        response.verdict, response.confidence
    );
    println!();
    println!("{}", response.summary);
    if !response.key_findings.is_empty() {
        println!();
        println!("Key findings:");
        for finding in &response.key_findings {
            println!("  [{:?}] {}", finding.relevance, finding.finding);
            println!("         {}", finding.source);
        }
    }
    if !response.sources.is_empty() {
        println!();
        println!("Sources:");
        for source in &response.sources {
            println!(
                "  {:.2} {:?}  {}",
                source.trust_score, source.reliability, source.url
            );
        }
    }
    let errors = state.messages().errors().count();
    if errors > 0 {
        eprintln!();
        eprintln!("{} stage error(s); run with RUST_LOG=veracity=debug for details", errors);
    }
    Ok(())
}
