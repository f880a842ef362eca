//! Telebridge CLI - operate call bridges and the orchestrator
//!
//! Thin client over the Telebridge admin API.

mod api;
mod config;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::Colorize;
use dialoguer::Password;
use tracing_subscriber::EnvFilter;

use api::{OrchestratorStatus, TelebridgeClient};
use config::Config;

#[derive(Parser)]
#[command(name = "telebridge")]
#[command(about = "Telebridge CLI - call bridges and contact-center handoff", long_about = None)]
#[command(version)]
struct Cli {
    /// Log HTTP traffic to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Login and store API key
    Login {
        /// API key (will prompt if not provided)
        #[arg(short, long)]
        key: Option<String>,
        /// Server base URL (e.g. https://bridge.example.com)
        #[arg(short, long)]
        url: Option<String>,
    },

    /// Show current configuration
    Config,

    /// Show orchestrator status and tracked contact-center calls
    Status,

    /// List live call bridges
    Sessions,

    /// Start the orchestrator
    Start,

    /// Stop the orchestrator and end tracked calls
    Stop,

    /// Force a tracked call over to a human skill
    Transfer {
        /// Orchestrator call ID (see `telebridge status`)
        call_id: String,
        /// Target skill (defaults to the server's configured skill)
        #[arg(short, long)]
        skill: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("telebridge=debug,reqwest=debug"))
            .with_writer(std::io::stderr)
            .init();
    }

    match cli.command {
        Commands::Login { key, url } => cmd_login(key, url).await,
        Commands::Config => cmd_config(),
        Commands::Status => cmd_status().await,
        Commands::Sessions => cmd_sessions().await,
        Commands::Start => cmd_start().await,
        Commands::Stop => cmd_stop().await,
        Commands::Transfer { call_id, skill } => cmd_transfer(call_id, skill).await,
    }
}

// ============================================
// Command Implementations
// ============================================

fn client() -> Result<TelebridgeClient> {
    let config = Config::load()?;
    let api_key = config.require_api_key()?;
    Ok(TelebridgeClient::new(&config.base_url, api_key))
}

async fn cmd_login(key: Option<String>, url: Option<String>) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(url) = url {
        config.set_base_url(&url);
    }

    let api_key = match key {
        Some(k) => k,
        None => Password::new()
            .with_prompt("API Key")
            .interact()
            .context("Failed to read API key")?,
    };

    // Test connection
    let client = TelebridgeClient::new(&config.base_url, &api_key);
    print!("Testing connection... ");

    match client.health().await {
        Ok(true) => {}
        _ => {
            println!("{}", "Failed".red());
            bail!("Could not reach Telebridge at {}", config.base_url);
        }
    }
    if let Err(e) = client.verify_key().await {
        println!("{}", "Failed".red());
        bail!("API key rejected: {}", e);
    }
    println!("{}", "OK".green());

    config.api_key = Some(api_key);
    let path = config.save()?;

    println!("{} API key saved to {}", "✓".green(), path.display());
    Ok(())
}

fn cmd_config() -> Result<()> {
    let config = Config::load()?;

    println!("{}", "Configuration:".bold());
    println!("  Path: {}", Config::config_path()?.display());
    println!("  Base URL: {}", config.base_url);
    println!(
        "  API Key: {}",
        if config.api_key.is_some() {
            "Set".green()
        } else {
            "Not set".red()
        }
    );

    Ok(())
}

async fn cmd_status() -> Result<()> {
    let status = client()?.orchestrator_status().await?;
    print_status(&status);
    Ok(())
}

async fn cmd_sessions() -> Result<()> {
    let sessions = client()?.list_sessions().await?;

    if sessions.is_empty() {
        println!("No call sessions.");
        return Ok(());
    }

    println!("{}", "Sessions:".bold());
    for session in sessions {
        let state = match session.state.as_str() {
            "streaming" => session.state.green(),
            "transferring" => session.state.yellow(),
            "ended" => session.state.dimmed(),
            _ => session.state.normal(),
        };
        let duration = session
            .duration_ms
            .map(|ms| ms / 1000)
            .unwrap_or_else(|| (Utc::now() - session.start_time).num_seconds());
        let queue = session
            .transfer_queue
            .map(|q| format!(" → {}", q))
            .unwrap_or_default();

        println!(
            "  {} {} [{}] {}s{}",
            session.call_id.cyan(),
            session.caller,
            state,
            duration,
            queue.yellow()
        );
        println!(
            "    {}",
            format!(
                "in {} / out {} packets, {} utterances, {} responses, {} tools",
                session.stats.audio_packets_received,
                session.stats.audio_packets_sent,
                session.stats.user_utterances,
                session.stats.agent_responses,
                session.stats.tool_calls
            )
            .dimmed()
        );
    }

    Ok(())
}

async fn cmd_start() -> Result<()> {
    let status = client()?.start_orchestrator().await?;
    println!("{} Orchestrator started", "✓".green());
    print_status(&status);
    Ok(())
}

async fn cmd_stop() -> Result<()> {
    let status = client()?.stop_orchestrator().await?;
    println!("{} Orchestrator stopped", "✓".green());
    print_status(&status);
    Ok(())
}

async fn cmd_transfer(call_id: String, skill: Option<String>) -> Result<()> {
    let result = client()?.force_transfer(&call_id, skill).await?;

    match result.status.as_str() {
        "completed" => println!(
            "{} Call {} transferred to skill {}",
            "✓".green(),
            result.call_id.cyan(),
            result.skill_id.as_deref().unwrap_or("-")
        ),
        "already_in_progress" => println!(
            "{} Call {} is already being transferred",
            "!".yellow(),
            result.call_id.cyan()
        ),
        _ => bail!(
            "Transfer of {} failed: {}",
            result.call_id,
            result.error.as_deref().unwrap_or("unknown error")
        ),
    }

    Ok(())
}

fn print_status(status: &OrchestratorStatus) {
    let running = if status.is_running {
        "running".green()
    } else {
        "stopped".red()
    };
    println!(
        "{} {} ({} active calls)",
        "Orchestrator:".bold(),
        running,
        status.active_calls
    );

    for call in &status.calls {
        let elapsed = (Utc::now() - call.start_time).num_seconds();
        let marker = if call.should_transfer {
            " transferring".yellow().to_string()
        } else {
            String::new()
        };
        println!(
            "  {} agent {} {} {}s{}",
            call.call_id.cyan(),
            call.agent_id,
            call.phone_number.dimmed(),
            elapsed,
            marker
        );
    }
}
