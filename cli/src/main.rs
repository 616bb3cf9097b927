use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use fraudwatch::logging::{init_logging, LogTarget};
use fraudwatch::{tui, HttpBackend};
use fraudwatch_core::model::{AgentSummary, Alert, AnalysisRecord, NewAgent, SystemStatus};
use fraudwatch_core::{
    ActionDispatcher, ActionOutcome, Backend, Config, Console, ConsoleError, ConsoleEvent, Poller,
    RefreshOutcome, Resource,
};

const REASONING_PREVIEW: usize = 60;

#[derive(Parser)]
#[command(name = "fraudwatch")]
#[command(about = "Live console for a fraud-detection backend", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "fraudwatch.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch the interactive console
    Tui {
        /// Override server URL from config
        #[arg(short, long)]
        server: Option<String>,
    },

    /// Poll in the foreground and print every change until Ctrl-C
    Watch {
        #[arg(long)]
        server: Option<String>,
        /// Override poll interval from config
        #[arg(long)]
        interval_ms: Option<u64>,
    },

    /// Show system status counters
    Status {
        /// Output raw JSON response
        #[arg(long)]
        json: bool,
        #[arg(long)]
        server: Option<String>,
    },

    /// List agents
    Agents {
        #[arg(long)]
        json: bool,
        #[arg(long)]
        server: Option<String>,
    },

    /// List recent analyses in server order
    Analyses {
        #[arg(long)]
        json: bool,
        #[arg(long)]
        server: Option<String>,
    },

    /// List alerts
    Alerts {
        #[arg(long)]
        json: bool,
        #[arg(long)]
        server: Option<String>,
    },

    /// Show one alert with its analysis details
    Alert {
        #[arg(short = 'i', long = "id")]
        alert_id: String,
        #[arg(long)]
        json: bool,
        #[arg(long)]
        server: Option<String>,
    },

    /// Acknowledge an alert
    Ack {
        #[arg(short = 'i', long = "id")]
        alert_id: String,
        #[arg(long)]
        server: Option<String>,
    },

    /// Create an agent watching the given accounts
    CreateAgent {
        #[arg(long)]
        name: String,
        /// Comma-separated account IDs
        #[arg(long, default_value = "")]
        accounts: String,
        #[arg(long)]
        server: Option<String>,
    },

    /// Start an agent
    StartAgent {
        #[arg(short = 'i', long = "id")]
        agent_id: String,
        #[arg(long)]
        server: Option<String>,
    },

    /// Stop an agent
    StopAgent {
        #[arg(short = 'i', long = "id")]
        agent_id: String,
        #[arg(long)]
        server: Option<String>,
    },

    /// Delete an agent (asks for confirmation)
    DeleteAgent {
        #[arg(short = 'i', long = "id")]
        agent_id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
        #[arg(long)]
        server: Option<String>,
    },

    /// Print the default configuration
    Config,
}

impl Commands {
    fn server(&self) -> Option<&str> {
        match self {
            Commands::Tui { server }
            | Commands::Watch { server, .. }
            | Commands::Status { server, .. }
            | Commands::Agents { server, .. }
            | Commands::Analyses { server, .. }
            | Commands::Alerts { server, .. }
            | Commands::Alert { server, .. }
            | Commands::Ack { server, .. }
            | Commands::CreateAgent { server, .. }
            | Commands::StartAgent { server, .. }
            | Commands::StopAgent { server, .. }
            | Commands::DeleteAgent { server, .. } => server.as_deref(),
            Commands::Config => None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Config = cli.command {
        print!("{}", Config::default_toml()?);
        return Ok(());
    }

    let config_found = cli.config.exists();
    let mut config = if config_found {
        Config::from_file(&cli.config)?
    } else {
        Config::default()
    };
    if let Some(server) = cli.command.server() {
        config.console.server_url = server.to_string();
    }
    config.validate()?;

    let target = match cli.command {
        Commands::Tui { .. } => LogTarget::Console,
        _ => LogTarget::Stderr,
    };
    init_logging(&config.logging, target)?;

    if config_found {
        info!("Loaded configuration from {:?}", cli.config);
    } else {
        debug!("Config file not found at {:?}, using defaults", cli.config);
    }

    let backend = HttpBackend::new(&config.console.server_url);

    match cli.command {
        Commands::Tui { .. } => tui::launch_tui(config).await?,
        Commands::Watch { interval_ms, .. } => {
            let interval = interval_ms
                .map(Duration::from_millis)
                .unwrap_or_else(|| config.console.poll_interval());
            if interval.is_zero() {
                bail!("interval must be greater than 0");
            }
            handle_watch(&config, interval).await?;
        }
        Commands::Status { json, .. } => handle_status(&backend, json).await?,
        Commands::Agents { json, .. } => handle_agents(&backend, json).await?,
        Commands::Analyses { json, .. } => {
            handle_analyses(&backend, config.console.high_risk_threshold, json).await?
        }
        Commands::Alerts { json, .. } => handle_alerts(&backend, json).await?,
        Commands::Alert { alert_id, json, .. } => handle_alert(&backend, &alert_id, json).await?,
        Commands::Ack { alert_id, .. } => handle_ack(&config, &alert_id).await?,
        Commands::CreateAgent { name, accounts, .. } => {
            let agent = NewAgent::from_form(&name, &accounts);
            if agent.name.is_empty() {
                bail!("agent name cannot be empty");
            }
            let dispatcher = dispatcher(&config);
            dispatcher
                .create_agent(&agent)
                .await
                .context("Failed to create agent")?;
            println!("✅ Agent '{}' created", agent.name);
        }
        Commands::StartAgent { agent_id, .. } => {
            dispatcher(&config)
                .start_agent(&agent_id)
                .await
                .context("Failed to start agent")?;
            println!("▶️  Agent {} started", agent_id);
        }
        Commands::StopAgent { agent_id, .. } => {
            dispatcher(&config)
                .stop_agent(&agent_id)
                .await
                .context("Failed to stop agent")?;
            println!("⏹️  Agent {} stopped", agent_id);
        }
        Commands::DeleteAgent { agent_id, yes, .. } => {
            let dispatcher = dispatcher(&config);
            let request = dispatcher.request_delete(&agent_id);
            if !yes && !confirm(&request.prompt())? {
                println!("Aborted; agent {} kept.", agent_id);
                return Ok(());
            }
            dispatcher
                .confirm_delete(request)
                .await
                .context("Failed to delete agent")?;
            println!("🗑️  Agent {} deleted", agent_id);
        }
        // Printed before the configuration is loaded.
        Commands::Config => {}
    }

    Ok(())
}

fn console(config: &Config) -> Console {
    let backend = Arc::new(HttpBackend::new(&config.console.server_url));
    Console::new(backend, &config.console)
}

fn dispatcher(config: &Config) -> ActionDispatcher {
    ActionDispatcher::new(console(config))
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("Failed to read confirmation")?;
    let answer = answer.trim();
    Ok(answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes"))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn preview(text: &str) -> String {
    let mut cut: String = text.chars().take(REASONING_PREVIEW).collect();
    if text.chars().count() > REASONING_PREVIEW {
        cut.push_str("...");
    }
    cut
}

async fn handle_watch(config: &Config, interval: Duration) -> Result<()> {
    let console = console(config);
    let mut events = console.subscribe();
    let mut poller = Poller::from_config(console.clone(), &config.console);
    poller.start(interval);

    println!(
        "👀 Watching {} every {:.1}s (Ctrl-C to stop)",
        config.console.server_url,
        interval.as_secs_f32()
    );

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            event = events.recv() => match event {
                Ok(ConsoleEvent::FieldChanged(change)) => {
                    println!(
                        "{} {}/{} {}: {} -> {}",
                        chrono::Utc::now().format("%H:%M:%S"),
                        change.field.resource,
                        change.field.key,
                        change.field.field,
                        change.previous,
                        change.current
                    );
                }
                Ok(ConsoleEvent::Notice(notice)) => {
                    println!("[{:?}] {}", notice.level, notice.message);
                }
                Ok(ConsoleEvent::Refreshed(resource)) => debug!(%resource, "refreshed"),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "dropped change notifications"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    poller.stop();
    println!("Stopped after {} poll cycles.", poller.cycles_started());
    Ok(())
}

async fn handle_status(backend: &HttpBackend, json: bool) -> Result<()> {
    let status: SystemStatus = backend
        .fetch_status()
        .await
        .context("Failed to fetch system status")?;

    if json {
        return print_json(&status);
    }

    println!("📊 System status");
    if let Some(health) = &status.status {
        println!("• Backend: {}", health);
    }
    println!(
        "• Agents: {} ({} running)",
        status.agents, status.running_agents
    );
    println!("• Events processed: {}", status.total_events);
    println!("• High-risk alerts: {}", status.high_risk_alerts);
    println!("• Active alerts: {}", status.active_alerts);
    if let Some(critical) = status.critical_alerts {
        println!("• Critical alerts: {}", critical);
    }
    Ok(())
}

async fn handle_agents(backend: &HttpBackend, json: bool) -> Result<()> {
    let agents: Vec<AgentSummary> = backend
        .fetch_agents()
        .await
        .context("Failed to fetch agents")?;

    if json {
        return print_json(&agents);
    }

    println!("🤖 Agents (total {})", agents.len());
    println!(
        "{:<38} {:<24} {:<8} {:>10} {:>8}",
        "AGENT", "NAME", "STATUS", "EVENTS", "ALERTS"
    );
    for agent in &agents {
        println!(
            "{:<38} {:<24} {:<8} {:>10} {:>8}",
            agent.agent_id,
            agent.name,
            agent.status,
            agent.events_processed,
            agent.alerts_generated
        );
    }
    Ok(())
}

async fn handle_analyses(backend: &HttpBackend, threshold: f64, json: bool) -> Result<()> {
    let analyses: Vec<AnalysisRecord> = backend
        .fetch_analyses()
        .await
        .context("Failed to fetch analyses")?;

    if json {
        return print_json(&analyses);
    }

    let high_risk = analyses.iter().filter(|a| a.risk_score > threshold).count();
    println!(
        "🔎 Recent analyses ({} total, {} above {:.2})",
        analyses.len(),
        high_risk,
        threshold
    );
    for analysis in &analyses {
        println!(
            "{}  {:.2}  {}",
            analysis.event_id,
            analysis.risk_score,
            analysis.timestamp.format("%H:%M:%S")
        );
        println!("    {}", preview(&analysis.reasoning));
        if !analysis.recommended_actions.is_empty() {
            println!("    Actions: {}", analysis.recommended_actions.join(", "));
        }
    }
    Ok(())
}

async fn handle_alerts(backend: &HttpBackend, json: bool) -> Result<()> {
    let alerts: Vec<Alert> = backend
        .fetch_alerts()
        .await
        .context("Failed to fetch alerts")?;

    if json {
        return print_json(&alerts);
    }

    println!("🚨 Alerts (total {})", alerts.len());
    println!(
        "{:<38} {:<9} {:<14} {:>5} {:<13} {}",
        "ALERT", "SEVERITY", "ACCOUNT", "RISK", "STATUS", "TIME"
    );
    for alert in &alerts {
        println!(
            "{:<38} {:<9} {:<14} {:>5.2} {:<13} {}",
            alert.alert_id,
            alert.severity,
            alert.account_id,
            alert.risk_score,
            alert.status,
            alert.timestamp.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}

async fn handle_alert(backend: &HttpBackend, alert_id: &str, json: bool) -> Result<()> {
    let alert = backend
        .fetch_alert(alert_id)
        .await
        .with_context(|| format!("Failed to fetch alert {}", alert_id))?;

    if json {
        return print_json(&alert);
    }

    println!("🔍 Alert {}", alert.alert_id);
    println!("• Event: {}", alert.event_id);
    println!("• Account: {}", alert.account_id);
    println!("• Severity: {}", alert.severity);
    println!("• Risk score: {:.2}", alert.risk_score);
    println!("• Status: {}", alert.status);
    println!(
        "• Timestamp: {}",
        alert.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    );

    let analysis = &alert.analysis_details;
    println!("\n⚠️  Fraud indicators:");
    for indicator in &analysis.fraud_indicators {
        println!("  • {}", indicator);
    }
    if !analysis.risk_breakdown.is_empty() {
        println!("\n📈 Risk breakdown:");
        for (factor, value) in &analysis.risk_breakdown {
            println!("  • {}: {}", factor, value);
        }
    }
    println!("\n🧠 Reasoning:\n  {}", analysis.reasoning);
    println!("\n✅ Recommended actions:");
    for action in &analysis.recommended_actions {
        println!("  • {}", action);
    }
    println!("\nSimilar events: {}", analysis.similar_events_count);
    println!(
        "\n🪵 Event details:\n{}",
        serde_json::to_string_pretty(&alert.event_details)?
    );
    Ok(())
}

async fn handle_ack(config: &Config, alert_id: &str) -> Result<()> {
    let dispatcher = dispatcher(config);

    // The lifecycle only acknowledges alerts it has seen.
    if let RefreshOutcome::Failed(e) = dispatcher.console().refresh(Resource::Alerts).await {
        return Err(e).context("Failed to fetch alerts");
    }

    match dispatcher.acknowledge_alert(alert_id).await {
        Ok(ActionOutcome::Applied) => println!("✅ Alert {} acknowledged", alert_id),
        Ok(ActionOutcome::Skipped) => println!("Alert {} is already acknowledged", alert_id),
        Err(ConsoleError::UnknownAlert(id)) => bail!("No alert with ID {}", id),
        Err(e) => return Err(e).context("Failed to acknowledge alert"),
    }
    Ok(())
}
