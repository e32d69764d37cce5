// src/main.rs

use chrono::Utc;
use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;

mod config;
mod core;
mod logging;
mod server;

use crate::config::Config;
use crate::core::catalog::{self, AVAILABLE_TOOLS};
use crate::core::controller::{HttpExecClient, ScanController};
use crate::core::models::ToolId;
use crate::core::report;

#[derive(Parser)]
#[command(
    name = "autorecon",
    version,
    about = "Drives external recon tools against a target domain and aggregates the results"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the local command-execution service.
    Serve,
    /// Run a sequential scan against one target domain.
    Scan {
        /// Target domain (a pasted URL is reduced to its host).
        target: String,
        /// Comma-separated tool ids to run (default: the full catalog).
        #[arg(long, value_delimiter = ',')]
        tools: Vec<ToolId>,
        /// Write the markdown report here; "auto" derives the filename
        /// from the target.
        #[arg(long)]
        report: Option<String>,
        /// Base URL of the execution service.
        #[arg(long)]
        service_url: Option<String>,
    },
    /// List the tool catalog.
    Tools,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve => {
            logging::initialize_logging(true)?;
            server::serve(Config::from_env()).await
        }
        Commands::Scan {
            target,
            tools,
            report,
            service_url,
        } => {
            logging::initialize_logging(false)?;
            run_scan(&target, &tools, report.as_deref(), service_url).await
        }
        Commands::Tools => {
            list_tools();
            Ok(())
        }
    }
}

/// Drives one full scan from the command line: enables the requested tools,
/// runs the controller, prints the session feed and per-tool outputs, and
/// optionally writes the report.
async fn run_scan(
    target: &str,
    tools: &[ToolId],
    report_path: Option<&str>,
    service_url: Option<String>,
) -> Result<()> {
    let mut config = Config::from_env();
    if let Some(url) = service_url {
        config.service_url = url.trim_end_matches('/').to_string();
    }

    let transport = HttpExecClient::new(config.service_url.clone());
    let mut controller = ScanController::new(transport, config.service_url.clone());
    if tools.is_empty() {
        let all: Vec<ToolId> = AVAILABLE_TOOLS.iter().map(|t| t.id).collect();
        controller.enable_only(&all)?;
    } else {
        controller.enable_only(tools)?;
    }

    controller.start_scan(target).await?;

    let session = controller.session();
    for entry in &session.logs {
        println!(
            "{} [{:<7}] {}",
            entry.timestamp.format("%H:%M:%S"),
            entry.level.to_string(),
            entry.message
        );
    }

    for &tool in &session.queue {
        if let Some(result) = session.results.get(&tool) {
            println!();
            println!(
                "=== [{}] {} ({}) ===",
                catalog::display_name(tool),
                result.status,
                result.duration.as_deref().unwrap_or("-")
            );
            println!("{}", result.output);
        }
    }

    if let Some(path) = report_path {
        let document = report::render_report(session, Utc::now());
        let path = if path == "auto" {
            report::report_filename(&session.target)
        } else {
            path.to_string()
        };
        std::fs::write(&path, document)?;
        println!("\nReport written to {path}");
    }

    Ok(())
}

fn list_tools() {
    for tool in AVAILABLE_TOOLS {
        println!(
            "{:<12} {:<13} {:<14} {}",
            tool.id.to_string(),
            tool.category.to_string(),
            tool.name,
            tool.command_display
        );
        println!("{:<12} {}", "", tool.description);
    }
}
