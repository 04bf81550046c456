//! forgehand CLI — the main entry point.
//!
//! Commands:
//! - `run`           — Handle one forge event end to end
//! - `check-trigger` — Evaluate the trigger for an event without side effects
//! - `tools`         — Print the resolved tool sets
//! - `tool-config`   — Print the tool-provider JSON handed to the agent
//! - `doctor`        — Diagnose the job environment

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "forgehand",
    about = "forgehand — runs a coding agent against forge issues and pull requests",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ./forgehand.toml when present)
    #[arg(short, long, global = true, env = "FORGEHAND_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(clap::Args)]
struct EventArgs {
    /// Event name, overriding GITHUB_EVENT_NAME
    #[arg(long)]
    event_name: Option<String>,

    /// Path to the event payload, overriding GITHUB_EVENT_PATH
    #[arg(long)]
    event_path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Handle one forge event: trigger, branch, agent, tracking comment
    Run {
        #[command(flatten)]
        event: EventArgs,

        /// Also write the job report as JSON to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Evaluate the trigger for an event
    CheckTrigger {
        #[command(flatten)]
        event: EventArgs,

        /// Only match the event text; skip actor and permission lookups
        #[arg(long)]
        offline: bool,
    },

    /// Print the allowed and disallowed tool sets
    Tools {
        /// Resolve for a pull request rather than an issue
        #[arg(long)]
        pr: bool,
    },

    /// Print the tool-provider configuration
    ToolConfig {
        /// Working branch
        #[arg(long, default_value = "main")]
        branch: String,

        /// Base branch
        #[arg(long, default_value = "main")]
        base_branch: String,

        /// Tracking comment id
        #[arg(long)]
        comment_id: Option<u64>,
    },

    /// Diagnose the job environment
    Doctor,
}

fn init_tracing(verbose: bool, json: bool) {
    let filter = if verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Run { event, report } => {
            commands::run::run(config, event.event_name, event.event_path, report).await
        }
        Commands::CheckTrigger { event, offline } => {
            commands::check_trigger::run(config, event.event_name, event.event_path, offline)
                .await
        }
        Commands::Tools { pr } => commands::tools::list(config, pr),
        Commands::ToolConfig {
            branch,
            base_branch,
            comment_id,
        } => commands::tools::provider_config(config, branch, base_branch, comment_id),
        Commands::Doctor => commands::doctor::run(config).await,
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
