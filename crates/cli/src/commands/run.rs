//! `forgehand run`: handle one forge event end to end.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use forgehand_agent::{CommandExecutor, JobRunner};
use forgehand_branch::ProcessGit;
use forgehand_core::Error;
use tracing::info;

use super::{Outcome, load_config, load_event, print_json};

pub async fn run(
    config_path: Option<&Path>,
    event_name: Option<String>,
    event_path: Option<PathBuf>,
    report_path: Option<PathBuf>,
) -> Outcome {
    let config = load_config(config_path)?;
    let repo = config.require_run_settings()?;
    let ctx = load_event(&config, event_name, event_path, Some(&repo))?;

    let token = config
        .forge
        .token
        .as_deref()
        .ok_or_else(|| Error::config("forge token is not configured"))?;
    let forge = forgehand_forge::connect(&config.profile(), &config.forge.api_url, token)?;

    let workspace = config.workspace_dir();
    let git = Arc::new(ProcessGit::new(&workspace));
    let executor = Arc::new(
        CommandExecutor::new(&config.agent.command, &workspace)?
            .with_env(config.agent.env.clone()),
    );

    let runner = JobRunner::new(config, forge, git, executor);
    let report = runner.run(&ctx).await?;

    if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(&path, json).map_err(|e| {
            Error::config(format!("cannot write report to {}: {e}", path.display()))
        })?;
    }
    print_json(&report)?;

    if !report.activated() {
        info!(reason = %report.decision.reason, "Nothing to do");
    }
    Ok(report.succeeded())
}
