//! `forgehand doctor`: diagnose the job environment.

use std::path::Path;

use forgehand_branch::ProcessGit;
use forgehand_config::JobConfig;
use forgehand_core::GitOps;

use super::Outcome;

pub async fn run(config_path: Option<&Path>) -> Outcome {
    println!("forgehand doctor");
    println!("================\n");

    let mut issues = 0;

    let config = match JobConfig::load(config_path) {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            return Ok(false);
        }
    };

    let profile = config.profile();
    println!(
        "  ℹ️  Forge: {} ({})",
        profile.kind.as_str(),
        config.forge.api_url
    );
    println!("  ℹ️  Web URL: {}", config.server_url());

    let repo = match config.require_run_settings() {
        Ok(repo) => {
            println!("  ✅ Token and repository configured ({repo})");
            Some(repo)
        }
        Err(e) => {
            println!("  ❌ {e}");
            issues += 1;
            None
        }
    };

    if config.agent.command.is_empty() {
        println!("  ❌ No agent command — set agent.command or AGENT_COMMAND");
        issues += 1;
    } else {
        println!("  ✅ Agent command: {}", config.agent.command.join(" "));
    }

    match (config.event_name.as_deref(), config.event_path.as_deref()) {
        (Some(name), Some(path)) if path.exists() => {
            println!("  ✅ Event: {name} ({})", path.display());
        }
        (Some(_), Some(path)) => {
            println!("  ❌ Event payload missing: {}", path.display());
            issues += 1;
        }
        _ => println!("  ⚠️  No event configured — `run` needs GITHUB_EVENT_NAME and GITHUB_EVENT_PATH"),
    }

    let workspace = config.workspace_dir();
    let git = ProcessGit::new(&workspace);
    match git.current_branch().await {
        Ok(branch) => println!("  ✅ Git checkout at {} on {branch}", workspace.display()),
        Err(e) => {
            println!("  ❌ Git unavailable in {}: {e}", workspace.display());
            issues += 1;
        }
    }

    if let (Some(repo), Some(token)) = (repo, config.forge.token.as_deref()) {
        match forgehand_forge::connect(&profile, &config.forge.api_url, token) {
            Ok(forge) => match forge.get_repository(&repo).await {
                Ok(info) => println!("  ✅ Forge reachable, default branch {}", info.default_branch),
                Err(e) => {
                    println!("  ❌ Forge request failed: {e}");
                    issues += 1;
                }
            },
            Err(e) => {
                println!("  ❌ Forge client: {e}");
                issues += 1;
            }
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
        Ok(true)
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
        Ok(false)
    }
}
