//! `forgehand tools` / `forgehand tool-config`: inspect what the agent
//! would be allowed to do.

use std::path::Path;

use forgehand_config::JobConfig;
use forgehand_tools::{CapabilityGate, ProviderEnv, ResolvedTools, ToolProviderConfig, ToolRequest};

use super::{Outcome, load_config, print_json};

fn resolve(config: &JobConfig, is_pr: bool) -> ResolvedTools {
    CapabilityGate::default().resolve(&ToolRequest {
        is_pr,
        read_ci: config.tools.read_ci,
        commit_signing: config.tools.commit_signing,
        user_allowed: config.tools.allowed_tools.clone(),
        user_disallowed: config.tools.disallowed_tools.clone(),
    })
}

pub fn list(config_path: Option<&Path>, is_pr: bool) -> Outcome {
    let config = load_config(config_path)?;
    let tools = resolve(&config, is_pr);
    println!("allowed:    {}", tools.allowed_csv());
    println!("disallowed: {}", tools.disallowed_csv());
    Ok(true)
}

pub fn provider_config(
    config_path: Option<&Path>,
    branch: String,
    base_branch: String,
    comment_id: Option<u64>,
) -> Outcome {
    let config = load_config(config_path)?;
    let (owner, repo) = config
        .repository
        .as_deref()
        .and_then(|slug| slug.split_once('/'))
        .map(|(o, r)| (o.to_string(), r.to_string()))
        .unwrap_or_default();

    let env = ProviderEnv {
        // Printed output never carries the real token
        token: "[REDACTED]".into(),
        owner,
        repo,
        branch,
        base_branch,
        repo_dir: config.workspace_dir(),
        api_url: config.forge.api_url.clone(),
        tracking_comment_id: comment_id,
    };
    let providers = ToolProviderConfig::build(&config.tools, &env)?;
    print_json(&providers)?;
    Ok(true)
}
