//! `forgehand check-trigger`: evaluate the trigger without touching the
//! tracking comment or the checkout.

use std::path::{Path, PathBuf};

use forgehand_core::{Error, RepoId};
use forgehand_trigger::{evaluate, match_event};
use serde_json::json;

use super::{Outcome, load_config, load_event, print_json};

pub async fn run(
    config_path: Option<&Path>,
    event_name: Option<String>,
    event_path: Option<PathBuf>,
    offline: bool,
) -> Outcome {
    let config = load_config(config_path)?;
    let fallback = config
        .repository
        .as_deref()
        .map(RepoId::parse)
        .transpose()?;
    let ctx = load_event(&config, event_name, event_path, fallback.as_ref())?;

    if offline {
        let reason = match_event(&ctx, &config.trigger)?;
        print_json(&json!({
            "should_activate": reason.activates(),
            "trigger_username": ctx.actor,
            "reason": reason,
        }))?;
        return Ok(true);
    }

    let token = config
        .forge
        .token
        .as_deref()
        .ok_or_else(|| Error::config("forge token is not configured (or pass --offline)"))?;
    let forge = forgehand_forge::connect(&config.profile(), &config.forge.api_url, token)?;
    let decision = evaluate(&ctx, &config.trigger, forge.as_ref()).await?;
    print_json(&decision)?;
    Ok(true)
}
