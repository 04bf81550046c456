pub mod check_trigger;
pub mod doctor;
pub mod run;
pub mod tools;

use std::path::{Path, PathBuf};

use forgehand_config::JobConfig;
use forgehand_core::{Error, EventContext, RepoId, Result};

/// Every command returns `Ok(false)` for a handled failure (non-zero exit
/// without an error message of its own).
pub type Outcome = Result<bool>;

pub fn load_config(path: Option<&Path>) -> Result<JobConfig> {
    Ok(JobConfig::load(path)?)
}

/// Read and parse the event payload named by flags or configuration.
pub fn load_event(
    config: &JobConfig,
    event_name: Option<String>,
    event_path: Option<PathBuf>,
    repo: Option<&RepoId>,
) -> Result<EventContext> {
    let name = event_name
        .or_else(|| config.event_name.clone())
        .ok_or_else(|| Error::config("no event name (set GITHUB_EVENT_NAME or --event-name)"))?;
    let path = event_path
        .or_else(|| config.event_path.clone())
        .ok_or_else(|| Error::config("no event payload (set GITHUB_EVENT_PATH or --event-path)"))?;

    let raw = std::fs::read_to_string(&path)
        .map_err(|e| Error::config(format!("cannot read event payload {}: {e}", path.display())))?;
    let payload: serde_json::Value = serde_json::from_str(&raw)?;
    EventContext::from_payload(&name, &payload, repo)
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
