//! Configuration loading, validation, and management for forgehand.
//!
//! A job is configured from an optional TOML file with environment
//! variable overrides on top (the CI runner exports most settings as
//! environment variables). Validated once at startup; any problem here is
//! fatal before the forge sees a side effect.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use forgehand_core::{ForgeKind, ProviderProfile, RepoId};
use serde::{Deserialize, Serialize};

/// Default web URL when neither an override nor the runner provides one.
pub const DEFAULT_SERVER_URL: &str = "https://github.com";

/// Default config file name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "forgehand.toml";

/// The root configuration structure.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct JobConfig {
    /// Forge connection settings
    #[serde(default)]
    pub forge: ForgeConfig,

    /// `owner/repo` slug
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,

    /// CI run identifier, used for the job-run link
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,

    /// Webhook event name (e.g. `issue_comment`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,

    /// Path to the webhook payload JSON
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_path: Option<PathBuf>,

    /// Working directory of the checkout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<PathBuf>,

    #[serde(default)]
    pub trigger: TriggerConfig,

    #[serde(default)]
    pub branch: BranchConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub comment: CommentConfig,

    #[serde(default)]
    pub agent: AgentConfig,
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for JobConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobConfig")
            .field("forge", &self.forge)
            .field("repository", &self.repository)
            .field("run_id", &self.run_id)
            .field("event_name", &self.event_name)
            .field("event_path", &self.event_path)
            .field("workspace", &self.workspace)
            .field("trigger", &self.trigger)
            .field("branch", &self.branch)
            .field("tools", &self.tools)
            .field("comment", &self.comment)
            .field("agent", &self.agent)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ForgeConfig {
    /// Explicit forge family; derived from `api_url` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ForgeKind>,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Explicit web URL override (highest priority)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,

    /// Web URL provided by the CI platform (second priority)
    #[serde(skip)]
    pub ambient_server_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

fn default_api_url() -> String {
    forgehand_core::profile::GITHUB_API_URL.into()
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            kind: None,
            api_url: default_api_url(),
            server_url: None,
            ambient_server_url: None,
            token: None,
        }
    }
}

impl std::fmt::Debug for ForgeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForgeConfig")
            .field("kind", &self.kind)
            .field("api_url", &self.api_url)
            .field("server_url", &self.server_url)
            .field("ambient_server_url", &self.ambient_server_url)
            .field("token", &redact(&self.token))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerConfig {
    #[serde(default = "default_trigger_phrase")]
    pub trigger_phrase: String,

    /// Activate when an issue is assigned to this user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_trigger: Option<String>,

    /// Activate when this label is added
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_trigger: Option<String>,

    /// Bypasses phrase matching entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direct_prompt: Option<String>,

    /// Bypasses phrase matching and replaces the prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_prompt: Option<String>,
}

fn default_trigger_phrase() -> String {
    "@claude".into()
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            trigger_phrase: default_trigger_phrase(),
            assignee_trigger: None,
            label_trigger: None,
            direct_prompt: None,
            override_prompt: None,
        }
    }
}

impl TriggerConfig {
    /// Whether a direct or override prompt is configured.
    pub fn has_prompt_override(&self) -> bool {
        let set = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        set(&self.direct_prompt) || set(&self.override_prompt)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchConfig {
    /// Source branch for new branches; repository default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_branch: Option<String>,

    #[serde(default = "default_branch_prefix")]
    pub branch_prefix: String,

    /// Shallow depth when checking out an open PR's head
    #[serde(default = "default_fetch_depth")]
    pub fetch_depth: u32,

    #[serde(default = "default_remote")]
    pub remote: String,
}

fn default_branch_prefix() -> String {
    "claude/".into()
}
fn default_fetch_depth() -> u32 {
    20
}
fn default_remote() -> String {
    "origin".into()
}

impl Default for BranchConfig {
    fn default() -> Self {
        Self {
            base_branch: None,
            branch_prefix: default_branch_prefix(),
            fetch_depth: default_fetch_depth(),
            remote: default_remote(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// User allow-list, merged into the resolved allow set
    #[serde(default)]
    pub allowed_tools: Vec<String>,

    /// User deny-list, applied last
    #[serde(default)]
    pub disallowed_tools: Vec<String>,

    /// Grants the CI-introspection tool family on PRs
    #[serde(default)]
    pub read_ci: bool,

    /// Route commits through the forge API so they are signed
    #[serde(default)]
    pub commit_signing: bool,

    /// Command launching the forge-API tool provider
    #[serde(default = "default_forge_server_command")]
    pub forge_server_command: Vec<String>,

    /// Command launching the local-git tool provider
    #[serde(default = "default_git_server_command")]
    pub git_server_command: Vec<String>,
}

fn default_forge_server_command() -> Vec<String> {
    vec!["forgehand-forge-tools".into()]
}
fn default_git_server_command() -> Vec<String> {
    vec!["forgehand-git-tools".into()]
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            allowed_tools: vec![],
            disallowed_tools: vec![],
            read_ci: false,
            commit_signing: false,
            forge_server_command: default_forge_server_command(),
            git_server_command: default_git_server_command(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentConfig {
    /// Name shown in the comment header
    #[serde(default = "default_bot_name")]
    pub bot_name: String,

    #[serde(default = "default_spinner_url")]
    pub spinner_url: String,
}

fn default_bot_name() -> String {
    "Claude".into()
}
fn default_spinner_url() -> String {
    "https://github.com/user-attachments/assets/5ac382c7-e004-429b-8e35-7feb3e8f9c6f".into()
}

impl Default for CommentConfig {
    fn default() -> Self {
        Self {
            bot_name: default_bot_name(),
            spinner_url: default_spinner_url(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Program and arguments of the external agent
    #[serde(default)]
    pub command: Vec<String>,

    /// Extra environment passed to the agent process
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl JobConfig {
    /// Load from `path` (or `forgehand.toml` if present) and apply process
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        let mut config = Self::load_from(&path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    ///
    /// Empty values are treated as unset.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let first = |keys: &[&str]| keys.iter().find_map(|k| get(*k));

        if let Some(token) = first(&["FORGE_TOKEN", "GITEA_TOKEN", "GITHUB_TOKEN"]) {
            self.forge.token = Some(token);
        }
        if let Some(url) = first(&["FORGE_API_URL", "GITEA_API_URL", "GITHUB_API_URL"]) {
            self.forge.api_url = url;
        }
        if let Some(kind) = get("FORGE_KIND") {
            match kind.parse() {
                Ok(kind) => self.forge.kind = Some(kind),
                Err(e) => tracing::warn!("Ignoring FORGE_KIND: {e}"),
            }
        }
        if let Some(url) = get("FORGE_SERVER_URL") {
            self.forge.server_url = Some(url);
        }
        self.forge.ambient_server_url = get("GITHUB_SERVER_URL");

        if let Some(repo) = get("GITHUB_REPOSITORY") {
            self.repository = Some(repo);
        }
        if let Some(run_id) = get("GITHUB_RUN_ID") {
            self.run_id = Some(run_id);
        }
        if let Some(name) = get("GITHUB_EVENT_NAME") {
            self.event_name = Some(name);
        }
        if let Some(path) = get("GITHUB_EVENT_PATH") {
            self.event_path = Some(PathBuf::from(path));
        }
        if let Some(dir) = get("GITHUB_WORKSPACE") {
            self.workspace = Some(PathBuf::from(dir));
        }

        if let Some(phrase) = get("TRIGGER_PHRASE") {
            self.trigger.trigger_phrase = phrase;
        }
        if let Some(v) = get("ASSIGNEE_TRIGGER") {
            self.trigger.assignee_trigger = Some(v);
        }
        if let Some(v) = get("LABEL_TRIGGER") {
            self.trigger.label_trigger = Some(v);
        }
        if let Some(v) = get("DIRECT_PROMPT") {
            self.trigger.direct_prompt = Some(v);
        }
        if let Some(v) = get("OVERRIDE_PROMPT") {
            self.trigger.override_prompt = Some(v);
        }

        if let Some(v) = get("BASE_BRANCH") {
            self.branch.base_branch = Some(v);
        }
        if let Some(v) = get("BRANCH_PREFIX") {
            self.branch.branch_prefix = v;
        }

        if let Some(v) = get("ALLOWED_TOOLS") {
            self.tools.allowed_tools = parse_list(&v);
        }
        if let Some(v) = get("DISALLOWED_TOOLS") {
            self.tools.disallowed_tools = parse_list(&v);
        }
        if let Some(v) = get("ADDITIONAL_PERMISSIONS") {
            let perms = parse_permissions(&v);
            if perms.get("actions").is_some_and(|p| p == "read") {
                self.tools.read_ci = true;
            }
        }
        if let Some(v) = get("USE_COMMIT_SIGNING") {
            self.tools.commit_signing = parse_bool(&v);
        }

        if let Some(v) = get("AGENT_COMMAND") {
            self.agent.command = v.split_whitespace().map(str::to_string).collect();
        }
    }

    /// Structural validation. Required-for-run fields are checked by
    /// [`JobConfig::require_run_settings`].
    fn validate(&self) -> Result<(), ConfigError> {
        if self.trigger.trigger_phrase.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "trigger_phrase must not be empty".into(),
            ));
        }
        if self.branch.branch_prefix.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "branch_prefix must not be empty".into(),
            ));
        }
        if self.branch.fetch_depth == 0 {
            return Err(ConfigError::ValidationError(
                "fetch_depth must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Check everything a real run needs: token and repository.
    pub fn require_run_settings(&self) -> Result<RepoId, ConfigError> {
        if self.forge.token.is_none() {
            return Err(ConfigError::Missing {
                field: "forge.token".into(),
                env: "FORGE_TOKEN / GITHUB_TOKEN".into(),
            });
        }
        let slug = self.repository.as_deref().ok_or_else(|| ConfigError::Missing {
            field: "repository".into(),
            env: "GITHUB_REPOSITORY".into(),
        })?;
        RepoId::parse(slug).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }

    /// The capability profile for this job.
    pub fn profile(&self) -> ProviderProfile {
        match self.forge.kind {
            Some(kind) => ProviderProfile::for_kind(kind),
            None => ProviderProfile::from_api_url(&self.forge.api_url),
        }
    }

    /// Forge web URL: explicit override, then the runner's value, then the
    /// hardcoded default.
    pub fn server_url(&self) -> String {
        self.forge
            .server_url
            .as_deref()
            .or(self.forge.ambient_server_url.as_deref())
            .unwrap_or(DEFAULT_SERVER_URL)
            .trim_end_matches('/')
            .to_string()
    }

    /// Workspace directory, defaulting to the current directory.
    pub fn workspace_dir(&self) -> PathBuf {
        self.workspace
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Generate a TOML string of the default configuration.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

/// Split a comma- or newline-separated list, trimming and dropping blanks.
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split([',', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse `key: value` lines (e.g. `actions: read`).
pub fn parse_permissions(raw: &str) -> HashMap<String, String> {
    raw.lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, v)| !k.is_empty() && !v.is_empty())
        .collect()
}

fn parse_bool(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Missing required setting '{field}' (set {env})")]
    Missing { field: String, env: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for forgehand_core::Error {
    fn from(err: ConfigError) -> Self {
        forgehand_core::Error::config(err.to_string())
    }
}
