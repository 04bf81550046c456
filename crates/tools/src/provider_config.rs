//! Tool-provider configuration handed to the agent.
//!
//! Two providers: `forge` (forge API tools, always present) and `local_git`
//! (local commit/push tools, only when commits are not signed through the
//! forge API).

use std::collections::BTreeMap;
use std::path::PathBuf;

use forgehand_config::ToolsConfig;
use forgehand_core::{Error, Result};
use serde::{Deserialize, Serialize};

pub const FORGE_PROVIDER: &str = "forge";
pub const LOCAL_GIT_PROVIDER: &str = "local_git";

/// Job facts every provider receives in its environment.
#[derive(Clone)]
pub struct ProviderEnv {
    pub token: String,
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub base_branch: String,
    pub repo_dir: PathBuf,
    pub api_url: String,
    pub tracking_comment_id: Option<u64>,
}

impl std::fmt::Debug for ProviderEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderEnv")
            .field("token", &"[REDACTED]")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("branch", &self.branch)
            .field("base_branch", &self.base_branch)
            .field("repo_dir", &self.repo_dir)
            .field("api_url", &self.api_url)
            .field("tracking_comment_id", &self.tracking_comment_id)
            .finish()
    }
}

impl ProviderEnv {
    fn to_env(&self) -> BTreeMap<String, String> {
        let mut env = BTreeMap::from([
            ("FORGE_TOKEN".to_string(), self.token.clone()),
            ("REPO_OWNER".to_string(), self.owner.clone()),
            ("REPO_NAME".to_string(), self.repo.clone()),
            ("BRANCH_NAME".to_string(), self.branch.clone()),
            ("BASE_BRANCH".to_string(), self.base_branch.clone()),
            ("REPO_DIR".to_string(), self.repo_dir.display().to_string()),
            ("FORGE_API_URL".to_string(), self.api_url.clone()),
        ]);
        if let Some(id) = self.tracking_comment_id {
            env.insert("TRACKING_COMMENT_ID".to_string(), id.to_string());
        }
        env
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSpec {
    pub command: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
}

impl ServerSpec {
    fn from_command(provider: &str, command: &[String], env: BTreeMap<String, String>) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| Error::config(format!("no command configured for tool provider '{provider}'")))?;
        Ok(Self {
            command: program.clone(),
            args: args.to_vec(),
            env,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolProviderConfig {
    #[serde(rename = "mcpServers")]
    pub servers: BTreeMap<String, ServerSpec>,
}

impl ToolProviderConfig {
    pub fn build(tools: &ToolsConfig, env: &ProviderEnv) -> Result<Self> {
        let vars = env.to_env();
        let mut servers = BTreeMap::new();
        servers.insert(
            FORGE_PROVIDER.to_string(),
            ServerSpec::from_command(FORGE_PROVIDER, &tools.forge_server_command, vars.clone())?,
        );
        if !tools.commit_signing {
            servers.insert(
                LOCAL_GIT_PROVIDER.to_string(),
                ServerSpec::from_command(LOCAL_GIT_PROVIDER, &tools.git_server_command, vars)?,
            );
        }
        Ok(Self { servers })
    }

    pub fn to_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}
