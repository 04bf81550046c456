//! `AgentExecutor` that runs the agent as a subprocess.
//!
//! Protocol: the request is written to stdin as one JSON document; the
//! agent prints an [`ExecutionOutcome`] JSON object on stdout (the last
//! JSON line wins if it also prints logs).

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use forgehand_core::{AgentExecutor, AgentRequest, Error, ExecutionOutcome, Result};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

const STDERR_TAIL_CHARS: usize = 2000;

pub struct CommandExecutor {
    program: String,
    args: Vec<String>,
    env: HashMap<String, String>,
    workdir: PathBuf,
}

impl CommandExecutor {
    /// `command` is the program followed by its arguments.
    pub fn new(command: &[String], workdir: impl Into<PathBuf>) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| Error::config("no agent command configured (set agent.command or AGENT_COMMAND)"))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            env: HashMap::new(),
            workdir: workdir.into(),
        })
    }

    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }
}

#[async_trait]
impl AgentExecutor for CommandExecutor {
    fn name(&self) -> &str {
        &self.program
    }

    async fn execute(&self, request: AgentRequest) -> Result<ExecutionOutcome> {
        let input = serde_json::to_vec(&request)?;
        info!(program = %self.program, workdir = %self.workdir.display(), "Starting agent");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .envs(&self.env)
            .current_dir(&self.workdir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::ExternalAgent(format!("failed to start '{}': {e}", self.program)))?;

        // Feed stdin while draining stdout/stderr; either side may fill its pipe first
        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                if let Err(e) = stdin.write_all(&input).await {
                    // The agent may exit without reading its input
                    warn!(error = %e, "Could not write request to agent stdin");
                }
            }
        };
        let ((), output) = tokio::join!(feed, child.wait_with_output());
        let output =
            output.map_err(|e| Error::ExternalAgent(format!("failed to wait for agent: {e}")))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            let code = output
                .status
                .code()
                .map_or_else(|| "signal".to_string(), |c| c.to_string());
            return Err(Error::ExternalAgent(format!(
                "agent exited with code {code}: {}",
                tail(&stderr, STDERR_TAIL_CHARS)
            )));
        }

        let outcome = parse_outcome(&stdout).ok_or_else(|| {
            Error::ExternalAgent("agent produced no execution outcome on stdout".into())
        })?;
        debug!(?outcome, "Agent finished");
        Ok(outcome)
    }
}

/// The whole of stdout, or failing that the last line that parses.
pub fn parse_outcome(stdout: &str) -> Option<ExecutionOutcome> {
    if let Ok(outcome) = serde_json::from_str(stdout.trim()) {
        return Some(outcome);
    }
    stdout
        .lines()
        .rev()
        .map(str::trim)
        .filter(|l| l.starts_with('{'))
        .find_map(|l| serde_json::from_str(l).ok())
}

fn tail(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    let count = text.chars().count();
    if count <= max_chars {
        return text.to_string();
    }
    text.chars().skip(count - max_chars).collect()
}
