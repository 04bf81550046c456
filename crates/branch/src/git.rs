//! `GitOps` backed by the `git` executable.

use std::path::PathBuf;

use async_trait::async_trait;
use forgehand_core::{GitError, GitOps};
use tokio::process::Command;
use tracing::{debug, warn};

/// Runs git as a subprocess inside one working directory.
pub struct ProcessGit {
    workdir: PathBuf,
    program: String,
}

impl ProcessGit {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            program: "git".into(),
        }
    }

    /// Use a different git binary.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Run `git <args>` and return trimmed stdout.
    async fn run(&self, args: &[&str]) -> Result<String, GitError> {
        let rendered = args.join(" ");
        debug!(command = %rendered, workdir = %self.workdir.display(), "Running git");

        let output = Command::new(&self.program)
            .args(args)
            .current_dir(&self.workdir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .await
            .map_err(|e| GitError::Spawn(e.to_string()))?;

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(command = %rendered, exit_code = code, "git failed");
            return Err(GitError::CommandFailed {
                args: rendered,
                code,
                stderr,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl GitOps for ProcessGit {
    async fn fetch(&self, remote: &str, refspec: &str, depth: Option<u32>) -> Result<(), GitError> {
        match depth {
            Some(depth) => {
                let depth = format!("--depth={depth}");
                self.run(&["fetch", remote, &depth, refspec]).await?
            }
            None => self.run(&["fetch", remote, refspec]).await?,
        };
        Ok(())
    }

    async fn checkout(&self, branch: &str) -> Result<(), GitError> {
        self.run(&["checkout", branch]).await.map(drop)
    }

    async fn pull(&self, remote: &str, branch: &str) -> Result<(), GitError> {
        self.run(&["pull", remote, branch]).await.map(drop)
    }

    async fn create_branch(&self, branch: &str) -> Result<(), GitError> {
        self.run(&["checkout", "-b", branch]).await.map(drop)
    }

    async fn current_branch(&self) -> Result<String, GitError> {
        // symbolic-ref also works on an unborn branch
        self.run(&["symbolic-ref", "--short", "HEAD"]).await
    }

    async fn remote_branch_sha(&self, remote: &str, branch: &str) -> Result<String, GitError> {
        let refname = format!("refs/heads/{branch}");
        let out = self.run(&["ls-remote", "--heads", remote, &refname]).await?;
        parse_ls_remote(&out, &refname).ok_or_else(|| GitError::NotFound {
            reference: format!("{remote}/{branch}"),
        })
    }
}

/// Pick the SHA for `refname` out of `ls-remote` output.
fn parse_ls_remote(output: &str, refname: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let (sha, name) = line.split_once(char::is_whitespace)?;
        (name.trim() == refname).then(|| sha.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn git_available() -> bool {
        std::process::Command::new("git")
            .arg("--version")
            .output()
            .is_ok_and(|o| o.status.success())
    }

    async fn init_repo(dir: &Path, bare: bool) {
        let mut args = vec!["init", "--quiet"];
        if bare {
            args.push("--bare");
        }
        let status = Command::new("git")
            .args(&args)
            .current_dir(dir)
            .status()
            .await
            .unwrap();
        assert!(status.success());
    }

    #[test]
    fn ls_remote_parsing() {
        let out = "abc123\trefs/heads/main\ndef456\trefs/heads/main-old\n";
        assert_eq!(parse_ls_remote(out, "refs/heads/main").as_deref(), Some("abc123"));
        assert_eq!(parse_ls_remote(out, "refs/heads/other"), None);
        assert_eq!(parse_ls_remote("", "refs/heads/main"), None);
    }

    #[tokio::test]
    async fn create_branch_switches_head() {
        if !git_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path(), false).await;

        let git = ProcessGit::new(dir.path());
        git.create_branch("claude/issue-1-20240115_143022").await.unwrap();
        assert_eq!(
            git.current_branch().await.unwrap(),
            "claude/issue-1-20240115_143022"
        );
    }

    #[tokio::test]
    async fn failed_command_reports_exit_code() {
        if !git_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path(), false).await;

        let err = ProcessGit::new(dir.path())
            .checkout("does-not-exist")
            .await
            .unwrap_err();
        match err {
            GitError::CommandFailed { args, code, .. } => {
                assert_eq!(args, "checkout does-not-exist");
                assert_ne!(code, 0);
            }
            other => panic!("Expected CommandFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_remote_branch_is_not_found() {
        if !git_available() {
            return;
        }
        let remote = tempfile::tempdir().unwrap();
        init_repo(remote.path(), true).await;
        let work = tempfile::tempdir().unwrap();
        init_repo(work.path(), false).await;

        let remote_path = remote.path().to_string_lossy().to_string();
        let err = ProcessGit::new(work.path())
            .remote_branch_sha(&remote_path, "claude/issue-9")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn missing_binary_is_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ProcessGit::new(dir.path())
            .with_program("forgehand-no-such-git")
            .current_branch()
            .await
            .unwrap_err();
        assert!(matches!(err, GitError::Spawn(_)));
    }
}
