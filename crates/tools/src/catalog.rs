//! The fixed tool families the gate draws from.

use serde::{Deserialize, Serialize};

/// Immutable tool data. Built once per job; tests construct their own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCatalog {
    /// Always allowed: file tools, the tracking-comment tool, forge queries
    pub base: Vec<String>,
    /// CI introspection, only for PRs with CI read permission
    pub ci: Vec<String>,
    /// Forge-API commits, used instead of `local_git` when signing
    pub signing: Vec<String>,
    /// Local git commit/delete/push
    pub local_git: Vec<String>,
    /// Denied unless the user explicitly allows them
    pub default_disallowed: Vec<String>,
}

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

impl Default for ToolCatalog {
    fn default() -> Self {
        Self {
            base: owned(&[
                "Edit",
                "MultiEdit",
                "Glob",
                "Grep",
                "LS",
                "Read",
                "Write",
                "mcp__forge__update_tracking_comment",
                "mcp__forge__get_issue",
                "mcp__forge__get_pull_request",
                "mcp__forge__list_comments",
            ]),
            ci: owned(&[
                "mcp__forge__get_ci_status",
                "mcp__forge__get_workflow_run_details",
                "mcp__forge__download_job_log",
            ]),
            signing: owned(&["mcp__forge__commit_files", "mcp__forge__delete_files"]),
            local_git: owned(&[
                "mcp__local_git__commit_files",
                "mcp__local_git__delete_files",
                "mcp__local_git__push_branch",
                "mcp__local_git__git_status",
            ]),
            default_disallowed: owned(&["WebSearch", "WebFetch", "mcp__local_git__force_push"]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn families_are_disjoint() {
        let c = ToolCatalog::default();
        for tool in &c.signing {
            assert!(!c.local_git.contains(tool));
            assert!(!c.base.contains(tool));
        }
        for tool in &c.default_disallowed {
            assert!(!c.base.contains(tool));
            assert!(!c.local_git.contains(tool));
        }
    }
}
