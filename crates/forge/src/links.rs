//! Web links shown to users. Each forge family has its own URL shapes.

use forgehand_core::{ForgeKind, RepoId};
use reqwest::Url;

/// Builds user-facing URLs for one repository on one forge.
#[derive(Debug, Clone)]
pub struct LinkTemplates {
    kind: ForgeKind,
    repo_url: String,
}

impl LinkTemplates {
    pub fn new(kind: ForgeKind, server_url: &str, repo: &RepoId) -> Self {
        Self {
            kind,
            repo_url: format!(
                "{}/{}/{}",
                server_url.trim_end_matches('/'),
                repo.owner,
                repo.name
            ),
        }
    }

    pub fn job_run(&self, run_id: &str) -> String {
        format!("{}/actions/runs/{run_id}", self.repo_url)
    }

    pub fn branch(&self, branch: &str) -> String {
        match self.kind {
            ForgeKind::Github => format!("{}/tree/{branch}", self.repo_url),
            ForgeKind::Gitea => format!("{}/src/branch/{branch}", self.repo_url),
        }
    }

    /// Prefilled PR-creation page. Never creates anything by itself.
    pub fn create_pr(&self, base: &str, branch: &str, title: &str, body: &str) -> String {
        let raw = format!("{}/compare/{base}...{branch}", self.repo_url);
        let Ok(mut url) = Url::parse(&raw) else {
            return raw;
        };
        {
            let mut query = url.query_pairs_mut();
            if self.kind == ForgeKind::Github {
                query.append_pair("quick_pull", "1");
            }
            query.append_pair("title", title);
            query.append_pair("body", body);
        }
        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> RepoId {
        RepoId::new("acme", "widgets")
    }

    #[test]
    fn github_shapes() {
        let links = LinkTemplates::new(ForgeKind::Github, "https://github.com/", &repo());
        assert_eq!(links.job_run("42"), "https://github.com/acme/widgets/actions/runs/42");
        assert_eq!(
            links.branch("claude/issue-1-20240101_000000"),
            "https://github.com/acme/widgets/tree/claude/issue-1-20240101_000000"
        );
        let pr = links.create_pr("main", "claude/issue-1", "Issue #1: fix", "body text");
        assert!(pr.starts_with("https://github.com/acme/widgets/compare/main...claude/issue-1?"));
        assert!(pr.contains("quick_pull=1"));
        assert!(pr.contains("title=Issue+%231%3A+fix"));
    }

    #[test]
    fn gitea_shapes() {
        let links = LinkTemplates::new(ForgeKind::Gitea, "https://git.example.org", &repo());
        assert_eq!(
            links.branch("claude/pr-9-x"),
            "https://git.example.org/acme/widgets/src/branch/claude/pr-9-x"
        );
        let pr = links.create_pr("main", "claude/pr-9-x", "t", "b");
        assert!(!pr.contains("quick_pull"));
        assert!(pr.contains("title=t"));
    }
}
