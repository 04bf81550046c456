//! Tracking-comment bodies.
//!
//! Rendering is pure: no clock reads, no I/O. Every body this module writes
//! can be fed back through [`BodyRenderer::extract_content`] to recover
//! exactly the agent-authored part, which makes the final rewrite a fixed
//! point.

use forgehand_config::CommentConfig;
use serde::Serialize;

/// Shown until the agent writes its own content.
pub const PLACEHOLDER: &str = "I'll analyze this and get back to you.";

const SEPARATOR: &str = "\n---\n";
const JOB_RUN_LINK: &str = "[View job run](";
const JOB_LINK: &str = "[View job](";
const BRANCH_LINK: &str = "[View branch](";

/// A branch link in the final header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkedBranch {
    pub name: String,
    pub url: String,
}

/// Everything the final body shows besides the agent's own content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalSummary {
    pub success: bool,
    pub trigger_username: String,
    pub duration_ms: Option<u64>,
    pub cost_usd: Option<f64>,
    pub num_turns: Option<u32>,
    pub error: Option<String>,
    pub job_url: String,
    pub branch: Option<LinkedBranch>,
    pub create_pr_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BodyRenderer {
    bot_name: String,
    spinner_url: String,
}

impl BodyRenderer {
    pub fn new(config: &CommentConfig) -> Self {
        Self {
            bot_name: config.bot_name.clone(),
            spinner_url: config.spinner_url.clone(),
        }
    }

    fn working_header(&self) -> String {
        format!(
            "**{} is working…** <img src=\"{}\" width=\"14px\" height=\"14px\" style=\"vertical-align: middle; margin-left: 4px;\" />",
            self.bot_name, self.spinner_url
        )
    }

    /// Initial body: spinner, placeholder, job-run link.
    pub fn working(&self, job_url: &str) -> String {
        format!(
            "{}\n\n{PLACEHOLDER}\n\n{JOB_RUN_LINK}{job_url})",
            self.working_header()
        )
    }

    /// The working body with the branch link appended.
    pub fn branch_linked(&self, current_body: &str, job_url: &str, branch_url: &str) -> String {
        let content = self.extract_content(current_body);
        let mut body = self.working(job_url);
        body.push_str(&format!("\n{BRANCH_LINK}{branch_url})"));
        if !content.is_empty() {
            body.push_str("\n\n");
            body.push_str(&content);
        }
        body
    }

    /// Final body: outcome header, links, metrics, then the agent content
    /// recovered from `current_body`.
    pub fn final_body(&self, summary: &FinalSummary, current_body: &str) -> String {
        let mut body = self.final_header(summary);

        if let Some(metrics) = metrics_line(summary) {
            body.push_str("\n\n");
            body.push_str(&metrics);
        }

        if !summary.success {
            if let Some(error) = summary.error.as_deref().filter(|e| !e.trim().is_empty()) {
                body.push_str("\n\n```\n");
                body.push_str(&sanitize_error(error));
                body.push_str("\n```");
            }
        }

        let content = self.extract_content(current_body);
        if !content.is_empty() {
            body.push('\n');
            body.push_str(SEPARATOR);
            body.push_str(&content);
        }
        body
    }

    fn final_header(&self, summary: &FinalSummary) -> String {
        let bot = &self.bot_name;
        let mut header = match (summary.success, summary.duration_ms) {
            (true, Some(ms)) => format!(
                "**{bot} finished @{}'s task in {}**",
                summary.trigger_username,
                format_duration(ms)
            ),
            (true, None) => format!("**{bot} finished @{}'s task**", summary.trigger_username),
            (false, Some(ms)) => {
                format!("**{bot} encountered an error after {}**", format_duration(ms))
            }
            (false, None) => format!("**{bot} encountered an error**"),
        };

        header.push_str(&format!(" —— {JOB_LINK}{})", summary.job_url));
        if let Some(branch) = &summary.branch {
            header.push_str(&format!(" • [`{}`]({})", branch.name, branch.url));
        }
        if let Some(pr) = &summary.create_pr_url {
            header.push_str(&format!(" • [Create PR ➔]({pr})"));
        }
        header
    }

    fn is_final_header(&self, line: &str) -> bool {
        line.starts_with(&format!("**{} finished", self.bot_name))
            || line.starts_with(&format!("**{} encountered an error", self.bot_name))
    }

    fn is_chrome_line(&self, line: &str) -> bool {
        let line = line.trim();
        (line.starts_with("**")
                && (line.contains(" is working…**") || line.contains(" is working...**")))
            || line.contains(&self.spinner_url)
            || line == PLACEHOLDER
            || line.starts_with(JOB_RUN_LINK)
            || line.starts_with(JOB_LINK)
            || line.starts_with(BRANCH_LINK)
    }

    /// The agent-authored part of a body, with all generated chrome removed.
    pub fn extract_content(&self, body: &str) -> String {
        let body = body.replace("\r\n", "\n");

        if body.lines().next().is_some_and(|l| self.is_final_header(l)) {
            return match body.split_once(SEPARATOR) {
                Some((_, content)) => content.trim().to_string(),
                None => String::new(),
            };
        }

        body.lines()
            .filter(|line| !self.is_chrome_line(line))
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    }
}

/// `{m}m {s}s` from one minute up, else `{s}s`.
pub fn format_duration(ms: u64) -> String {
    let total = ms / 1000;
    let (minutes, seconds) = (total / 60, total % 60);
    if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

fn metrics_line(summary: &FinalSummary) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(cost) = summary.cost_usd {
        parts.push(format!("Cost: ${cost:.4}"));
    }
    if let Some(turns) = summary.num_turns {
        parts.push(format!("Turns: {turns}"));
    }
    (!parts.is_empty()).then(|| parts.join(" | "))
}

/// Keep the separator unambiguous.
fn sanitize_error(error: &str) -> String {
    error
        .trim()
        .lines()
        .map(|l| if l.trim() == "---" { "- - -" } else { l })
        .collect::<Vec<_>>()
        .join("\n")
}
