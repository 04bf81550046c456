//! Structured prompt variables. The template text lives with the agent.

use forgehand_config::TriggerConfig;
use forgehand_core::{BranchInfo, EventContext, TrackingComment};
use serde::Serialize;

use crate::entity::EntityData;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptComment {
    pub id: u64,
    pub author: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Everything a prompt template may reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptVariables {
    pub repository: String,
    pub event_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_action: Option<String>,
    pub is_pr: bool,
    pub entity_number: u64,
    pub title: String,
    pub body: String,
    pub author: String,
    pub trigger_username: String,
    pub trigger_phrase: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_comment: Option<String>,
    pub comments: Vec<PromptComment>,
    pub base_branch: String,
    pub current_branch: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claude_branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr_head_ref: Option<String>,
    pub tracking_comment_id: u64,
    pub job_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direct_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub override_prompt: Option<String>,
}

/// Borrowed inputs to [`PromptVariables::assemble`].
pub struct PromptInputs<'a> {
    pub ctx: &'a EventContext,
    pub trigger: &'a TriggerConfig,
    pub trigger_username: &'a str,
    pub entity: &'a EntityData,
    pub branch: &'a BranchInfo,
    pub comment: &'a TrackingComment,
    pub job_url: &'a str,
}

fn non_blank(v: &Option<String>) -> Option<String> {
    v.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl PromptVariables {
    /// Pure assembly; the tracking comment is left out of the conversation.
    pub fn assemble(inputs: PromptInputs<'_>) -> Self {
        let PromptInputs {
            ctx,
            trigger,
            trigger_username,
            entity,
            branch,
            comment,
            job_url,
        } = inputs;

        let comments = entity
            .comments
            .iter()
            .filter(|c| c.id != comment.id)
            .map(|c| PromptComment {
                id: c.id,
                author: c.author.clone(),
                body: c.body.clone(),
                created_at: c.created_at.map(|t| t.to_rfc3339()),
            })
            .collect();

        Self {
            repository: ctx.repository.full_name(),
            event_name: ctx.event_name.clone(),
            event_action: ctx.action.clone(),
            is_pr: ctx.is_pr(),
            entity_number: entity.number,
            title: entity.title.clone(),
            body: entity.body.clone(),
            author: entity.author.clone(),
            trigger_username: trigger_username.to_string(),
            trigger_phrase: trigger.trigger_phrase.clone(),
            trigger_comment: ctx.comment.as_ref().map(|c| c.body.clone()),
            comments,
            base_branch: branch.base_branch.clone(),
            current_branch: branch.current_branch.clone(),
            claude_branch: branch.claude_branch.clone(),
            pr_head_ref: entity.pr.as_ref().map(|p| p.head_ref.clone()),
            tracking_comment_id: comment.id,
            job_url: job_url.to_string(),
            direct_prompt: non_blank(&trigger.direct_prompt),
            override_prompt: non_blank(&trigger.override_prompt),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forgehand_core::{CommentData, CommentTarget, EntityKind};
    use serde_json::json;

    #[test]
    fn tracking_comment_is_excluded_and_output_is_stable() {
        let ctx = EventContext::from_payload(
            "issues",
            &json!({
                "action": "opened",
                "repository": { "full_name": "acme/widgets" },
                "sender": { "login": "alice" },
                "issue": { "number": 123, "title": "Crash", "body": "@claude fix" }
            }),
            None,
        )
        .unwrap();
        let entity = EntityData {
            kind: EntityKind::Issue,
            number: 123,
            title: "Crash".into(),
            body: "@claude fix".into(),
            author: "alice".into(),
            state: "open".into(),
            comments: vec![
                CommentData { id: 1, author: "bob".into(), body: "me too".into(), created_at: None },
                CommentData { id: 99, author: "bot".into(), body: "working".into(), created_at: None },
            ],
            pr: None,
        };
        let branch = BranchInfo {
            base_branch: "main".into(),
            claude_branch: Some("claude/issue-123-20240115_143022".into()),
            current_branch: "claude/issue-123-20240115_143022".into(),
        };
        let comment = TrackingComment::new(99, CommentTarget::Issue, "working");
        let trigger = TriggerConfig {
            direct_prompt: Some("   ".into()),
            ..TriggerConfig::default()
        };

        let build = || {
            PromptVariables::assemble(PromptInputs {
                ctx: &ctx,
                trigger: &trigger,
                trigger_username: "alice",
                entity: &entity,
                branch: &branch,
                comment: &comment,
                job_url: "https://github.com/acme/widgets/actions/runs/1",
            })
        };
        let vars = build();
        assert_eq!(vars.comments.len(), 1);
        assert_eq!(vars.comments[0].author, "bob");
        assert_eq!(vars.tracking_comment_id, 99);
        assert!(vars.direct_prompt.is_none());
        assert_eq!(vars, build());

        let json = serde_json::to_value(&vars).unwrap();
        assert_eq!(json["claude_branch"], "claude/issue-123-20240115_143022");
        assert!(json.get("pr_head_ref").is_none());
    }
}
