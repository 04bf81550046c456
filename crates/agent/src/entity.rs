//! Issue / PR data fetched from the forge for prompt assembly.

use forgehand_core::{
    CommentData, EntityKind, EventContext, ForgeApi, PrState, Result,
};
use serde::Serialize;
use tracing::{debug, warn};

/// PR-only fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrDetails {
    pub state: PrState,
    pub head_ref: String,
    pub base_ref: String,
}

/// Everything the job knows about the entity it works on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityData {
    pub kind: EntityKind,
    pub number: u64,
    pub title: String,
    pub body: String,
    pub author: String,
    pub state: String,
    pub comments: Vec<CommentData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr: Option<PrDetails>,
}

impl EntityData {
    /// Fetch the entity and its conversation.
    pub async fn fetch(forge: &dyn ForgeApi, ctx: &EventContext) -> Result<Self> {
        let repo = &ctx.repository;
        let comments = forge.list_comments(repo, ctx.entity_number).await?;

        let data = match ctx.entity_kind {
            EntityKind::Issue => {
                let issue = forge.get_issue(repo, ctx.entity_number).await?;
                Self {
                    kind: EntityKind::Issue,
                    number: issue.number,
                    title: issue.title,
                    body: issue.body,
                    author: issue.author,
                    state: issue.state,
                    comments,
                    pr: None,
                }
            }
            EntityKind::PullRequest => {
                let pr = match forge.get_pull_request(repo, ctx.entity_number).await {
                    Ok(pr) => pr,
                    Err(e) => match Self::from_payload(ctx, comments) {
                        Some(data) => {
                            warn!(
                                number = ctx.entity_number,
                                error = %e,
                                "PR fetch failed, using refs from the event payload"
                            );
                            return Ok(data);
                        }
                        None => return Err(e.into()),
                    },
                };
                let details = PrDetails {
                    state: PrState::from_parts(&pr.state, pr.merged),
                    head_ref: pr.head_ref,
                    base_ref: pr.base_ref,
                };
                Self {
                    kind: EntityKind::PullRequest,
                    number: pr.number,
                    title: pr.title,
                    body: pr.body,
                    author: pr.author,
                    state: pr.state,
                    comments,
                    pr: Some(details),
                }
            }
        };

        debug!(
            kind = ?data.kind,
            number = data.number,
            comments = data.comments.len(),
            "Fetched entity data"
        );
        Ok(data)
    }

    /// PR data as carried by the webhook payload. Needs both refs and a state.
    fn from_payload(ctx: &EventContext, comments: Vec<CommentData>) -> Option<Self> {
        let refs = ctx.pr_refs.as_ref()?;
        let state = ctx.pr_state?;
        Some(Self {
            kind: EntityKind::PullRequest,
            number: ctx.entity_number,
            title: ctx.title.clone().unwrap_or_default(),
            body: ctx.body.clone().unwrap_or_default(),
            author: String::new(),
            state: match state {
                PrState::Open => "open",
                PrState::Closed | PrState::Merged => "closed",
            }
            .to_string(),
            comments,
            pr: Some(PrDetails {
                state,
                head_ref: refs.head_ref.clone(),
                base_ref: refs.base_ref.clone(),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forgehand_core::testing::FakeForge;
    use forgehand_core::{IssueData, ProviderProfile, PullRequestData};
    use serde_json::json;

    fn ctx(event: &str, payload: serde_json::Value) -> EventContext {
        EventContext::from_payload(event, &payload, None).unwrap()
    }

    #[tokio::test]
    async fn fetches_merged_pr_state() {
        let forge = FakeForge::new(ProviderProfile::full()).with_pull(PullRequestData {
            number: 9,
            title: "Old work".into(),
            body: String::new(),
            author: "bob".into(),
            state: "closed".into(),
            merged: true,
            head_ref: "feature-y".into(),
            base_ref: "main".into(),
        });
        let event = ctx(
            "issue_comment",
            json!({
                "action": "created",
                "repository": { "full_name": "acme/widgets" },
                "sender": { "login": "alice" },
                "issue": { "number": 9, "title": "Old work", "pull_request": {} },
                "comment": { "id": 1, "body": "@claude" }
            }),
        );
        let data = EntityData::fetch(&forge, &event).await.unwrap();
        let pr = data.pr.unwrap();
        assert_eq!(pr.state, PrState::Merged);
        assert_eq!(pr.head_ref, "feature-y");
    }

    #[tokio::test]
    async fn pr_fetch_failure_falls_back_to_payload_refs() {
        let forge = FakeForge::new(ProviderProfile::full());
        let event = ctx(
            "pull_request_review_comment",
            json!({
                "action": "created",
                "repository": { "full_name": "acme/widgets" },
                "sender": { "login": "alice" },
                "pull_request": {
                    "number": 7, "title": "Refactor", "body": "details", "state": "open",
                    "head": { "ref": "feature-x" }, "base": { "ref": "main" }
                },
                "comment": { "id": 3, "body": "@claude rename" }
            }),
        );
        let data = EntityData::fetch(&forge, &event).await.unwrap();
        assert_eq!(data.title, "Refactor");
        let pr = data.pr.unwrap();
        assert_eq!(pr.state, PrState::Open);
        assert_eq!(pr.head_ref, "feature-x");
        assert_eq!(pr.base_ref, "main");

        // An issue_comment payload carries no refs, so the error stands
        let event = ctx(
            "issue_comment",
            json!({
                "action": "created",
                "repository": { "full_name": "acme/widgets" },
                "sender": { "login": "alice" },
                "issue": { "number": 7, "title": "Refactor", "pull_request": {} },
                "comment": { "id": 3, "body": "@claude" }
            }),
        );
        assert!(EntityData::fetch(&forge, &event).await.is_err());
    }

    #[tokio::test]
    async fn missing_issue_is_an_error() {
        let forge = FakeForge::new(ProviderProfile::reduced());
        let event = ctx(
            "issues",
            json!({
                "action": "opened",
                "repository": { "full_name": "acme/widgets" },
                "sender": { "login": "alice" },
                "issue": { "number": 5, "title": "t", "body": "b" }
            }),
        );
        assert!(EntityData::fetch(&forge, &event).await.is_err());

        let forge = FakeForge::new(ProviderProfile::reduced()).with_issue(IssueData {
            number: 5,
            title: "t".into(),
            body: "b".into(),
            author: "alice".into(),
            state: "open".into(),
        });
        let data = EntityData::fetch(&forge, &event).await.unwrap();
        assert!(data.pr.is_none());
        assert_eq!(data.author, "alice");
    }
}
