//! Event context: the immutable view of the triggering forge event.
//!
//! Built once per job from the webhook payload. Everything downstream reads
//! from it; nothing writes to it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// `owner/name` repository identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoId {
    pub owner: String,
    pub name: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parse an `owner/name` slug.
    pub fn parse(slug: &str) -> Result<Self> {
        let (owner, name) = slug
            .trim()
            .split_once('/')
            .ok_or_else(|| Error::config(format!("invalid repository '{slug}', expected owner/repo")))?;
        let (owner, name) = (owner.trim(), name.trim());
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(Error::config(format!(
                "invalid repository '{slug}', expected owner/repo"
            )));
        }
        Ok(Self::new(owner, name))
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl std::fmt::Display for RepoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// The unit a job operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Issue,
    PullRequest,
}

impl EntityKind {
    /// Short form used in branch names.
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Issue => "issue",
            Self::PullRequest => "pr",
        }
    }

    pub fn is_pr(&self) -> bool {
        matches!(self, Self::PullRequest)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrState {
    Open,
    Closed,
    Merged,
}

impl PrState {
    /// Resolve from a payload's `state` string and `merged` flag.
    pub fn from_parts(state: &str, merged: bool) -> Self {
        if merged {
            Self::Merged
        } else if state.eq_ignore_ascii_case("open") {
            Self::Open
        } else {
            Self::Closed
        }
    }
}

/// Which comment family triggered the job. Decides the reply endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentKind {
    /// Top-level issue / PR conversation comment
    Issue,
    /// Body of a submitted PR review
    Review,
    /// Inline comment on a PR diff
    ReviewInline,
}

/// The comment that carried the trigger, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerComment {
    pub id: u64,
    pub kind: CommentKind,
    pub body: String,
}

/// Head/base refs when the payload carries them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrRefs {
    pub head_ref: String,
    pub base_ref: String,
}

/// Immutable, job-scoped description of the triggering event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventContext {
    pub event_name: String,
    pub action: Option<String>,
    pub repository: RepoId,
    pub entity_kind: EntityKind,
    pub entity_number: u64,
    pub actor: String,
    pub title: Option<String>,
    pub body: Option<String>,
    pub comment: Option<TriggerComment>,
    pub assignee: Option<String>,
    pub label: Option<String>,
    pub pr_state: Option<PrState>,
    pub pr_refs: Option<PrRefs>,
}

impl EventContext {
    /// Build the context from a webhook event name and its JSON payload.
    ///
    /// `fallback_repo` is used when the payload lacks a `repository` object.
    pub fn from_payload(
        event_name: &str,
        payload: &Value,
        fallback_repo: Option<&RepoId>,
    ) -> Result<Self> {
        let repository = repo_from_payload(payload)
            .or_else(|| fallback_repo.cloned())
            .ok_or_else(|| Error::config("event payload has no repository and none was configured"))?;
        let action = str_at(payload, &["action"]);
        let actor = str_at(payload, &["sender", "login"])
            .ok_or_else(|| Error::config("event payload has no sender.login"))?;

        let mut ctx = match event_name {
            "issues" => {
                let issue = object(payload, "issue")?;
                Self::base(event_name, repository, actor, EntityKind::Issue, number(issue)?)
                    .with_text(issue)
            }
            "issue_comment" => {
                let issue = object(payload, "issue")?;
                let kind = if issue.get("pull_request").is_some_and(|v| !v.is_null()) {
                    EntityKind::PullRequest
                } else {
                    EntityKind::Issue
                };
                let mut ctx = Self::base(event_name, repository, actor, kind, number(issue)?)
                    .with_text(issue);
                ctx.comment = Some(comment(payload, "comment", CommentKind::Issue)?);
                ctx
            }
            "pull_request" | "pull_request_target" => {
                let pr = object(payload, "pull_request")?;
                let mut ctx =
                    Self::base(event_name, repository, actor, EntityKind::PullRequest, number(pr)?)
                        .with_text(pr);
                ctx.apply_pr(pr);
                ctx
            }
            "pull_request_review" => {
                let pr = object(payload, "pull_request")?;
                let mut ctx =
                    Self::base(event_name, repository, actor, EntityKind::PullRequest, number(pr)?)
                        .with_text(pr);
                ctx.apply_pr(pr);
                ctx.comment = Some(comment(payload, "review", CommentKind::Review)?);
                ctx
            }
            "pull_request_review_comment" => {
                let pr = object(payload, "pull_request")?;
                let mut ctx =
                    Self::base(event_name, repository, actor, EntityKind::PullRequest, number(pr)?)
                        .with_text(pr);
                ctx.apply_pr(pr);
                ctx.comment = Some(comment(payload, "comment", CommentKind::ReviewInline)?);
                ctx
            }
            other => {
                return Err(Error::config(format!("unsupported event '{other}'")));
            }
        };

        ctx.action = action;
        ctx.assignee = str_at(payload, &["assignee", "login"]);
        ctx.label = str_at(payload, &["label", "name"]);
        Ok(ctx)
    }

    fn base(
        event_name: &str,
        repository: RepoId,
        actor: String,
        entity_kind: EntityKind,
        entity_number: u64,
    ) -> Self {
        Self {
            event_name: event_name.to_string(),
            action: None,
            repository,
            entity_kind,
            entity_number,
            actor,
            title: None,
            body: None,
            comment: None,
            assignee: None,
            label: None,
            pr_state: None,
            pr_refs: None,
        }
    }

    fn with_text(mut self, entity: &Value) -> Self {
        self.title = str_at(entity, &["title"]);
        self.body = str_at(entity, &["body"]);
        self
    }

    fn apply_pr(&mut self, pr: &Value) {
        let state = str_at(pr, &["state"]).unwrap_or_default();
        let merged = pr.get("merged").and_then(Value::as_bool).unwrap_or(false);
        self.pr_state = Some(PrState::from_parts(&state, merged));
        if let (Some(head_ref), Some(base_ref)) =
            (str_at(pr, &["head", "ref"]), str_at(pr, &["base", "ref"]))
        {
            self.pr_refs = Some(PrRefs { head_ref, base_ref });
        }
    }

    pub fn is_pr(&self) -> bool {
        self.entity_kind.is_pr()
    }

    /// Whether the action is one of the given names.
    pub fn action_is(&self, names: &[&str]) -> bool {
        self.action
            .as_deref()
            .is_some_and(|a| names.iter().any(|n| *n == a))
    }
}

// ── Payload helpers ─────────────────────────────────────────────────────────

fn str_at(value: &Value, path: &[&str]) -> Option<String> {
    let mut cur = value;
    for key in path {
        cur = cur.get(key)?;
    }
    cur.as_str().map(str::to_string)
}

fn object<'a>(payload: &'a Value, key: &str) -> Result<&'a Value> {
    payload
        .get(key)
        .filter(|v| v.is_object())
        .ok_or_else(|| Error::config(format!("event payload has no '{key}' object")))
}

fn number(entity: &Value) -> Result<u64> {
    entity
        .get("number")
        .and_then(Value::as_u64)
        .ok_or_else(|| Error::config("event entity has no number"))
}

fn comment(payload: &Value, key: &str, kind: CommentKind) -> Result<TriggerComment> {
    let obj = object(payload, key)?;
    let id = obj
        .get("id")
        .and_then(Value::as_u64)
        .ok_or_else(|| Error::config(format!("event '{key}' has no id")))?;
    Ok(TriggerComment {
        id,
        kind,
        body: str_at(obj, &["body"]).unwrap_or_default(),
    })
}

fn repo_from_payload(payload: &Value) -> Option<RepoId> {
    let repo = payload.get("repository")?;
    if let Some(full) = repo.get("full_name").and_then(Value::as_str) {
        if let Ok(id) = RepoId::parse(full) {
            return Some(id);
        }
    }
    let owner = str_at(repo, &["owner", "login"])?;
    let name = str_at(repo, &["name"])?;
    Some(RepoId::new(owner, name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn repo() -> Value {
        json!({ "full_name": "acme/widgets", "name": "widgets", "owner": { "login": "acme" } })
    }

    #[test]
    fn parses_issue_opened() {
        let payload = json!({
            "action": "opened",
            "issue": { "number": 123, "title": "Crash", "body": "@claude please fix" },
            "repository": repo(),
            "sender": { "login": "alice" }
        });
        let ctx = EventContext::from_payload("issues", &payload, None).unwrap();
        assert_eq!(ctx.entity_kind, EntityKind::Issue);
        assert_eq!(ctx.entity_number, 123);
        assert_eq!(ctx.repository.full_name(), "acme/widgets");
        assert_eq!(ctx.body.as_deref(), Some("@claude please fix"));
        assert!(ctx.comment.is_none());
        assert!(ctx.action_is(&["opened", "edited"]));
    }

    #[test]
    fn issue_comment_on_pr_is_pr_entity() {
        let payload = json!({
            "action": "created",
            "issue": { "number": 7, "title": "t", "pull_request": { "url": "x" } },
            "comment": { "id": 991, "body": "@claude review" },
            "repository": repo(),
            "sender": { "login": "bob" }
        });
        let ctx = EventContext::from_payload("issue_comment", &payload, None).unwrap();
        assert!(ctx.is_pr());
        let comment = ctx.comment.unwrap();
        assert_eq!(comment.id, 991);
        assert_eq!(comment.kind, CommentKind::Issue);
        assert!(ctx.pr_refs.is_none());
    }

    #[test]
    fn review_comment_records_refs_and_kind() {
        let payload = json!({
            "action": "created",
            "pull_request": {
                "number": 7, "state": "open", "merged": false,
                "head": { "ref": "feature-x" }, "base": { "ref": "main" }
            },
            "comment": { "id": 5, "body": "@claude nit" },
            "repository": repo(),
            "sender": { "login": "carol" }
        });
        let ctx = EventContext::from_payload("pull_request_review_comment", &payload, None).unwrap();
        assert_eq!(ctx.pr_state, Some(PrState::Open));
        assert_eq!(ctx.comment.as_ref().unwrap().kind, CommentKind::ReviewInline);
        let refs = ctx.pr_refs.unwrap();
        assert_eq!(refs.head_ref, "feature-x");
        assert_eq!(refs.base_ref, "main");
    }

    #[test]
    fn merged_flag_wins_over_state() {
        assert_eq!(PrState::from_parts("closed", true), PrState::Merged);
        assert_eq!(PrState::from_parts("closed", false), PrState::Closed);
        assert_eq!(PrState::from_parts("open", false), PrState::Open);
    }

    #[test]
    fn assignment_and_label_are_captured() {
        let payload = json!({
            "action": "assigned",
            "issue": { "number": 3 },
            "assignee": { "login": "claude-bot" },
            "label": { "name": "ai" },
            "repository": repo(),
            "sender": { "login": "dave" }
        });
        let ctx = EventContext::from_payload("issues", &payload, None).unwrap();
        assert_eq!(ctx.assignee.as_deref(), Some("claude-bot"));
        assert_eq!(ctx.label.as_deref(), Some("ai"));
    }

    #[test]
    fn unsupported_event_is_config_error() {
        let payload = json!({ "repository": repo(), "sender": { "login": "x" } });
        let err = EventContext::from_payload("push", &payload, None).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn fallback_repo_used_when_missing() {
        let payload = json!({
            "action": "opened",
            "issue": { "number": 1 },
            "sender": { "login": "x" }
        });
        let fallback = RepoId::new("o", "r");
        let ctx = EventContext::from_payload("issues", &payload, Some(&fallback)).unwrap();
        assert_eq!(ctx.repository, fallback);
    }

    #[test]
    fn repo_slug_parsing() {
        assert_eq!(RepoId::parse("a/b").unwrap(), RepoId::new("a", "b"));
        assert!(RepoId::parse("nope").is_err());
        assert!(RepoId::parse("a/b/c").is_err());
        assert!(RepoId::parse("/b").is_err());
    }
}
