//! Decides whether a forge event should start a job.
//!
//! Rules are checked cheapest first: text and event matching needs no API
//! calls, so forge lookups (actor type, permission) only happen for events
//! that would otherwise activate.

use forgehand_config::TriggerConfig;
use forgehand_core::{
    ActorKind, CommentKind, EventContext, Error, ForgeApi, Result,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::phrase::PhraseMatcher;

/// Which rule matched, or why nothing did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerReason {
    DirectPrompt,
    PhraseInComment,
    PhraseInBody,
    PhraseInTitle,
    Assignee,
    Label,
    NoMatch,
    UnsupportedAction,
    BotActor,
    PermissionDenied(String),
}

impl TriggerReason {
    pub fn activates(&self) -> bool {
        matches!(
            self,
            Self::DirectPrompt
                | Self::PhraseInComment
                | Self::PhraseInBody
                | Self::PhraseInTitle
                | Self::Assignee
                | Self::Label
        )
    }
}

impl std::fmt::Display for TriggerReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DirectPrompt => write!(f, "direct prompt configured"),
            Self::PhraseInComment => write!(f, "trigger phrase in comment"),
            Self::PhraseInBody => write!(f, "trigger phrase in body"),
            Self::PhraseInTitle => write!(f, "trigger phrase in title"),
            Self::Assignee => write!(f, "assigned to trigger user"),
            Self::Label => write!(f, "trigger label added"),
            Self::NoMatch => write!(f, "no trigger matched"),
            Self::UnsupportedAction => write!(f, "event action does not trigger"),
            Self::BotActor => write!(f, "actor is a bot"),
            Self::PermissionDenied(why) => write!(f, "permission denied: {why}"),
        }
    }
}

/// The evaluator's verdict, plus the identity the comment protocol needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggerDecision {
    pub should_activate: bool,
    pub trigger_username: String,
    pub comment_id: Option<u64>,
    pub comment_kind: Option<CommentKind>,
    pub reason: TriggerReason,
}

impl TriggerDecision {
    fn new(ctx: &EventContext, reason: TriggerReason) -> Self {
        Self {
            should_activate: reason.activates(),
            trigger_username: ctx.actor.clone(),
            comment_id: ctx.comment.as_ref().map(|c| c.id),
            comment_kind: ctx.comment.as_ref().map(|c| c.kind),
            reason,
        }
    }
}

/// Evaluate `ctx` against `config`, consulting the forge for actor checks.
pub async fn evaluate(
    ctx: &EventContext,
    config: &TriggerConfig,
    forge: &dyn ForgeApi,
) -> Result<TriggerDecision> {
    let matched = match_event(ctx, config)?;
    if !matched.activates() {
        debug!(
            event = %ctx.event_name,
            action = ?ctx.action,
            reason = %matched,
            "Event does not trigger"
        );
        return Ok(TriggerDecision::new(ctx, matched));
    }

    if let Some(rejection) = check_actor(ctx, forge).await {
        info!(actor = %ctx.actor, reason = %rejection, "Trigger rejected");
        return Ok(TriggerDecision::new(ctx, rejection));
    }

    if let Err(e) = check_permission(ctx, forge).await {
        info!(actor = %ctx.actor, error = %e, "Trigger rejected");
        return Ok(TriggerDecision::new(
            ctx,
            TriggerReason::PermissionDenied(e.to_string()),
        ));
    }

    info!(
        actor = %ctx.actor,
        entity = ctx.entity_number,
        reason = %matched,
        "Trigger matched"
    );
    Ok(TriggerDecision::new(ctx, matched))
}

/// Pure matching step: no forge calls.
pub fn match_event(ctx: &EventContext, config: &TriggerConfig) -> Result<TriggerReason> {
    if config.has_prompt_override() {
        return Ok(TriggerReason::DirectPrompt);
    }

    let action = ctx.action.as_deref().unwrap_or_default();

    if ctx.event_name == "issues" && action == "assigned" {
        let wanted = config
            .assignee_trigger
            .as_deref()
            .map(|a| a.trim().trim_start_matches('@'))
            .filter(|a| !a.is_empty());
        return Ok(match (wanted, ctx.assignee.as_deref()) {
            (Some(wanted), Some(assignee)) if wanted == assignee => TriggerReason::Assignee,
            _ => TriggerReason::NoMatch,
        });
    }

    if ctx.event_name == "issues" && action == "labeled" {
        let wanted = config
            .label_trigger
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty());
        return Ok(match (wanted, ctx.label.as_deref()) {
            (Some(wanted), Some(label)) if wanted == label => TriggerReason::Label,
            _ => TriggerReason::NoMatch,
        });
    }

    let phrase = PhraseMatcher::new(&config.trigger_phrase)?;

    match ctx.event_name.as_str() {
        "issue_comment" | "pull_request_review_comment" => {
            if !matches!(action, "created" | "edited") {
                return Ok(TriggerReason::UnsupportedAction);
            }
            Ok(scan_comment(ctx, &phrase))
        }
        "pull_request_review" => {
            if !matches!(action, "submitted" | "edited") {
                return Ok(TriggerReason::UnsupportedAction);
            }
            Ok(scan_comment(ctx, &phrase))
        }
        "issues" | "pull_request" | "pull_request_target" => {
            if !matches!(action, "opened" | "edited") {
                return Ok(TriggerReason::UnsupportedAction);
            }
            Ok(scan_entity(ctx, &phrase))
        }
        _ => Ok(TriggerReason::UnsupportedAction),
    }
}

fn scan_comment(ctx: &EventContext, phrase: &PhraseMatcher) -> TriggerReason {
    match &ctx.comment {
        Some(c) if phrase.is_match(&c.body) => TriggerReason::PhraseInComment,
        _ => TriggerReason::NoMatch,
    }
}

fn scan_entity(ctx: &EventContext, phrase: &PhraseMatcher) -> TriggerReason {
    if ctx.body.as_deref().is_some_and(|b| phrase.is_match(b)) {
        TriggerReason::PhraseInBody
    } else if ctx.title.as_deref().is_some_and(|t| phrase.is_match(t)) {
        TriggerReason::PhraseInTitle
    } else {
        TriggerReason::NoMatch
    }
}

/// `Some(reason)` when the actor must not trigger.
async fn check_actor(ctx: &EventContext, forge: &dyn ForgeApi) -> Option<TriggerReason> {
    if !forge.profile().checks_actor_type() {
        debug!(actor = %ctx.actor, "Actor-type check skipped for this forge, assuming human");
        return None;
    }

    match forge.get_actor_kind(&ctx.actor).await {
        Ok(ActorKind::Human) => None,
        Ok(ActorKind::Bot) => Some(TriggerReason::BotActor),
        Err(e) => {
            warn!(actor = %ctx.actor, error = %e, "Actor lookup failed, denying activation");
            Some(TriggerReason::PermissionDenied(format!(
                "could not classify actor: {e}"
            )))
        }
    }
}

/// Write access check. Lookup errors are forgiven on the reduced forge.
async fn check_permission(ctx: &EventContext, forge: &dyn ForgeApi) -> Result<()> {
    match forge.get_permission(&ctx.repository, &ctx.actor).await {
        Ok(permission) if permission.can_write() => {
            debug!(actor = %ctx.actor, ?permission, "Actor has write access");
            Ok(())
        }
        Ok(permission) => Err(Error::TriggerPermission {
            actor: ctx.actor.clone(),
            reason: format!("{permission:?} access is not enough, write is required"),
        }),
        Err(e) if forge.profile().is_reduced() => {
            warn!(
                actor = %ctx.actor,
                error = %e,
                "Permission lookup failed on reduced forge, assuming permitted"
            );
            Ok(())
        }
        Err(e) => Err(Error::TriggerPermission {
            actor: ctx.actor.clone(),
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forgehand_core::testing::FakeForge;
    use forgehand_core::{ForgeError, Permission, ProviderProfile};
    use serde_json::json;

    fn comment_event(body: &str) -> EventContext {
        let payload = json!({
            "action": "created",
            "repository": { "full_name": "acme/widgets" },
            "sender": { "login": "alice" },
            "issue": { "number": 42, "title": "Broken build", "body": "it fails" },
            "comment": { "id": 555, "body": body }
        });
        EventContext::from_payload("issue_comment", &payload, None).unwrap()
    }

    fn issue_event(action: &str, title: &str, body: &str) -> EventContext {
        let payload = json!({
            "action": action,
            "repository": { "full_name": "acme/widgets" },
            "sender": { "login": "alice" },
            "issue": { "number": 123, "title": title, "body": body },
            "assignee": { "login": "claude-bot" },
            "label": { "name": "ai-help" }
        });
        EventContext::from_payload("issues", &payload, None).unwrap()
    }

    fn config() -> TriggerConfig {
        TriggerConfig::default()
    }

    #[test]
    fn phrase_in_comment_matches() {
        let reason = match_event(&comment_event("@claude fix it"), &config()).unwrap();
        assert_eq!(reason, TriggerReason::PhraseInComment);
    }

    #[test]
    fn missing_phrase_never_matches() {
        for body in ["fix it", "@claudette fix it", "", "claude fix it"] {
            let reason = match_event(&comment_event(body), &config()).unwrap();
            assert!(!reason.activates(), "body {body:?} should not match");
        }
    }

    #[test]
    fn direct_prompt_always_matches() {
        let mut cfg = config();
        cfg.direct_prompt = Some("Review this PR".into());
        for body in ["fix it", "", "nothing"] {
            assert_eq!(
                match_event(&comment_event(body), &cfg).unwrap(),
                TriggerReason::DirectPrompt
            );
        }

        let mut cfg = config();
        cfg.override_prompt = Some("Custom".into());
        assert_eq!(
            match_event(&issue_event("closed", "x", "y"), &cfg).unwrap(),
            TriggerReason::DirectPrompt
        );
    }

    #[test]
    fn issue_body_then_title() {
        let ctx = issue_event("opened", "Help", "@claude please implement");
        assert_eq!(match_event(&ctx, &config()).unwrap(), TriggerReason::PhraseInBody);

        let ctx = issue_event("opened", "@claude add caching", "details inside");
        assert_eq!(match_event(&ctx, &config()).unwrap(), TriggerReason::PhraseInTitle);

        let ctx = issue_event("closed", "@claude add caching", "details");
        assert_eq!(
            match_event(&ctx, &config()).unwrap(),
            TriggerReason::UnsupportedAction
        );
    }

    fn pr_event(action: &str, body: &str) -> EventContext {
        let payload = json!({
            "action": action,
            "repository": { "full_name": "acme/widgets" },
            "sender": { "login": "alice" },
            "pull_request": {
                "number": 7, "title": "Refactor", "body": body, "state": "open",
                "head": { "ref": "feature-x" }, "base": { "ref": "main" }
            }
        });
        EventContext::from_payload("pull_request", &payload, None).unwrap()
    }

    #[test]
    fn pr_body_only_on_new_or_edited_text() {
        for action in ["opened", "edited"] {
            let ctx = pr_event(action, "@claude implement");
            assert_eq!(match_event(&ctx, &config()).unwrap(), TriggerReason::PhraseInBody);
        }
        for action in ["synchronize", "closed", "labeled", "review_requested", "reopened"] {
            let ctx = pr_event(action, "@claude implement");
            assert_eq!(
                match_event(&ctx, &config()).unwrap(),
                TriggerReason::UnsupportedAction,
                "action {action}"
            );
        }
    }

    #[test]
    fn assignee_trigger_strips_at_sign() {
        let mut cfg = config();
        cfg.assignee_trigger = Some("@claude-bot".into());
        let ctx = issue_event("assigned", "t", "b");
        assert_eq!(match_event(&ctx, &cfg).unwrap(), TriggerReason::Assignee);

        cfg.assignee_trigger = Some("someone-else".into());
        assert_eq!(match_event(&ctx, &cfg).unwrap(), TriggerReason::NoMatch);

        cfg.assignee_trigger = None;
        assert_eq!(match_event(&ctx, &cfg).unwrap(), TriggerReason::NoMatch);
    }

    #[test]
    fn label_trigger() {
        let mut cfg = config();
        cfg.label_trigger = Some("ai-help".into());
        let ctx = issue_event("labeled", "t", "b");
        assert_eq!(match_event(&ctx, &cfg).unwrap(), TriggerReason::Label);

        cfg.label_trigger = Some("bug".into());
        assert_eq!(match_event(&ctx, &cfg).unwrap(), TriggerReason::NoMatch);
    }

    #[test]
    fn deleted_comment_does_not_trigger() {
        let payload = json!({
            "action": "deleted",
            "repository": { "full_name": "acme/widgets" },
            "sender": { "login": "alice" },
            "issue": { "number": 42, "title": "t", "body": "" },
            "comment": { "id": 1, "body": "@claude" }
        });
        let ctx = EventContext::from_payload("issue_comment", &payload, None).unwrap();
        assert_eq!(
            match_event(&ctx, &config()).unwrap(),
            TriggerReason::UnsupportedAction
        );
    }

    #[tokio::test]
    async fn decision_carries_comment_identity() {
        let forge = FakeForge::new(ProviderProfile::full());
        let decision = evaluate(&comment_event("@claude go"), &config(), &forge)
            .await
            .unwrap();
        assert!(decision.should_activate);
        assert_eq!(decision.trigger_username, "alice");
        assert_eq!(decision.comment_id, Some(555));
        assert_eq!(decision.comment_kind, Some(CommentKind::Issue));
    }

    #[tokio::test]
    async fn bot_never_activates_on_full_forge() {
        let forge = FakeForge::new(ProviderProfile::full()).with_actor("alice", ActorKind::Bot);
        let decision = evaluate(&comment_event("@claude go"), &config(), &forge)
            .await
            .unwrap();
        assert!(!decision.should_activate);
        assert_eq!(decision.reason, TriggerReason::BotActor);

        let mut cfg = config();
        cfg.direct_prompt = Some("do it".into());
        let decision = evaluate(&comment_event("x"), &cfg, &forge).await.unwrap();
        assert!(!decision.should_activate);
    }

    #[tokio::test]
    async fn actor_check_skipped_on_reduced_forge() {
        let forge =
            FakeForge::new(ProviderProfile::reduced()).with_actor("alice", ActorKind::Bot);
        let decision = evaluate(&comment_event("@claude go"), &config(), &forge)
            .await
            .unwrap();
        assert!(decision.should_activate);
        assert!(!forge.calls().contains(&"get_actor_kind".to_string()));
    }

    #[tokio::test]
    async fn no_forge_calls_without_match() {
        let forge = FakeForge::new(ProviderProfile::full());
        let decision = evaluate(&comment_event("hello"), &config(), &forge)
            .await
            .unwrap();
        assert!(!decision.should_activate);
        assert!(forge.calls().is_empty());
    }

    #[tokio::test]
    async fn read_only_actor_is_denied() {
        let forge = FakeForge::new(ProviderProfile::full())
            .with_permission("alice", Ok(Permission::Read));
        let decision = evaluate(&comment_event("@claude go"), &config(), &forge)
            .await
            .unwrap();
        assert!(!decision.should_activate);
        assert!(matches!(decision.reason, TriggerReason::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn permission_errors_depend_on_profile() {
        let failing = || Err(ForgeError::Network("connection reset".into()));

        let full = FakeForge::new(ProviderProfile::full()).with_permission("alice", failing());
        let decision = evaluate(&comment_event("@claude go"), &config(), &full)
            .await
            .unwrap();
        assert!(!decision.should_activate);

        let reduced =
            FakeForge::new(ProviderProfile::reduced()).with_permission("alice", failing());
        let decision = evaluate(&comment_event("@claude go"), &config(), &reduced)
            .await
            .unwrap();
        assert!(decision.should_activate);
    }
}
