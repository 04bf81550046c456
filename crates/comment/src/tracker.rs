//! The tracking comment's lifecycle on the forge.
//!
//! Created once, then rewritten in full at each phase. Every write is a
//! full-body replace keyed by comment id, so retries are safe. The comment
//! is the only channel back to the user, so failures here are fatal apart
//! from the single fallback on creation.

use std::sync::Arc;

use forgehand_core::{
    BranchInfo, BranchStatus, CommentKind, CommentPhase, CommentTarget, EntityKind, Error,
    ExecutionOutcome, ForgeApi, RepoId, Result, TrackingComment,
};
use forgehand_forge::LinkTemplates;
use tracing::{debug, info, warn};

use crate::render::{BodyRenderer, FinalSummary, LinkedBranch};

/// Where the triggering comment lives, as reported by the trigger evaluator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplyTarget {
    pub comment_id: Option<u64>,
    pub comment_kind: Option<CommentKind>,
}

impl ReplyTarget {
    /// Inline review comments are answered in their thread.
    fn thread_parent(&self) -> Option<u64> {
        match (self.comment_kind, self.comment_id) {
            (Some(CommentKind::ReviewInline), Some(id)) => Some(id),
            _ => None,
        }
    }
}

/// Inputs for the final rewrite.
#[derive(Debug, Clone)]
pub struct JobResult<'a> {
    pub outcome: &'a ExecutionOutcome,
    pub trigger_username: &'a str,
    /// Wall-clock job time, used when the agent reports no duration
    pub elapsed_ms: u64,
    pub branch: &'a BranchInfo,
    /// Cleanup classification of the created branch, if one was created
    pub branch_status: Option<BranchStatus>,
    pub entity_kind: EntityKind,
    pub entity_number: u64,
}

pub struct CommentTracker {
    forge: Arc<dyn ForgeApi>,
    repo: RepoId,
    entity_number: u64,
    renderer: BodyRenderer,
    links: LinkTemplates,
    bot_name: String,
    job_url: String,
}

impl CommentTracker {
    pub fn new(
        forge: Arc<dyn ForgeApi>,
        repo: RepoId,
        entity_number: u64,
        renderer: BodyRenderer,
        links: LinkTemplates,
        bot_name: impl Into<String>,
        run_id: &str,
    ) -> Self {
        let job_url = links.job_run(run_id);
        Self {
            forge,
            repo,
            entity_number,
            renderer,
            links,
            bot_name: bot_name.into(),
            job_url,
        }
    }

    pub fn job_url(&self) -> &str {
        &self.job_url
    }

    pub fn renderer(&self) -> &BodyRenderer {
        &self.renderer
    }

    /// Post the working comment. Review-thread replies fall back once to
    /// an issue comment; an issue comment is retried once.
    pub async fn create(&self, reply: ReplyTarget) -> Result<TrackingComment> {
        let body = self.renderer.working(&self.job_url);

        let primary = match reply.thread_parent() {
            Some(parent) => self
                .forge
                .create_review_reply(&self.repo, self.entity_number, parent, &body)
                .await
                .map(|c| (c, CommentTarget::ReviewThread)),
            None => self
                .forge
                .create_issue_comment(&self.repo, self.entity_number, &body)
                .await
                .map(|c| (c, CommentTarget::Issue)),
        };

        let (created, target) = match primary {
            Ok(created) => created,
            Err(e) => {
                warn!(error = %e, "Could not create tracking comment, falling back to an issue comment");
                self.forge
                    .create_issue_comment(&self.repo, self.entity_number, &body)
                    .await
                    .map(|c| (c, CommentTarget::Issue))
                    .map_err(|e| Error::comment("create", e))?
            }
        };

        info!(comment_id = created.id, ?target, "Tracking comment created");
        Ok(TrackingComment::new(created.id, target, body))
    }

    /// Mark the job as started. The posted body already shows the working
    /// state, so the forge is not called.
    pub fn begin(&self, comment: &mut TrackingComment) {
        if comment.phase == CommentPhase::Created {
            comment.phase = CommentPhase::Working;
            debug!(comment_id = comment.id, "Tracking comment working");
        }
    }

    /// Move to `BranchLinked` when a branch was created, otherwise stay in
    /// `Working` without touching the forge.
    pub async fn link_branch(
        &self,
        comment: &mut TrackingComment,
        claude_branch: Option<&str>,
    ) -> Result<()> {
        self.begin(comment);
        let Some(branch) = claude_branch else {
            return Ok(());
        };

        let body = self.renderer.branch_linked(
            &comment.current_body,
            &self.job_url,
            &self.links.branch(branch),
        );
        self.write(comment, body, "link-branch").await?;
        comment.phase = CommentPhase::BranchLinked;
        debug!(comment_id = comment.id, branch = %branch, "Branch link added");
        Ok(())
    }

    /// Build the final summary: links only for a created branch that holds
    /// changes.
    pub fn summarize(&self, result: &JobResult<'_>) -> FinalSummary {
        let outcome = result.outcome;
        let show_branch = result.branch_status.is_some_and(|s| s.show_link());

        let (branch, create_pr_url) = match result.branch.claude_branch.as_deref() {
            Some(name) if show_branch => {
                let (label, noun) = match result.entity_kind {
                    EntityKind::Issue => ("Issue", "issue"),
                    EntityKind::PullRequest => ("PR", "pull request"),
                };
                let title = format!(
                    "{label} #{}: Changes from {}",
                    result.entity_number, self.bot_name
                );
                let body = format!("This PR addresses {noun} #{}", result.entity_number);
                (
                    Some(LinkedBranch {
                        name: name.to_string(),
                        url: self.links.branch(name),
                    }),
                    Some(self.links.create_pr(
                        &result.branch.base_branch,
                        name,
                        &title,
                        &body,
                    )),
                )
            }
            _ => (None, None),
        };

        FinalSummary {
            success: outcome.success,
            trigger_username: result.trigger_username.to_string(),
            duration_ms: Some(outcome.duration_ms.unwrap_or(result.elapsed_ms)),
            cost_usd: outcome.cost_usd,
            num_turns: outcome.num_turns,
            error: outcome.error.clone().filter(|_| !outcome.success),
            job_url: self.job_url.clone(),
            branch,
            create_pr_url,
        }
    }

    /// Rewrite the comment with the outcome. Reads the live body first so
    /// content the agent wrote during its run is kept.
    pub async fn finalize(&self, comment: &mut TrackingComment, summary: &FinalSummary) -> Result<()> {
        let current = match self
            .forge
            .get_comment(&self.repo, comment.id, comment.target)
            .await
        {
            Ok(live) => live.body,
            Err(e) => {
                warn!(
                    comment_id = comment.id,
                    error = %e,
                    "Could not read tracking comment, using the last body written"
                );
                comment.current_body.clone()
            }
        };

        let body = self.renderer.final_body(summary, &current);
        self.write(comment, body, "finalize").await?;
        comment.phase = CommentPhase::Final;
        info!(comment_id = comment.id, success = summary.success, "Tracking comment finalized");
        Ok(())
    }

    async fn write(&self, comment: &mut TrackingComment, body: String, operation: &str) -> Result<()> {
        self.forge
            .update_comment(&self.repo, comment.id, comment.target, &body)
            .await
            .map_err(|e| Error::comment(operation, e))?;
        comment.current_body = body;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forgehand_config::CommentConfig;
    use forgehand_core::testing::FakeForge;
    use forgehand_core::{ForgeKind, ProviderProfile};

    fn tracker(forge: Arc<FakeForge>) -> CommentTracker {
        let repo = RepoId::new("acme", "widgets");
        let kind = forge.profile().kind;
        let server = match kind {
            ForgeKind::Github => "https://github.com",
            ForgeKind::Gitea => "https://git.example.org",
        };
        CommentTracker::new(
            forge,
            repo.clone(),
            9,
            BodyRenderer::new(&CommentConfig::default()),
            LinkTemplates::new(kind, server, &repo),
            "Claude",
            "42",
        )
    }

    fn inline_reply() -> ReplyTarget {
        ReplyTarget {
            comment_id: Some(777),
            comment_kind: Some(CommentKind::ReviewInline),
        }
    }

    fn created_branch() -> BranchInfo {
        BranchInfo {
            base_branch: "main".into(),
            claude_branch: Some("claude/pr-9-20240115_143022".into()),
            current_branch: "claude/pr-9-20240115_143022".into(),
        }
    }

    #[tokio::test]
    async fn inline_comment_replies_in_thread() {
        let forge = Arc::new(FakeForge::new(ProviderProfile::full()));
        let comment = tracker(forge.clone()).create(inline_reply()).await.unwrap();
        assert_eq!(comment.target, CommentTarget::ReviewThread);
        assert_eq!(comment.phase, CommentPhase::Created);
        assert_eq!(forge.calls(), vec!["create_review_reply"]);
    }

    #[tokio::test]
    async fn thread_reply_falls_back_to_issue_comment() {
        let forge = Arc::new(FakeForge::new(ProviderProfile::reduced()));
        let comment = tracker(forge.clone()).create(inline_reply()).await.unwrap();
        assert_eq!(comment.target, CommentTarget::Issue);
        assert_eq!(forge.calls(), vec!["create_review_reply", "create_issue_comment"]);
        assert_eq!(forge.comments().len(), 1);
    }

    #[tokio::test]
    async fn creation_failure_is_fatal() {
        let forge = Arc::new(FakeForge::new(ProviderProfile::full()).failing("create_issue_comment"));
        let err = tracker(forge.clone())
            .create(ReplyTarget::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CommentOperation { .. }));
        assert_eq!(forge.calls().len(), 2);
    }

    #[tokio::test]
    async fn updates_use_the_creation_endpoint() {
        let forge = Arc::new(FakeForge::new(ProviderProfile::full()));
        let t = tracker(forge.clone());
        let mut comment = t.create(inline_reply()).await.unwrap();
        t.link_branch(&mut comment, Some("claude/pr-9-20240115_143022"))
            .await
            .unwrap();
        assert_eq!(comment.phase, CommentPhase::BranchLinked);

        let stored = forge.comments();
        assert_eq!(stored[0].0, CommentTarget::ReviewThread);
        assert!(stored[0].1.body.contains("[View branch](https://github.com/acme/widgets/tree/claude/pr-9-20240115_143022)"));
    }

    #[tokio::test]
    async fn phases_advance_from_created_through_working() {
        let forge = Arc::new(FakeForge::new(ProviderProfile::full()));
        let t = tracker(forge.clone());
        let mut comment = t.create(ReplyTarget::default()).await.unwrap();
        assert_eq!(comment.phase, CommentPhase::Created);

        t.begin(&mut comment);
        assert_eq!(comment.phase, CommentPhase::Working);
        assert_eq!(forge.calls(), vec!["create_issue_comment"]);

        t.link_branch(&mut comment, Some("claude/issue-7-20240115_143022"))
            .await
            .unwrap();
        assert_eq!(comment.phase, CommentPhase::BranchLinked);

        // Linking never moves a comment back to Working
        t.begin(&mut comment);
        assert_eq!(comment.phase, CommentPhase::BranchLinked);
    }

    #[tokio::test]
    async fn no_branch_means_no_forge_write() {
        let forge = Arc::new(FakeForge::new(ProviderProfile::full()));
        let t = tracker(forge.clone());
        let mut comment = t.create(ReplyTarget::default()).await.unwrap();
        t.link_branch(&mut comment, None).await.unwrap();
        assert_eq!(comment.phase, CommentPhase::Working);
        assert_eq!(forge.calls(), vec!["create_issue_comment"]);
    }

    #[tokio::test]
    async fn empty_branch_gets_no_links() {
        let forge = Arc::new(FakeForge::new(ProviderProfile::reduced()));
        let t = tracker(forge.clone());
        let mut comment = t.create(ReplyTarget::default()).await.unwrap();
        let branch = created_branch();
        t.link_branch(&mut comment, branch.claude_branch.as_deref()).await.unwrap();

        let outcome = ExecutionOutcome { success: true, ..Default::default() };
        let summary = t.summarize(&JobResult {
            outcome: &outcome,
            trigger_username: "alice",
            elapsed_ms: 30_000,
            branch: &branch,
            branch_status: Some(BranchStatus::Empty),
            entity_kind: EntityKind::PullRequest,
            entity_number: 9,
        });
        t.finalize(&mut comment, &summary).await.unwrap();

        let body = forge.comment_body(comment.id).unwrap();
        assert!(body.starts_with("**Claude finished @alice's task in 30s** —— [View job](https://git.example.org/acme/widgets/actions/runs/42)"));
        assert!(!body.contains("src/branch"));
        assert!(!body.contains("Create PR"));
        assert_eq!(comment.phase, CommentPhase::Final);
    }

    #[tokio::test]
    async fn branch_with_changes_gets_branch_and_pr_links() {
        let forge = Arc::new(FakeForge::new(ProviderProfile::reduced()));
        let t = tracker(forge);
        let outcome = ExecutionOutcome {
            success: true,
            duration_ms: Some(61_000),
            cost_usd: Some(0.5),
            ..Default::default()
        };
        let branch = created_branch();
        let summary = t.summarize(&JobResult {
            outcome: &outcome,
            trigger_username: "alice",
            elapsed_ms: 99_000,
            branch: &branch,
            branch_status: Some(BranchStatus::HasChanges),
            entity_kind: EntityKind::Issue,
            entity_number: 9,
        });
        assert_eq!(summary.duration_ms, Some(61_000));
        let linked = summary.branch.as_ref().unwrap();
        assert_eq!(
            linked.url,
            "https://git.example.org/acme/widgets/src/branch/claude/pr-9-20240115_143022"
        );
        let pr = summary.create_pr_url.as_deref().unwrap();
        assert!(pr.starts_with("https://git.example.org/acme/widgets/compare/main...claude/pr-9-20240115_143022?"));
        assert!(!pr.contains("quick_pull"));
    }

    #[tokio::test]
    async fn finalize_is_idempotent() {
        let forge = Arc::new(FakeForge::new(ProviderProfile::full()));
        let t = tracker(forge.clone());
        let mut comment = t.create(ReplyTarget::default()).await.unwrap();

        let outcome = ExecutionOutcome::failed("agent exited with status 2");
        let branch = created_branch();
        let summary = t.summarize(&JobResult {
            outcome: &outcome,
            trigger_username: "alice",
            elapsed_ms: 5_000,
            branch: &branch,
            branch_status: Some(BranchStatus::HasChanges),
            entity_kind: EntityKind::Issue,
            entity_number: 9,
        });

        t.finalize(&mut comment, &summary).await.unwrap();
        let first = forge.comment_body(comment.id).unwrap();
        t.finalize(&mut comment, &summary).await.unwrap();
        let second = forge.comment_body(comment.id).unwrap();

        assert_eq!(first, second);
        assert!(first.starts_with("**Claude encountered an error after 5s**"));
        assert!(first.contains("agent exited with status 2"));
    }

    #[tokio::test]
    async fn update_failure_is_fatal() {
        let forge = Arc::new(FakeForge::new(ProviderProfile::full()).failing("update_comment"));
        let t = tracker(forge);
        let mut comment = t.create(ReplyTarget::default()).await.unwrap();
        let err = t
            .link_branch(&mut comment, Some("claude/issue-9"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CommentOperation { .. }));
        assert_eq!(comment.phase, CommentPhase::Created);
    }
}
