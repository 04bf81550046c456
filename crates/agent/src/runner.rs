//! The job pipeline.
//!
//! One sequential pass per event: evaluate trigger, create the tracking
//! comment, fetch entity data, set up the branch, resolve tools, assemble
//! the prompt, run the agent, classify the branch, finalize the comment.
//! Nothing runs concurrently; every step awaits the previous one.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use forgehand_branch::{BranchClassifier, BranchManager, BranchRequest, PrBranchState};
use forgehand_comment::{BodyRenderer, CommentTracker, FinalSummary, JobResult, ReplyTarget};
use forgehand_config::JobConfig;
use forgehand_core::{
    AgentExecutor, AgentRequest, BranchInfo, BranchStatus, Error, EventContext,
    ExecutionOutcome, ForgeApi, GitOps, Result, TrackingComment,
};
use forgehand_forge::LinkTemplates;
use forgehand_tools::{
    CapabilityGate, ProviderEnv, ResolvedTools, ToolCatalog, ToolProviderConfig, ToolRequest,
};
use forgehand_trigger::{TriggerDecision, evaluate};
use serde::Serialize;
use tracing::{info, warn};

use crate::entity::EntityData;
use crate::prompt::{PromptInputs, PromptVariables};

/// Source of the current time. Injected so branch names are reproducible.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// What a run did.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub decision: TriggerDecision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<BranchInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_status: Option<BranchStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ResolvedTools>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ExecutionOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_body: Option<String>,
}

impl JobReport {
    fn skipped(decision: TriggerDecision) -> Self {
        Self {
            decision,
            comment_id: None,
            branch: None,
            branch_status: None,
            tools: None,
            outcome: None,
            final_body: None,
        }
    }

    pub fn activated(&self) -> bool {
        self.decision.should_activate
    }

    /// A skipped job counts as a success.
    pub fn succeeded(&self) -> bool {
        self.outcome.as_ref().is_none_or(|o| o.success)
    }
}

pub struct JobRunner {
    config: JobConfig,
    forge: Arc<dyn ForgeApi>,
    git: Arc<dyn GitOps>,
    executor: Arc<dyn AgentExecutor>,
    gate: CapabilityGate,
    clock: Clock,
}

impl JobRunner {
    pub fn new(
        config: JobConfig,
        forge: Arc<dyn ForgeApi>,
        git: Arc<dyn GitOps>,
        executor: Arc<dyn AgentExecutor>,
    ) -> Self {
        Self {
            config,
            forge,
            git,
            executor,
            gate: CapabilityGate::default(),
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_catalog(mut self, catalog: ToolCatalog) -> Self {
        self.gate = CapabilityGate::new(catalog);
        self
    }

    fn elapsed_ms(&self, started: DateTime<Utc>) -> u64 {
        let ms = ((self.clock)() - started).num_milliseconds();
        u64::try_from(ms).unwrap_or(0)
    }

    fn tracker(&self, ctx: &EventContext) -> CommentTracker {
        let profile = self.forge.profile();
        let links = LinkTemplates::new(profile.kind, &self.config.server_url(), &ctx.repository);
        CommentTracker::new(
            self.forge.clone(),
            ctx.repository.clone(),
            ctx.entity_number,
            BodyRenderer::new(&self.config.comment),
            links,
            self.config.comment.bot_name.clone(),
            self.config.run_id.as_deref().unwrap_or("local"),
        )
    }

    pub async fn run(&self, ctx: &EventContext) -> Result<JobReport> {
        let started = (self.clock)();
        info!(
            event = %ctx.event_name,
            repo = %ctx.repository,
            entity = ctx.entity_number,
            forge = self.forge.profile().kind.as_str(),
            "Job started"
        );

        let decision = evaluate(ctx, &self.config.trigger, self.forge.as_ref()).await?;
        if !decision.should_activate {
            info!(reason = %decision.reason, "Not activating");
            return Ok(JobReport::skipped(decision));
        }

        let tracker = self.tracker(ctx);
        let mut comment = tracker
            .create(ReplyTarget {
                comment_id: decision.comment_id,
                comment_kind: decision.comment_kind,
            })
            .await?;

        match self.work(ctx, &decision, &tracker, &mut comment, started).await {
            Ok(report) => Ok(report),
            Err(e) => {
                self.report_failure(&tracker, &mut comment, &decision, started, &e)
                    .await;
                Err(e)
            }
        }
    }

    async fn work(
        &self,
        ctx: &EventContext,
        decision: &TriggerDecision,
        tracker: &CommentTracker,
        comment: &mut TrackingComment,
        started: DateTime<Utc>,
    ) -> Result<JobReport> {
        tracker.begin(comment);
        let entity = EntityData::fetch(self.forge.as_ref(), ctx).await?;
        let repo_info = self.forge.get_repository(&ctx.repository).await?;

        let request = BranchRequest {
            entity_kind: ctx.entity_kind,
            entity_number: ctx.entity_number,
            pr: entity.pr.as_ref().map(|pr| PrBranchState {
                state: pr.state,
                head_ref: pr.head_ref.clone(),
                base_ref: pr.base_ref.clone(),
            }),
            default_branch: repo_info.default_branch,
        };
        let branch = BranchManager::new(self.git.clone(), self.config.branch.clone())
            .setup(&request, started)
            .await?;
        tracker
            .link_branch(comment, branch.claude_branch.as_deref())
            .await?;

        let tools = self.gate.resolve(&ToolRequest {
            is_pr: ctx.is_pr(),
            read_ci: self.config.tools.read_ci,
            commit_signing: self.config.tools.commit_signing,
            user_allowed: self.config.tools.allowed_tools.clone(),
            user_disallowed: self.config.tools.disallowed_tools.clone(),
        });

        let token = self
            .config
            .forge
            .token
            .clone()
            .ok_or_else(|| Error::config("forge token is not configured"))?;
        let tool_config = ToolProviderConfig::build(
            &self.config.tools,
            &ProviderEnv {
                token,
                owner: ctx.repository.owner.clone(),
                repo: ctx.repository.name.clone(),
                branch: branch.current_branch.clone(),
                base_branch: branch.base_branch.clone(),
                repo_dir: self.config.workspace_dir(),
                api_url: self.config.forge.api_url.clone(),
                tracking_comment_id: Some(comment.id),
            },
        )?;

        let prompt = PromptVariables::assemble(PromptInputs {
            ctx,
            trigger: &self.config.trigger,
            trigger_username: &decision.trigger_username,
            entity: &entity,
            branch: &branch,
            comment,
            job_url: tracker.job_url(),
        });

        let outcome = self
            .execute(AgentRequest {
                prompt_variables: serde_json::to_value(&prompt)?,
                allowed_tools: tools.allowed.clone(),
                disallowed_tools: tools.disallowed.clone(),
                tool_config: tool_config.to_value()?,
            })
            .await;

        let branch_status = match branch.claude_branch.as_deref() {
            Some(name) => Some(
                BranchClassifier::for_profile(
                    self.forge.profile(),
                    self.forge.clone(),
                    self.git.clone(),
                    &self.config.branch.remote,
                )
                .classify(&ctx.repository, &branch.base_branch, name)
                .await,
            ),
            None => None,
        };

        let summary = tracker.summarize(&JobResult {
            outcome: &outcome,
            trigger_username: &decision.trigger_username,
            elapsed_ms: self.elapsed_ms(started),
            branch: &branch,
            branch_status,
            entity_kind: ctx.entity_kind,
            entity_number: ctx.entity_number,
        });
        tracker.finalize(comment, &summary).await?;

        info!(
            success = outcome.success,
            comment_id = comment.id,
            branch = %branch.current_branch,
            "Job finished"
        );
        Ok(JobReport {
            decision: decision.clone(),
            comment_id: Some(comment.id),
            branch: Some(branch),
            branch_status,
            tools: Some(tools),
            outcome: Some(outcome),
            final_body: Some(comment.current_body.clone()),
        })
    }

    /// Agent errors become a failed outcome; they are reported, not retried.
    async fn execute(&self, request: AgentRequest) -> ExecutionOutcome {
        match self.executor.execute(request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(executor = self.executor.name(), error = %e, "Agent execution failed");
                ExecutionOutcome::failed(e.to_string())
            }
        }
    }

    /// Best effort: replace the spinner with the fatal error.
    async fn report_failure(
        &self,
        tracker: &CommentTracker,
        comment: &mut TrackingComment,
        decision: &TriggerDecision,
        started: DateTime<Utc>,
        error: &Error,
    ) {
        let summary = FinalSummary {
            success: false,
            trigger_username: decision.trigger_username.clone(),
            duration_ms: Some(self.elapsed_ms(started)),
            cost_usd: None,
            num_turns: None,
            error: Some(error.to_string()),
            job_url: tracker.job_url().to_string(),
            branch: None,
            create_pr_url: None,
        };
        if let Err(e) = tracker.finalize(comment, &summary).await {
            warn!(error = %e, "Could not record the failure in the tracking comment");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use forgehand_core::testing::{FakeForge, FakeGit, ScriptedAgent};
    use forgehand_core::{IssueData, ProviderProfile};
    use serde_json::json;

    fn config() -> JobConfig {
        let mut config = JobConfig::default();
        config.forge.token = Some("t0k".into());
        config.repository = Some("acme/widgets".into());
        config.run_id = Some("42".into());
        config
    }

    fn fixed_clock() -> Clock {
        Arc::new(|| Utc.with_ymd_and_hms(2024, 1, 15, 14, 30, 22).unwrap())
    }

    fn issue_event(body: &str) -> EventContext {
        EventContext::from_payload(
            "issues",
            &json!({
                "action": "opened",
                "repository": { "full_name": "acme/widgets" },
                "sender": { "login": "alice" },
                "issue": { "number": 123, "title": "Crash on start", "body": body }
            }),
            None,
        )
        .unwrap()
    }

    fn forge() -> FakeForge {
        FakeForge::new(ProviderProfile::reduced()).with_issue(IssueData {
            number: 123,
            title: "Crash on start".into(),
            body: "@claude please fix".into(),
            author: "alice".into(),
            state: "open".into(),
        })
    }

    #[tokio::test]
    async fn inactive_event_touches_nothing() {
        let forge = Arc::new(forge());
        let git = Arc::new(FakeGit::new("main"));
        let runner = JobRunner::new(
            config(),
            forge.clone(),
            git.clone(),
            Arc::new(ScriptedAgent::succeeding(ExecutionOutcome::default())),
        );
        let report = runner.run(&issue_event("no mention here")).await.unwrap();
        assert!(!report.activated());
        assert!(report.succeeded());
        assert!(forge.comments().is_empty());
        assert!(git.commands().is_empty());
    }

    #[tokio::test]
    async fn agent_receives_tools_and_provider_config() {
        let forge = Arc::new(forge());
        let git = Arc::new(FakeGit::new("main"));
        let agent = Arc::new(ScriptedAgent::succeeding(ExecutionOutcome {
            success: true,
            ..Default::default()
        }));
        let runner = JobRunner::new(config(), forge, git, agent.clone()).with_clock(fixed_clock());
        let report = runner.run(&issue_event("@claude please fix")).await.unwrap();
        assert!(report.succeeded());

        let request = agent.last_request().unwrap();
        assert!(request.allowed_tools.contains(&"mcp__local_git__commit_files".to_string()));
        assert_eq!(
            request.tool_config["mcpServers"]["forge"]["env"]["BRANCH_NAME"],
            "claude/issue-123-20240115_143022"
        );
        assert_eq!(request.prompt_variables["entity_number"], 123);
        assert_eq!(
            request.prompt_variables["tracking_comment_id"],
            json!(report.comment_id.unwrap())
        );
    }

    #[tokio::test]
    async fn new_branch_starts_from_repository_default_branch() {
        let forge = Arc::new(forge().with_default_branch("develop"));
        let git = Arc::new(FakeGit::new("develop"));
        let runner = JobRunner::new(
            config(),
            forge,
            git.clone(),
            Arc::new(ScriptedAgent::succeeding(ExecutionOutcome::default())),
        )
        .with_clock(fixed_clock());
        let report = runner.run(&issue_event("@claude fix")).await.unwrap();

        let branch = report.branch.unwrap();
        assert_eq!(branch.base_branch, "develop");
        assert!(git.commands().contains(&"pull origin develop".to_string()));
    }

    #[tokio::test]
    async fn agent_error_is_recorded_not_raised() {
        let forge = Arc::new(forge());
        let runner = JobRunner::new(
            config(),
            forge.clone(),
            Arc::new(FakeGit::new("main")),
            Arc::new(ScriptedAgent::erroring("agent exited with code 2: boom")),
        )
        .with_clock(fixed_clock());
        let report = runner.run(&issue_event("@claude fix")).await.unwrap();
        assert!(!report.succeeded());

        let body = forge.comment_body(report.comment_id.unwrap()).unwrap();
        assert!(body.starts_with("**Claude encountered an error after 0s**"));
        assert!(body.contains("agent exited with code 2: boom"));
    }

    #[tokio::test]
    async fn branch_failure_is_fatal_and_reported() {
        let forge = Arc::new(forge());
        let runner = JobRunner::new(
            config(),
            forge.clone(),
            Arc::new(FakeGit::new("main").failing("create_branch")),
            Arc::new(ScriptedAgent::succeeding(ExecutionOutcome::default())),
        )
        .with_clock(fixed_clock());
        let err = runner.run(&issue_event("@claude fix")).await.unwrap_err();
        assert!(matches!(err, Error::BranchOperation { .. }));

        let comments = forge.comments();
        assert_eq!(comments.len(), 1);
        let body = &comments[0].1.body;
        assert!(body.starts_with("**Claude encountered an error"));
        assert!(!body.contains("is working"));
    }
}
