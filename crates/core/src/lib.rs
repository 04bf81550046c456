//! # forgehand core
//!
//! Domain types, collaborator traits, and error definitions for the
//! forgehand orchestrator. This crate does no I/O; it defines the model
//! that the trigger, branch, comment, and tool crates implement against.
//!
//! ## Collaborators
//!
//! Everything that touches the outside world sits behind a trait here:
//! - [`ForgeApi`] for the hosting platform's HTTP API
//! - [`GitOps`] for the local checkout
//! - [`AgentExecutor`] for the external coding agent

pub mod branch;
pub mod comment;
pub mod error;
pub mod event;
pub mod executor;
pub mod forge;
pub mod git;
pub mod profile;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export key types at crate root for ergonomics
pub use branch::{BranchInfo, BranchStatus};
pub use comment::{CommentPhase, CommentTarget, TrackingComment};
pub use error::{Error, ForgeError, GitError, Result};
pub use event::{CommentKind, EntityKind, EventContext, PrRefs, PrState, RepoId, TriggerComment};
pub use executor::{AgentExecutor, AgentRequest, ExecutionOutcome};
pub use forge::{
    ActorKind, BranchRef, CommentData, Comparison, ForgeApi, IssueData, Permission,
    PullRequestData, RepositoryInfo,
};
pub use git::GitOps;
pub use profile::{ForgeKind, ProviderProfile};
