//! # forgehand branch
//!
//! Branch lifecycle for a job: decide and check out the working branch at
//! the start, classify a created branch as empty or not at the end.
//!
//! Branches are only ever created, checked out, and pushed. Nothing here
//! rewrites history or deletes refs.

pub mod cleanup;
pub mod git;
pub mod manager;
pub mod naming;

pub use cleanup::{BranchClassifier, BranchTipSha, CleanupStrategy, CompareApi, TipSource, Verdict};
pub use git::ProcessGit;
pub use manager::{BranchManager, BranchPlan, BranchRequest, PrBranchState};
pub use naming::branch_name;
