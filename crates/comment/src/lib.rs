//! # forgehand comment
//!
//! The tracking comment is the single user-visible output of a job. It is
//! created with a spinner, gains a branch link once a branch exists, and is
//! rewritten with the outcome at the end.

pub mod render;
pub mod tracker;

pub use render::{BodyRenderer, FinalSummary, LinkedBranch, format_duration};
pub use tracker::{CommentTracker, JobResult, ReplyTarget};
