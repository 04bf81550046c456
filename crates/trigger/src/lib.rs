//! # forgehand trigger
//!
//! Decides whether an incoming forge event should start a job.
//!
//! A job activates when the configured phrase appears in the relevant text,
//! when an issue is assigned to the trigger user or labelled with the
//! trigger label, or unconditionally when a direct prompt is configured.
//! Bot actors and actors without write access never activate.

pub mod evaluator;
pub mod phrase;

pub use evaluator::{TriggerDecision, TriggerReason, evaluate, match_event};
pub use phrase::PhraseMatcher;
