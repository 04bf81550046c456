//! The forgehand job pipeline.
//!
//! [`JobRunner`] drives one forge event from trigger evaluation to the
//! final tracking-comment update. The agent itself runs out of process
//! behind [`forgehand_core::AgentExecutor`]; [`CommandExecutor`] is the
//! subprocess implementation.

pub mod entity;
pub mod executor;
pub mod prompt;
pub mod runner;

pub use entity::{EntityData, PrDetails};
pub use executor::{CommandExecutor, parse_outcome};
pub use prompt::{PromptComment, PromptInputs, PromptVariables};
pub use runner::{Clock, JobReport, JobRunner};
