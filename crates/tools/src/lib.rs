//! # forgehand tools
//!
//! Bounds what the external agent may do.
//!
//! - [`CapabilityGate`] resolves the allow and deny lists from the
//!   [`ToolCatalog`], the job's mode, and the user's overrides.
//! - [`ToolProviderConfig`] describes the tool providers the agent should
//!   start, with the job's repository, branch, and token in their
//!   environment.

pub mod catalog;
pub mod gate;
pub mod provider_config;

pub use catalog::ToolCatalog;
pub use gate::{CapabilityGate, ResolvedTools, ToolRequest};
pub use provider_config::{ProviderEnv, ServerSpec, ToolProviderConfig};
