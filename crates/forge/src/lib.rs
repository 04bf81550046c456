//! Forge REST clients for forgehand.
//!
//! Two implementations of [`ForgeApi`](forgehand_core::ForgeApi):
//! - [`GithubClient`] — full capability (compare API, review replies, bot detection)
//! - [`GiteaClient`] — reduced capability; unsupported calls fail fast
//!
//! [`connect`] picks one from the job's
//! [`ProviderProfile`](forgehand_core::ProviderProfile).

pub mod gitea;
pub mod github;
pub mod links;
mod paths;
pub mod transport;
pub mod wire;

use std::sync::Arc;

use forgehand_core::{ForgeApi, ForgeError, ForgeKind, ProviderProfile};
use tracing::info;

pub use gitea::GiteaClient;
pub use github::GithubClient;
pub use links::LinkTemplates;

/// Build the forge client matching `profile`.
pub fn connect(
    profile: &ProviderProfile,
    api_url: &str,
    token: &str,
) -> Result<Arc<dyn ForgeApi>, ForgeError> {
    info!(forge = profile.kind.as_str(), api_url = %api_url, "Connecting to forge");
    Ok(match profile.kind {
        ForgeKind::Github => Arc::new(GithubClient::new(api_url, token)?),
        ForgeKind::Gitea => Arc::new(GiteaClient::new(api_url, token)?),
    })
}
