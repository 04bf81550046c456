//! Provider profile: which forge capability set is in effect.
//!
//! Built once from configuration and passed by reference to every component
//! that behaves differently per forge, instead of each call site sniffing
//! environment variables on its own.

use serde::{Deserialize, Serialize};

/// The public GitHub REST endpoint; anything else is treated as a
/// reduced-capability forge unless configured explicitly.
pub const GITHUB_API_URL: &str = "https://api.github.com";

/// Which forge family the job talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForgeKind {
    /// Full-capability forge (GitHub-style API)
    Github,
    /// Reduced-capability forge (Gitea-style API)
    Gitea,
}

impl ForgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Github => "github",
            Self::Gitea => "gitea",
        }
    }
}

impl std::str::FromStr for ForgeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "github" => Ok(Self::Github),
            "gitea" | "forgejo" => Ok(Self::Gitea),
            other => Err(format!("unknown forge kind '{other}' (expected github or gitea)")),
        }
    }
}

/// Capability flags for the active forge. Never mutated after construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderProfile {
    pub kind: ForgeKind,
    pub supports_atomic_multi_commit: bool,
    pub supports_compare_api: bool,
    pub supports_branch_delete: bool,
    pub supports_graphql: bool,
}

impl ProviderProfile {
    /// The full-capability profile.
    pub const fn full() -> Self {
        Self {
            kind: ForgeKind::Github,
            supports_atomic_multi_commit: true,
            supports_compare_api: true,
            supports_branch_delete: true,
            supports_graphql: true,
        }
    }

    /// The reduced-capability profile.
    pub const fn reduced() -> Self {
        Self {
            kind: ForgeKind::Gitea,
            supports_atomic_multi_commit: false,
            supports_compare_api: false,
            supports_branch_delete: false,
            supports_graphql: false,
        }
    }

    pub const fn for_kind(kind: ForgeKind) -> Self {
        match kind {
            ForgeKind::Github => Self::full(),
            ForgeKind::Gitea => Self::reduced(),
        }
    }

    /// Derive the profile from the configured API base URL.
    pub fn from_api_url(api_url: &str) -> Self {
        let normalized = api_url.trim().trim_end_matches('/');
        if normalized.is_empty() || normalized.eq_ignore_ascii_case(GITHUB_API_URL) {
            Self::full()
        } else {
            Self::reduced()
        }
    }

    /// True for the reduced-capability forge.
    pub fn is_reduced(&self) -> bool {
        self.kind == ForgeKind::Gitea
    }

    /// Whether the forge's user-profile endpoint can be trusted to classify
    /// bot accounts.
    pub fn checks_actor_type(&self) -> bool {
        !self.is_reduced()
    }

    /// Whether branch tips should be read from the local checkout's remote
    /// rather than the REST API.
    pub fn prefers_local_refs(&self) -> bool {
        !self.supports_compare_api
    }
}

impl Default for ProviderProfile {
    fn default() -> Self {
        Self::full()
    }
}
