//! Capability Gate: the final allow and deny lists handed to the agent.
//!
//! Resolution order:
//! 1. allow = base, plus CI tools (PR with CI read), plus signing tools or
//!    local-git tools, plus the user's allow list
//! 2. deny = defaults minus the user's allow list, plus the user's deny list
//! 3. anything denied is removed from allow
//!
//! Both lists keep first-insertion order and hold no duplicates.

use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use crate::catalog::ToolCatalog;

/// Per-job inputs to resolution.
#[derive(Debug, Clone, Default)]
pub struct ToolRequest {
    pub is_pr: bool,
    pub read_ci: bool,
    pub commit_signing: bool,
    pub user_allowed: Vec<String>,
    pub user_disallowed: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedTools {
    pub allowed: Vec<String>,
    pub disallowed: Vec<String>,
}

impl ResolvedTools {
    pub fn allowed_csv(&self) -> String {
        self.allowed.join(",")
    }

    pub fn disallowed_csv(&self) -> String {
        self.disallowed.join(",")
    }
}

/// Insertion-ordered set of tool names.
#[derive(Default)]
struct OrderedSet {
    items: Vec<String>,
    seen: HashSet<String>,
}

impl OrderedSet {
    fn extend<'a>(&mut self, names: impl IntoIterator<Item = &'a String>) {
        for name in names {
            let name = name.trim();
            if !name.is_empty() && self.seen.insert(name.to_string()) {
                self.items.push(name.to_string());
            }
        }
    }

    fn remove_all(&mut self, names: &HashSet<&str>) {
        self.items.retain(|item| !names.contains(item.as_str()));
        self.seen.retain(|item| !names.contains(item.as_str()));
    }

    fn into_vec(self) -> Vec<String> {
        self.items
    }
}

fn name_set(names: &[String]) -> HashSet<&str> {
    names
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty())
        .collect()
}

pub struct CapabilityGate {
    catalog: ToolCatalog,
}

impl CapabilityGate {
    pub fn new(catalog: ToolCatalog) -> Self {
        Self { catalog }
    }

    pub fn resolve(&self, request: &ToolRequest) -> ResolvedTools {
        let user_allowed = name_set(&request.user_allowed);
        let user_denied = name_set(&request.user_disallowed);

        let mut allowed = OrderedSet::default();
        allowed.extend(&self.catalog.base);
        if request.is_pr && request.read_ci {
            allowed.extend(&self.catalog.ci);
        }
        if request.commit_signing {
            allowed.extend(&self.catalog.signing);
        } else {
            allowed.extend(&self.catalog.local_git);
        }
        allowed.extend(&request.user_allowed);

        let mut disallowed = OrderedSet::default();
        disallowed.extend(
            self.catalog
                .default_disallowed
                .iter()
                .filter(|t| !user_allowed.contains(t.trim())),
        );
        disallowed.extend(&request.user_disallowed);

        allowed.remove_all(&user_denied);

        let resolved = ResolvedTools {
            allowed: allowed.into_vec(),
            disallowed: disallowed.into_vec(),
        };
        debug!(
            allowed = resolved.allowed.len(),
            disallowed = resolved.disallowed.len(),
            "Resolved tool sets"
        );
        resolved
    }
}

impl Default for CapabilityGate {
    fn default() -> Self {
        Self::new(ToolCatalog::default())
    }
}
