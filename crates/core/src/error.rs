//! Error types for the forgehand domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each collaborator (forge API, local git) has its own error type; the
//! top-level [`Error`] mirrors the job-level failure taxonomy.

use thiserror::Error;

/// The top-level error type for a job run.
#[derive(Debug, Error)]
pub enum Error {
    // --- Startup ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Trigger ---
    #[error("Trigger permission denied for '{actor}': {reason}")]
    TriggerPermission { actor: String, reason: String },

    // --- Branch lifecycle ---
    #[error("Branch operation '{operation}' failed: {reason}")]
    BranchOperation { operation: String, reason: String },

    // --- Tracking comment ---
    #[error("Comment operation '{operation}' failed: {reason}")]
    CommentOperation { operation: String, reason: String },

    // --- Agent executor ---
    #[error("External agent error: {0}")]
    ExternalAgent(String),

    // --- Collaborators ---
    #[error("Forge error: {0}")]
    Forge(#[from] ForgeError),

    #[error("Git error: {0}")]
    Git(#[from] GitError),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn branch(operation: impl Into<String>, reason: impl ToString) -> Self {
        Self::BranchOperation {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }

    pub fn comment(operation: impl Into<String>, reason: impl ToString) -> Self {
        Self::CommentOperation {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Collaborator errors ---

#[derive(Debug, Clone, Error)]
pub enum ForgeError {
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("API request failed: {message} (status: {status_code})")]
    Api { status_code: u16, message: String },

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Operation not supported by this forge: {operation}")]
    Unsupported { operation: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected response shape: {0}")]
    Decode(String),
}

impl ForgeError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum GitError {
    #[error("git {args} failed (exit code {code}): {stderr}")]
    CommandFailed {
        args: String,
        code: i32,
        stderr: String,
    },

    #[error("Failed to spawn git: {0}")]
    Spawn(String),

    #[error("Reference not found: {reference}")]
    NotFound { reference: String },
}

impl GitError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
