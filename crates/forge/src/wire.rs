//! Response decoding shared by both clients.
//!
//! The two forge families return near-identical JSON for the endpoints we
//! use; the few differences (branch commit id field, nullable bodies) are
//! absorbed here.

use chrono::{DateTime, Utc};
use forgehand_core::{
    ActorKind, BranchRef, CommentData, Comparison, ForgeError, IssueData, Permission,
    PullRequestData, RepositoryInfo,
};
use serde_json::Value;

fn str_field(v: &Value, path: &[&str]) -> Option<String> {
    let mut cur = v;
    for key in path {
        cur = cur.get(key)?;
    }
    cur.as_str().map(str::to_string)
}

fn required(v: &Value, path: &[&str], what: &str) -> Result<String, ForgeError> {
    str_field(v, path).ok_or_else(|| ForgeError::Decode(format!("{what}: missing {}", path.join("."))))
}

fn u64_field(v: &Value, key: &str, what: &str) -> Result<u64, ForgeError> {
    v.get(key)
        .and_then(Value::as_u64)
        .ok_or_else(|| ForgeError::Decode(format!("{what}: missing {key}")))
}

pub fn repository(v: &Value) -> Result<RepositoryInfo, ForgeError> {
    Ok(RepositoryInfo {
        full_name: required(v, &["full_name"], "repository")?,
        default_branch: str_field(v, &["default_branch"])
            .filter(|b| !b.trim().is_empty())
            .unwrap_or_else(|| "main".into()),
    })
}

pub fn issue(v: &Value) -> Result<IssueData, ForgeError> {
    Ok(IssueData {
        number: u64_field(v, "number", "issue")?,
        title: str_field(v, &["title"]).unwrap_or_default(),
        body: str_field(v, &["body"]).unwrap_or_default(),
        author: str_field(v, &["user", "login"]).unwrap_or_default(),
        state: str_field(v, &["state"]).unwrap_or_else(|| "open".into()),
    })
}

pub fn pull_request(v: &Value) -> Result<PullRequestData, ForgeError> {
    Ok(PullRequestData {
        number: u64_field(v, "number", "pull request")?,
        title: str_field(v, &["title"]).unwrap_or_default(),
        body: str_field(v, &["body"]).unwrap_or_default(),
        author: str_field(v, &["user", "login"]).unwrap_or_default(),
        state: str_field(v, &["state"]).unwrap_or_else(|| "open".into()),
        merged: v.get("merged").and_then(Value::as_bool).unwrap_or(false),
        head_ref: required(v, &["head", "ref"], "pull request")?,
        base_ref: required(v, &["base", "ref"], "pull request")?,
    })
}

pub fn comment(v: &Value) -> Result<CommentData, ForgeError> {
    Ok(CommentData {
        id: u64_field(v, "id", "comment")?,
        author: str_field(v, &["user", "login"]).unwrap_or_default(),
        body: str_field(v, &["body"]).unwrap_or_default(),
        created_at: str_field(v, &["created_at"])
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|d| d.with_timezone(&Utc)),
    })
}

pub fn comments(v: &Value) -> Result<Vec<CommentData>, ForgeError> {
    v.as_array()
        .ok_or_else(|| ForgeError::Decode("comments: expected array".into()))?
        .iter()
        .map(comment)
        .collect()
}

/// Branch tip. GitHub names the commit id `sha`, Gitea names it `id`.
pub fn branch(v: &Value) -> Result<BranchRef, ForgeError> {
    let sha = str_field(v, &["commit", "sha"])
        .or_else(|| str_field(v, &["commit", "id"]))
        .ok_or_else(|| ForgeError::Decode("branch: missing commit sha".into()))?;
    Ok(BranchRef {
        name: required(v, &["name"], "branch")?,
        sha,
    })
}

pub fn comparison(v: &Value) -> Result<Comparison, ForgeError> {
    Ok(Comparison {
        ahead_by: u64_field(v, "ahead_by", "comparison")?,
        total_commits: u64_field(v, "total_commits", "comparison")?,
    })
}

pub fn actor_kind(v: &Value) -> ActorKind {
    let is_bot = str_field(v, &["type"]).is_some_and(|t| t.eq_ignore_ascii_case("bot"))
        || str_field(v, &["login"]).is_some_and(|l| l.ends_with("[bot]"));
    if is_bot { ActorKind::Bot } else { ActorKind::Human }
}

pub fn permission(v: &Value) -> Permission {
    str_field(v, &["permission"])
        .or_else(|| str_field(v, &["role_name"]))
        .map(|p| Permission::parse(&p))
        .unwrap_or(Permission::None)
}
