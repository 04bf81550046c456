//! REST paths common to both forge families.

use forgehand_core::RepoId;

pub fn repo(r: &RepoId) -> String {
    format!("/repos/{}/{}", r.owner, r.name)
}

pub fn issue(r: &RepoId, number: u64) -> String {
    format!("{}/issues/{number}", repo(r))
}

pub fn pull(r: &RepoId, number: u64) -> String {
    format!("{}/pulls/{number}", repo(r))
}

pub fn issue_comments(r: &RepoId, number: u64) -> String {
    format!("{}/comments", issue(r, number))
}

pub fn issue_comment(r: &RepoId, id: u64) -> String {
    format!("{}/issues/comments/{id}", repo(r))
}

pub fn review_comment(r: &RepoId, id: u64) -> String {
    format!("{}/pulls/comments/{id}", repo(r))
}

pub fn review_reply(r: &RepoId, pr_number: u64, in_reply_to: u64) -> String {
    format!("{}/comments/{in_reply_to}/replies", pull(r, pr_number))
}

pub fn branch(r: &RepoId, name: &str) -> String {
    format!("{}/branches/{name}", repo(r))
}

pub fn compare(r: &RepoId, base: &str, head: &str) -> String {
    format!("{}/compare/{base}...{head}", repo(r))
}

pub fn user(login: &str) -> String {
    format!("/users/{login}")
}

pub fn permission(r: &RepoId, login: &str) -> String {
    format!("{}/collaborators/{login}/permission", repo(r))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_rooted_at_repo() {
        let r = RepoId::new("acme", "widgets");
        assert_eq!(issue_comment(&r, 9), "/repos/acme/widgets/issues/comments/9");
        assert_eq!(review_comment(&r, 9), "/repos/acme/widgets/pulls/comments/9");
        assert_eq!(
            review_reply(&r, 7, 5),
            "/repos/acme/widgets/pulls/7/comments/5/replies"
        );
        assert_eq!(
            compare(&r, "main", "claude/issue-1-20240101_000000"),
            "/repos/acme/widgets/compare/main...claude/issue-1-20240101_000000"
        );
    }
}
