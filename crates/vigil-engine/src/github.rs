use async_trait::async_trait;
use chrono::{DateTime, Utc};
use vigil_core::{Comment, CommentType, VigilError};

/// The GitHub collaborator consumed by the triage engine.
///
/// All methods may fail transiently; the engine treats every failure as
/// non-fatal for the surrounding batch or tick, except failures on the
/// single currently-dispatched comment, which abort only that comment.
#[async_trait]
pub trait GitHubClient: Send + Sync {
    /// List the review comments on a pull request.
    async fn list_comments(&self, pr_id: u64) -> Result<Vec<Comment>, VigilError>;

    /// Fetch a single comment by id.
    async fn get_comment(&self, comment_id: u64) -> Result<Comment, VigilError>;

    /// Post a top-level comment on a pull request.
    async fn create_comment(&self, pr_id: u64, body: &str) -> Result<Comment, VigilError>;

    /// Edit an existing comment.
    async fn update_comment(&self, comment_id: u64, body: &str) -> Result<Comment, VigilError>;

    /// Reply in the thread of an existing comment.
    async fn reply_to_comment(&self, comment_id: u64, body: &str) -> Result<Comment, VigilError>;

    /// Mark a comment thread resolved.
    async fn resolve_comment(&self, comment_id: u64) -> Result<(), VigilError>;

    /// Dismiss a review with a message.
    async fn dismiss_review(
        &self,
        pr_id: u64,
        review_id: u64,
        message: &str,
    ) -> Result<(), VigilError>;
}

/// Octocrab-backed [`GitHubClient`] bound to one repository's pull request.
///
/// Binding to a single pull request mirrors the engine's one-monitor-per-PR
/// model and is required by the reply endpoint, which addresses comments
/// through their pull request.
///
/// # Examples
///
/// ```no_run
/// use vigil_engine::OctocrabClient;
///
/// let client = OctocrabClient::for_pull(Some("ghp_xxxx"), "octocat", "hello-world", 42).unwrap();
/// ```
pub struct OctocrabClient {
    octocrab: octocrab::Octocrab,
    owner: String,
    repo: String,
    pr_number: u64,
}

impl OctocrabClient {
    /// Create a client from an explicit token or the `GITHUB_TOKEN`
    /// environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`VigilError::Config`] if no token is available, or
    /// [`VigilError::GitHub`] if the client cannot be built.
    pub fn for_pull(
        token: Option<&str>,
        owner: &str,
        repo: &str,
        pr_number: u64,
    ) -> Result<Self, VigilError> {
        let token = match token {
            Some(t) => t.to_string(),
            None => std::env::var("GITHUB_TOKEN").map_err(|_| {
                VigilError::Config(
                    "GITHUB_TOKEN not set. Pass a token or set GITHUB_TOKEN env var".into(),
                )
            })?,
        };

        let octocrab = octocrab::Octocrab::builder()
            .personal_token(token)
            .build()
            .map_err(|e| VigilError::GitHub(format!("failed to create GitHub client: {e}")))?;

        Ok(Self {
            octocrab,
            owner: owner.to_string(),
            repo: repo.to_string(),
            pr_number,
        })
    }

    fn repo_route(&self, rest: &str) -> String {
        format!("/repos/{}/{}/{}", self.owner, self.repo, rest)
    }
}

#[async_trait]
impl GitHubClient for OctocrabClient {
    async fn list_comments(&self, pr_id: u64) -> Result<Vec<Comment>, VigilError> {
        let route = self.repo_route(&format!("pulls/{pr_id}/comments"));
        let response: serde_json::Value = self
            .octocrab
            .get(route, None::<&()>)
            .await
            .map_err(|e| VigilError::GitHub(format!("failed to list comments: {e}")))?;

        let items = response
            .as_array()
            .ok_or_else(|| VigilError::GitHub("unexpected comment list payload".into()))?;
        Ok(items.iter().filter_map(parse_comment).collect())
    }

    async fn get_comment(&self, comment_id: u64) -> Result<Comment, VigilError> {
        let route = self.repo_route(&format!("pulls/comments/{comment_id}"));
        let response: serde_json::Value = self
            .octocrab
            .get(route, None::<&()>)
            .await
            .map_err(|e| VigilError::GitHub(format!("failed to fetch comment: {e}")))?;
        parse_comment(&response)
            .ok_or_else(|| VigilError::GitHub("unexpected comment payload".into()))
    }

    async fn create_comment(&self, pr_id: u64, body: &str) -> Result<Comment, VigilError> {
        let route = self.repo_route(&format!("issues/{pr_id}/comments"));
        let payload = serde_json::json!({ "body": body });
        let response: serde_json::Value = self
            .octocrab
            .post(route, Some(&payload))
            .await
            .map_err(|e| VigilError::GitHub(format!("failed to create comment: {e}")))?;
        parse_comment(&response)
            .ok_or_else(|| VigilError::GitHub("unexpected comment payload".into()))
    }

    async fn update_comment(&self, comment_id: u64, body: &str) -> Result<Comment, VigilError> {
        let route = self.repo_route(&format!("pulls/comments/{comment_id}"));
        let payload = serde_json::json!({ "body": body });
        let response: serde_json::Value = self
            .octocrab
            .patch(route, Some(&payload))
            .await
            .map_err(|e| VigilError::GitHub(format!("failed to update comment: {e}")))?;
        parse_comment(&response)
            .ok_or_else(|| VigilError::GitHub("unexpected comment payload".into()))
    }

    async fn reply_to_comment(&self, comment_id: u64, body: &str) -> Result<Comment, VigilError> {
        let route = self.repo_route(&format!(
            "pulls/{}/comments/{comment_id}/replies",
            self.pr_number
        ));
        let payload = serde_json::json!({ "body": body });
        let response: serde_json::Value = self
            .octocrab
            .post(route, Some(&payload))
            .await
            .map_err(|e| VigilError::GitHub(format!("failed to reply to comment: {e}")))?;
        parse_comment(&response)
            .ok_or_else(|| VigilError::GitHub("unexpected comment payload".into()))
    }

    async fn resolve_comment(&self, comment_id: u64) -> Result<(), VigilError> {
        // Thread resolution is GraphQL-only; the REST placeholder is a
        // thumbs-up reaction on the comment.
        let route = self.repo_route(&format!("pulls/comments/{comment_id}/reactions"));
        let payload = serde_json::json!({ "content": "+1" });
        let _response: serde_json::Value = self
            .octocrab
            .post(route, Some(&payload))
            .await
            .map_err(|e| VigilError::GitHub(format!("failed to resolve comment: {e}")))?;
        Ok(())
    }

    async fn dismiss_review(
        &self,
        pr_id: u64,
        review_id: u64,
        message: &str,
    ) -> Result<(), VigilError> {
        let route = self.repo_route(&format!("pulls/{pr_id}/reviews/{review_id}/dismissals"));
        let payload = serde_json::json!({ "message": message });
        let _response: serde_json::Value = self
            .octocrab
            .put(route, Some(&payload))
            .await
            .map_err(|e| VigilError::GitHub(format!("failed to dismiss review: {e}")))?;
        Ok(())
    }
}

/// Map a GitHub review-comment payload onto the engine's [`Comment`].
///
/// Returns `None` when the payload is missing an id, which drops the entry
/// from a listing rather than failing the whole call.
fn parse_comment(value: &serde_json::Value) -> Option<Comment> {
    let id = value.get("id")?.as_u64()?;
    let author = value
        .pointer("/user/login")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let body = value
        .get("body")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    let mut comment = Comment::new(id, author, body);
    comment.comment_type = if value.get("in_reply_to_id").and_then(|v| v.as_u64()).is_some() {
        CommentType::Reply
    } else if value.get("path").and_then(|v| v.as_str()).is_some() {
        CommentType::Inline
    } else {
        CommentType::Review
    };
    comment.in_reply_to = value.get("in_reply_to_id").and_then(|v| v.as_u64());
    comment.file = value
        .get("path")
        .and_then(|v| v.as_str())
        .map(str::to_string);
    comment.line = value.get("line").and_then(|v| v.as_u64()).map(|l| l as u32);
    comment.position = value
        .get("position")
        .and_then(|v| v.as_u64())
        .map(|p| p as u32);
    if let Some(created) = timestamp(value, "created_at") {
        comment.created_at = created;
    }
    if let Some(updated) = timestamp(value, "updated_at") {
        comment.updated_at = updated;
    }
    Some(comment)
}

fn timestamp(value: &serde_json::Value, key: &str) -> Option<DateTime<Utc>> {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_inline_comment_payload() {
        let payload = serde_json::json!({
            "id": 101,
            "user": { "login": "octocat" },
            "body": "Please fix this",
            "path": "src/lib.rs",
            "line": 12,
            "position": 4,
            "created_at": "2024-05-01T10:00:00Z",
            "updated_at": "2024-05-01T10:05:00Z",
        });
        let comment = parse_comment(&payload).unwrap();
        assert_eq!(comment.id, 101);
        assert_eq!(comment.author, "octocat");
        assert_eq!(comment.comment_type, CommentType::Inline);
        assert_eq!(comment.file.as_deref(), Some("src/lib.rs"));
        assert_eq!(comment.line, Some(12));
        assert_eq!(comment.created_at.to_rfc3339(), "2024-05-01T10:00:00+00:00");
    }

    #[test]
    fn parse_reply_payload() {
        let payload = serde_json::json!({
            "id": 102,
            "in_reply_to_id": 101,
            "path": "src/lib.rs",
            "user": { "login": "vigil-bot" },
            "body": "On it",
        });
        let comment = parse_comment(&payload).unwrap();
        assert_eq!(comment.comment_type, CommentType::Reply);
        assert_eq!(comment.in_reply_to, Some(101));
    }

    #[test]
    fn parse_rejects_missing_id() {
        let payload = serde_json::json!({ "body": "no id" });
        assert!(parse_comment(&payload).is_none());
    }

    #[test]
    fn parse_tolerates_missing_fields() {
        let payload = serde_json::json!({ "id": 7 });
        let comment = parse_comment(&payload).unwrap();
        assert_eq!(comment.author, "");
        assert_eq!(comment.body, "");
        assert_eq!(comment.comment_type, CommentType::Review);
    }
}
