use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use vigil_classify::{complete_action, Classifier};
use vigil_core::{
    Comment, CommentStatus, Intent, Priority, ResponseAction, VigilConfig, VigilError,
};

use crate::escalation::{self, Escalator};
use crate::github::GitHubClient;
use crate::notify::NotificationSink;
use crate::responder::Responder;
use crate::tracker::{ResolutionMethod, TrackerRegistry, TrackingStatus};

/// Callback seam the monitor drives for every newly observed comment.
#[async_trait]
pub trait CommentProcessor: Send + Sync {
    /// Classify and dispatch one comment.
    async fn process(&self, pr_id: u64, comment: Comment) -> Result<Comment, VigilError>;
}

/// The intent-driven dispatcher.
///
/// Owns the per-comment lifecycle state machine: classify, route by intent,
/// generate a reply through the [`Responder`], post it via the GitHub
/// collaborator, and advance comment status. One handler serves both the
/// one-shot [`CommentHandler::handle_comments`] batch entry point and the
/// monitor's per-comment callback.
pub struct CommentHandler<G> {
    github: Arc<G>,
    registry: Arc<TrackerRegistry>,
    escalator: Escalator<G>,
    classifier: Classifier,
    responder: Responder,
    config: VigilConfig,
    cancel: CancellationToken,
}

impl<G: GitHubClient> CommentHandler<G> {
    pub fn new(
        github: Arc<G>,
        sink: Arc<dyn NotificationSink>,
        registry: Arc<TrackerRegistry>,
        config: VigilConfig,
        cancel: CancellationToken,
    ) -> Self {
        let escalator = Escalator::new(Arc::clone(&github), sink, Arc::clone(&registry));
        let classifier = Classifier::from_config(&config.triage);
        let responder = Responder::new(config.triage.max_response_length);
        Self {
            github,
            registry,
            escalator,
            classifier,
            responder,
            config,
            cancel,
        }
    }

    /// One-shot batch entry point: fetch, triage, and dispatch every comment
    /// on a pull request.
    ///
    /// A failure handling one comment is logged and the loop continues;
    /// only the initial listing failure is returned to the caller.
    ///
    /// Comments are processed strictly in order, including any configured
    /// reply delays, so reply N is posted before comment N+1 is touched.
    pub async fn handle_comments(&self, pr_id: u64) -> Result<Vec<Comment>, VigilError> {
        let comments = self.github.list_comments(pr_id).await?;
        let mut handled = Vec::with_capacity(comments.len());
        for comment in comments {
            let id = comment.id;
            match self.process_one(pr_id, comment).await {
                Ok(comment) => handled.push(comment),
                Err(e) => {
                    warn!(comment_id = id, error = %e, "failed to handle comment; continuing");
                }
            }
        }
        Ok(handled)
    }

    async fn process_one(&self, pr_id: u64, mut comment: Comment) -> Result<Comment, VigilError> {
        if self.should_ignore(&comment) {
            debug!(comment_id = comment.id, author = %comment.author, "ignoring comment");
            self.registry.mark_ignored(comment.id);
            return Ok(comment);
        }
        // Already-settled comments pass through unchanged.
        if matches!(
            comment.status,
            CommentStatus::Resolved | CommentStatus::Dismissed
        ) {
            self.registry
                .mark_resolved(comment.id, &comment.author, ResolutionMethod::Observed);
            return Ok(comment);
        }

        self.classifier.annotate(&mut comment);
        // Classification lands in the tracker immediately so a failure later
        // in routing cannot hide an escalation-worthy comment from the
        // monitor's rule sweep.
        self.registry.sync_comment(&comment);
        self.route(pr_id, &mut comment).await?;
        Ok(comment)
    }

    /// Ignore policy: explicit ignore list, bot authors, and stale comments.
    fn should_ignore(&self, comment: &Comment) -> bool {
        let triage = &self.config.triage;
        if triage.ignore_users.iter().any(|u| u == &comment.author) {
            return true;
        }
        if comment.author.to_lowercase().contains("bot") {
            return true;
        }
        if comment.author == triage.automation_login {
            return true;
        }
        let age = Utc::now() - comment.created_at;
        age > Duration::days(triage.max_comment_age_days)
    }

    /// The intent routing table. Every branch acknowledges first, then runs
    /// the intent-specific strategy.
    async fn route(&self, pr_id: u64, comment: &mut Comment) -> Result<(), VigilError> {
        comment.advance(CommentStatus::Acknowledged);

        match comment.routing_intent() {
            Intent::Question => {
                let reply = self.responder.answer_question(comment);
                self.reply_after_delay(comment, &reply).await?;
            }
            Intent::Suggestion => {
                self.auto_apply_suggestions(comment);
                let reply = self.responder.suggestion_status(comment);
                self.reply_after_delay(comment, &reply).await?;
            }
            Intent::Request => {
                comment.advance(CommentStatus::InProgress);
                let mut actions = self.classifier.extract_action_items(comment);
                for action in &mut actions {
                    self.execute_action(action).await;
                }
                let reply = self.responder.request_outcome(comment, &actions);
                self.reply_after_delay(comment, &reply).await?;
                let all_completed = !actions.is_empty()
                    && actions
                        .iter()
                        .all(|a| a.status == vigil_core::ActionStatus::Completed);
                if all_completed {
                    comment.advance(CommentStatus::Resolved);
                    self.registry
                        .mark_resolved(comment.id, &self.config.triage.automation_login, ResolutionMethod::Automatic);
                }
            }
            Intent::Blocking => {
                comment.priority = Priority::Blocking;
                let reply = self.responder.escalation_notice(comment);
                // Blocking feedback is never delayed.
                self.reply_now(comment, &reply).await?;
                self.escalate_if_matched(pr_id, comment).await;
            }
            Intent::Approval => {
                comment.advance(CommentStatus::Resolved);
                self.registry.mark_resolved(
                    comment.id,
                    &comment.author,
                    ResolutionMethod::Observed,
                );
                let reply = self.responder.thanks(comment);
                self.reply_now(comment, &reply).await?;
            }
            Intent::Praise => {
                comment.advance(CommentStatus::Resolved);
                self.registry.mark_resolved(
                    comment.id,
                    &comment.author,
                    ResolutionMethod::Observed,
                );
                let reply = self.responder.thanks(comment);
                self.reply_after_delay(comment, &reply).await?;
            }
            Intent::Clarification | Intent::Concern => {
                let reply = self.responder.clarification_request(comment);
                self.reply_after_delay(comment, &reply).await?;
            }
        }
        Ok(())
    }

    /// Evaluate every configured rule against the comment's tracker and
    /// execute matches. Tracks the comment first so the dedup invariant has
    /// somewhere to live; mirrors the tracker state back onto the comment.
    async fn escalate_if_matched(&self, pr_id: u64, comment: &mut Comment) {
        self.registry.track(comment);
        self.registry.sync_comment(comment);
        let now = Utc::now();
        for rule in &self.config.escalation {
            let Some(tracker) = self.registry.get(comment.id) else {
                break;
            };
            if escalation::should_escalate(&tracker, rule, now) {
                self.escalator.escalate(pr_id, comment.id, rule).await;
            }
        }
        if let Some(tracker) = self.registry.get(comment.id) {
            if tracker.status == TrackingStatus::Escalated {
                comment.advance(CommentStatus::Escalated);
            }
        }
    }

    /// Mark high-confidence suggestions applied when auto-respond is on.
    fn auto_apply_suggestions(&self, comment: &mut Comment) {
        if !self.config.triage.auto_respond {
            return;
        }
        let now = Utc::now();
        for suggestion in &mut comment.suggestions {
            if suggestion.confidence > 0.8 {
                suggestion.applied = true;
                suggestion.applied_at = Some(now);
            }
        }
    }

    /// Execute one extracted action item.
    ///
    /// Execution is collaborator-specific; the engine records the outcome
    /// and hands the work itself to the host through the action record.
    async fn execute_action(&self, action: &mut ResponseAction) {
        let result = match action.action_type {
            vigil_core::ActionType::Discuss => "flagged for discussion with the author",
            vigil_core::ActionType::Investigate => "queued for investigation",
            _ => "queued for the coding agent",
        };
        complete_action(action, result, true);
    }

    /// Wait out the configured response delay, then reply.
    ///
    /// The wait is cancelable: a cancelled token aborts this comment's reply
    /// and surfaces [`VigilError::Cancelled`]; the comment keeps whatever
    /// state it already reached.
    async fn reply_after_delay(
        &self,
        comment: &mut Comment,
        reply: &str,
    ) -> Result<(), VigilError> {
        if !self.config.triage.auto_respond {
            return Ok(());
        }
        tokio::select! {
            _ = self.cancel.cancelled() => return Err(VigilError::Cancelled),
            _ = tokio::time::sleep(self.config.triage.response_delay()) => {}
        }
        self.post_reply(comment, reply).await
    }

    /// Reply immediately, skipping the configured delay.
    async fn reply_now(&self, comment: &mut Comment, reply: &str) -> Result<(), VigilError> {
        if !self.config.triage.auto_respond {
            return Ok(());
        }
        self.post_reply(comment, reply).await
    }

    async fn post_reply(&self, comment: &mut Comment, reply: &str) -> Result<(), VigilError> {
        self.github.reply_to_comment(comment.id, reply).await?;
        comment.responses.push(reply.to_string());
        Ok(())
    }
}

#[async_trait]
impl<G: GitHubClient> CommentProcessor for CommentHandler<G> {
    async fn process(&self, pr_id: u64, comment: Comment) -> Result<Comment, VigilError> {
        self.process_one(pr_id, comment).await
    }
}
