use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use vigil_core::{EscalationAction, EscalationCondition, EscalationRule, Priority};

use crate::github::GitHubClient;
use crate::notify::NotificationSink;
use crate::tracker::{CommentTracker, EscalationEvent, EscalationStatus, TrackerRegistry};

/// Pure predicate: should `rule` fire for `tracker` right now?
///
/// The fire-once invariant is checked first: a rule name already present in
/// the tracker's escalation history never fires again, even if its condition
/// still holds. Unknown condition tags never match.
pub fn should_escalate(tracker: &CommentTracker, rule: &EscalationRule, now: DateTime<Utc>) -> bool {
    if tracker.has_escalation(&rule.name) {
        return false;
    }
    match rule.condition {
        EscalationCondition::Blocking => tracker.comment.priority == Priority::Blocking,
        EscalationCondition::Critical => tracker.comment.priority == Priority::Critical,
        EscalationCondition::UnresolvedTime => now - tracker.first_seen > rule.delay(),
        EscalationCondition::NoResponse => {
            tracker.response_count == 0 && now - tracker.first_seen > rule.delay()
        }
        EscalationCondition::MultipleInteractions => {
            tracker.metrics.interaction_count >= rule.threshold
        }
        EscalationCondition::Unknown => false,
    }
}

/// Human-readable reason a rule matched, stored on the event.
fn match_reason(tracker: &CommentTracker, rule: &EscalationRule) -> String {
    match rule.condition {
        EscalationCondition::Blocking => "comment priority is blocking".to_string(),
        EscalationCondition::Critical => "comment priority is critical".to_string(),
        EscalationCondition::UnresolvedTime => {
            format!("unresolved for more than {}s", rule.delay_secs)
        }
        EscalationCondition::NoResponse => {
            format!("no response after {}s", rule.delay_secs)
        }
        EscalationCondition::MultipleInteractions => format!(
            "{} interactions reached threshold {}",
            tracker.metrics.interaction_count, rule.threshold
        ),
        EscalationCondition::Unknown => "unknown condition".to_string(),
    }
}

/// Executes matched escalation rules against the collaborator and the
/// notification sink, recording every attempt on the tracker.
pub struct Escalator<G> {
    github: Arc<G>,
    sink: Arc<dyn NotificationSink>,
    registry: Arc<TrackerRegistry>,
}

impl<G: GitHubClient> Escalator<G> {
    pub fn new(github: Arc<G>, sink: Arc<dyn NotificationSink>, registry: Arc<TrackerRegistry>) -> Self {
        Self {
            github,
            sink,
            registry,
        }
    }

    /// Execute a matched rule for a tracked comment.
    ///
    /// Regardless of whether the action succeeds, an [`EscalationEvent`] is
    /// appended and the tracker (and its comment) transitions to Escalated.
    /// Recording never fails; action failures are captured as a `Failed`
    /// event with the error text.
    pub async fn escalate(&self, pr_id: u64, comment_id: u64, rule: &EscalationRule) {
        let Some(tracker) = self.registry.get(comment_id) else {
            return;
        };
        let message = escalation_message(&tracker, rule);

        let (status, response, error) = match rule.action {
            EscalationAction::Notify => match self.sink.send(&rule.recipients, &message).await {
                Ok(()) => (EscalationStatus::Sent, None, None),
                Err(e) => (EscalationStatus::Failed, None, Some(e.to_string())),
            },
            EscalationAction::Comment => match self.github.create_comment(pr_id, &message).await {
                Ok(posted) => (EscalationStatus::Posted, Some(posted.body), None),
                Err(e) => (EscalationStatus::Failed, None, Some(e.to_string())),
            },
            // Assignment has no REST counterpart for review comments;
            // recorded as assigned so the host can act on the event.
            EscalationAction::Assign => (
                EscalationStatus::Assigned,
                Some(format!("assigned to {}", rule.recipients.join(", "))),
                None,
            ),
        };

        if let Some(err) = &error {
            warn!(
                comment_id,
                rule = %rule.name,
                error = %err,
                "escalation action failed; recording failed event"
            );
        } else {
            info!(comment_id, rule = %rule.name, status = ?status, "escalated comment");
        }

        let event = EscalationEvent {
            rule: rule.clone(),
            triggered_at: Utc::now(),
            reason: match_reason(&tracker, rule),
            recipients: rule.recipients.clone(),
            status,
            response,
            error,
        };
        self.registry.record_escalation(comment_id, event);
    }
}

/// The message posted or sent when a rule fires.
fn escalation_message(tracker: &CommentTracker, rule: &EscalationRule) -> String {
    format!(
        "Escalation `{}`: comment {} by @{} needs attention ({}).\n\n> {}",
        rule.name,
        tracker.comment.id,
        tracker.comment.author,
        match_reason(tracker, rule),
        tracker.comment.body.lines().next().unwrap_or_default(),
    )
}
