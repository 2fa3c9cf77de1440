use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};
use vigil_core::{Comment, CommentStatus, EscalationRule};

/// Lifecycle of a [`CommentTracker`], distinct from the comment's own status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingStatus {
    /// Being monitored.
    Active,
    /// Comment was resolved while tracked.
    Resolved,
    /// An escalation rule fired for this tracker.
    Escalated,
    /// Exceeded the maximum tracking time.
    Expired,
    /// Deliberately not monitored.
    Ignored,
}

impl fmt::Display for TrackingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrackingStatus::Active => "active",
            TrackingStatus::Resolved => "resolved",
            TrackingStatus::Escalated => "escalated",
            TrackingStatus::Expired => "expired",
            TrackingStatus::Ignored => "ignored",
        };
        write!(f, "{name}")
    }
}

/// Delivery state of an [`EscalationEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationStatus {
    /// Rule matched; action not yet executed.
    Triggered,
    /// Notification sink accepted the message.
    Sent,
    /// Escalation comment was posted.
    Posted,
    /// Comment was marked assigned.
    Assigned,
    /// Action execution failed; the event is still recorded.
    Failed,
}

/// Append-only record of one escalation rule firing.
#[derive(Debug, Clone)]
pub struct EscalationEvent {
    /// Snapshot of the rule that fired.
    pub rule: EscalationRule,
    /// When the rule fired.
    pub triggered_at: DateTime<Utc>,
    /// Why the rule matched.
    pub reason: String,
    /// Who was notified or assigned.
    pub recipients: Vec<String>,
    /// Outcome of executing the action.
    pub status: EscalationStatus,
    /// Collaborator response text, when the action produced one.
    pub response: Option<String>,
    /// Error text when the action failed.
    pub error: Option<String>,
}

/// How a tracked comment came to be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionMethod {
    /// The dispatcher resolved it (approval, praise, completed request).
    Automatic,
    /// Resolution was observed on the comment itself.
    Observed,
}

/// Record of a tracked comment reaching resolution.
#[derive(Debug, Clone)]
pub struct ResolutionEvent {
    /// When resolution happened.
    pub resolved_at: DateTime<Utc>,
    /// Who resolved it.
    pub resolved_by: String,
    /// How resolution happened.
    pub method: ResolutionMethod,
}

/// Monitoring metrics accumulated per tracker.
#[derive(Debug, Clone, Default)]
pub struct TrackerMetrics {
    /// Latency between first observation and the agent's first reply.
    pub time_to_first_response: Option<Duration>,
    /// Latency between first observation and resolution.
    pub time_to_resolution: Option<Duration>,
    /// Number of escalation events recorded.
    pub escalation_count: u32,
    /// Number of notifications sent for this tracker.
    pub notification_count: u32,
    /// Number of observed interactions (replies, edits).
    pub interaction_count: u32,
}

/// In-memory monitoring record for one comment.
///
/// Created on first observation, never recreated, never evicted; lives for
/// the process lifetime.
#[derive(Debug, Clone)]
pub struct CommentTracker {
    /// The tracked comment.
    pub comment: Comment,
    /// When the monitor first saw the comment.
    pub first_seen: DateTime<Utc>,
    /// Last time any tracked state changed.
    pub last_updated: DateTime<Utc>,
    /// Replies observed on this comment.
    pub response_count: u32,
    /// Tracker lifecycle.
    pub status: TrackingStatus,
    /// Escalation events, in firing order. An escalation rule fires at most
    /// once per tracker; the rule name is the dedup key.
    pub escalations: Vec<EscalationEvent>,
    /// Resolution record, once resolved.
    pub resolution: Option<ResolutionEvent>,
    /// Accumulated metrics.
    pub metrics: TrackerMetrics,
}

impl CommentTracker {
    fn new(comment: Comment, first_seen: DateTime<Utc>) -> Self {
        Self {
            comment,
            first_seen,
            last_updated: first_seen,
            response_count: 0,
            status: TrackingStatus::Active,
            escalations: Vec::new(),
            resolution: None,
            metrics: TrackerMetrics::default(),
        }
    }

    /// Whether `rule` has already fired for this tracker.
    pub fn has_escalation(&self, rule_name: &str) -> bool {
        self.escalations.iter().any(|e| e.rule.name == rule_name)
    }
}

/// Aggregate snapshot of the registry, for host dashboards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackingStats {
    pub total: usize,
    pub active: usize,
    pub resolved: usize,
    pub escalated: usize,
    pub expired: usize,
    pub ignored: usize,
    pub total_escalations: u32,
}

/// Owned registry of comment trackers.
///
/// All tracker state lives behind one reader/writer lock: stats queries take
/// a read lock, every mutation is a single write-locked critical section. No
/// operation spans more than one tracker transactionally.
#[derive(Debug, Default)]
pub struct TrackerRegistry {
    trackers: RwLock<HashMap<u64, CommentTracker>>,
}

impl TrackerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a comment; idempotent.
    ///
    /// Returns `true` when a new tracker was created, `false` when the
    /// comment was already tracked (the existing tracker is left untouched).
    pub fn track(&self, comment: &Comment) -> bool {
        self.track_at(comment, Utc::now())
    }

    /// [`TrackerRegistry::track`] with an explicit first-seen time.
    pub fn track_at(&self, comment: &Comment, first_seen: DateTime<Utc>) -> bool {
        let mut trackers = self.write();
        if trackers.contains_key(&comment.id) {
            return false;
        }
        debug!(comment_id = comment.id, "tracking comment");
        trackers.insert(comment.id, CommentTracker::new(comment.clone(), first_seen));
        true
    }

    /// Clone the tracker for a comment, if tracked.
    pub fn get(&self, comment_id: u64) -> Option<CommentTracker> {
        self.read().get(&comment_id).cloned()
    }

    /// Refresh the stored comment snapshot for a tracked comment.
    ///
    /// Dispatch mutates the comment (intent, priority, status) after the
    /// monitor starts tracking it; this folds those changes back into the
    /// tracker so escalation conditions see them. No-op when untracked.
    pub fn sync_comment(&self, comment: &Comment) {
        let mut trackers = self.write();
        if let Some(tracker) = trackers.get_mut(&comment.id) {
            tracker.comment = comment.clone();
            tracker.last_updated = Utc::now();
        }
    }

    /// Mark a tracked comment ignored, dropping it out of the timeout and
    /// escalation sweeps. No-op when untracked or already settled.
    pub fn mark_ignored(&self, comment_id: u64) {
        let mut trackers = self.write();
        if let Some(tracker) = trackers.get_mut(&comment_id) {
            if tracker.status == TrackingStatus::Active {
                tracker.status = TrackingStatus::Ignored;
                tracker.last_updated = Utc::now();
            }
        }
    }

    /// Ids of all Active trackers.
    pub fn active_ids(&self) -> Vec<u64> {
        self.read()
            .iter()
            .filter(|(_, t)| t.status == TrackingStatus::Active)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Record an observed reply to a tracked comment.
    ///
    /// The first recorded response stamps the time-to-first-response metric.
    pub fn record_response(&self, comment_id: u64, at: DateTime<Utc>) {
        let mut trackers = self.write();
        if let Some(tracker) = trackers.get_mut(&comment_id) {
            tracker.response_count += 1;
            tracker.metrics.interaction_count += 1;
            if tracker.metrics.time_to_first_response.is_none() {
                tracker.metrics.time_to_first_response = Some(at - tracker.first_seen);
            }
            tracker.last_updated = at;
        }
    }

    /// Record a non-reply interaction (edit, reaction) on a tracked comment.
    pub fn record_interaction(&self, comment_id: u64) {
        let mut trackers = self.write();
        if let Some(tracker) = trackers.get_mut(&comment_id) {
            tracker.metrics.interaction_count += 1;
            tracker.last_updated = Utc::now();
        }
    }

    /// Mark a tracker resolved and stamp resolution metrics.
    pub fn mark_resolved(&self, comment_id: u64, resolved_by: &str, method: ResolutionMethod) {
        let now = Utc::now();
        let mut trackers = self.write();
        if let Some(tracker) = trackers.get_mut(&comment_id) {
            if tracker.status != TrackingStatus::Active {
                return;
            }
            tracker.status = TrackingStatus::Resolved;
            tracker.resolution = Some(ResolutionEvent {
                resolved_at: now,
                resolved_by: resolved_by.to_string(),
                method,
            });
            tracker.metrics.time_to_resolution = Some(now - tracker.first_seen);
            tracker.comment.advance(CommentStatus::Resolved);
            tracker.last_updated = now;
        }
    }

    /// Expire Active trackers older than `max_tracking_time` and report
    /// resolution-overdue trackers.
    ///
    /// Returns `(expired, overdue)` comment ids. Overdue trackers (older
    /// than `resolution_timeout`, comment still unresolved) stay Active;
    /// they are reported so the caller can log them.
    pub fn check_timeouts(
        &self,
        max_tracking_time: Duration,
        resolution_timeout: Duration,
        now: DateTime<Utc>,
    ) -> (Vec<u64>, Vec<u64>) {
        let mut expired = Vec::new();
        let mut overdue = Vec::new();
        let mut trackers = self.write();
        for (id, tracker) in trackers.iter_mut() {
            if tracker.status != TrackingStatus::Active {
                continue;
            }
            let age = now - tracker.first_seen;
            if age > max_tracking_time {
                tracker.status = TrackingStatus::Expired;
                tracker.last_updated = now;
                expired.push(*id);
            } else if age > resolution_timeout
                && tracker.comment.status != CommentStatus::Resolved
            {
                overdue.push(*id);
            }
        }
        (expired, overdue)
    }

    /// Append an escalation event and transition tracker and comment to
    /// Escalated.
    ///
    /// Re-checks the fire-once invariant under the write lock; returns
    /// `false` (and records nothing) when the rule already fired. A `Failed`
    /// event is recorded the same way as a successful one: the attempt, not
    /// the success, marks escalation.
    pub fn record_escalation(&self, comment_id: u64, event: EscalationEvent) -> bool {
        let mut trackers = self.write();
        let Some(tracker) = trackers.get_mut(&comment_id) else {
            return false;
        };
        if tracker.has_escalation(&event.rule.name) {
            return false;
        }
        if event.status == EscalationStatus::Sent {
            tracker.metrics.notification_count += 1;
        }
        tracker.metrics.escalation_count += 1;
        tracker.escalations.push(event);
        tracker.status = TrackingStatus::Escalated;
        tracker.comment.advance(CommentStatus::Escalated);
        tracker.last_updated = Utc::now();
        true
    }

    /// Aggregate snapshot under a read lock.
    pub fn stats(&self) -> TrackingStats {
        let trackers = self.read();
        let mut stats = TrackingStats {
            total: trackers.len(),
            ..TrackingStats::default()
        };
        for tracker in trackers.values() {
            match tracker.status {
                TrackingStatus::Active => stats.active += 1,
                TrackingStatus::Resolved => stats.resolved += 1,
                TrackingStatus::Escalated => stats.escalated += 1,
                TrackingStatus::Expired => stats.expired += 1,
                TrackingStatus::Ignored => stats.ignored += 1,
            }
            stats.total_escalations += tracker.metrics.escalation_count;
        }
        stats
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<u64, CommentTracker>> {
        self.trackers.read().unwrap_or_else(|poisoned| {
            warn!("tracker registry lock poisoned; continuing with inner data");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<u64, CommentTracker>> {
        self.trackers.write().unwrap_or_else(|poisoned| {
            warn!("tracker registry lock poisoned; continuing with inner data");
            poisoned.into_inner()
        })
    }
}
