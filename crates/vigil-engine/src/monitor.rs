use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use vigil_core::{EscalationRule, MonitorConfig, VigilConfig, VigilError};

use crate::escalation::{self, Escalator};
use crate::github::GitHubClient;
use crate::handler::CommentProcessor;
use crate::notify::NotificationSink;
use crate::tracker::TrackerRegistry;

struct MonitorTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Polls pull requests and drives the dispatcher and escalation rules.
///
/// One background task per monitored pull request, each with a child
/// cancellation token under one process-wide shutdown token. A tick runs
/// three phases in order: poll for new comments, sweep tracker timeouts,
/// evaluate escalation rules against active trackers.
pub struct CommentMonitor<G> {
    github: Arc<G>,
    registry: Arc<TrackerRegistry>,
    processor: Arc<dyn CommentProcessor>,
    sink: Arc<dyn NotificationSink>,
    escalator: Escalator<G>,
    config: MonitorConfig,
    rules: Vec<EscalationRule>,
    automation_login: String,
    shutdown: CancellationToken,
    tasks: Mutex<HashMap<u64, MonitorTask>>,
    // Cancelled tasks displaced by restart or stop; joined by stop-all.
    retired: Mutex<Vec<(u64, JoinHandle<()>)>>,
    last_poll: Mutex<HashMap<u64, DateTime<Utc>>>,
}

impl<G: GitHubClient + 'static> CommentMonitor<G> {
    pub fn new(
        github: Arc<G>,
        processor: Arc<dyn CommentProcessor>,
        sink: Arc<dyn NotificationSink>,
        registry: Arc<TrackerRegistry>,
        config: VigilConfig,
    ) -> Self {
        let escalator = Escalator::new(Arc::clone(&github), Arc::clone(&sink), Arc::clone(&registry));
        Self {
            github,
            registry,
            processor,
            sink,
            escalator,
            automation_login: config.triage.automation_login.clone(),
            rules: config.escalation,
            config: config.monitor,
            shutdown: CancellationToken::new(),
            tasks: Mutex::new(HashMap::new()),
            retired: Mutex::new(Vec::new()),
            last_poll: Mutex::new(HashMap::new()),
        }
    }

    /// Spawn the polling loop for a pull request.
    ///
    /// Starting an already-monitored pull request replaces its loop: the old
    /// task is cancelled before the new one spawns, and its handle is kept so
    /// [`CommentMonitor::stop_all_monitoring`] can still join it.
    pub fn start_monitoring(self: &Arc<Self>, pr_id: u64) {
        {
            let mut tasks = self.tasks_lock();
            if let Some(previous) = tasks.remove(&pr_id) {
                debug!(pr_id, "replacing existing monitor");
                previous.cancel.cancel();
                self.retired_lock().push((pr_id, previous.handle));
            }
        }
        let cancel = self.shutdown.child_token();
        let monitor = Arc::clone(self);
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            monitor.run_loop(pr_id, token).await;
        });
        self.tasks_lock().insert(pr_id, MonitorTask { cancel, handle });
    }

    /// Stop the polling loop for one pull request. No-op when not monitored.
    pub fn stop_monitoring(&self, pr_id: u64) {
        if let Some(task) = self.tasks_lock().remove(&pr_id) {
            info!(pr_id, "stopping monitor");
            task.cancel.cancel();
            self.retired_lock().push((pr_id, task.handle));
        }
    }

    /// Stop every polling loop and wait for the tasks, including any
    /// previously replaced or stopped ones, to finish.
    pub async fn stop_all_monitoring(&self) {
        let drained: Vec<(u64, MonitorTask)> = self.tasks_lock().drain().collect();
        for (_, task) in &drained {
            task.cancel.cancel();
        }
        let retired: Vec<(u64, JoinHandle<()>)> = std::mem::take(&mut *self.retired_lock());
        let handles = drained
            .into_iter()
            .map(|(pr_id, task)| (pr_id, task.handle))
            .chain(retired);
        for (pr_id, handle) in handles {
            if let Err(e) = handle.await {
                warn!(pr_id, error = %e, "monitor task aborted unexpectedly");
            }
        }
    }

    /// Cancel the process-wide token (which also aborts in-flight delayed
    /// replies sharing it) and wait for all loops to finish.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.stop_all_monitoring().await;
    }

    /// The process-wide shutdown token. Hand its child tokens to handlers so
    /// a shutdown cancels their pending delayed replies too.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Whether a pull request currently has a polling loop.
    pub fn is_monitoring(&self, pr_id: u64) -> bool {
        self.tasks_lock().contains_key(&pr_id)
    }

    async fn run_loop(&self, pr_id: u64, token: CancellationToken) {
        info!(pr_id, interval_secs = self.config.poll_interval_secs, "monitor started");
        let mut interval = tokio::time::interval(self.config.poll_interval());
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            // Biased so a replaced loop observes its cancellation before
            // taking another tick.
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = interval.tick() => self.tick(pr_id).await,
            }
        }
        info!(pr_id, "monitor stopped");
    }

    /// One poll cycle. Public so callers can drive cycles deterministically
    /// without a running loop.
    pub async fn tick(&self, pr_id: u64) {
        if let Err(e) = self.check_for_new_comments(pr_id).await {
            warn!(pr_id, error = %e, "poll failed");
            if self.config.alert_on_failure {
                let message = format!("poll failed for pull request {pr_id}: {e}");
                if let Err(send_err) = self.sink.send(&[], &message).await {
                    warn!(pr_id, error = %send_err, "failure alert not delivered");
                }
            }
        }
        self.check_timeouts();
        self.check_escalations(pr_id).await;
    }

    /// Fetch comments and dispatch the ones not seen before.
    ///
    /// The high-water mark is the start time of the last successful poll, so
    /// a failed listing leaves it untouched and the next tick retries the
    /// same window. Replies from the automation account are not dispatched;
    /// they only stamp response latency on their parent tracker.
    async fn check_for_new_comments(&self, pr_id: u64) -> Result<(), VigilError> {
        let since = self.last_poll_lock().get(&pr_id).copied();
        let poll_started = Utc::now();
        let comments = self.github.list_comments(pr_id).await?;

        for comment in comments {
            if let Some(since) = since {
                if comment.created_at < since {
                    continue;
                }
            }
            if comment.author == self.automation_login {
                if self.config.track_resolution {
                    if let Some(parent) = comment.in_reply_to {
                        self.registry.record_response(parent, comment.created_at);
                    }
                }
                continue;
            }

            let id = comment.id;
            // Track before dispatch: a comment that fails routing must stay
            // visible to the timeout and escalation sweeps, since the
            // watermark will not surface it again.
            self.registry.track(&comment);
            match self.processor.process(pr_id, comment).await {
                Ok(handled) => self.registry.sync_comment(&handled),
                Err(VigilError::Cancelled) => {
                    debug!(pr_id, comment_id = id, "dispatch cancelled");
                }
                Err(e) => {
                    warn!(pr_id, comment_id = id, error = %e, "dispatch failed; continuing");
                }
            }
        }

        self.last_poll_lock().insert(pr_id, poll_started);
        Ok(())
    }

    /// Sweep trackers: expire stale ones, log resolution-overdue ones.
    fn check_timeouts(&self) {
        let (expired, overdue) = self.registry.check_timeouts(
            self.config.max_tracking_time(),
            self.config.resolution_timeout(),
            Utc::now(),
        );
        for id in expired {
            info!(comment_id = id, "tracking window expired");
        }
        for id in overdue {
            warn!(comment_id = id, "comment unresolved past resolution timeout");
        }
    }

    /// Evaluate every rule against every active tracker; matches execute
    /// through the escalator, which enforces the fire-once invariant.
    async fn check_escalations(&self, pr_id: u64) {
        let now = Utc::now();
        for id in self.registry.active_ids() {
            for rule in &self.rules {
                let Some(tracker) = self.registry.get(id) else {
                    break;
                };
                if escalation::should_escalate(&tracker, rule, now) {
                    self.escalator.escalate(pr_id, id, rule).await;
                }
            }
        }
    }

    fn tasks_lock(&self) -> std::sync::MutexGuard<'_, HashMap<u64, MonitorTask>> {
        self.tasks.lock().unwrap_or_else(|poisoned| {
            warn!("monitor task table lock poisoned; continuing with inner data");
            poisoned.into_inner()
        })
    }

    fn retired_lock(&self) -> std::sync::MutexGuard<'_, Vec<(u64, JoinHandle<()>)>> {
        self.retired.lock().unwrap_or_else(|poisoned| {
            warn!("retired task list lock poisoned; continuing with inner data");
            poisoned.into_inner()
        })
    }

    fn last_poll_lock(&self) -> std::sync::MutexGuard<'_, HashMap<u64, DateTime<Utc>>> {
        self.last_poll.lock().unwrap_or_else(|poisoned| {
            warn!("poll watermark lock poisoned; continuing with inner data");
            poisoned.into_inner()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use vigil_core::{Comment, Priority};

    #[derive(Default)]
    struct StubGitHub {
        comments: Mutex<Vec<Comment>>,
        fail_list: Mutex<bool>,
        list_calls: Mutex<u32>,
    }

    #[async_trait]
    impl GitHubClient for StubGitHub {
        async fn list_comments(&self, _pr_id: u64) -> Result<Vec<Comment>, VigilError> {
            *self.list_calls.lock().unwrap() += 1;
            if *self.fail_list.lock().unwrap() {
                return Err(VigilError::GitHub("listing failed".into()));
            }
            Ok(self.comments.lock().unwrap().clone())
        }
        async fn get_comment(&self, _comment_id: u64) -> Result<Comment, VigilError> {
            Err(VigilError::GitHub("not found".into()))
        }
        async fn create_comment(&self, _pr_id: u64, body: &str) -> Result<Comment, VigilError> {
            Ok(Comment::new(900, "vigil-bot", body))
        }
        async fn update_comment(
            &self,
            _comment_id: u64,
            body: &str,
        ) -> Result<Comment, VigilError> {
            Ok(Comment::new(901, "vigil-bot", body))
        }
        async fn reply_to_comment(
            &self,
            _comment_id: u64,
            body: &str,
        ) -> Result<Comment, VigilError> {
            Ok(Comment::new(902, "vigil-bot", body))
        }
        async fn resolve_comment(&self, _comment_id: u64) -> Result<(), VigilError> {
            Ok(())
        }
        async fn dismiss_review(
            &self,
            _pr_id: u64,
            _review_id: u64,
            _message: &str,
        ) -> Result<(), VigilError> {
            Ok(())
        }
    }

    /// Passes comments through untouched and records what it saw.
    #[derive(Default)]
    struct RecordingProcessor {
        seen: Mutex<Vec<u64>>,
    }

    #[async_trait]
    impl CommentProcessor for RecordingProcessor {
        async fn process(&self, _pr_id: u64, comment: Comment) -> Result<Comment, VigilError> {
            self.seen.lock().unwrap().push(comment.id);
            Ok(comment)
        }
    }

    fn monitor(
        github: Arc<StubGitHub>,
        processor: Arc<RecordingProcessor>,
    ) -> Arc<CommentMonitor<StubGitHub>> {
        let registry = Arc::new(TrackerRegistry::new());
        Arc::new(CommentMonitor::new(
            github,
            processor,
            Arc::new(crate::notify::NullSink),
            registry,
            VigilConfig::default(),
        ))
    }

    #[tokio::test]
    async fn tick_dispatches_and_tracks_new_comments() {
        let github = Arc::new(StubGitHub::default());
        github
            .comments
            .lock()
            .unwrap()
            .push(Comment::new(1, "alice", "please fix this"));
        let processor = Arc::new(RecordingProcessor::default());
        let monitor = monitor(Arc::clone(&github), Arc::clone(&processor));

        monitor.tick(42).await;
        assert_eq!(*processor.seen.lock().unwrap(), vec![1]);
        assert!(monitor.registry.get(1).is_some());
    }

    /// Rejects every comment, like a dispatcher whose collaborator is down.
    struct FailingProcessor;

    #[async_trait]
    impl CommentProcessor for FailingProcessor {
        async fn process(&self, _pr_id: u64, _comment: Comment) -> Result<Comment, VigilError> {
            Err(VigilError::GitHub("reply rejected".into()))
        }
    }

    #[tokio::test]
    async fn failed_dispatch_still_tracks_comment() {
        let github = Arc::new(StubGitHub::default());
        github
            .comments
            .lock()
            .unwrap()
            .push(Comment::new(1, "alice", "do not merge"));
        let registry = Arc::new(TrackerRegistry::new());
        let monitor = Arc::new(CommentMonitor::new(
            Arc::clone(&github),
            Arc::new(FailingProcessor),
            Arc::new(crate::notify::NullSink),
            Arc::clone(&registry),
            VigilConfig::default(),
        ));

        monitor.tick(42).await;
        // The comment is behind the watermark now; only the tracker keeps it
        // visible to the sweeps.
        let tracker = registry.get(1).expect("comment tracked despite dispatch failure");
        assert_eq!(tracker.status, crate::tracker::TrackingStatus::Active);

        monitor.tick(42).await;
        assert!(registry.get(1).is_some());
    }

    #[tokio::test]
    async fn second_tick_skips_comments_before_watermark() {
        let github = Arc::new(StubGitHub::default());
        github
            .comments
            .lock()
            .unwrap()
            .push(Comment::new(1, "alice", "please fix this"));
        let processor = Arc::new(RecordingProcessor::default());
        let monitor = monitor(Arc::clone(&github), Arc::clone(&processor));

        monitor.tick(42).await;
        monitor.tick(42).await;
        assert_eq!(*processor.seen.lock().unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn failed_poll_keeps_watermark_for_retry() {
        let github = Arc::new(StubGitHub::default());
        *github.fail_list.lock().unwrap() = true;
        let processor = Arc::new(RecordingProcessor::default());
        let monitor = monitor(Arc::clone(&github), Arc::clone(&processor));

        monitor.tick(42).await;
        assert!(processor.seen.lock().unwrap().is_empty());

        *github.fail_list.lock().unwrap() = false;
        let mut old = Comment::new(2, "alice", "please fix this");
        old.created_at = Utc::now() - chrono::Duration::hours(1);
        github.comments.lock().unwrap().push(old);

        monitor.tick(42).await;
        assert_eq!(*processor.seen.lock().unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn automation_replies_stamp_latency_not_dispatch() {
        let github = Arc::new(StubGitHub::default());
        let processor = Arc::new(RecordingProcessor::default());
        let monitor = monitor(Arc::clone(&github), Arc::clone(&processor));

        let parent = Comment::new(3, "alice", "why is this unsafe?");
        monitor.registry.track(&parent);

        let mut reply = Comment::new(4, "vigil-bot", "looking into it");
        reply.in_reply_to = Some(3);
        github.comments.lock().unwrap().push(reply);

        monitor.tick(42).await;
        assert!(processor.seen.lock().unwrap().is_empty());
        let tracker = monitor.registry.get(3).unwrap();
        assert!(tracker.metrics.time_to_first_response.is_some());
        assert_eq!(tracker.response_count, 1);
    }

    #[derive(Default)]
    struct RecordingSink {
        messages: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl crate::notify::NotificationSink for RecordingSink {
        async fn send(&self, _recipients: &[String], message: &str) -> Result<(), VigilError> {
            self.messages.lock().unwrap().push(message.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn failed_poll_alerts_when_configured() {
        let github = Arc::new(StubGitHub::default());
        *github.fail_list.lock().unwrap() = true;
        let sink = Arc::new(RecordingSink::default());
        let mut config = VigilConfig::default();
        config.monitor.alert_on_failure = true;
        let monitor = Arc::new(CommentMonitor::new(
            github,
            Arc::new(RecordingProcessor::default()),
            Arc::clone(&sink) as Arc<dyn crate::notify::NotificationSink>,
            Arc::new(TrackerRegistry::new()),
            config,
        ));

        monitor.tick(42).await;
        let messages = sink.messages.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("poll failed"));
    }

    #[tokio::test]
    async fn tick_escalates_matching_active_trackers() {
        let github = Arc::new(StubGitHub::default());
        let processor = Arc::new(RecordingProcessor::default());
        let registry = Arc::new(TrackerRegistry::new());
        let mut config = VigilConfig::default();
        config.escalation.push(vigil_core::EscalationRule {
            name: "blocking-now".into(),
            condition: vigil_core::EscalationCondition::Blocking,
            threshold: 0,
            action: vigil_core::EscalationAction::Notify,
            recipients: vec!["oncall".into()],
            delay_secs: 0,
            max_retries: 3,
        });
        let monitor = Arc::new(CommentMonitor::new(
            Arc::clone(&github),
            processor,
            Arc::new(crate::notify::NullSink),
            Arc::clone(&registry),
            config,
        ));

        let mut blocker = Comment::new(5, "alice", "do not merge");
        blocker.priority = Priority::Blocking;
        registry.track(&blocker);

        monitor.tick(42).await;
        let tracker = registry.get(5).unwrap();
        assert_eq!(tracker.escalations.len(), 1);

        // The rule fired once; later ticks must not fire it again.
        monitor.tick(42).await;
        assert_eq!(registry.get(5).unwrap().escalations.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn lifecycle_start_stop_and_shutdown() {
        let github = Arc::new(StubGitHub::default());
        let processor = Arc::new(RecordingProcessor::default());
        let monitor = monitor(Arc::clone(&github), Arc::clone(&processor));

        monitor.start_monitoring(42);
        assert!(monitor.is_monitoring(42));

        // Restart replaces the loop instead of stacking a second one.
        monitor.start_monitoring(42);
        assert!(monitor.is_monitoring(42));

        monitor.stop_monitoring(42);
        assert!(!monitor.is_monitoring(42));

        monitor.start_monitoring(42);
        monitor.start_monitoring(43);
        monitor.shutdown().await;
        assert!(!monitor.is_monitoring(42));
        assert!(!monitor.is_monitoring(43));
        assert!(monitor.shutdown_token().is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn replaced_loop_is_joined_and_goes_silent() {
        let github = Arc::new(StubGitHub::default());
        let processor = Arc::new(RecordingProcessor::default());
        let monitor = monitor(Arc::clone(&github), Arc::clone(&processor));

        monitor.start_monitoring(42);
        // Restart: the first loop is cancelled before the second spawns and
        // its handle is retained.
        monitor.start_monitoring(42);
        assert!(monitor.is_monitoring(42));

        // Joins the live loop and the displaced one.
        monitor.stop_all_monitoring().await;
        assert!(!monitor.is_monitoring(42));

        let calls_after_stop = *github.list_calls.lock().unwrap();
        tokio::time::sleep(std::time::Duration::from_secs(600)).await;
        // No loop survived the stop; polling has ceased entirely.
        assert_eq!(*github.list_calls.lock().unwrap(), calls_after_stop);
    }
}
