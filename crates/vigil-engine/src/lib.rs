//! Dispatch, tracking, and monitoring for review-comment triage.
//!
//! Provides the intent-routed comment dispatcher, the tracker registry and
//! escalation rules, the per-PR polling monitor, and the GitHub and
//! notification collaborators they talk through.

pub mod escalation;
pub mod github;
pub mod handler;
pub mod monitor;
pub mod notify;
pub mod responder;
pub mod tracker;

pub use escalation::{should_escalate, Escalator};
pub use github::{GitHubClient, OctocrabClient};
pub use handler::{CommentHandler, CommentProcessor};
pub use monitor::CommentMonitor;
pub use notify::{NotificationSink, NullSink, WebhookSink};
pub use responder::Responder;
pub use tracker::{
    CommentTracker, EscalationEvent, EscalationStatus, ResolutionEvent, ResolutionMethod,
    TrackerMetrics, TrackerRegistry, TrackingStats, TrackingStatus,
};
