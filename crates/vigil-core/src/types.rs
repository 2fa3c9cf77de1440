use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The classified purpose of a review comment.
///
/// Variant declaration order matters: intent scoring breaks ties by taking
/// the first category that reaches the maximum score.
///
/// # Examples
///
/// ```
/// use vigil_core::Intent;
///
/// let intent: Intent = serde_json::from_str("\"question\"").unwrap();
/// assert_eq!(intent, Intent::Question);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    /// The author is asking for information.
    Question,
    /// The author proposes an optional improvement.
    Suggestion,
    /// The author asks for a concrete change.
    Request,
    /// The author approves the change.
    Approval,
    /// The author blocks the change until addressed.
    Blocking,
    /// The author compliments the change.
    Praise,
    /// The comment is ambiguous and needs clarification.
    Clarification,
    /// The author raises a risk or worry.
    Concern,
}

impl Intent {
    /// All intents in declaration (tie-break) order.
    pub const ALL: [Intent; 8] = [
        Intent::Question,
        Intent::Suggestion,
        Intent::Request,
        Intent::Approval,
        Intent::Blocking,
        Intent::Praise,
        Intent::Clarification,
        Intent::Concern,
    ];
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Intent::Question => "question",
            Intent::Suggestion => "suggestion",
            Intent::Request => "request",
            Intent::Approval => "approval",
            Intent::Blocking => "blocking",
            Intent::Praise => "praise",
            Intent::Clarification => "clarification",
            Intent::Concern => "concern",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Intent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "question" => Ok(Intent::Question),
            "suggestion" => Ok(Intent::Suggestion),
            "request" => Ok(Intent::Request),
            "approval" => Ok(Intent::Approval),
            "blocking" => Ok(Intent::Blocking),
            "praise" => Ok(Intent::Praise),
            "clarification" => Ok(Intent::Clarification),
            "concern" => Ok(Intent::Concern),
            other => Err(format!("unknown intent: {other}")),
        }
    }
}

/// Priority assigned to a comment by the classifier's rule ladder.
///
/// # Examples
///
/// ```
/// use vigil_core::Priority;
///
/// assert!(Priority::Blocking.meets_threshold(Priority::High));
/// assert!(!Priority::Low.meets_threshold(Priority::Medium));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// No action expected.
    Low,
    /// Normal review traffic.
    #[default]
    Medium,
    /// Should be addressed promptly.
    High,
    /// Serious defect or risk.
    Critical,
    /// Blocks the merge outright.
    Blocking,
}

impl Priority {
    /// Returns `true` if `self` is at least as important as `threshold`.
    ///
    /// Priority order: Blocking > Critical > High > Medium > Low.
    pub fn meets_threshold(self, threshold: Priority) -> bool {
        self.rank() >= threshold.rank()
    }

    /// Numeric rank, higher is more important.
    pub fn rank(self) -> u8 {
        match self {
            Priority::Low => 0,
            Priority::Medium => 1,
            Priority::High => 2,
            Priority::Critical => 3,
            Priority::Blocking => 4,
        }
    }

    /// The next priority level up, saturating at [`Priority::Blocking`].
    pub fn bumped(self) -> Priority {
        match self {
            Priority::Low => Priority::Medium,
            Priority::Medium => Priority::High,
            Priority::High => Priority::Critical,
            Priority::Critical => Priority::Blocking,
            Priority::Blocking => Priority::Blocking,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
            Priority::Blocking => "blocking",
        };
        write!(f, "{name}")
    }
}

/// Lifecycle of a [`Comment`] inside the dispatcher.
///
/// Status only moves forward (`Pending → Acknowledged → InProgress →
/// Resolved`), with `Dismissed` and `Escalated` as side exits reachable from
/// any non-terminal state. [`Comment::advance`] enforces this.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentStatus {
    /// Seen but not yet processed.
    #[default]
    Pending,
    /// Classified and routed.
    Acknowledged,
    /// Action items are being executed.
    InProgress,
    /// Fully handled.
    Resolved,
    /// Dropped without handling.
    Dismissed,
    /// Handed to the escalation path.
    Escalated,
}

impl CommentStatus {
    /// Whether no further transitions are allowed from this status.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CommentStatus::Resolved | CommentStatus::Dismissed | CommentStatus::Escalated
        )
    }

    /// Whether a transition from `self` to `next` is legal.
    ///
    /// Forward moves along the main lifecycle are allowed, as are the
    /// `Dismissed`/`Escalated` side exits from any non-terminal state.
    /// Backward moves and transitions out of a terminal state are not.
    pub fn can_advance_to(self, next: CommentStatus) -> bool {
        if self == next {
            return true;
        }
        if self.is_terminal() {
            return false;
        }
        match next {
            CommentStatus::Pending => false,
            CommentStatus::Acknowledged => self == CommentStatus::Pending,
            CommentStatus::InProgress => {
                matches!(self, CommentStatus::Pending | CommentStatus::Acknowledged)
            }
            CommentStatus::Resolved | CommentStatus::Dismissed | CommentStatus::Escalated => true,
        }
    }
}

impl fmt::Display for CommentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommentStatus::Pending => "pending",
            CommentStatus::Acknowledged => "acknowledged",
            CommentStatus::InProgress => "in_progress",
            CommentStatus::Resolved => "resolved",
            CommentStatus::Dismissed => "dismissed",
            CommentStatus::Escalated => "escalated",
        };
        write!(f, "{name}")
    }
}

/// Where a comment was left on the pull request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentType {
    /// A top-level review or issue-style comment.
    #[default]
    Review,
    /// An inline comment attached to a diff position.
    Inline,
    /// A reply within an existing thread.
    Reply,
}

/// How urgently the author expects a response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    /// Explicitly no rush.
    Low,
    /// Normal turnaround.
    #[default]
    Medium,
    /// Soon, but not dropping everything.
    High,
    /// Immediate attention requested.
    Urgent,
}

/// How much work the comment implies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    /// One short instruction.
    #[default]
    Simple,
    /// A couple of related asks.
    Moderate,
    /// Several distinct concerns.
    Complex,
    /// A long comment enumerating many concerns.
    VeryComplex,
}

/// Classifier output attached to every processed comment.
///
/// # Examples
///
/// ```
/// use vigil_core::CommentMetadata;
///
/// let meta = CommentMetadata::default();
/// assert_eq!(meta.sentiment, 0.0);
/// assert!(!meta.action_required);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentMetadata {
    /// Sentiment score in `[-1.0, 1.0]`; 0.0 is neutral.
    pub sentiment: f64,
    /// Winning intent score in `[0.0, 1.0]`. Always classifier-derived,
    /// never caller-supplied.
    pub confidence: f64,
    /// Technical keywords found in the body.
    pub keywords: Vec<String>,
    /// Code, file, and function mentions found in the body.
    pub mentioned_code: Vec<String>,
    /// Estimated implementation complexity.
    pub complexity: Complexity,
    /// How urgently the author expects a response.
    pub urgency: Urgency,
    /// Whether the comment requires the agent to act.
    pub action_required: bool,
}

/// A concrete code change extracted from a comment.
///
/// Produced by the classifier from "change X to Y" / "replace X with Y"
/// phrases and fenced code blocks; marked applied by the dispatcher when
/// auto-apply triggers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeSuggestion {
    /// File the suggestion targets, anchored to the source comment.
    pub file: Option<String>,
    /// First affected line, anchored to the source comment.
    pub start_line: Option<u32>,
    /// Last affected line.
    pub end_line: Option<u32>,
    /// Code to be replaced, when the phrasing names it.
    pub old_code: String,
    /// Proposed replacement code.
    pub new_code: String,
    /// Free-text description of the change.
    pub description: String,
    /// Extraction confidence in `[0.0, 1.0]`, scaled by pattern specificity.
    pub confidence: f64,
    /// Whether the dispatcher applied the suggestion.
    pub applied: bool,
    /// When the suggestion was applied.
    pub applied_at: Option<DateTime<Utc>>,
}

/// Category of work a comment asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Modify code in place.
    CodeChange,
    /// Rename, move, or split files.
    FileModify,
    /// Add or extend tests.
    TestAdd,
    /// Update documentation.
    DocUpdate,
    /// Restructure without behavior change.
    Refactor,
    /// Look into something before deciding.
    Investigate,
    /// Needs a human conversation.
    Discuss,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionType::CodeChange => "code_change",
            ActionType::FileModify => "file_modify",
            ActionType::TestAdd => "test_add",
            ActionType::DocUpdate => "doc_update",
            ActionType::Refactor => "refactor",
            ActionType::Investigate => "investigate",
            ActionType::Discuss => "discuss",
        };
        write!(f, "{name}")
    }
}

/// Execution state of a [`ResponseAction`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    /// Not yet executed.
    #[default]
    Pending,
    /// Executed successfully.
    Completed,
    /// Execution failed.
    Failed,
}

/// One unit of work extracted from a comment by the classifier and executed
/// by the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseAction {
    /// What kind of work this is.
    pub action_type: ActionType,
    /// Human-readable description of the work.
    pub description: String,
    /// File the action targets, when known.
    pub file: Option<String>,
    /// Command to run, when the action is command-shaped.
    pub command: Option<String>,
    /// Execution state.
    pub status: ActionStatus,
    /// Outcome text set by the executor.
    pub result: Option<String>,
    /// When the action was executed.
    pub executed_at: Option<DateTime<Utc>>,
}

impl ResponseAction {
    /// Create a pending action of the given type.
    pub fn new(action_type: ActionType, description: impl Into<String>) -> Self {
        Self {
            action_type,
            description: description.into(),
            file: None,
            command: None,
            status: ActionStatus::Pending,
            result: None,
            executed_at: None,
        }
    }
}

/// A single pull-request review comment as seen by the triage engine.
///
/// Supplied by the GitHub collaborator and mutated in place while it flows
/// through classification and dispatch.
///
/// # Examples
///
/// ```
/// use vigil_core::{Comment, CommentStatus};
///
/// let mut comment = Comment::new(1, "octocat", "Please fix this");
/// assert_eq!(comment.status, CommentStatus::Pending);
/// comment.advance(CommentStatus::Acknowledged);
/// assert_eq!(comment.status, CommentStatus::Acknowledged);
///
/// // Backward moves are rejected.
/// comment.advance(CommentStatus::Pending);
/// assert_eq!(comment.status, CommentStatus::Acknowledged);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// GitHub comment id.
    pub id: u64,
    /// Where the comment was left.
    pub comment_type: CommentType,
    /// Login of the comment author.
    pub author: String,
    /// Raw comment body.
    pub body: String,
    /// File the comment is attached to, for inline comments.
    pub file: Option<String>,
    /// Line number in the new version of the file.
    pub line: Option<u32>,
    /// Diff position, when the API supplies one.
    pub position: Option<u32>,
    /// Id of the comment this one replies to, for thread replies.
    pub in_reply_to: Option<u64>,
    /// Classified intent; `None` until the classifier has run.
    pub intent: Option<Intent>,
    /// Classified priority.
    pub priority: Priority,
    /// Lifecycle status.
    pub status: CommentStatus,
    /// When the comment was created.
    pub created_at: DateTime<Utc>,
    /// When the comment was last updated.
    pub updated_at: DateTime<Utc>,
    /// When the comment was resolved, if it was.
    pub resolved_at: Option<DateTime<Utc>>,
    /// Classifier output.
    pub metadata: CommentMetadata,
    /// Replies the engine has posted, in order.
    pub responses: Vec<String>,
    /// Code suggestions extracted from the body, in order.
    pub suggestions: Vec<CodeSuggestion>,
    /// Issue/PR/URL references found in the body, in order.
    pub references: Vec<String>,
}

impl Comment {
    /// Create a pending comment with the current time for both timestamps.
    pub fn new(id: u64, author: impl Into<String>, body: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            comment_type: CommentType::default(),
            author: author.into(),
            body: body.into(),
            file: None,
            line: None,
            position: None,
            in_reply_to: None,
            intent: None,
            priority: Priority::default(),
            status: CommentStatus::default(),
            created_at: now,
            updated_at: now,
            resolved_at: None,
            metadata: CommentMetadata::default(),
            responses: Vec::new(),
            suggestions: Vec::new(),
            references: Vec::new(),
        }
    }

    /// Move the lifecycle forward, ignoring illegal transitions.
    ///
    /// Returns `true` if the status changed. Resolving stamps `resolved_at`.
    pub fn advance(&mut self, next: CommentStatus) -> bool {
        if !self.status.can_advance_to(next) || self.status == next {
            return false;
        }
        self.status = next;
        self.updated_at = Utc::now();
        if next == CommentStatus::Resolved && self.resolved_at.is_none() {
            self.resolved_at = Some(self.updated_at);
        }
        true
    }

    /// Intent to route on, defaulting to ambiguous when unclassified.
    pub fn routing_intent(&self) -> Intent {
        self.intent.unwrap_or(Intent::Clarification)
    }
}
