//! Deterministic comment analysis for the Vigil triage engine.
//!
//! [`Classifier`] annotates a [`Comment`] in place with intent, sentiment,
//! priority, urgency, complexity, keywords, mentioned code, and extracted
//! suggestions. Everything here is pure keyword/pattern scoring over the
//! comment body: no I/O, no shared state, no model calls.

mod extract;
mod intent;
mod sentiment;

pub use extract::complete_action;
pub use sentiment::sentiment_score;

use vigil_core::{
    CodeSuggestion, Comment, Complexity, Intent, Priority, ResponseAction, TriageConfig, Urgency,
};

use intent::IntentCategory;

/// Keywords that immediately force [`Priority::Blocking`].
const BLOCKING_KEYWORDS: &[&str] = &[
    "blocking",
    "blocker",
    "must fix",
    "cannot merge",
    "do not merge",
];

/// Keywords that immediately force [`Priority::Critical`].
const CRITICAL_KEYWORDS: &[&str] = &[
    "critical",
    "security vulnerability",
    "data loss",
    "crash",
    "severe",
];

/// Keywords that bump priority one level (minimum High).
const URGENT_KEYWORDS: &[&str] = &["urgent", "asap", "immediately"];

/// Distinct concern markers counted by the complexity heuristic.
const CONCERN_MARKERS: &[&str] = &[
    "refactor",
    "test",
    "document",
    "compatib",
    "performance",
    "thread",
    "security",
    "migrat",
    "architect",
    "error handling",
    "edge case",
];

/// Deterministic comment classifier.
///
/// Category tables and extraction patterns compile once at construction;
/// [`Classifier::annotate`] then runs the whole pipeline over a comment body.
///
/// # Examples
///
/// ```
/// use vigil_classify::Classifier;
/// use vigil_core::{Comment, Intent, Priority};
///
/// let classifier = Classifier::new(0.1);
/// let mut comment = Comment::new(1, "alice", "This is blocking the release");
/// classifier.annotate(&mut comment);
/// assert_eq!(comment.intent, Some(Intent::Blocking));
/// assert_eq!(comment.priority, Priority::Blocking);
/// ```
pub struct Classifier {
    categories: Vec<IntentCategory>,
    extractor: extract::Extractor,
    confidence_threshold: f64,
}

impl Classifier {
    /// Build a classifier with the given confidence threshold.
    ///
    /// When the winning intent score falls below the threshold, the comment
    /// is treated as ambiguous and classified [`Intent::Clarification`], with
    /// the raw score still reported as confidence.
    pub fn new(confidence_threshold: f64) -> Self {
        Self {
            categories: intent::build_categories(),
            extractor: extract::Extractor::new(),
            confidence_threshold,
        }
    }

    /// Build a classifier from triage configuration.
    pub fn from_config(config: &TriageConfig) -> Self {
        Self::new(config.confidence_threshold)
    }

    /// Run the full analysis pipeline and fill the comment in place.
    ///
    /// Sets `intent`, `priority`, `metadata` (sentiment, confidence, urgency,
    /// complexity, keywords, mentioned code, action-required), `suggestions`,
    /// and `references`. Classification is pure and cannot fail: an empty
    /// body yields zero-valued scores, not an error.
    pub fn annotate(&self, comment: &mut Comment) {
        let (winner, score) = intent::classify(&self.categories, &comment.body);
        let intent = if score < self.confidence_threshold {
            Intent::Clarification
        } else {
            winner
        };

        let priority = classify_priority(&comment.body, intent);

        comment.intent = Some(intent);
        comment.priority = priority;
        comment.metadata.confidence = score;
        comment.metadata.sentiment = sentiment::sentiment_score(&comment.body);
        comment.metadata.urgency = classify_urgency(&comment.body);
        comment.metadata.complexity = classify_complexity(&comment.body);
        comment.metadata.keywords = self.extractor.keywords(&comment.body);
        comment.metadata.mentioned_code = self.extractor.mentioned_code(&comment.body);
        comment.metadata.action_required = requires_action(intent, priority);
        comment.suggestions = self.extractor.code_suggestions(comment);
        comment.references = self.extractor.references(&comment.body);
    }

    /// Extract concrete code suggestions from the comment body.
    pub fn extract_code_suggestions(&self, comment: &Comment) -> Vec<CodeSuggestion> {
        self.extractor.code_suggestions(comment)
    }

    /// Extract action items from a comment.
    ///
    /// Returns nothing unless the classifier marked the comment as requiring
    /// action. When it does, every action-keyword occurrence contributes one
    /// item; a comment with no specific keyword yields one Investigate item.
    pub fn extract_action_items(&self, comment: &Comment) -> Vec<ResponseAction> {
        if !comment.metadata.action_required {
            return Vec::new();
        }
        self.extractor.action_items(comment)
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::from_config(&TriageConfig::default())
    }
}

/// Whether a comment needs the agent to act.
///
/// True for Request/Blocking/Question intents, and for any High-or-above
/// priority unless the intent is Approval or Praise (those never require
/// action regardless of priority).
pub fn requires_action(intent: Intent, priority: Priority) -> bool {
    match intent {
        Intent::Request | Intent::Blocking | Intent::Question => true,
        Intent::Approval | Intent::Praise => false,
        _ => priority.meets_threshold(Priority::High),
    }
}

/// The priority rule ladder, evaluated top-down with first match winning.
fn classify_priority(body: &str, intent: Intent) -> Priority {
    let lower = body.to_lowercase();
    if BLOCKING_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        return Priority::Blocking;
    }
    if CRITICAL_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        return Priority::Critical;
    }
    if intent == Intent::Blocking {
        return Priority::Blocking;
    }

    let baseline = match intent {
        Intent::Concern => Priority::High,
        Intent::Question => Priority::Medium,
        Intent::Approval | Intent::Praise => Priority::Low,
        _ => Priority::Medium,
    };

    if URGENT_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        let bumped = baseline.bumped();
        return if bumped.meets_threshold(Priority::High) {
            bumped
        } else {
            Priority::High
        };
    }

    baseline
}

/// The urgency keyword ladder.
fn classify_urgency(body: &str) -> Urgency {
    let lower = body.to_lowercase();
    if URGENT_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        Urgency::Urgent
    } else if lower.contains("quickly") || lower.contains("soon") {
        Urgency::High
    } else if lower.contains("no rush") {
        Urgency::Low
    } else {
        Urgency::Medium
    }
}

/// Complexity heuristic over body length and distinct concern markers.
fn classify_complexity(body: &str) -> Complexity {
    let lower = body.to_lowercase();
    let markers = CONCERN_MARKERS
        .iter()
        .filter(|m| lower.contains(*m))
        .count();
    let len = body.len();

    if len > 800 || markers >= 5 {
        Complexity::VeryComplex
    } else if len > 400 || markers >= 3 {
        Complexity::Complex
    } else if len > 120 || markers >= 2 {
        Complexity::Moderate
    } else {
        Complexity::Simple
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::CommentStatus;

    fn annotated(body: &str) -> Comment {
        let classifier = Classifier::new(0.05);
        let mut comment = Comment::new(1, "alice", body);
        classifier.annotate(&mut comment);
        comment
    }

    #[test]
    fn blocking_body_gets_blocking_priority() {
        let comment = annotated("This is blocking the release");
        assert_eq!(comment.priority, Priority::Blocking);
    }

    #[test]
    fn critical_body_gets_critical_priority() {
        let comment = annotated("Critical security vulnerability found");
        assert_eq!(comment.priority, Priority::Critical);
    }

    #[test]
    fn blocking_intent_forces_blocking_priority() {
        // No blocking keyword in the body; the intent alone must force it.
        assert_eq!(
            classify_priority("hold everything", Intent::Blocking),
            Priority::Blocking
        );
    }

    #[test]
    fn urgent_request_bumps_to_high() {
        assert_eq!(
            classify_priority("Please fix this urgently", Intent::Request),
            Priority::High
        );
    }

    #[test]
    fn urgent_concern_bumps_past_high() {
        assert_eq!(
            classify_priority("this needs attention asap", Intent::Concern),
            Priority::Critical
        );
    }

    #[test]
    fn priority_table_is_total() {
        let bodies = ["", "some text", "urgent!", "critical", "blocking"];
        for body in bodies {
            for intent in Intent::ALL {
                // Must always produce a value; the match below is exhaustive
                // over the enum so this is a smoke check of the ladder.
                let p = classify_priority(body, intent);
                assert!(p.rank() <= Priority::Blocking.rank());
            }
        }
    }

    #[test]
    fn approval_and_praise_are_low() {
        assert_eq!(classify_priority("ship it", Intent::Approval), Priority::Low);
        assert_eq!(classify_priority("nice work", Intent::Praise), Priority::Low);
    }

    #[test]
    fn question_is_medium() {
        assert_eq!(
            classify_priority("why this way?", Intent::Question),
            Priority::Medium
        );
    }

    #[test]
    fn urgency_ladder() {
        assert_eq!(classify_urgency("fix this asap"), Urgency::Urgent);
        assert_eq!(classify_urgency("please do this soon"), Urgency::High);
        assert_eq!(classify_urgency("no rush on this one"), Urgency::Low);
        assert_eq!(classify_urgency("just a thought"), Urgency::Medium);
    }

    #[test]
    fn complexity_scales_with_length_and_markers() {
        assert_eq!(classify_complexity("fix this typo"), Complexity::Simple);
        assert_eq!(
            classify_complexity("Please refactor this and add a test for the error path"),
            Complexity::Moderate
        );
        let long = "This needs a refactor, more tests, updated documentation, a security \
                    review of the authentication path, and a look at performance under load. \
                    Also consider backward compatibility with the v1 API before merging."
            .to_string();
        let c = classify_complexity(&long);
        assert!(matches!(c, Complexity::Complex | Complexity::VeryComplex));
    }

    #[test]
    fn requires_action_truth_table() {
        assert!(requires_action(Intent::Request, Priority::Medium));
        assert!(requires_action(Intent::Blocking, Priority::Blocking));
        assert!(requires_action(Intent::Question, Priority::Medium));
        assert!(!requires_action(Intent::Approval, Priority::Low));
        assert!(!requires_action(Intent::Praise, Priority::Low));
        assert!(requires_action(Intent::Clarification, Priority::High));
        // Approval/Praise never require action regardless of priority.
        assert!(!requires_action(Intent::Approval, Priority::Blocking));
        assert!(!requires_action(Intent::Praise, Priority::Critical));
        // Low-priority ambiguity does not require action.
        assert!(!requires_action(Intent::Suggestion, Priority::Medium));
    }

    #[test]
    fn annotate_fills_metadata() {
        let comment = annotated("Great work! Can you add a test for parse_config(input)?");
        assert!(comment.intent.is_some());
        assert!(comment.metadata.confidence > 0.0);
        assert!(comment.metadata.sentiment > 0.0);
        assert!(comment
            .metadata
            .mentioned_code
            .iter()
            .any(|s| s == "parse_config(input)"));
        assert!(comment.metadata.keywords.iter().any(|k| k == "test"));
    }

    #[test]
    fn annotate_low_confidence_defaults_to_clarification() {
        let classifier = Classifier::new(0.9);
        let mut comment = Comment::new(1, "bob", "hmm, interesting approach here");
        classifier.annotate(&mut comment);
        assert_eq!(comment.intent, Some(Intent::Clarification));
        // Raw confidence is still reported, not zeroed.
        assert!(comment.metadata.confidence < 0.9);
    }

    #[test]
    fn annotate_empty_body_is_zero_scored() {
        let comment = annotated("");
        assert_eq!(comment.metadata.confidence, 0.0);
        assert_eq!(comment.metadata.sentiment, 0.0);
        assert!(comment.metadata.keywords.is_empty());
        assert!(comment.metadata.mentioned_code.is_empty());
        assert_eq!(comment.intent, Some(Intent::Clarification));
    }

    #[test]
    fn annotate_does_not_touch_status() {
        let comment = annotated("Please fix this");
        assert_eq!(comment.status, CommentStatus::Pending);
    }

    #[test]
    fn extract_action_items_gated_on_action_required() {
        let classifier = Classifier::new(0.05);

        let mut praise = Comment::new(1, "alice", "Great work, love this test coverage");
        classifier.annotate(&mut praise);
        assert!(classifier.extract_action_items(&praise).is_empty());

        let mut request = Comment::new(2, "alice", "Please fix the parser and add a test");
        classifier.annotate(&mut request);
        let items = classifier.extract_action_items(&request);
        assert!(!items.is_empty());
    }
}
