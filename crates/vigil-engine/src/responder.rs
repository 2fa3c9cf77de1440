use std::fmt::Write;

use vigil_core::{ActionStatus, Comment, ResponseAction};

/// Formats human-readable replies per intent.
///
/// Pure string rendering; the dispatcher decides whether and when a reply is
/// actually posted. All output is truncated to the configured maximum
/// response length.
pub struct Responder {
    max_length: usize,
}

impl Responder {
    pub fn new(max_length: usize) -> Self {
        Self { max_length }
    }

    /// Reply to a question, acknowledging it and pointing at any code the
    /// author mentioned.
    pub fn answer_question(&self, comment: &Comment) -> String {
        let mut out = format!(
            "Thanks for the question, @{}. Looking into it now",
            comment.author
        );
        if let Some(code) = comment.metadata.mentioned_code.first() {
            let _ = write!(out, " (starting from `{code}`)");
        }
        out.push_str(". I'll follow up here with details.");
        self.truncate(out)
    }

    /// Status reply for extracted code suggestions.
    pub fn suggestion_status(&self, comment: &Comment) -> String {
        let total = comment.suggestions.len();
        let applied = comment.suggestions.iter().filter(|s| s.applied).count();
        let out = if total == 0 {
            format!(
                "Thanks for the suggestion, @{}. I didn't find a concrete change to apply, \
                 but I've noted the feedback.",
                comment.author
            )
        } else if applied == total {
            format!(
                "Applied {applied} suggested change{} from this comment.",
                plural(applied)
            )
        } else if applied > 0 {
            format!(
                "Applied {applied} of {total} suggested changes; the rest need manual review."
            )
        } else {
            format!(
                "Extracted {total} suggested change{}; none met the auto-apply confidence bar, \
                 so they're queued for manual review.",
                plural(total)
            )
        };
        self.truncate(out)
    }

    /// Outcome listing for a handled request, one line per action.
    pub fn request_outcome(&self, comment: &Comment, actions: &[ResponseAction]) -> String {
        let mut out = format!("Working on the request from @{}:\n", comment.author);
        for action in actions {
            let marker = match action.status {
                ActionStatus::Completed => "x",
                ActionStatus::Pending | ActionStatus::Failed => " ",
            };
            let _ = writeln!(out, "- [{marker}] {} ({})", action.description, action.action_type);
            if action.status == ActionStatus::Failed {
                if let Some(result) = &action.result {
                    let _ = writeln!(out, "  failed: {result}");
                }
            }
        }
        let completed = actions
            .iter()
            .filter(|a| a.status == ActionStatus::Completed)
            .count();
        if completed == actions.len() && !actions.is_empty() {
            out.push_str("\nAll items handled; marking this resolved.");
        }
        self.truncate(out)
    }

    /// Escalation-style reply for a blocking comment.
    pub fn escalation_notice(&self, comment: &Comment) -> String {
        self.truncate(format!(
            "This comment from @{} is marked blocking and has been escalated. \
             It will be prioritized ahead of other feedback on this pull request.",
            comment.author
        ))
    }

    /// Thank-you reply for approvals and praise.
    pub fn thanks(&self, comment: &Comment) -> String {
        self.truncate(format!("Thanks for the review, @{}!", comment.author))
    }

    /// Clarification request for ambiguous comments.
    pub fn clarification_request(&self, comment: &Comment) -> String {
        self.truncate(format!(
            "Thanks @{} — I want to make sure I address this correctly. \
             Could you clarify what change you'd like to see here?",
            comment.author
        ))
    }

    fn truncate(&self, text: String) -> String {
        if text.chars().count() <= self.max_length {
            return text;
        }
        if self.max_length == 0 {
            return String::new();
        }
        let mut out: String = text.chars().take(self.max_length - 1).collect();
        out.push('\u{2026}');
        out
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}
