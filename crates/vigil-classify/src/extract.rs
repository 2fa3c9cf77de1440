use chrono::Utc;
use regex::Regex;
use vigil_core::{ActionType, CodeSuggestion, Comment, ResponseAction};

/// Fixed technical vocabulary used by keyword extraction.
const TECH_VOCABULARY: &[&str] = &[
    "function",
    "error",
    "api",
    "database",
    "authentication",
    "performance",
    "security",
    "test",
    "tests",
    "documentation",
    "interface",
    "memory",
    "thread",
    "cache",
    "config",
    "logging",
    "validation",
    "refactor",
    "dependency",
    "deployment",
    "migration",
];

/// Keyword families that map action-item mentions to an [`ActionType`].
///
/// Every occurrence of a family keyword produces one action item, so a
/// comment mentioning "test" twice yields two TestAdd items.
const ACTION_FAMILIES: &[(ActionType, &[&str])] = &[
    (ActionType::TestAdd, &["test", "coverage", "assert"]),
    (ActionType::DocUpdate, &["document", "docs", "readme", "comment the"]),
    (ActionType::Refactor, &["refactor", "clean up", "simplify", "extract"]),
    (ActionType::FileModify, &["rename", "move the file", "split the file"]),
    (ActionType::CodeChange, &["fix", "change", "update", "remove", "replace"]),
    (ActionType::Discuss, &["discuss", "thoughts", "opinion", "let's talk"]),
    (ActionType::Investigate, &["investigate", "look into", "verify", "double-check"]),
];

/// Compiled extraction patterns, built once per [`crate::Classifier`].
pub(crate) struct Extractor {
    fenced: Regex,
    inline: Regex,
    file_path: Regex,
    func_call: Regex,
    issue_ref: Regex,
    url_ref: Regex,
    change_backticked: Regex,
    replace_backticked: Regex,
    change_plain: Regex,
    replace_plain: Regex,
}

impl Extractor {
    pub(crate) fn new() -> Self {
        let compile = |p: &str| {
            Regex::new(p).unwrap_or_else(|e| panic!("invalid extraction pattern {p:?}: {e}"))
        };
        Self {
            fenced: compile(r"(?s)```[a-zA-Z0-9_+-]*\n?(.*?)```"),
            inline: compile(r"`([^`\n]+)`"),
            file_path: compile(r"\b[\w-]+(?:/[\w-]+)*\.[a-z]{1,4}\b"),
            func_call: compile(r"\b[A-Za-z_][A-Za-z0-9_]*\([^)\n]*\)"),
            issue_ref: compile(r"#\d+"),
            url_ref: compile(r"https?://[^\s)>]+"),
            change_backticked: compile(r"(?i)\bchange\s+`([^`]+)`\s+to\s+`([^`]+)`"),
            replace_backticked: compile(r"(?i)\breplace\s+`([^`]+)`\s+with\s+`([^`]+)`"),
            change_plain: compile(r"(?i)\bchange\s+([^`\n]+?)\s+to\s+([^`\n.!?]+)"),
            replace_plain: compile(r"(?i)\breplace\s+([^`\n]+?)\s+with\s+([^`\n.!?]+)"),
        }
    }

    /// Pull fenced code blocks, inline code, file-path tokens, and
    /// function-call tokens out of a body.
    ///
    /// Returns an empty vector (never a sentinel) when nothing matches.
    pub(crate) fn mentioned_code(&self, body: &str) -> Vec<String> {
        let mut found: Vec<String> = Vec::new();
        let mut push_unique = |s: String| {
            if !s.is_empty() && !found.contains(&s) {
                found.push(s);
            }
        };

        for caps in self.fenced.captures_iter(body) {
            push_unique(caps[1].trim_matches('\n').to_string());
        }
        // Inline/path/call scans run on the body with fenced blocks removed,
        // so backtick fences are not re-matched piecemeal.
        let stripped = self.fenced.replace_all(body, " ");
        for caps in self.inline.captures_iter(&stripped) {
            push_unique(caps[1].to_string());
        }
        for m in self.file_path.find_iter(&stripped) {
            push_unique(m.as_str().to_string());
        }
        for m in self.func_call.find_iter(&stripped) {
            push_unique(m.as_str().to_string());
        }
        found
    }

    /// Intersect body tokens with the fixed technical vocabulary.
    pub(crate) fn keywords(&self, body: &str) -> Vec<String> {
        let tokens: Vec<String> = body
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_lowercase())
            .collect();
        TECH_VOCABULARY
            .iter()
            .filter(|word| tokens.iter().any(|t| t == *word))
            .map(|word| word.to_string())
            .collect()
    }

    /// Issue numbers (`#123`) and URLs referenced by the body, in order.
    pub(crate) fn references(&self, body: &str) -> Vec<String> {
        let mut refs: Vec<String> = Vec::new();
        for m in self.issue_ref.find_iter(body) {
            let s = m.as_str().to_string();
            if !refs.contains(&s) {
                refs.push(s);
            }
        }
        for m in self.url_ref.find_iter(body) {
            let s = m.as_str().to_string();
            if !refs.contains(&s) {
                refs.push(s);
            }
        }
        refs
    }

    /// Extract concrete code suggestions from "change X to Y" / "replace X
    /// with Y" phrasings and fenced code blocks.
    ///
    /// Confidence reflects pattern specificity: backticked phrase pairs score
    /// highest, plain phrases lower, bare fenced blocks lowest. Every
    /// suggestion is anchored to the source comment's file and line.
    pub(crate) fn code_suggestions(&self, comment: &Comment) -> Vec<CodeSuggestion> {
        let body = &comment.body;
        let mut suggestions = Vec::new();

        for (pattern, confidence) in [
            (&self.change_backticked, 0.9),
            (&self.replace_backticked, 0.9),
            (&self.change_plain, 0.7),
            (&self.replace_plain, 0.7),
        ] {
            for caps in pattern.captures_iter(body) {
                suggestions.push(self.anchored_suggestion(
                    comment,
                    caps[1].trim().to_string(),
                    caps[2].trim().to_string(),
                    format!("Replace `{}` with `{}`", caps[1].trim(), caps[2].trim()),
                    confidence,
                ));
            }
        }

        for caps in self.fenced.captures_iter(body) {
            let block = caps[1].trim_matches('\n');
            if block.is_empty() {
                continue;
            }
            suggestions.push(self.anchored_suggestion(
                comment,
                String::new(),
                block.to_string(),
                "Apply suggested code block".to_string(),
                0.6,
            ));
        }

        suggestions
    }

    fn anchored_suggestion(
        &self,
        comment: &Comment,
        old_code: String,
        new_code: String,
        description: String,
        confidence: f64,
    ) -> CodeSuggestion {
        CodeSuggestion {
            file: comment.file.clone(),
            start_line: comment.line,
            end_line: comment.line,
            old_code,
            new_code,
            description,
            confidence,
            applied: false,
            applied_at: None,
        }
    }

    /// Map action-keyword mentions to pending [`ResponseAction`]s.
    ///
    /// Only meaningful when the comment requires action (the caller gates on
    /// that). Emits one item per keyword occurrence; when no family matches,
    /// emits exactly one generic Investigate item.
    pub(crate) fn action_items(&self, comment: &Comment) -> Vec<ResponseAction> {
        let lower = comment.body.to_lowercase();
        let mut items = Vec::new();
        for (action_type, family) in ACTION_FAMILIES {
            for keyword in *family {
                for _ in lower.matches(keyword) {
                    let mut action = ResponseAction::new(
                        *action_type,
                        format!("Address '{keyword}' mention from comment {}", comment.id),
                    );
                    action.file = comment.file.clone();
                    items.push(action);
                }
            }
        }
        if items.is_empty() {
            let mut action = ResponseAction::new(
                ActionType::Investigate,
                format!("Investigate feedback from comment {}", comment.id),
            );
            action.file = comment.file.clone();
            items.push(action);
        }
        items
    }
}

/// Stamp an action as executed.
///
/// Small helper shared by the dispatcher; lives here so the action lifecycle
/// stays beside its extraction.
pub fn complete_action(action: &mut ResponseAction, result: impl Into<String>, ok: bool) {
    action.status = if ok {
        vigil_core::ActionStatus::Completed
    } else {
        vigil_core::ActionStatus::Failed
    };
    action.result = Some(result.into());
    action.executed_at = Some(Utc::now());
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::ActionStatus;

    fn comment(body: &str) -> Comment {
        Comment::new(42, "alice", body)
    }

    #[test]
    fn mentioned_code_finds_fenced_and_inline() {
        let extractor = Extractor::new();
        let body = "Try this:\n```go\nfunc main() {}\n```\nand rename `variable` too";
        let found = extractor.mentioned_code(body);
        assert!(found.iter().any(|s| s == "func main() {}"));
        assert!(found.iter().any(|s| s == "variable"));
    }

    #[test]
    fn mentioned_code_finds_paths_and_calls() {
        let extractor = Extractor::new();
        let found = extractor.mentioned_code("See src/handler.rs and parse_config(input) there");
        assert!(found.iter().any(|s| s == "src/handler.rs"));
        assert!(found.iter().any(|s| s == "parse_config(input)"));
    }

    #[test]
    fn mentioned_code_empty_on_plain_text() {
        let extractor = Extractor::new();
        let found = extractor.mentioned_code("This looks good to me");
        assert!(found.is_empty());
    }

    #[test]
    fn keywords_intersect_vocabulary() {
        let extractor = Extractor::new();
        let found = extractor.keywords("The function has an error in the api layer");
        assert_eq!(found, vec!["function", "error", "api"]);
    }

    #[test]
    fn keywords_empty_when_nothing_technical() {
        let extractor = Extractor::new();
        assert!(extractor.keywords("sounds fine to me").is_empty());
    }

    #[test]
    fn references_find_issues_and_urls() {
        let extractor = Extractor::new();
        let refs = extractor.references("Related to #123, see https://example.com/design");
        assert_eq!(refs, vec!["#123", "https://example.com/design"]);
    }

    #[test]
    fn suggestion_from_backticked_change_phrase() {
        let extractor = Extractor::new();
        let mut c = comment("Please change `foo_bar` to `foo_baz` here");
        c.file = Some("src/lib.rs".into());
        c.line = Some(10);
        let suggestions = extractor.code_suggestions(&c);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].old_code, "foo_bar");
        assert_eq!(suggestions[0].new_code, "foo_baz");
        assert_eq!(suggestions[0].file.as_deref(), Some("src/lib.rs"));
        assert_eq!(suggestions[0].start_line, Some(10));
        assert!(suggestions[0].confidence > 0.8);
        assert!(!suggestions[0].applied);
    }

    #[test]
    fn suggestion_from_plain_replace_phrase_scores_lower() {
        let extractor = Extractor::new();
        let c = comment("replace the vector with a hash map.");
        let suggestions = extractor.code_suggestions(&c);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].old_code, "the vector");
        assert_eq!(suggestions[0].new_code, "a hash map");
        assert!(suggestions[0].confidence < 0.8);
    }

    #[test]
    fn suggestion_from_fenced_block() {
        let extractor = Extractor::new();
        let c = comment("Use this instead:\n```rust\nlet x = 1;\n```");
        let suggestions = extractor.code_suggestions(&c);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].new_code, "let x = 1;");
        assert!(suggestions[0].old_code.is_empty());
    }

    #[test]
    fn no_suggestions_on_plain_text() {
        let extractor = Extractor::new();
        assert!(extractor.code_suggestions(&comment("nice work")).is_empty());
    }

    #[test]
    fn action_items_one_per_keyword_occurrence() {
        let extractor = Extractor::new();
        let items =
            extractor.action_items(&comment("add a test here and another test for the error path"));
        let test_items = items
            .iter()
            .filter(|a| a.action_type == ActionType::TestAdd)
            .count();
        assert_eq!(test_items, 2);
    }

    #[test]
    fn action_items_fall_back_to_investigate() {
        let extractor = Extractor::new();
        let items = extractor.action_items(&comment("hmm, something is off here"));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].action_type, ActionType::Investigate);
    }

    #[test]
    fn complete_action_stamps_result() {
        let mut action = ResponseAction::new(ActionType::CodeChange, "do the thing");
        complete_action(&mut action, "done", true);
        assert_eq!(action.status, ActionStatus::Completed);
        assert_eq!(action.result.as_deref(), Some("done"));
        assert!(action.executed_at.is_some());

        let mut failed = ResponseAction::new(ActionType::CodeChange, "do the thing");
        complete_action(&mut failed, "no permission", false);
        assert_eq!(failed.status, ActionStatus::Failed);
    }
}
