use regex::Regex;
use vigil_core::Intent;

/// One intent category: a fixed keyword list, a fixed pattern list, and a
/// weight.
///
/// Score is `weight × matches / (keywords + patterns)`, clamped to `[0, 1]`,
/// where `matches` counts case-insensitive keyword hits plus regex hits.
pub(crate) struct IntentCategory {
    pub intent: Intent,
    keywords: &'static [&'static str],
    patterns: Vec<Regex>,
    weight: f64,
}

impl IntentCategory {
    pub(crate) fn new(
        intent: Intent,
        keywords: &'static [&'static str],
        patterns: &[&str],
        weight: f64,
    ) -> Self {
        let patterns = patterns
            .iter()
            .map(|p| Regex::new(p).unwrap_or_else(|e| panic!("invalid intent pattern {p:?}: {e}")))
            .collect();
        Self {
            intent,
            keywords,
            patterns,
            weight,
        }
    }

    /// Score this category against a comment body.
    pub(crate) fn score(&self, body: &str) -> f64 {
        if body.trim().is_empty() {
            return 0.0;
        }
        let lower = body.to_lowercase();
        let keyword_hits = self
            .keywords
            .iter()
            .filter(|kw| lower.contains(&kw.to_lowercase()))
            .count();
        let pattern_hits = self.patterns.iter().filter(|re| re.is_match(body)).count();
        let total = self.keywords.len() + self.patterns.len();
        if total == 0 {
            return 0.0;
        }
        let score = self.weight * (keyword_hits + pattern_hits) as f64 / total as f64;
        score.clamp(0.0, 1.0)
    }
}

/// The fixed category table, in tie-break (declaration) order.
pub(crate) fn build_categories() -> Vec<IntentCategory> {
    vec![
        IntentCategory::new(
            Intent::Question,
            &[
                "what", "why", "how", "when", "where", "which", "clarify", "wondering",
            ],
            &[
                r"\?\s*$",
                r"(?i)^(what|why|how|when|where|which|who|does|do|is|are|can|could|should|would)\b[^?\n]*\?",
            ],
            1.0,
        ),
        IntentCategory::new(
            Intent::Suggestion,
            &[
                "suggest",
                "recommend",
                "consider",
                "maybe",
                "perhaps",
                "alternatively",
                "optional",
            ],
            &[
                r"(?i)\b(might|may|could)\s+want\s+to\b",
                r"(?i)\bhow\s+about\b",
                r"(?i)\bwhat\s+if\b",
                r"(?i)\binstead\s+of\b",
            ],
            0.9,
        ),
        IntentCategory::new(
            Intent::Request,
            &[
                "please",
                "can you",
                "could you",
                "fix",
                "change",
                "update",
                "add",
                "remove",
            ],
            &[
                r"(?i)\b(please|kindly)\b",
                r"(?i)^(fix|change|update|add|remove|rename)\b",
            ],
            1.0,
        ),
        IntentCategory::new(
            Intent::Approval,
            &[
                "lgtm",
                "looks good",
                "approved",
                "approve",
                "ship it",
                "sounds good",
            ],
            &[r"(?i)\blooks\s+good\s+to\s+me\b", r"(?i)\bgood\s+to\s+merge\b"],
            1.0,
        ),
        IntentCategory::new(
            Intent::Blocking,
            &[
                "blocking",
                "blocker",
                "must fix",
                "cannot merge",
                "do not merge",
                "hold off",
            ],
            &[
                r"(?i)\bblock(s|ing|er)?\b",
                r"(?i)\bmust\s+(be\s+)?(fix|address)(ed)?\b",
            ],
            1.0,
        ),
        IntentCategory::new(
            Intent::Praise,
            &[
                "great",
                "excellent",
                "awesome",
                "amazing",
                "well done",
                "love this",
                "nice work",
            ],
            &[
                r"(?i)\b(great|nice|excellent|awesome)\s+(work|job)\b",
                r"(?i)\bwell\s+done\b",
            ],
            0.8,
        ),
        IntentCategory::new(
            Intent::Clarification,
            &[
                "unclear",
                "confused",
                "not sure",
                "explain",
                "elaborate",
                "don't understand",
            ],
            &[
                r"(?i)\bwhat\s+do\s+you\s+mean\b",
                r"(?i)\bcould\s+you\s+(explain|clarify)\b",
            ],
            0.9,
        ),
        IntentCategory::new(
            Intent::Concern,
            &[
                "worried",
                "concern",
                "concerned",
                "risk",
                "risky",
                "dangerous",
                "problem",
            ],
            &[
                r"(?i)\b(security|performance|memory|race)\s+(issue|concern|problem|risk)\b",
                r"(?i)\bpotential\s+(bug|issue|problem)\b",
            ],
            1.0,
        ),
    ]
}

/// Pick the winning intent and its raw score.
///
/// Ties break toward the first category in declaration order; an empty body
/// scores 0.0 for everything and yields the first category at score 0.
pub(crate) fn classify(categories: &[IntentCategory], body: &str) -> (Intent, f64) {
    let mut best_intent = categories
        .first()
        .map(|c| c.intent)
        .unwrap_or(Intent::Clarification);
    let mut best_score = 0.0_f64;
    for category in categories {
        let score = category.score(body);
        if score > best_score {
            best_score = score;
            best_intent = category.intent;
        }
    }
    (best_intent, best_score)
}
