/// Fixed positive sentiment vocabulary.
const POSITIVE_WORDS: &[&str] = &[
    "good",
    "great",
    "excellent",
    "amazing",
    "awesome",
    "nice",
    "love",
    "clean",
    "elegant",
    "solid",
    "perfect",
    "helpful",
    "thanks",
    "thank",
    "appreciate",
    "fantastic",
    "wonderful",
    "brilliant",
];

/// Fixed negative sentiment vocabulary.
const NEGATIVE_WORDS: &[&str] = &[
    "bad",
    "terrible",
    "awful",
    "broken",
    "wrong",
    "ugly",
    "messy",
    "confusing",
    "horrible",
    "poor",
    "slow",
    "unsafe",
    "fragile",
    "buggy",
    "worse",
    "hate",
];

/// Score the sentiment of a comment body in `[-1.0, 1.0]`.
///
/// Counts word-boundary, case-insensitive hits against the fixed positive and
/// negative vocabularies: `(positive − negative) / max(1, positive + negative)`.
/// Bodies with no sentiment words score `0.0` (neutral).
///
/// # Examples
///
/// ```
/// use vigil_classify::sentiment_score;
///
/// assert!(sentiment_score("Great work! This is excellent and amazing") > 0.9);
/// assert!(sentiment_score("This is terrible and broken, very bad implementation") < -0.9);
/// assert_eq!(sentiment_score("This is a function that does something"), 0.0);
/// ```
pub fn sentiment_score(body: &str) -> f64 {
    let mut positive = 0_i64;
    let mut negative = 0_i64;
    for token in body
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        let lower = token.to_lowercase();
        if POSITIVE_WORDS.contains(&lower.as_str()) {
            positive += 1;
        } else if NEGATIVE_WORDS.contains(&lower.as_str()) {
            negative += 1;
        }
    }
    let total = positive + negative;
    if total == 0 {
        return 0.0;
    }
    (positive - negative) as f64 / total as f64
}
